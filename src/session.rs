//! Reactive state for one metric.
//!
//! A session owns its state exclusively. Fetches run as spawned tasks and
//! report back over a channel; the owner applies results with [`pump`] or
//! [`drain`]. Every fetch start takes a new generation number, and a
//! completion is applied only if its generation is still current, so a
//! slow superseded response can never overwrite a newer one. Superseded
//! tasks are also aborted so they stop polling and retrying.
//!
//! [`pump`]: MetricSession::pump
//! [`drain`]: MetricSession::drain

use crate::error::FetchError;
use crate::fetcher::MetricFetcher;
use crate::types::{Fetched, FreshnessMetadata, TimeWindow};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Clone, Debug, PartialEq)]
pub struct SessionState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
    pub metadata: FreshnessMetadata,
    pub window: TimeWindow,
}

impl<T> SessionState<T> {
    fn empty(window: TimeWindow) -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
            metadata: FreshnessMetadata::fresh(),
            window,
        }
    }
}

struct Completion<T> {
    generation: u64,
    result: Result<Fetched<T>, FetchError>,
}

pub struct MetricSession<T> {
    fetcher: Arc<MetricFetcher<T>>,
    subject: Option<String>,
    state: SessionState<T>,
    generation: u64,
    tx: UnboundedSender<Completion<T>>,
    rx: UnboundedReceiver<Completion<T>>,
    tasks: Vec<JoinHandle<()>>,
    revision: u64,
    changes: watch::Sender<u64>,
}

impl<T> MetricSession<T>
where
    T: DeserializeOwned + Send + 'static,
{
    pub fn new(fetcher: Arc<MetricFetcher<T>>) -> Self {
        Self::with_window(fetcher, TimeWindow::default())
    }

    pub fn with_window(fetcher: Arc<MetricFetcher<T>>, window: TimeWindow) -> Self {
        let (tx, rx) = unbounded_channel();
        let (changes, _) = watch::channel(0);
        Self {
            fetcher,
            subject: None,
            state: SessionState::empty(window),
            generation: 0,
            tx,
            rx,
            tasks: Vec::new(),
            revision: 0,
            changes,
        }
    }

    // ----- getters -----
    pub fn state(&self) -> &SessionState<T> {
        &self.state
    }
    pub fn data(&self) -> Option<&T> {
        self.state.data.as_ref()
    }
    pub fn loading(&self) -> bool {
        self.state.loading
    }
    pub fn error(&self) -> Option<&str> {
        self.state.error.as_deref()
    }
    pub fn metadata(&self) -> FreshnessMetadata {
        self.state.metadata
    }
    pub fn window(&self) -> TimeWindow {
        self.state.window
    }
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }
    pub fn resource(&self) -> &str {
        self.fetcher.resource()
    }

    /// Change notifications: the value is a revision counter bumped on
    /// every state transition
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// Switch to another subject, discarding all state and in-flight work
    ///
    /// An empty subject leaves the session idle. Must be called within a
    /// Tokio runtime.
    pub fn set_subject(&mut self, subject: &str) {
        self.set_subject_with(subject, false)
    }

    /// Like [`set_subject`](Self::set_subject), with the first fetch
    /// optionally bypassing the server cache
    ///
    /// With the current subject and `prefer_fresh` this is a fresh refresh.
    pub fn set_subject_with(&mut self, subject: &str, prefer_fresh: bool) {
        let subject = subject.trim();
        if self.subject.as_deref() == Some(subject) {
            if prefer_fresh {
                self.refresh(true);
            }
            return;
        }

        log::debug!(
            "[session] {} subject {:?} -> {:?}",
            self.resource(),
            self.subject,
            subject
        );
        self.subject = (!subject.is_empty()).then(|| subject.to_string());
        self.state = SessionState::empty(self.state.window);
        // Invalidate whatever is still in flight for the old subject
        self.generation += 1;

        if self.subject.is_some() {
            self.start_fetch(prefer_fresh);
        } else {
            self.cancel_in_flight();
            self.notify();
        }
    }

    /// Select another time window and re-fetch this metric only
    pub fn set_window(&mut self, window: TimeWindow) {
        if self.state.window == window {
            return;
        }
        self.state.window = window;
        if self.subject.is_some() {
            self.start_fetch(false);
        } else {
            self.notify();
        }
    }

    /// Re-fetch with the current subject and window
    pub fn refresh(&mut self, prefer_fresh: bool) {
        if self.subject.is_none() {
            log::debug!("[session] {} refresh ignored: no subject", self.resource());
            return;
        }
        self.start_fetch(prefer_fresh);
    }

    fn start_fetch(&mut self, prefer_fresh: bool) {
        let Some(subject) = self.subject.clone() else {
            return;
        };

        self.generation += 1;
        let generation = self.generation;
        let window = self.state.window;
        self.state.loading = true;
        self.notify();

        self.cancel_in_flight();
        let fetcher = self.fetcher.clone();
        let tx = self.tx.clone();
        self.tasks.push(tokio::spawn(async move {
            let result = fetcher.fetch(&subject, window, prefer_fresh).await;
            // Receiver gone means the session was dropped
            let _ = tx.send(Completion { generation, result });
        }));
    }

    /// Stop superseded fetches so they spend no more requests
    ///
    /// A result already queued on the channel is still discarded by the
    /// generation check.
    fn cancel_in_flight(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }

    fn apply(&mut self, completion: Completion<T>) -> bool {
        if completion.generation != self.generation {
            log::debug!(
                "[session] {} dropping superseded result (gen {} < {})",
                self.resource(),
                completion.generation,
                self.generation
            );
            return false;
        }

        self.state.loading = false;
        match completion.result {
            Ok(Fetched { data, metadata }) => {
                self.state.data = Some(data);
                self.state.metadata = metadata;
                self.state.error = None;
            }
            Err(e) => {
                log::info!("[session] {} fetch failed: {e}", self.resource());
                // Last known data and metadata stay visible
                self.state.error = Some(e.user_message());
            }
        }
        self.notify();
        true
    }

    /// Wait for the next fetch to finish and apply it
    ///
    /// Returns `true` if state changed, `false` for a superseded result.
    pub async fn pump(&mut self) -> bool {
        match self.rx.recv().await {
            Some(completion) => self.apply(completion),
            None => false,
        }
    }

    /// Apply every finished fetch without waiting; returns how many changed state
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.rx.try_recv() {
            if self.apply(completion) {
                applied += 1;
            }
        }
        applied
    }

    /// Pump until no authoritative fetch is outstanding
    pub async fn settle(&mut self) {
        while self.state.loading {
            self.pump().await;
        }
    }

    fn notify(&mut self) {
        self.revision += 1;
        self.changes.send_replace(self.revision);
    }
}

impl<T> Drop for MetricSession<T> {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

//! Dashboard orchestration across the fixed set of metrics.
//!
//! The dashboard is the only place that knows which metrics exist. It owns
//! one [`MetricSession`] per metric, fans subject changes and refreshes out
//! to all of them, and derives aggregate view state on demand from their
//! current states. It never stores a copy of session state and never
//! handles fetch errors itself.

use crate::constants::messages;
use crate::fetcher::{FetchPolicy, MetricFetcher};
use crate::models::{
    AbandonedByRatings, AbandonedByTags, DifficultyDistribution, DivisionProblems, TagRatings,
};
use crate::session::MetricSession;
use crate::transport::Transport;
use crate::types::{FreshnessMetadata, TimeWindow};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Dashboard metrics, in priority order (first error wins)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    DifficultyDistribution,
    TagRatings,
    AbandonedByTags,
    AbandonedByRatings,
    DivisionProblems,
}

impl MetricKind {
    pub const ALL: [MetricKind; 5] = [
        MetricKind::DifficultyDistribution,
        MetricKind::TagRatings,
        MetricKind::AbandonedByTags,
        MetricKind::AbandonedByRatings,
        MetricKind::DivisionProblems,
    ];

    /// Resource path below the API root
    pub fn resource(&self) -> &'static str {
        match self {
            MetricKind::DifficultyDistribution => "difficulty-distribution",
            MetricKind::TagRatings => "tag-ratings",
            MetricKind::AbandonedByTags => "abandoned-problems/by-tags",
            MetricKind::AbandonedByRatings => "abandoned-problems/by-ratings",
            MetricKind::DivisionProblems => "division-problems",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            MetricKind::DifficultyDistribution => "Difficulty Distribution",
            MetricKind::TagRatings => "Tag Ratings",
            MetricKind::AbandonedByTags => "Abandoned Problems by Tags",
            MetricKind::AbandonedByRatings => "Abandoned Problems by Ratings",
            MetricKind::DivisionProblems => "Problems per Division",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}

/// Payload-agnostic view and control of a session
pub trait AnySession {
    fn has_data(&self) -> bool;
    fn is_loading(&self) -> bool;
    fn error_message(&self) -> Option<&str>;
    fn freshness(&self) -> FreshnessMetadata;
    fn time_window(&self) -> TimeWindow;
    fn data_json(&self) -> Option<serde_json::Value>;

    fn change_subject(&mut self, subject: &str, prefer_fresh: bool);
    fn change_window(&mut self, window: TimeWindow);
    fn refresh_now(&mut self, prefer_fresh: bool);
}

impl<T> AnySession for MetricSession<T>
where
    T: DeserializeOwned + Serialize + Send + 'static,
{
    fn has_data(&self) -> bool {
        self.data().is_some()
    }
    fn is_loading(&self) -> bool {
        self.loading()
    }
    fn error_message(&self) -> Option<&str> {
        self.error()
    }
    fn freshness(&self) -> FreshnessMetadata {
        self.metadata()
    }
    fn time_window(&self) -> TimeWindow {
        self.window()
    }
    fn data_json(&self) -> Option<serde_json::Value> {
        self.data().and_then(|d| serde_json::to_value(d).ok())
    }

    fn change_subject(&mut self, subject: &str, prefer_fresh: bool) {
        self.set_subject_with(subject, prefer_fresh)
    }
    fn change_window(&mut self, window: TimeWindow) {
        self.set_window(window)
    }
    fn refresh_now(&mut self, prefer_fresh: bool) {
        self.refresh(prefer_fresh)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricError {
    pub metric: MetricKind,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StaleNotice {
    pub metric: MetricKind,
    pub metadata: FreshnessMetadata,
}

impl StaleNotice {
    /// Banner text, age in whole hours
    pub fn banner(&self) -> String {
        match self.metadata.age_hours() {
            Some(hours) => format!("This data is {hours} hours old"),
            None => messages::STALE_UNKNOWN_AGE.to_string(),
        }
    }
}

/// Aggregate state derived from all sessions
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AggregateView {
    /// No metric has data yet and at least one is loading
    pub initial_loading: bool,
    /// First error in metric priority order
    pub error: Option<MetricError>,
    /// First metric whose data the backend declared stale
    pub stale: Option<StaleNotice>,
}

#[derive(Clone, Debug, Serialize)]
pub struct MetricSnapshot {
    pub metric: MetricKind,
    pub window: TimeWindow,
    pub loading: bool,
    pub error: Option<String>,
    pub metadata: FreshnessMetadata,
    pub data: Option<serde_json::Value>,
}

#[derive(Clone, Debug, Serialize)]
pub struct DashboardSnapshot {
    pub subject: Option<String>,
    pub aggregate: AggregateView,
    pub metrics: Vec<MetricSnapshot>,
}

pub struct Dashboard {
    subject: Option<String>,
    difficulty: MetricSession<DifficultyDistribution>,
    tag_ratings: MetricSession<TagRatings>,
    abandoned_tags: MetricSession<AbandonedByTags>,
    abandoned_ratings: MetricSession<AbandonedByRatings>,
    divisions: MetricSession<DivisionProblems>,
}

fn session<T>(
    transport: &Arc<dyn Transport>,
    policy: &FetchPolicy,
    kind: MetricKind,
    window: TimeWindow,
) -> MetricSession<T>
where
    T: DeserializeOwned + Send + 'static,
{
    let fetcher = MetricFetcher::with_policy(transport.clone(), kind.resource(), policy.clone());
    MetricSession::with_window(Arc::new(fetcher), window)
}

impl Dashboard {
    pub fn new(transport: Arc<dyn Transport>, policy: FetchPolicy) -> Self {
        Self::with_window(transport, policy, TimeWindow::default())
    }

    /// All sessions start on `window`; each can change it independently later
    pub fn with_window(
        transport: Arc<dyn Transport>,
        policy: FetchPolicy,
        window: TimeWindow,
    ) -> Self {
        let t = &transport;
        let p = &policy;
        Self {
            subject: None,
            difficulty: session(t, p, MetricKind::DifficultyDistribution, window),
            tag_ratings: session(t, p, MetricKind::TagRatings, window),
            abandoned_tags: session(t, p, MetricKind::AbandonedByTags, window),
            abandoned_ratings: session(t, p, MetricKind::AbandonedByRatings, window),
            divisions: session(t, p, MetricKind::DivisionProblems, window),
        }
    }

    // ----- typed per-metric access -----
    pub fn difficulty(&self) -> &MetricSession<DifficultyDistribution> {
        &self.difficulty
    }
    pub fn tag_ratings(&self) -> &MetricSession<TagRatings> {
        &self.tag_ratings
    }
    pub fn abandoned_tags(&self) -> &MetricSession<AbandonedByTags> {
        &self.abandoned_tags
    }
    pub fn abandoned_ratings(&self) -> &MetricSession<AbandonedByRatings> {
        &self.abandoned_ratings
    }
    pub fn divisions(&self) -> &MetricSession<DivisionProblems> {
        &self.divisions
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn session(&self, kind: MetricKind) -> &dyn AnySession {
        match kind {
            MetricKind::DifficultyDistribution => &self.difficulty,
            MetricKind::TagRatings => &self.tag_ratings,
            MetricKind::AbandonedByTags => &self.abandoned_tags,
            MetricKind::AbandonedByRatings => &self.abandoned_ratings,
            MetricKind::DivisionProblems => &self.divisions,
        }
    }

    pub fn session_mut(&mut self, kind: MetricKind) -> &mut dyn AnySession {
        match kind {
            MetricKind::DifficultyDistribution => &mut self.difficulty,
            MetricKind::TagRatings => &mut self.tag_ratings,
            MetricKind::AbandonedByTags => &mut self.abandoned_tags,
            MetricKind::AbandonedByRatings => &mut self.abandoned_ratings,
            MetricKind::DivisionProblems => &mut self.divisions,
        }
    }

    fn sessions(&self) -> impl Iterator<Item = (MetricKind, &dyn AnySession)> + '_ {
        MetricKind::ALL.into_iter().map(move |k| (k, self.session(k)))
    }

    /// Point every metric at a new subject; each resets and re-fetches
    pub fn set_subject(&mut self, subject: &str) {
        self.set_subject_with(subject, false)
    }

    /// Like [`set_subject`](Self::set_subject); with `prefer_fresh` the
    /// first fetch of every metric bypasses the server cache
    pub fn set_subject_with(&mut self, subject: &str, prefer_fresh: bool) {
        let subject = subject.trim();
        log::info!("[dashboard] subject -> {subject:?} (prefer_fresh={prefer_fresh})");
        self.subject = (!subject.is_empty()).then(|| subject.to_string());
        for kind in MetricKind::ALL {
            self.session_mut(kind).change_subject(subject, prefer_fresh);
        }
    }

    pub fn set_window(&mut self, kind: MetricKind, window: TimeWindow) {
        self.session_mut(kind).change_window(window);
    }

    pub fn refresh(&mut self, kind: MetricKind, prefer_fresh: bool) {
        self.session_mut(kind).refresh_now(prefer_fresh);
    }

    /// Re-fetch every metric bypassing the server cache
    ///
    /// Used for explicit refresh, for retry after an error, and to resolve
    /// a staleness notice.
    pub fn refresh_all(&mut self) {
        log::info!("[dashboard] refresh all");
        for kind in MetricKind::ALL {
            self.session_mut(kind).refresh_now(true);
        }
    }

    // ----- derived state -----
    pub fn initial_loading(&self) -> bool {
        let any_data = self.sessions().any(|(_, s)| s.has_data());
        let any_loading = self.sessions().any(|(_, s)| s.is_loading());
        !any_data && any_loading
    }

    pub fn first_error(&self) -> Option<MetricError> {
        self.sessions().find_map(|(metric, s)| {
            s.error_message().map(|m| MetricError {
                metric,
                message: m.to_string(),
            })
        })
    }

    pub fn stale_notice(&self) -> Option<StaleNotice> {
        self.sessions()
            .find(|(_, s)| s.freshness().is_stale)
            .map(|(metric, s)| StaleNotice {
                metric,
                metadata: s.freshness(),
            })
    }

    pub fn aggregate(&self) -> AggregateView {
        AggregateView {
            initial_loading: self.initial_loading(),
            error: self.first_error(),
            stale: self.stale_notice(),
        }
    }

    pub fn any_loading(&self) -> bool {
        self.sessions().any(|(_, s)| s.is_loading())
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            subject: self.subject.clone(),
            aggregate: self.aggregate(),
            metrics: self
                .sessions()
                .map(|(metric, s)| MetricSnapshot {
                    metric,
                    window: s.time_window(),
                    loading: s.is_loading(),
                    error: s.error_message().map(str::to_string),
                    metadata: s.freshness(),
                    data: s.data_json(),
                })
                .collect(),
        }
    }

    // ----- completion plumbing -----

    /// Wait for the next fetch completion from any metric and apply it
    ///
    /// Returns the metric whose state changed, or `None` if the completion
    /// was superseded.
    pub async fn pump(&mut self) -> Option<MetricKind> {
        tokio::select! {
            changed = self.difficulty.pump() => changed.then_some(MetricKind::DifficultyDistribution),
            changed = self.tag_ratings.pump() => changed.then_some(MetricKind::TagRatings),
            changed = self.abandoned_tags.pump() => changed.then_some(MetricKind::AbandonedByTags),
            changed = self.abandoned_ratings.pump() => changed.then_some(MetricKind::AbandonedByRatings),
            changed = self.divisions.pump() => changed.then_some(MetricKind::DivisionProblems),
        }
    }

    /// Apply all finished fetches without waiting
    pub fn drain(&mut self) -> usize {
        self.difficulty.drain()
            + self.tag_ratings.drain()
            + self.abandoned_tags.drain()
            + self.abandoned_ratings.drain()
            + self.divisions.drain()
    }

    /// Pump until no metric is loading
    pub async fn settle(&mut self) {
        while self.any_loading() {
            if let Some(kind) = self.pump().await {
                log::debug!("[dashboard] {kind} updated");
            }
        }
    }
}

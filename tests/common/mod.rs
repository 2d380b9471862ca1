//! Scripted in-memory transport for integration tests.
//!
//! Responses are queued per route. A route is either a bare path
//! (`tag-ratings/tourist`) or a path plus exact query string
//! (`tag-ratings/tourist?window=week`); the exact form wins.

#![allow(dead_code)]

use async_trait::async_trait;
use cfdash::transport::{HttpResponse, Query, Transport};
use cfdash::TransportError;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Clone, Debug)]
pub struct Step {
    pub delay: Duration,
    pub outcome: Result<HttpResponse, TransportError>,
}

impl Step {
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Clone, Debug)]
pub struct Call {
    pub path: String,
    pub query: String,
    pub at: Instant,
}

#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<Step>>>,
    calls: Mutex<Vec<Call>>,
}

pub fn query_string(query: &Query) -> String {
    query
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, route: &str, step: Step) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .entry(route.to_string())
            .or_default()
            .push_back(step);
        self
    }

    pub fn push_n(&self, route: &str, n: usize, step: Step) -> &Self {
        for _ in 0..n {
            self.push(route, step.clone());
        }
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.path == path)
            .collect()
    }

    /// Gaps between consecutive calls to `path`
    pub fn gaps(&self, path: &str) -> Vec<Duration> {
        let calls = self.calls_to(path);
        calls.windows(2).map(|w| w[1].at - w[0].at).collect()
    }

    fn next_step(&self, path: &str, query: &str) -> Option<Step> {
        let mut routes = self.routes.lock().unwrap();
        let exact = format!("{path}?{query}");
        if let Some(step) = routes.get_mut(&exact).and_then(|q| q.pop_front()) {
            return Some(step);
        }
        routes.get_mut(path).and_then(|q| q.pop_front())
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, path: &str, query: &Query) -> Result<HttpResponse, TransportError> {
        let query = query_string(query);
        self.calls.lock().unwrap().push(Call {
            path: path.to_string(),
            query: query.clone(),
            at: Instant::now(),
        });

        let step = self.next_step(path, &query).unwrap_or_else(|| Step {
            delay: Duration::ZERO,
            outcome: Ok(HttpResponse::new(599, format!("unscripted GET {path}?{query}"))),
        });
        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }
        step.outcome
    }
}

// ----- canned replies -----

pub fn ok(body: &str) -> Step {
    Step {
        delay: Duration::ZERO,
        outcome: Ok(HttpResponse::new(200, body)),
    }
}

pub fn ok_fresh(body: &str) -> Step {
    Step {
        delay: Duration::ZERO,
        outcome: Ok(HttpResponse::new(200, body).with_header("X-Data-Stale", "false")),
    }
}

pub fn ok_stale(body: &str, age_secs: u64) -> Step {
    Step {
        delay: Duration::ZERO,
        outcome: Ok(HttpResponse::new(200, body)
            .with_header("X-Data-Stale", "true")
            .with_header("X-Data-Age", age_secs.to_string())),
    }
}

pub fn processing(task_id: &str) -> Step {
    Step {
        delay: Duration::ZERO,
        outcome: Ok(HttpResponse::new(
            202,
            format!(r#"{{"status": "processing", "task_id": "{task_id}", "retry_after": 2}}"#),
        )),
    }
}

pub fn task_pending() -> Step {
    Step {
        delay: Duration::ZERO,
        outcome: Ok(HttpResponse::new(202, r#"{"status": "processing"}"#)),
    }
}

pub fn task_done() -> Step {
    Step {
        delay: Duration::ZERO,
        outcome: Ok(HttpResponse::new(200, r#"{"status": "completed"}"#)),
    }
}

pub fn task_failed(msg: &str) -> Step {
    Step {
        delay: Duration::ZERO,
        outcome: Ok(HttpResponse::new(500, format!(r#"{{"error": "{msg}"}}"#))),
    }
}

pub fn status(code: u16) -> Step {
    Step {
        delay: Duration::ZERO,
        outcome: Ok(HttpResponse::new(code, "")),
    }
}

pub fn transport_error(msg: &str) -> Step {
    Step {
        delay: Duration::ZERO,
        outcome: Err(TransportError::Request(msg.to_string())),
    }
}

// ----- payload bodies -----

pub fn difficulty_body(total_solved: u32) -> String {
    format!(
        r#"{{"ranges": [{{"rating": 800, "problem_count": 400}}, {{"rating": 3500, "problem_count": 12}}],
            "total_solved": {total_solved}, "last_updated": "2024-05-01T10:00:00Z"}}"#
    )
}

pub const TAG_RATINGS_BODY: &str = r#"{
    "tags": [{"tag": "dp", "average_rating": 2400.5, "median_rating": 2300.0, "problem_count": 210}],
    "overall_average_rating": 2250.0, "overall_median_rating": 2200.0,
    "total_solved": 1500, "last_updated": "2024-05-01T10:00:00Z"
}"#;

pub const ABANDONED_TAGS_BODY: &str = r#"{
    "tags": [{"tag": "geometry", "problem_count": 3, "total_failed_attempts": 11}],
    "total_abandoned_problems": 3, "last_updated": "2024-05-01T10:00:00Z"
}"#;

pub const ABANDONED_RATINGS_BODY: &str = r#"{
    "ratings": [{"rating": 3000, "problem_count": 3, "total_failed_attempts": 11}],
    "total_abandoned_problems": 3, "last_updated": "2024-05-01T10:00:00Z"
}"#;

pub const DIVISIONS_BODY: &str = r#"{
    "divisions": [{"division": "Div. 1", "contest_count": 200, "total_problems_solved": 900,
                   "average_problems_per_contest": 4.5}],
    "total_contests": 200, "total_problems_solved": 900, "last_updated": "2024-05-01T10:00:00Z"
}"#;

pub const WEAK_TAGS_BODY: &str = r#"{
    "weak_tags": [{"tag": "geometry", "average_rating": 1700.0, "median_rating": 1650.0, "problem_count": 9}],
    "overall_average_rating": 2100.0, "overall_median_rating": 2000.0,
    "total_solved": 640, "threshold_used": 200, "last_updated": "2024-05-01T10:00:00Z"
}"#;

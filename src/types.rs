use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Time window a metric is computed over
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindow {
    Day,
    Week,
    Month,
    HalfYear,
    Year,
    #[default]
    AllTime,
}

impl TimeWindow {
    pub const ALL: [TimeWindow; 6] = [
        TimeWindow::Day,
        TimeWindow::Week,
        TimeWindow::Month,
        TimeWindow::HalfYear,
        TimeWindow::Year,
        TimeWindow::AllTime,
    ];

    /// Query parameter value understood by the backend
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
            TimeWindow::Month => "month",
            TimeWindow::HalfYear => "half_year",
            TimeWindow::Year => "year",
            TimeWindow::AllTime => "all_time",
        }
    }

    /// Short selector label
    pub fn label(&self) -> &'static str {
        match self {
            TimeWindow::Day => "1D",
            TimeWindow::Week => "1W",
            TimeWindow::Month => "1M",
            TimeWindow::HalfYear => "6M",
            TimeWindow::Year => "1Y",
            TimeWindow::AllTime => "All",
        }
    }
}

impl std::str::FromStr for TimeWindow {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        let norm = s.trim().to_lowercase();
        TimeWindow::ALL
            .into_iter()
            .find(|w| w.as_str() == norm)
            .ok_or_else(|| {
                anyhow!(
                    "Invalid window '{s}'. Valid options: day, week, month, half_year, year, all_time"
                )
            })
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Freshness of a successful response, as declared by the backend
///
/// `is_stale == false` implies `data_age` is `None`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreshnessMetadata {
    pub is_stale: bool,
    /// Age of the underlying data in seconds
    pub data_age: Option<u64>,
}

impl FreshnessMetadata {
    pub fn fresh() -> Self {
        Self::default()
    }

    /// Whole hours of age, rounded down
    pub fn age_hours(&self) -> Option<u64> {
        self.data_age.map(|secs| secs / 3600)
    }
}

/// Reference to a deferred backend computation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobHandle {
    pub job_id: String,
}

/// Body of a 202 reply
#[derive(Debug, Clone, Deserialize)]
pub struct TaskAccepted {
    pub status: String,
    pub task_id: String,
    #[serde(default)]
    pub retry_after: Option<u64>,
}

/// A successful metric GET: either data now, or a job to wait for
#[derive(Debug)]
pub enum BackendReply<T> {
    Immediate {
        data: T,
        metadata: FreshnessMetadata,
    },
    Deferred(JobHandle),
}

/// Payload together with the freshness of the response that carried it
#[derive(Clone, Debug, PartialEq)]
pub struct Fetched<T> {
    pub data: T,
    pub metadata: FreshnessMetadata,
}

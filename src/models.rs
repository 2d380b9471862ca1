//! Metric payload records returned by the analytics backend.
//!
//! The fetch core treats these as opaque; only the presentation layer
//! and the dashboard snapshot read their fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRange {
    pub rating: u32,
    pub problem_count: u32,
}

/// Solved problems bucketed by rating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyDistribution {
    pub ranges: Vec<RatingRange>,
    pub total_solved: u32,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagInfo {
    pub tag: String,
    pub average_rating: f64,
    pub median_rating: f64,
    pub problem_count: u32,
}

/// Per-tag rating statistics of solved problems
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRatings {
    pub tags: Vec<TagInfo>,
    pub overall_average_rating: f64,
    pub overall_median_rating: f64,
    pub total_solved: u32,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Tags whose average solved rating trails the overall average by at
/// least `threshold_used` points, weakest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeakTags {
    pub weak_tags: Vec<TagInfo>,
    pub overall_average_rating: f64,
    #[serde(default)]
    pub overall_median_rating: f64,
    pub total_solved: u32,
    pub threshold_used: u32,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagAbandoned {
    pub tag: String,
    pub problem_count: u32,
    pub total_failed_attempts: u32,
}

/// Attempted-but-never-solved problems grouped by tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbandonedByTags {
    pub tags: Vec<TagAbandoned>,
    pub total_abandoned_problems: u32,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingAbandoned {
    pub rating: u32,
    pub problem_count: u32,
    pub total_failed_attempts: u32,
}

/// Attempted-but-never-solved problems grouped by rating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbandonedByRatings {
    pub ratings: Vec<RatingAbandoned>,
    pub total_abandoned_problems: u32,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivisionStats {
    pub division: String,
    pub contest_count: u32,
    pub total_problems_solved: u32,
    pub average_problems_per_contest: f64,
}

/// Average problems solved per contest, per division
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivisionProblems {
    pub divisions: Vec<DivisionStats>,
    pub total_contests: u32,
    pub total_problems_solved: u32,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

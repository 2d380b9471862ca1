use crate::constants::{http, retry};
use crate::fetcher::FetchPolicy;
use crate::net::Backoff;
use crate::types::TimeWindow;
use anyhow::{anyhow, Result};
use clap::Parser;

/// cfdash - competitive programming analytics dashboard client
///
/// Fetches every dashboard metric for one handle, waiting out background
/// computations and rate limits, and prints the result.
/// Configuration priority: CLI args > Environment variables > Defaults
#[derive(Parser, Debug)]
#[command(name = "cfdash")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Analytics dashboard client", long_about = None)]
pub struct CliArgs {
    /// Handle whose metrics are fetched
    pub subject: String,

    /// Analytics API base URL
    #[arg(long, env = "CFDASH_API_URL")]
    pub api_url: Option<String>,

    /// Time window: day, week, month, half_year, year, all_time
    #[arg(short, long, env = "CFDASH_WINDOW", value_parser = clap::value_parser!(TimeWindow))]
    pub window: Option<TimeWindow>,

    /// Per-request timeout in milliseconds (1000-120000)
    #[arg(long, env = "CFDASH_REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: Option<u64>,

    /// Attempts per metric when rate limited (1-10)
    #[arg(long, env = "CFDASH_RATE_LIMIT_ATTEMPTS")]
    pub rate_limit_attempts: Option<u32>,

    /// Job status polls before giving up (1-120)
    #[arg(long, env = "CFDASH_POLL_MAX_ATTEMPTS")]
    pub poll_max_attempts: Option<u32>,

    /// Also list weak tags: rating gap below the overall average (0-1000)
    #[arg(long, env = "CFDASH_WEAK_THRESHOLD", num_args = 0..=1,
          default_missing_value = "200")]
    pub weak_threshold: Option<u32>,

    /// Bypass the server-side cache on the first fetch
    #[arg(long)]
    pub prefer_fresh: bool,

    /// Print the dashboard snapshot as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub subject: String,
    pub api_url: String,
    pub window: TimeWindow,
    pub request_timeout_ms: u64,
    pub rate_limit_attempts: u32,
    pub poll_max_attempts: u32,
    /// Weak-tags threshold when the lookup was requested
    pub weak_threshold: Option<u32>,
    pub prefer_fresh: bool,
    pub json: bool,
}

/// Validate that a value is within a given range (inclusive)
fn validate_in_range<T>(val: T, min: T, max: T, name: &str) -> Result<T>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if val < min || val > max {
        Err(anyhow!("{name} must be in range [{min}, {max}], got {val}"))
    } else {
        Ok(val)
    }
}

/// Validate URL format (basic check)
fn validate_url(url: &str, name: &str) -> Result<()> {
    if url.is_empty() {
        return Err(anyhow!("{name} cannot be empty"));
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(anyhow!("{name} must start with http:// or https://"))
    }
}

/// Load configuration from CLI args and environment variables
pub fn load() -> Result<Config> {
    Config::from_args(CliArgs::parse())
}

impl Config {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let subject = args.subject.trim().to_string();
        if subject.is_empty() {
            return Err(anyhow!("subject cannot be empty"));
        }

        let api_url = args
            .api_url
            .unwrap_or_else(|| http::DEFAULT_API_URL.to_string());
        validate_url(&api_url, "CFDASH_API_URL")?;

        let request_timeout_ms = validate_in_range(
            args.request_timeout_ms.unwrap_or(http::REQUEST_TIMEOUT_MS),
            1000,
            120_000,
            "CFDASH_REQUEST_TIMEOUT_MS",
        )?;

        let rate_limit_attempts = validate_in_range(
            args.rate_limit_attempts
                .unwrap_or(retry::RATE_LIMIT_MAX_ATTEMPTS),
            1,
            10,
            "CFDASH_RATE_LIMIT_ATTEMPTS",
        )?;

        let poll_max_attempts = validate_in_range(
            args.poll_max_attempts.unwrap_or(retry::POLL_MAX_ATTEMPTS),
            1,
            120,
            "CFDASH_POLL_MAX_ATTEMPTS",
        )?;

        let weak_threshold = args
            .weak_threshold
            .map(|t| validate_in_range(t, 0, http::MAX_WEAK_THRESHOLD, "CFDASH_WEAK_THRESHOLD"))
            .transpose()?;

        Ok(Config {
            subject,
            api_url,
            window: args.window.unwrap_or_default(),
            request_timeout_ms,
            rate_limit_attempts,
            poll_max_attempts,
            weak_threshold,
            prefer_fresh: args.prefer_fresh,
            json: args.json,
        })
    }

    pub fn fetch_policy(&self) -> FetchPolicy {
        FetchPolicy {
            rate_limit_attempts: self.rate_limit_attempts,
            poll_max_attempts: self.poll_max_attempts,
            backoff: Backoff::default(),
        }
    }

    /// Log the effective configuration
    pub fn print_summary(&self) {
        log::info!("cfdash configuration:");
        log::info!("  Subject: {}", self.subject);
        log::info!("  API URL: {}", self.api_url);
        log::info!("  Window: {}", self.window);
        log::info!("  Request timeout: {}ms", self.request_timeout_ms);
        log::info!("  Rate limit attempts: {}", self.rate_limit_attempts);
        log::info!("  Poll max attempts: {}", self.poll_max_attempts);
        if let Some(threshold) = self.weak_threshold {
            log::info!("  Weak tag threshold: {threshold}");
        }
        if self.prefer_fresh {
            log::info!("  Prefer fresh: yes");
        }
    }
}

// Command-line driver: one refresh cycle for a handle, then print the dashboard

use anyhow::{Context, Result};
use std::sync::Arc;

use cfdash::{
    config::load,
    dashboard::{Dashboard, DashboardSnapshot, MetricKind},
    fetcher::MetricFetcher,
    models::WeakTags,
    transport::HttpTransport,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (safe to ignore if not found)
    let _ = dotenvy::dotenv();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = load().context("Failed to load configuration")?;
    cfg.print_summary();

    let transport = Arc::new(HttpTransport::new(&cfg.api_url, cfg.request_timeout_ms));
    let mut dashboard =
        Dashboard::with_window(transport.clone(), cfg.fetch_policy(), cfg.window);

    dashboard.set_subject_with(&cfg.subject, cfg.prefer_fresh);

    log::info!("Loading analytics for {}...", cfg.subject);
    tokio::select! {
        _ = dashboard.settle() => {}
        _ = tokio::signal::ctrl_c() => {
            log::warn!("Interrupted, printing partial results");
        }
    }

    let weak = match cfg.weak_threshold {
        Some(threshold) => {
            let fetcher =
                MetricFetcher::<WeakTags>::weak_tags(transport, cfg.fetch_policy(), threshold);
            match fetcher.fetch(&cfg.subject, cfg.window, cfg.prefer_fresh).await {
                Ok(fetched) => Some(fetched.data),
                Err(e) => {
                    log::warn!("Weak tags unavailable: {}", e.user_message());
                    None
                }
            }
        }
        None => None,
    };

    let snapshot = dashboard.snapshot();
    if cfg.json {
        let mut out = serde_json::to_value(&snapshot).context("Failed to encode snapshot")?;
        if let Some(weak) = &weak {
            out["weak_tags"] = serde_json::to_value(weak).context("Failed to encode weak tags")?;
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&out).context("Failed to encode snapshot")?
        );
    } else {
        print_text(&snapshot);
        if let Some(weak) = &weak {
            print_weak(weak);
        }
    }

    match snapshot.aggregate.error {
        Some(err) if snapshot.metrics.iter().all(|m| m.data.is_none()) => {
            log::error!("{}: {}", err.metric, err.message);
            std::process::exit(1);
        }
        _ => Ok(()),
    }
}

fn print_text(snapshot: &DashboardSnapshot) {
    println!("Analytics for {}", snapshot.subject.as_deref().unwrap_or("-"));

    if let Some(err) = &snapshot.aggregate.error {
        println!("Error ({}): {}", err.metric, err.message);
    } else if let Some(stale) = &snapshot.aggregate.stale {
        println!("Data may be outdated: {}. Re-run with --prefer-fresh.", stale.banner());
    }

    for m in &snapshot.metrics {
        let status = match (&m.data, &m.error) {
            (_, Some(e)) => format!("error: {e}"),
            (Some(_), None) if m.metadata.is_stale => "ok (stale)".to_string(),
            (Some(_), None) => "ok".to_string(),
            (None, None) if m.loading => "loading".to_string(),
            (None, None) => "-".to_string(),
        };
        println!("  {:<32} [{}] {}", m.metric.title(), m.window.label(), status);
        if let Some(summary) = m.data.as_ref().and_then(|d| headline(m.metric, d)) {
            println!("      {summary}");
        }
    }
}

fn print_weak(weak: &WeakTags) {
    println!(
        "  Weak tags (at least {} below {:.0} average)",
        weak.threshold_used, weak.overall_average_rating
    );
    if weak.weak_tags.is_empty() {
        println!("      none");
    }
    for tag in &weak.weak_tags {
        println!(
            "      {:<24} avg {:.0} over {} problems",
            tag.tag, tag.average_rating, tag.problem_count
        );
    }
}

/// One-line summary of a metric payload
fn headline(kind: MetricKind, data: &serde_json::Value) -> Option<String> {
    match kind {
        MetricKind::DifficultyDistribution => {
            Some(format!("total solved: {}", data["total_solved"].as_u64()?))
        }
        MetricKind::TagRatings => Some(format!(
            "overall median rating: {:.0}",
            data["overall_median_rating"].as_f64()?
        )),
        MetricKind::AbandonedByTags | MetricKind::AbandonedByRatings => Some(format!(
            "abandoned problems: {}",
            data["total_abandoned_problems"].as_u64()?
        )),
        MetricKind::DivisionProblems => Some(format!(
            "contests: {}, problems solved: {}",
            data["total_contests"].as_u64()?,
            data["total_problems_solved"].as_u64()?
        )),
    }
}

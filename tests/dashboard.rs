//! Dashboard: fan-out across metrics and derived aggregate state

mod common;

use cfdash::dashboard::{Dashboard, MetricKind};
use cfdash::fetcher::FetchPolicy;
use cfdash::TimeWindow;
use common::*;
use std::sync::Arc;
use std::time::Duration;

fn dashboard(transport: &Arc<ScriptedTransport>) -> Dashboard {
    Dashboard::new(transport.clone(), FetchPolicy::default())
}

fn route(kind: MetricKind, subject: &str) -> String {
    format!("{}/{subject}", kind.resource())
}

fn body(kind: MetricKind) -> String {
    match kind {
        MetricKind::DifficultyDistribution => difficulty_body(1500),
        MetricKind::TagRatings => TAG_RATINGS_BODY.to_string(),
        MetricKind::AbandonedByTags => ABANDONED_TAGS_BODY.to_string(),
        MetricKind::AbandonedByRatings => ABANDONED_RATINGS_BODY.to_string(),
        MetricKind::DivisionProblems => DIVISIONS_BODY.to_string(),
    }
}

/// Script `n` fresh successes for every metric of `subject`
fn script_all_ok(transport: &ScriptedTransport, subject: &str, n: usize) {
    for kind in MetricKind::ALL {
        transport.push_n(&route(kind, subject), n, ok_fresh(&body(kind)));
    }
}

#[tokio::test(start_paused = true)]
async fn loads_every_metric_for_subject() {
    let transport = ScriptedTransport::new();
    script_all_ok(&transport, "tourist", 1);

    let mut dash = dashboard(&transport);
    dash.set_subject("tourist");
    assert!(dash.initial_loading());

    dash.settle().await;
    assert!(!dash.initial_loading());
    assert!(!dash.any_loading());
    assert!(dash.first_error().is_none());
    assert!(dash.stale_notice().is_none());

    assert_eq!(dash.difficulty().data().unwrap().total_solved, 1500);
    assert_eq!(dash.tag_ratings().data().unwrap().tags[0].tag, "dp");
    assert_eq!(dash.abandoned_tags().data().unwrap().total_abandoned_problems, 3);
    assert_eq!(dash.abandoned_ratings().data().unwrap().ratings[0].rating, 3000);
    assert_eq!(dash.divisions().data().unwrap().total_contests, 200);
    assert_eq!(transport.calls().len(), 5);
}

#[tokio::test(start_paused = true)]
async fn first_data_ends_initial_loading() {
    let transport = ScriptedTransport::new();
    for kind in MetricKind::ALL {
        let delay = match kind {
            MetricKind::DivisionProblems => Duration::from_secs(1),
            _ => Duration::from_secs(5),
        };
        transport.push(&route(kind, "tourist"), ok(&body(kind)).after(delay));
    }

    let mut dash = dashboard(&transport);
    dash.set_subject("tourist");

    assert_eq!(dash.pump().await, Some(MetricKind::DivisionProblems));
    assert!(!dash.initial_loading());
    assert!(dash.any_loading());
    assert!(dash.difficulty().loading());

    dash.settle().await;
    assert!(!dash.any_loading());
}

#[tokio::test(start_paused = true)]
async fn first_error_follows_metric_order() {
    let transport = ScriptedTransport::new();
    transport
        .push(
            &route(MetricKind::DifficultyDistribution, "tourist"),
            ok(&body(MetricKind::DifficultyDistribution)),
        )
        .push(
            &route(MetricKind::TagRatings, "tourist"),
            status(503).after(Duration::from_secs(2)),
        )
        .push(
            &route(MetricKind::AbandonedByTags, "tourist"),
            ok(&body(MetricKind::AbandonedByTags)),
        )
        .push(
            &route(MetricKind::AbandonedByRatings, "tourist"),
            ok(&body(MetricKind::AbandonedByRatings)),
        )
        // fails first in time, but ranks last
        .push(&route(MetricKind::DivisionProblems, "tourist"), status(404));
    let mut dash = dashboard(&transport);
    dash.set_subject("tourist");
    dash.settle().await;

    let err = dash.first_error().unwrap();
    assert_eq!(err.metric, MetricKind::TagRatings);
    assert_eq!(
        err.message,
        "Service is temporarily unavailable. Please try again later."
    );
    assert_eq!(
        dash.divisions().error(),
        Some("User not found on Codeforces")
    );
    assert!(!dash.initial_loading());
}

#[tokio::test(start_paused = true)]
async fn stale_notice_reports_age_in_hours() {
    let transport = ScriptedTransport::new();
    for kind in MetricKind::ALL {
        let step = match kind {
            MetricKind::AbandonedByTags => ok_stale(&body(kind), 18000),
            MetricKind::DivisionProblems => ok_stale(&body(kind), 90000),
            _ => ok_fresh(&body(kind)),
        };
        transport.push(&route(kind, "tourist"), step);
    }

    let mut dash = dashboard(&transport);
    dash.set_subject("tourist");
    dash.settle().await;

    let notice = dash.stale_notice().unwrap();
    assert_eq!(notice.metric, MetricKind::AbandonedByTags);
    assert_eq!(notice.banner(), "This data is 5 hours old");
    assert_eq!(dash.aggregate().stale, Some(notice));
}

#[tokio::test(start_paused = true)]
async fn stale_without_age_uses_generic_banner() {
    let transport = ScriptedTransport::new();
    let mut stale = ok(&difficulty_body(1));
    if let Ok(res) = stale.outcome.as_mut() {
        *res = res.clone().with_header("X-Data-Stale", "true");
    }
    transport.push(&route(MetricKind::DifficultyDistribution, "tourist"), stale);

    let mut dash = dashboard(&transport);
    dash.set_subject("tourist");
    dash.settle().await;

    let notice = dash.stale_notice().unwrap();
    assert_eq!(notice.metric, MetricKind::DifficultyDistribution);
    assert_eq!(notice.banner(), "This data is older than 4 hours");
}

#[tokio::test(start_paused = true)]
async fn refresh_all_bypasses_cache_everywhere() {
    let transport = ScriptedTransport::new();
    script_all_ok(&transport, "tourist", 2);

    let mut dash = dashboard(&transport);
    dash.set_subject("tourist");
    dash.settle().await;
    dash.refresh_all();
    assert!(dash.any_loading());
    dash.settle().await;

    for kind in MetricKind::ALL {
        let calls = transport.calls_to(&route(kind, "tourist"));
        assert_eq!(calls.len(), 2, "{kind}");
        assert_eq!(calls[0].query, "window=all_time");
        assert_eq!(calls[1].query, "window=all_time&prefer_fresh=true");
    }
    assert!(dash.first_error().is_none());
}

#[tokio::test(start_paused = true)]
async fn refresh_all_clears_errors_on_success() {
    let transport = ScriptedTransport::new();
    for kind in MetricKind::ALL {
        transport
            .push(&route(kind, "tourist"), status(503))
            .push(&route(kind, "tourist"), ok(&body(kind)));
    }

    let mut dash = dashboard(&transport);
    dash.set_subject("tourist");
    dash.settle().await;
    assert_eq!(
        dash.first_error().map(|e| e.metric),
        Some(MetricKind::DifficultyDistribution)
    );

    dash.refresh_all();
    dash.settle().await;
    assert!(dash.first_error().is_none());
}

#[tokio::test(start_paused = true)]
async fn subject_change_refetches_every_metric() {
    let transport = ScriptedTransport::new();
    script_all_ok(&transport, "tourist", 1);
    script_all_ok(&transport, "petr", 1);

    let mut dash = dashboard(&transport);
    dash.set_subject("tourist");
    dash.settle().await;
    dash.set_subject("petr");

    assert_eq!(dash.subject(), Some("petr"));
    assert!(dash.initial_loading());
    dash.settle().await;

    for kind in MetricKind::ALL {
        assert_eq!(transport.calls_to(&route(kind, "petr")).len(), 1, "{kind}");
        assert!(dash.session(kind).has_data());
    }
}

#[tokio::test(start_paused = true)]
async fn window_change_refetches_only_that_metric() {
    let transport = ScriptedTransport::new();
    script_all_ok(&transport, "tourist", 1);
    transport.push(
        "tag-ratings/tourist?window=half_year",
        ok(TAG_RATINGS_BODY),
    );

    let mut dash = dashboard(&transport);
    dash.set_subject("tourist");
    dash.settle().await;

    dash.set_window(MetricKind::TagRatings, TimeWindow::HalfYear);
    assert!(dash.tag_ratings().loading());
    assert!(!dash.difficulty().loading());
    dash.settle().await;

    assert_eq!(transport.calls().len(), 6);
    assert_eq!(dash.tag_ratings().window(), TimeWindow::HalfYear);
    assert_eq!(dash.difficulty().window(), TimeWindow::AllTime);
}

#[tokio::test(start_paused = true)]
async fn empty_subject_leaves_dashboard_idle() {
    let transport = ScriptedTransport::new();
    let mut dash = dashboard(&transport);
    dash.set_subject("   ");

    assert_eq!(dash.subject(), None);
    assert!(!dash.initial_loading());
    assert!(!dash.any_loading());
    dash.refresh_all();
    assert!(transport.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn snapshot_lists_metrics_in_priority_order() {
    let transport = ScriptedTransport::new();
    script_all_ok(&transport, "tourist", 1);

    let mut dash = dashboard(&transport);
    dash.set_subject("tourist");
    dash.settle().await;

    let snap = dash.snapshot();
    let kinds: Vec<MetricKind> = snap.metrics.iter().map(|m| m.metric).collect();
    assert_eq!(kinds, MetricKind::ALL.to_vec());

    let json = serde_json::to_value(&snap).unwrap();
    assert_eq!(json["subject"], "tourist");
    assert_eq!(json["metrics"][0]["metric"], "difficulty_distribution");
    assert_eq!(json["metrics"][0]["data"]["total_solved"], 1500);
    assert_eq!(json["aggregate"]["initial_loading"], false);
}

#[tokio::test(start_paused = true)]
async fn refresh_right_after_subject_change_runs_one_cycle() {
    let transport = ScriptedTransport::new();
    for kind in MetricKind::ALL {
        let job = format!("job-{}", kind.resource().replace('/', "-"));
        transport
            .push(&route(kind, "tourist"), processing(&job))
            .push(&route(kind, "tourist"), ok(&body(kind)))
            .push(&format!("tasks/{job}"), task_done());
    }

    let mut dash = dashboard(&transport);
    dash.set_subject("tourist");
    dash.refresh_all();
    dash.settle().await;
    tokio::time::sleep(Duration::from_secs(60)).await;

    for kind in MetricKind::ALL {
        let calls = transport.calls_to(&route(kind, "tourist"));
        let queries: Vec<&str> = calls.iter().map(|c| c.query.as_str()).collect();
        assert_eq!(
            queries,
            vec!["window=all_time&prefer_fresh=true", "window=all_time"],
            "{kind}"
        );
    }
    assert_eq!(transport.calls().len(), 15);
    assert!(dash.first_error().is_none());
}

#[tokio::test(start_paused = true)]
async fn fresh_subject_change_bypasses_cache_once() {
    let transport = ScriptedTransport::new();
    script_all_ok(&transport, "tourist", 1);

    let mut dash = dashboard(&transport);
    dash.set_subject_with("tourist", true);
    dash.settle().await;

    let calls = transport.calls();
    assert_eq!(calls.len(), 5);
    assert!(calls
        .iter()
        .all(|c| c.query == "window=all_time&prefer_fresh=true"));
    assert!(MetricKind::ALL.iter().all(|k| dash.session(*k).has_data()));
}

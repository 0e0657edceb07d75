use std::collections::HashMap;
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use live_diff::{
    DiffRequest, DiffResponse, RequestScheduler, ResponseOutcome, SchedulerConfig,
    SchedulerState, SchedulerStats,
};
use text_diff::DiffConfig;

fn request(right: &str) -> DiffRequest {
    DiffRequest::new("base", right, &DiffConfig::default())
}

fn ms(base: Instant, offset: u64) -> Instant {
    base + Duration::from_millis(offset)
}

#[test]
fn test_edits_coalesce_while_inflight() {
    let mut scheduler = RequestScheduler::default();
    let t0 = Instant::now();

    let first = scheduler.on_edit(request("1"), t0).unwrap();
    assert_eq!(first.seq, 1);

    for (i, text) in ["2", "3", "4"].iter().enumerate() {
        assert!(scheduler.on_edit(request(text), ms(t0, 10 * (i as u64 + 1))).is_none());
    }
    assert_eq!(scheduler.state(), SchedulerState::InflightWithPending);
    assert_eq!(scheduler.pending(), Some(&request("4")));

    // The response clears the in-flight slot and arms the quiet period
    let outcome = scheduler.on_response(DiffResponse::empty(1), ms(t0, 50));
    assert!(outcome.is_published());
    assert_eq!(scheduler.state(), SchedulerState::Idle);
    assert_eq!(scheduler.next_deadline(), Some(ms(t0, 150)));

    assert!(scheduler.poll(ms(t0, 100)).is_none());
    let second = scheduler.poll(ms(t0, 150)).unwrap();
    assert_eq!(second.seq, 2);
    assert_eq!(second.request, request("4"));

    assert_eq!(
        scheduler.stats(),
        SchedulerStats {
            edits: 4,
            submitted: 2,
            published: 1,
            stale: 0,
        }
    );
}

#[test]
fn test_quiet_period_after_response() {
    let mut scheduler = RequestScheduler::default();
    let t0 = Instant::now();

    scheduler.on_edit(request("a"), t0).unwrap();
    scheduler.on_response(DiffResponse::empty(1), ms(t0, 20));
    assert_eq!(scheduler.state(), SchedulerState::Idle);
    assert_eq!(scheduler.next_deadline(), None);

    // Too soon after the response: wait
    assert!(scheduler.on_edit(request("b"), ms(t0, 60)).is_none());
    assert_eq!(scheduler.state(), SchedulerState::Idle);
    assert_eq!(scheduler.next_deadline(), Some(ms(t0, 120)));

    // A further edit inside the window just replaces the pending snapshot
    assert!(scheduler.on_edit(request("c"), ms(t0, 80)).is_none());
    let submission = scheduler.poll(ms(t0, 120)).unwrap();
    assert_eq!(submission.request, request("c"));

    // Once the window has passed, edits go straight out
    scheduler.on_response(DiffResponse::empty(2), ms(t0, 150));
    let submission = scheduler.on_edit(request("d"), ms(t0, 400)).unwrap();
    assert_eq!(submission.seq, 3);
}

#[test]
fn test_forced_submission_when_inflight_is_slow() {
    let config = SchedulerConfig::default().force_submit_after(Duration::from_secs(3));
    let mut scheduler = RequestScheduler::new(config);
    let t0 = Instant::now();

    scheduler.on_edit(request("slow"), t0).unwrap();
    assert!(scheduler.on_edit(request("newer"), ms(t0, 1_000)).is_none());
    assert_eq!(scheduler.next_deadline(), Some(ms(t0, 3_000)));

    assert!(scheduler.poll(ms(t0, 2_999)).is_none());
    let forced = scheduler.poll(ms(t0, 3_000)).unwrap();
    assert_eq!(forced.seq, 2);
    assert_eq!(forced.request, request("newer"));
    assert_eq!(scheduler.state(), SchedulerState::Inflight);

    // The forced request answers first; the slow one is then stale
    let outcome = scheduler.on_response(DiffResponse::empty(2), ms(t0, 3_100));
    assert_eq!(outcome, ResponseOutcome::Published(DiffResponse::empty(2)));
    assert_eq!(scheduler.state(), SchedulerState::Idle);

    let outcome = scheduler.on_response(DiffResponse::empty(1), ms(t0, 9_000));
    assert_eq!(outcome, ResponseOutcome::Stale(DiffResponse::empty(1)));
    assert_eq!(scheduler.last_published(), Some(2));
    assert_eq!(scheduler.stats().stale, 1);
}

#[test]
fn test_stale_response_keeps_quiet_window() {
    let mut scheduler = RequestScheduler::default();
    let t0 = Instant::now();

    scheduler.on_edit(request("slow"), t0).unwrap();
    scheduler.on_edit(request("newer"), ms(t0, 1_000));
    scheduler.poll(ms(t0, 3_000)).unwrap();
    scheduler.on_response(DiffResponse::empty(2), ms(t0, 3_100));

    assert!(scheduler.on_edit(request("latest"), ms(t0, 3_150)).is_none());
    assert_eq!(scheduler.next_deadline(), Some(ms(t0, 3_200)));

    // The overtaken request finally answers; the window does not move
    let outcome = scheduler.on_response(DiffResponse::empty(1), ms(t0, 3_180));
    assert!(!outcome.is_published());
    assert_eq!(scheduler.next_deadline(), Some(ms(t0, 3_200)));

    let submission = scheduler.poll(ms(t0, 3_200)).unwrap();
    assert_eq!(submission.request, request("latest"));
}

#[test]
fn test_burst_is_bounded_by_the_coalescing_window() {
    // 50 edits 5 ms apart, 20 ms per computation, 100 ms quiet period.
    // Each round trip covers 120 ms of typing, so the 245 ms burst needs
    // three computations plus one for the final edit.
    let gaps: Vec<u64> = std::iter::once(0).chain(std::iter::repeat(5).take(49)).collect();
    let (published, texts, submitted) = simulate(&gaps, &[20]);

    assert_eq!(submitted, 4);
    assert_eq!(published, vec![1, 2, 3, 4]);
    assert_eq!(
        texts,
        vec!["edit 0", "edit 24", "edit 48", "edit 49"]
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>()
    );
}

#[test]
fn test_edit_after_overdue_submits_immediately() {
    let mut scheduler = RequestScheduler::default();
    let t0 = Instant::now();

    scheduler.on_edit(request("a"), t0).unwrap();
    let forced = scheduler.on_edit(request("b"), ms(t0, 5_000)).unwrap();
    assert_eq!(forced.seq, 2);
    assert_eq!(scheduler.inflight(), Some(2));
}

#[test]
fn test_older_response_is_published_while_newer_is_inflight() {
    let mut scheduler = RequestScheduler::default();
    let t0 = Instant::now();

    scheduler.on_edit(request("a"), t0).unwrap();
    assert!(scheduler.on_edit(request("b"), ms(t0, 10)).is_none());
    scheduler.poll(ms(t0, 3_000)).unwrap();
    assert_eq!(scheduler.inflight(), Some(2));

    // Request 1 is still newer than anything shown so far
    assert!(scheduler
        .on_response(DiffResponse::empty(1), ms(t0, 3_050))
        .is_published());
    assert_eq!(scheduler.state(), SchedulerState::Inflight);

    assert!(scheduler
        .on_response(DiffResponse::empty(2), ms(t0, 3_100))
        .is_published());
    assert_eq!(scheduler.state(), SchedulerState::Idle);
}

#[test]
fn test_reset_keeps_sequence_numbers_monotonic() {
    let mut scheduler = RequestScheduler::default();
    let t0 = Instant::now();

    scheduler.on_edit(request("a"), t0).unwrap();
    scheduler.on_edit(request("b"), ms(t0, 10));
    scheduler.on_response(DiffResponse::empty(1), ms(t0, 20));
    scheduler.reset();

    assert_eq!(scheduler.state(), SchedulerState::Idle);
    assert_eq!(scheduler.pending(), None);
    assert_eq!(scheduler.next_deadline(), None);
    assert!(scheduler.poll(ms(t0, 1_000)).is_none());

    let submission = scheduler.on_edit(request("c"), ms(t0, 30)).unwrap();
    assert_eq!(submission.seq, 2);
    assert_eq!(
        scheduler.on_response(DiffResponse::empty(1), ms(t0, 40)),
        ResponseOutcome::Stale(DiffResponse::empty(1))
    );
}

#[test]
fn test_cancel_timers_keeps_pending() {
    let mut scheduler = RequestScheduler::default();
    let t0 = Instant::now();

    scheduler.on_edit(request("a"), t0).unwrap();
    scheduler.on_edit(request("b"), ms(t0, 10));
    scheduler.cancel_timers();

    assert_eq!(scheduler.state(), SchedulerState::Idle);
    let submission = scheduler.poll(ms(t0, 20)).unwrap();
    assert_eq!(submission.request, request("b"));
}

/// Run a scheduler against a simulated worker, one millisecond at a time.
/// Returns the published sequence numbers, the texts behind them and the
/// number of submissions.
fn simulate(gaps: &[u64], latencies: &[u64]) -> (Vec<u64>, Vec<String>, u64) {
    let mut scheduler = RequestScheduler::default();
    let base = Instant::now();

    let mut edit_times = Vec::new();
    let mut at = 0;
    for gap in gaps {
        at += gap;
        edit_times.push(at);
    }
    let end = at + 20_000;

    let mut texts: HashMap<u64, String> = HashMap::new();
    let mut due: Vec<(u64, u64)> = Vec::new();
    let mut published = Vec::new();
    let mut published_texts = Vec::new();
    let mut submitted = 0u64;

    let mut next_edit = 0;
    for t in 0..=end {
        let now = ms(base, t);
        let mut submissions = Vec::new();

        while next_edit < edit_times.len() && edit_times[next_edit] == t {
            let text = format!("edit {}", next_edit);
            submissions.extend(scheduler.on_edit(request(&text), now));
            next_edit += 1;
        }

        let (ready, waiting): (Vec<_>, Vec<_>) =
            due.into_iter().partition(|(when, _)| *when <= t);
        due = waiting;
        for (_, seq) in ready {
            if let ResponseOutcome::Published(response) =
                scheduler.on_response(DiffResponse::empty(seq), now)
            {
                published.push(response.seq);
                published_texts.push(texts[&response.seq].clone());
            }
        }

        submissions.extend(scheduler.poll(now));
        for submission in submissions {
            let latency = latencies[submitted as usize % latencies.len()];
            texts.insert(submission.seq, submission.request.right_text.clone());
            due.push((t + latency, submission.seq));
            submitted += 1;
        }
    }

    (published, published_texts, submitted)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn latest_edit_is_always_displayed_last(
        gaps in prop::collection::vec(0u64..400, 1..20),
        latencies in prop::collection::vec(0u64..5_000, 1..5),
    ) {
        let (published, texts, submitted) = simulate(&gaps, &latencies);

        prop_assert!(published.windows(2).all(|pair| pair[0] < pair[1]));
        prop_assert!(submitted as usize <= gaps.len());

        // Submissions are at least one quiet period apart, and at most one
        // follows the last edit
        let span: u64 = gaps.iter().sum();
        prop_assert!(submitted <= span / 100 + 2);
        prop_assert_eq!(texts.last().cloned(), Some(format!("edit {}", gaps.len() - 1)));
    }
}

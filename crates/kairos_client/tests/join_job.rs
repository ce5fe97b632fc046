mod common;

use std::sync::Mutex;
use std::time::Duration;

use common::{failed, finished, running, ScriptedApi};
use kairos_client::{join_job, JobOutcome, JobRef, NoProgress, PollSettings};
use kairos_core::Job;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<Job>>,
}

impl kairos_client::ProgressSink for Recorder {
    fn on_progress(&self, job: &Job) {
        self.seen.lock().unwrap().push(job.clone());
    }
}

fn settings(interval_ms: u64) -> PollSettings {
    PollSettings::unbounded(Duration::from_millis(interval_ms))
}

#[tokio::test(start_paused = true)]
async fn callback_sees_each_running_snapshot_then_output_is_returned() {
    let api = ScriptedApi::default();
    api.script([running("j1"), running("j1"), finished("j1", json!("X"))]);
    let recorder = Recorder::default();

    let outcome = join_job(
        &api,
        &JobRef::scoped("nb", "j1"),
        &settings(250),
        &CancellationToken::new(),
        &recorder,
    )
    .await
    .unwrap();

    assert_eq!(outcome, JobOutcome::Succeeded(Some(json!("X"))));
    assert_eq!(recorder.seen.lock().unwrap().len(), 2);
    assert_eq!(api.check_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn already_finished_job_never_calls_back() {
    let api = ScriptedApi::default();
    api.script([finished("j1", json!({"k": 1}))]);
    let recorder = Recorder::default();

    let outcome = join_job(
        &api,
        &JobRef::Global("j1".into()),
        &settings(250),
        &CancellationToken::new(),
        &recorder,
    )
    .await
    .unwrap();

    assert_eq!(outcome.output_text().as_deref(), Some(r#"{"k":1}"#));
    assert!(recorder.seen.lock().unwrap().is_empty());
    assert_eq!(api.check_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn checks_are_spaced_by_the_interval() {
    let api = ScriptedApi::default();
    api.script([
        running("j1"),
        running("j1"),
        running("j1"),
        finished("j1", json!(null)),
    ]);

    join_job(
        &api,
        &JobRef::scoped("nb", "j1"),
        &settings(400),
        &CancellationToken::new(),
        &NoProgress,
    )
    .await
    .unwrap();

    let times = api.check_times();
    assert_eq!(times.len(), 4);
    for pair in times.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(400));
    }
}

#[tokio::test(start_paused = true)]
async fn job_error_is_failed_outcome_not_transport_error() {
    let api = ScriptedApi::default();
    api.script([running("j1"), failed("j1", "model unavailable")]);

    let outcome = join_job(
        &api,
        &JobRef::scoped("nb", "j1"),
        &settings(100),
        &CancellationToken::new(),
        &NoProgress,
    )
    .await
    .unwrap();

    assert_eq!(
        outcome,
        JobOutcome::Failed {
            job_id: "j1".into(),
            reason: "model unavailable".into()
        }
    );
}

#[tokio::test(start_paused = true)]
async fn attempt_bound_gives_up_on_a_stuck_job() {
    let api = ScriptedApi::default();
    api.script([running("j1")]);
    let settings = PollSettings {
        max_attempts: Some(5),
        ..settings(100)
    };

    let outcome = join_job(
        &api,
        &JobRef::scoped("nb", "j1"),
        &settings,
        &CancellationToken::new(),
        &NoProgress,
    )
    .await
    .unwrap();

    assert!(matches!(outcome, JobOutcome::TimedOut { attempts: 5, .. }));
    assert_eq!(api.check_count(), 5);
}

#[tokio::test(start_paused = true)]
async fn duration_bound_gives_up_on_a_stuck_job() {
    let api = ScriptedApi::default();
    api.script([running("j1")]);
    let settings = PollSettings {
        max_duration: Some(Duration::from_secs(2)),
        ..settings(500)
    };

    let outcome = join_job(
        &api,
        &JobRef::scoped("nb", "j1"),
        &settings,
        &CancellationToken::new(),
        &NoProgress,
    )
    .await
    .unwrap();

    match outcome {
        JobOutcome::TimedOut { elapsed, .. } => assert!(elapsed >= Duration::from_secs(2)),
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_the_wait() {
    let api = ScriptedApi::default();
    api.script([running("j1")]);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1_100)).await;
        trigger.cancel();
    });

    let outcome = join_job(
        &api,
        &JobRef::scoped("nb", "j1"),
        &settings(500),
        &cancel,
        &NoProgress,
    )
    .await
    .unwrap();

    assert_eq!(outcome, JobOutcome::Cancelled);
    assert_eq!(api.check_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn cancelled_before_start_makes_no_request() {
    let api = ScriptedApi::default();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = join_job(
        &api,
        &JobRef::scoped("nb", "j1"),
        &settings(500),
        &cancel,
        &NoProgress,
    )
    .await
    .unwrap();

    assert_eq!(outcome, JobOutcome::Cancelled);
    assert_eq!(api.check_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn transport_error_ends_polling() {
    // Nothing scripted: the first check fails.
    let api = ScriptedApi::default();

    let err = join_job(
        &api,
        &JobRef::scoped("nb", "j1"),
        &settings(500),
        &CancellationToken::new(),
        &NoProgress,
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind, kairos_client::ApiErrorKind::Decode);
}

#[tokio::test(start_paused = true)]
async fn closures_work_as_progress_sinks() {
    let api = ScriptedApi::default();
    api.script([running("j1"), finished("j1", json!("done"))]);
    let count = std::sync::atomic::AtomicUsize::new(0);
    let sink = |_: &Job| {
        count.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    };

    join_job(
        &api,
        &JobRef::scoped("nb", "j1"),
        &settings(10),
        &CancellationToken::new(),
        &sink,
    )
    .await
    .unwrap();

    assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 1);
}

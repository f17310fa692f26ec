//! Job creator behavior against a recording store and scripted events.

mod common;

use common::{RecordingStore, ScriptedEvents};
use queuing_system::console::Console;
use queuing_system::engine::{JobCreator, JobOutcome};
use queuing_system::event::{JobEvent, JobEventKind};
use queuing_system::model::{JobId, NOTIFICATION_QUEUE, Priority};

const CREATED: &str = "Notification job created: 7";
const COMPLETED: &str = "Notification job completed";
const FAILED: &str = "Notification job failed";

fn event(id: u64, kind: JobEventKind) -> JobEvent {
    JobEvent::new(JobId(id), kind)
}

fn count(lines: &[String], wanted: &str) -> usize {
    lines.iter().filter(|l| *l == wanted).count()
}

#[tokio::test]
async fn saves_exactly_one_notification_job() {
    let store = RecordingStore::new(7);
    let events = ScriptedEvents::new(vec![event(7, JobEventKind::Enqueue)]);

    JobCreator::new(store.clone(), events)
        .run(&mut Console::buffered())
        .await
        .unwrap();

    let saved = store.saved();
    assert_eq!(saved.len(), 1);
    let job = &saved[0];
    assert_eq!(job.job_type(), NOTIFICATION_QUEUE);
    assert_eq!(job.data()["phoneNumber"], "0123456789");
    assert_eq!(job.data()["message"], "Account registered");
    assert_eq!(job.data().as_object().map(|o| o.len()), Some(2));
}

#[tokio::test]
async fn priority_and_attempts_reach_the_saved_job() {
    let store = RecordingStore::new(7);
    let events = ScriptedEvents::new(vec![event(7, JobEventKind::Enqueue)]);

    JobCreator::new(store.clone(), events)
        .priority(Priority::High)
        .attempts(3)
        .run(&mut Console::buffered())
        .await
        .unwrap();

    let saved = store.saved();
    assert_eq!(saved[0].priority_score(), -10);
    assert_eq!(saved[0].max_attempts(), 3);
}

#[tokio::test]
async fn defaults_save_a_normal_single_attempt_job() {
    let store = RecordingStore::new(7);
    let events = ScriptedEvents::new(vec![]);

    JobCreator::new(store.clone(), events)
        .attempts(0)
        .run(&mut Console::buffered())
        .await
        .unwrap();

    let saved = store.saved();
    assert_eq!(saved[0].priority_score(), 0);
    assert_eq!(saved[0].max_attempts(), 1, "attempts are clamped to at least one");
}

#[tokio::test]
async fn each_observed_event_prints_one_line() {
    let events = ScriptedEvents::new(vec![
        event(7, JobEventKind::Enqueue),
        event(7, JobEventKind::Start),
        event(7, JobEventKind::FailedAttempt).with_arg("sms gateway timeout"),
        event(7, JobEventKind::Start),
        event(7, JobEventKind::Progress).with_arg(50),
        event(7, JobEventKind::Complete),
    ]);
    let mut console = Console::buffered();

    let outcome = JobCreator::new(RecordingStore::new(7), events)
        .run(&mut console)
        .await
        .unwrap();

    assert_eq!(outcome, JobOutcome::Completed(JobId(7)));
    let lines = console.out_lines();
    assert_eq!(lines, vec![CREATED, FAILED, COMPLETED]);
    for wanted in [CREATED, FAILED, COMPLETED] {
        assert_eq!(count(&lines, wanted), 1, "{wanted:?} in {lines:?}");
    }
}

#[tokio::test]
async fn events_for_other_jobs_are_ignored() {
    let events = ScriptedEvents::new(vec![
        event(6, JobEventKind::Enqueue),
        event(7, JobEventKind::Enqueue),
        event(8, JobEventKind::Complete),
        event(6, JobEventKind::FailedAttempt),
        event(7, JobEventKind::Complete),
    ]);
    let mut console = Console::buffered();

    let outcome = JobCreator::new(RecordingStore::new(7), events)
        .run(&mut console)
        .await
        .unwrap();

    assert_eq!(outcome, JobOutcome::Completed(JobId(7)));
    assert_eq!(console.out_lines(), vec![CREATED, COMPLETED]);
}

#[tokio::test]
async fn final_failure_stops_watching_without_an_attempt_line() {
    let events = ScriptedEvents::new(vec![
        event(7, JobEventKind::Enqueue),
        event(7, JobEventKind::Start),
        event(7, JobEventKind::Failed).with_arg("invalid phone number"),
        event(7, JobEventKind::Complete),
    ]);
    let mut console = Console::buffered();

    let outcome = JobCreator::new(RecordingStore::new(7), events)
        .run(&mut console)
        .await
        .unwrap();

    assert_eq!(outcome, JobOutcome::Failed(JobId(7)));
    assert_eq!(console.out_lines(), vec![CREATED]);
}

#[tokio::test]
async fn watching_stops_at_the_first_terminal_state() {
    // A retried job: the failed attempt is not terminal, completion is.
    let events = ScriptedEvents::new(vec![
        event(7, JobEventKind::Enqueue),
        event(7, JobEventKind::Start),
        event(7, JobEventKind::FailedAttempt),
        event(7, JobEventKind::Start),
        event(7, JobEventKind::Complete),
        event(7, JobEventKind::FailedAttempt),
    ]);
    let mut console = Console::buffered();

    let outcome = JobCreator::new(RecordingStore::new(7), events)
        .run(&mut console)
        .await
        .unwrap();

    assert_eq!(outcome, JobOutcome::Completed(JobId(7)));
    assert_eq!(console.out_lines(), vec![CREATED, FAILED, COMPLETED]);
}

#[tokio::test]
async fn closed_event_feed_detaches() {
    let events = ScriptedEvents::new(vec![event(7, JobEventKind::Enqueue)]);
    let mut console = Console::buffered();

    let outcome = JobCreator::new(RecordingStore::new(7), events)
        .run(&mut console)
        .await
        .unwrap();

    assert_eq!(outcome, JobOutcome::Detached(JobId(7)));
    assert_eq!(console.out_lines(), vec![CREATED]);
}

#[tokio::test]
async fn shutdown_detaches_from_a_quiet_feed() {
    let creator = JobCreator::new(RecordingStore::new(7), ScriptedEvents::new(vec![]).hanging());
    creator.shutdown_handle().notify_one();

    let outcome = creator.run(&mut Console::buffered()).await.unwrap();

    assert_eq!(outcome, JobOutcome::Detached(JobId(7)));
}

#[tokio::test]
async fn failed_save_is_an_error_and_prints_nothing() {
    let store = RecordingStore::failing();
    let mut console = Console::buffered();

    let result = JobCreator::new(store.clone(), ScriptedEvents::new(vec![]))
        .run(&mut console)
        .await;

    assert!(result.is_err());
    assert!(store.saved().is_empty());
    assert!(console.out_lines().is_empty());
}

#[tokio::test]
async fn out_of_order_events_are_tolerated() {
    // Complete without ever seeing the job start.
    let events = ScriptedEvents::new(vec![
        event(7, JobEventKind::Enqueue),
        event(7, JobEventKind::Complete),
    ]);
    let mut console = Console::buffered();

    let outcome = JobCreator::new(RecordingStore::new(7), events)
        .run(&mut console)
        .await
        .unwrap();

    assert_eq!(outcome, JobOutcome::Completed(JobId(7)));
    assert_eq!(console.out_lines(), vec![CREATED, COMPLETED]);
}

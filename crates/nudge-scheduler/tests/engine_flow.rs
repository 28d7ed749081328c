// Drive the scheduler end-to-end against paused Tokio time: in-memory SQLite
// stores, a pinned manual clock, and a mock sender at the notification seam.
// Each test advances time explicitly and asserts on the execution log.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Duration as Span, TimeZone, Utc};
use rusqlite::Connection;

use nudge_core::ReminderMessage;
use nudge_notify::{NotificationSender, NotifyError};
use nudge_scheduler::{
    Clock, ExecutionLog, ExecutionStatus, NewTask, SchedulerEngine, SchedulerError, TaskChanges,
    TaskState, TaskStore, DELIVERED_MESSAGE,
};
use nudge_users::UserDirectory;

/// Wall-clock origin for every test: 2026-03-10 12:00:00 UTC.
fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
}

struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    fn tick(&self, span: Span) {
        let mut now = self.now.lock().unwrap();
        *now = *now + span;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Records every accepted reminder.
#[derive(Default)]
struct RecordingSender {
    sent: Mutex<Vec<ReminderMessage>>,
}

#[async_trait]
impl NotificationSender for RecordingSender {
    async fn send(&self, msg: &ReminderMessage) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(msg.clone());
        Ok(())
    }
}

/// Fails every send with a fixed reason.
struct FailingSender;

#[async_trait]
impl NotificationSender for FailingSender {
    async fn send(&self, _msg: &ReminderMessage) -> Result<(), NotifyError> {
        Err(NotifyError::SendFailed("relay rejected the message".into()))
    }
}

struct Harness {
    engine: SchedulerEngine,
    clock: Arc<ManualClock>,
    sender: Arc<RecordingSender>,
    db: Arc<Mutex<Connection>>,
    /// Ada, the registered user every test schedules for.
    user_id: String,
}

fn scheduler_db() -> Arc<Mutex<Connection>> {
    let conn = Connection::open_in_memory().unwrap();
    nudge_scheduler::db::init_db(&conn).unwrap();
    Arc::new(Mutex::new(conn))
}

fn user_directory() -> (UserDirectory, String) {
    let conn = Connection::open_in_memory().unwrap();
    nudge_users::db::init_db(&conn).unwrap();
    let dir = UserDirectory::new(Arc::new(Mutex::new(conn)));
    let user = dir.create("Ada", "ada@example.com", "UTC").unwrap();
    (dir, user.id)
}

fn build_with(
    sender: Arc<dyn NotificationSender>,
) -> (SchedulerEngine, Arc<ManualClock>, Arc<Mutex<Connection>>, String) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let db = scheduler_db();
    let (users, user_id) = user_directory();
    let clock = Arc::new(ManualClock::new(start_time()));
    let engine = SchedulerEngine::new(
        TaskStore::new(Arc::clone(&db)),
        ExecutionLog::new(Arc::clone(&db)),
        users,
        sender,
        Arc::clone(&clock) as Arc<dyn Clock>,
        Duration::from_secs(30),
    );
    (engine, clock, db, user_id)
}

fn harness() -> Harness {
    let sender = Arc::new(RecordingSender::default());
    let (engine, clock, db, user_id) = build_with(Arc::clone(&sender) as Arc<dyn NotificationSender>);
    Harness {
        engine,
        clock,
        sender,
        db,
        user_id,
    }
}

/// Advance both clocks in lockstep, then let armed sleepers run.
async fn advance(clock: &ManualClock, span: Span) {
    // Let freshly spawned sleepers poll and register their deadlines against
    // the current (pre-advance) paused clock before time jumps forward.
    settle().await;
    clock.tick(span);
    tokio::time::advance(span.to_std().unwrap()).await;
    settle().await;
}

/// Yield until spawned fire tasks have run to completion.
async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

fn entries_with(
    engine: &SchedulerEngine,
    user_id: &str,
    status: ExecutionStatus,
) -> Vec<nudge_scheduler::ExecutionEntry> {
    engine
        .history_for(user_id)
        .unwrap()
        .into_iter()
        .filter(|e| e.status == status)
        .collect()
}

#[tokio::test(start_paused = true)]
async fn fires_exactly_once_at_the_target_instant() {
    let h = harness();
    let task = h
        .engine
        .schedule(&h.user_id, "Pay rent", "2026-03-10 13:00", "UTC")
        .unwrap();
    assert!(h.engine.is_armed(&task.id));

    advance(&h.clock, Span::minutes(59)).await;
    assert!(h.engine.history_for(&h.user_id).unwrap().is_empty());

    advance(&h.clock, Span::minutes(1)).await;
    let successes = entries_with(&h.engine, &h.user_id, ExecutionStatus::Success);
    assert_eq!(successes.len(), 1);
    assert_eq!(successes[0].task_name, "Pay rent");
    assert_eq!(successes[0].message, DELIVERED_MESSAGE);

    let sent = h.sender.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].destination, "ada@example.com");

    // Single-shot: the trigger is consumed, the task is Fired, and no
    // amount of further waiting produces a second execution.
    assert!(!h.engine.is_armed(&task.id));
    let tasks = h.engine.tasks_for(&h.user_id).unwrap();
    assert_eq!(tasks[0].state, TaskState::Fired);

    advance(&h.clock, Span::hours(5)).await;
    assert_eq!(entries_with(&h.engine, &h.user_id, ExecutionStatus::Success).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn update_moves_the_trigger_to_the_new_instant() {
    let h = harness();
    let task = h
        .engine
        .schedule(&h.user_id, "Dentist", "2026-03-10 13:00", "UTC")
        .unwrap();

    h.engine
        .update(
            &h.user_id,
            &task.id,
            TaskChanges {
                name: None,
                target: Some("2026-03-10 14:00".to_string()),
            },
        )
        .unwrap();
    assert_eq!(entries_with(&h.engine, &h.user_id, ExecutionStatus::Updated).len(), 1);

    // Nothing fires at the original instant.
    advance(&h.clock, Span::hours(1)).await;
    assert!(entries_with(&h.engine, &h.user_id, ExecutionStatus::Success).is_empty());
    assert!(h.engine.is_armed(&task.id));

    // Exactly one execution at the new instant.
    advance(&h.clock, Span::hours(1)).await;
    assert_eq!(entries_with(&h.engine, &h.user_id, ExecutionStatus::Success).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn update_can_rename_without_rescheduling() {
    let h = harness();
    let task = h
        .engine
        .schedule(&h.user_id, "Dentist", "2026-03-10 13:00", "UTC")
        .unwrap();

    let updated = h
        .engine
        .update(
            &h.user_id,
            &task.id,
            TaskChanges {
                name: Some("Dentist (Dr. Lovelace)".to_string()),
                target: None,
            },
        )
        .unwrap();
    assert_eq!(updated.next_execution, task.next_execution);

    advance(&h.clock, Span::hours(1)).await;
    let successes = entries_with(&h.engine, &h.user_id, ExecutionStatus::Success);
    assert_eq!(successes.len(), 1);
    assert_eq!(successes[0].task_name, "Dentist (Dr. Lovelace)");
}

#[tokio::test(start_paused = true)]
async fn remove_cancels_the_pending_trigger() {
    let h = harness();
    let task = h
        .engine
        .schedule(&h.user_id, "Water plants", "2026-03-10 13:00", "UTC")
        .unwrap();

    h.engine.remove(&h.user_id, &task.id).unwrap();
    assert!(!h.engine.is_armed(&task.id));
    assert!(h.engine.tasks_for(&h.user_id).unwrap().is_empty());

    advance(&h.clock, Span::hours(2)).await;
    assert!(h.engine.history_for(&h.user_id).unwrap().is_empty());
    assert!(h.sender.sent.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn past_due_target_fires_promptly() {
    let h = harness();
    h.engine
        .schedule(&h.user_id, "Overdue", "2026-03-10 11:00", "UTC")
        .unwrap();

    // No clock advance at all: the zero-delay sleeper fires on its own.
    settle().await;
    assert_eq!(entries_with(&h.engine, &h.user_id, ExecutionStatus::Success).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn recovery_rearms_scheduled_tasks_and_fires_overdue_ones() {
    let h = harness();
    // Rows written while "the previous process" was alive; no triggers exist.
    let store = TaskStore::new(Arc::clone(&h.db));
    let overdue = store
        .create(NewTask {
            name: "Missed while down".to_string(),
            user_id: h.user_id.clone(),
            timezone: "UTC".to_string(),
            next_execution: start_time() - Span::minutes(30),
        })
        .unwrap();
    let future = store
        .create(NewTask {
            name: "Still ahead".to_string(),
            user_id: h.user_id.clone(),
            timezone: "UTC".to_string(),
            next_execution: start_time() + Span::hours(1),
        })
        .unwrap();

    assert_eq!(h.engine.recover().unwrap(), 2);
    settle().await;

    // The overdue task fired promptly instead of being dropped.
    let successes = entries_with(&h.engine, &h.user_id, ExecutionStatus::Success);
    assert_eq!(successes.len(), 1);
    assert_eq!(successes[0].task_id, overdue.id);
    assert!(h.engine.is_armed(&future.id));

    advance(&h.clock, Span::hours(1)).await;
    assert_eq!(entries_with(&h.engine, &h.user_id, ExecutionStatus::Success).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn same_instant_tasks_fire_independently() {
    let h = harness();
    let a = h
        .engine
        .schedule(&h.user_id, "First", "2026-03-10 13:00", "UTC")
        .unwrap();
    let b = h
        .engine
        .schedule(&h.user_id, "Second", "2026-03-10 13:00", "UTC")
        .unwrap();

    advance(&h.clock, Span::hours(1)).await;
    let successes = entries_with(&h.engine, &h.user_id, ExecutionStatus::Success);
    assert_eq!(successes.len(), 2);
    let ids: Vec<&str> = successes.iter().map(|e| e.task_id.as_str()).collect();
    assert!(ids.contains(&a.id.as_str()));
    assert!(ids.contains(&b.id.as_str()));
}

#[tokio::test(start_paused = true)]
async fn earlier_fire_leaves_the_other_trigger_armed() {
    let h = harness();
    let early = h
        .engine
        .schedule(&h.user_id, "Early", "2026-03-10 13:00", "UTC")
        .unwrap();
    let late = h
        .engine
        .schedule(&h.user_id, "Late", "2026-03-10 14:00", "UTC")
        .unwrap();

    advance(&h.clock, Span::hours(1)).await;
    assert!(!h.engine.is_armed(&early.id));
    assert!(h.engine.is_armed(&late.id));

    advance(&h.clock, Span::hours(1)).await;
    assert_eq!(entries_with(&h.engine, &h.user_id, ExecutionStatus::Success).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn failing_sender_produces_a_failure_entry_without_retry() {
    let (engine, clock, _db, user_id) = build_with(Arc::new(FailingSender));
    let task = engine
        .schedule(&user_id, "Doomed", "2026-03-10 13:00", "UTC")
        .unwrap();

    advance(&clock, Span::hours(1)).await;
    let failures = entries_with(&engine, &user_id, ExecutionStatus::Failure);
    assert_eq!(failures.len(), 1);
    assert!(failures[0].message.contains("relay rejected the message"));

    // At-most-once: no retry, the task stays Fired.
    assert!(!engine.is_armed(&task.id));
    advance(&clock, Span::hours(3)).await;
    assert_eq!(entries_with(&engine, &user_id, ExecutionStatus::Failure).len(), 1);
    assert_eq!(engine.tasks_for(&user_id).unwrap()[0].state, TaskState::Fired);
}

#[tokio::test(start_paused = true)]
async fn missing_user_at_fire_time_is_a_failure_entry() {
    let h = harness();
    // Scheduled under an id the directory has never seen.
    h.engine
        .schedule("ghost-user", "Orphaned", "2026-03-10 13:00", "UTC")
        .unwrap();

    advance(&h.clock, Span::hours(1)).await;
    let failures = entries_with(&h.engine, "ghost-user", ExecutionStatus::Failure);
    assert_eq!(failures.len(), 1);
    assert!(failures[0].message.contains("not found"));
    assert!(h.sender.sent.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn invalid_target_is_rejected_before_persisting() {
    let h = harness();
    let err = h
        .engine
        .schedule(&h.user_id, "Bad time", "next tuesday-ish", "UTC")
        .unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidSchedule(_)));

    let err = h
        .engine
        .schedule(&h.user_id, "Bad zone", "2026-03-10 13:00", "Nowhere/Void")
        .unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidSchedule(_)));

    assert!(h.engine.tasks_for(&h.user_id).unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn operations_on_unknown_tasks_are_not_found() {
    let h = harness();
    let err = h
        .engine
        .update(&h.user_id, "no-such-id", TaskChanges::default())
        .unwrap_err();
    assert!(matches!(err, SchedulerError::TaskNotFound { .. }));

    let err = h.engine.remove(&h.user_id, "no-such-id").unwrap_err();
    assert!(matches!(err, SchedulerError::TaskNotFound { .. }));
}

#[tokio::test(start_paused = true)]
async fn tasks_are_invisible_to_other_users() {
    let h = harness();
    let task = h
        .engine
        .schedule(&h.user_id, "Private", "2026-03-10 13:00", "UTC")
        .unwrap();

    let err = h.engine.remove("intruder", &task.id).unwrap_err();
    assert!(matches!(err, SchedulerError::TaskNotFound { .. }));
    // The intruder's failed delete must not disarm the owner's trigger.
    assert!(h.engine.is_armed(&task.id));
}

#[tokio::test(start_paused = true)]
async fn pay_rent_end_to_end() {
    let h = harness();
    let task = h
        .engine
        .schedule(&h.user_id, "Pay rent", "2026-03-10 13:00", "UTC")
        .unwrap();

    advance(&h.clock, Span::hours(1)).await;
    let history = h.engine.history_for(&h.user_id).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].task_name, "Pay rent");
    assert_eq!(history[0].status, ExecutionStatus::Success);
    assert_eq!(history[0].user_id, h.user_id);

    // Deleting the task cascades to its history.
    h.engine.remove(&h.user_id, &task.id).unwrap();
    assert!(h.engine.history_for(&h.user_id).unwrap().is_empty());
    assert!(h.engine.tasks_for(&h.user_id).unwrap().is_empty());
}

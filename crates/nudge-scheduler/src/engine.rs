use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use nudge_core::ReminderMessage;
use nudge_notify::NotificationSender;
use nudge_users::UserDirectory;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::clock::Clock;
use crate::error::{Result, SchedulerError};
use crate::history::ExecutionLog;
use crate::schedule::{delay_until, resolve_target};
use crate::store::TaskStore;
use crate::types::{ExecutionStatus, NewEntry, NewTask, Task};

/// Fixed confirmation text recorded on a successful delivery.
pub const DELIVERED_MESSAGE: &str = "Reminder delivered.";

/// One armed timer, bound to exactly one task id.
///
/// The generation is bumped on every re-arm; a sleeper that wakes with an
/// older generation lost an update/cancel race and must not fire.
struct Trigger {
    generation: u64,
    deadline: DateTime<Utc>,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Registry {
    armed: HashMap<String, Trigger>,
    next_generation: u64,
}

/// Requested changes for an update: new name and/or new target time.
/// A target is re-resolved in the task's stored timezone.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub name: Option<String>,
    pub target: Option<String>,
}

/// The scheduling authority: owns the trigger registry, converts target
/// instants into armed Tokio sleepers, executes tasks when due, and keeps
/// registry and stores consistent across add/update/cancel races.
///
/// The registry mutex guards only map mutation; store reads/writes and the
/// notification send always happen after it is released. Arm, update,
/// remove, and fire-consume for a given task id are linearized by that lock
/// plus the generation counter. Cancelling a trigger whose fire has already
/// consumed its registry entry does not abort the in-flight execution.
///
/// Cloning is cheap (shared inner state). All mutating operations must run
/// inside a Tokio runtime, since arming spawns the sleeper task.
#[derive(Clone)]
pub struct SchedulerEngine {
    inner: Arc<Inner>,
}

struct Inner {
    tasks: TaskStore,
    history: ExecutionLog,
    users: UserDirectory,
    sender: Arc<dyn NotificationSender>,
    clock: Arc<dyn Clock>,
    send_timeout: Duration,
    triggers: Mutex<Registry>,
    /// Per-task-id mutual exclusion for update/remove, so the store write
    /// and the re-arm of one mutation can never interleave with another's.
    /// Fire-consume deliberately does not take this lock: an in-flight fire
    /// is allowed to complete regardless of concurrent mutations.
    op_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SchedulerEngine {
    pub fn new(
        tasks: TaskStore,
        history: ExecutionLog,
        users: UserDirectory,
        sender: Arc<dyn NotificationSender>,
        clock: Arc<dyn Clock>,
        send_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                tasks,
                history,
                users,
                sender,
                clock,
                send_timeout,
                triggers: Mutex::new(Registry::default()),
                op_locks: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Create a task and arm its trigger.
    ///
    /// The target is resolved to a UTC instant first — an unresolvable time
    /// is rejected before anything is persisted. A target already in the
    /// past is accepted and fires at the next feasible scheduling tick.
    pub fn schedule(
        &self,
        user_id: &str,
        name: &str,
        target: &str,
        timezone: &str,
    ) -> Result<Task> {
        let next_execution = resolve_target(target, timezone)?;
        let task = self.inner.tasks.create(NewTask {
            name: name.to_string(),
            user_id: user_id.to_string(),
            timezone: timezone.to_string(),
            next_execution,
        })?;
        self.inner.arm(&task);
        info!(task_id = %task.id, user_id, at = %next_execution, "task scheduled");
        Ok(task)
    }

    /// Rename and/or reschedule a task, then re-arm its trigger.
    ///
    /// Writes an informational Updated entry to the execution log. Fails
    /// with `TaskNotFound` when the task does not exist for this user; a
    /// bad new target fails before anything is persisted, leaving the
    /// original trigger armed.
    pub fn update(&self, user_id: &str, task_id: &str, changes: TaskChanges) -> Result<Task> {
        let op = self.inner.op_lock(task_id);
        let _serialized = op.lock().unwrap();

        let existing = self
            .inner
            .tasks
            .get(task_id, user_id)?
            .ok_or_else(|| SchedulerError::TaskNotFound {
                id: task_id.to_string(),
            })?;

        let next_execution = changes
            .target
            .as_deref()
            .map(|raw| resolve_target(raw, &existing.timezone))
            .transpose()?;

        let updated = self
            .inner
            .tasks
            .update_fields(task_id, user_id, changes.name.as_deref(), next_execution)?
            .ok_or_else(|| SchedulerError::TaskNotFound {
                id: task_id.to_string(),
            })?;

        self.inner.arm(&updated);

        self.inner.history.append(NewEntry {
            task_id: updated.id.clone(),
            task_name: updated.name.clone(),
            user_id: updated.user_id.clone(),
            executed_at: self.inner.clock.now(),
            status: ExecutionStatus::Updated,
            message: format!("Task rescheduled for {}", updated.next_execution.to_rfc3339()),
        })?;

        info!(task_id = %updated.id, at = %updated.next_execution, "task updated and re-armed");
        Ok(updated)
    }

    /// Delete a task: disarm its trigger, remove the row, and cascade-delete
    /// its log entries by task id.
    ///
    /// Disarming is a no-op when no trigger is armed — after a restart the
    /// registry starts empty while rows survive. Fails with `TaskNotFound`
    /// when the task does not exist for this user.
    pub fn remove(&self, user_id: &str, task_id: &str) -> Result<Task> {
        let op = self.inner.op_lock(task_id);
        let serialized = op.lock().unwrap();

        let deleted = self
            .inner
            .tasks
            .delete(task_id, user_id)?
            .ok_or_else(|| SchedulerError::TaskNotFound {
                id: task_id.to_string(),
            })?;

        self.inner.disarm(task_id);
        let entries = self.inner.history.delete_by_task(task_id, user_id)?;
        info!(task_id, user_id, log_entries = entries, "task removed");

        drop(serialized);
        self.inner.op_locks.lock().unwrap().remove(task_id);
        Ok(deleted)
    }

    /// Re-arm a trigger for every Scheduled task in the store.
    ///
    /// Triggers are not persisted, so this must run once on process start.
    /// Tasks whose instant elapsed while the process was down arm with a
    /// zero delay and fire promptly instead of being dropped.
    pub fn recover(&self) -> Result<usize> {
        let scheduled = self.inner.tasks.list_scheduled()?;
        let count = scheduled.len();
        let now = self.inner.clock.now();
        let overdue = scheduled.iter().filter(|t| t.next_execution <= now).count();
        for task in &scheduled {
            self.inner.arm(task);
        }
        info!(count, overdue, "recovery complete; triggers re-armed");
        Ok(count)
    }

    /// All tasks belonging to a user.
    pub fn tasks_for(&self, user_id: &str) -> Result<Vec<Task>> {
        self.inner.tasks.list_by_user(user_id)
    }

    /// A user's execution history, most recent first.
    pub fn history_for(&self, user_id: &str) -> Result<Vec<crate::types::ExecutionEntry>> {
        self.inner.history.list_by_user(user_id)
    }

    /// Whether a live trigger is currently armed for this task.
    pub fn is_armed(&self, task_id: &str) -> bool {
        self.inner.triggers.lock().unwrap().armed.contains_key(task_id)
    }
}

impl Inner {
    /// Fetch (or create) the mutation lock for one task id.
    fn op_lock(&self, task_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.op_locks.lock().unwrap();
        Arc::clone(locks.entry(task_id.to_string()).or_default())
    }

    /// Arm (or re-arm) the trigger for `task`.
    ///
    /// Holds the registry lock across spawn-and-insert so the sleeper —
    /// even one with a zero delay — cannot reach its consume step before
    /// its own registry entry exists. At most one live trigger per task id:
    /// any previous sleeper is aborted and its generation superseded.
    fn arm(self: &Arc<Self>, task: &Task) {
        let mut registry = self.triggers.lock().unwrap();

        if let Some(prev) = registry.armed.remove(&task.id) {
            debug!(task_id = %task.id, "re-arm: aborting previous trigger");
            prev.handle.abort();
        }

        let generation = registry.next_generation;
        registry.next_generation += 1;

        let delay = delay_until(task.next_execution, self.clock.now());
        let inner = Arc::clone(self);
        let task_id = task.id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.fire(&task_id, generation).await;
        });

        registry.armed.insert(
            task.id.clone(),
            Trigger {
                generation,
                deadline: task.next_execution,
                handle,
            },
        );
        debug!(task_id = %task.id, generation, delay_ms = delay.as_millis() as u64, "trigger armed");
    }

    /// Abort and drop the armed trigger for `task_id`, if any.
    fn disarm(&self, task_id: &str) {
        let mut registry = self.triggers.lock().unwrap();
        if let Some(trigger) = registry.armed.remove(task_id) {
            debug!(task_id, deadline = %trigger.deadline, "trigger disarmed");
            trigger.handle.abort();
        }
    }

    /// Execute one due task. Runs on the sleeper task; never returns an
    /// error — every failure ends up in the execution log (or, for log
    /// store failures, in the diagnostic log).
    async fn fire(self: &Arc<Self>, task_id: &str, generation: u64) {
        // Consume the trigger. A generation mismatch means this sleeper was
        // superseded by an update between its wakeup and this point.
        {
            let mut registry = self.triggers.lock().unwrap();
            let live = registry.armed.get(task_id).map(|t| t.generation);
            if live != Some(generation) {
                debug!(task_id, generation, "stale trigger; skipping fire");
                return;
            }
            registry.armed.remove(task_id);
        }

        // Triggers carry no task data: state is looked up fresh from the
        // store, so an update that raced ahead of us is never overridden.
        let task = match self.tasks.claim_for_fire(task_id) {
            Ok(Some(task)) => task,
            Ok(None) => {
                debug!(task_id, "task no longer scheduled; nothing to fire");
                return;
            }
            Err(e) => {
                error!(task_id, error = %e, "fire aborted: task store read failed");
                return;
            }
        };

        let executed_at = self.clock.now();
        let (status, message) = match self.deliver(&task).await {
            Ok(()) => (ExecutionStatus::Success, DELIVERED_MESSAGE.to_string()),
            Err(reason) => (ExecutionStatus::Failure, reason),
        };
        info!(task_id, status = %status, "task fired");

        if let Err(e) = self.history.append(NewEntry {
            task_id: task.id.clone(),
            task_name: task.name.clone(),
            user_id: task.user_id.clone(),
            executed_at,
            status,
            message,
        }) {
            // No durable place left to record this attempt.
            error!(task_id, error = %e, "failed to append execution log entry");
        }
    }

    /// Resolve the owner and send the reminder, bounded by the send timeout.
    /// Returns the failure reason recorded in the log entry.
    async fn deliver(&self, task: &Task) -> std::result::Result<(), String> {
        let user = match self.users.get(&task.user_id) {
            Ok(Some(user)) => user,
            // User absence is permanent for this attempt; no retry.
            Ok(None) => return Err(format!("user {} not found", task.user_id)),
            Err(e) => return Err(format!("user lookup failed: {e}")),
        };

        let msg = ReminderMessage::for_task(&task.id, &task.name, &user.email);
        match tokio::time::timeout(self.send_timeout, self.sender.send(&msg)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "send timed out after {}ms",
                self.send_timeout.as_millis()
            )),
        }
    }
}

use async_trait::async_trait;
use nudge_core::ReminderMessage;

use crate::error::NotifyError;

/// Common interface implemented by every delivery backend.
///
/// Implementations must be `Send + Sync` so the scheduler can fire many
/// reminders concurrently from independent Tokio tasks. `send` takes `&self`
/// so a connected sender never needs a mutable borrow to deliver.
///
/// Delivery is best-effort: the scheduler records the outcome in its
/// execution log and never retries a failed send.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Deliver a single reminder to its destination address.
    async fn send(&self, msg: &ReminderMessage) -> Result<(), NotifyError>;
}

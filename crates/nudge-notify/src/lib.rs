//! `nudge-notify` — reminder delivery.
//!
//! Defines the [`NotificationSender`] seam the scheduler fires through, and
//! the production [`HttpRelaySender`] that posts reminders to a mail relay.

pub mod error;
pub mod relay;
pub mod sender;

pub use error::NotifyError;
pub use relay::HttpRelaySender;
pub use sender::NotificationSender;

//! `nudge-users` — SQLite-backed user directory.
//!
//! Resolves an opaque user id to a deliverable address (email) and timezone.
//! Signup, login, and token verification live in the service layer above;
//! this crate only stores and looks up the records they produce.

pub mod db;
pub mod directory;
pub mod error;
pub mod types;

pub use directory::UserDirectory;
pub use error::{Result, UserError};
pub use types::User;

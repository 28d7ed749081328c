use serde::{Deserialize, Serialize};

/// A registered account. Stored in SQLite; loaded on demand.
///
/// The timezone is the user's default for new tasks — each task still
/// carries its own zone so scheduling stays deterministic if the user moves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// UUIDv7 — time-sortable, useful for log correlation.
    pub id: String,
    pub display_name: String,
    /// Destination address for reminder delivery.
    pub email: String,
    /// IANA zone name, e.g. "Europe/Berlin".
    pub timezone: String,

    // Audit timestamps (ISO-8601)
    pub created_at: String,
    pub updated_at: String,
}

use chrono::{DateTime, Utc};

/// Source of "now" for the engine.
///
/// Exists so engine tests can pin wall-clock time; production code always
/// uses [`SystemClock`].
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

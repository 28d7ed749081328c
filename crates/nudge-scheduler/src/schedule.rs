use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{Result, SchedulerError};

/// Resolve a user-supplied target time to a canonical UTC instant.
///
/// Accepts either an RFC 3339 timestamp (offset wins; `tz_name` is ignored)
/// or a naive local time (`YYYY-MM-DD HH:MM[:SS]`) interpreted in the named
/// IANA zone. Unknown zones, unparseable input, and local times that do not
/// exist or are ambiguous in that zone (DST transitions) are all
/// `InvalidSchedule` — callers must reject the request before persisting.
pub fn resolve_target(raw: &str, tz_name: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = parse_naive(raw)?;
    let tz: Tz = tz_name
        .parse()
        .map_err(|_| SchedulerError::InvalidSchedule(format!("unknown timezone: {tz_name}")))?;

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(_, _) => Err(SchedulerError::InvalidSchedule(format!(
            "{raw} is ambiguous in {tz_name} (clocks roll back); give an explicit offset"
        ))),
        LocalResult::None => Err(SchedulerError::InvalidSchedule(format!(
            "{raw} does not exist in {tz_name} (clocks skip forward)"
        ))),
    }
}

/// Duration to sleep before `target`, measured from `now`.
///
/// Saturates at zero: a target already in the past fires at the next
/// feasible scheduling tick instead of being rejected or dropped.
pub fn delay_until(target: DateTime<Utc>, now: DateTime<Utc>) -> std::time::Duration {
    (target - now).to_std().unwrap_or(std::time::Duration::ZERO)
}

fn parse_naive(raw: &str) -> Result<NaiveDateTime> {
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive);
        }
    }
    Err(SchedulerError::InvalidSchedule(format!(
        "cannot parse target time: {raw}"
    )))
}

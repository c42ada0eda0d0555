//! Time source used for lockouts, code expiry and token expiry

use chrono::{DateTime, Utc};

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clamp a configured number of seconds into a `chrono::Duration`
pub(crate) fn duration_secs(secs: u64) -> chrono::Duration {
    // Ten years is far beyond any policy window and well inside chrono's range
    const MAX_SECS: u64 = 10 * 365 * 24 * 3600;
    chrono::Duration::seconds(secs.min(MAX_SECS) as i64)
}

//! Token lifetime resolution.
//!
//! Priority is fixed: an explicit minutes value (> 0) always wins; otherwise the coarser
//! unit (> 0) is converted to minutes; otherwise the default applies.

use std::time::Duration;

pub const DEFAULT_ACCESS_EXPIRY_MINUTES: u64 = 60;
pub const DEFAULT_INTERNAL_EXPIRY_DAYS: u64 = 30;

const MINUTES_PER_HOUR: u64 = 60;
const MINUTES_PER_DAY: u64 = 24 * MINUTES_PER_HOUR;

/// Lifetime of external access tokens: minutes, else hours, else 60 minutes.
pub fn resolve_access_expiry(minutes: Option<i64>, hours: Option<i64>) -> Duration {
    let resolved = positive(minutes)
        .or_else(|| positive(hours).map(|h| h.saturating_mul(MINUTES_PER_HOUR)))
        .unwrap_or(DEFAULT_ACCESS_EXPIRY_MINUTES);
    from_minutes(resolved)
}

/// Lifetime of internal service tokens: minutes, else days, else 30 days.
pub fn resolve_internal_expiry(minutes: Option<i64>, days: Option<i64>) -> Duration {
    let resolved = positive(minutes)
        .or_else(|| positive(days).map(|d| d.saturating_mul(MINUTES_PER_DAY)))
        .unwrap_or(DEFAULT_INTERNAL_EXPIRY_DAYS * MINUTES_PER_DAY);
    from_minutes(resolved)
}

fn positive(value: Option<i64>) -> Option<u64> {
    value.filter(|v| *v > 0).map(|v| v as u64)
}

fn from_minutes(minutes: u64) -> Duration {
    Duration::from_secs(minutes.saturating_mul(60))
}

//! Timeout validation for the run's timing policy

use std::time::Duration;

use crate::utils::errors::ScraperError;

/// Maximum time to wait for a human to finish logging in (15 minutes)
pub const MAX_LOGIN_WAIT_MS: u64 = 900_000;

/// Maximum time to wait for the price cell to refresh (2 minutes)
pub const MAX_UPDATE_WAIT_MS: u64 = 120_000;

/// Maximum for any fixed pause between steps (30 seconds)
pub const MAX_PAUSE_MS: u64 = 30_000;

/// Maximum extra attempts per day after the first one
pub const MAX_PER_DAY_RETRIES: u32 = 10;

/// Validate a configured wait against its ceiling
///
/// # Returns
/// * `Ok(Duration)` - Validated Duration object
/// * `Err(ScraperError::Config)` - If `ms` exceeds `max_ms`
pub fn validate_wait(name: &str, ms: u64, max_ms: u64) -> Result<Duration, ScraperError> {
    if ms > max_ms {
        return Err(ScraperError::Config(format!(
            "{} cannot exceed {}ms ({:.1} seconds). Received: {}ms ({:.1} seconds)",
            name,
            max_ms,
            max_ms as f64 / 1000.0,
            ms,
            ms as f64 / 1000.0
        )));
    }

    Ok(Duration::from_millis(ms))
}

/// Validate a polling interval: non-zero and no longer than the wait it belongs to
pub fn validate_interval(name: &str, interval_ms: u64, wait_ms: u64) -> Result<Duration, ScraperError> {
    if interval_ms == 0 {
        return Err(ScraperError::Config(format!("{} must be greater than 0ms", name)));
    }
    if interval_ms > wait_ms.max(1) {
        return Err(ScraperError::Config(format!(
            "{} ({}ms) cannot be longer than the wait it polls ({}ms)",
            name, interval_ms, wait_ms
        )));
    }

    Ok(Duration::from_millis(interval_ms))
}

/// Validate the per-day retry budget against its ceiling
pub fn validate_retries(name: &str, retries: u32, max: u32) -> Result<u32, ScraperError> {
    if retries > max {
        return Err(ScraperError::Config(format!(
            "{} cannot exceed {}. Received: {}",
            name, max, retries
        )));
    }

    Ok(retries)
}

// Shared utility modules - no feature gating
pub mod constants;
mod errors;
mod poll;
mod timeout;

pub use errors::{ScraperError, ScraperResult};
pub use poll::{PollPolicy, Polled, poll_until};
pub use timeout::{
    MAX_LOGIN_WAIT_MS, MAX_PAUSE_MS, MAX_PER_DAY_RETRIES, MAX_UPDATE_WAIT_MS, validate_interval,
    validate_retries, validate_wait,
};

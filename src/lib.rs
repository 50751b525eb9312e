//! Historical price backfill via browser automation
//!
//! Drives an as-of-date balance page in Chromium (via chromiumoxide) one
//! calendar day at a time and writes the scraped price for each day to CSV.

pub mod backfill;
mod browser;
pub mod browser_setup;
pub mod dates;
pub mod form;
pub mod locator;
pub mod login;
pub mod price;
pub mod surface;
mod utils;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::locator::{Role, SelectorSet};
use crate::utils::constants;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_url")]
    pub url: String,

    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Normalize scraped price text to a plain decimal
    #[serde(default)]
    pub clean_price: bool,

    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub selectors: SelectorConfig,
}

/// Browser launch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Pause before every input sent to the page, in milliseconds
    #[serde(default)]
    pub slow_mo_ms: u64,

    /// Disable web security features (Same-Origin Policy, etc.)
    /// WARNING: Only enable for trusted content
    #[serde(default = "default_disable_security")]
    pub disable_security: bool,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Window dimensions
    #[serde(default)]
    pub window: WindowConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_window_width")]
    pub width: u32,

    #[serde(default = "default_window_height")]
    pub height: u32,
}

/// Timing policy, all values in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_wait_after_submit_ms")]
    pub wait_after_submit_ms: u64,

    #[serde(default = "default_max_price_wait_ms")]
    pub max_price_wait_ms: u64,

    #[serde(default = "default_price_poll_interval_ms")]
    pub price_poll_interval_ms: u64,

    /// Extra attempts per day after the first one fails
    #[serde(default = "default_per_day_retries")]
    pub per_day_retries: u32,

    /// Backoff before retry N is `retry_base_delay_ms * N`
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    #[serde(default = "default_polite_delay_ms")]
    pub polite_delay_ms: u64,

    #[serde(default = "default_login_wait_ms")]
    pub login_wait_ms: u64,

    #[serde(default = "default_login_poll_interval_ms")]
    pub login_poll_interval_ms: u64,

    #[serde(default = "default_keystroke_delay_ms")]
    pub keystroke_delay_ms: u64,
}

/// Validated timing policy handed to the backfill loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub wait_after_submit: Duration,
    pub max_price_wait: Duration,
    pub price_poll_interval: Duration,
    pub per_day_retries: u32,
    pub retry_base_delay: Duration,
    pub polite_delay: Duration,
    pub login_wait: Duration,
    pub login_poll_interval: Duration,
    pub keystroke_delay: Duration,
}

/// Selector candidates per role, highest priority first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    #[serde(default = "default_date_input_selectors")]
    pub date_input: Vec<String>,

    #[serde(default = "default_editable_div_selectors")]
    pub editable_div: Vec<String>,

    #[serde(default = "default_submit_button_selectors")]
    pub submit_button: Vec<String>,

    #[serde(default = "default_price_cell_selectors")]
    pub price_cell: Vec<String>,
}

fn default_url() -> String {
    constants::DEFAULT_URL.to_string()
}
fn default_output() -> PathBuf {
    PathBuf::from(constants::DEFAULT_OUTPUT)
}

fn default_headless() -> bool {
    true
}

fn default_disable_security() -> bool {
    false // SECURE BY DEFAULT
}

fn default_user_agent() -> String {
    constants::CHROME_USER_AGENT.to_string()
}

fn default_window_width() -> u32 {
    1280
}

fn default_window_height() -> u32 {
    900
}

fn default_wait_after_submit_ms() -> u64 {
    constants::WAIT_AFTER_SUBMIT_MS
}
fn default_max_price_wait_ms() -> u64 {
    constants::MAX_WAIT_PRICE_MS
}
fn default_price_poll_interval_ms() -> u64 {
    constants::PRICE_POLL_INTERVAL_MS
}
fn default_per_day_retries() -> u32 {
    constants::PER_DAY_RETRIES
}
fn default_retry_base_delay_ms() -> u64 {
    constants::RETRY_BASE_DELAY_MS
}
fn default_polite_delay_ms() -> u64 {
    constants::POLITE_DELAY_BETWEEN_DAYS_MS
}
fn default_login_wait_ms() -> u64 {
    constants::LOGIN_WAIT_SECS * 1000
}
fn default_login_poll_interval_ms() -> u64 {
    constants::LOGIN_POLL_INTERVAL_MS
}
fn default_keystroke_delay_ms() -> u64 {
    constants::KEYSTROKE_DELAY_MS
}

fn owned(selectors: &[&str]) -> Vec<String> {
    selectors.iter().map(|s| s.to_string()).collect()
}
fn default_date_input_selectors() -> Vec<String> {
    owned(constants::DATE_INPUT_SELECTORS)
}
fn default_editable_div_selectors() -> Vec<String> {
    owned(constants::EDITABLE_DIV_SELECTORS)
}
fn default_submit_button_selectors() -> Vec<String> {
    owned(constants::SUBMIT_BUTTON_SELECTORS)
}
fn default_price_cell_selectors() -> Vec<String> {
    owned(constants::PRICE_CELL_SELECTORS)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: default_url(),
            output: default_output(),
            clean_price: false,
            browser: BrowserConfig::default(),
            timing: TimingConfig::default(),
            selectors: SelectorConfig::default(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            slow_mo_ms: 0,
            disable_security: default_disable_security(),
            user_agent: default_user_agent(),
            window: WindowConfig::default(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_window_width(),
            height: default_window_height(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            wait_after_submit_ms: default_wait_after_submit_ms(),
            max_price_wait_ms: default_max_price_wait_ms(),
            price_poll_interval_ms: default_price_poll_interval_ms(),
            per_day_retries: default_per_day_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            polite_delay_ms: default_polite_delay_ms(),
            login_wait_ms: default_login_wait_ms(),
            login_poll_interval_ms: default_login_poll_interval_ms(),
            keystroke_delay_ms: default_keystroke_delay_ms(),
        }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            date_input: default_date_input_selectors(),
            editable_div: default_editable_div_selectors(),
            submit_button: default_submit_button_selectors(),
            price_cell: default_price_cell_selectors(),
        }
    }
}

impl TimingConfig {
    /// Check every wait against its ceiling and convert to durations
    pub fn validate(&self) -> ScraperResult<Timing> {
        use crate::utils::{
            MAX_LOGIN_WAIT_MS, MAX_PAUSE_MS, MAX_PER_DAY_RETRIES, MAX_UPDATE_WAIT_MS,
            validate_interval, validate_retries, validate_wait,
        };

        Ok(Timing {
            wait_after_submit: validate_wait("wait_after_submit_ms", self.wait_after_submit_ms, MAX_PAUSE_MS)?,
            max_price_wait: validate_wait("max_price_wait_ms", self.max_price_wait_ms, MAX_UPDATE_WAIT_MS)?,
            price_poll_interval: validate_interval(
                "price_poll_interval_ms",
                self.price_poll_interval_ms,
                self.max_price_wait_ms,
            )?,
            per_day_retries: validate_retries("per_day_retries", self.per_day_retries, MAX_PER_DAY_RETRIES)?,
            retry_base_delay: validate_wait("retry_base_delay_ms", self.retry_base_delay_ms, MAX_PAUSE_MS)?,
            polite_delay: validate_wait("polite_delay_ms", self.polite_delay_ms, MAX_PAUSE_MS)?,
            login_wait: validate_wait("login_wait_ms", self.login_wait_ms, MAX_LOGIN_WAIT_MS)?,
            login_poll_interval: validate_interval(
                "login_poll_interval_ms",
                self.login_poll_interval_ms,
                self.login_wait_ms,
            )?,
            keystroke_delay: validate_wait("keystroke_delay_ms", self.keystroke_delay_ms, MAX_PAUSE_MS)?,
        })
    }
}

impl SelectorConfig {
    /// Selector set for one role
    pub fn set(&self, role: Role) -> SelectorSet {
        let selectors = match role {
            Role::DateInput => &self.date_input,
            Role::EditableDiv => &self.editable_div,
            Role::SubmitButton => &self.submit_button,
            Role::PriceCell => &self.price_cell,
        };
        SelectorSet::new(role, selectors.iter().cloned())
    }

    /// Every role needs at least one candidate
    pub fn validate(&self) -> ScraperResult<()> {
        for role in [Role::DateInput, Role::EditableDiv, Role::SubmitButton, Role::PriceCell] {
            if self.set(role).selectors().iter().all(|s| s.trim().is_empty()) {
                return Err(ScraperError::Config(format!("no selectors configured for the {role}")));
            }
        }
        Ok(())
    }
}

/// Load config from a YAML file, or defaults when no file is given
pub fn load_yaml_config(path: Option<&Path>) -> ScraperResult<Config> {
    match path {
        Some(path) => {
            let contents = fs::read_to_string(path).map_err(|e| {
                ScraperError::Config(format!("cannot read {}: {}", path.display(), e))
            })?;
            let config: Config = serde_yaml::from_str(&contents)?;
            Ok(config)
        }
        None => Ok(Config::default()),
    }
}

pub use backfill::{DayOutcome, RunReport, run_days};
pub use browser::{BrowserError, BrowserResult, BrowserSession};
pub use surface::{ChromeSurface, Key, PageSurface, Probe, Scope};
pub use utils::constants::{CSV_HEADER, DEFAULT_OUTPUT, DEFAULT_URL};
pub use utils::{PollPolicy, Polled, ScraperError, ScraperResult, poll_until};

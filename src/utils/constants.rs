//! Shared configuration constants for the backfill run
//!
//! Default values for the target page, its selectors, and the timing policy.
//! Everything here is only a default: `Config` carries the live values.

/// Chrome user agent string presented to the target site
///
/// A desktop Windows UA keeps the balance page on its full layout.
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";

/// Account overview page with the as-of-date balance widget
pub const DEFAULT_URL: &str = "https://www.gapath2college.com/gadtpl/ao/overview.cs";

pub const DEFAULT_OUTPUT: &str = "prices.csv";

pub const CSV_HEADER: [&str; 2] = ["date", "close"];

// Pages change; every role gets several candidates, tried in order.
pub const DATE_INPUT_SELECTORS: &[&str] = &[
    "input#asofDate",
    "input[id='asofDate' i]",
    "input[type='text'][id*='asof' i]",
    "input[type='text'][name*='asof' i]",
];

pub const EDITABLE_DIV_SELECTORS: &[&str] = &[
    "div[contenteditable='plaintext-only']",
    "div[contenteditable='true']",
    "[contenteditable][role='textbox']",
];

pub const SUBMIT_BUTTON_SELECTORS: &[&str] = &["#customAsOfBal"];

pub const PRICE_CELL_SELECTORS: &[&str] = &[
    "#caoBalDiv > table > tbody > tr > td.unite-table-cell.unite-table-cell-2.unite-table-column-unit",
];

pub const WAIT_AFTER_SUBMIT_MS: u64 = 250;
pub const MAX_WAIT_PRICE_MS: u64 = 10_000;
pub const PRICE_POLL_INTERVAL_MS: u64 = 150;
pub const PER_DAY_RETRIES: u32 = 2;
pub const RETRY_BASE_DELAY_MS: u64 = 800;
pub const POLITE_DELAY_BETWEEN_DAYS_MS: u64 = 350;
pub const LOGIN_WAIT_SECS: u64 = 120;
pub const LOGIN_POLL_INTERVAL_MS: u64 = 500;
pub const KEYSTROKE_DELAY_MS: u64 = 20;

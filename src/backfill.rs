//! The per-day backfill loop
//!
//! Each calendar day goes `pending -> attempting -> {succeeded, exhausted}`:
//! snapshot the current price, type the date, submit, wait for the price to
//! change and record it. A failed attempt is retried with linear backoff after
//! a best-effort page reset. A day that exhausts its retries is written with an
//! empty price and the run moves on; one bad day never stops the range.

use std::io::Write;

use chrono::NaiveDate;
use tracing::{debug, info, trace, warn};

use crate::dates::{DateRange, to_mmddyyyy};
use crate::form::{click_submit, set_date};
use crate::locator::{Role, SelectorSet};
use crate::price::{UpdateStatus, clean_price, read_price_text, wait_for_update};
use crate::surface::{Key, PageSurface};
use crate::utils::constants::CSV_HEADER;
use crate::utils::{PollPolicy, ScraperError, ScraperResult};
use crate::{Config, SelectorConfig, Timing};

/// Final state of one day
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayStatus {
    Succeeded(UpdateStatus),
    Exhausted(String),
}

/// What was recorded for one day and how many attempts it took
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayOutcome {
    pub date: NaiveDate,
    pub close: String,
    pub attempts: u32,
    pub status: DayStatus,
}

impl DayOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self.status, DayStatus::Succeeded(_))
    }
}

/// Summary of a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Data rows written (header excluded)
    pub rows: usize,
    /// Days written with an empty price after exhausting retries
    pub failed: Vec<NaiveDate>,
    /// Days whose price text never changed from the previous day's; recorded but worth a look
    pub unchanged: Vec<NaiveDate>,
    /// `[WARN]` lines written to stderr, in order
    pub warnings: Vec<String>,
}

/// Stderr line for a day that exhausted its retries
pub fn exhausted_notice(date: NaiveDate, error: &str) -> String {
    format!("[WARN] {}: {}", date, error)
}

/// Day-loop driver holding the selector sets and timing policy for a run
#[derive(Debug, Clone)]
pub struct Backfill {
    date_input: SelectorSet,
    editable: SelectorSet,
    submit: SelectorSet,
    price_cell: SelectorSet,
    timing: Timing,
    clean_price: bool,
}

impl Backfill {
    pub fn new(selectors: &SelectorConfig, timing: Timing, clean_price: bool) -> Self {
        Self {
            date_input: selectors.set(Role::DateInput),
            editable: selectors.set(Role::EditableDiv),
            submit: selectors.set(Role::SubmitButton),
            price_cell: selectors.set(Role::PriceCell),
            timing,
            clean_price,
        }
    }

    fn update_policy(&self) -> PollPolicy {
        PollPolicy::new(self.timing.max_price_wait, self.timing.price_poll_interval)
    }

    /// One attempt at a day: returns the value to record and how the wait ended
    pub async fn attempt_day(
        &self,
        surface: &dyn PageSurface,
        date: NaiveDate,
    ) -> ScraperResult<(String, UpdateStatus)> {
        let previous = read_price_text(surface, &self.price_cell).await;

        set_date(
            surface,
            &self.date_input,
            &self.editable,
            &to_mmddyyyy(date),
            self.timing.keystroke_delay,
        )
        .await?;

        // Some date widgets only commit on Enter or blur
        if let Err(e) = surface.press(Key::Enter).await {
            trace!("Enter after typing date failed: {}", e);
        }

        click_submit(surface, &self.submit).await?;

        tokio::time::sleep(self.timing.wait_after_submit).await;

        let previous = (!previous.is_empty()).then_some(previous.as_str());
        let outcome = wait_for_update(surface, &self.price_cell, previous, self.update_policy()).await;

        let value = if self.clean_price {
            clean_price(&outcome.text)
        } else {
            outcome.text
        };
        Ok((value, outcome.status))
    }

    /// Run a day through its full retry budget
    pub async fn run_day(&self, surface: &dyn PageSurface, date: NaiveDate) -> DayOutcome {
        let max_attempts = self.timing.per_day_retries.saturating_add(1);
        let mut last_error: Option<ScraperError> = None;

        for attempt in 1..=max_attempts {
            match self.attempt_day(surface, date).await {
                Ok((close, update)) => {
                    debug!("{}: recorded '{}' on attempt {}", date, close, attempt);
                    return DayOutcome {
                        date,
                        close,
                        attempts: attempt,
                        status: DayStatus::Succeeded(update),
                    };
                }
                Err(e) => {
                    if attempt < max_attempts {
                        let backoff = self.timing.retry_base_delay * attempt;
                        info!(
                            "{}: attempt {}/{} failed ({}), retrying in {}ms",
                            date,
                            attempt,
                            max_attempts,
                            e,
                            backoff.as_millis()
                        );
                        tokio::time::sleep(backoff).await;
                        if let Err(e) = surface.scroll_to_top().await {
                            trace!("Page reset before retry failed: {}", e);
                        }
                    }
                    last_error = Some(e);
                }
            }
        }

        let error = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempts were made".to_string());
        DayOutcome {
            date,
            close: String::new(),
            attempts: max_attempts,
            status: DayStatus::Exhausted(error),
        }
    }

    /// Process every day of `range` in order, one CSV row per day
    ///
    /// Writes the header first and flushes after each row. Only output errors
    /// abort the run.
    pub async fn run<W: Write>(
        &self,
        surface: &dyn PageSurface,
        range: DateRange,
        writer: &mut csv::Writer<W>,
    ) -> ScraperResult<RunReport> {
        let mut report = RunReport::default();

        writer.write_record(CSV_HEADER)?;
        writer.flush()?;

        info!("Backfilling {} day(s) from {} to {}", range.len(), range.start(), range.end());

        for date in range.days() {
            let outcome = self.run_day(surface, date).await;

            match &outcome.status {
                DayStatus::Exhausted(error) => {
                    let notice = exhausted_notice(date, error);
                    eprintln!("{}", notice);
                    warn!(%date, attempts = outcome.attempts, "Day exhausted retries: {}", error);
                    report.failed.push(date);
                    report.warnings.push(notice);
                }
                DayStatus::Succeeded(UpdateStatus::Unchanged) => {
                    warn!(%date, "Price text did not change after submit; recorded '{}' for review", outcome.close);
                    report.unchanged.push(date);
                }
                DayStatus::Succeeded(_) => {}
            }

            writer.write_record([date.to_string().as_str(), outcome.close.as_str()])?;
            writer.flush()?;
            report.rows += 1;

            tokio::time::sleep(self.timing.polite_delay).await;
        }

        Ok(report)
    }
}

/// Backfill `range` with the selectors and timing from `config`, writing CSV to `out`
pub async fn run_days<W: Write>(
    surface: &dyn PageSurface,
    config: &Config,
    range: DateRange,
    out: W,
) -> ScraperResult<RunReport> {
    config.selectors.validate()?;
    let timing = config.timing.validate()?;
    let backfill = Backfill::new(&config.selectors, timing, config.clean_price);

    let mut writer = csv::Writer::from_writer(out);
    let report = backfill.run(surface, range, &mut writer).await?;
    writer.flush()?;

    info!(
        "Backfill finished: {} row(s), {} failed, {} unchanged",
        report.rows,
        report.failed.len(),
        report.unchanged.len()
    );
    Ok(report)
}

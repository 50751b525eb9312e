mod common;

use std::time::Duration;

use chrono::NaiveDate;
use common::{EDITABLE, FakePage, FakeScope, PRICE, SUBMIT};
use price_backfill::backfill::{Backfill, DayStatus, exhausted_notice};
use price_backfill::dates::{DateRange, to_mmddyyyy, today_local, validate_start};
use price_backfill::price::UpdateStatus;
use price_backfill::{Config, TimingConfig, run_days};
use tokio::time::Instant;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn rows(csv_bytes: &[u8]) -> Vec<Vec<String>> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(csv_bytes)
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

fn row(date: &str, close: &str) -> Vec<String> {
    vec![date.to_string(), close.to_string()]
}

#[tokio::test(start_paused = true)]
async fn single_day_range_writes_one_row() {
    let page = FakePage::balance_page()
        .showing("$100.00")
        .quote("03/15/2024", "$101.50");
    let range = DateRange::new(ymd(2024, 3, 15), ymd(2024, 3, 15)).unwrap();

    let mut out = Vec::new();
    let report = run_days(&page, &Config::default(), range, &mut out).await.unwrap();

    assert_eq!(report.rows, 1);
    assert!(report.failed.is_empty());
    assert_eq!(rows(&out), vec![row("date", "close"), row("2024-03-15", "$101.50")]);
    assert_eq!(page.submitted(), vec!["03/15/2024"]);
}

#[tokio::test(start_paused = true)]
async fn days_are_written_in_order_and_cleaned() {
    let page = FakePage::balance_page()
        .showing("$100.00")
        .quote("02/28/2024", "$101.50")
        .quote("02/29/2024", "$1,234.56")
        .quote("03/01/2024", "-$3.10")
        .lag(2);
    let range = DateRange::new(ymd(2024, 2, 28), ymd(2024, 3, 1)).unwrap();
    let config = Config {
        clean_price: true,
        ..Config::default()
    };

    let mut out = Vec::new();
    let report = run_days(&page, &config, range, &mut out).await.unwrap();

    assert_eq!(report.rows, 3);
    assert_eq!(
        rows(&out),
        vec![
            row("date", "close"),
            row("2024-02-28", "101.50"),
            row("2024-02-29", "1234.56"),
            row("2024-03-01", "3.10"),
        ]
    );
    assert_eq!(page.submitted(), vec!["02/28/2024", "02/29/2024", "03/01/2024"]);
}

#[tokio::test(start_paused = true)]
async fn raw_text_is_kept_without_cleaning() {
    let page = FakePage::balance_page().quote("01/05/2024", "$1,234.56 USD");
    let range = DateRange::new(ymd(2024, 1, 5), ymd(2024, 1, 5)).unwrap();

    let mut out = Vec::new();
    run_days(&page, &Config::default(), range, &mut out).await.unwrap();

    assert_eq!(rows(&out)[1], row("2024-01-05", "$1,234.56 USD"));
}

#[tokio::test(start_paused = true)]
async fn repeated_price_is_recorded_and_flagged() {
    let page = FakePage::balance_page()
        .showing("$99.00")
        .quote("06/01/2024", "$100.00")
        .quote("06/02/2024", "$100.00");
    let range = DateRange::new(ymd(2024, 6, 1), ymd(2024, 6, 2)).unwrap();

    let mut out = Vec::new();
    let report = run_days(&page, &Config::default(), range, &mut out).await.unwrap();

    assert_eq!(report.unchanged, vec![ymd(2024, 6, 2)]);
    assert!(report.failed.is_empty());
    assert_eq!(rows(&out)[2], row("2024-06-02", "$100.00"));
}

#[tokio::test(start_paused = true)]
async fn exhausted_days_get_empty_prices_and_the_run_continues() {
    let page = FakePage::balance_page().showing("$100.00");
    page.remove(SUBMIT);
    let range = DateRange::new(ymd(2024, 1, 1), ymd(2024, 1, 2)).unwrap();

    let mut out = Vec::new();
    let report = run_days(&page, &Config::default(), range, &mut out).await.unwrap();

    assert_eq!(report.rows, 2);
    assert_eq!(report.failed, vec![ymd(2024, 1, 1), ymd(2024, 1, 2)]);
    assert_eq!(
        rows(&out),
        vec![row("date", "close"), row("2024-01-01", ""), row("2024-01-02", "")]
    );
    assert!(page.submitted().is_empty());

    let not_found = "Could not locate the submit button (tried multiple selectors and frames)";
    assert_eq!(
        report.warnings,
        vec![
            format!("[WARN] 2024-01-01: {not_found}"),
            format!("[WARN] 2024-01-02: {not_found}"),
        ]
    );
}

#[test]
fn exhausted_notice_format() {
    assert_eq!(
        exhausted_notice(ymd(2024, 3, 5), "Browser error: target closed"),
        "[WARN] 2024-03-05: Browser error: target closed"
    );
}

#[tokio::test(start_paused = true)]
async fn starting_today_writes_a_single_row() {
    let today = today_local();
    let start = validate_start(&today.to_string(), today).unwrap();
    let range = DateRange::new(start, today).unwrap();
    let page = FakePage::balance_page()
        .showing("$100.00")
        .quote(&to_mmddyyyy(today), "$101.00");

    let mut out = Vec::new();
    let report = run_days(&page, &Config::default(), range, &mut out).await.unwrap();

    assert_eq!(report.rows, 1);
    assert!(report.warnings.is_empty());
    assert_eq!(
        rows(&out),
        vec![row("date", "close"), row(&today.to_string(), "$101.00")]
    );
}

#[tokio::test(start_paused = true)]
async fn starting_yesterday_writes_two_rows_ending_today() {
    let today = today_local();
    let yesterday = today.pred_opt().unwrap();
    let start = validate_start(&yesterday.to_string(), today).unwrap();
    let range = DateRange::new(start, today).unwrap();
    let page = FakePage::balance_page()
        .showing("$100.00")
        .quote(&to_mmddyyyy(yesterday), "$99.50")
        .quote(&to_mmddyyyy(today), "$101.00");

    let mut out = Vec::new();
    let report = run_days(&page, &Config::default(), range, &mut out).await.unwrap();

    assert_eq!(report.rows, 2);
    assert_eq!(
        rows(&out),
        vec![
            row("date", "close"),
            row(&yesterday.to_string(), "$99.50"),
            row(&today.to_string(), "$101.00"),
        ]
    );
}

#[test]
fn start_after_today_is_rejected() {
    let today = today_local();
    let tomorrow = today.succ_opt().unwrap();
    let err = validate_start(&tomorrow.to_string(), today).unwrap_err();
    assert!(err.is_config());
}

#[tokio::test(start_paused = true)]
async fn each_day_gets_the_full_retry_budget() {
    let page = FakePage::balance_page();
    page.remove(SUBMIT);
    let timing = TimingConfig::default().validate().unwrap();
    let backfill = Backfill::new(&Config::default().selectors, timing, false);

    let started = Instant::now();
    let outcome = backfill.run_day(&page, ymd(2024, 1, 1)).await;

    assert_eq!(outcome.attempts, 3);
    assert_eq!(outcome.close, "");
    match &outcome.status {
        DayStatus::Exhausted(error) => assert!(error.contains("submit button")),
        other => panic!("expected exhausted day, got {other:?}"),
    }

    // Linear backoff: 800ms then 1600ms, each followed by a page reset
    assert!(started.elapsed() >= Duration::from_millis(2_400));
    let resets = page.events().iter().filter(|e| *e == "scroll top").count();
    assert_eq!(resets, 2);
}

#[tokio::test(start_paused = true)]
async fn failed_attempt_is_retried_without_duplicate_rows() {
    let page = FakePage::balance_page()
        .showing("$100.00")
        .quote("01/10/2024", "$105.00")
        .failing_clicks(1);
    let range = DateRange::new(ymd(2024, 1, 10), ymd(2024, 1, 10)).unwrap();

    let mut out = Vec::new();
    let report = run_days(&page, &Config::default(), range, &mut out).await.unwrap();

    assert!(report.failed.is_empty());
    assert_eq!(rows(&out), vec![row("date", "close"), row("2024-01-10", "$105.00")]);
    assert_eq!(page.submitted(), vec!["01/10/2024"]);
    assert!(page.events().contains(&"scroll top".to_string()));
}

#[tokio::test(start_paused = true)]
async fn successful_day_reports_attempt_count() {
    let page = FakePage::balance_page()
        .showing("$100.00")
        .quote("01/10/2024", "$105.00")
        .failing_clicks(2);
    let timing = TimingConfig::default().validate().unwrap();
    let backfill = Backfill::new(&Config::default().selectors, timing, true);

    let outcome = backfill.run_day(&page, ymd(2024, 1, 10)).await;

    assert!(outcome.succeeded());
    assert_eq!(outcome.attempts, 3);
    assert_eq!(outcome.close, "105.00");
    assert_eq!(outcome.status, DayStatus::Succeeded(UpdateStatus::Updated));
}

#[tokio::test(start_paused = true)]
async fn date_typed_into_editable_region_inside_frame() {
    let page = FakePage::new(vec![
        FakeScope::main().visible(SUBMIT),
        FakeScope::frame("widget").visible(EDITABLE).hidden(PRICE),
    ])
    .quote("07/04/2024", "$42.00");
    let range = DateRange::new(ymd(2024, 7, 4), ymd(2024, 7, 4)).unwrap();

    let mut out = Vec::new();
    let report = run_days(&page, &Config::default(), range, &mut out).await.unwrap();

    assert!(report.failed.is_empty());
    assert_eq!(rows(&out)[1], row("2024-07-04", "$42.00"));
    assert!(page.events().contains(&format!("focus {}", EDITABLE)));
}

#[tokio::test(start_paused = true)]
async fn csv_lands_in_the_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prices.csv");
    let page = FakePage::balance_page().quote("12/31/2023", "$7.77");
    let range = DateRange::new(ymd(2023, 12, 31), ymd(2023, 12, 31)).unwrap();

    let file = std::fs::File::create(&path).unwrap();
    run_days(&page, &Config::default(), range, std::io::BufWriter::new(file))
        .await
        .unwrap();

    let written = std::fs::read(&path).unwrap();
    assert_eq!(rows(&written), vec![row("date", "close"), row("2023-12-31", "$7.77")]);
}

#[tokio::test(start_paused = true)]
async fn invalid_selectors_fail_before_any_output() {
    let page = FakePage::balance_page();
    let mut config = Config::default();
    config.selectors.submit_button.clear();
    let range = DateRange::new(ymd(2024, 1, 1), ymd(2024, 1, 1)).unwrap();

    let mut out = Vec::new();
    let err = run_days(&page, &config, range, &mut out).await.unwrap_err();

    assert!(err.is_config());
    assert!(out.is_empty());
    assert!(page.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn oversized_retry_budget_fails_before_any_output() {
    let page = FakePage::balance_page();
    let mut config = Config::default();
    config.timing.per_day_retries = u32::MAX;
    let range = DateRange::new(ymd(2024, 1, 1), ymd(2024, 1, 1)).unwrap();

    let mut out = Vec::new();
    let err = run_days(&page, &config, range, &mut out).await.unwrap_err();

    assert!(err.is_config());
    assert!(err.to_string().contains("per_day_retries"));
    assert!(out.is_empty());
    assert!(page.submitted().is_empty());
}

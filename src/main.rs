// Backfill a per-day price CSV from the as-of-date balance page.
//
// Validates the start date before anything else, then drives one browser
// session through every day from the start date to today.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use price_backfill::dates::{DateRange, today_local, validate_start};
use price_backfill::login::{LOGIN_NOTICE, wait_until_ready};
use price_backfill::{
    BrowserSession, Config, PollPolicy, ScraperError, Timing, load_yaml_config, run_days,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Download historical prices to CSV by iterating dates.")]
struct CliArgs {
    /// Target page URL
    #[arg(long)]
    url: Option<String>,

    /// Start date in YYYY-MM-DD (inclusive)
    #[arg(long)]
    start_date: String,

    /// Output CSV path
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,

    /// Run with a visible browser (recommended for login/MFA)
    #[arg(long)]
    headful: bool,

    /// Slowdown in ms before every page input (e.g. 200)
    #[arg(long, value_name = "MS")]
    slowmo: Option<u64>,

    /// Normalize price text to decimal
    #[arg(long)]
    clean_price: bool,

    /// YAML configuration file (selectors, timing, browser)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

impl CliArgs {
    /// Flags override whatever the config file set
    fn apply(&self, config: &mut Config) {
        if let Some(url) = &self.url {
            config.url = url.clone();
        }
        if let Some(out) = &self.out {
            config.output = out.clone();
        }
        if self.headful {
            config.browser.headless = false;
        }
        if let Some(slowmo) = self.slowmo {
            config.browser.slow_mo_ms = slowmo;
        }
        if self.clean_price {
            config.clean_price = true;
        }
    }
}

fn init_logging(level: &str) -> Result<()> {
    let level: tracing::Level = level.parse().context("Invalid log level")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}

/// Everything that can be rejected before a browser starts
fn prepare(args: &CliArgs) -> Result<(Config, Timing, DateRange), ScraperError> {
    let today = today_local();
    let start = validate_start(&args.start_date, today)?;

    let mut config = load_yaml_config(args.config.as_deref())?;
    args.apply(&mut config);

    url::Url::parse(&config.url)
        .map_err(|e| ScraperError::Config(format!("invalid --url '{}': {}", config.url, e)))?;
    config.selectors.validate()?;
    let timing = config.timing.validate()?;

    Ok((config, timing, DateRange::new(start, today)?))
}

async fn run(config: Config, timing: Timing, range: DateRange) -> Result<()> {
    let session = BrowserSession::launch(&config.browser).await?;
    let result = drive(&session, &config, range, timing).await;
    session.shutdown().await;
    result
}

async fn drive(
    session: &BrowserSession,
    config: &Config,
    range: DateRange,
    timing: Timing,
) -> Result<()> {
    session.navigate(&config.url).await?;

    if !config.browser.headless {
        println!("\n{}\n", LOGIN_NOTICE);
    }

    let surface = session.surface();
    wait_until_ready(
        &surface,
        &config.selectors,
        PollPolicy::new(timing.login_wait, timing.login_poll_interval),
    )
    .await;

    let file = File::create(&config.output)
        .with_context(|| format!("Failed to create {}", config.output.display()))?;
    let report = run_days(&surface, config, range, BufWriter::new(file)).await?;

    info!(
        "Wrote {} row(s) ({} failed, {} unchanged)",
        report.rows,
        report.failed.len(),
        report.unchanged.len()
    );
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    if let Err(e) = init_logging(&args.log_level) {
        eprintln!("Error: {e:#}");
        return ExitCode::FAILURE;
    }

    let (config, timing, range) = match prepare(&args) {
        Ok(prepared) => prepared,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let output = config.output.clone();
    match run(config, timing, range).await {
        Ok(()) => {
            println!("Done. Wrote CSV to: {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Backfill failed: {:#}", e);
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

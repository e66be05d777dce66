use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stockdash_core::analytics::sma::{append_moving_average, MA_COLUMN, MA_WINDOW};
use stockdash_core::dashboard::{self, DashboardRequest};
use stockdash_core::domain::range::{parse_date, DateRange};
use stockdash_core::domain::ticker::Ticker;
use stockdash_core::export::{export_file_name, write_csv};
use stockdash_core::ingest::{loader, provider::YahooChartProvider};

#[derive(Debug, Parser)]
#[command(name = "stockdash_export")]
struct Args {
    /// One of AAPL, GOOG, MSFT, TSLA, AMZN.
    #[arg(long, default_value = "AAPL")]
    ticker: String,

    /// First day (YYYY-MM-DD). Defaults to 180 days before the end date.
    #[arg(long)]
    start_date: Option<String>,

    /// Last day (YYYY-MM-DD), inclusive. Defaults to today.
    #[arg(long)]
    end_date: Option<String>,

    /// Directory to write `{ticker}_stock_data.csv` into.
    #[arg(long, default_value = ".")]
    out: PathBuf,

    /// Append the 20-day moving average column.
    #[arg(long)]
    with_ma: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = stockdash_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let req = build_request(&args, chrono::Local::now().date_naive())?;
    let provider = YahooChartProvider::from_settings(&settings)?;

    let result = if args.with_ma {
        export_with_moving_average(&provider, &req).await
    } else {
        dashboard::export_dashboard(&provider, &req)
            .await
            .map(|export| (export.file_name, export.bytes))
    };

    let (file_name, bytes) = match result {
        Ok(v) => v,
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(ticker = %req.ticker, error = %err, "export failed");
            return Err(err);
        }
    };

    let path = args.out.join(file_name);
    std::fs::write(&path, &bytes).with_context(|| format!("write {} failed", path.display()))?;

    tracing::info!(
        ticker = %req.ticker,
        start = %req.range.start,
        end = %req.range.end,
        path = %path.display(),
        bytes = bytes.len(),
        "wrote csv export"
    );
    Ok(())
}

fn build_request(args: &Args, today: chrono::NaiveDate) -> anyhow::Result<DashboardRequest> {
    let ticker = Ticker::parse(&args.ticker)?;
    let end = match args.end_date.as_deref() {
        Some(s) => parse_date("end_date", s)?,
        None => today,
    };
    let start = match args.start_date.as_deref() {
        Some(s) => parse_date("start_date", s)?,
        None => DateRange::default_ending(end).start,
    };
    let range = DateRange::new(start, end);
    range.check_floor()?;

    Ok(DashboardRequest {
        ticker,
        range,
        seq: None,
    })
}

async fn export_with_moving_average(
    provider: &YahooChartProvider,
    req: &DashboardRequest,
) -> anyhow::Result<(String, Vec<u8>)> {
    let mut table = loader::load(provider, &req.ticker, req.range).await?;
    append_moving_average(
        &mut table,
        &req.ticker.qualified("Close"),
        MA_WINDOW,
        MA_COLUMN,
    )?;
    Ok((export_file_name(&req.ticker), write_csv(&table)?))
}

fn init_sentry(settings: &stockdash_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

use crate::analytics::sma::{append_moving_average, MA_COLUMN, MA_WINDOW};
use crate::chart::{render_charts, ChartDescription, Locale};
use crate::domain::range::DateRange;
use crate::domain::ticker::Ticker;
use crate::export::{export_file_name, write_csv, CSV_CONTENT_TYPE};
use crate::ingest::loader;
use crate::ingest::provider::MarketDataProvider;
use serde::{Deserialize, Serialize};

/// Snapshot of the dashboard inputs for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardRequest {
    pub ticker: Ticker,
    pub range: DateRange,
    /// Client-side request counter, echoed back so a browser can drop a
    /// response that arrives after a newer one.
    pub seq: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardCharts {
    pub seq: Option<u64>,
    pub ticker: Ticker,
    pub range: DateRange,
    pub rows: usize,
    pub price: ChartDescription,
    pub volume: ChartDescription,
    pub moving_average: ChartDescription,
}

#[derive(Debug, Clone)]
pub struct CsvExport {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Input change: load, derive the moving average and describe all three
/// charts. Either every chart is produced or the whole call fails.
pub async fn render_dashboard(
    provider: &dyn MarketDataProvider,
    req: &DashboardRequest,
    locale: Locale,
) -> anyhow::Result<DashboardCharts> {
    let mut table = loader::load(provider, &req.ticker, req.range).await?;
    append_moving_average(
        &mut table,
        &req.ticker.qualified("Close"),
        MA_WINDOW,
        MA_COLUMN,
    )?;
    let [price, volume, moving_average] = render_charts(&table, &req.ticker, locale)?;

    Ok(DashboardCharts {
        seq: req.seq,
        ticker: req.ticker.clone(),
        range: req.range,
        rows: table.len(),
        price,
        volume,
        moving_average,
    })
}

/// Download click: load and serialize the table as loaded, without the
/// derived column.
pub async fn export_dashboard(
    provider: &dyn MarketDataProvider,
    req: &DashboardRequest,
) -> anyhow::Result<CsvExport> {
    let table = loader::load(provider, &req.ticker, req.range).await?;
    let bytes = write_csv(&table)?;
    tracing::info!(
        ticker = %req.ticker,
        rows = table.len(),
        bytes = bytes.len(),
        "csv export ready"
    );

    Ok(CsvExport {
        file_name: export_file_name(&req.ticker),
        content_type: CSV_CONTENT_TYPE,
        bytes,
    })
}

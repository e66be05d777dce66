use crate::domain::range::DateRange;
use crate::domain::table::{PriceTable, Series};
use crate::domain::ticker::Ticker;
use crate::error::SchemaError;
use crate::ingest::frame::FlatFrame;
use crate::ingest::provider::{MarketDataProvider, OHLCV_FIELDS};
use anyhow::{Context, Result};

/// Columns the charts and export depend on.
pub fn required_columns(ticker: &Ticker) -> [String; 2] {
    [ticker.qualified("Close"), ticker.qualified("Volume")]
}

/// Loads a fresh table for one instrument. Nothing is cached; every call hits
/// the provider, except for an inverted range which short-circuits to an empty
/// table with the usual columns.
pub async fn load(
    provider: &dyn MarketDataProvider,
    ticker: &Ticker,
    range: DateRange,
) -> Result<PriceTable> {
    if range.is_inverted() {
        tracing::debug!(
            %ticker,
            start = %range.start,
            end = %range.end,
            "inverted range; returning empty table"
        );
        return empty_table(ticker);
    }

    let raw = provider
        .fetch_daily(ticker, range)
        .await
        .with_context(|| format!("loading {ticker} {}..{}", range.start, range.end))?;
    let flat = raw.flatten()?;
    validate_schema(ticker, &flat)?;
    let table = into_table(flat, range)?;

    tracing::debug!(
        provider = provider.provider_name(),
        %ticker,
        start = %range.start,
        end = %range.end,
        rows = table.len(),
        "loaded price table"
    );
    Ok(table)
}

fn validate_schema(ticker: &Ticker, frame: &FlatFrame) -> Result<()> {
    let missing: Vec<String> = required_columns(ticker)
        .into_iter()
        .filter(|name| !frame.names.contains(name))
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    Err(SchemaError {
        ticker: ticker.to_string(),
        missing,
        found: frame.names.clone(),
    }
    .into())
}

/// Sorts rows by date (stable, so same-day rows keep provider order), drops
/// rows outside the window and turns the index into the `Date` column.
fn into_table(frame: FlatFrame, range: DateRange) -> Result<PriceTable> {
    let mut rows: Vec<usize> = (0..frame.index.len())
        .filter(|&i| range.contains(frame.index[i]))
        .collect();
    rows.sort_by_key(|&i| frame.index[i]);

    let dates = rows.iter().map(|&i| frame.index[i]).collect();
    let mut table = PriceTable::new(dates);
    for (name, column) in frame.names.into_iter().zip(frame.columns) {
        let values = rows.iter().map(|&i| column[i]).collect();
        table.push_series(Series::new(name, values))?;
    }
    Ok(table)
}

fn empty_table(ticker: &Ticker) -> Result<PriceTable> {
    let mut table = PriceTable::new(Vec::new());
    for field in OHLCV_FIELDS {
        table.push_series(Series::new(ticker.qualified(field.as_str()), Vec::new()))?;
    }
    Ok(table)
}

use crate::domain::table::{PriceTable, Series, DATE_COLUMN};
use crate::domain::ticker::Ticker;
use anyhow::{ensure, Context, Result};
use chrono::NaiveDate;

pub const CSV_CONTENT_TYPE: &str = "text/csv";

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn export_file_name(ticker: &Ticker) -> String {
    format!("{ticker}_stock_data.csv")
}

/// Header row of column names, then one row per trading day. Undefined values
/// are written as empty fields.
pub fn write_csv(table: &PriceTable) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(table.column_names())
        .context("failed to write csv header")?;

    let series = table.all_series();
    for (row, date) in table.dates().iter().enumerate() {
        let mut record = Vec::with_capacity(series.len() + 1);
        record.push(date.format(DATE_FORMAT).to_string());
        for s in series {
            record.push(s.values[row].map(|v| v.to_string()).unwrap_or_default());
        }
        wtr.write_record(&record)
            .with_context(|| format!("failed to write csv row for {date}"))?;
    }

    wtr.into_inner()
        .map_err(|e| anyhow::anyhow!("failed to flush csv: {}", e.error()))
}

/// Parses a file produced by [`write_csv`].
pub fn read_csv(bytes: &[u8]) -> Result<PriceTable> {
    let mut rdr = csv::Reader::from_reader(bytes);
    let headers = rdr.headers().context("failed to read csv header")?.clone();
    ensure!(
        headers.get(0) == Some(DATE_COLUMN),
        "first csv column must be {DATE_COLUMN}, got {:?}",
        headers.get(0)
    );

    let width = headers.len();
    let mut dates = Vec::new();
    let mut columns: Vec<Vec<Option<f64>>> = vec![Vec::new(); width - 1];

    for (line, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("failed to read csv row {}", line + 1))?;
        let date = record.get(0).unwrap_or_default();
        dates.push(
            NaiveDate::parse_from_str(date, DATE_FORMAT)
                .with_context(|| format!("row {}: invalid date {date:?}", line + 1))?,
        );
        for (col, field) in columns.iter_mut().zip(record.iter().skip(1)) {
            let value = if field.is_empty() {
                None
            } else {
                Some(
                    field
                        .parse::<f64>()
                        .with_context(|| format!("row {}: invalid number {field:?}", line + 1))?,
                )
            };
            col.push(value);
        }
    }

    let mut table = PriceTable::new(dates);
    for (name, values) in headers.iter().skip(1).zip(columns) {
        table.push_series(Series::new(name, values))?;
    }
    Ok(table)
}

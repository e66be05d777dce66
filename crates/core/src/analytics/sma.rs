use crate::domain::table::{PriceTable, Series};
use anyhow::{ensure, Result};

pub const MA_WINDOW: usize = 20;
pub const MA_COLUMN: &str = "MA20";

/// Trailing simple moving average aligned by position. The first
/// `window - 1` entries, and any entry whose window holds a missing value,
/// are `None`.
pub fn simple_moving_average(values: &[Option<f64>], window: usize) -> Result<Vec<Option<f64>>> {
    ensure!(window > 0, "moving average window must be positive");

    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    let mut missing = 0usize;

    for (i, value) in values.iter().enumerate() {
        match value {
            Some(v) => sum += v,
            None => missing += 1,
        }
        if i >= window {
            match values[i - window] {
                Some(old) => sum -= old,
                None => missing -= 1,
            }
        }

        if i + 1 < window || missing > 0 {
            out.push(None);
        } else {
            out.push(Some(sum / window as f64));
        }
    }
    Ok(out)
}

/// Appends the moving average of `source` to the in-flight table as `name`.
pub fn append_moving_average(
    table: &mut PriceTable,
    source: &str,
    window: usize,
    name: &str,
) -> Result<()> {
    let values = simple_moving_average(&table.series(source)?.values, window)?;
    table.push_series(Series::new(name, values))
}

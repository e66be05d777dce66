use crate::error::MissingColumnError;
use anyhow::ensure;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DATE_COLUMN: &str = "Date";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

impl Series {
    pub fn new(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Daily rows for one instrument: a plain `Date` column plus named numeric
/// columns, all of the same length. Rows are in ascending date order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    series: Vec<Series>,
}

impl PriceTable {
    pub fn new(dates: Vec<NaiveDate>) -> Self {
        Self {
            dates,
            series: Vec::new(),
        }
    }

    pub fn with_series(mut self, series: Series) -> anyhow::Result<Self> {
        self.push_series(series)?;
        Ok(self)
    }

    pub fn push_series(&mut self, series: Series) -> anyhow::Result<()> {
        ensure!(
            series.values.len() == self.dates.len(),
            "column {} has {} values, table has {} rows",
            series.name,
            series.values.len(),
            self.dates.len()
        );
        ensure!(
            series.name != DATE_COLUMN && self.position(&series.name).is_none(),
            "duplicate column {}",
            series.name
        );
        self.series.push(series);
        Ok(())
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn series(&self, name: &str) -> anyhow::Result<&Series> {
        self.position(name)
            .map(|i| &self.series[i])
            .ok_or_else(|| {
                MissingColumnError {
                    column: name.to_string(),
                }
                .into()
            })
    }

    pub fn all_series(&self) -> &[Series] {
        &self.series
    }

    /// Header order as exported: `Date` first, then columns in insertion order.
    pub fn column_names(&self) -> Vec<&str> {
        std::iter::once(DATE_COLUMN)
            .chain(self.series.iter().map(|s| s.name.as_str()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.series.iter().position(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> PriceTable {
        let dates = vec![
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
        ];
        PriceTable::new(dates)
            .with_series(Series::new("Close_AAPL", vec![Some(185.6), Some(184.2)]))
            .unwrap()
    }

    #[test]
    fn date_column_leads_the_header() {
        let t = table();
        assert_eq!(t.column_names(), vec!["Date", "Close_AAPL"]);
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn missing_column_is_a_typed_error() {
        let err = table().series("Close_MSFT").unwrap_err();
        let missing = err.downcast_ref::<MissingColumnError>().unwrap();
        assert_eq!(missing.column, "Close_MSFT");
    }

    #[test]
    fn rejects_ragged_and_duplicate_columns() {
        let mut t = table();
        assert!(t.push_series(Series::new("Volume_AAPL", vec![Some(1.0)])).is_err());
        assert!(t
            .push_series(Series::new("Close_AAPL", vec![None, None]))
            .is_err());
        assert!(t.push_series(Series::new("Date", vec![None, None])).is_err());
    }
}

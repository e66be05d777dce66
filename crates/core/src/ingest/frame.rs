use anyhow::ensure;
use chrono::NaiveDate;

/// Column label as delivered by a provider. Multi-instrument responses use a
/// two-level `(field, ticker)` label; single-level labels pass through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnLabel {
    Single(String),
    TwoLevel(String, String),
}

impl ColumnLabel {
    pub fn two_level(field: impl Into<String>, ticker: impl Into<String>) -> Self {
        Self::TwoLevel(field.into(), ticker.into())
    }
}

/// `("Close", "AAPL")` becomes `Close_AAPL`; empty components leave no
/// dangling separator, so `("Date", "")` becomes `Date`.
pub fn flatten_label(label: &ColumnLabel) -> String {
    match label {
        ColumnLabel::Single(name) => name.trim_matches('_').to_string(),
        ColumnLabel::TwoLevel(field, ticker) => {
            format!("{field}_{ticker}").trim_matches('_').to_string()
        }
    }
}

/// Provider-shaped result before normalization: a date index and
/// column-major numeric values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFrame {
    pub index: Vec<NaiveDate>,
    pub labels: Vec<ColumnLabel>,
    pub columns: Vec<Vec<Option<f64>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatFrame {
    pub index: Vec<NaiveDate>,
    pub names: Vec<String>,
    pub columns: Vec<Vec<Option<f64>>>,
}

impl RawFrame {
    pub fn flatten(self) -> anyhow::Result<FlatFrame> {
        ensure!(
            self.labels.len() == self.columns.len(),
            "frame has {} labels but {} columns",
            self.labels.len(),
            self.columns.len()
        );
        for (label, column) in self.labels.iter().zip(&self.columns) {
            ensure!(
                column.len() == self.index.len(),
                "column {label:?} has {} values, index has {}",
                column.len(),
                self.index.len()
            );
        }

        let names = self.labels.iter().map(flatten_label).collect();
        Ok(FlatFrame {
            index: self.index,
            names,
            columns: self.columns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_two_level_labels() {
        assert_eq!(
            flatten_label(&ColumnLabel::two_level("Close", "AAPL")),
            "Close_AAPL"
        );
        assert_eq!(flatten_label(&ColumnLabel::two_level("Date", "")), "Date");
        assert_eq!(flatten_label(&ColumnLabel::Single("Volume".into())), "Volume");
    }

    #[test]
    fn flatten_rejects_ragged_frames() {
        let frame = RawFrame {
            index: vec![NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()],
            labels: vec![ColumnLabel::two_level("Close", "AAPL")],
            columns: vec![vec![Some(1.0), Some(2.0)]],
        };
        assert!(frame.flatten().is_err());

        let frame = RawFrame {
            index: vec![],
            labels: vec![ColumnLabel::two_level("Close", "AAPL")],
            columns: vec![],
        };
        assert!(frame.flatten().is_err());
    }
}

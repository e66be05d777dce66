use crate::error::InvalidInput;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

pub const DEFAULT_WINDOW_DAYS: i64 = 180;

/// Earliest start date the date picker allows.
pub const MIN_START_DATE: NaiveDate = match NaiveDate::from_ymd_opt(2015, 1, 1) {
    Some(d) => d,
    None => panic!("invalid MIN_START_DATE"),
};

/// Inclusive calendar date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Inverted ranges are kept as given; see [`DateRange::is_inverted`].
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The default window: the 180 days up to and including `today`.
    pub fn default_ending(today: NaiveDate) -> Self {
        Self {
            start: today - Duration::days(DEFAULT_WINDOW_DAYS),
            end: today,
        }
    }

    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn check_floor(&self) -> anyhow::Result<()> {
        if self.start < MIN_START_DATE {
            return Err(InvalidInput::new(
                "start_date",
                format!("{} is before {MIN_START_DATE}", self.start),
            )
            .into());
        }
        Ok(())
    }
}

pub fn parse_date(field: &'static str, s: &str) -> anyhow::Result<NaiveDate> {
    // Date pickers may send a full ISO timestamp; only the date part matters.
    let s = s.trim();
    let date_part = s.split('T').next().unwrap_or(s);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|e| InvalidInput::new(field, format!("{s:?}: {e}")).into())
}

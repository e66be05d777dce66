use crate::analytics::sma::MA_COLUMN;
use crate::domain::table::{PriceTable, DATE_COLUMN};
use crate::domain::ticker::Ticker;
use crate::error::InvalidInput;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Line,
    Bar,
}

/// What to draw, not how: the browser hands this to the plotting library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDescription {
    pub kind: ChartKind,
    pub x_field: String,
    pub y_field: String,
    pub title: String,
    pub x: Vec<NaiveDate>,
    pub y: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    #[default]
    Uk,
    En,
}

impl Locale {
    pub fn price_title(self, ticker: &Ticker) -> String {
        match self {
            Locale::Uk => format!("{ticker} Ціна акцій"),
            Locale::En => format!("{ticker} Price Stock"),
        }
    }

    pub fn volume_title(self, ticker: &Ticker) -> String {
        match self {
            Locale::Uk => format!("{ticker} Обсяг торгів"),
            Locale::En => format!("{ticker} Trading Volume"),
        }
    }

    pub fn moving_average_title(self, ticker: &Ticker) -> String {
        match self {
            Locale::Uk => format!("{ticker} 20-денна змінна середня"),
            Locale::En => format!("{ticker} 20-day Moving Average"),
        }
    }

    pub fn page_title(self) -> &'static str {
        match self {
            Locale::Uk => "Ціни акцій",
            Locale::En => "Stock Prices",
        }
    }
}

impl FromStr for Locale {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uk" | "ua" => Ok(Locale::Uk),
            "en" => Ok(Locale::En),
            other => {
                Err(InvalidInput::new("locale", format!("unsupported locale {other:?}")).into())
            }
        }
    }
}

/// Price line, volume bar and moving-average line, in that order. The table
/// must already carry the moving-average column.
pub fn render_charts(
    table: &PriceTable,
    ticker: &Ticker,
    locale: Locale,
) -> anyhow::Result<[ChartDescription; 3]> {
    let close = ticker.qualified("Close");
    let volume = ticker.qualified("Volume");

    Ok([
        describe(table, ChartKind::Line, &close, locale.price_title(ticker))?,
        describe(table, ChartKind::Bar, &volume, locale.volume_title(ticker))?,
        describe(
            table,
            ChartKind::Line,
            MA_COLUMN,
            locale.moving_average_title(ticker),
        )?,
    ])
}

fn describe(
    table: &PriceTable,
    kind: ChartKind,
    y_field: &str,
    title: String,
) -> anyhow::Result<ChartDescription> {
    let y = table.series(y_field)?.values.clone();
    Ok(ChartDescription {
        kind,
        x_field: DATE_COLUMN.to_string(),
        y_field: y_field.to_string(),
        title,
        x: table.dates().to_vec(),
        y,
    })
}

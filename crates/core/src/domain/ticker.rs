use crate::error::InvalidInput;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Instruments offered in the dashboard dropdown, in display order.
pub const TICKERS: [&str; 5] = ["AAPL", "GOOG", "MSFT", "TSLA", "AMZN"];

pub const DEFAULT_TICKER: &str = "AAPL";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ticker(String);

impl Ticker {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        let symbol = s.trim().to_ascii_uppercase();
        if symbol.is_empty() {
            return Err(InvalidInput::new("ticker", "ticker must be non-empty").into());
        }
        if !TICKERS.contains(&symbol.as_str()) {
            return Err(InvalidInput::new(
                "ticker",
                format!("{symbol} is not one of {}", TICKERS.join(", ")),
            )
            .into());
        }
        Ok(Self(symbol))
    }

    pub fn all() -> impl Iterator<Item = Ticker> {
        TICKERS.iter().map(|s| Ticker((*s).to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Flattened name of a per-instrument field, e.g. `Close_AAPL`.
    pub fn qualified(&self, field: &str) -> String {
        format!("{field}_{}", self.0)
    }
}

impl Default for Ticker {
    fn default() -> Self {
        Self(DEFAULT_TICKER.to_string())
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Ticker {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Ticker> for String {
    fn from(value: Ticker) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        let t = Ticker::parse(" tsla ").unwrap();
        assert_eq!(t.as_str(), "TSLA");
        assert_eq!(t.qualified("Close"), "Close_TSLA");
    }

    #[test]
    fn rejects_empty_and_unlisted_symbols() {
        let err = Ticker::parse("  ").unwrap_err();
        assert!(err.downcast_ref::<InvalidInput>().is_some());

        let err = Ticker::parse("NFLX").unwrap_err();
        assert!(err.to_string().contains("NFLX"));
    }

    #[test]
    fn all_follows_dropdown_order() {
        let all: Vec<String> = Ticker::all().map(String::from).collect();
        assert_eq!(all, TICKERS);
        assert_eq!(Ticker::default().as_str(), DEFAULT_TICKER);
    }
}

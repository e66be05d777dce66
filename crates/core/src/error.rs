use std::fmt;

/// Failure reported by the market-data provider (transport, HTTP status or
/// an error payload). Carried through `anyhow` and recovered with
/// `downcast_ref` where the caller needs to classify it.
#[derive(Debug, Clone)]
pub struct UpstreamError {
    pub provider: &'static str,
    pub ticker: String,
    pub status: Option<u16>,
    pub detail: String,
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(
                f,
                "upstream error (provider={}, ticker={}, status={status}): {}",
                self.provider, self.ticker, self.detail
            ),
            None => write!(
                f,
                "upstream error (provider={}, ticker={}): {}",
                self.provider, self.ticker, self.detail
            ),
        }
    }
}

impl std::error::Error for UpstreamError {}

/// The provider answered, but not in the column shape the loader expects.
#[derive(Debug, Clone)]
pub struct SchemaError {
    pub ticker: String,
    pub missing: Vec<String>,
    pub found: Vec<String>,
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unexpected column shape for {}: missing [{}], found [{}]",
            self.ticker,
            self.missing.join(", "),
            self.found.join(", ")
        )
    }
}

impl std::error::Error for SchemaError {}

#[derive(Debug, Clone)]
pub struct MissingColumnError {
    pub column: String,
}

impl fmt::Display for MissingColumnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "column not found: {}", self.column)
    }
}

impl std::error::Error for MissingColumnError {}

/// Caller-supplied value rejected before any work was done.
#[derive(Debug, Clone)]
pub struct InvalidInput {
    pub field: &'static str,
    pub detail: String,
}

impl InvalidInput {
    pub fn new(field: &'static str, detail: impl Into<String>) -> Self {
        Self {
            field,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for InvalidInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {}", self.field, self.detail)
    }
}

impl std::error::Error for InvalidInput {}

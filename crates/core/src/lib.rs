pub mod analytics;
pub mod chart;
pub mod dashboard;
pub mod domain;
pub mod error;
pub mod export;
pub mod ingest;

pub mod config {
    use crate::chart::Locale;
    use anyhow::Context;

    pub const DEFAULT_DATA_PROVIDER_BASE_URL: &str = "https://query1.finance.yahoo.com";
    pub const DEFAULT_PORT: u16 = 8050;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub data_provider_base_url: String,
        pub data_provider_timeout_secs: Option<u64>,
        pub locale: Locale,
        pub sentry_dsn: Option<String>,
        pub port: u16,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let data_provider_base_url = std::env::var("DATA_PROVIDER_BASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DATA_PROVIDER_BASE_URL.to_string());

            let data_provider_timeout_secs = match std::env::var("DATA_PROVIDER_TIMEOUT_SECS") {
                Ok(s) => Some(
                    s.trim()
                        .parse::<u64>()
                        .with_context(|| format!("invalid DATA_PROVIDER_TIMEOUT_SECS: {s}"))?,
                ),
                Err(_) => None,
            };

            let locale = match std::env::var("DASHBOARD_LOCALE") {
                Ok(s) => s.parse::<Locale>()?,
                Err(_) => Locale::default(),
            };

            let port = std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PORT);

            Ok(Self {
                data_provider_base_url,
                data_provider_timeout_secs,
                locale,
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                port,
            })
        }
    }
}

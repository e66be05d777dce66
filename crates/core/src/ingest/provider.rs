use crate::config::Settings;
use crate::domain::range::DateRange;
use crate::domain::ticker::Ticker;
use crate::error::UpstreamError;
use crate::ingest::frame::{ColumnLabel, RawFrame};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;

const CHART_PATH: &str = "/v8/finance/chart";
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OhlcvField {
    Close,
    High,
    Low,
    Open,
    Volume,
}

impl OhlcvField {
    pub fn as_str(self) -> &'static str {
        match self {
            OhlcvField::Close => "Close",
            OhlcvField::High => "High",
            OhlcvField::Low => "Low",
            OhlcvField::Open => "Open",
            OhlcvField::Volume => "Volume",
        }
    }
}

/// Field order of the flattened frame, matching the download API's column order.
pub const OHLCV_FIELDS: [OhlcvField; 5] = [
    OhlcvField::Close,
    OhlcvField::High,
    OhlcvField::Low,
    OhlcvField::Open,
    OhlcvField::Volume,
];

#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Daily bars for `ticker` covering `range` inclusively. Failures are
    /// returned as-is; there is no retry.
    async fn fetch_daily(&self, ticker: &Ticker, range: DateRange) -> Result<RawFrame>;
}

#[derive(Debug, Clone)]
pub struct YahooChartProvider {
    http: reqwest::Client,
    base_url: String,
}

impl YahooChartProvider {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = settings.data_provider_timeout_secs {
            builder = builder.timeout(std::time::Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .context("failed to build market data http client")?;

        Ok(Self {
            http,
            base_url: settings.data_provider_base_url.clone(),
        })
    }

    fn url(&self, ticker: &Ticker) -> String {
        format!(
            "{}{CHART_PATH}/{}",
            self.base_url.trim_end_matches('/'),
            ticker.as_str()
        )
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers
    }

    fn upstream_error(
        &self,
        ticker: &Ticker,
        status: Option<u16>,
        detail: String,
    ) -> UpstreamError {
        UpstreamError {
            provider: self.provider_name(),
            ticker: ticker.to_string(),
            status,
            detail,
        }
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for YahooChartProvider {
    fn provider_name(&self) -> &'static str {
        "yahoo_chart"
    }

    async fn fetch_daily(&self, ticker: &Ticker, range: DateRange) -> Result<RawFrame> {
        let (period1, period2) = period_bounds(range)?;

        let res = self
            .http
            .get(self.url(ticker))
            .headers(self.headers())
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
                ("includeAdjustedClose", "false".to_string()),
            ])
            .send()
            .await
            .map_err(|e| self.upstream_error(ticker, None, e.to_string()))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| self.upstream_error(ticker, Some(status.as_u16()), e.to_string()))?;

        let body = match serde_json::from_str::<ChartResponse>(&text) {
            Ok(body) => body,
            Err(err) if status.is_success() => {
                let detail = format!("unparsable chart response ({err}): {text}");
                return Err(self
                    .upstream_error(ticker, Some(status.as_u16()), detail)
                    .into());
            }
            Err(_) => {
                return Err(self
                    .upstream_error(ticker, Some(status.as_u16()), text)
                    .into());
            }
        };

        if let Some(err) = body.chart.error.as_ref() {
            return Err(self
                .upstream_error(ticker, Some(status.as_u16()), err.to_string())
                .into());
        }
        if !status.is_success() {
            return Err(self
                .upstream_error(ticker, Some(status.as_u16()), format!("HTTP {status}"))
                .into());
        }

        let frame = chart_to_frame(ticker, body)?;
        tracing::debug!(
            provider = self.provider_name(),
            %ticker,
            rows = frame.index.len(),
            "fetched daily bars"
        );
        Ok(frame)
    }
}

/// Unix bounds for the chart query. `period2` is exclusive upstream, so it is
/// pushed to the start of the day after `range.end`.
fn period_bounds(range: DateRange) -> Result<(i64, i64)> {
    let start = midnight_utc(range.start)?;
    let end = midnight_utc(range.end + Duration::days(1))?;
    Ok((start, end))
}

fn midnight_utc(date: NaiveDate) -> Result<i64> {
    Ok(date
        .and_hms_opt(0, 0, 0)
        .with_context(|| format!("invalid date {date}"))?
        .and_utc()
        .timestamp())
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

impl std::fmt::Display for ChartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}",
            self.code.as_deref().unwrap_or("error"),
            self.description.as_deref().unwrap_or("no description")
        )
    }
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Option<Vec<Quote>>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<f64>>>,
}

impl Quote {
    fn value_at(series: &Option<Vec<Option<f64>>>, idx: usize) -> Option<f64> {
        series.as_ref().and_then(|v| v.get(idx)).and_then(|v| *v)
    }

    fn field(&self, field: OhlcvField) -> &Option<Vec<Option<f64>>> {
        match field {
            OhlcvField::Open => &self.open,
            OhlcvField::High => &self.high,
            OhlcvField::Low => &self.low,
            OhlcvField::Close => &self.close,
            OhlcvField::Volume => &self.volume,
        }
    }
}

fn chart_to_frame(ticker: &Ticker, body: ChartResponse) -> Result<RawFrame> {
    let labels: Vec<ColumnLabel> = OHLCV_FIELDS
        .iter()
        .map(|f| ColumnLabel::two_level(f.as_str(), ticker.as_str()))
        .collect();
    let mut columns: Vec<Vec<Option<f64>>> = vec![Vec::new(); OHLCV_FIELDS.len()];
    let mut index = Vec::new();

    let Some(result) = body.chart.result.and_then(|mut r| r.pop()) else {
        return Ok(RawFrame {
            index,
            labels,
            columns,
        });
    };

    let offset = result.meta.unwrap_or_default().gmtoffset;
    let timestamps = result.timestamp.unwrap_or_default();
    let quote = result
        .indicators
        .and_then(|i| i.quote)
        .and_then(|mut q| q.pop())
        .unwrap_or_default();

    for (idx, ts) in timestamps.iter().enumerate() {
        // Days without a close are holidays or halts; leave them out.
        if Quote::value_at(&quote.close, idx).is_none() {
            continue;
        }
        let date = ts
            .checked_add(offset)
            .and_then(|local| DateTime::<Utc>::from_timestamp(local, 0))
            .with_context(|| format!("timestamp out of range: {ts} (offset {offset})"))?
            .date_naive();

        index.push(date);
        for (column, field) in columns.iter_mut().zip(OHLCV_FIELDS) {
            column.push(Quote::value_at(quote.field(field), idx));
        }
    }

    Ok(RawFrame {
        index,
        labels,
        columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::Locale;
    use axum::http::{header, StatusCode};
    use serde_json::json;

    /// Serves one canned chart response on a local port.
    async fn stub_provider(
        status: StatusCode,
        content_type: &'static str,
        body: impl Into<String>,
    ) -> YahooChartProvider {
        let body: String = body.into();
        let app = axum::Router::new().route(
            "/v8/finance/chart/:ticker",
            axum::routing::get(move || {
                let body = body.clone();
                async move { (status, [(header::CONTENT_TYPE, content_type)], body) }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let settings = Settings {
            data_provider_base_url: format!("http://{addr}/"),
            data_provider_timeout_secs: Some(5),
            locale: Locale::default(),
            sentry_dsn: None,
            port: 0,
        };
        YahooChartProvider::from_settings(&settings).unwrap()
    }

    fn window() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        )
    }

    async fn fetch_err(provider: &YahooChartProvider) -> UpstreamError {
        let ticker = Ticker::parse("AAPL").unwrap();
        let err = provider.fetch_daily(&ticker, window()).await.unwrap_err();
        err.downcast_ref::<UpstreamError>()
            .cloned()
            .unwrap_or_else(|| panic!("expected UpstreamError, got {err:#}"))
    }

    #[tokio::test]
    async fn not_found_with_chart_error_is_upstream_error() {
        let provider = stub_provider(
            StatusCode::NOT_FOUND,
            "application/json",
            json!({
                "chart": {
                    "result": null,
                    "error": {
                        "code": "Not Found",
                        "description": "No data found, symbol may be delisted"
                    }
                }
            })
            .to_string(),
        )
        .await;

        let err = fetch_err(&provider).await;
        assert_eq!(err.status, Some(404));
        assert_eq!(err.provider, "yahoo_chart");
        assert_eq!(err.ticker, "AAPL");
        assert!(err.detail.contains("No data found"), "{}", err.detail);
    }

    #[tokio::test]
    async fn rate_limited_text_body_is_upstream_error() {
        let provider =
            stub_provider(StatusCode::TOO_MANY_REQUESTS, "text/plain", "Too Many Requests").await;

        let err = fetch_err(&provider).await;
        assert_eq!(err.status, Some(429));
        assert_eq!(err.detail, "Too Many Requests");
    }

    #[tokio::test]
    async fn ok_status_with_html_body_is_upstream_error() {
        let provider = stub_provider(
            StatusCode::OK,
            "text/html",
            "<html><body>Before you continue</body></html>",
        )
        .await;

        let err = fetch_err(&provider).await;
        assert_eq!(err.status, Some(200));
        assert!(err.detail.contains("Before you continue"), "{}", err.detail);
    }

    #[tokio::test]
    async fn ok_status_with_chart_payload_parses() {
        let provider = stub_provider(
            StatusCode::OK,
            "application/json",
            json!({
                "chart": {
                    "result": [{
                        "meta": {"gmtoffset": -18000},
                        "timestamp": [1704205800],
                        "indicators": {"quote": [{
                            "open": [187.15],
                            "high": [188.44],
                            "low": [183.89],
                            "close": [185.64],
                            "volume": [82488700]
                        }]}
                    }],
                    "error": null
                }
            })
            .to_string(),
        )
        .await;
        let ticker = Ticker::parse("AAPL").unwrap();

        let frame = provider.fetch_daily(&ticker, window()).await.unwrap();
        assert_eq!(frame.index, vec![NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()]);
        assert_eq!(frame.columns[0], vec![Some(185.64)]);
    }

    fn parse(v: serde_json::Value) -> RawFrame {
        let ticker = Ticker::parse("AAPL").unwrap();
        chart_to_frame(&ticker, serde_json::from_value(v).unwrap()).unwrap()
    }

    #[test]
    fn parses_chart_into_two_level_frame() {
        // 2024-01-02 14:30 UTC and 2024-01-03 14:30 UTC, exchange at UTC-5.
        let frame = parse(json!({
            "chart": {
                "result": [{
                    "meta": {"gmtoffset": -18000},
                    "timestamp": [1704205800, 1704292200],
                    "indicators": {"quote": [{
                        "open": [187.15, 184.22],
                        "high": [188.44, 185.88],
                        "low": [183.89, 183.43],
                        "close": [185.64, 184.25],
                        "volume": [82488700, 58414500]
                    }]}
                }],
                "error": null
            }
        }));

        assert_eq!(
            frame.index,
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            ]
        );
        assert_eq!(frame.labels[0], ColumnLabel::two_level("Close", "AAPL"));
        assert_eq!(frame.labels[4], ColumnLabel::two_level("Volume", "AAPL"));
        assert_eq!(frame.columns[0], vec![Some(185.64), Some(184.25)]);
        assert_eq!(frame.columns[1], vec![Some(188.44), Some(185.88)]);
        assert_eq!(frame.columns[2], vec![Some(183.89), Some(183.43)]);
        assert_eq!(frame.columns[3], vec![Some(187.15), Some(184.22)]);
        assert_eq!(frame.columns[4], vec![Some(82488700.0), Some(58414500.0)]);
    }

    #[test]
    fn drops_days_without_close() {
        let frame = parse(json!({
            "chart": {
                "result": [{
                    "meta": {"gmtoffset": 0},
                    "timestamp": [1704153600, 1704240000],
                    "indicators": {"quote": [{
                        "open": [1.0, 2.0],
                        "high": [1.0, 2.0],
                        "low": [1.0, 2.0],
                        "close": [null, 2.0],
                        "volume": [10, 20]
                    }]}
                }],
                "error": null
            }
        }));

        assert_eq!(frame.index.len(), 1);
        assert_eq!(frame.columns[0], vec![Some(2.0)]);
    }

    #[test]
    fn result_without_timestamps_is_empty() {
        let frame = parse(json!({
            "chart": {
                "result": [{"meta": {"gmtoffset": -18000}, "indicators": {"quote": [{}]}}],
                "error": null
            }
        }));
        assert!(frame.index.is_empty());
        assert_eq!(frame.labels.len(), OHLCV_FIELDS.len());
        assert!(frame.columns.iter().all(|c| c.is_empty()));
    }

    #[test]
    fn period_bounds_cover_the_end_date() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );
        let (p1, p2) = period_bounds(range).unwrap();
        assert_eq!(p1, 1704067200);
        assert_eq!(p2 - p1, 86_400);
    }

    #[test]
    fn chart_error_payload_deserializes() {
        let body: ChartResponse = serde_json::from_value(json!({
            "chart": {
                "result": null,
                "error": {
                    "code": "Not Found",
                    "description": "No data found, symbol may be delisted"
                }
            }
        }))
        .unwrap();
        let err = body.chart.error.unwrap();
        assert_eq!(err.to_string(), "Not Found: No data found, symbol may be delisted");
    }

    #[test]
    fn overflowing_timestamp_is_an_error() {
        let ticker = Ticker::parse("AAPL").unwrap();
        let body: ChartResponse = serde_json::from_value(json!({
            "chart": {
                "result": [{
                    "meta": {"gmtoffset": 3600},
                    "timestamp": [i64::MAX],
                    "indicators": {"quote": [{"close": [1.0]}]}
                }],
                "error": null
            }
        }))
        .unwrap();

        let err = chart_to_frame(&ticker, body).unwrap_err();
        assert!(err.to_string().contains("timestamp out of range"));
    }
}

use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use stockdash_core::chart::Locale;
use stockdash_core::dashboard::{self, DashboardCharts, DashboardRequest};
use stockdash_core::domain::range::{parse_date, DateRange, MIN_START_DATE};
use stockdash_core::domain::ticker::{Ticker, DEFAULT_TICKER, TICKERS};
use stockdash_core::error::{InvalidInput, UpstreamError};
use stockdash_core::ingest::provider::MarketDataProvider;

mod page;

#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn MarketDataProvider>,
    pub locale: Locale,
    /// Source of "today" for the default window, read on every request.
    pub today: fn() -> NaiveDate,
}

impl AppState {
    pub fn new(provider: Arc<dyn MarketDataProvider>, locale: Locale) -> Self {
        Self {
            provider,
            locale,
            today: local_today,
        }
    }
}

fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// The server object. Binaries and external process managers mount this.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/api/tickers", get(get_tickers))
        .route("/api/charts", get(get_charts))
        .route("/api/download", get(download_csv))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn index(State(state): State<AppState>) -> Html<String> {
    let today = (state.today)();
    Html(page::render_index(state.locale, DateRange::default_ending(today)))
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub ticker: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub seq: Option<u64>,
}

impl DashboardQuery {
    /// Missing fields fall back to the default ticker and the default window
    /// ending `today`.
    pub fn into_request(self, today: NaiveDate) -> anyhow::Result<DashboardRequest> {
        let ticker = match self.ticker.as_deref() {
            Some(s) => Ticker::parse(s)?,
            None => Ticker::default(),
        };

        let default = DateRange::default_ending(today);
        let start = match self.start_date.as_deref() {
            Some(s) => parse_date("start_date", s)?,
            None => default.start,
        };
        let end = match self.end_date.as_deref() {
            Some(s) => parse_date("end_date", s)?,
            None => default.end,
        };
        let range = DateRange::new(start, end);
        range.check_floor()?;

        Ok(DashboardRequest {
            ticker,
            range,
            seq: self.seq,
        })
    }
}

async fn get_charts(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardCharts>, StatusCode> {
    let req = query
        .into_request((state.today)())
        .map_err(|e| error_status(&e))?;

    let charts = dashboard::render_dashboard(state.provider.as_ref(), &req, state.locale)
        .await
        .map_err(|e| error_status(&e))?;

    Ok(Json(charts))
}

async fn download_csv(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Response, StatusCode> {
    let req = query
        .into_request((state.today)())
        .map_err(|e| error_status(&e))?;

    let export = dashboard::export_dashboard(state.provider.as_ref(), &req)
        .await
        .map_err(|e| error_status(&e))?;

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        export.file_name
    ))
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/csv; charset=utf-8"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.bytes,
    )
        .into_response())
}

#[derive(Debug, Serialize)]
struct TickersResponse {
    tickers: Vec<&'static str>,
    default_ticker: &'static str,
    default_range: DateRange,
    min_start_date: NaiveDate,
}

async fn get_tickers(State(state): State<AppState>) -> Json<TickersResponse> {
    Json(TickersResponse {
        tickers: TICKERS.to_vec(),
        default_ticker: DEFAULT_TICKER,
        default_range: DateRange::default_ending((state.today)()),
        min_start_date: MIN_START_DATE,
    })
}

/// Rejected input is the caller's fault, a provider failure is a bad
/// gateway, anything else is ours.
fn error_status(err: &anyhow::Error) -> StatusCode {
    if let Some(invalid) = err.downcast_ref::<InvalidInput>() {
        tracing::debug!(field = invalid.field, error = %invalid, "rejected dashboard request");
        return StatusCode::BAD_REQUEST;
    }

    sentry_anyhow::capture_anyhow(err);
    if err.downcast_ref::<UpstreamError>().is_some() {
        tracing::error!(error = %err, cause = %err.root_cause(), "market data fetch failed");
        return StatusCode::BAD_GATEWAY;
    }

    tracing::error!(error = %err, cause = %err.root_cause(), "dashboard request failed");
    StatusCode::INTERNAL_SERVER_ERROR
}

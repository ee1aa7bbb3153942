use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{ConnectInfo, DefaultBodyLimit, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use phishshield_core::error::ScanError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::config::DaemonConfig;
use crate::public_error::PublicErrorCode;
use crate::scan::{ApkScanReport, LinkScanReport, ScanService};

const FORWARDED_FOR: &str = "x-forwarded-for";

#[derive(Debug, Clone, Deserialize)]
pub struct ScanLinkRequest {
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

#[derive(Clone)]
pub struct HttpState {
    pub cfg: Arc<DaemonConfig>,
    pub scanner: Arc<ScanService>,
}

impl HttpState {
    pub fn new(cfg: DaemonConfig, scanner: ScanService) -> Self {
        Self {
            cfg: Arc::new(cfg),
            scanner: Arc::new(scanner),
        }
    }
}

/// Handlers read the peer address, so the router must be served with
/// connect info; [`serve`] does that.
pub fn router(state: HttpState) -> Router {
    Router::new()
        .route(
            "/scan-link",
            post(scan_link).layer(DefaultBodyLimit::max(state.cfg.max_link_body_bytes)),
        )
        .route(
            "/scan-apk",
            post(scan_apk).layer(DefaultBodyLimit::max(state.cfg.max_apk_body_bytes)),
        )
        .route("/flagged", get(flagged))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(
    listener: tokio::net::TcpListener,
    state: HttpState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}

pub async fn bind_listener(addr: &str) -> Result<tokio::net::TcpListener, std::io::Error> {
    let socket: SocketAddr = addr.parse().map_err(|_| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid listen address")
    })?;
    tokio::net::TcpListener::bind(socket).await
}

#[derive(Debug)]
pub struct HttpErr {
    pub(crate) status: StatusCode,
    pub(crate) kind: &'static str,
    pub(crate) response: ErrorResponse,
}

impl HttpErr {
    fn new(status: StatusCode, kind: &'static str, code: PublicErrorCode, error: &str) -> Self {
        Self {
            status,
            kind,
            response: ErrorResponse {
                error: error.to_string(),
                code: code.as_str(),
            },
        }
    }

    fn invalid_json() -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "invalid_json",
            PublicErrorCode::InvalidInput,
            "Invalid JSON body",
        )
    }

    fn from_rejection(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                "body_too_large",
                PublicErrorCode::PayloadTooLarge,
                "Request body too large",
            );
        }
        Self::new(
            StatusCode::BAD_REQUEST,
            "body_unreadable",
            PublicErrorCode::InvalidInput,
            "Request body could not be read",
        )
    }
}

impl From<ScanError> for HttpErr {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::MissingInput("apk") => Self::new(
                StatusCode::BAD_REQUEST,
                "missing_apk",
                PublicErrorCode::MissingInput,
                "APK file missing",
            ),
            ScanError::MissingInput(_) => Self::new(
                StatusCode::BAD_REQUEST,
                "missing_link",
                PublicErrorCode::MissingInput,
                "Missing link",
            ),
            ScanError::MalformedSubject(_) => Self::new(
                StatusCode::BAD_REQUEST,
                "malformed_subject",
                PublicErrorCode::InvalidInput,
                "Malformed link",
            ),
            ScanError::SourceUnavailable { .. } => {
                tracing::error!(error = %err, "scan error escaped the engine");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    PublicErrorCode::Internal,
                    "Internal error",
                )
            }
        }
    }
}

impl IntoResponse for HttpErr {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

async fn scan_link(
    State(state): State<HttpState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let started = Instant::now();
    let outcome = match body {
        Ok(body) => scan_link_impl(&state, &headers, Some(remote), &body).await,
        Err(rejection) => Err(HttpErr::from_rejection(rejection)),
    };
    finish(&state, "scan_link", started, outcome)
}

async fn scan_apk(
    State(state): State<HttpState>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let started = Instant::now();
    let outcome = match body {
        Ok(body) => scan_apk_impl(&state, &body).await,
        Err(rejection) => Err(HttpErr::from_rejection(rejection)),
    };
    finish(&state, "scan_apk", started, outcome)
}

fn finish<T: Serialize>(
    state: &HttpState,
    endpoint: &'static str,
    started: Instant,
    outcome: Result<T, HttpErr>,
) -> Response {
    let telemetry = state.scanner.telemetry();
    telemetry.record_scan_latency_ms(started.elapsed().as_millis() as u64);
    match outcome {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => {
            telemetry.record_request_failure(err.kind);
            tracing::info!(endpoint, kind = err.kind, status = %err.status, "scan request rejected");
            err.into_response()
        }
    }
}

pub async fn scan_link_impl(
    state: &HttpState,
    headers: &HeaderMap,
    remote: Option<SocketAddr>,
    body: &[u8],
) -> Result<LinkScanReport, HttpErr> {
    let req: ScanLinkRequest = serde_json::from_slice(body).map_err(|_| HttpErr::invalid_json())?;
    let link = req
        .link
        .as_deref()
        .filter(|l| !l.trim().is_empty())
        .ok_or(ScanError::MissingInput("link"))?;
    let client_ip = client_ip(headers, remote, state.cfg.trust_forwarded_for);
    let report = state
        .scanner
        .scan_link(link, req.lang.as_deref(), client_ip.as_deref())
        .await?;
    Ok(report)
}

pub async fn scan_apk_impl(state: &HttpState, body: &[u8]) -> Result<ApkScanReport, HttpErr> {
    Ok(state.scanner.scan_apk(body).await?)
}

async fn flagged(State(state): State<HttpState>) -> Response {
    let snapshot = state.scanner.flagged();
    Json(snapshot.as_slice()).into_response()
}

async fn healthz() -> Response {
    Json(json!({"status": "ok"})).into_response()
}

async fn metrics(State(state): State<HttpState>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.scanner.telemetry().render(),
    )
        .into_response()
}

/// First `X-Forwarded-For` hop when trusted, otherwise the peer address.
pub fn client_ip(
    headers: &HeaderMap,
    remote: Option<SocketAddr>,
    trust_forwarded_for: bool,
) -> Option<String> {
    if trust_forwarded_for {
        let forwarded = headers
            .get(FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = forwarded {
            return Some(ip.to_string());
        }
    }
    remote.map(|addr| addr.ip().to_string())
}

//! Logging setup and the per-request logger middleware.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, Method, StatusCode},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tracing::level_filters::LevelFilter;

use crate::config::{LogFormat, ServerConfig};
use crate::error::FailureNote;

/// Map a level name to a filter. Unknown names enable debug output.
pub fn parse_level(level: &str) -> LevelFilter {
    match level.trim().to_ascii_uppercase().as_str() {
        "FATAL" | "ERROR" => LevelFilter::ERROR,
        "WARNING" | "WARN" => LevelFilter::WARN,
        "INFO" => LevelFilter::INFO,
        "DEBUG" => LevelFilter::DEBUG,
        "TRACE" => LevelFilter::TRACE,
        _ => LevelFilter::DEBUG,
    }
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level unless `debug` is set.
pub fn init_logging(config: &ServerConfig, debug: bool) -> anyhow::Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let level = if debug {
        LevelFilter::DEBUG
    } else {
        parse_level(&config.log_level)
    };
    let directives = format!(
        "astrobadge_api={level},astrobadge_verifier={level},tower_http={level},sqlx=warn",
        level = level
    );
    let env_filter = if debug {
        EnvFilter::new(directives)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives))
    };

    let (json, pretty) = match config.log_format {
        LogFormat::Json => (Some(fmt::layer().json().with_target(true)), None),
        LogFormat::Pretty => (
            None,
            Some(fmt::layer().with_target(true).with_line_number(true)),
        ),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json)
        .with(pretty)
        .try_init()?;

    Ok(())
}

/// Observes the outcome of every request.
///
/// Constructed explicitly and handed to the router; it never alters the response.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLogger {
    errors_only: bool,
}

/// What the logger records about one request.
#[derive(Debug)]
pub struct RequestOutcome<'a> {
    /// HTTP method.
    pub method: &'a Method,
    /// Request URI (path and query).
    pub url: &'a str,
    /// Response status.
    pub status: StatusCode,
    /// Wall time spent producing the response.
    pub duration: Duration,
    /// Best-effort client address.
    pub client_address: &'a str,
    /// Failure description, when the handler failed.
    pub error: Option<&'a str>,
}

impl RequestOutcome<'_> {
    /// True when the request should be logged as a failure.
    pub fn failed(&self) -> bool {
        self.error.is_some() || self.status.is_client_error() || self.status.is_server_error()
    }
}

impl RequestLogger {
    /// Create a logger; with `errors_only` successful requests are not recorded.
    pub fn new(errors_only: bool) -> Self {
        Self { errors_only }
    }

    /// Whether successful requests are skipped.
    pub fn errors_only(&self) -> bool {
        self.errors_only
    }

    /// Record one request outcome.
    pub fn observe(&self, outcome: &RequestOutcome<'_>) {
        let duration_ms = outcome.duration.as_secs_f64() * 1000.0;
        if outcome.failed() {
            tracing::error!(
                code = outcome.status.as_u16(),
                method = %outcome.method,
                url = outcome.url,
                ip_address = outcome.client_address,
                request_duration_ms = duration_ms,
                error = outcome.error.unwrap_or("-"),
                "request failed"
            );
        } else if !self.errors_only {
            tracing::info!(
                code = outcome.status.as_u16(),
                method = %outcome.method,
                url = outcome.url,
                ip_address = outcome.client_address,
                request_duration_ms = duration_ms,
                "request processed"
            );
        }
    }
}

/// Client address: first `X-Forwarded-For` hop, `X-Real-IP`, the peer address, or `-`.
pub fn client_address(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(addr) = forwarded {
        return addr.to_string();
    }

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(addr) = real_ip {
        return addr.to_string();
    }

    peer.map(|p| p.ip().to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Middleware recording every request through [`RequestLogger`].
pub async fn log_requests(
    State(logger): State<RequestLogger>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let url = request.uri().to_string();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_address(request.headers(), peer);

    let response = next.run(request).await;

    let error = response
        .extensions()
        .get::<FailureNote>()
        .map(|note| note.0.as_str());
    logger.observe(&RequestOutcome {
        method: &method,
        url: &url,
        status: response.status(),
        duration: start.elapsed(),
        client_address: &client,
        error,
    });

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("FATAL"), LevelFilter::ERROR);
        assert_eq!(parse_level("error"), LevelFilter::ERROR);
        assert_eq!(parse_level("Warning"), LevelFilter::WARN);
        assert_eq!(parse_level("info"), LevelFilter::INFO);
        assert_eq!(parse_level("debug"), LevelFilter::DEBUG);
        assert_eq!(parse_level("verbose"), LevelFilter::DEBUG);
    }

    #[test]
    fn test_client_address_precedence() {
        let peer: SocketAddr = "10.0.0.9:5555".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(client_address(&headers, None), "-");
        assert_eq!(client_address(&headers, Some(peer)), "10.0.0.9");

        headers.insert("x-real-ip", HeaderValue::from_static("192.0.2.7"));
        assert_eq!(client_address(&headers, Some(peer)), "192.0.2.7");

        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.5, 10.0.0.1"),
        );
        assert_eq!(client_address(&headers, Some(peer)), "203.0.113.5");
    }

    #[test]
    fn test_outcome_failed() {
        let method = Method::GET;
        let mut outcome = RequestOutcome {
            method: &method,
            url: "/shields",
            status: StatusCode::OK,
            duration: Duration::from_millis(3),
            client_address: "-",
            error: None,
        };
        assert!(!outcome.failed());
        outcome.status = StatusCode::BAD_REQUEST;
        assert!(outcome.failed());
        outcome.status = StatusCode::OK;
        outcome.error = Some("boom");
        assert!(outcome.failed());
    }
}

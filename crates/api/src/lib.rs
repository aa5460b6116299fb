//! Axum-based intake and badge server for Astrobadge.
//!
//! This crate provides:
//! - `POST /` - verify a signed trust report and keep it as the latest for its repository
//! - `GET /shields?owner=...&name=...` - shields endpoint payload for a repository
//! - `GET /health` - liveness probe

#![warn(missing_docs)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod logging;
/// API server runtime and in-process app builder.
pub mod server;
pub mod store;

pub use config::{LogFormat, ServerConfig, StoreBackend};
pub use dispatch::Dispatcher;
pub use error::{ApiError, ErrorKind};
pub use logging::RequestLogger;
pub use store::{ReportStore, StoreError};

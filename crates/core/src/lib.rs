//! # Astrobadge Core
//!
//! Report types, canonical encodings and badge derivation shared by every Astrobadge
//! component.
//!
//! ## Features
//!
//! - **Domain Types**: RepositoryIdentity, TrustFactor, TrustPercent, SignedReport
//! - **Canonical JSON**: RFC 8785 signing payloads for reports
//! - **Badges**: trust value to shield payload mapping (letter grade or percentage)

#![warn(missing_docs)]

pub mod badge;
pub mod canonical;
pub mod constants;
pub mod error;
pub mod types;

pub use badge::{derive_badge, BadgeColor, BadgePayload, MessageStyle};
pub use constants::*;
pub use error::{CoreError, Result};
pub use types::*;

//! Request dispatch: the ingest pipeline and badge lookup.
//!
//! The dispatcher owns no mutable state. It holds shared handles to the report store and
//! the verifier and is cloned into every handler.

use astrobadge_core::{derive_badge, BadgePayload, MessageStyle, RepositoryIdentity, SignedReport};
use astrobadge_verifier::{signer_fingerprint, ReportVerifier, VerifyError};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::store::ReportStore;

/// Routes intake and badge requests to the verifier and the store.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn ReportStore>,
    verifier: Arc<dyn ReportVerifier>,
    message_style: MessageStyle,
}

impl Dispatcher {
    /// Create a dispatcher over explicit collaborators.
    pub fn new(
        store: Arc<dyn ReportStore>,
        verifier: Arc<dyn ReportVerifier>,
        message_style: MessageStyle,
    ) -> Self {
        Self {
            store,
            verifier,
            message_style,
        }
    }

    /// The report store.
    pub fn store(&self) -> &Arc<dyn ReportStore> {
        &self.store
    }

    /// Badge message style.
    pub fn message_style(&self) -> MessageStyle {
        self.message_style
    }

    /// Decode, verify and persist a candidate report.
    ///
    /// Nothing is written unless verification accepts the report. Once decoding succeeds the
    /// verify and persist steps run on their own task, so a client disconnecting mid-request
    /// cannot leave a verified report half persisted.
    pub async fn ingest(&self, body: &[u8]) -> Result<SignedReport, ApiError> {
        let report = SignedReport::from_slice(body).map_err(|e| {
            ApiError::malformed_input(format!("Invalid report: {}", e)).at_stage("decode")
        })?;
        debug!("Decoded report for {}", report.identity());

        let this = self.clone();
        tokio::spawn(async move { this.verify_and_persist(report).await })
            .await
            .map_err(|e| ApiError::verification_fault(format!("Ingest task failed: {}", e)))?
    }

    /// Verify an already decoded report and persist it on acceptance.
    pub async fn verify_and_persist(&self, report: SignedReport) -> Result<SignedReport, ApiError> {
        let verifier = Arc::clone(&self.verifier);
        let report = tokio::task::spawn_blocking(move || {
            let verdict = verifier.check(&report);
            (report, verdict)
        })
        .await
        .map_err(|e| ApiError::verification_fault(format!("Verifier task failed: {}", e)))
        .and_then(|(report, verdict)| match verdict {
            Ok(()) => Ok(report),
            Err(VerifyError::Rejected(reason)) => Err(ApiError::unauthorized(reason)),
            Err(VerifyError::Fault(reason)) => Err(ApiError::verification_fault(reason)),
        })?;

        self.store
            .put(&report)
            .await
            .map_err(ApiError::storage_write_failure)?;

        let signer = signer_fingerprint(&report).unwrap_or_else(|| "-".to_string());
        info!(
            repository = %report.identity(),
            signer = %signer,
            store = self.store.backend(),
            "Stored trust report"
        );
        Ok(report)
    }

    /// Badge for the repository named by the query parameters.
    ///
    /// Missing parameters are errors. Once both are present the lookup cannot fail: names
    /// that can never be stored, absent reports and read failures all produce the
    /// unavailable badge.
    pub async fn badge(
        &self,
        owner: Option<&str>,
        name: Option<&str>,
    ) -> Result<BadgePayload, ApiError> {
        let owner = required("owner", owner)?;
        let name = required("name", name)?;
        let identity = match RepositoryIdentity::new(owner, name) {
            Ok(identity) => identity,
            Err(e) => {
                debug!("Serving unavailable badge for {}/{}: {}", owner, name, e);
                return Ok(BadgePayload::unavailable());
            }
        };

        let report = match self.store.get(&identity).await {
            Ok(report) => report,
            Err(e) => {
                warn!("Serving unavailable badge for {}: {}", identity, e);
                None
            }
        };

        Ok(derive_badge(report.as_ref(), self.message_style))
    }
}

fn required<'a>(parameter: &'static str, value: Option<&'a str>) -> Result<&'a str, ApiError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::missing_parameter(parameter)),
    }
}

//! Astrobadge report verifier.
//!
//! Verifies:
//! - report structure (type tag, overall factor, factor ranges)
//! - signer authenticity against a configured set of trusted ed25519 keys
//! - the ed25519 signature over the RFC 8785 canonical report (minus `signature`)
//!
//! Rejections ([`VerifyError::Rejected`]) mean the candidate is not acceptable; faults
//! ([`VerifyError::Fault`]) mean the verifier itself could not reach a verdict.

use anyhow::Context;
use astrobadge_core::{SignedReport, TrustFactor, REPORT_TYPE_V1, SIGNATURE_FIELD};
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Verification outcome other than acceptance.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// The report is invalid or its signature does not hold.
    #[error("report rejected: {0}")]
    Rejected(String),

    /// The verifier failed internally and reached no verdict.
    #[error("verifier fault: {0}")]
    Fault(String),
}

impl VerifyError {
    fn rejected(msg: impl Into<String>) -> Self {
        VerifyError::Rejected(msg.into())
    }
}

/// Something that can accept or reject a candidate report.
///
/// Implementations must be pure with respect to external state beyond the candidate and
/// their own configuration; they may be CPU-heavy and are run off the async executor.
pub trait ReportVerifier: Send + Sync {
    /// `Ok(())` when the report is accepted.
    fn check(&self, report: &SignedReport) -> Result<(), VerifyError>;
}

/// Decode a binary field given as `0x`-hex, `base64:`-prefixed or bare standard base64.
pub fn decode_binary_field(field: &str, value: &str) -> Result<Vec<u8>, String> {
    let value = value.trim();
    let value = value.strip_prefix("base64:").unwrap_or(value);
    if let Some(hex_str) = value.strip_prefix("0x") {
        return hex::decode(hex_str).map_err(|e| format!("Invalid hex {}: {}", field, e));
    }
    base64::engine::general_purpose::STANDARD
        .decode(value)
        .map_err(|e| format!("Invalid base64 {}: {}", field, e))
}

/// Parse an ed25519 public key from its text form.
pub fn parse_public_key(value: &str) -> anyhow::Result<VerifyingKey> {
    let bytes = decode_binary_field("public key", value).map_err(|e| anyhow::anyhow!(e))?;
    let bytes: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| anyhow::anyhow!("expected 32 bytes, got {}", bytes.len()))?;
    VerifyingKey::from_bytes(&bytes).context("invalid ed25519 public key")
}

/// Parse a 32-byte ed25519 signing key seed from hex (with or without `0x`).
pub fn parse_signing_key(value: &str) -> anyhow::Result<SigningKey> {
    let s = value.trim();
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).context("signing key must be hex")?;
    anyhow::ensure!(bytes.len() == 32, "expected 32 bytes, got {}", bytes.len());
    let seed = <[u8; 32]>::try_from(bytes.as_slice())?;
    Ok(SigningKey::from_bytes(&seed))
}

/// Base64 text form of a public key, as used in `signerPubKey` and configuration.
pub fn encode_public_key(key: &VerifyingKey) -> String {
    base64::engine::general_purpose::STANDARD.encode(key.as_bytes())
}

/// Short stable identifier for a key: first 16 hex chars of `sha256(pubkey)`.
pub fn key_fingerprint(key: &VerifyingKey) -> String {
    let digest = Sha256::digest(key.as_bytes());
    hex::encode(&digest[..8])
}

/// Fingerprint of the key a report claims to be signed by, if it decodes.
pub fn signer_fingerprint(report: &SignedReport) -> Option<String> {
    let key = report.report().signer_pub_key.as_deref()?;
    parse_public_key(key).ok().map(|k| key_fingerprint(&k))
}

/// Set of public keys whose reports are accepted.
#[derive(Debug, Clone, Default)]
pub struct TrustedKeys {
    keys: Vec<VerifyingKey>,
}

impl TrustedKeys {
    /// Build from already parsed keys.
    pub fn new(keys: Vec<VerifyingKey>) -> Self {
        Self { keys }
    }

    /// Parse every entry, failing on the first invalid key.
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> anyhow::Result<Self> {
        let mut keys = Vec::with_capacity(entries.len());
        for entry in entries {
            let entry = entry.as_ref().trim();
            if entry.is_empty() {
                continue;
            }
            let key = parse_public_key(entry)
                .with_context(|| format!("Invalid trusted key: {}", entry))?;
            keys.push(key);
        }
        Ok(Self { keys })
    }

    /// True if `key` is trusted.
    pub fn contains(&self, key: &VerifyingKey) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    /// Number of trusted keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True when no key is trusted, i.e. every report is rejected.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Structural checks that do not involve cryptography.
pub fn check_structure(report: &SignedReport) -> Result<(), VerifyError> {
    match report.report().ty.as_deref() {
        Some(REPORT_TYPE_V1) => {}
        Some(other) => {
            return Err(VerifyError::rejected(format!(
                "Invalid type {} (expected {})",
                other, REPORT_TYPE_V1
            )))
        }
        None => {
            return Err(VerifyError::rejected(format!(
                "Missing type (expected {})",
                REPORT_TYPE_V1
            )))
        }
    }

    if report.overall().is_none() {
        return Err(VerifyError::rejected("Missing overall trust factor"));
    }

    for (factor, score) in &report.report().factors {
        if !score.trust_percent.is_in_range() {
            return Err(VerifyError::rejected(format!(
                "Factor {} trustPercent {} outside [0, 1]",
                factor, score.trust_percent
            )));
        }
    }

    Ok(())
}

/// ed25519 verifier backed by a trusted key set.
#[derive(Debug, Clone)]
pub struct Ed25519ReportVerifier {
    trusted: TrustedKeys,
}

impl Ed25519ReportVerifier {
    /// Create a verifier accepting reports signed by any of `trusted`.
    pub fn new(trusted: TrustedKeys) -> Self {
        Self { trusted }
    }

    /// The trusted key set.
    pub fn trusted_keys(&self) -> &TrustedKeys {
        &self.trusted
    }
}

impl ReportVerifier for Ed25519ReportVerifier {
    fn check(&self, report: &SignedReport) -> Result<(), VerifyError> {
        check_structure(report)?;

        let fields = report.report();
        let pubkey_str = fields
            .signer_pub_key
            .as_deref()
            .ok_or_else(|| VerifyError::rejected("Missing signerPubKey"))?;
        let signer = parse_public_key(pubkey_str)
            .map_err(|e| VerifyError::rejected(format!("Invalid signerPubKey: {}", e)))?;

        if !self.trusted.contains(&signer) {
            return Err(VerifyError::rejected(format!(
                "Signer {} is not trusted",
                key_fingerprint(&signer)
            )));
        }

        let sig_str = fields
            .signature
            .as_deref()
            .ok_or_else(|| VerifyError::rejected("Missing signature"))?;
        let sig_bytes = decode_binary_field(SIGNATURE_FIELD, sig_str).map_err(VerifyError::Rejected)?;
        let signature = Signature::from_slice(&sig_bytes)
            .map_err(|e| VerifyError::rejected(format!("Invalid ed25519 signature: {}", e)))?;

        let payload = report
            .signing_payload()
            .map_err(|e| VerifyError::Fault(e.to_string()))?;

        signer
            .verify_strict(&payload, &signature)
            .map_err(|_| VerifyError::rejected("Invalid signature"))
    }
}

/// Sign a report document in place of any existing `signerPubKey`/`signature`.
///
/// The returned document verifies against a [`TrustedKeys`] set containing the signer's
/// public key.
pub fn sign_report(document: Value, signing_key: &SigningKey) -> anyhow::Result<Value> {
    let mut document = document;
    let map = document
        .as_object_mut()
        .context("report must be a JSON object")?;
    map.remove(SIGNATURE_FIELD);
    map.insert(
        "signerPubKey".to_string(),
        Value::String(encode_public_key(&signing_key.verifying_key())),
    );
    if !map.contains_key("type") {
        map.insert("type".to_string(), Value::String(REPORT_TYPE_V1.to_string()));
    }

    let payload = astrobadge_core::canonical::signing_payload(&document)?;
    let signature = signing_key.sign(&payload);

    let map = document
        .as_object_mut()
        .context("report must be a JSON object")?;
    map.insert(
        SIGNATURE_FIELD.to_string(),
        Value::String(base64::engine::general_purpose::STANDARD.encode(signature.to_bytes())),
    );
    Ok(document)
}

/// Trust values of every known factor present, in factor order.
pub fn factor_summary(report: &SignedReport) -> Vec<(TrustFactor, f64)> {
    TrustFactor::ALL
        .into_iter()
        .filter_map(|f| report.factor(f).map(|p| (f, p.value())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(seed: u8) -> SigningKey {
        SigningKey::from_bytes(&[seed; 32])
    }

    fn unsigned(overall: f64) -> Value {
        json!({
            "repositoryOwner": "ullaakut",
            "repositoryName": "astronomer",
            "factors": {
                "overall": { "trustPercent": overall },
                "accountAge": { "trustPercent": 0.5 }
            },
            "stargazers": 1234
        })
    }

    fn verifier_for(keys: &[&SigningKey]) -> Ed25519ReportVerifier {
        Ed25519ReportVerifier::new(TrustedKeys::new(
            keys.iter().map(|k| k.verifying_key()).collect(),
        ))
    }

    fn decode(doc: Value) -> SignedReport {
        SignedReport::from_document(doc).expect("decodable report")
    }

    #[test]
    fn test_signed_report_is_accepted() {
        let signer = key(0x11);
        let doc = sign_report(unsigned(0.85), &signer).unwrap();
        assert_eq!(doc["type"], REPORT_TYPE_V1);

        let verifier = verifier_for(&[&signer]);
        assert_eq!(verifier.check(&decode(doc)), Ok(()));
    }

    #[test]
    fn test_tampered_report_is_rejected() {
        let signer = key(0x11);
        let mut doc = sign_report(unsigned(0.25), &signer).unwrap();
        doc["factors"]["overall"]["trustPercent"] = json!(0.99);

        let err = verifier_for(&[&signer]).check(&decode(doc)).unwrap_err();
        assert_eq!(err, VerifyError::Rejected("Invalid signature".to_string()));
    }

    #[test]
    fn test_tampered_unknown_field_is_rejected() {
        let signer = key(0x11);
        let mut doc = sign_report(unsigned(0.85), &signer).unwrap();
        doc["stargazers"] = json!(99999);

        assert!(matches!(
            verifier_for(&[&signer]).check(&decode(doc)),
            Err(VerifyError::Rejected(_))
        ));
    }

    #[test]
    fn test_untrusted_signer_is_rejected() {
        let signer = key(0x11);
        let other = key(0x22);
        let doc = sign_report(unsigned(0.85), &signer).unwrap();

        let err = verifier_for(&[&other]).check(&decode(doc)).unwrap_err();
        assert!(matches!(err, VerifyError::Rejected(msg) if msg.contains("not trusted")));
    }

    #[test]
    fn test_empty_trust_set_rejects_everything() {
        let signer = key(0x11);
        let doc = sign_report(unsigned(0.85), &signer).unwrap();
        let verifier = Ed25519ReportVerifier::new(TrustedKeys::default());
        assert!(verifier.trusted_keys().is_empty());
        assert!(verifier.check(&decode(doc)).is_err());
    }

    #[test]
    fn test_missing_signature_is_rejected() {
        let signer = key(0x11);
        let mut doc = sign_report(unsigned(0.85), &signer).unwrap();
        doc.as_object_mut().unwrap().remove("signature");

        let err = verifier_for(&[&signer]).check(&decode(doc)).unwrap_err();
        assert_eq!(err, VerifyError::Rejected("Missing signature".to_string()));
    }

    #[test]
    fn test_structural_rejections() {
        let signer = key(0x11);
        let verifier = verifier_for(&[&signer]);

        let out_of_range = sign_report(unsigned(1.2), &signer).unwrap();
        assert!(matches!(
            verifier.check(&decode(out_of_range)),
            Err(VerifyError::Rejected(msg)) if msg.contains("outside")
        ));

        let mut wrong_type = unsigned(0.5);
        wrong_type["type"] = json!("astronomer.report.v0");
        let wrong_type = sign_report(wrong_type, &signer).unwrap();
        assert!(matches!(
            verifier.check(&decode(wrong_type)),
            Err(VerifyError::Rejected(msg)) if msg.contains("Invalid type")
        ));

        let mut no_overall = unsigned(0.5);
        no_overall["factors"].as_object_mut().unwrap().remove("overall");
        let no_overall = sign_report(no_overall, &signer).unwrap();
        assert!(matches!(
            verifier.check(&decode(no_overall)),
            Err(VerifyError::Rejected(msg)) if msg.contains("overall")
        ));
    }

    #[test]
    fn test_hex_encoded_signature_is_accepted() {
        let signer = key(0x33);
        let mut doc = sign_report(unsigned(0.6), &signer).unwrap();
        let sig = decode_binary_field("signature", doc["signature"].as_str().unwrap()).unwrap();
        doc["signature"] = json!(format!("0x{}", hex::encode(sig)));

        assert_eq!(verifier_for(&[&signer]).check(&decode(doc)), Ok(()));
    }

    #[test]
    fn test_trusted_keys_parse() {
        let signer = key(0x44);
        let b64 = encode_public_key(&signer.verifying_key());
        let hex_key = format!("0x{}", hex::encode(signer.verifying_key().as_bytes()));

        let keys = TrustedKeys::parse(&[b64.as_str(), " ", hex_key.as_str()]).unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&signer.verifying_key()));

        assert!(TrustedKeys::parse(&["0x1234"]).is_err());
    }

    #[test]
    fn test_parse_signing_key() {
        let parsed = parse_signing_key(&format!("0x{}", "11".repeat(32))).unwrap();
        assert_eq!(parsed.to_bytes(), key(0x11).to_bytes());
        assert!(parse_signing_key("abcd").is_err());
    }

    #[test]
    fn test_fingerprints() {
        let signer = key(0x11);
        let doc = sign_report(unsigned(0.85), &signer).unwrap();
        let fp = signer_fingerprint(&decode(doc)).unwrap();
        assert_eq!(fp.len(), 16);
        assert_eq!(fp, key_fingerprint(&signer.verifying_key()));
    }

    #[test]
    fn test_factor_summary_order() {
        let report = decode(unsigned(0.85));
        let summary = factor_summary(&report);
        assert_eq!(
            summary,
            vec![(TrustFactor::Overall, 0.85), (TrustFactor::AccountAge, 0.5)]
        );
    }
}

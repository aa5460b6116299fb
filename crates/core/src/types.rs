//! Core types for Astrobadge.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::canonical;
use crate::error::{CoreError, Result};

/// Repository identity: the `(owner, name)` pair a report is keyed by.
///
/// Both parts are case-sensitive and must be usable as a single path component, so the
/// derived storage key can never escape a report directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepositoryIdentity {
    owner: String,
    name: String,
}

impl RepositoryIdentity {
    /// Create a new identity, validating both parts.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let owner = owner.into();
        let name = name.into();
        validate_part("owner", &owner)?;
        validate_part("name", &name)?;
        Ok(Self { owner, name })
    }

    /// Repository owner (user or organisation).
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Deterministic storage key, `owner-name`.
    ///
    /// `%` and `-` inside either part are percent-escaped, so the key is injective:
    /// `a-b/c` and `a/b-c` map to `a%2Db-c` and `a-b%2Dc`.
    pub fn storage_key(&self) -> String {
        format!("{}-{}", escape_key_part(&self.owner), escape_key_part(&self.name))
    }
}

fn escape_key_part(part: &str) -> String {
    let mut escaped = String::with_capacity(part.len());
    for c in part.chars() {
        match c {
            '%' => escaped.push_str("%25"),
            '-' => escaped.push_str("%2D"),
            c => escaped.push(c),
        }
    }
    escaped
}

impl fmt::Display for RepositoryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

fn validate_part(field: &'static str, value: &str) -> Result<()> {
    let reason = if value.is_empty() {
        "must not be empty"
    } else if value == "." || value == ".." {
        "must not be a relative path segment"
    } else if value.contains(['/', '\\', '\0']) {
        "must not contain path separators or NUL"
    } else {
        return Ok(());
    };
    Err(CoreError::InvalidIdentity { field, reason })
}

/// One named dimension of trust measurement.
///
/// The set is closed; `Overall` is the aggregate the badge is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrustFactor {
    /// Aggregate trust across every other factor.
    Overall,
    /// Contribution count weighted by repository popularity.
    WeightedContributions,
    /// Contributions made to private repositories.
    PrivateContributions,
    /// Issues opened by stargazers.
    CreatedIssues,
    /// Commits authored by stargazers.
    CommitsCreated,
    /// Pull requests opened by stargazers.
    PullRequests,
    /// Code reviews performed by stargazers.
    CodeReviews,
    /// Age of the stargazer accounts.
    AccountAge,
}

impl TrustFactor {
    /// Every known factor, `Overall` first.
    pub const ALL: [TrustFactor; 8] = [
        TrustFactor::Overall,
        TrustFactor::WeightedContributions,
        TrustFactor::PrivateContributions,
        TrustFactor::CreatedIssues,
        TrustFactor::CommitsCreated,
        TrustFactor::PullRequests,
        TrustFactor::CodeReviews,
        TrustFactor::AccountAge,
    ];

    /// Wire name of the factor.
    pub const fn as_str(&self) -> &'static str {
        match self {
            TrustFactor::Overall => "overall",
            TrustFactor::WeightedContributions => "weightedContributions",
            TrustFactor::PrivateContributions => "privateContributions",
            TrustFactor::CreatedIssues => "createdIssues",
            TrustFactor::CommitsCreated => "commitsCreated",
            TrustFactor::PullRequests => "pullRequests",
            TrustFactor::CodeReviews => "codeReviews",
            TrustFactor::AccountAge => "accountAge",
        }
    }
}

impl FromStr for TrustFactor {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        TrustFactor::ALL
            .into_iter()
            .find(|factor| factor.as_str() == s)
            .ok_or(())
    }
}

impl fmt::Display for TrustFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trust value of a factor, nominally within `[0.0, 1.0]`.
///
/// Range is not enforced here; the verifier rejects out-of-range reports before they are
/// stored, and badge derivation deliberately performs no clamping.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrustPercent(f64);

impl TrustPercent {
    /// Wrap a raw value.
    pub const fn new(value: f64) -> Self {
        TrustPercent(value)
    }

    /// Get the raw value.
    pub const fn value(&self) -> f64 {
        self.0
    }

    /// True if the value is finite and within `[0.0, 1.0]`.
    pub fn is_in_range(&self) -> bool {
        self.0.is_finite() && (0.0..=1.0).contains(&self.0)
    }
}

impl fmt::Display for TrustPercent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Score entry for a single factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorScore {
    /// Factor trust value.
    #[serde(rename = "trustPercent")]
    pub trust_percent: TrustPercent,
}

/// Typed view of the report fields the service relies on.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrustReport {
    /// Report type tag (`astrobadge.report.v1`).
    #[serde(rename = "type", default)]
    pub ty: Option<String>,
    /// Repository owner as carried by the report.
    #[serde(rename = "repositoryOwner")]
    pub owner: String,
    /// Repository name as carried by the report.
    #[serde(rename = "repositoryName")]
    pub name: String,
    /// Known factor scores. Unknown factor keys are skipped here but kept in the document.
    #[serde(default, deserialize_with = "deserialize_known_factors")]
    pub factors: BTreeMap<TrustFactor, FactorScore>,
    /// Signer public key (base64 or `0x` hex).
    #[serde(rename = "signerPubKey", default)]
    pub signer_pub_key: Option<String>,
    /// Detached signature over the canonical document (base64 or `0x` hex).
    #[serde(default)]
    pub signature: Option<String>,
}

fn deserialize_known_factors<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<TrustFactor, FactorScore>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
    let mut factors = BTreeMap::new();
    for (key, value) in raw {
        let Ok(factor) = key.parse::<TrustFactor>() else {
            continue;
        };
        let score = FactorScore::deserialize(value)
            .map_err(|e| serde::de::Error::custom(format!("factor {}: {}", factor, e)))?;
        factors.insert(factor, score);
    }
    Ok(factors)
}

/// A decoded candidate report together with its original JSON document.
///
/// The document is what gets signed and persisted, so fields this service does not know
/// about survive a store round trip untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedReport {
    identity: RepositoryIdentity,
    report: TrustReport,
    document: Value,
}

impl SignedReport {
    /// Decode a report from raw request bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let document: Value =
            serde_json::from_slice(bytes).map_err(|e| CoreError::MalformedReport(e.to_string()))?;
        Self::from_document(document)
    }

    /// Decode a report from an already parsed JSON document.
    pub fn from_document(document: Value) -> Result<Self> {
        if !document.is_object() {
            return Err(CoreError::MalformedReport(
                "expected a JSON object".to_string(),
            ));
        }

        let report = TrustReport::deserialize(&document)
            .map_err(|e| CoreError::MalformedReport(e.to_string()))?;
        let identity = RepositoryIdentity::new(report.owner.clone(), report.name.clone())?;

        Ok(Self {
            identity,
            report,
            document,
        })
    }

    /// Repository the report describes.
    pub fn identity(&self) -> &RepositoryIdentity {
        &self.identity
    }

    /// Typed report fields.
    pub fn report(&self) -> &TrustReport {
        &self.report
    }

    /// Original JSON document.
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Consume the report, returning the JSON document.
    pub fn into_document(self) -> Value {
        self.document
    }

    /// Score of a single factor, if present.
    pub fn factor(&self, factor: TrustFactor) -> Option<TrustPercent> {
        self.report.factors.get(&factor).map(|s| s.trust_percent)
    }

    /// Aggregate trust value.
    pub fn overall(&self) -> Option<TrustPercent> {
        self.factor(TrustFactor::Overall)
    }

    /// Bytes covered by the report signature.
    pub fn signing_payload(&self) -> Result<Vec<u8>> {
        canonical::signing_payload(&self.document)
    }

    /// Serialize the document for storage.
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.document).map_err(|e| CoreError::Canonicalization(e.to_string()))
    }
}

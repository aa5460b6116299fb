//! Wire and presentation constants.

/// `type` tag carried by every signed trust report.
pub const REPORT_TYPE_V1: &str = "astrobadge.report.v1";

/// Badge payload schema version expected by shield-style renderers.
pub const BADGE_SCHEMA_VERSION: u32 = 1;

/// Label rendered on the left side of the badge.
pub const BADGE_LABEL: &str = "astro rating";

/// Message shown when no usable report exists for a repository.
pub const BADGE_UNAVAILABLE_MESSAGE: &str = "unavailable";

/// JSON member holding the report signature. Excluded from the signed bytes.
pub const SIGNATURE_FIELD: &str = "signature";

//! Badge derivation.
//!
//! Maps a stored report (or its absence) to the JSON payload consumed by shield-style badge
//! renderers. Derivation is pure: identical inputs always give byte-identical output.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::{BADGE_LABEL, BADGE_SCHEMA_VERSION, BADGE_UNAVAILABLE_MESSAGE};
use crate::error::CoreError;
use crate::types::{SignedReport, TrustPercent};

/// Badge color understood by badge renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeColor {
    /// High trust.
    Success,
    /// Medium trust.
    Yellow,
    /// Low trust.
    Red,
    /// No report available.
    Inactive,
}

/// Badge payload served by `/shields`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgePayload {
    /// Always [`BADGE_SCHEMA_VERSION`].
    #[serde(rename = "schemaVersion")]
    pub schema_version: u32,
    /// Left-hand label.
    pub label: String,
    /// Right-hand message (grade, percentage or `unavailable`).
    pub message: String,
    /// Right-hand color.
    pub color: BadgeColor,
}

impl BadgePayload {
    /// The badge served when no usable report exists.
    pub fn unavailable() -> Self {
        Self::with(BADGE_UNAVAILABLE_MESSAGE.to_string(), BadgeColor::Inactive)
    }

    fn with(message: String, color: BadgeColor) -> Self {
        Self {
            schema_version: BADGE_SCHEMA_VERSION,
            label: BADGE_LABEL.to_string(),
            message,
            color,
        }
    }
}

/// How the badge message is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageStyle {
    /// Rounded percentage, e.g. `85%`. Colors: `>= 0.75` success, `>= 0.5` yellow.
    Percentage,
    /// Letter grade A-E. Colors: `> 0.6` success, `> 0.4` yellow.
    #[default]
    LetterGrade,
}

impl FromStr for MessageStyle {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "lettergrade" | "letter" | "grade" => Ok(MessageStyle::LetterGrade),
            "percentage" | "percent" => Ok(MessageStyle::Percentage),
            _ => Err(CoreError::UnknownMessageStyle(s.to_string())),
        }
    }
}

impl fmt::Display for MessageStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageStyle::Percentage => f.write_str("percentage"),
            MessageStyle::LetterGrade => f.write_str("letterGrade"),
        }
    }
}

/// Letter grade, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LetterGrade {
    /// `p > 0.8`
    A,
    /// `p > 0.6`
    B,
    /// `p > 0.4`
    C,
    /// `p > 0.2`
    D,
    /// Everything else.
    E,
}

impl fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LetterGrade::A => "A",
            LetterGrade::B => "B",
            LetterGrade::C => "C",
            LetterGrade::D => "D",
            LetterGrade::E => "E",
        };
        f.write_str(s)
    }
}

/// Grade a trust value.
///
/// Comparisons are strict, so a value sitting exactly on a boundary falls into the lower
/// bracket:
///
/// ```
/// use astrobadge_core::badge::{letter_grade, LetterGrade};
/// use astrobadge_core::TrustPercent;
///
/// assert_eq!(letter_grade(TrustPercent::new(0.85)), LetterGrade::A);
/// assert_eq!(letter_grade(TrustPercent::new(0.8)), LetterGrade::B);
/// assert_eq!(letter_grade(TrustPercent::new(0.4)), LetterGrade::D);
/// assert_eq!(letter_grade(TrustPercent::new(0.0)), LetterGrade::E);
/// ```
pub fn letter_grade(p: TrustPercent) -> LetterGrade {
    let p = p.value();
    if p > 0.8 {
        LetterGrade::A
    } else if p > 0.6 {
        LetterGrade::B
    } else if p > 0.4 {
        LetterGrade::C
    } else if p > 0.2 {
        LetterGrade::D
    } else {
        LetterGrade::E
    }
}

/// Badge for a known trust value.
pub fn badge_for_percent(p: TrustPercent, style: MessageStyle) -> BadgePayload {
    let v = p.value();
    match style {
        MessageStyle::Percentage => {
            let color = if v >= 0.75 {
                BadgeColor::Success
            } else if v >= 0.5 {
                BadgeColor::Yellow
            } else {
                BadgeColor::Red
            };
            BadgePayload::with(format!("{:.0}%", (v * 100.0).round()), color)
        }
        MessageStyle::LetterGrade => {
            let color = if v > 0.6 {
                BadgeColor::Success
            } else if v > 0.4 {
                BadgeColor::Yellow
            } else {
                BadgeColor::Red
            };
            BadgePayload::with(letter_grade(p).to_string(), color)
        }
    }
}

/// Derive the badge for a lookup result.
///
/// A missing report, or one without an `overall` factor, yields the unavailable badge.
pub fn derive_badge(report: Option<&SignedReport>, style: MessageStyle) -> BadgePayload {
    match report.and_then(SignedReport::overall) {
        Some(p) => badge_for_percent(p, style),
        None => BadgePayload::unavailable(),
    }
}

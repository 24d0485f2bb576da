//! The cardinality status table and status aggregation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::facet::Cardinality;

/// Verdict of a message, result, requirement or document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    /// Every checked condition held.
    Pass,
    /// A checked condition did not hold.
    Fail,
    /// Nothing could be decided.
    Inconclusive,
    /// Evaluation itself failed.
    Error,
}

impl ValidationStatus {
    const fn severity(self) -> u8 {
        match self {
            Self::Inconclusive => 0,
            Self::Pass => 1,
            Self::Fail => 2,
            Self::Error => 3,
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "pass"),
            Self::Fail => write!(f, "fail"),
            Self::Inconclusive => write!(f, "inconclusive"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Translates a raw match outcome into a verdict.
///
/// | Cardinality | `Some(true)` | `Some(false)` | `None` |
/// |---|---|---|---|
/// | Expected | Pass | Fail | Inconclusive |
/// | Prohibited | Fail | Pass | Inconclusive |
/// | Optional | Inconclusive | Inconclusive | Inconclusive |
#[must_use]
pub const fn status_for(cardinality: Cardinality, matched: Option<bool>) -> ValidationStatus {
    match (cardinality, matched) {
        (Cardinality::Optional, _) | (_, None) => ValidationStatus::Inconclusive,
        (Cardinality::Expected, Some(true)) | (Cardinality::Prohibited, Some(false)) => {
            ValidationStatus::Pass
        }
        (Cardinality::Expected, Some(false)) | (Cardinality::Prohibited, Some(true)) => {
            ValidationStatus::Fail
        }
    }
}

/// Error dominates Fail, Fail dominates Pass; nothing at all is Inconclusive.
pub fn aggregate(statuses: impl IntoIterator<Item = ValidationStatus>) -> ValidationStatus {
    statuses
        .into_iter()
        .max_by_key(|s| s.severity())
        .unwrap_or(ValidationStatus::Inconclusive)
}

//! Engine options.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Options consumed by binders and the run driver.
///
/// Loadable from JSON; missing keys take their defaults and unknown keys
/// are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationOptions {
    /// Widen type matches to include subtypes of the named type.
    pub include_subtypes: bool,
    /// Attach a copy of the full entity to each result.
    pub output_full_entity: bool,
    /// Evaluate derived (computed) attributes in attribute facets.
    pub allow_derived_attributes: bool,
    /// Skip, rather than fail, specifications that target another schema.
    pub skip_incompatible_specification: bool,
    /// Document-level audit issues tolerated before the run is aborted.
    pub audit_tolerance: usize,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            include_subtypes: true,
            output_full_entity: false,
            allow_derived_attributes: false,
            skip_incompatible_specification: false,
            audit_tolerance: 0,
        }
    }
}

impl ValidationOptions {
    /// Parses options from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        serde_json::from_str(json).map_err(|e| ConfigurationError::InvalidOptions {
            reason: e.to_string(),
        })
    }

    /// Reads options from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ConfigurationError::InvalidOptions {
            reason: format!("failed to read {}: {e}", path.display()),
        })?;
        Self::from_json(&json)
    }
}

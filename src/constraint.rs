//! Value constraints: exact value, pattern, enumeration, numeric range and
//! string length.
//!
//! Evaluation is tri-state: `Some(true)` matched, `Some(false)` did not
//! match, `None` when the comparison cannot be decided (an unknown logical,
//! or a pattern that fails to compile).

use std::collections::HashMap;
use std::fmt;
use std::sync::{OnceLock, RwLock};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigurationError;
use crate::value::Value;

/// Relative tolerance for real-number equality.
pub const REAL_TOLERANCE: f64 = 1e-6;

const REGEX_CACHE_MAX: usize = 1024;

static REGEX_CACHE: OnceLock<RwLock<HashMap<String, regex::Regex>>> = OnceLock::new();

fn compile(pattern: &str) -> Result<regex::Regex, ConfigurationError> {
    // Patterns must match the whole value.
    regex::Regex::new(&format!("^(?:{pattern})$")).map_err(|e| {
        ConfigurationError::InvalidConstraint {
            reason: format!("invalid pattern '{pattern}': {e}"),
        }
    })
}

fn cached_regex(pattern: &str) -> Result<regex::Regex, ConfigurationError> {
    let cache = REGEX_CACHE.get_or_init(|| RwLock::new(HashMap::new()));

    if let Ok(guard) = cache.read() {
        if let Some(re) = guard.get(pattern) {
            return Ok(re.clone());
        }
    }

    let compiled = compile(pattern)?;

    if let Ok(mut guard) = cache.write() {
        if guard.len() >= REGEX_CACHE_MAX {
            // Keep the cache bounded to avoid unbounded memory usage.
            guard.clear();
        }
        // Another thread may have inserted it while we compiled.
        guard
            .entry(pattern.to_string())
            .or_insert_with(|| compiled.clone());
    }
    Ok(compiled)
}

fn default_inclusive() -> bool {
    true
}

/// A predicate over a single primitive value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueConstraint {
    /// Equality against a single value.
    Exact {
        /// Value compared against.
        value: Value,
    },
    /// Full-match regular expression over the value's text.
    Pattern {
        /// Pattern source.
        pattern: String,
    },
    /// Membership in a fixed set of values.
    Enumeration {
        /// Accepted values.
        values: Vec<Value>,
    },
    /// Numeric bounds.
    Range {
        /// Lower bound, if any.
        min: Option<f64>,
        /// Upper bound, if any.
        max: Option<f64>,
        /// Whether `min` itself is accepted.
        #[serde(default = "default_inclusive")]
        min_inclusive: bool,
        /// Whether `max` itself is accepted.
        #[serde(default = "default_inclusive")]
        max_inclusive: bool,
    },
    /// Bounds on the character length of a string value.
    Length {
        /// Minimum length.
        min: Option<usize>,
        /// Maximum length.
        max: Option<usize>,
    },
}

impl ValueConstraint {
    /// Exact-match constraint.
    #[must_use]
    pub fn exact(value: impl Into<Value>) -> Self {
        Self::Exact {
            value: value.into(),
        }
    }

    /// Creates a pattern constraint, rejecting patterns that do not compile.
    pub fn pattern(pattern: impl Into<String>) -> Result<Self, ConfigurationError> {
        let pattern = pattern.into();
        cached_regex(&pattern)?;
        Ok(Self::Pattern { pattern })
    }

    /// Enumeration constraint.
    #[must_use]
    pub fn one_of<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Self::Enumeration {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Inclusive numeric range.
    #[must_use]
    pub const fn range(min: Option<f64>, max: Option<f64>) -> Self {
        Self::Range {
            min,
            max,
            min_inclusive: true,
            max_inclusive: true,
        }
    }

    /// Checks the constraint is well-formed.
    ///
    /// Constraints built through the constructors are always valid; this is
    /// for constraints obtained through deserialization.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        match self {
            Self::Exact { .. } => Ok(()),
            Self::Pattern { pattern } => cached_regex(pattern).map(|_| ()),
            Self::Enumeration { values } => {
                if values.is_empty() {
                    return Err(ConfigurationError::InvalidConstraint {
                        reason: "enumeration must list at least one value".to_string(),
                    });
                }
                Ok(())
            }
            Self::Range { min, max, .. } => {
                if min.is_none() && max.is_none() {
                    return Err(ConfigurationError::InvalidConstraint {
                        reason: "range must have at least one bound".to_string(),
                    });
                }
                if let (Some(lo), Some(hi)) = (min, max) {
                    if lo > hi {
                        return Err(ConfigurationError::InvalidConstraint {
                            reason: format!("range min {lo} is above max {hi}"),
                        });
                    }
                }
                Ok(())
            }
            Self::Length { min, max } => {
                if let (Some(lo), Some(hi)) = (min, max) {
                    if lo > hi {
                        return Err(ConfigurationError::InvalidConstraint {
                            reason: format!("length min {lo} is above max {hi}"),
                        });
                    }
                }
                Ok(())
            }
        }
    }

    /// Evaluates the constraint against a mapped primitive.
    #[must_use]
    pub fn evaluate(&self, actual: &Value) -> Option<bool> {
        match actual {
            Value::Unknown => return None,
            Value::Null => return Some(false),
            _ => {}
        }
        match self {
            Self::Exact { value } => Some(values_equal(value, actual)),
            Self::Pattern { pattern } => match cached_regex(pattern) {
                Ok(re) => Some(re.is_match(&text_of(actual))),
                Err(e) => {
                    warn!(error = %e, "pattern constraint could not be evaluated");
                    None
                }
            },
            Self::Enumeration { values } => Some(values.iter().any(|v| values_equal(v, actual))),
            Self::Range {
                min,
                max,
                min_inclusive,
                max_inclusive,
            } => {
                let Some(v) = actual.as_float() else {
                    return Some(false);
                };
                let above_min = min.map_or(true, |lo| if *min_inclusive { v >= lo } else { v > lo });
                let below_max = max.map_or(true, |hi| if *max_inclusive { v <= hi } else { v < hi });
                Some(above_min && below_max)
            }
            Self::Length { min, max } => {
                let len = text_of(actual).chars().count();
                Some(min.map_or(true, |lo| len >= lo) && max.map_or(true, |hi| len <= hi))
            }
        }
    }

    /// True if `name` satisfies this constraint.
    #[must_use]
    pub fn matches_name(&self, name: &str) -> bool {
        self.evaluate(&Value::String(name.to_string())) == Some(true)
    }

    /// The literal name this constraint pins, if it is an exact string.
    #[must_use]
    pub fn as_exact_str(&self) -> Option<&str> {
        match self {
            Self::Exact { value } => value.as_string(),
            _ => None,
        }
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Entity(l) => l.to_string(),
        Value::Unknown | Value::Null => String::new(),
    }
}

fn reals_equal(a: f64, b: f64) -> bool {
    (a - b).abs() <= REAL_TOLERANCE * a.abs().max(b.abs()).max(1.0)
}

fn values_equal(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::String(e), Value::String(a)) => e == a,
        (Value::String(e), Value::Bool(a)) | (Value::Bool(a), Value::String(e)) => {
            e.trim().eq_ignore_ascii_case(if *a { "true" } else { "false" })
        }
        (Value::String(text), number) | (number, Value::String(text))
            if number.as_float().is_some() =>
        {
            text.trim()
                .parse::<f64>()
                .ok()
                .zip(number.as_float())
                .is_some_and(|(t, n)| reals_equal(t, n))
        }
        (Value::Int(e), Value::Int(a)) => e == a,
        (e, a) if e.as_float().is_some() && a.as_float().is_some() => e
            .as_float()
            .zip(a.as_float())
            .is_some_and(|(e, a)| reals_equal(e, a)),
        (e, a) => e == a,
    }
}

impl fmt::Display for ValueConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact { value } => match value {
                Value::String(s) => write!(f, "{s}"),
                other => write!(f, "{other}"),
            },
            Self::Pattern { pattern } => write!(f, "/{pattern}/"),
            Self::Enumeration { values } => {
                let parts: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "one of [{}]", parts.join(", "))
            }
            Self::Range {
                min,
                max,
                min_inclusive,
                max_inclusive,
            } => {
                let lo = min.map_or_else(|| "-∞".to_string(), |v| v.to_string());
                let hi = max.map_or_else(|| "∞".to_string(), |v| v.to_string());
                let open = if *min_inclusive { '[' } else { '(' };
                let close = if *max_inclusive { ']' } else { ')' };
                write!(f, "{open}{lo}, {hi}{close}")
            }
            Self::Length { min, max } => {
                let lo = min.map_or_else(|| "0".to_string(), |v| v.to_string());
                let hi = max.map_or_else(|| "∞".to_string(), |v| v.to_string());
                write!(f, "length [{lo}, {hi}]")
            }
        }
    }
}

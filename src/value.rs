//! Value types read from the entity graph.
//!
//! Entity attributes and properties hold [`ModelValue`]s: either a plain
//! primitive [`Value`] or a domain value object (a wrapped scalar such as a
//! length measure or a label). Domain values are normalized to primitives by
//! the [`ValueMapper`](crate::mapper::ValueMapper) before any comparison.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::model::EntityLabel;

/// Plain comparable primitive.
///
/// # Examples
///
/// ```
/// use ids_engine::Value;
///
/// assert!(Value::from("60min").is_populated());
/// assert!(!Value::from("   ").is_populated());
/// assert!(!Value::Null.is_populated());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Real number.
    Float(f64),
    /// Text.
    String(String),
    /// Reference to another entity.
    Entity(EntityLabel),
    /// Third state of a logical value: present, but neither true nor false.
    Unknown,
    /// Absent value.
    Null,
}

impl Value {
    /// Whether this is a boolean.
    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool(_))
    }

    /// Whether this is a string.
    pub const fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    /// Whether this is null.
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether this is the unknown logical.
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Boolean content.
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer content.
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric content as a float.
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// String content.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Value-relevance rule: not null and, for strings, not blank.
    #[must_use]
    pub fn is_populated(&self) -> bool {
        match self {
            Self::Null => false,
            Self::String(s) => !s.trim().is_empty(),
            _ => true,
        }
    }

    /// Returns a human-readable type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Entity(_) => "entity",
            Self::Unknown => "unknown",
            Self::Null => "null",
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Null
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::Entity(v) => write!(f, "#{v}"),
            Self::Unknown => write!(f, "unknown"),
            Self::Null => write!(f, "null"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<EntityLabel> for Value {
    fn from(v: EntityLabel) -> Self {
        Self::Entity(v)
    }
}

/// Capabilities a domain value type may expose.
///
/// A single mapper registration per capability covers every type that
/// declares it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Exposes a primitive through [`DomainValue::scalar`].
    Scalar,
    /// Exposes a textual rendering through [`DomainValue::text`].
    Textual,
}

/// A domain-specific value object stored on an entity.
pub trait DomainValue: Any + fmt::Debug + Send + Sync {
    /// Schema type name, e.g. `IfcLengthMeasure`.
    fn type_name(&self) -> &str;

    /// Capabilities in declaration order; earlier entries take precedence.
    fn capabilities(&self) -> &'static [Capability] {
        &[]
    }

    /// Primitive the value maps to by default.
    fn scalar(&self) -> Option<Value> {
        None
    }

    /// Text the value maps to by default.
    fn text(&self) -> Option<String> {
        None
    }

    /// For downcasting in mapper registrations.
    fn as_any(&self) -> &dyn Any;
}

/// Wrapped string types (labels, identifiers, free text).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedText {
    /// Schema type name.
    pub type_name: String,
    /// Wrapped text.
    pub value: String,
}

impl WrappedText {
    /// Text of type `type_name`.
    #[must_use]
    pub fn new(type_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            value: value.into(),
        }
    }

    /// A label.
    #[must_use]
    pub fn label(value: impl Into<String>) -> Self {
        Self::new("IfcLabel", value)
    }

    /// An identifier.
    #[must_use]
    pub fn identifier(value: impl Into<String>) -> Self {
        Self::new("IfcIdentifier", value)
    }
}

impl DomainValue for WrappedText {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::Scalar, Capability::Textual]
    }

    fn scalar(&self) -> Option<Value> {
        Some(Value::String(self.value.clone()))
    }

    fn text(&self) -> Option<String> {
        Some(self.value.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Numeric measure with an optional unit symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Measure {
    /// Schema type name.
    pub type_name: String,
    /// Magnitude.
    pub value: f64,
    /// Unit symbol.
    pub unit: Option<String>,
}

impl Measure {
    /// Unitless measure of type `type_name`.
    #[must_use]
    pub fn new(type_name: impl Into<String>, value: f64) -> Self {
        Self {
            type_name: type_name.into(),
            value,
            unit: None,
        }
    }

    /// Sets the unit.
    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

impl DomainValue for Measure {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::Scalar, Capability::Textual]
    }

    fn scalar(&self) -> Option<Value> {
        Some(Value::Float(self.value))
    }

    fn text(&self) -> Option<String> {
        Some(match &self.unit {
            Some(unit) => format!("{} {unit}", self.value),
            None => format!("{}", self.value),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Wrapped integer types (counts, integer measures).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrappedInteger {
    /// Schema type name.
    pub type_name: &'static str,
    /// Wrapped integer.
    pub value: i64,
}

impl DomainValue for WrappedInteger {
    fn type_name(&self) -> &str {
        self.type_name
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::Scalar]
    }

    fn scalar(&self) -> Option<Value> {
        Some(Value::Int(self.value))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Tri-state logical. `None` is the schema's UNKNOWN.
///
/// Declares no capability; it is mapped by an exact-type registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Logical(pub Option<bool>);

impl DomainValue for Logical {
    fn type_name(&self) -> &str {
        "IfcLogical"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A value as stored on an entity.
#[derive(Debug, Clone)]
pub enum ModelValue {
    /// A primitive.
    Primitive(Value),
    /// A domain value, mapped on access.
    Domain(Arc<dyn DomainValue>),
}

impl ModelValue {
    /// Wraps a domain value object.
    pub fn domain(value: impl DomainValue) -> Self {
        Self::Domain(Arc::new(value))
    }

    /// Schema type name of the stored value.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::Primitive(v) => v.type_name(),
            Self::Domain(d) => d.type_name(),
        }
    }

    /// Best-effort text for diagnostics, without consulting the mapper.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Primitive(v) => v.to_string(),
            Self::Domain(d) => d.text().unwrap_or_else(|| format!("{d:?}")),
        }
    }
}

impl PartialEq for ModelValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Primitive(a), Self::Primitive(b)) => a == b,
            (Self::Domain(a), Self::Domain(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Serialize for ModelValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Primitive(v) => v.serialize(serializer),
            Self::Domain(d) => {
                let mut s = serializer.serialize_struct("DomainValue", 2)?;
                s.serialize_field("type", d.type_name())?;
                s.serialize_field("value", &self.describe())?;
                s.end()
            }
        }
    }
}

impl From<Value> for ModelValue {
    fn from(v: Value) -> Self {
        Self::Primitive(v)
    }
}

impl From<&str> for ModelValue {
    fn from(v: &str) -> Self {
        Self::Primitive(v.into())
    }
}

impl From<String> for ModelValue {
    fn from(v: String) -> Self {
        Self::Primitive(v.into())
    }
}

impl From<bool> for ModelValue {
    fn from(v: bool) -> Self {
        Self::Primitive(v.into())
    }
}

impl From<i64> for ModelValue {
    fn from(v: i64) -> Self {
        Self::Primitive(v.into())
    }
}

impl From<f64> for ModelValue {
    fn from(v: f64) -> Self {
        Self::Primitive(v.into())
    }
}

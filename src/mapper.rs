//! Value Mapper: projects domain value objects onto comparable primitives.
//!
//! Lookup order for a domain value:
//! 1. a registration for its exact runtime type;
//! 2. a registration for each [`Capability`] the type declares, walked in
//!    the order [`DomainValue::capabilities`] returns them; the first
//!    declared capability that has a registration wins, regardless of the
//!    order the capabilities were registered in.
//!
//! Registrations come from [`ValueMapProvider`]s at construction time. The
//! registry is additive: a second registration for the same key is ignored,
//! so the first registration per key is the one kept.
//! A built [`ValueMapper`] is immutable and shared across runs via `Arc`.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::value::{Capability, DomainValue, Logical, ModelValue, Value};

type ExactProjector = Arc<dyn Fn(&dyn Any) -> Option<Value> + Send + Sync>;
type CapabilityProjector = Arc<dyn Fn(&dyn DomainValue) -> Option<Value> + Send + Sync>;

/// Supplies mapper registrations at startup.
pub trait ValueMapProvider: Send + Sync {
    /// Adds this provider's mappings to `builder`.
    fn register(&self, builder: &mut ValueMapperBuilder);
}

/// Accumulates registrations before the mapper is frozen.
#[derive(Default)]
pub struct ValueMapperBuilder {
    exact: HashMap<TypeId, (&'static str, ExactProjector)>,
    by_capability: HashMap<Capability, CapabilityProjector>,
}

impl ValueMapperBuilder {
    /// Registers a projection for the exact type `T`.
    pub fn register<T, F>(&mut self, projector: F) -> &mut Self
    where
        T: DomainValue,
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        let type_name = std::any::type_name::<T>();
        if self.exact.contains_key(&TypeId::of::<T>()) {
            debug!(type_name, "ignoring duplicate exact-type mapping");
            return self;
        }
        let projector: ExactProjector =
            Arc::new(move |any: &dyn Any| any.downcast_ref::<T>().map(&projector));
        self.exact.insert(TypeId::of::<T>(), (type_name, projector));
        self
    }

    /// Registers a projection covering every type that declares `capability`.
    pub fn register_capability<F>(&mut self, capability: Capability, projector: F) -> &mut Self
    where
        F: Fn(&dyn DomainValue) -> Option<Value> + Send + Sync + 'static,
    {
        if self.by_capability.contains_key(&capability) {
            debug!(?capability, "ignoring duplicate capability mapping");
            return self;
        }
        self.by_capability.insert(capability, Arc::new(projector));
        self
    }

    /// Applies a provider's registrations.
    #[must_use]
    pub fn with_provider(mut self, provider: &dyn ValueMapProvider) -> Self {
        provider.register(&mut self);
        self
    }

    /// Freezes the registrations.
    #[must_use]
    pub fn build(self) -> ValueMapper {
        ValueMapper {
            exact: self.exact,
            by_capability: self.by_capability,
        }
    }
}

/// Immutable, thread-safe value projection registry.
pub struct ValueMapper {
    exact: HashMap<TypeId, (&'static str, ExactProjector)>,
    by_capability: HashMap<Capability, CapabilityProjector>,
}

impl ValueMapper {
    /// Empty builder.
    #[must_use]
    pub fn builder() -> ValueMapperBuilder {
        ValueMapperBuilder::default()
    }

    /// Mapper with the [`StandardValues`] registrations.
    #[must_use]
    pub fn standard() -> Self {
        Self::builder().with_provider(&StandardValues).build()
    }

    /// Maps `value` to a primitive.
    ///
    /// Returns `found = false` when no registration applies. Primitives are
    /// returned as-is; unmapped domain values fall back to their text.
    #[must_use]
    pub fn map(&self, value: &ModelValue) -> (Value, bool) {
        match value {
            ModelValue::Primitive(v) => (v.clone(), false),
            ModelValue::Domain(d) => match self.project(d.as_ref()) {
                Some(v) => (v, true),
                None => (Value::String(value.describe()), false),
            },
        }
    }

    fn project(&self, value: &dyn DomainValue) -> Option<Value> {
        let any = value.as_any();
        if let Some((_, projector)) = self.exact.get(&any.type_id()) {
            return projector(any);
        }
        value
            .capabilities()
            .iter()
            .find_map(|cap| self.by_capability.get(cap))
            .and_then(|projector| projector(value))
    }
}

impl fmt::Debug for ValueMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut exact: Vec<&str> = self.exact.values().map(|(name, _)| *name).collect();
        exact.sort_unstable();
        f.debug_struct("ValueMapper")
            .field("exact", &exact)
            .field("capabilities", &self.by_capability.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Built-in registrations for the value types in [`crate::value`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardValues;

impl ValueMapProvider for StandardValues {
    fn register(&self, builder: &mut ValueMapperBuilder) {
        builder
            .register::<Logical, _>(|l| match l.0 {
                Some(b) => Value::Bool(b),
                None => Value::Unknown,
            })
            .register_capability(Capability::Scalar, |v| v.scalar())
            .register_capability(Capability::Textual, |v| v.text().map(Value::String));
    }
}

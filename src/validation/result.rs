//! One entity evaluated against one specification.

use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::model::{Entity, EntityLabel};
use crate::specification::Specification;

use super::message::ValidationMessage;
use super::status::{aggregate, ValidationStatus};

pub(crate) fn specification_id<S: Serializer>(
    spec: &Arc<Specification>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&spec.id)
}

/// Messages for one applicable entity under one specification.
///
/// The status is always derived from the messages and cannot be set.
#[derive(Debug, Clone, Serialize)]
pub struct IdsValidationResult {
    label: EntityLabel,
    #[serde(skip_serializing_if = "Option::is_none")]
    entity: Option<Entity>,
    #[serde(serialize_with = "specification_id")]
    specification: Arc<Specification>,
    messages: Vec<ValidationMessage>,
}

impl IdsValidationResult {
    /// Starts an empty result. The entity is copied only when
    /// `output_full_entity` is set.
    #[must_use]
    pub fn new(entity: &Entity, specification: Arc<Specification>, output_full_entity: bool) -> Self {
        Self {
            label: entity.label,
            entity: output_full_entity.then(|| entity.clone()),
            specification,
            messages: Vec::new(),
        }
    }

    /// Appends a message.
    pub fn push(&mut self, message: ValidationMessage) {
        self.messages.push(message);
    }

    /// Label of the entity.
    #[must_use]
    pub const fn label(&self) -> EntityLabel {
        self.label
    }

    /// Copy of the entity, kept when full output was requested.
    #[must_use]
    pub const fn entity(&self) -> Option<&Entity> {
        self.entity.as_ref()
    }

    /// Specification the entity was checked against.
    #[must_use]
    pub fn specification(&self) -> &Arc<Specification> {
        &self.specification
    }

    /// Messages in evaluation order.
    #[must_use]
    pub fn messages(&self) -> &[ValidationMessage] {
        &self.messages
    }

    /// Aggregate of the messages.
    #[must_use]
    pub fn status(&self) -> ValidationStatus {
        aggregate(self.messages.iter().map(ValidationMessage::status))
    }
}

//! Validation model: verdicts, messages, per-entity results and their
//! aggregation into requirement and document outcomes.
//!
//! Cardinality is applied exactly once, in [`status_for`], when a raw match
//! outcome becomes a message status. Everything downstream only aggregates.

mod context;
mod field;
mod message;
mod outcome;
mod result;
mod status;

pub use context::ValidationContext;
pub use field::{FacetField, FieldTable};
pub use message::{SubjectRef, ValidationMessage};
pub use outcome::{OutcomeSummary, ValidationOutcome, ValidationRequirement};
pub use result::IdsValidationResult;
pub use status::{aggregate, status_for, ValidationStatus};

//! Requirement- and document-level aggregation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::specification::{RuleDocument, Specification};

use super::message::ValidationMessage;
use super::result::{specification_id, IdsValidationResult};
use super::status::{aggregate, ValidationStatus};

/// Result counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeSummary {
    /// Passed count.
    pub passed: usize,
    /// Failed count.
    pub failed: usize,
    /// Inconclusive count.
    pub inconclusive: usize,
    /// Error count.
    pub errors: usize,
}

impl OutcomeSummary {
    fn record(&mut self, status: ValidationStatus) {
        match status {
            ValidationStatus::Pass => self.passed += 1,
            ValidationStatus::Fail => self.failed += 1,
            ValidationStatus::Inconclusive => self.inconclusive += 1,
            ValidationStatus::Error => self.errors += 1,
        }
    }

    fn merge(&mut self, other: Self) {
        self.passed += other.passed;
        self.failed += other.failed;
        self.inconclusive += other.inconclusive;
        self.errors += other.errors;
    }

    /// Sum of all counts.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.passed + self.failed + self.inconclusive + self.errors
    }
}

/// One specification's aggregated result.
///
/// `messages` holds specification-level verdicts (applicable-entity
/// cardinality, setup errors) that belong to no single entity.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationRequirement {
    #[serde(serialize_with = "specification_id")]
    specification: Arc<Specification>,
    results: Vec<IdsValidationResult>,
    messages: Vec<ValidationMessage>,
}

impl ValidationRequirement {
    /// Empty requirement for `specification`.
    #[must_use]
    pub fn new(specification: Arc<Specification>) -> Self {
        Self {
            specification,
            results: Vec::new(),
            messages: Vec::new(),
        }
    }

    /// Records an entity result.
    pub fn push_result(&mut self, result: IdsValidationResult) {
        self.results.push(result);
    }

    /// Records a specification-level message.
    pub fn push_message(&mut self, message: ValidationMessage) {
        self.messages.push(message);
    }

    /// Specification evaluated.
    #[must_use]
    pub fn specification(&self) -> &Arc<Specification> {
        &self.specification
    }

    /// Specification-level messages.
    #[must_use]
    pub fn messages(&self) -> &[ValidationMessage] {
        &self.messages
    }

    /// Results for every applicable entity, in evaluation order.
    #[must_use]
    pub fn applicable_results(&self) -> &[IdsValidationResult] {
        &self.results
    }

    /// Results that failed.
    pub fn failed_results(&self) -> impl Iterator<Item = &IdsValidationResult> {
        self.results
            .iter()
            .filter(|r| r.status() == ValidationStatus::Fail)
    }

    /// Results that passed.
    pub fn passed_results(&self) -> impl Iterator<Item = &IdsValidationResult> {
        self.results
            .iter()
            .filter(|r| r.status() == ValidationStatus::Pass)
    }

    /// Aggregate of every message and result.
    #[must_use]
    pub fn status(&self) -> ValidationStatus {
        aggregate(
            self.messages
                .iter()
                .map(ValidationMessage::status)
                .chain(self.results.iter().map(IdsValidationResult::status)),
        )
    }

    /// Counts of results by status.
    #[must_use]
    pub fn summary(&self) -> OutcomeSummary {
        let mut summary = OutcomeSummary::default();
        for result in &self.results {
            summary.record(result.status());
        }
        summary
    }
}

fn document_title<S: Serializer>(doc: &Arc<RuleDocument>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&doc.title)
}

/// The whole document's result; the engine's sole output artifact.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationOutcome {
    #[serde(serialize_with = "document_title")]
    document: Arc<RuleDocument>,
    requirements: Vec<ValidationRequirement>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<String>,
    status: ValidationStatus,
}

impl ValidationOutcome {
    /// Outcome of a run over `document`, started now.
    #[must_use]
    pub fn new(document: Arc<RuleDocument>) -> Self {
        Self {
            document,
            requirements: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
            failure: None,
            status: ValidationStatus::Inconclusive,
        }
    }

    /// Adds a specification's requirement.
    pub fn push(&mut self, requirement: ValidationRequirement) {
        self.requirements.push(requirement);
        self.refresh();
    }

    /// Stamps the finish time.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
        self.refresh();
    }

    /// Forces the document status to `Error`, bypassing aggregation.
    ///
    /// Reserved for failures before any requirement is evaluated.
    pub fn mark_completely_failed(&mut self, reason: impl Into<String>) {
        self.failure = Some(reason.into());
        self.refresh();
    }

    fn refresh(&mut self) {
        self.status = if self.failure.is_some() {
            ValidationStatus::Error
        } else {
            aggregate(self.requirements.iter().map(ValidationRequirement::status))
        };
    }

    /// Document validated.
    #[must_use]
    pub fn document(&self) -> &Arc<RuleDocument> {
        &self.document
    }

    /// Requirements in document order.
    #[must_use]
    pub fn requirements(&self) -> &[ValidationRequirement] {
        &self.requirements
    }

    /// Requirement for the specification with `id`, if it was evaluated.
    #[must_use]
    pub fn requirement(&self, id: &str) -> Option<&ValidationRequirement> {
        self.requirements.iter().find(|r| r.specification.id == id)
    }

    /// When the run started.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// When the run finished, once it has.
    #[must_use]
    pub const fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Reason the run was aborted, if it was.
    #[must_use]
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Aggregate status.
    #[must_use]
    pub const fn status(&self) -> ValidationStatus {
        self.status
    }

    /// Counts of requirements by status.
    #[must_use]
    pub fn summary(&self) -> OutcomeSummary {
        let mut summary = OutcomeSummary::default();
        for requirement in &self.requirements {
            summary.merge(requirement.summary());
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facet::Cardinality;
    use crate::model::Entity;

    fn spec(id: &str) -> Arc<Specification> {
        Arc::new(Specification::new(id, "spec"))
    }

    fn verdict(status: ValidationStatus) -> ValidationMessage {
        ValidationMessage::for_specification(status, Cardinality::Expected, "", None, "x")
    }

    fn result(spec: &Arc<Specification>, label: u64, status: ValidationStatus) -> IdsValidationResult {
        let mut r = IdsValidationResult::new(&Entity::new(label, "IfcWall"), Arc::clone(spec), false);
        r.push(verdict(status));
        r
    }

    #[test]
    fn requirement_filters_by_result_status() {
        let s = spec("S1");
        let mut req = ValidationRequirement::new(Arc::clone(&s));
        req.push_result(result(&s, 1, ValidationStatus::Pass));
        req.push_result(result(&s, 2, ValidationStatus::Fail));
        req.push_result(result(&s, 3, ValidationStatus::Inconclusive));

        assert_eq!(req.applicable_results().len(), 3);
        assert_eq!(req.failed_results().count(), 1);
        assert_eq!(req.passed_results().count(), 1);
        assert_eq!(req.status(), ValidationStatus::Fail);
        assert_eq!(
            req.summary(),
            OutcomeSummary {
                passed: 1,
                failed: 1,
                inconclusive: 1,
                errors: 0
            }
        );
    }

    #[test]
    fn requirement_messages_take_part_in_status() {
        let mut req = ValidationRequirement::new(spec("S1"));
        assert_eq!(req.status(), ValidationStatus::Inconclusive);
        req.push_message(verdict(ValidationStatus::Error));
        assert_eq!(req.status(), ValidationStatus::Error);
    }

    #[test]
    fn outcome_aggregates_requirements() {
        let doc = Arc::new(RuleDocument::new("doc"));
        let mut outcome = ValidationOutcome::new(doc);
        assert_eq!(outcome.status(), ValidationStatus::Inconclusive);

        let s = spec("S1");
        let mut pass = ValidationRequirement::new(Arc::clone(&s));
        pass.push_result(result(&s, 1, ValidationStatus::Pass));
        outcome.push(pass);
        assert_eq!(outcome.status(), ValidationStatus::Pass);

        let s2 = spec("S2");
        let mut fail = ValidationRequirement::new(Arc::clone(&s2));
        fail.push_result(result(&s2, 2, ValidationStatus::Fail));
        outcome.push(fail);
        outcome.finish();

        assert_eq!(outcome.status(), ValidationStatus::Fail);
        assert!(outcome.requirement("S2").is_some());
        assert_eq!(outcome.summary().total(), 2);
        assert!(outcome.finished_at().is_some_and(|t| t >= outcome.started_at()));
    }

    #[test]
    fn mark_completely_failed_overrides_aggregation() {
        let doc = Arc::new(RuleDocument::new("doc"));
        let mut outcome = ValidationOutcome::new(doc);
        outcome.mark_completely_failed("document failed audit");
        assert_eq!(outcome.status(), ValidationStatus::Error);
        assert_eq!(outcome.failure(), Some("document failed audit"));

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["document"], "doc");
        assert_eq!(json["status"], "error");
    }
}

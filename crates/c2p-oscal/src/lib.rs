//! OSCAL value model and rule-set plumbing for compliance-to-policy workflows.
//!
//! This crate carries the model surface the framework consumes: component
//! definitions with rule-set props, an indexed in-memory rules store,
//! compliance settings that shape effective rule sets, and the assessment
//! plan/results artifacts produced for auditors.

pub mod assessment;
pub mod component;
pub mod rules;
pub mod settings;
pub mod transform;

pub use assessment::{
    Activity, AssessedControls, AssessmentAssets, AssessmentPlan, AssessmentResult,
    AssessmentResults, BackMatter, Finding, FindingTarget, ImportAp, InventoryItem,
    LocalDefinitions, Observation, ObjectiveStatus, RelatedObservation, RelevantEvidence,
    Resource, ResultLocalDefinitions, ReviewedControls, SelectControlById, SubjectReference,
};
pub use component::{
    Component, ComponentDefinition, DefinedComponent, Link, Metadata, Property,
    VALIDATION_COMPONENT_TYPE,
};
pub use rules::{Check, MemoryStore, Parameter, Rule, RuleSet, StoreError};
pub use settings::{apply_to_component, Settings};
pub use transform::assessment_plan_to_results;

/// Property namespace used to tag properties emitted by this project.
pub const PROPERTY_NAMESPACE: &str =
    "https://oscal-compass.github.io/compliance-trestle/schemas/oscal";

/// Returns `None` when the collection is empty, `Some` otherwise.
///
/// OSCAL optional collections are omitted entirely rather than serialized
/// as empty arrays.
pub fn none_if_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

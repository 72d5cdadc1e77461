//! Assessment plan and assessment results artifacts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::component::{DefinedComponent, Metadata, Property};

/// A control picked into an assessment scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectControlById {
    #[serde(rename = "control-id")]
    pub control_id: String,
}

/// The set of controls assessed together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessedControls {
    #[serde(rename = "include-controls", skip_serializing_if = "Option::is_none")]
    pub include_controls: Option<Vec<SelectControlById>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewedControls {
    #[serde(rename = "control-selections")]
    pub control_selections: Vec<AssessedControls>,
}

/// An assessment activity; the title names the rule the activity verifies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub uuid: String,
    pub title: String,
    #[serde(rename = "related-controls", skip_serializing_if = "Option::is_none")]
    pub related_controls: Option<ReviewedControls>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalDefinitions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activities: Option<Vec<Activity>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentAssets {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<DefinedComponent>>,
}

/// An assessment plan, as far as report synthesis consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentPlan {
    pub uuid: String,
    pub metadata: Metadata,
    #[serde(rename = "local-definitions", skip_serializing_if = "Option::is_none")]
    pub local_definitions: Option<LocalDefinitions>,
    #[serde(rename = "assessment-assets", skip_serializing_if = "Option::is_none")]
    pub assessment_assets: Option<AssessmentAssets>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportAp {
    pub href: String,
}

/// A subject reference attached to an observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectReference {
    #[serde(rename = "subject-uuid")]
    pub subject_uuid: String,
    pub title: String,
    #[serde(rename = "type")]
    pub subject_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub props: Option<Vec<Property>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevantEvidence {
    pub href: String,
    pub description: String,
}

/// A recorded result of a check against one or more subjects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub uuid: String,
    pub title: String,
    pub description: String,
    pub methods: Vec<String>,
    pub collected: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subjects: Option<Vec<SubjectReference>>,
    #[serde(rename = "relevant-evidence", skip_serializing_if = "Option::is_none")]
    pub relevant_evidence: Option<Vec<RelevantEvidence>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub props: Option<Vec<Property>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveStatus {
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingTarget {
    #[serde(rename = "target-id")]
    pub target_id: String,
    #[serde(rename = "type")]
    pub target_type: String,
    pub status: ObjectiveStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedObservation {
    #[serde(rename = "observation-uuid")]
    pub observation_uuid: String,
}

/// An aggregated judgment against a control statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub uuid: String,
    pub target: FindingTarget,
    #[serde(rename = "related-observations", skip_serializing_if = "Option::is_none")]
    pub related_observations: Option<Vec<RelatedObservation>>,
}

/// An inventory item synthesized from an observed subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub uuid: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub props: Option<Vec<Property>>,
}

/// A back-matter resource synthesized from an observed subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub uuid: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackMatter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<Resource>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultLocalDefinitions {
    #[serde(rename = "inventory-items", skip_serializing_if = "Option::is_none")]
    pub inventory_items: Option<Vec<InventoryItem>>,
}

/// One result block inside an assessment results artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub uuid: String,
    pub title: String,
    pub description: String,
    pub start: DateTime<Utc>,
    #[serde(rename = "reviewed-controls")]
    pub reviewed_controls: ReviewedControls,
    #[serde(rename = "local-definitions", skip_serializing_if = "Option::is_none")]
    pub local_definitions: Option<ResultLocalDefinitions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observations: Option<Vec<Observation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub findings: Option<Vec<Finding>>,
}

/// The assessment results artifact auditors consume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentResults {
    pub uuid: String,
    pub metadata: Metadata,
    #[serde(rename = "import-ap")]
    pub import_ap: ImportAp,
    pub results: Vec<AssessmentResult>,
    #[serde(rename = "back-matter", skip_serializing_if = "Option::is_none")]
    pub back_matter: Option<BackMatter>,
}

//! Component-definition records and the adapter trait the framework indexes.

use serde::{Deserialize, Serialize};

/// Component type that marks a component as backed by a policy-engine plugin.
pub const VALIDATION_COMPONENT_TYPE: &str = "validation";

/// A namespaced OSCAL property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ns: Option<String>,
    /// Group tag; rule-set props that belong together share one remark.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ns: None,
            remarks: None,
        }
    }

    pub fn with_ns(mut self, ns: impl Into<String>) -> Self {
        self.ns = Some(ns.into());
        self
    }

    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
        self
    }
}

/// An OSCAL link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Document metadata carried on plans and results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: String,
    #[serde(rename = "last-modified")]
    pub last_modified: chrono::DateTime<chrono::Utc>,
    pub version: String,
    #[serde(rename = "oscal-version")]
    pub oscal_version: String,
}

impl Metadata {
    /// Metadata for a generated artifact.
    pub fn generated(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            last_modified: chrono::Utc::now(),
            version: "0.1.0".into(),
            oscal_version: "1.1.3".into(),
        }
    }
}

/// A component inside a component definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinedComponent {
    pub uuid: String,
    pub title: String,
    #[serde(rename = "type")]
    pub component_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub props: Vec<Property>,
}

/// A loaded OSCAL component definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDefinition {
    pub uuid: String,
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<DefinedComponent>,
}

/// Read access to a component record, however the caller loaded it.
///
/// The rules store and input context only need titles, types, and props, so
/// callers with their own model types can adapt them instead of converting.
pub trait Component {
    fn title(&self) -> &str;
    fn component_type(&self) -> &str;
    fn props(&self) -> &[Property];
}

impl Component for DefinedComponent {
    fn title(&self) -> &str {
        &self.title
    }

    fn component_type(&self) -> &str {
        &self.component_type
    }

    fn props(&self) -> &[Property] {
        &self.props
    }
}

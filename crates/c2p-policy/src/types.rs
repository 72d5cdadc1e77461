//! Raw result values returned by policy engines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The effective rule sets shipped to one provider.
pub type Policy = Vec<c2p_oscal::RuleSet>;

/// Outcome of evaluating a check against a subject.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckResult {
    #[default]
    Invalid,
    Fail,
    Error,
    Pass,
    Warning,
}

impl CheckResult {
    /// The value recorded on OSCAL `result` properties.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckResult::Invalid => "INVALID",
            CheckResult::Fail => "fail",
            CheckResult::Error => "error",
            CheckResult::Pass => "pass",
            CheckResult::Warning => "warning",
        }
    }
}

impl std::fmt::Display for CheckResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub description: String,
    pub href: String,
}

/// The concrete target a check was evaluated against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub title: String,
    #[serde(rename = "type")]
    pub subject_type: String,
    pub resource_id: String,
    pub result: CheckResult,
    pub evaluated_on: DateTime<Utc>,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub props: Vec<Property>,
}

/// One check's recorded outcome across its subjects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationByCheck {
    pub title: String,
    pub description: String,
    pub check_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<Subject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collected: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relevant_evidences: Vec<Link>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub props: Vec<Property>,
}

/// Everything a provider returned for one results request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PvpResult {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub observations_by_check: Vec<ObservationByCheck>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_result_display_matches_oscal_values() {
        assert_eq!(CheckResult::Pass.to_string(), "pass");
        assert_eq!(CheckResult::Fail.to_string(), "fail");
        assert_eq!(CheckResult::Error.to_string(), "error");
        assert_eq!(CheckResult::Warning.to_string(), "warning");
        assert_eq!(CheckResult::Invalid.to_string(), "INVALID");
    }
}

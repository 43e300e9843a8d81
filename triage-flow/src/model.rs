use serde::{Deserialize, Serialize};
use std::fmt;

/// Question type marking a multi-select question.
pub const MULTI_SELECT: &str = "multi_select";

/// One entry of the keyword dataset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeywordEntry {
    pub disease_id: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// A single multiple-choice assessment question.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Question {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
}

impl Question {
    /// Explicit field key: the `id`, else the `type`. Empty strings count as unset.
    pub fn explicit_key(&self) -> Option<&str> {
        non_empty(self.id.as_deref()).or_else(|| non_empty(self.kind.as_deref()))
    }

    pub fn is_multi_select(&self) -> bool {
        self.kind.as_deref() == Some(MULTI_SELECT)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Medicine {
    pub name: String,
    #[serde(default)]
    pub used_for: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dose: Option<String>,
    #[serde(default)]
    pub avoid_if: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CareGuidelines {
    #[serde(default)]
    pub self_care: Vec<String>,
    #[serde(default)]
    pub medicines: Vec<Medicine>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DoctorConsultation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Red-flag phrases that force a high-risk verdict.
    #[serde(default)]
    pub immediate: Vec<String>,
    #[serde(default)]
    pub urgent: Vec<String>,
}

/// Everything the assistant knows about one condition.
///
/// `severity_levels` is only checked for presence; `care_guidelines` must be
/// present as well before a session may use the definition.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DiseaseDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub assessment_questions: Vec<Question>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity_levels: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub care_guidelines: Option<CareGuidelines>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_consultation: Option<DoctorConsultation>,
    #[serde(default)]
    pub disclaimer: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Mild,
    Moderate,
    HighRisk,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Mild => "mild",
            Severity::Moderate => "moderate",
            Severity::HighRisk => "high_risk",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TriageStatus {
    Consult,
    Success,
}

/// Verdict of a completed questionnaire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriageResult {
    pub status: TriageStatus,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub immediate_flags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgent_flags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub care: Option<CareGuidelines>,
    pub disclaimer: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_key_prefers_id_over_type() {
        let q = Question {
            id: Some("other_symptoms".into()),
            kind: Some(MULTI_SELECT.into()),
            question: "Any other symptoms?".into(),
            options: vec!["rash".into()],
        };
        assert_eq!(q.explicit_key(), Some("other_symptoms"));
        assert!(q.is_multi_select());

        let typed = Question {
            id: Some(String::new()),
            kind: Some("temperature".into()),
            ..Default::default()
        };
        assert_eq!(typed.explicit_key(), Some("temperature"));
        assert_eq!(Question::default().explicit_key(), None);
    }

    #[test]
    fn result_serializes_snake_case_and_skips_absent_fields() {
        let result = TriageResult {
            status: TriageStatus::Consult,
            severity: Severity::HighRisk,
            message: Some("See a doctor".into()),
            immediate_flags: Some(vec!["seizure".into()]),
            urgent_flags: None,
            care: None,
            disclaimer: "Not medical advice".into(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "consult");
        assert_eq!(json["severity"], "high_risk");
        assert!(json.get("care").is_none());
        assert!(json.get("urgent_flags").is_none());
    }

    #[test]
    fn disease_definition_parses_type_field() {
        let raw = r#"{
            "name": "Fever",
            "assessment_questions": [
                {"type": "multi_select", "question": "Other symptoms?", "options": ["rash", "none"]}
            ],
            "severity_levels": {},
            "care_guidelines": {"self_care": ["Rest"], "medicines": []},
            "disclaimer": "Informational only"
        }"#;
        let disease: DiseaseDefinition = serde_json::from_str(raw).unwrap();
        assert!(disease.assessment_questions[0].is_multi_select());
        assert!(disease.doctor_consultation.is_none());
        assert_eq!(disease.care_guidelines.unwrap().self_care, vec!["Rest"]);
    }
}

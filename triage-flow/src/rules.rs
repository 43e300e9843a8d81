//! Severity rule engine.
//!
//! Red flags reported under `other_symptoms` escalate straight to high risk.
//! Otherwise each aggravating factor adds one point: 3+ is high risk, 2 is
//! moderate, anything lower is mild.

use tracing::{info, warn};

use crate::{
    condition::{Condition, normalize_condition},
    model::{DiseaseDefinition, Severity, TriageResult, TriageStatus},
};

const DEFAULT_CONSULT_MESSAGE: &str = "Consult doctor immediately.";

/// Scores a raw condition against a disease definition.
pub fn evaluate_rules(raw: &Condition, disease: &DiseaseDefinition) -> TriageResult {
    let condition = normalize_condition(raw);
    let severity = determine_severity(&condition, disease);
    info!(disease = %disease.name, severity = %severity, "triage evaluated");

    let consultation = disease.doctor_consultation.as_ref();
    match severity {
        Severity::HighRisk => TriageResult {
            status: TriageStatus::Consult,
            severity,
            message: Some(
                consultation
                    .and_then(|c| c.message.clone())
                    .unwrap_or_else(|| DEFAULT_CONSULT_MESSAGE.to_string()),
            ),
            immediate_flags: Some(consultation.map(|c| c.immediate.clone()).unwrap_or_default()),
            urgent_flags: None,
            care: None,
            disclaimer: disease.disclaimer.clone(),
        },
        Severity::Moderate => TriageResult {
            status: TriageStatus::Success,
            severity,
            message: None,
            immediate_flags: None,
            urgent_flags: Some(consultation.map(|c| c.urgent.clone()).unwrap_or_default()),
            care: disease.care_guidelines.clone(),
            disclaimer: disease.disclaimer.clone(),
        },
        Severity::Mild => TriageResult {
            status: TriageStatus::Success,
            severity,
            message: None,
            immediate_flags: None,
            urgent_flags: None,
            care: disease.care_guidelines.clone(),
            disclaimer: disease.disclaimer.clone(),
        },
    }
}

/// Severity for an already normalized condition.
pub fn determine_severity(condition: &Condition, disease: &DiseaseDefinition) -> Severity {
    if has_red_flag(condition, disease) {
        warn!(disease = %disease.name, "red flag detected");
        return Severity::HighRisk;
    }

    let score = risk_score(condition);
    info!(score, "risk score computed");
    severity_for_score(score)
}

pub fn severity_for_score(score: u32) -> Severity {
    match score {
        s if s >= 3 => Severity::HighRisk,
        2 => Severity::Moderate,
        _ => Severity::Mild,
    }
}

/// True when `other_symptoms` contains any of the disease's immediate phrases.
pub fn has_red_flag(condition: &Condition, disease: &DiseaseDefinition) -> bool {
    let Some(consultation) = disease.doctor_consultation.as_ref() else {
        return false;
    };
    let symptoms = condition
        .get("other_symptoms")
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    consultation
        .immediate
        .iter()
        .filter(|flag| !flag.trim().is_empty())
        .map(|flag| flag.to_lowercase())
        .any(|flag| symptoms.contains(&flag))
}

/// Weighted score over normalized fields.
///
/// The severe and moderate intensity checks each look at both `pain_level`
/// and `energy_level`, so one field at "severe" and the other at "moderate"
/// adds two points.
pub fn risk_score(condition: &Condition) -> u32 {
    let field = |key: &str| condition.get(key).map(String::as_str);
    let either_is = |value: &str| field("pain_level") == Some(value) || field("energy_level") == Some(value);

    let mut score = 0;
    if either_is("severe") {
        score += 1;
    }
    if either_is("moderate") {
        score += 1;
    }
    if field("duration_days") == Some(">3") {
        score += 1;
    }
    if field("vomiting") == Some("persistent") {
        score += 1;
    }
    if field("temperature") == Some(">102°F") {
        score += 1;
    }
    if field("temperature") == Some("100.4-102°F") {
        score += 1;
    }
    score
}

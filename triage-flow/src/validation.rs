use tracing::{debug, error};

use crate::{
    error::{Result, TriageError},
    model::{DiseaseDefinition, Question},
};

/// Diagnostics for one question; `index` is 0-based, messages use 1-based positions.
pub fn validate_question(question: &Question, index: usize) -> Vec<String> {
    let position = index + 1;
    let mut errors = Vec::new();

    if question.question.trim().is_empty() {
        errors.push(format!("Question {position}: Missing question text"));
    }

    if question.options.is_empty() {
        errors.push(format!("Question {position}: Missing or invalid options array"));
    }

    if question.explicit_key().is_none() {
        errors.push(format!("Question {position}: Missing both id and type fields"));
    }

    errors
}

/// Collects the diagnostics of every question.
pub fn validate_questions(questions: &[Question]) -> Vec<String> {
    questions
        .iter()
        .enumerate()
        .flat_map(|(index, question)| validate_question(question, index))
        .collect()
}

/// Rejects a question set with any diagnostic.
pub fn ensure_valid_questions(questions: &[Question]) -> Result<()> {
    let errors = validate_questions(questions);
    if errors.is_empty() {
        debug!(questions = questions.len(), "all questions valid");
        return Ok(());
    }
    error!(errors = ?errors, "question validation failed");
    Err(TriageError::InvalidQuestions(errors))
}

/// Structural checks a definition must pass before a session can use it.
pub fn ensure_valid_disease(disease: &DiseaseDefinition) -> Result<()> {
    if disease.severity_levels.is_none() || disease.care_guidelines.is_none() {
        return Err(TriageError::InvalidDiseaseData(format!(
            "{} is missing severity_levels or care_guidelines",
            if disease.name.is_empty() { "definition" } else { disease.name.as_str() }
        )));
    }
    ensure_valid_questions(&disease.assessment_questions)
}

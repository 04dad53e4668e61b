use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Request to match a mentee against the mentors of a category
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MatchRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "mentee_user_id", rename = "menteeUserId")]
    pub mentee_user_id: String,
    #[validate(length(min = 1))]
    #[serde(alias = "mentee_mentorship_id", rename = "menteeMentorshipId")]
    pub mentee_mentorship_id: String,
    #[validate(length(min = 1))]
    #[serde(alias = "category_id", rename = "categoryId")]
    pub category_id: String,
    #[validate(length(min = 1), custom(function = "validate_answers"))]
    #[serde(default)]
    pub answers: Vec<String>,
}

fn validate_answers(answers: &[String]) -> Result<(), ValidationError> {
    if answers.iter().any(|answer| answer.trim().is_empty()) {
        return Err(ValidationError::new("blank_answer"));
    }
    Ok(())
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a mentorship record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MentorshipStatus {
    Pending,
    Matched,
}

impl MentorshipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MentorshipStatus::Pending => "pending",
            MentorshipStatus::Matched => "matched",
        }
    }
}

impl fmt::Display for MentorshipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MentorshipStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(MentorshipStatus::Pending),
            "matched" => Ok(MentorshipStatus::Matched),
            other => Err(format!("unknown mentorship status: {}", other)),
        }
    }
}

/// Which side of a mentorship a record represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Mentor,
    Mentee,
}

impl Position {
    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Mentor => "mentor",
            Position::Mentee => "mentee",
        }
    }
}

impl FromStr for Position {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mentor" => Ok(Position::Mentor),
            "mentee" => Ok(Position::Mentee),
            other => Err(format!("unknown position: {}", other)),
        }
    }
}

/// A mentorship record: one user's answers for one category
///
/// The record id is distinct from the owning user's id. A user holds at most
/// one active record per category; the repository enforces that, not the matcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mentorship {
    #[serde(alias = "$id")]
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub position: Position,
    #[serde(rename = "categoryId")]
    pub category_id: String,
    #[serde(rename = "categoryName", default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub answers: Vec<String>,
    pub status: MentorshipStatus,
    #[serde(rename = "isDeleted", default)]
    pub is_deleted: bool,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Mentorship {
    /// Whether the record has at least one recorded answer
    pub fn has_answers(&self) -> bool {
        !self.answers.is_empty()
    }
}

/// Outcome of a successful match: the selected mentor record and its score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchDecision {
    #[serde(rename = "mentorshipId")]
    pub mentorship_id: String,
    #[serde(rename = "mentorId")]
    pub mentor_id: String,
    #[serde(rename = "categoryId")]
    pub category_id: String,
    #[serde(rename = "similarityScore")]
    pub similarity_score: f32,
}

/// Persisted record of a completed match between a mentee and a mentor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: String,
    pub mentee_id: String,
    pub mentor_id: String,
    pub mentee_mentorship_id: String,
    pub mentor_mentorship_id: String,
    pub category_id: String,
    pub similarity_score: f32,
    pub matched_at: chrono::DateTime<chrono::Utc>,
}

impl MatchRecord {
    pub fn new(mentee: &Mentorship, decision: &MatchDecision) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            mentee_id: mentee.user_id.clone(),
            mentor_id: decision.mentor_id.clone(),
            mentee_mentorship_id: mentee.id.clone(),
            mentor_mentorship_id: decision.mentorship_id.clone(),
            category_id: decision.category_id.clone(),
            similarity_score: decision.similarity_score,
            matched_at: chrono::Utc::now(),
        }
    }
}

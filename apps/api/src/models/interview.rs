use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Lower bound of the feedback score scale.
pub const SCORE_MIN: f64 = 0.0;
/// Upper bound of the feedback score scale. Chart axes use `[SCORE_MIN, SCORE_MAX]`.
pub const SCORE_MAX: f64 = 10.0;

/// Returns true when `score` is a usable value on the 0–10 scale.
pub fn score_in_range(score: f64) -> bool {
    score.is_finite() && (SCORE_MIN..=SCORE_MAX).contains(&score)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterviewType {
    Technical,
    #[serde(rename = "HR")]
    Hr,
    Behavioral,
    Fresher,
}

impl InterviewType {
    pub const ALL: [InterviewType; 4] = [
        InterviewType::Technical,
        InterviewType::Hr,
        InterviewType::Behavioral,
        InterviewType::Fresher,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewType::Technical => "Technical",
            InterviewType::Hr => "HR",
            InterviewType::Behavioral => "Behavioral",
            InterviewType::Fresher => "Fresher",
        }
    }

    /// Lowercase path segment used by the navigation surface, e.g. `/interview/technical`.
    pub fn slug(&self) -> &'static str {
        match self {
            InterviewType::Technical => "technical",
            InterviewType::Hr => "hr",
            InterviewType::Behavioral => "behavioral",
            InterviewType::Fresher => "fresher",
        }
    }
}

impl fmt::Display for InterviewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterviewType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InterviewType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown interview type '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard]
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown difficulty '{s}'"))
    }
}

/// Fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewParameters {
    pub interview_type: InterviewType,
    pub topic: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub resume_text: Option<String>,
}

impl InterviewParameters {
    /// Builds parameters, dropping optional text fields that are blank.
    pub fn new(
        interview_type: InterviewType,
        topic: Option<String>,
        difficulty: Option<Difficulty>,
        resume_text: Option<String>,
    ) -> Self {
        Self {
            interview_type,
            topic: non_blank(topic),
            difficulty,
            resume_text: non_blank(resume_text),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
}

/// Structured evaluation of one answer. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// 0–10 inclusive.
    pub overall_score: f64,
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub summary: String,
}

/// A round ready to be written to the store. `created_at` is assigned server-side.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInterview {
    pub id: Uuid,
    pub user_id: String,
    pub interview_type: InterviewType,
    pub session_name: String,
    pub topic: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub resume_text: Option<String>,
    pub question: String,
    pub answer: String,
    pub feedback: FeedbackRecord,
    pub answer_duration_secs: Option<i64>,
}

/// A persisted interview round as read back from the store.
///
/// `feedback` is kept as raw JSON and `created_at` as optional so that
/// malformed documents can still be listed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InterviewRow {
    pub id: Uuid,
    pub user_id: String,
    pub interview_type: String,
    pub session_name: String,
    pub topic: Option<String>,
    pub difficulty: Option<String>,
    pub resume_text: Option<String>,
    pub question: String,
    pub answer: String,
    pub feedback: Value,
    pub answer_duration_secs: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
}

impl InterviewRow {
    /// The feedback score, if present and on the 0–10 scale.
    pub fn overall_score(&self) -> Option<f64> {
        self.feedback
            .get("overall_score")
            .and_then(Value::as_f64)
            .filter(|s| score_in_range(*s))
    }
}

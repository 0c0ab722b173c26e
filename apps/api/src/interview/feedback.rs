//! Feedback generation: scores one answer on the 0–10 scale.
//!
//! The collaborator's reply is validated before it becomes a `FeedbackRecord`;
//! anything outside the published schema is a `FeedbackFailure`.

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::interview::prompts::{FEEDBACK_PROMPT_TEMPLATE, FEEDBACK_SYSTEM};
use crate::llm_client::prompts::{fill, COACH_INSTRUCTION};
use crate::llm_client::{call_json, LlmError, TextGenerator};
use crate::models::interview::{score_in_range, FeedbackRecord, InterviewType};

#[derive(Debug, Error)]
pub enum FeedbackFailure {
    #[error("feedback service unavailable: {0}")]
    Unavailable(#[from] LlmError),

    #[error("feedback response violated schema: {0}")]
    InvalidSchema(String),
}

/// Wire shape of the collaborator's reply.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFeedback {
    overall_score: f64,
    strengths: Vec<String>,
    areas_for_improvement: Vec<String>,
    summary: String,
}

#[derive(Clone)]
pub struct FeedbackService {
    llm: Arc<dyn TextGenerator>,
}

impl FeedbackService {
    pub fn new(llm: Arc<dyn TextGenerator>) -> Self {
        Self { llm }
    }

    /// Callers must reject blank answers before calling.
    pub async fn provide_feedback(
        &self,
        question: &str,
        answer: &str,
        interview_type: InterviewType,
    ) -> Result<FeedbackRecord, FeedbackFailure> {
        let prompt = build_feedback_prompt(question, answer, interview_type);

        let raw: RawFeedback = call_json(self.llm.as_ref(), &prompt, FEEDBACK_SYSTEM).await?;
        let record = validate(raw).inspect_err(|e| warn!("Rejected feedback: {e}"))?;

        info!(
            "Feedback generated for {} answer: score {}/10",
            interview_type, record.overall_score
        );
        Ok(record)
    }
}

pub fn build_feedback_prompt(question: &str, answer: &str, interview_type: InterviewType) -> String {
    fill(
        FEEDBACK_PROMPT_TEMPLATE,
        &[
            ("coach_instruction", COACH_INSTRUCTION),
            ("interview_type", interview_type.as_str()),
            ("question", question),
            ("answer", answer),
        ],
    )
}

fn validate(raw: RawFeedback) -> Result<FeedbackRecord, FeedbackFailure> {
    if !score_in_range(raw.overall_score) {
        return Err(FeedbackFailure::InvalidSchema(format!(
            "overallScore {} is outside 0-10",
            raw.overall_score
        )));
    }

    let strengths = clean_points(raw.strengths);
    if strengths.is_empty() {
        return Err(FeedbackFailure::InvalidSchema(
            "strengths must not be empty".to_string(),
        ));
    }

    let areas_for_improvement = clean_points(raw.areas_for_improvement);
    if areas_for_improvement.is_empty() {
        return Err(FeedbackFailure::InvalidSchema(
            "areasForImprovement must not be empty".to_string(),
        ));
    }

    let summary = raw.summary.trim().to_string();
    if summary.is_empty() {
        return Err(FeedbackFailure::InvalidSchema(
            "summary must not be empty".to_string(),
        ));
    }

    Ok(FeedbackRecord {
        overall_score: raw.overall_score,
        strengths,
        areas_for_improvement,
        summary,
    })
}

fn clean_points(points: Vec<String>) -> Vec<String> {
    points
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

//! Response analysis: a prose coaching review along clarity, relevance and confidence.
//! Never persisted; independent of the scored feedback flow.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::interview::prompts::{ANALYSIS_PROMPT_TEMPLATE, ANALYSIS_SYSTEM};
use crate::llm_client::prompts::{fill, COACH_INSTRUCTION};
use crate::llm_client::{call_json, TextGenerator};
use crate::models::interview::InterviewType;

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisRequest {
    pub question: String,
    pub response: String,
    pub interview_type: InterviewType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct ResponseAnalysis {
    pub clarity: String,
    pub relevance: String,
    pub confidence: String,
    pub overall_feedback: String,
    pub strengths: String,
    pub weaknesses: String,
    pub improvement_suggestions: String,
}

pub async fn analyze_response(
    llm: &dyn TextGenerator,
    request: &AnalysisRequest,
) -> Result<ResponseAnalysis, AppError> {
    if request.response.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Please provide a response before requesting analysis.".to_string(),
        ));
    }

    let prompt = fill(
        ANALYSIS_PROMPT_TEMPLATE,
        &[
            ("coach_instruction", COACH_INSTRUCTION),
            ("interview_type", request.interview_type.as_str()),
            ("question", &request.question),
            ("response", &request.response),
        ],
    );

    call_json(llm, &prompt, ANALYSIS_SYSTEM)
        .await
        .map_err(|e| AppError::Llm(format!("Response analysis failed: {e}")))
}

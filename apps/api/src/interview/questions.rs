//! Question generation: turns fixed interview parameters into one question per round.
//!
//! The collaborator's JSON reply is the only source of questions. Any failure is
//! absorbed here: the caller receives `FALLBACK_QUESTION` plus a
//! `GenerationFailure` notice and never sees the underlying error.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use crate::interview::notice::Notice;
use crate::interview::prompts::{
    DIFFICULTY_SECTION, QUESTION_PROMPT_TEMPLATE, QUESTION_SYSTEM, RESUME_SECTION, TOPIC_SECTION,
};
use crate::llm_client::prompts::fill;
use crate::llm_client::{call_json, TextGenerator};
use crate::models::interview::{InterviewParameters, Question};

pub const FALLBACK_QUESTION: &str = "Sorry, I couldn't think of a question. Please try again.";

#[derive(Debug, Deserialize)]
struct GeneratedQuestion {
    question: String,
}

/// Result of one generation call. `notice` is set exactly when the fallback was used.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionOutcome {
    pub question: Question,
    pub notice: Option<Notice>,
}

#[derive(Clone)]
pub struct QuestionService {
    llm: Arc<dyn TextGenerator>,
}

impl QuestionService {
    pub fn new(llm: Arc<dyn TextGenerator>) -> Self {
        Self { llm }
    }

    pub async fn generate_question(&self, params: &InterviewParameters) -> QuestionOutcome {
        let prompt = build_question_prompt(params);

        let generated = call_json::<GeneratedQuestion>(self.llm.as_ref(), &prompt, QUESTION_SYSTEM)
            .await
            .map_err(|e| e.to_string())
            .and_then(|g| {
                let text = g.question.trim().to_string();
                if text.is_empty() {
                    Err("collaborator returned a blank question".to_string())
                } else {
                    Ok(text)
                }
            });

        match generated {
            Ok(text) => {
                info!(
                    "Generated {} question: {}",
                    params.interview_type,
                    text.chars().take(60).collect::<String>()
                );
                QuestionOutcome {
                    question: Question { text },
                    notice: None,
                }
            }
            Err(reason) => {
                warn!("Question generation failed, using fallback: {reason}");
                QuestionOutcome {
                    question: Question {
                        text: FALLBACK_QUESTION.to_string(),
                    },
                    notice: Some(Notice::generation()),
                }
            }
        }
    }
}

/// Builds the question prompt. Each optional field owns one section; an absent
/// field renders its section as empty and leaves the rest of the prompt untouched.
pub fn build_question_prompt(params: &InterviewParameters) -> String {
    let topic_section = params
        .topic
        .as_deref()
        .map(|topic| fill(TOPIC_SECTION, &[("topic", topic)]))
        .unwrap_or_default();
    let difficulty_section = params
        .difficulty
        .map(|d| fill(DIFFICULTY_SECTION, &[("difficulty", d.as_str())]))
        .unwrap_or_default();
    let resume_section = params
        .resume_text
        .as_deref()
        .map(|resume| fill(RESUME_SECTION, &[("resume_text", resume)]))
        .unwrap_or_default();

    fill(
        QUESTION_PROMPT_TEMPLATE,
        &[
            ("interview_type", params.interview_type.as_str()),
            ("topic_section", &topic_section),
            ("difficulty_section", &difficulty_section),
            ("resume_section", &resume_section),
        ],
    )
}

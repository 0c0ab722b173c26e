//! In-memory collaborators shared by unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;

use crate::llm_client::{LlmError, TextGenerator};
use crate::models::interview::{InterviewRow, NewInterview};
use crate::store::{InterviewStore, StoreError};

/// A text generator that replays canned replies and records every prompt.
/// `None` entries (and an exhausted script without a default) fail the call.
#[derive(Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Option<String>>>,
    default_reply: Option<String>,
    prompts: Mutex<Vec<String>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedGenerator {
    pub fn replying<'a>(replies: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Some(r.to_string())).collect()),
            ..Default::default()
        }
    }

    pub fn always(reply: &str) -> Self {
        Self {
            default_reply: Some(reply.to_string()),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    /// Replies with `script` in order; `None` entries fail.
    pub fn scripted(script: Vec<Option<&str>>) -> Self {
        Self {
            replies: Mutex::new(
                script
                    .into_iter()
                    .map(|r| r.map(str::to_string))
                    .collect(),
            ),
            ..Default::default()
        }
    }

    /// Holds every call until the returned `Notify` is signalled.
    pub fn gated(reply: &str) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let generator = Self {
            default_reply: Some(reply.to_string()),
            gate: Some(gate.clone()),
            ..Default::default()
        };
        (generator, gate)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn complete(&self, prompt: &str, _system: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Some(reply)) => Ok(reply),
            Some(None) => Err(LlmError::Api {
                status: 500,
                message: "scripted failure".to_string(),
            }),
            None => self.default_reply.clone().ok_or(LlmError::Api {
                status: 503,
                message: "collaborator unavailable".to_string(),
            }),
        }
    }
}

/// Store fake. Lists rows in insertion order (oldest first).
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<InterviewRow>>,
    fail_inserts: AtomicBool,
    fail_reads: AtomicBool,
    insert_attempts: AtomicUsize,
}

impl MemoryStore {
    pub fn with_rows(rows: Vec<InterviewRow>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Default::default()
        }
    }

    pub fn set_fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn rows(&self) -> Vec<InterviewRow> {
        self.rows.lock().unwrap().clone()
    }

    pub fn insert_attempts(&self) -> usize {
        self.insert_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InterviewStore for MemoryStore {
    async fn insert(&self, record: &NewInterview) -> Result<InterviewRow, StoreError> {
        self.insert_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("write rejected".to_string()));
        }
        let row = InterviewRow {
            id: record.id,
            user_id: record.user_id.clone(),
            interview_type: record.interview_type.as_str().to_string(),
            session_name: record.session_name.clone(),
            topic: record.topic.clone(),
            difficulty: record.difficulty.map(|d| d.as_str().to_string()),
            resume_text: record.resume_text.clone(),
            question: record.question.clone(),
            answer: record.answer.clone(),
            feedback: serde_json::to_value(&record.feedback)?,
            answer_duration_secs: record.answer_duration_secs,
            created_at: Some(Utc::now()),
        };
        self.rows.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<InterviewRow>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("read rejected".to_string()));
        }
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }
}

pub fn question_reply(text: &str) -> String {
    serde_json::json!({ "question": text }).to_string()
}

pub fn feedback_reply(score: f64) -> String {
    serde_json::json!({
        "overallScore": score,
        "strengths": ["Named the right hook", "Concise"],
        "areasForImprovement": ["Mention the dependency array"],
        "summary": "A solid start. Add detail on cleanup and dependencies."
    })
    .to_string()
}

use serde::{Deserialize, Serialize};

/// Failure categories surfaced to the user. Each maps to a distinct notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    GenerationFailure,
    FeedbackFailure,
    PersistenceFailure,
    MediaAccessFailure,
    InvalidInput,
    HistoryLoadFailure,
}

/// A user-visible notification attached to the result of one transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: FailureKind,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn generation() -> Self {
        Self {
            kind: FailureKind::GenerationFailure,
            title: "Error".to_string(),
            message: "Failed to generate a new question.".to_string(),
        }
    }

    pub fn feedback() -> Self {
        Self {
            kind: FailureKind::FeedbackFailure,
            title: "Feedback Error".to_string(),
            message: "Could not get feedback for your answer. Your answer was kept, please try submitting again."
                .to_string(),
        }
    }

    pub fn persistence() -> Self {
        Self {
            kind: FailureKind::PersistenceFailure,
            title: "Not Saved".to_string(),
            message: "Your feedback is ready but this round could not be saved to your history."
                .to_string(),
        }
    }

    pub fn invalid_input(message: &str) -> Self {
        Self {
            kind: FailureKind::InvalidInput,
            title: "Empty Answer".to_string(),
            message: message.to_string(),
        }
    }

    pub fn media_access(message: &str) -> Self {
        Self {
            kind: FailureKind::MediaAccessFailure,
            title: "Microphone Unavailable".to_string(),
            message: message.to_string(),
        }
    }

    pub fn history() -> Self {
        Self {
            kind: FailureKind::HistoryLoadFailure,
            title: "History Unavailable".to_string(),
            message: "Your interview history could not be loaded.".to_string(),
        }
    }
}

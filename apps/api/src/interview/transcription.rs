//! Answer capture: the per-round answer accumulator and the speech fragment feed.
//!
//! Typed edits replace the answer text. Transcribed fragments only ever append,
//! so a fragment can never wipe out what the user typed. Fragments are numbered
//! by the producer; anything at or below the last applied `seq` is a replay and
//! is dropped.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// One unit of recognised speech.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub seq: u64,
    pub text: String,
    /// Interim results are previews that the recogniser may still revise.
    #[serde(default)]
    pub is_final: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("answer changed since revision {expected} (now {current})")]
pub struct StaleEdit {
    pub expected: u64,
    pub current: u64,
}

#[derive(Debug, Error)]
#[error("transcription feed is closed")]
pub struct FeedClosed;

#[derive(Debug, Default, Clone)]
pub struct AnswerBuffer {
    text: String,
    revision: u64,
    interim: Option<String>,
    last_seq: Option<u64>,
}

impl AnswerBuffer {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn interim(&self) -> Option<&str> {
        self.interim.as_deref()
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Replaces the text with a typed edit. With `expected_revision` set, the
    /// edit is refused if anything changed the answer in the meantime.
    pub fn edit(&mut self, text: String, expected_revision: Option<u64>) -> Result<u64, StaleEdit> {
        if let Some(expected) = expected_revision {
            if expected != self.revision {
                return Err(StaleEdit {
                    expected,
                    current: self.revision,
                });
            }
        }
        self.text = text;
        self.revision += 1;
        Ok(self.revision)
    }

    /// Applies one fragment. Returns false for replays.
    pub fn apply(&mut self, fragment: &Fragment) -> bool {
        if self.last_seq.is_some_and(|last| fragment.seq <= last) {
            debug!("Dropping replayed fragment seq={}", fragment.seq);
            return false;
        }
        self.last_seq = Some(fragment.seq);

        let piece = fragment.text.trim();
        if !fragment.is_final {
            self.interim = (!piece.is_empty()).then(|| piece.to_string());
            return true;
        }

        self.interim = None;
        if !piece.is_empty() {
            if !self.text.is_empty() && !self.text.ends_with(char::is_whitespace) {
                self.text.push(' ');
            }
            self.text.push_str(piece);
            self.revision += 1;
        }
        true
    }

    /// Forgets fragment numbering and any preview. Called when a new recogniser
    /// stream starts, since it numbers its fragments from the beginning again.
    pub fn begin_stream(&mut self) {
        self.last_seq = None;
        self.interim = None;
    }

    /// Empties the buffer for a new round. The revision keeps counting so edits
    /// aimed at an earlier round are still detected as stale.
    pub fn reset(&mut self) {
        self.text.clear();
        self.interim = None;
        self.last_seq = None;
        self.revision += 1;
    }
}

/// Receives fragments drained from a `TranscriptionFeed`.
#[async_trait]
pub trait FragmentSink: Send + Sync + 'static {
    async fn accept(&self, fragment: Fragment);
}

/// A cancellable stream of fragments with a single consumer task.
pub struct TranscriptionFeed {
    sender: mpsc::UnboundedSender<Fragment>,
    consumer: JoinHandle<usize>,
}

impl TranscriptionFeed {
    pub fn start<S: FragmentSink>(sink: S) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Fragment>();
        let consumer = tokio::spawn(async move {
            let mut delivered = 0;
            while let Some(fragment) = receiver.recv().await {
                sink.accept(fragment).await;
                delivered += 1;
            }
            delivered
        });
        Self { sender, consumer }
    }

    pub fn push(&self, fragment: Fragment) -> Result<(), FeedClosed> {
        self.sender.send(fragment).map_err(|_| FeedClosed)
    }

    /// Closes the feed and waits until every fragment already pushed has been
    /// handed to the sink. Returns the number delivered.
    pub async fn stop(self) -> usize {
        drop(self.sender);
        match self.consumer.await {
            Ok(delivered) => delivered,
            Err(e) => {
                warn!("Transcription consumer ended abnormally: {e}");
                0
            }
        }
    }
}

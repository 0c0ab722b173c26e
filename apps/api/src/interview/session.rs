//! Session controller: drives one interview session through its rounds.
//!
//! Flow per round: LoadingQuestion → AwaitingAnswer → Submitting → ShowingFeedback,
//! with `Ended` reachable from anywhere.
//!
//! The state lock is never held across a collaborator call. Each in-flight call
//! remembers the epoch it started in; `next_question` and `end` bump the epoch,
//! so completions that arrive late are discarded instead of touching the session.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::feedback::FeedbackService;
use crate::interview::notice::Notice;
use crate::interview::questions::QuestionService;
use crate::interview::transcription::{AnswerBuffer, Fragment, FragmentSink, TranscriptionFeed};
use crate::models::interview::{
    Difficulty, FeedbackRecord, InterviewParameters, InterviewType, NewInterview, Question,
};
use crate::models::user::User;
use crate::store::InterviewStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    LoadingQuestion,
    AwaitingAnswer,
    Submitting,
    ShowingFeedback,
    Ended,
}

/// Collaborators shared by every session.
#[derive(Clone)]
pub struct SessionServices {
    pub questions: QuestionService,
    pub feedback: FeedbackService,
    pub store: Arc<dyn InterviewStore>,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub session_name: String,
    pub params: InterviewParameters,
    pub transcription_enabled: bool,
}

/// Snapshot returned by every transition.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub session_name: String,
    pub interview_type: InterviewType,
    pub topic: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub phase: SessionPhase,
    pub round: u32,
    pub rounds_completed: u32,
    pub question: Option<String>,
    pub answer: String,
    pub answer_revision: u64,
    pub interim_transcript: Option<String>,
    pub transcribing: bool,
    pub feedback: Option<FeedbackRecord>,
    /// `Some(false)` when the last round's feedback is shown but was not stored.
    pub saved: Option<bool>,
    pub notice: Option<Notice>,
}

struct RoundResult {
    record: NewInterview,
    saved: bool,
}

struct SessionState {
    phase: SessionPhase,
    epoch: u64,
    round: u32,
    rounds_completed: u32,
    question: Option<Question>,
    presented_at: Option<DateTime<Utc>>,
    answer: AnswerBuffer,
    feed: Option<TranscriptionFeed>,
    /// Set while a stopped feed is still handing queued fragments to the answer.
    draining: Option<watch::Receiver<bool>>,
    result: Option<RoundResult>,
    saving: bool,
    notice: Option<Notice>,
}

impl SessionState {
    fn is_current(&self, epoch: u64, phase: SessionPhase) -> bool {
        self.epoch == epoch && self.phase == phase
    }
}

pub struct SessionController {
    id: Uuid,
    owner: User,
    settings: SessionSettings,
    services: SessionServices,
    state: Arc<Mutex<SessionState>>,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl SessionController {
    pub fn new(owner: User, settings: SessionSettings, services: SessionServices) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            settings,
            services,
            state: Arc::new(Mutex::new(SessionState {
                phase: SessionPhase::LoadingQuestion,
                epoch: 0,
                round: 0,
                rounds_completed: 0,
                question: None,
                presented_at: None,
                answer: AnswerBuffer::default(),
                feed: None,
                draining: None,
                result: None,
                saving: false,
                notice: None,
            })),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn owner_id(&self) -> &str {
        &self.owner.id
    }

    /// Loads the first question. Valid once, right after construction.
    pub async fn begin_round(&self) -> Result<SessionView, AppError> {
        let epoch = {
            let mut state = self.state.lock().await;
            if state.phase != SessionPhase::LoadingQuestion || state.round != 0 {
                return Err(AppError::Conflict("session already started".to_string()));
            }
            state.round = 1;
            state.epoch += 1;
            state.epoch
        };
        info!(
            "Session {} started: {} for user {}",
            self.id, self.settings.params.interview_type, self.owner.id
        );
        self.load_question(epoch).await
    }

    /// Advances from the feedback view to a new round with the same parameters.
    pub async fn next_question(&self) -> Result<SessionView, AppError> {
        let epoch = {
            let mut state = self.state.lock().await;
            require_phase(&state, SessionPhase::ShowingFeedback, "move to the next question")?;
            state.phase = SessionPhase::LoadingQuestion;
            state.round += 1;
            state.epoch += 1;
            state.question = None;
            state.presented_at = None;
            state.result = None;
            state.answer.reset();
            state.notice = None;
            state.epoch
        };
        self.load_question(epoch).await
    }

    async fn load_question(&self, epoch: u64) -> Result<SessionView, AppError> {
        let outcome = self
            .services
            .questions
            .generate_question(&self.settings.params)
            .await;

        let mut state = self.state.lock().await;
        if !state.is_current(epoch, SessionPhase::LoadingQuestion) {
            debug!("Session {}: discarding late question", self.id);
            return Err(session_gone());
        }
        state.question = Some(outcome.question);
        state.presented_at = Some(Utc::now());
        state.answer.reset();
        state.phase = SessionPhase::AwaitingAnswer;
        state.notice = outcome.notice;
        Ok(self.view_of(&state))
    }

    /// Replaces the answer with the user's typed text.
    pub async fn edit_answer(
        &self,
        text: String,
        expected_revision: Option<u64>,
    ) -> Result<SessionView, AppError> {
        let mut state = self.state.lock().await;
        require_phase(&state, SessionPhase::AwaitingAnswer, "edit the answer")?;
        state
            .answer
            .edit(text, expected_revision)
            .map_err(|e| AppError::Conflict(e.to_string()))?;
        state.notice = None;
        Ok(self.view_of(&state))
    }

    pub async fn start_transcription(&self) -> Result<SessionView, AppError> {
        if !self.settings.transcription_enabled {
            return Err(AppError::MediaAccess(
                "Speech transcription is not supported here. You can still type your answer."
                    .to_string(),
            ));
        }

        self.settle_transcription().await;
        let mut state = self.state.lock().await;
        require_phase(&state, SessionPhase::AwaitingAnswer, "start transcription")?;
        if state.draining.is_some() {
            return Err(AppError::Conflict("transcription is still stopping".to_string()));
        }
        if state.feed.is_none() {
            self.open_feed(&mut state);
            info!("Session {}: transcription started", self.id);
        }
        Ok(self.view_of(&state))
    }

    fn open_feed(&self, state: &mut SessionState) {
        state.answer.begin_stream();
        let sink = RoundSink {
            state: self.state.clone(),
            epoch: state.epoch,
        };
        state.feed = Some(TranscriptionFeed::start(sink));
    }

    /// Waits until no stopped feed is still delivering fragments.
    async fn settle_transcription(&self) {
        loop {
            let pending = self.state.lock().await.draining.clone();
            let Some(mut done) = pending else {
                return;
            };
            let settled = done.wait_for(|drained| *drained).await.is_ok();
            if !settled {
                return;
            }
        }
    }

    /// Queues one recognised fragment. It reaches the answer asynchronously.
    pub async fn push_fragment(&self, fragment: Fragment) -> Result<(), AppError> {
        let state = self.state.lock().await;
        require_phase(&state, SessionPhase::AwaitingAnswer, "accept transcription")?;
        let feed = state
            .feed
            .as_ref()
            .ok_or_else(|| AppError::Conflict("transcription is not running".to_string()))?;
        feed.push(fragment)
            .map_err(|e| AppError::Conflict(e.to_string()))
    }

    /// Stops transcription after every queued fragment has been applied.
    /// A submit arriving meanwhile waits for the drain instead of freezing a partial answer.
    pub async fn stop_transcription(&self) -> Result<SessionView, AppError> {
        let stopping = {
            let mut state = self.state.lock().await;
            state.feed.take().map(|feed| {
                let (done, pending) = watch::channel(false);
                state.draining = Some(pending);
                (feed, done)
            })
        };

        match stopping {
            Some((feed, done)) => {
                let delivered = feed.stop().await;
                self.state.lock().await.draining = None;
                // Nobody waiting is fine.
                let _ = done.send(true);
                info!(
                    "Session {}: transcription stopped after {delivered} fragments",
                    self.id
                );
            }
            None => self.settle_transcription().await,
        }
        Ok(self.view().await)
    }

    /// Submits the current answer for feedback and stores the round.
    ///
    /// A blank answer is rejected before any collaborator call. Transcription is
    /// drained and stopped before the answer is frozen. Feedback failure returns
    /// to `AwaitingAnswer` with the answer intact and nothing stored.
    pub async fn submit(&self) -> Result<SessionView, AppError> {
        let (feed, epoch) = loop {
            self.settle_transcription().await;
            let mut state = self.state.lock().await;
            if state.draining.is_some() {
                continue;
            }
            require_phase(&state, SessionPhase::AwaitingAnswer, "submit")?;
            if state.feed.is_none() && state.answer.is_blank() {
                return Err(empty_answer());
            }
            state.phase = SessionPhase::Submitting;
            state.notice = None;
            break (state.feed.take(), state.epoch);
        };

        let was_transcribing = feed.is_some();
        if let Some(feed) = feed {
            feed.stop().await;
        }

        let (question, answer, answer_duration_secs) = {
            let mut state = self.state.lock().await;
            if !state.is_current(epoch, SessionPhase::Submitting) {
                return Err(session_gone());
            }
            if state.answer.is_blank() {
                state.phase = SessionPhase::AwaitingAnswer;
                if was_transcribing {
                    self.open_feed(&mut state);
                }
                return Err(empty_answer());
            }
            let Some(question) = state.question.clone() else {
                state.phase = SessionPhase::AwaitingAnswer;
                return Err(AppError::Conflict("no question has been presented".to_string()));
            };
            let duration = state
                .presented_at
                .map(|at| (Utc::now() - at).num_seconds().max(0));
            (question, state.answer.text().to_string(), duration)
        };

        let interview_type = self.settings.params.interview_type;
        let feedback = self
            .services
            .feedback
            .provide_feedback(&question.text, &answer, interview_type)
            .await;

        let record = {
            let mut state = self.state.lock().await;
            if !state.is_current(epoch, SessionPhase::Submitting) {
                debug!("Session {}: discarding late feedback", self.id);
                return Err(session_gone());
            }
            match feedback {
                Ok(feedback) => self.build_record(question, answer, feedback, answer_duration_secs),
                Err(e) => {
                    warn!("Session {}: feedback failed: {e}", self.id);
                    state.phase = SessionPhase::AwaitingAnswer;
                    state.notice = Some(Notice::feedback());
                    return Ok(self.view_of(&state));
                }
            }
        };

        let stored = self.services.store.insert(&record).await;

        let mut state = self.state.lock().await;
        if !state.is_current(epoch, SessionPhase::Submitting) {
            debug!("Session {}: ended while storing round {}", self.id, state.round);
            return Err(session_gone());
        }
        let saved = match stored {
            Ok(row) => {
                info!("Session {}: round {} stored as {}", self.id, state.round, row.id);
                true
            }
            Err(e) => {
                warn!("Session {}: round {} not stored: {e}", self.id, state.round);
                state.notice = Some(Notice::persistence());
                false
            }
        };
        state.result = Some(RoundResult { record, saved });
        state.rounds_completed += 1;
        state.phase = SessionPhase::ShowingFeedback;
        Ok(self.view_of(&state))
    }

    /// Writes a round whose first save failed. A saved round is never written twice.
    pub async fn retry_save(&self) -> Result<SessionView, AppError> {
        let (record, epoch) = {
            let mut state = self.state.lock().await;
            require_phase(&state, SessionPhase::ShowingFeedback, "save the round")?;
            let record = match &state.result {
                Some(result) if result.saved => return Ok(self.view_of(&state)),
                Some(result) => result.record.clone(),
                None => return Err(AppError::Conflict("nothing to save".to_string())),
            };
            if state.saving {
                return Err(AppError::Conflict("save already in progress".to_string()));
            }
            state.saving = true;
            (record, state.epoch)
        };

        let stored = self.services.store.insert(&record).await;

        let mut state = self.state.lock().await;
        state.saving = false;
        if !state.is_current(epoch, SessionPhase::ShowingFeedback) {
            return Err(session_gone());
        }
        match stored {
            Ok(_) => {
                if let Some(result) = state.result.as_mut() {
                    result.saved = true;
                }
                state.notice = None;
                info!("Session {}: round {} stored on retry", self.id, state.round);
            }
            Err(e) => {
                warn!("Session {}: retry save failed: {e}", self.id);
                state.notice = Some(Notice::persistence());
            }
        }
        Ok(self.view_of(&state))
    }

    /// Ends the session. Work still in flight will find the epoch changed and drop its result.
    pub async fn end(&self) -> SessionView {
        let feed = {
            let mut state = self.state.lock().await;
            if state.phase == SessionPhase::Ended {
                return self.view_of(&state);
            }
            state.phase = SessionPhase::Ended;
            state.epoch += 1;
            state.notice = None;
            state.feed.take()
        };
        if let Some(feed) = feed {
            feed.stop().await;
        }
        info!("Session {} ended", self.id);
        self.view().await
    }

    pub async fn view(&self) -> SessionView {
        let state = self.state.lock().await;
        self.view_of(&state)
    }

    fn build_record(
        &self,
        question: Question,
        answer: String,
        feedback: FeedbackRecord,
        answer_duration_secs: Option<i64>,
    ) -> NewInterview {
        let params = &self.settings.params;
        NewInterview {
            id: Uuid::new_v4(),
            user_id: self.owner.id.clone(),
            interview_type: params.interview_type,
            session_name: self.settings.session_name.clone(),
            topic: params.topic.clone(),
            difficulty: params.difficulty,
            resume_text: params.resume_text.clone(),
            question: question.text,
            answer,
            feedback,
            answer_duration_secs,
        }
    }

    fn view_of(&self, state: &SessionState) -> SessionView {
        let params = &self.settings.params;
        SessionView {
            id: self.id,
            session_name: self.settings.session_name.clone(),
            interview_type: params.interview_type,
            topic: params.topic.clone(),
            difficulty: params.difficulty,
            phase: state.phase,
            round: state.round,
            rounds_completed: state.rounds_completed,
            question: state.question.as_ref().map(|q| q.text.clone()),
            answer: state.answer.text().to_string(),
            answer_revision: state.answer.revision(),
            interim_transcript: state.answer.interim().map(str::to_string),
            transcribing: state.feed.is_some() || state.draining.is_some(),
            feedback: state.result.as_ref().map(|r| r.record.feedback.clone()),
            saved: state.result.as_ref().map(|r| r.saved),
            notice: state.notice.clone(),
        }
    }
}

/// Applies fragments to the answer of the round the feed was started in.
struct RoundSink {
    state: Arc<Mutex<SessionState>>,
    epoch: u64,
}

#[async_trait]
impl FragmentSink for RoundSink {
    async fn accept(&self, fragment: Fragment) {
        let mut state = self.state.lock().await;
        let open = matches!(
            state.phase,
            SessionPhase::AwaitingAnswer | SessionPhase::Submitting
        );
        if state.epoch != self.epoch || !open {
            debug!("Dropping fragment seq={} for a closed round", fragment.seq);
            return;
        }
        state.answer.apply(&fragment);
    }
}

fn require_phase(state: &SessionState, phase: SessionPhase, action: &str) -> Result<(), AppError> {
    if state.phase == SessionPhase::Ended {
        return Err(session_gone());
    }
    if state.phase != phase {
        return Err(AppError::Conflict(format!(
            "cannot {action} while the session is {:?}",
            state.phase
        )));
    }
    Ok(())
}

fn session_gone() -> AppError {
    AppError::Conflict("the session has ended".to_string())
}

fn empty_answer() -> AppError {
    AppError::InvalidInput("Please provide an answer before submitting.".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::notice::FailureKind;
    use crate::interview::questions::FALLBACK_QUESTION;
    use crate::models::interview::score_in_range;
    use crate::testing::{feedback_reply, question_reply, MemoryStore, ScriptedGenerator};
    use assert_matches::assert_matches;

    struct Harness {
        questions: Arc<ScriptedGenerator>,
        feedback: Arc<ScriptedGenerator>,
        store: Arc<MemoryStore>,
    }

    impl Harness {
        fn new(feedback: ScriptedGenerator) -> Self {
            Self {
                questions: Arc::new(ScriptedGenerator::always(&question_reply(
                    "When would you reach for useEffect?",
                ))),
                feedback: Arc::new(feedback),
                store: Arc::new(MemoryStore::default()),
            }
        }

        fn controller(&self, params: InterviewParameters) -> SessionController {
            let services = SessionServices {
                questions: QuestionService::new(self.questions.clone()),
                feedback: FeedbackService::new(self.feedback.clone()),
                store: self.store.clone(),
            };
            let settings = SessionSettings {
                session_name: "Google On-site Prep".to_string(),
                params,
                transcription_enabled: true,
            };
            SessionController::new(user(), settings, services)
        }
    }

    fn user() -> User {
        User {
            id: "user-1".to_string(),
            email: Some("ada@example.com".to_string()),
            display_name: None,
        }
    }

    fn react_hooks() -> InterviewParameters {
        InterviewParameters::new(
            InterviewType::Technical,
            Some("React Hooks".to_string()),
            Some(Difficulty::Medium),
            None,
        )
    }

    fn fin(seq: u64, text: &str) -> Fragment {
        Fragment {
            seq,
            text: text.to_string(),
            is_final: true,
        }
    }

    async fn wait_for_calls(generator: &ScriptedGenerator, n: usize) {
        while generator.calls() < n {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_full_round_persists_exactly_what_was_shown() {
        let harness = Harness::new(ScriptedGenerator::always(&feedback_reply(7.0)));
        let session = harness.controller(react_hooks());

        let view = session.begin_round().await.unwrap();
        assert_eq!(view.phase, SessionPhase::AwaitingAnswer);
        assert!(view.notice.is_none());
        let prompt = &harness.questions.prompts()[0];
        assert!(prompt.contains("Technical") && prompt.contains("React Hooks") && prompt.contains("Medium"));

        session
            .edit_answer("I would use useEffect.".to_string(), None)
            .await
            .unwrap();
        let shown = session.submit().await.unwrap();

        assert_eq!(shown.phase, SessionPhase::ShowingFeedback);
        assert_eq!(shown.saved, Some(true));
        let feedback = shown.feedback.clone().unwrap();
        assert!(score_in_range(feedback.overall_score));
        assert!(!feedback.strengths.is_empty());
        assert!(!feedback.areas_for_improvement.is_empty());

        let rows = harness.store.rows();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(Some(row.question.clone()), view.question);
        assert_eq!(row.answer, "I would use useEffect.");
        assert_eq!(row.topic.as_deref(), Some("React Hooks"));
        assert_eq!(row.difficulty.as_deref(), Some("Medium"));
        assert_eq!(row.session_name, "Google On-site Prep");
        assert_eq!(row.user_id, "user-1");
        assert_eq!(row.feedback, serde_json::to_value(&feedback).unwrap());
        assert!(row.answer_duration_secs.is_some());
    }

    #[tokio::test]
    async fn test_blank_answer_never_reaches_feedback_or_store() {
        let harness = Harness::new(ScriptedGenerator::always(&feedback_reply(7.0)));
        let session = harness.controller(react_hooks());
        session.begin_round().await.unwrap();

        session.edit_answer("   \n".to_string(), None).await.unwrap();
        let result = session.submit().await;

        assert_matches!(result, Err(AppError::InvalidInput(_)));
        assert_eq!(harness.feedback.calls(), 0);
        assert_eq!(harness.store.insert_attempts(), 0);
        assert_eq!(session.view().await.phase, SessionPhase::AwaitingAnswer);
    }

    #[tokio::test]
    async fn test_feedback_failure_keeps_answer_and_stores_nothing() {
        let harness = Harness::new(ScriptedGenerator::scripted(vec![
            None,
            Some(feedback_reply(6.0).as_str()),
        ]));
        let session = harness.controller(react_hooks());
        session.begin_round().await.unwrap();
        session
            .edit_answer("My carefully typed answer".to_string(), None)
            .await
            .unwrap();

        let failed = session.submit().await.unwrap();
        assert_eq!(failed.phase, SessionPhase::AwaitingAnswer);
        assert_eq!(failed.answer, "My carefully typed answer");
        assert_eq!(failed.notice.unwrap().kind, FailureKind::FeedbackFailure);
        assert_eq!(harness.store.insert_attempts(), 0);

        let retried = session.submit().await.unwrap();
        assert_eq!(retried.phase, SessionPhase::ShowingFeedback);
        assert_eq!(harness.store.rows().len(), 1);
    }

    #[tokio::test]
    async fn test_persistence_failure_shows_feedback_unsaved_then_retries_once() {
        let harness = Harness::new(ScriptedGenerator::always(&feedback_reply(8.0)));
        harness.store.set_fail_inserts(true);
        let session = harness.controller(react_hooks());
        session.begin_round().await.unwrap();
        session.edit_answer("An answer".to_string(), None).await.unwrap();

        let view = session.submit().await.unwrap();
        assert_eq!(view.phase, SessionPhase::ShowingFeedback);
        assert!(view.feedback.is_some());
        assert_eq!(view.saved, Some(false));
        assert_eq!(view.notice.unwrap().kind, FailureKind::PersistenceFailure);
        assert_eq!(view.rounds_completed, 1);
        assert!(harness.store.rows().is_empty());

        harness.store.set_fail_inserts(false);
        let view = session.retry_save().await.unwrap();
        assert_eq!(view.saved, Some(true));
        assert!(view.notice.is_none());

        session.retry_save().await.unwrap();
        assert_eq!(harness.store.rows().len(), 1);
        assert_eq!(harness.store.insert_attempts(), 2);
    }

    #[tokio::test]
    async fn test_question_fallback_still_awaits_answer() {
        let harness = Harness {
            questions: Arc::new(ScriptedGenerator::failing()),
            ..Harness::new(ScriptedGenerator::always(&feedback_reply(5.0)))
        };
        let session = harness.controller(react_hooks());

        let view = session.begin_round().await.unwrap();

        assert_eq!(view.phase, SessionPhase::AwaitingAnswer);
        assert_eq!(view.question.as_deref(), Some(FALLBACK_QUESTION));
        assert_eq!(view.notice.unwrap().kind, FailureKind::GenerationFailure);
    }

    #[tokio::test]
    async fn test_next_question_starts_clean_round() {
        let harness = Harness::new(ScriptedGenerator::always(&feedback_reply(9.0)));
        let session = harness.controller(react_hooks());
        session.begin_round().await.unwrap();
        session.edit_answer("First".to_string(), None).await.unwrap();
        session.submit().await.unwrap();

        let view = session.next_question().await.unwrap();

        assert_eq!(view.phase, SessionPhase::AwaitingAnswer);
        assert_eq!(view.round, 2);
        assert_eq!(view.answer, "");
        assert!(view.feedback.is_none());
        assert_eq!(harness.questions.calls(), 2);
        assert_eq!(harness.questions.prompts()[0], harness.questions.prompts()[1]);
    }

    #[tokio::test]
    async fn test_next_is_only_valid_from_feedback() {
        let harness = Harness::new(ScriptedGenerator::always(&feedback_reply(9.0)));
        let session = harness.controller(react_hooks());
        session.begin_round().await.unwrap();

        assert_matches!(session.next_question().await, Err(AppError::Conflict(_)));
        assert_matches!(session.begin_round().await, Err(AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_transcribed_text_survives_stop_and_submit() {
        let harness = Harness::new(ScriptedGenerator::always(&feedback_reply(7.0)));
        let session = harness.controller(react_hooks());
        session.begin_round().await.unwrap();

        session.edit_answer("Typed start.".to_string(), None).await.unwrap();
        session.start_transcription().await.unwrap();
        session.push_fragment(fin(1, "Spoken middle.")).await.unwrap();
        session.push_fragment(fin(1, "Spoken middle.")).await.unwrap();
        session.push_fragment(fin(2, "Spoken end.")).await.unwrap();

        let stopped = session.stop_transcription().await.unwrap();
        assert!(!stopped.transcribing);
        assert_eq!(stopped.answer, "Typed start. Spoken middle. Spoken end.");

        session.submit().await.unwrap();
        assert_eq!(harness.store.rows()[0].answer, stopped.answer);
    }

    #[tokio::test]
    async fn test_submit_drains_running_transcription_first() {
        let harness = Harness::new(ScriptedGenerator::always(&feedback_reply(7.0)));
        let session = harness.controller(react_hooks());
        session.begin_round().await.unwrap();

        session.start_transcription().await.unwrap();
        session.push_fragment(fin(1, "Only spoken words.")).await.unwrap();
        let view = session.submit().await.unwrap();

        assert!(!view.transcribing);
        assert_eq!(harness.store.rows()[0].answer, "Only spoken words.");
    }

    #[tokio::test]
    async fn test_transcription_disabled_is_media_failure() {
        let harness = Harness::new(ScriptedGenerator::always(&feedback_reply(7.0)));
        let services = SessionServices {
            questions: QuestionService::new(harness.questions.clone()),
            feedback: FeedbackService::new(harness.feedback.clone()),
            store: harness.store.clone(),
        };
        let settings = SessionSettings {
            session_name: "No mic".to_string(),
            params: react_hooks(),
            transcription_enabled: false,
        };
        let session = SessionController::new(user(), settings, services);
        session.begin_round().await.unwrap();

        assert_matches!(session.start_transcription().await, Err(AppError::MediaAccess(_)));
        assert_matches!(
            session.push_fragment(fin(1, "x")).await,
            Err(AppError::Conflict(_))
        );
    }

    #[tokio::test]
    async fn test_stale_edit_is_conflict() {
        let harness = Harness::new(ScriptedGenerator::always(&feedback_reply(7.0)));
        let session = harness.controller(react_hooks());
        let view = session.begin_round().await.unwrap();

        session
            .edit_answer("first".to_string(), Some(view.answer_revision))
            .await
            .unwrap();
        let stale = session
            .edit_answer("second".to_string(), Some(view.answer_revision))
            .await;

        assert_matches!(stale, Err(AppError::Conflict(_)));
        assert_eq!(session.view().await.answer, "first");
    }

    #[tokio::test]
    async fn test_duplicate_submit_is_blocked_while_submitting() {
        let (gated, gate) = ScriptedGenerator::gated(&feedback_reply(7.0));
        let harness = Harness::new(gated);
        let session = Arc::new(harness.controller(react_hooks()));
        session.begin_round().await.unwrap();
        session.edit_answer("answer".to_string(), None).await.unwrap();

        let first = tokio::spawn({
            let session = session.clone();
            async move { session.submit().await }
        });
        wait_for_calls(&harness.feedback, 1).await;

        assert_matches!(session.submit().await, Err(AppError::Conflict(_)));
        assert_eq!(session.view().await.phase, SessionPhase::Submitting);

        gate.notify_one();
        first.await.unwrap().unwrap();
        assert_eq!(harness.store.rows().len(), 1);
    }

    #[tokio::test]
    async fn test_feedback_arriving_after_end_is_ignored() {
        let (gated, gate) = ScriptedGenerator::gated(&feedback_reply(7.0));
        let harness = Harness::new(gated);
        let session = Arc::new(harness.controller(react_hooks()));
        session.begin_round().await.unwrap();
        session.edit_answer("answer".to_string(), None).await.unwrap();

        let pending = tokio::spawn({
            let session = session.clone();
            async move { session.submit().await }
        });
        wait_for_calls(&harness.feedback, 1).await;

        let ended = session.end().await;
        assert_eq!(ended.phase, SessionPhase::Ended);

        gate.notify_one();
        assert_matches!(pending.await.unwrap(), Err(AppError::Conflict(_)));
        assert_eq!(harness.store.insert_attempts(), 0);
        let view = session.view().await;
        assert_eq!(view.phase, SessionPhase::Ended);
        assert!(view.feedback.is_none());
    }

    #[tokio::test]
    async fn test_ended_session_rejects_everything() {
        let harness = Harness::new(ScriptedGenerator::always(&feedback_reply(7.0)));
        let session = harness.controller(react_hooks());
        session.begin_round().await.unwrap();
        session.end().await;

        assert_matches!(
            session.edit_answer("x".to_string(), None).await,
            Err(AppError::Conflict(_))
        );
        assert_matches!(session.submit().await, Err(AppError::Conflict(_)));
        assert_matches!(session.next_question().await, Err(AppError::Conflict(_)));
        assert_eq!(session.end().await.phase, SessionPhase::Ended);
        assert_eq!(harness.questions.calls(), 1);
    }

    #[tokio::test]
    async fn test_submit_racing_stop_keeps_every_spoken_fragment() {
        let harness = Harness::new(ScriptedGenerator::always(&feedback_reply(7.0)));
        let session = Arc::new(harness.controller(react_hooks()));
        session.begin_round().await.unwrap();
        session.edit_answer("Typed.".to_string(), None).await.unwrap();
        session.start_transcription().await.unwrap();
        for seq in 1..=500 {
            session.push_fragment(fin(seq, &format!("w{seq}"))).await.unwrap();
        }

        let stopping = tokio::spawn({
            let session = session.clone();
            async move { session.stop_transcription().await }
        });
        tokio::task::yield_now().await;
        let submitted = session.submit().await.unwrap();
        let stopped = stopping.await.unwrap().unwrap();

        assert_eq!(submitted.phase, SessionPhase::ShowingFeedback);
        let persisted = harness.store.rows()[0].answer.clone();
        assert_eq!(persisted.split_whitespace().count(), 501);
        assert!(persisted.starts_with("Typed. w1 "));
        assert!(persisted.ends_with(" w500"));
        assert_eq!(stopped.answer, persisted);
        assert!(!stopped.transcribing);
    }

    #[tokio::test]
    async fn test_restarted_transcription_keeps_second_take() {
        let harness = Harness::new(ScriptedGenerator::always(&feedback_reply(7.0)));
        let session = harness.controller(react_hooks());
        session.begin_round().await.unwrap();

        session.start_transcription().await.unwrap();
        session.push_fragment(fin(1, "First take.")).await.unwrap();
        session.stop_transcription().await.unwrap();
        session.start_transcription().await.unwrap();
        session.push_fragment(fin(1, "Second take.")).await.unwrap();
        let view = session.stop_transcription().await.unwrap();

        assert_eq!(view.answer, "First take. Second take.");
    }

    #[tokio::test]
    async fn test_blank_submit_leaves_transcription_running() {
        let harness = Harness::new(ScriptedGenerator::always(&feedback_reply(7.0)));
        let session = harness.controller(react_hooks());
        session.begin_round().await.unwrap();
        session.start_transcription().await.unwrap();

        assert_matches!(session.submit().await, Err(AppError::InvalidInput(_)));
        let view = session.view().await;
        assert_eq!(view.phase, SessionPhase::AwaitingAnswer);
        assert!(view.transcribing);
        assert_eq!(harness.feedback.calls(), 0);

        session.push_fragment(fin(5, "Now I speak.")).await.unwrap();
        session.submit().await.unwrap();
        assert_eq!(harness.store.rows()[0].answer, "Now I speak.");
    }
}

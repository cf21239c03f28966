use crate::context::SessionContext;
use crate::error::InterviewError;
use crate::interview::{AnswerSet, QuestionList, RecordId, SessionConfig, SessionRecord};
use crate::question_source::QuestionSource;
use crate::store::InterviewStore;
use chrono::Utc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterviewState {
    /// Configuration is still editable.
    Inactive,
    /// Questions are being delivered and answered.
    Active,
    /// Terminal. A record has been assembled.
    Finished,
}

impl InterviewState {
    fn name(self) -> &'static str {
        match self {
            InterviewState::Inactive => "inactive",
            InterviewState::Active => "active",
            InterviewState::Finished => "finished",
        }
    }
}

/// Position inside the per-question sub-cycle while `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    /// The current question is being delivered.
    Speaking,
    /// Delivery finished; waiting for the answer.
    Listening,
}

/// Outcome of handing a capture to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Moved on to the question at this index.
    Next(usize),
    /// That was the last question; the session is now finished.
    Finished,
    /// The session had already finished and the capture was dropped.
    Discarded,
}

/// One run of the interview, from configuration to `Finished`.
///
/// A finished session cannot be restarted; create a new one instead.
pub struct InterviewSession {
    context: SessionContext,
    config: SessionConfig,
    state: InterviewState,
    turn: Turn,
    questions: QuestionList,
    answers: AnswerSet,
    current_question_idx: usize,
    record: Option<SessionRecord>,
    saved_id: Option<RecordId>,
    save_attempts: u32,
}

impl InterviewSession {
    pub fn new(context: SessionContext, config: SessionConfig) -> Self {
        Self {
            context,
            config,
            state: InterviewState::Inactive,
            turn: Turn::Speaking,
            questions: QuestionList::default(),
            answers: AnswerSet::default(),
            current_question_idx: 0,
            record: None,
            saved_id: None,
            save_attempts: 0,
        }
    }

    pub fn state(&self) -> InterviewState {
        self.state
    }

    pub fn turn(&self) -> Turn {
        self.turn
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Mutable access to the configuration, only before the session starts.
    pub fn config_mut(&mut self) -> Option<&mut SessionConfig> {
        match self.state {
            InterviewState::Inactive => Some(&mut self.config),
            _ => None,
        }
    }

    pub fn questions(&self) -> &QuestionList {
        &self.questions
    }

    pub fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    pub fn current_index(&self) -> usize {
        self.current_question_idx
    }

    /// The question awaiting delivery or an answer, if the session is active.
    pub fn current_question(&self) -> Option<&str> {
        match self.state {
            InterviewState::Active => self.questions.get(self.current_question_idx),
            _ => None,
        }
    }

    /// The assembled record, once finished.
    pub fn record(&self) -> Option<&SessionRecord> {
        self.record.as_ref()
    }

    pub fn saved_id(&self) -> Option<RecordId> {
        self.saved_id
    }

    pub fn save_attempts(&self) -> u32 {
        self.save_attempts
    }

    fn invalid(&self, action: &'static str) -> InterviewError {
        InterviewError::InvalidTransition {
            action,
            state: self.state.name(),
        }
    }

    /// Starts the session and fetches its questions.
    ///
    /// An invalid config leaves the session `Inactive`. Otherwise the session
    /// becomes `Active` even when the source fails or returns nothing; in that
    /// case the question list is empty, `SourceUnavailable` is returned, and the
    /// session can only be ended.
    pub async fn start<Q: QuestionSource + ?Sized>(
        &mut self,
        source: &Q,
    ) -> Result<usize, InterviewError> {
        if self.state != InterviewState::Inactive {
            return Err(self.invalid("start"));
        }
        self.config = self.config.clone().validated()?;

        self.state = InterviewState::Active;
        self.turn = Turn::Speaking;
        self.current_question_idx = 0;
        self.answers = AnswerSet::default();
        self.questions = QuestionList::default();
        tracing::info!(
            "Interview started for '{}' ({} {}, {} questions)",
            self.config.role,
            self.config.level,
            self.config.interview_type,
            self.config.question_count
        );

        match source.generate(&self.config).await {
            Ok(questions) if !questions.is_empty() => {
                let count = questions.len();
                self.questions = QuestionList::new(questions);
                tracing::info!("Received {} questions", count);
                Ok(count)
            }
            Ok(_) => {
                tracing::warn!("Question source returned no questions");
                Err(InterviewError::SourceUnavailable(
                    "the question source returned no questions".to_string(),
                ))
            }
            Err(e) => {
                tracing::error!("Question source failed: {:#}", e);
                Err(InterviewError::SourceUnavailable(format!("{e:#}")))
            }
        }
    }

    /// Signals that the current question has been delivered (spoken or shown).
    ///
    /// Listening may only begin after this.
    pub fn question_delivered(&mut self) -> Result<(), InterviewError> {
        if self.state != InterviewState::Active
            || self.turn != Turn::Speaking
            || self.current_question().is_none()
        {
            return Err(self.invalid("mark a question delivered"));
        }
        self.turn = Turn::Listening;
        Ok(())
    }

    /// Records the answer to the current question and advances.
    ///
    /// `None` or a blank transcript means no answer was captured; the index
    /// stays absent and the session still advances. Captures arriving after
    /// the session finished are dropped.
    pub fn capture(&mut self, transcript: Option<String>) -> Result<Progress, InterviewError> {
        match (self.state, self.turn) {
            (InterviewState::Finished, _) => {
                tracing::debug!("Discarding capture received after the interview finished");
                return Ok(Progress::Discarded);
            }
            (InterviewState::Active, Turn::Listening) => {}
            _ => return Err(self.invalid("capture an answer")),
        }

        let index = self.current_question_idx;
        match transcript.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
            Some(answer) => {
                tracing::debug!("Captured answer for question {} ({} chars)", index + 1, answer.len());
                self.answers.record(index, answer);
            }
            None => tracing::warn!("No answer captured for question {}", index + 1),
        }

        if index + 1 < self.questions.len() {
            self.current_question_idx += 1;
            self.turn = Turn::Speaking;
            Ok(Progress::Next(self.current_question_idx))
        } else {
            self.finish();
            Ok(Progress::Finished)
        }
    }

    /// Ends the session now, whatever question it is on.
    ///
    /// Unanswered questions stay absent. Ending an already finished session
    /// returns the existing record.
    pub fn end(&mut self) -> Result<&SessionRecord, InterviewError> {
        match self.state {
            InterviewState::Inactive => return Err(self.invalid("end")),
            InterviewState::Active => {
                tracing::info!(
                    "Interview ended early at question {} of {}",
                    self.current_question_idx + 1,
                    self.questions.len()
                );
                self.finish();
            }
            InterviewState::Finished => {}
        }
        self.record.as_ref().ok_or_else(|| self.invalid("end"))
    }

    fn finish(&mut self) {
        let record = SessionRecord {
            owner: self.context.owner.clone(),
            role: self.config.role.clone(),
            level: self.config.level.clone(),
            interview_type: self.config.interview_type,
            tech_stack: self.config.tech_stack.clone(),
            questions: self.questions.as_slice().to_vec(),
            answers: self.answers.aligned(self.questions.len()),
            created_at: Utc::now(),
        };
        tracing::info!(
            "Interview finished with {} of {} questions answered",
            self.answers.len(),
            self.questions.len()
        );
        self.record = Some(record);
        self.state = InterviewState::Finished;
    }

    /// Hands the finished record to the store.
    ///
    /// Once a save succeeds later calls return the stored id without touching
    /// the store. A failed save leaves the session `Finished`; calling this
    /// again is the user-initiated retry.
    pub async fn persist<S: InterviewStore + ?Sized>(
        &mut self,
        store: &S,
    ) -> Result<RecordId, InterviewError> {
        if let Some(id) = self.saved_id {
            return Ok(id);
        }
        let record = match (&self.state, &self.record) {
            (InterviewState::Finished, Some(record)) => record.clone(),
            _ => return Err(self.invalid("save")),
        };

        self.save_attempts += 1;
        match store.save(&self.context, record).await {
            Ok(stored) => {
                tracing::info!("Interview saved as {}", stored.id);
                self.saved_id = Some(stored.id);
                Ok(stored.id)
            }
            Err(e) => {
                tracing::error!("Failed to save interview: {}", e);
                Err(e.into())
            }
        }
    }
}

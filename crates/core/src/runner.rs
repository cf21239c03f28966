//! Drives an [`InterviewSession`] through the speak, listen, record and advance
//! cycle for every question, then saves the result once.

use crate::Command;
use crate::error::InterviewError;
use crate::interview::RecordId;
use crate::question_source::QuestionSource;
use crate::session_state::{InterviewSession, InterviewState, Progress};
use crate::speech::{Listener, SpeechError, SpeechInput, SpeechOutput};
use crate::store::InterviewStore;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, mpsc};

pub const DEFAULT_LISTEN_TIMEOUT: Duration = Duration::from_secs(60);

/// The user's "end interview now" action.
///
/// Can be requested from any task; the runner observes it between and during
/// steps of the sub-cycle.
#[derive(Default)]
pub struct EndSignal {
    requested: AtomicBool,
    notify: Notify,
}

impl EndSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.requested.store(false, Ordering::SeqCst);
    }

    /// Resolves once [`EndSignal::request`] has been called.
    pub async fn wait(&self) {
        loop {
            // Registered before the flag check so a concurrent request is not lost.
            let notified = self.notify.notified();
            if self.is_requested() {
                return;
            }
            notified.await;
        }
    }
}

pub struct InterviewRunner {
    output: SpeechOutput,
    input: SpeechInput,
    fallback: Option<Box<dyn Listener>>,
    end: Arc<EndSignal>,
    commands: Option<mpsc::Sender<Command>>,
    listen_timeout: Duration,
}

impl InterviewRunner {
    pub fn new(output: SpeechOutput, input: SpeechInput) -> Self {
        Self {
            output,
            input,
            fallback: None,
            end: Arc::new(EndSignal::new()),
            commands: None,
            listen_timeout: DEFAULT_LISTEN_TIMEOUT,
        }
    }

    /// Manual answer entry used when speech capture is unavailable or fails.
    pub fn with_fallback(mut self, listener: Box<dyn Listener>) -> Self {
        self.fallback = Some(listener);
        self
    }

    pub fn with_commands(mut self, commands: mpsc::Sender<Command>) -> Self {
        self.commands = Some(commands);
        self
    }

    pub fn with_listen_timeout(mut self, timeout: Duration) -> Self {
        self.listen_timeout = timeout;
        self
    }

    pub fn with_end_signal(mut self, end: Arc<EndSignal>) -> Self {
        self.end = end;
        self
    }

    pub fn end_signal(&self) -> Arc<EndSignal> {
        self.end.clone()
    }

    async fn emit(&self, command: Command) {
        if let Some(tx) = &self.commands {
            if let Err(e) = tx.send(command).await {
                tracing::warn!("Failed to send command to the front end: {:?}", e);
            }
        }
    }

    async fn notice(&self, message: String) {
        tracing::warn!("{}", message);
        self.emit(Command::Notice(message)).await;
    }

    /// Runs the session to `Finished` and saves the record.
    ///
    /// Returns the stored id. A failed save is returned as
    /// [`InterviewError::PersistenceFailed`] with the session left `Finished`,
    /// so the caller can retry with [`InterviewSession::persist`].
    pub async fn run<Q, S>(
        &self,
        session: &mut InterviewSession,
        source: &Q,
        store: &S,
    ) -> Result<RecordId, InterviewError>
    where
        Q: QuestionSource + ?Sized,
        S: InterviewStore + ?Sized,
    {
        self.end.reset();

        match session.start(source).await {
            Ok(_) => {}
            Err(e @ InterviewError::SourceUnavailable(_)) => self.notice(e.to_string()).await,
            Err(e) => return Err(e),
        }

        if !self.output.is_available() {
            self.notice(format!("{}; questions will be shown as text", InterviewError::SpeechUnsupported))
                .await;
        }
        if !self.input.is_available() {
            self.notice(format!("{}; answers will be typed", InterviewError::SpeechUnsupported))
                .await;
        }

        while session.state() == InterviewState::Active {
            let Some(question) = session.current_question().map(str::to_string) else {
                session.end()?;
                break;
            };
            let index = session.current_index();
            let total = session.questions().len();

            let delivered = tokio::select! {
                biased;
                _ = self.end.wait() => false,
                _ = self.deliver(index, total, &question) => true,
            };
            if !delivered {
                session.end()?;
                break;
            }
            session.question_delivered()?;

            let heard = tokio::select! {
                biased;
                _ = self.end.wait() => None,
                transcript = self.capture_answer(index) => Some(transcript),
            };
            let Some(transcript) = heard else {
                session.end()?;
                break;
            };

            let progress = session.capture(transcript)?;
            self.emit(Command::AnswerCaptured {
                index,
                answer: session.answers().get(index).map(str::to_string),
            })
            .await;
            if progress == Progress::Finished {
                break;
            }
            if self.end.is_requested() {
                session.end()?;
            }
        }

        let answered = session.answers().len();
        let total = session.questions().len();
        self.emit(Command::SessionComplete(format!(
            "Interview complete: {answered} of {total} questions answered."
        )))
        .await;

        match session.persist(store).await {
            Ok(id) => Ok(id),
            Err(e) => {
                self.notice(format!("{e}. The interview can be saved again."))
                    .await;
                Err(e)
            }
        }
    }

    /// Shows the question and speaks it when output is available.
    ///
    /// Returns only after playback has finished so listening never overlaps it.
    async fn deliver(&self, index: usize, total: usize, question: &str) {
        self.emit(Command::ShowQuestion {
            index,
            total,
            text: question.to_string(),
        })
        .await;

        if !self.output.is_available() {
            return;
        }
        self.emit(Command::SpeakText(question.to_string())).await;
        if let Err(e) = self.output.speak(question).await {
            self.notice(format!(
                "Could not speak question {}: {}; it is shown as text",
                index + 1,
                e
            ))
            .await;
        }
    }

    /// Listens for an answer. Any failure becomes "no answer" after trying the
    /// manual fallback.
    async fn capture_answer(&self, index: usize) -> Option<String> {
        if self.input.is_available() {
            let result = match tokio::time::timeout(self.listen_timeout, self.input.listen()).await {
                Ok(result) => result,
                Err(_) => Err(SpeechError::TimedOut),
            };
            match result {
                Ok(transcript) => return transcript,
                Err(e) => {
                    let err = InterviewError::CaptureFailed {
                        index: index + 1,
                        reason: e.to_string(),
                    };
                    self.notice(err.to_string()).await;
                }
            }
        }

        let fallback = self.fallback.as_ref()?;
        match fallback.listen().await {
            Ok(transcript) => transcript,
            Err(e) => {
                tracing::warn!("Manual entry failed for question {}: {}", index + 1, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SessionContext;
    use crate::interview::{InterviewType, Level, SessionConfig};
    use crate::question_source::MockQuestionSource;
    use crate::speech::{MockListener, MockSpeaker};
    use crate::store::{InterviewStore, MemoryStore, MockInterviewStore};
    use crate::error::StoreError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn session(count: u8) -> InterviewSession {
        InterviewSession::new(
            SessionContext::new("alice"),
            SessionConfig {
                role: "Frontend Developer".to_string(),
                level: Level::Junior,
                interview_type: InterviewType::Technical,
                tech_stack: vec!["React".to_string()],
                question_count: count,
            },
        )
    }

    fn source(questions: &[&str]) -> MockQuestionSource {
        let questions: Vec<String> = questions.iter().map(|q| q.to_string()).collect();
        let mut source = MockQuestionSource::new();
        source
            .expect_generate()
            .returning(move |_| Ok(questions.clone()));
        source
    }

    fn speaker() -> MockSpeaker {
        let mut speaker = MockSpeaker::new();
        speaker.expect_speak().returning(|_| Ok(()));
        speaker
    }

    /// Replies with a fixed script of transcripts, one per call.
    fn listener(script: Vec<Result<Option<&'static str>, SpeechError>>) -> MockListener {
        let script = Mutex::new(VecDeque::from(script));
        let mut listener = MockListener::new();
        listener.expect_listen().returning(move || {
            script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(None))
                .map(|t| t.map(str::to_string))
        });
        listener
    }

    struct SilentListener;

    #[async_trait]
    impl Listener for SilentListener {
        async fn listen(&self) -> Result<Option<String>, SpeechError> {
            std::future::pending().await
        }
    }

    fn drain(rx: &mut mpsc::Receiver<Command>) -> Vec<Command> {
        let mut out = vec![];
        while let Ok(command) = rx.try_recv() {
            out.push(command);
        }
        out
    }

    #[tokio::test]
    async fn speaks_listens_and_saves_every_answer() {
        let (tx, mut rx) = mpsc::channel(64);
        let mut speaker = MockSpeaker::new();
        speaker.expect_speak().returning(|_| Ok(())).times(2);
        let runner = InterviewRunner::new(
            SpeechOutput::Available(Box::new(speaker)),
            SpeechInput::Available(Box::new(listener(vec![
                Ok(Some("Syntax sugar for createElement")),
                Ok(Some("A hook for local state")),
            ]))),
        )
        .with_commands(tx);
        let store = MemoryStore::new();
        let mut session = session(2);

        let id = runner
            .run(&mut session, &source(&["What is JSX?", "Explain useState."]), &store)
            .await
            .unwrap();

        let stored = store.fetch(session.context(), id).await.unwrap();
        assert_eq!(stored.session.questions.len(), 2);
        assert_eq!(
            stored.session.answers,
            vec![
                Some("Syntax sugar for createElement".to_string()),
                Some("A hook for local state".to_string())
            ]
        );

        let commands = drain(&mut rx);
        assert_eq!(
            commands[0],
            Command::ShowQuestion {
                index: 0,
                total: 2,
                text: "What is JSX?".to_string()
            }
        );
        assert_eq!(commands[1], Command::SpeakText("What is JSX?".to_string()));
        assert!(matches!(
            commands.last(),
            Some(Command::SessionComplete(msg)) if msg.contains("2 of 2")
        ));
    }

    #[tokio::test]
    async fn without_speech_output_questions_are_shown_as_text() {
        let (tx, mut rx) = mpsc::channel(64);
        let runner = InterviewRunner::new(
            SpeechOutput::Unavailable,
            SpeechInput::Available(Box::new(listener(vec![Ok(Some("answer"))]))),
        )
        .with_commands(tx);
        let mut session = session(1);

        runner
            .run(&mut session, &source(&["Q1"]), &MemoryStore::new())
            .await
            .unwrap();

        let commands = drain(&mut rx);
        assert!(commands.iter().any(|c| matches!(c, Command::ShowQuestion { index: 0, .. })));
        assert!(!commands.iter().any(|c| matches!(c, Command::SpeakText(_))));
        assert_eq!(session.record().unwrap().answers, vec![Some("answer".to_string())]);
    }

    #[tokio::test]
    async fn failed_capture_uses_manual_fallback() {
        let runner = InterviewRunner::new(
            SpeechOutput::Available(Box::new(speaker())),
            SpeechInput::Available(Box::new(listener(vec![
                Err(SpeechError::Failed("microphone denied".to_string())),
                Ok(Some("spoken")),
            ]))),
        )
        .with_fallback(Box::new(listener(vec![Ok(Some("typed"))])));
        let mut session = session(2);

        runner
            .run(&mut session, &source(&["Q1", "Q2"]), &MemoryStore::new())
            .await
            .unwrap();

        assert_eq!(
            session.record().unwrap().answers,
            vec![Some("typed".to_string()), Some("spoken".to_string())]
        );
    }

    #[tokio::test]
    async fn failed_capture_without_fallback_records_no_answer() {
        let (tx, mut rx) = mpsc::channel(64);
        let runner = InterviewRunner::new(
            SpeechOutput::Available(Box::new(speaker())),
            SpeechInput::Available(Box::new(listener(vec![
                Err(SpeechError::Failed("no device".to_string())),
                Ok(Some("second")),
            ]))),
        )
        .with_commands(tx);
        let mut session = session(2);

        runner
            .run(&mut session, &source(&["Q1", "Q2"]), &MemoryStore::new())
            .await
            .unwrap();

        assert_eq!(
            session.record().unwrap().answers,
            vec![None, Some("second".to_string())]
        );
        let commands = drain(&mut rx);
        assert!(commands.iter().any(|c| matches!(c, Command::Notice(msg) if msg.contains("question 1"))));
        assert!(commands.contains(&Command::AnswerCaptured { index: 0, answer: None }));
    }

    #[tokio::test]
    async fn listen_timeout_counts_as_no_answer() {
        let runner = InterviewRunner::new(
            SpeechOutput::Unavailable,
            SpeechInput::Available(Box::new(SilentListener)),
        )
        .with_listen_timeout(Duration::from_millis(10));
        let mut session = session(1);

        runner
            .run(&mut session, &source(&["Q1"]), &MemoryStore::new())
            .await
            .unwrap();

        assert_eq!(session.record().unwrap().answers, vec![None]);
    }

    struct SlowSpeaker {
        speaking: Arc<AtomicBool>,
    }

    #[async_trait]
    impl crate::speech::Speaker for SlowSpeaker {
        async fn speak(&self, _text: &str) -> Result<(), SpeechError> {
            self.speaking.store(true, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.speaking.store(false, Ordering::SeqCst);
            Ok(())
        }
    }

    struct QuietRoomListener {
        speaking: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Listener for QuietRoomListener {
        async fn listen(&self) -> Result<Option<String>, SpeechError> {
            assert!(
                !self.speaking.load(Ordering::SeqCst),
                "listening started while the question was still playing"
            );
            Ok(Some("a".to_string()))
        }
    }

    #[tokio::test]
    async fn listening_waits_for_playback_to_finish() {
        let speaking = Arc::new(AtomicBool::new(false));
        let runner = InterviewRunner::new(
            SpeechOutput::Available(Box::new(SlowSpeaker {
                speaking: speaking.clone(),
            })),
            SpeechInput::Available(Box::new(QuietRoomListener { speaking })),
        );
        let mut session = session(2);

        runner
            .run(&mut session, &source(&["Q1", "Q2"]), &MemoryStore::new())
            .await
            .unwrap();

        assert_eq!(
            session.record().unwrap().answers,
            vec![Some("a".to_string()), Some("a".to_string())]
        );
    }

    #[tokio::test]
    async fn end_signal_stops_after_current_question() {
        let end = Arc::new(EndSignal::new());
        let end_in_speaker = end.clone();
        let mut speaker = MockSpeaker::new();
        speaker.expect_speak().returning(move |text| {
            if text == "Q2" {
                end_in_speaker.request();
            }
            Ok(())
        });
        let mut input = MockListener::new();
        input
            .expect_listen()
            .returning(|| Ok(Some("first".to_string())))
            .times(1);

        let runner = InterviewRunner::new(
            SpeechOutput::Available(Box::new(speaker)),
            SpeechInput::Available(Box::new(input)),
        )
        .with_end_signal(end);
        let mut session = session(3);

        runner
            .run(&mut session, &source(&["Q1", "Q2", "Q3"]), &MemoryStore::new())
            .await
            .unwrap();

        let record = session.record().unwrap();
        assert_eq!(record.questions.len(), 3);
        assert_eq!(record.answers, vec![Some("first".to_string()), None, None]);
    }

    #[tokio::test]
    async fn end_signal_interrupts_a_silent_listener() {
        let runner = InterviewRunner::new(
            SpeechOutput::Unavailable,
            SpeechInput::Available(Box::new(SilentListener)),
        );
        let end = runner.end_signal();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            end.request();
        });
        let mut session = session(2);

        runner
            .run(&mut session, &source(&["Q1", "Q2"]), &MemoryStore::new())
            .await
            .unwrap();

        assert_eq!(session.state(), InterviewState::Finished);
        assert_eq!(session.record().unwrap().answers, vec![None, None]);
    }

    #[tokio::test]
    async fn source_failure_finishes_with_empty_record() {
        let (tx, mut rx) = mpsc::channel(64);
        let mut failing = MockQuestionSource::new();
        failing
            .expect_generate()
            .returning(|_| Err(anyhow::anyhow!("quota exceeded")));
        let mut input = MockListener::new();
        input.expect_listen().never();
        let runner = InterviewRunner::new(
            SpeechOutput::Unavailable,
            SpeechInput::Available(Box::new(input)),
        )
        .with_commands(tx);
        let store = MemoryStore::new();
        let mut session = session(2);

        let id = runner.run(&mut session, &failing, &store).await.unwrap();

        let stored = store.fetch(session.context(), id).await.unwrap();
        assert!(stored.session.questions.is_empty());
        assert!(stored.session.answers.is_empty());
        let commands = drain(&mut rx);
        assert!(commands.iter().any(|c| matches!(c, Command::Notice(msg) if msg.contains("quota"))));
    }

    #[tokio::test]
    async fn save_failure_is_reported_and_retryable() {
        let runner = InterviewRunner::new(
            SpeechOutput::Unavailable,
            SpeechInput::Available(Box::new(listener(vec![Ok(Some("a1"))]))),
        );
        let mut failing = MockInterviewStore::new();
        failing
            .expect_save()
            .returning(|_, _| Err(StoreError::Io(std::io::Error::other("read-only"))))
            .times(1);
        let mut session = session(1);

        let result = runner.run(&mut session, &source(&["Q1"]), &failing).await;

        assert!(matches!(result, Err(InterviewError::PersistenceFailed(_))));
        assert_eq!(session.state(), InterviewState::Finished);

        let store = MemoryStore::new();
        let id = session.persist(&store).await.unwrap();
        let stored = store.fetch(session.context(), id).await.unwrap();
        assert_eq!(stored.session.answers, vec![Some("a1".to_string())]);
    }
}

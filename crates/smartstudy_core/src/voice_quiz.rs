//! crates/smartstudy_core/src/voice_quiz.rs
//!
//! Voice quiz support: parsing question/answer pairs out of a completion, and
//! the spoken answer loop that asks, listens, grades and gives feedback.
//!
//! The loop is split in two. `VoiceQuizSession` is a plain state machine with
//! no I/O. `run_voice_quiz` drives one session against the synthesis port, an
//! answer channel and an event channel, and can be stopped at any point with a
//! `CancellationToken`.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::domain::{SpeechOptions, SynthesizedSpeech, VoiceQuizQuestion};
use crate::ports::{PortError, PortResult, SpeechSynthesisService};

const QUESTION_MARKER: &str = "Question:";
const ANSWER_MARKER: &str = "Answer:";

/// Spoken once the last question has been graded.
pub const COMPLETION_PHRASE: &str = "Quiz completed! Great job!";

/// Pause between finishing a question and starting to listen for the answer.
pub const DEFAULT_DEAD_TIME: Duration = Duration::from_millis(2000);

//=========================================================================================
// Parsing
//=========================================================================================

/// Parses `Question: ... Answer: ...` pairs from loosely formatted text.
///
/// A `Question:` line opens a new record, flushing the previous one. An
/// `Answer:` marker on the same line, or a following line starting with
/// `Answer:`, fills in the open record's answer. A question that never gets an
/// answer keeps an empty one.
pub fn parse_quiz_questions(content: &str) -> Vec<VoiceQuizQuestion> {
    let mut questions = Vec::new();
    let mut current: Option<VoiceQuizQuestion> = None;

    for line in content.lines() {
        let line = line.trim_start();
        if let Some(rest) = line.strip_prefix(QUESTION_MARKER) {
            questions.extend(current.take());
            let (question, answer) = match rest.find(ANSWER_MARKER) {
                Some(at) => (rest[..at].trim(), rest[at + ANSWER_MARKER.len()..].trim()),
                None => (rest.trim(), ""),
            };
            current = Some(VoiceQuizQuestion {
                question: question.to_string(),
                answer: answer.to_string(),
            });
        } else if let Some(rest) = line.strip_prefix(ANSWER_MARKER) {
            if let Some(open) = current.as_mut() {
                open.answer = rest.trim().to_string();
            }
        }
    }

    questions.extend(current);
    questions
}

//=========================================================================================
// Answer Loop State Machine
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceQuizState {
    Idle,
    AskingQuestion(usize),
    AwaitingAnswer(usize),
    Grading(usize),
    Done,
}

/// The outcome of grading one spoken answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradedAnswer {
    pub index: usize,
    pub correct: bool,
    pub feedback: String,
}

/// Case-insensitive containment of the expected answer in what was heard.
pub fn is_correct_answer(recognized: &str, expected: &str) -> bool {
    recognized
        .to_lowercase()
        .contains(&expected.to_lowercase())
}

pub struct VoiceQuizSession {
    questions: Vec<VoiceQuizQuestion>,
    state: VoiceQuizState,
    correct: usize,
}

impl VoiceQuizSession {
    pub fn new(questions: Vec<VoiceQuizQuestion>) -> Self {
        Self {
            questions,
            state: VoiceQuizState::Idle,
            correct: 0,
        }
    }

    pub fn state(&self) -> VoiceQuizState {
        self.state
    }

    pub fn questions(&self) -> &[VoiceQuizQuestion] {
        &self.questions
    }

    pub fn correct_count(&self) -> usize {
        self.correct
    }

    /// Resets the cursor to the first question and returns its spoken prompt.
    pub fn start(&mut self) -> PortResult<String> {
        if self.questions.is_empty() {
            return Err(PortError::Validation(
                "No quiz available. Please generate a quiz first.".to_string(),
            ));
        }
        self.correct = 0;
        self.state = VoiceQuizState::AskingQuestion(0);
        Ok(self.prompt(0))
    }

    /// Marks the current question as spoken; the session now waits for an answer.
    pub fn question_spoken(&mut self) -> PortResult<()> {
        match self.state {
            VoiceQuizState::AskingQuestion(i) => {
                self.state = VoiceQuizState::AwaitingAnswer(i);
                Ok(())
            }
            other => Err(unexpected_transition("question_spoken", other)),
        }
    }

    /// Grades the recognized text against the current question.
    pub fn submit_answer(&mut self, recognized: &str) -> PortResult<GradedAnswer> {
        let index = match self.state {
            VoiceQuizState::AwaitingAnswer(i) => i,
            other => return Err(unexpected_transition("submit_answer", other)),
        };
        self.state = VoiceQuizState::Grading(index);

        let expected = &self.questions[index].answer;
        let correct = is_correct_answer(recognized, expected);
        if correct {
            self.correct += 1;
        }
        let feedback = if correct {
            format!("Correct! The answer is {}", expected)
        } else {
            format!("Incorrect. The correct answer is {}", expected)
        };

        Ok(GradedAnswer {
            index,
            correct,
            feedback,
        })
    }

    /// Moves past a graded question. Returns the next prompt, or `None` once
    /// every question has been asked.
    pub fn advance(&mut self) -> PortResult<Option<String>> {
        let index = match self.state {
            VoiceQuizState::Grading(i) => i,
            other => return Err(unexpected_transition("advance", other)),
        };
        let next = index + 1;
        if next < self.questions.len() {
            self.state = VoiceQuizState::AskingQuestion(next);
            Ok(Some(self.prompt(next)))
        } else {
            self.state = VoiceQuizState::Done;
            Ok(None)
        }
    }

    /// Abandons the quiz from any state.
    pub fn stop(&mut self) {
        self.state = VoiceQuizState::Idle;
    }

    fn prompt(&self, index: usize) -> String {
        format!("Question {}: {}", index + 1, self.questions[index].question)
    }
}

fn unexpected_transition(action: &str, state: VoiceQuizState) -> PortError {
    PortError::Validation(format!("Cannot {} while quiz is {:?}", action, state))
}

//=========================================================================================
// Async Driver
//=========================================================================================

/// What the driver reports while running a session.
#[derive(Debug, Clone)]
pub enum VoiceQuizEvent {
    /// Text was spoken. `audio` is `None` when synthesis failed; the quiz goes on.
    Spoken {
        text: String,
        audio: Option<SynthesizedSpeech>,
    },
    Listening { index: usize },
    Graded(GradedAnswer),
    Completed { correct: usize, total: usize },
    Stopped,
}

/// Timing and voice for `run_voice_quiz`.
#[derive(Debug, Clone)]
pub struct VoiceQuizRunOptions {
    pub dead_time: Duration,
    pub speech: SpeechOptions,
}

impl Default for VoiceQuizRunOptions {
    fn default() -> Self {
        Self {
            dead_time: DEFAULT_DEAD_TIME,
            speech: SpeechOptions::default(),
        }
    }
}

/// Signals that the run ended early, either through the token or a closed channel.
struct Halted;

/// Runs a session to completion, or until `cancel` fires.
///
/// Answers are read from `answers`; a closed answer channel or a dropped event
/// receiver stops the quiz the same way as the token. Returns the final state,
/// which is `Done` or `Idle`.
pub async fn run_voice_quiz(
    session: &mut VoiceQuizSession,
    speech: &dyn SpeechSynthesisService,
    answers: &mut mpsc::Receiver<String>,
    events: &mpsc::Sender<VoiceQuizEvent>,
    options: &VoiceQuizRunOptions,
    cancel: &CancellationToken,
) -> PortResult<VoiceQuizState> {
    let mut prompt = session.start()?;
    info!("Voice quiz started with {} questions", session.questions().len());

    let outcome: Result<(), Halted> = async {
        loop {
            speak(speech, &prompt, options, events, cancel).await?;
            session
                .question_spoken()
                .map_err(|_| Halted)?;

            tokio::select! {
                _ = cancel.cancelled() => return Err(Halted),
                _ = tokio::time::sleep(options.dead_time) => {}
            }

            let index = match session.state() {
                VoiceQuizState::AwaitingAnswer(i) => i,
                _ => return Err(Halted),
            };
            emit(events, VoiceQuizEvent::Listening { index }).await?;

            let answer = tokio::select! {
                _ = cancel.cancelled() => return Err(Halted),
                answer = answers.recv() => answer.ok_or(Halted)?,
            };

            let graded = session.submit_answer(&answer).map_err(|_| Halted)?;
            let feedback = graded.feedback.clone();
            emit(events, VoiceQuizEvent::Graded(graded)).await?;
            speak(speech, &feedback, options, events, cancel).await?;

            match session.advance().map_err(|_| Halted)? {
                Some(next) => prompt = next,
                None => {
                    speak(speech, COMPLETION_PHRASE, options, events, cancel).await?;
                    let total = session.questions().len();
                    emit(
                        events,
                        VoiceQuizEvent::Completed {
                            correct: session.correct_count(),
                            total,
                        },
                    )
                    .await?;
                    return Ok(());
                }
            }
        }
    }
    .await;

    if outcome.is_err() {
        session.stop();
        info!("Voice quiz stopped");
        // The receiver may already be gone; nothing else to tell.
        let _ = events.send(VoiceQuizEvent::Stopped).await;
    }
    Ok(session.state())
}

async fn speak(
    speech: &dyn SpeechSynthesisService,
    text: &str,
    options: &VoiceQuizRunOptions,
    events: &mpsc::Sender<VoiceQuizEvent>,
    cancel: &CancellationToken,
) -> Result<(), Halted> {
    let audio = tokio::select! {
        _ = cancel.cancelled() => return Err(Halted),
        result = speech.synthesize(text, &options.speech) => match result {
            Ok(audio) => Some(audio),
            Err(e) => {
                warn!("Speech synthesis failed during voice quiz: {}", e);
                None
            }
        },
    };
    emit(
        events,
        VoiceQuizEvent::Spoken {
            text: text.to_string(),
            audio,
        },
    )
    .await
}

async fn emit(events: &mpsc::Sender<VoiceQuizEvent>, event: VoiceQuizEvent) -> Result<(), Halted> {
    events.send(event).await.map_err(|_| Halted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedSpeech;
    use std::sync::Arc;

    fn qa(question: &str, answer: &str) -> VoiceQuizQuestion {
        VoiceQuizQuestion {
            question: question.to_string(),
            answer: answer.to_string(),
        }
    }

    #[test]
    fn parses_inline_question_and_answer_pairs() {
        let text = "Question: What is 2+2? Answer: 4\nQuestion: Capital of France? Answer: Paris";
        assert_eq!(
            parse_quiz_questions(text),
            vec![qa("What is 2+2?", "4"), qa("Capital of France?", "Paris")]
        );
    }

    #[test]
    fn parses_answers_on_their_own_lines() {
        let text = "Here is your quiz:\n\n  Question: Largest planet?\n  Answer: Jupiter\n\nQuestion: H2O is?\nAnswer: Water\n";
        assert_eq!(
            parse_quiz_questions(text),
            vec![qa("Largest planet?", "Jupiter"), qa("H2O is?", "Water")]
        );
    }

    #[test]
    fn dangling_question_keeps_an_empty_answer() {
        let text = "Question: First?\nQuestion: Second?\nAnswer: two";
        assert_eq!(
            parse_quiz_questions(text),
            vec![qa("First?", ""), qa("Second?", "two")]
        );
        assert_eq!(parse_quiz_questions("Question: Alone?"), vec![qa("Alone?", "")]);
    }

    #[test]
    fn answers_without_an_open_question_are_ignored() {
        assert!(parse_quiz_questions("Answer: orphan\nsome chatter").is_empty());
    }

    #[test]
    fn grading_is_case_insensitive_containment() {
        assert!(is_correct_answer("I think it's PARIS", "Paris"));
        assert!(!is_correct_answer("London", "Paris"));
    }

    #[test]
    fn session_walks_every_state() {
        let mut session = VoiceQuizSession::new(vec![qa("2+2?", "4"), qa("3+3?", "6")]);
        assert_eq!(session.state(), VoiceQuizState::Idle);

        assert_eq!(session.start().unwrap(), "Question 1: 2+2?");
        assert_eq!(session.state(), VoiceQuizState::AskingQuestion(0));
        session.question_spoken().unwrap();
        assert_eq!(session.state(), VoiceQuizState::AwaitingAnswer(0));

        let graded = session.submit_answer("four, I mean 4").unwrap();
        assert!(graded.correct);
        assert_eq!(graded.feedback, "Correct! The answer is 4");
        assert_eq!(session.state(), VoiceQuizState::Grading(0));

        assert_eq!(session.advance().unwrap().as_deref(), Some("Question 2: 3+3?"));
        session.question_spoken().unwrap();
        let graded = session.submit_answer("seven").unwrap();
        assert!(!graded.correct);
        assert_eq!(graded.feedback, "Incorrect. The correct answer is 6");

        assert_eq!(session.advance().unwrap(), None);
        assert_eq!(session.state(), VoiceQuizState::Done);
        assert_eq!(session.correct_count(), 1);
    }

    #[test]
    fn restart_resets_the_cursor_and_stop_returns_to_idle() {
        let mut session = VoiceQuizSession::new(vec![qa("a?", "a"), qa("b?", "b")]);
        session.start().unwrap();
        session.question_spoken().unwrap();
        session.submit_answer("a").unwrap();
        session.advance().unwrap();

        session.stop();
        assert_eq!(session.state(), VoiceQuizState::Idle);
        assert_eq!(session.start().unwrap(), "Question 1: a?");
        assert_eq!(session.correct_count(), 0);
    }

    #[test]
    fn out_of_order_actions_are_rejected() {
        let mut session = VoiceQuizSession::new(vec![qa("a?", "a")]);
        assert!(session.submit_answer("a").is_err());
        assert!(session.advance().is_err());
        assert!(VoiceQuizSession::new(Vec::new()).start().is_err());
    }

    fn fast_options() -> VoiceQuizRunOptions {
        VoiceQuizRunOptions {
            dead_time: Duration::from_millis(1),
            speech: SpeechOptions::default(),
        }
    }

    #[tokio::test]
    async fn driver_runs_the_quiz_to_completion() {
        let speech = Arc::new(ScriptedSpeech::default());
        let mut session = VoiceQuizSession::new(vec![qa("2+2?", "4"), qa("Capital of France?", "Paris")]);
        let (answer_tx, mut answer_rx) = mpsc::channel(4);
        let (event_tx, mut event_rx) = mpsc::channel(64);
        answer_tx.send("it is 4".to_string()).await.unwrap();
        answer_tx.send("berlin".to_string()).await.unwrap();

        let state = run_voice_quiz(
            &mut session,
            speech.as_ref(),
            &mut answer_rx,
            &event_tx,
            &fast_options(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        drop(event_tx);

        assert_eq!(state, VoiceQuizState::Done);
        assert_eq!(
            speech.spoken(),
            vec![
                "Question 1: 2+2?".to_string(),
                "Correct! The answer is 4".to_string(),
                "Question 2: Capital of France?".to_string(),
                "Incorrect. The correct answer is Paris".to_string(),
                COMPLETION_PHRASE.to_string(),
            ]
        );

        let mut completed = None;
        while let Some(event) = event_rx.recv().await {
            if let VoiceQuizEvent::Completed { correct, total } = event {
                completed = Some((correct, total));
            }
        }
        assert_eq!(completed, Some((1, 2)));
    }

    #[tokio::test]
    async fn cancelling_while_listening_returns_to_idle() {
        let speech = Arc::new(ScriptedSpeech::default());
        let mut session = VoiceQuizSession::new(vec![qa("2+2?", "4")]);
        let (_answer_tx, mut answer_rx) = mpsc::channel::<String>(1);
        let (event_tx, mut event_rx) = mpsc::channel(64);
        let cancel = CancellationToken::new();

        let stopper = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                cancel.cancel();
            })
        };

        let state = run_voice_quiz(
            &mut session,
            speech.as_ref(),
            &mut answer_rx,
            &event_tx,
            &fast_options(),
            &cancel,
        )
        .await
        .unwrap();
        stopper.await.unwrap();
        drop(event_tx);

        assert_eq!(state, VoiceQuizState::Idle);
        let mut saw_stopped = false;
        while let Some(event) = event_rx.recv().await {
            saw_stopped |= matches!(event, VoiceQuizEvent::Stopped);
        }
        assert!(saw_stopped);
    }

    #[tokio::test]
    async fn synthesis_failures_do_not_abort_the_quiz() {
        let speech = Arc::new(ScriptedSpeech::failing());
        let mut session = VoiceQuizSession::new(vec![qa("2+2?", "4")]);
        let (answer_tx, mut answer_rx) = mpsc::channel(1);
        let (event_tx, _event_rx) = mpsc::channel(64);
        answer_tx.send("4".to_string()).await.unwrap();

        let state = run_voice_quiz(
            &mut session,
            speech.as_ref(),
            &mut answer_rx,
            &event_tx,
            &fast_options(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(state, VoiceQuizState::Done);
        assert_eq!(session.correct_count(), 1);
    }
}

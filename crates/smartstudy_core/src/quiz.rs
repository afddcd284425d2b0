//! crates/smartstudy_core/src/quiz.rs
//!
//! The quiz engine: builds fixed-shape quizzes, grades submissions and records
//! one progress entry per submission.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use tracing::info;

use crate::domain::{AnswerResult, ProgressRecord, QuestionType, Quiz, QuizQuestion, QuizResults};
use crate::ports::{PortResult, StudyStore, TutorService};

pub const QUESTIONS_PER_QUIZ: u32 = 5;
pub const DEFAULT_TIME_LIMIT_MINUTES: u32 = 15;
pub const DEFAULT_PASSING_SCORE: f64 = 70.0;

const MULTIPLE_CHOICE_OPTIONS: [&str; 4] = ["Option A", "Option B", "Option C", "Option D"];
const MULTIPLE_CHOICE_ANSWER: &str = "Option A";
const OPEN_ANSWER: &str = "Correct answer here";

/// Builds a quiz of exactly five placeholder questions, each of a uniformly
/// random type. The id is the current time in milliseconds; the store makes it
/// unique when the quiz is persisted.
pub fn build_quiz<R: Rng>(
    rng: &mut R,
    topic: &str,
    difficulty: &str,
    focus_area: &str,
) -> Quiz {
    let questions = (1..=QUESTIONS_PER_QUIZ)
        .map(|id| {
            let question_type = QuestionType::ALL[rng.random_range(0..QuestionType::ALL.len())];
            let (options, correct_answer) = match question_type {
                QuestionType::MultipleChoice => (
                    Some(MULTIPLE_CHOICE_OPTIONS.iter().map(|o| o.to_string()).collect()),
                    MULTIPLE_CHOICE_ANSWER,
                ),
                _ => (None, OPEN_ANSWER),
            };

            QuizQuestion {
                id,
                question_type,
                question: format!("Question {} about {} ({} level)", id, topic, difficulty),
                options,
                correct_answer: correct_answer.to_string(),
                explanation: format!("Explanation for question {}", id),
                difficulty: difficulty.to_string(),
                focus_area: focus_area.to_string(),
            }
        })
        .collect();

    Quiz {
        id: Utc::now().timestamp_millis().max(0) as u64,
        topic: topic.to_string(),
        difficulty: difficulty.to_string(),
        focus_area: focus_area.to_string(),
        questions,
        time_limit: DEFAULT_TIME_LIMIT_MINUTES,
        passing_score: DEFAULT_PASSING_SCORE,
    }
}

/// Grades `answers` (keyed by question id) against the quiz.
///
/// Matching is exact and case-sensitive. A missing answer counts as wrong.
pub fn grade_submission(quiz: &Quiz, answers: &HashMap<String, String>) -> QuizResults {
    let details: Vec<AnswerResult> = quiz
        .questions
        .iter()
        .map(|question| {
            let user_answer = answers.get(&question.id.to_string()).cloned();
            let is_correct = user_answer.as_deref() == Some(question.correct_answer.as_str());
            AnswerResult {
                question_id: question.id,
                user_answer,
                correct_answer: question.correct_answer.clone(),
                is_correct,
                explanation: question.explanation.clone(),
            }
        })
        .collect();

    let correct_answers = details.iter().filter(|d| d.is_correct).count();
    let total_questions = quiz.questions.len();
    let score = if total_questions == 0 {
        0.0
    } else {
        correct_answers as f64 * 100.0 / total_questions as f64
    };

    QuizResults {
        score,
        passed: score >= quiz.passing_score,
        total_questions,
        correct_answers,
        details,
    }
}

/// Generates quizzes through the tutor and records graded submissions.
#[derive(Clone)]
pub struct QuizEngine {
    store: Arc<dyn StudyStore>,
    tutor: Arc<dyn TutorService>,
}

impl QuizEngine {
    pub fn new(store: Arc<dyn StudyStore>, tutor: Arc<dyn TutorService>) -> Self {
        Self { store, tutor }
    }

    /// Generates a quiz and persists it so it can be submitted later.
    pub async fn generate_quiz(
        &self,
        topic: &str,
        difficulty: &str,
        focus_area: &str,
        student_level: &str,
    ) -> PortResult<Quiz> {
        let quiz = self
            .tutor
            .generate_quiz(topic, difficulty, focus_area, student_level)
            .await?;
        let quiz = self.store.add_quiz(quiz).await?;
        info!("Generated quiz {} on '{}'", quiz.id, quiz.topic);
        Ok(quiz)
    }

    /// Grades a submission and appends exactly one progress record for `student_id`.
    pub async fn submit_quiz(
        &self,
        quiz_id: u64,
        student_id: &str,
        answers: &HashMap<String, String>,
    ) -> PortResult<QuizResults> {
        let quiz = self.store.get_quiz(quiz_id).await?;
        let results = grade_submission(&quiz, answers);

        let record = ProgressRecord {
            id: 0,
            student_id: student_id.to_string(),
            quiz_id,
            score: results.score,
            passed: results.passed,
            answers: results.details.clone(),
            completed_at: Utc::now(),
        };
        let record = self.store.add_progress(record).await?;
        info!(
            "Recorded progress {} for student {}: score {:.1}",
            record.id, student_id, record.score
        );

        Ok(results)
    }
}

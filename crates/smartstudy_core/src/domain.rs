//! crates/smartstudy_core/src/domain.rs
//!
//! Defines the core data structures for the tutoring application.
//! Every entity serializes with camelCase keys, which is the shape the
//! browser dashboard consumes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

//=========================================================================================
// Users and Identity
//=========================================================================================

/// The role a user plays on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Teacher,
    Parent,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            "parent" => Ok(Role::Parent),
            other => Err(format!("Unknown role '{}'", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Parent => "parent",
        };
        f.write_str(name)
    }
}

/// An account as reported by the identity provider.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityAccount {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub email_verified: bool,
}

/// The result of a successful sign-up or sign-in.
#[derive(Debug, Clone)]
pub struct IdentitySession {
    pub account: IdentityAccount,
    /// Bearer token the client sends back in the `Authorization` header.
    pub token: String,
    /// `email` or `google`.
    pub provider: String,
}

/// The per-user profile document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub grade: String,
    pub subject: String,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub email_verified: bool,
    pub provider: String,
    pub created_at: DateTime<Utc>,
    pub last_login_at: DateTime<Utc>,
}

/// A partial update to a profile. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub role: Option<Role>,
    pub grade: Option<String>,
    pub subject: Option<String>,
    pub photo_url: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.display_name.is_none()
            && self.role.is_none()
            && self.grade.is_none()
            && self.subject.is_none()
            && self.photo_url.is_none()
    }

    /// Applies the present fields to `profile`.
    pub fn apply_to(&self, profile: &mut UserProfile) {
        if let Some(username) = &self.username {
            profile.username = username.clone();
        }
        if let Some(display_name) = &self.display_name {
            profile.display_name = display_name.clone();
        }
        if let Some(role) = self.role {
            profile.role = role;
        }
        if let Some(grade) = &self.grade {
            profile.grade = grade.clone();
        }
        if let Some(subject) = &self.subject {
            profile.subject = subject.clone();
        }
        if let Some(photo_url) = &self.photo_url {
            profile.photo_url = Some(photo_url.clone());
        }
    }
}

//=========================================================================================
// Study Materials
//=========================================================================================

/// An uploaded study document. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyMaterial {
    pub id: u64,
    pub filename: String,
    pub original_name: String,
    pub storage_path: String,
    pub uploaded_by: String,
    pub subject: String,
    pub topic: String,
    pub grade: String,
    pub uploaded_at: DateTime<Utc>,
    pub mime_type: String,
}

/// Exact-match filters for listing materials. Absent fields match everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MaterialFilter {
    pub subject: Option<String>,
    pub topic: Option<String>,
    pub grade: Option<String>,
}

impl MaterialFilter {
    pub fn matches(&self, material: &StudyMaterial) -> bool {
        fn field_matches(filter: &Option<String>, value: &str) -> bool {
            match filter.as_deref() {
                None | Some("") => true,
                Some(expected) => expected == value,
            }
        }

        field_matches(&self.subject, &material.subject)
            && field_matches(&self.topic, &material.topic)
            && field_matches(&self.grade, &material.grade)
    }
}

//=========================================================================================
// Quizzes and Progress
//=========================================================================================

/// The four question shapes a generated quiz can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
    ProblemSolving,
}

impl QuestionType {
    pub const ALL: [QuestionType; 4] = [
        QuestionType::MultipleChoice,
        QuestionType::TrueFalse,
        QuestionType::ShortAnswer,
        QuestionType::ProblemSolving,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: u32,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub question: String,
    /// Only present for multiple-choice questions.
    pub options: Option<Vec<String>>,
    pub correct_answer: String,
    pub explanation: String,
    pub difficulty: String,
    pub focus_area: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    /// Milliseconds since the epoch at generation time; made unique by the store.
    pub id: u64,
    pub topic: String,
    pub difficulty: String,
    pub focus_area: String,
    pub questions: Vec<QuizQuestion>,
    /// Minutes.
    pub time_limit: u32,
    pub passing_score: f64,
}

/// The grading outcome for one question of a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResult {
    pub question_id: u32,
    pub user_answer: Option<String>,
    pub correct_answer: String,
    pub is_correct: bool,
    pub explanation: String,
}

/// One row of outcome data, produced by exactly one quiz submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub id: u64,
    pub student_id: String,
    pub quiz_id: u64,
    pub score: f64,
    pub passed: bool,
    pub answers: Vec<AnswerResult>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResults {
    pub score: f64,
    pub passed: bool,
    pub total_questions: usize,
    pub correct_answers: usize,
    pub details: Vec<AnswerResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub total_quizzes: usize,
    pub average_score: f64,
    pub passed_quizzes: usize,
    pub recent_activity: Vec<ProgressRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub progress: ProgressSummary,
    pub detailed_progress: Vec<ProgressRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentUpdate {
    pub student_id: String,
    pub timestamp: DateTime<Utc>,
    pub summary: String,
    pub achievements: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub recommendations: Vec<String>,
    pub next_steps: String,
}

//=========================================================================================
// Tutoring
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorExplanation {
    pub explanation: String,
    pub examples: Vec<String>,
    pub key_points: Vec<String>,
    pub difficulty: String,
    /// Minutes.
    pub estimated_time: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemSolution {
    pub solution: String,
    pub steps: Option<Vec<String>>,
    pub explanation: String,
    pub related_concepts: Vec<String>,
}

//=========================================================================================
// Voice
//=========================================================================================

/// Per-request overrides for speech synthesis. Absent fields fall back to the
/// configured voice persona.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechOptions {
    pub voice: Option<String>,
    pub speed: Option<f64>,
    pub pitch: Option<f64>,
    pub volume: Option<f64>,
    pub emotion: Option<String>,
    pub language: Option<String>,
}

/// Audio returned by the synthesis API.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedSpeech {
    pub audio: Vec<u8>,
    pub format: String,
    /// Value of the provider's `x-audio-duration` header, if any.
    pub duration: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionOptions {
    pub language: Option<String>,
    #[serde(default = "default_true")]
    pub interim_results: bool,
    #[serde(default)]
    pub continuous: bool,
    /// Milliseconds.
    #[serde(default = "default_recognition_timeout")]
    pub timeout: u64,
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self {
            language: None,
            interim_results: true,
            continuous: false,
            timeout: default_recognition_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_recognition_timeout() -> u64 {
    10_000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionResult {
    pub success: bool,
    pub text: String,
    pub confidence: Option<f64>,
    pub language: Option<String>,
    pub interim: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecognitionResult {
    /// A recognition attempt the provider could not complete.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            text: String::new(),
            confidence: None,
            language: None,
            interim: false,
            error: Some(message.into()),
        }
    }
}

/// A question/answer pair parsed from a completion response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceQuizQuestion {
    pub question: String,
    pub answer: String,
}

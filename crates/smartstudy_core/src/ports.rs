//! crates/smartstudy_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the identity vendor, the AI/voice vendor and the storage.

use async_trait::async_trait;

use crate::domain::{
    IdentityAccount, IdentitySession, MaterialFilter, ParentUpdate, ProblemSolution,
    ProfileUpdate, ProgressRecord, Quiz, RecognitionOptions, RecognitionResult, SpeechOptions,
    StudyMaterial, SynthesizedSpeech, TutorExplanation, UserProfile,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., storage, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// An identity or AI/voice provider call failed. The message is the provider's.
    #[error("{0}")]
    Upstream(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Storage Ports
//=========================================================================================

/// Append-only storage for materials, quizzes, progress records and parent updates.
///
/// Ids are assigned by the store inside its own critical section; any id set by
/// the caller is replaced. Listing methods return records in insertion order.
#[async_trait]
pub trait StudyStore: Send + Sync {
    // --- Study Materials ---
    async fn add_material(&self, material: StudyMaterial) -> PortResult<StudyMaterial>;

    async fn list_materials(&self, filter: &MaterialFilter) -> PortResult<Vec<StudyMaterial>>;

    // --- Quizzes ---
    async fn add_quiz(&self, quiz: Quiz) -> PortResult<Quiz>;

    async fn get_quiz(&self, quiz_id: u64) -> PortResult<Quiz>;

    // --- Progress ---
    async fn add_progress(&self, record: ProgressRecord) -> PortResult<ProgressRecord>;

    async fn progress_for_student(&self, student_id: &str) -> PortResult<Vec<ProgressRecord>>;

    // --- Parent Updates ---
    async fn add_parent_update(&self, update: ParentUpdate) -> PortResult<()>;

    async fn parent_updates_for_student(&self, student_id: &str)
        -> PortResult<Vec<ParentUpdate>>;
}

/// Per-user profile documents.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn create_profile(&self, profile: UserProfile) -> PortResult<UserProfile>;

    async fn get_profile(&self, uid: &str) -> PortResult<UserProfile>;

    async fn update_profile(&self, uid: &str, update: &ProfileUpdate) -> PortResult<UserProfile>;

    async fn touch_last_login(&self, uid: &str) -> PortResult<()>;
}

//=========================================================================================
// Identity Port
//=========================================================================================

/// Client-side configuration the browser needs to talk to Firebase directly.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FirebaseClientConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub messaging_sender_id: String,
    pub app_id: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> PortResult<IdentitySession>;

    /// Fails with `Unauthorized` on bad credentials.
    async fn sign_in(&self, email: &str, password: &str) -> PortResult<IdentitySession>;

    async fn sign_in_with_google(&self, id_token: &str) -> PortResult<IdentitySession>;

    /// Fails with `Unauthorized` when the token is unknown, malformed or expired.
    async fn verify_token(&self, token: &str) -> PortResult<IdentityAccount>;

    async fn send_password_reset(&self, email: &str) -> PortResult<()>;

    async fn sign_out(&self, token: &str) -> PortResult<()>;

    fn client_config(&self) -> Option<FirebaseClientConfig>;
}

//=========================================================================================
// Tutoring Port
//=========================================================================================

#[async_trait]
pub trait TutorService: Send + Sync {
    async fn explain(&self, topic: &str, level: &str, context: &str)
        -> PortResult<TutorExplanation>;

    async fn solve(&self, problem: &str, steps: bool) -> PortResult<ProblemSolution>;

    async fn generate_quiz(
        &self,
        topic: &str,
        difficulty: &str,
        focus_area: &str,
        student_level: &str,
    ) -> PortResult<Quiz>;

    async fn summarize_progress(
        &self,
        student_id: &str,
        records: &[ProgressRecord],
    ) -> PortResult<ParentUpdate>;
}

//=========================================================================================
// Completion and Speech Ports
//=========================================================================================

/// A single-turn request to the completion API.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Returns the assistant's text for one turn.
    async fn complete(&self, request: CompletionRequest) -> PortResult<String>;
}

#[async_trait]
pub trait SpeechSynthesisService: Send + Sync {
    /// Generates audio from text. `options` are fully resolved by the caller.
    async fn synthesize(&self, text: &str, options: &SpeechOptions)
        -> PortResult<SynthesizedSpeech>;
}

#[async_trait]
pub trait SpeechRecognitionService: Send + Sync {
    /// Transcribes the client-supplied audio payload.
    async fn recognize(
        &self,
        audio: &str,
        options: &RecognitionOptions,
    ) -> PortResult<RecognitionResult>;
}

pub mod domain;
pub mod ports;
pub mod progress;
pub mod quiz;
pub mod voice;
pub mod voice_quiz;

#[cfg(test)]
mod test_support;

pub use domain::{
    IdentityAccount, IdentitySession, MaterialFilter, ParentUpdate, ProblemSolution,
    ProfileUpdate, ProgressRecord, ProgressReport, Quiz, QuizQuestion, QuizResults, Role,
    StudyMaterial, TutorExplanation, UserProfile,
};
pub use ports::{
    CompletionService, IdentityProvider, PortError, PortResult, ProfileStore,
    SpeechRecognitionService, SpeechSynthesisService, StudyStore, TutorService,
};
pub use progress::ProgressTracker;
pub use quiz::QuizEngine;
pub use voice::VoiceAssistant;

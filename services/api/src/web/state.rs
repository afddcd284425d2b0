//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use smartstudy_core::ports::{
    CompletionService, IdentityProvider, ProfileStore, SpeechRecognitionService,
    SpeechSynthesisService, StudyStore, TutorService,
};
use smartstudy_core::{ProgressTracker, QuizEngine, VoiceAssistant};
use std::sync::Arc;
use std::time::Instant;

/// The concrete adapters behind every port, chosen at startup.
pub struct Ports {
    pub store: Arc<dyn StudyStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub tutor: Arc<dyn TutorService>,
    pub completion: Arc<dyn CompletionService>,
    pub synthesis: Arc<dyn SpeechSynthesisService>,
    pub recognition: Arc<dyn SpeechRecognitionService>,
}

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn StudyStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub tutor: Arc<dyn TutorService>,
    pub quizzes: QuizEngine,
    pub progress: ProgressTracker,
    pub voice: VoiceAssistant,
    /// Whether the realtime voice channel is mounted at `/`.
    pub voice_realtime: bool,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Arc<Config>, ports: Ports, voice_realtime: bool) -> Self {
        let quizzes = QuizEngine::new(ports.store.clone(), ports.tutor.clone());
        let progress = ProgressTracker::new(ports.store.clone(), ports.tutor.clone());
        let voice = VoiceAssistant::new(
            ports.completion,
            ports.synthesis,
            ports.recognition,
            config.voice.clone(),
        );

        Self {
            config,
            store: ports.store,
            profiles: ports.profiles,
            identity: ports.identity,
            tutor: ports.tutor,
            quizzes,
            progress,
            voice,
            voice_realtime,
            started_at: Instant::now(),
        }
    }
}

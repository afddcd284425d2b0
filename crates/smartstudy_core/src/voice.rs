//! crates/smartstudy_core/src/voice.rs
//!
//! The voice assistant: turns spoken commands into a tutor reply plus audio,
//! generates spoken quizzes, and passes recognition/synthesis requests through
//! to the speech ports with the configured voice defaults filled in.

use std::sync::Arc;

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::domain::{
    RecognitionOptions, RecognitionResult, SpeechOptions, SynthesizedSpeech, VoiceQuizQuestion,
};
use crate::ports::{
    CompletionRequest, CompletionService, PortError, PortResult, SpeechRecognitionService,
    SpeechSynthesisService,
};
use crate::voice_quiz::parse_quiz_questions;

const TUTOR_SYSTEM_PROMPT: &str =
    "You are an educational AI tutor that provides helpful, age-appropriate explanations.";
const QUIZ_SYSTEM_PROMPT: &str =
    "You are an educational quiz generator that creates voice-friendly questions.";

const COMMAND_MAX_TOKENS: u32 = 500;
const QUIZ_MAX_TOKENS: u32 = 800;
const TEMPERATURE: f32 = 0.7;

/// Replies to voice commands are always spoken with this emotion.
const COMMAND_EMOTION: &str = "friendly";

pub const DEFAULT_USER_LEVEL: &str = "high-school";
pub const DEFAULT_SUBJECT: &str = "general";
pub const DEFAULT_QUIZ_DIFFICULTY: &str = "medium";
pub const DEFAULT_QUIZ_COUNT: u32 = 3;

//=========================================================================================
// Settings and Status
//=========================================================================================

/// Voice defaults resolved from configuration at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSettings {
    pub enabled: bool,
    pub omnidim_enabled: bool,
    pub api_key_configured: bool,
    pub recognition_language: String,
    pub speech_language: String,
    pub persona: String,
    pub emotion: String,
    pub speed: f64,
    pub pitch: f64,
    pub volume: f64,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            omnidim_enabled: false,
            api_key_configured: false,
            recognition_language: "en-US".to_string(),
            speech_language: "en-US".to_string(),
            persona: "educational".to_string(),
            emotion: "neutral".to_string(),
            speed: 1.0,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceStatus {
    pub enabled: bool,
    pub omnidim_enabled: bool,
    pub api_key_configured: bool,
    pub recognition_language: String,
    pub speech_language: String,
    pub voice_persona: String,
}

//=========================================================================================
// Command and Quiz Results
//=========================================================================================

/// Caller-supplied context for a voice command. Missing fields take defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceContext {
    pub user_level: Option<String>,
    pub subject: Option<String>,
    pub previous_context: Option<String>,
}

/// The speech half of a command result. Synthesis failures are reported here
/// instead of failing the whole command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeechResult {
    pub success: bool,
    /// Base64-encoded audio.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SpeechResult {
    pub fn from_speech(speech: SynthesizedSpeech) -> Self {
        Self {
            success: true,
            audio: Some(base64::engine::general_purpose::STANDARD.encode(&speech.audio)),
            format: Some(speech.format),
            duration: speech.duration,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            audio: None,
            format: None,
            duration: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandContext {
    pub user_level: String,
    pub subject: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceCommandResult {
    pub success: bool,
    pub command: String,
    pub response: String,
    pub speech: SpeechResult,
    pub context: CommandContext,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceQuiz {
    pub success: bool,
    pub topic: String,
    pub difficulty: String,
    pub questions: Vec<VoiceQuizQuestion>,
}

//=========================================================================================
// Voice Assistant
//=========================================================================================

#[derive(Clone)]
pub struct VoiceAssistant {
    completion: Arc<dyn CompletionService>,
    synthesis: Arc<dyn SpeechSynthesisService>,
    recognition: Arc<dyn SpeechRecognitionService>,
    settings: VoiceSettings,
}

impl VoiceAssistant {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        synthesis: Arc<dyn SpeechSynthesisService>,
        recognition: Arc<dyn SpeechRecognitionService>,
        settings: VoiceSettings,
    ) -> Self {
        Self {
            completion,
            synthesis,
            recognition,
            settings,
        }
    }

    pub fn status(&self) -> VoiceStatus {
        VoiceStatus {
            enabled: self.settings.enabled,
            omnidim_enabled: self.settings.omnidim_enabled,
            api_key_configured: self.settings.api_key_configured,
            recognition_language: self.settings.recognition_language.clone(),
            speech_language: self.settings.speech_language.clone(),
            voice_persona: self.settings.persona.clone(),
        }
    }

    /// Answers a spoken command with one completion turn, then speaks the reply.
    ///
    /// A completion failure fails the command. A synthesis failure does not; it
    /// is reported in the result's `speech` field.
    pub async fn process_voice_command(
        &self,
        command: &str,
        context: &VoiceContext,
    ) -> PortResult<VoiceCommandResult> {
        if command.trim().is_empty() {
            return Err(PortError::Validation("Command is required".to_string()));
        }

        let user_level = non_empty_or(&context.user_level, DEFAULT_USER_LEVEL);
        let subject = non_empty_or(&context.subject, DEFAULT_SUBJECT);
        let previous_context = context.previous_context.as_deref().unwrap_or_default();

        let prompt = format!(
            "You are an educational AI tutor. A student has asked: \"{command}\"\n\n\
             Context:\n\
             - Student level: {user_level}\n\
             - Subject: {subject}\n\
             - Previous context: {previous_context}\n\n\
             Please provide a helpful, educational response that is appropriate for the student's level.\n\
             Keep the response concise and engaging."
        );

        let response = self
            .completion
            .complete(CompletionRequest {
                system: TUTOR_SYSTEM_PROMPT.to_string(),
                prompt,
                max_tokens: COMMAND_MAX_TOKENS,
                temperature: TEMPERATURE,
            })
            .await
            .map_err(|e| {
                error!("Voice command completion failed: {}", e);
                e
            })?;

        let speech_options = SpeechOptions {
            voice: Some(self.settings.persona.clone()),
            emotion: Some(COMMAND_EMOTION.to_string()),
            ..SpeechOptions::default()
        };
        let speech = match self.synthesize_speech(&response, &speech_options).await {
            Ok(audio) => SpeechResult::from_speech(audio),
            Err(e) => {
                warn!("Speech synthesis failed for voice command: {}", e);
                SpeechResult::failed(e.to_string())
            }
        };

        info!("Processed voice command for level '{}' in '{}'", user_level, subject);
        Ok(VoiceCommandResult {
            success: true,
            command: command.to_string(),
            response,
            speech,
            context: CommandContext {
                user_level,
                subject,
                timestamp: Utc::now(),
            },
        })
    }

    /// Asks the completion API for `count` question/answer pairs and parses them.
    pub async fn generate_voice_quiz(
        &self,
        topic: &str,
        difficulty: Option<&str>,
        count: Option<u32>,
    ) -> PortResult<VoiceQuiz> {
        if topic.trim().is_empty() {
            return Err(PortError::Validation("Topic is required".to_string()));
        }
        let difficulty = difficulty
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(DEFAULT_QUIZ_DIFFICULTY);
        let count = count.unwrap_or(DEFAULT_QUIZ_COUNT);
        if count == 0 {
            return Err(PortError::Validation(
                "Question count must be at least 1".to_string(),
            ));
        }

        let prompt = format!(
            "Generate {count} quiz questions about \"{topic}\" at {difficulty} difficulty level.\n\
             Format each question as: \"Question: [question text] Answer: [answer]\"\n\
             Make the questions suitable for voice interaction."
        );

        let content = self
            .completion
            .complete(CompletionRequest {
                system: QUIZ_SYSTEM_PROMPT.to_string(),
                prompt,
                max_tokens: QUIZ_MAX_TOKENS,
                temperature: TEMPERATURE,
            })
            .await?;

        let questions = parse_quiz_questions(&content);
        info!("Generated voice quiz on '{}' with {} questions", topic, questions.len());

        Ok(VoiceQuiz {
            success: true,
            topic: topic.to_string(),
            difficulty: difficulty.to_string(),
            questions,
        })
    }

    pub async fn recognize_speech(
        &self,
        audio: &str,
        options: &RecognitionOptions,
    ) -> PortResult<RecognitionResult> {
        if audio.is_empty() {
            return Err(PortError::Validation("Audio data is required".to_string()));
        }
        let mut options = options.clone();
        if options.language.as_deref().map_or(true, str::is_empty) {
            options.language = Some(self.settings.recognition_language.clone());
        }
        match self.recognition.recognize(audio, &options).await {
            Ok(result) => Ok(result),
            Err(e) => {
                error!("Speech recognition error: {}", e);
                Ok(RecognitionResult::failed(e.to_string()))
            }
        }
    }

    pub async fn synthesize_speech(
        &self,
        text: &str,
        options: &SpeechOptions,
    ) -> PortResult<SynthesizedSpeech> {
        if text.trim().is_empty() {
            return Err(PortError::Validation("Text is required".to_string()));
        }
        let resolved = self.resolve_speech_options(options);
        self.synthesis.synthesize(text, &resolved).await
    }

    /// Fills every absent field from the configured voice.
    pub fn resolve_speech_options(&self, options: &SpeechOptions) -> SpeechOptions {
        let s = &self.settings;
        SpeechOptions {
            voice: options.voice.clone().or_else(|| Some(s.persona.clone())),
            speed: options.speed.or(Some(s.speed)),
            pitch: options.pitch.or(Some(s.pitch)),
            volume: options.volume.or(Some(s.volume)),
            emotion: options.emotion.clone().or_else(|| Some(s.emotion.clone())),
            language: options
                .language
                .clone()
                .or_else(|| Some(s.speech_language.clone())),
        }
    }
}

fn non_empty_or(value: &Option<String>, default: &str) -> String {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedCompletion, ScriptedRecognition, ScriptedSpeech};

    fn assistant(
        completion: ScriptedCompletion,
        speech: Arc<ScriptedSpeech>,
    ) -> (VoiceAssistant, Arc<ScriptedCompletion>) {
        let completion = Arc::new(completion);
        let assistant = VoiceAssistant::new(
            completion.clone(),
            speech,
            Arc::new(ScriptedRecognition::default()),
            VoiceSettings::default(),
        );
        (assistant, completion)
    }

    #[tokio::test]
    async fn command_embeds_defaults_and_speaks_the_reply() {
        let speech = Arc::new(ScriptedSpeech::default());
        let (assistant, completion) =
            assistant(ScriptedCompletion::replying("Photosynthesis makes sugar."), speech.clone());

        let result = assistant
            .process_voice_command("What is photosynthesis?", &VoiceContext::default())
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.response, "Photosynthesis makes sugar.");
        assert_eq!(result.context.user_level, "high-school");
        assert_eq!(result.context.subject, "general");
        assert!(result.speech.success);
        assert_eq!(result.speech.format.as_deref(), Some("wav"));
        assert!(result.speech.audio.is_some());

        let request = completion.last_request().unwrap();
        assert_eq!(request.max_tokens, 500);
        assert!(request.prompt.contains("\"What is photosynthesis?\""));
        assert!(request.prompt.contains("Student level: high-school"));

        assert_eq!(speech.spoken(), vec!["Photosynthesis makes sugar.".to_string()]);
        let options = speech.last_options().unwrap();
        assert_eq!(options.emotion.as_deref(), Some("friendly"));
        assert_eq!(options.voice.as_deref(), Some("educational"));
    }

    #[tokio::test]
    async fn completion_failure_fails_the_command() {
        let speech = Arc::new(ScriptedSpeech::default());
        let (assistant, _) = assistant(ScriptedCompletion::failing("quota exceeded"), speech.clone());

        let err = assistant
            .process_voice_command("hello", &VoiceContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Upstream(ref m) if m == "quota exceeded"));
        assert!(speech.spoken().is_empty());
    }

    #[tokio::test]
    async fn synthesis_failure_is_reported_inside_the_result() {
        let (assistant, _) =
            assistant(ScriptedCompletion::replying("Hi"), Arc::new(ScriptedSpeech::failing()));

        let result = assistant
            .process_voice_command("hello", &VoiceContext::default())
            .await
            .unwrap();
        assert!(result.success);
        assert!(!result.speech.success);
        assert!(result.speech.error.is_some());

        let json = serde_json::to_value(&result.speech).unwrap();
        assert!(json.get("audio").is_none());
    }

    #[tokio::test]
    async fn voice_quiz_parses_the_completion() {
        let (assistant, completion) = assistant(
            ScriptedCompletion::replying("Question: 2+2? Answer: 4\nQuestion: 3*3? Answer: 9"),
            Arc::new(ScriptedSpeech::default()),
        );

        let quiz = assistant
            .generate_voice_quiz("Arithmetic", None, None)
            .await
            .unwrap();
        assert_eq!(quiz.difficulty, "medium");
        assert_eq!(quiz.questions.len(), 2);
        assert_eq!(quiz.questions[1].answer, "9");

        let request = completion.last_request().unwrap();
        assert_eq!(request.max_tokens, 800);
        assert!(request.prompt.starts_with("Generate 3 quiz questions about \"Arithmetic\""));
    }

    #[tokio::test]
    async fn blank_inputs_are_rejected_before_any_call() {
        let (assistant, completion) =
            assistant(ScriptedCompletion::replying("x"), Arc::new(ScriptedSpeech::default()));

        assert!(matches!(
            assistant.process_voice_command("  ", &VoiceContext::default()).await,
            Err(PortError::Validation(_))
        ));
        assert!(matches!(
            assistant.generate_voice_quiz("", None, None).await,
            Err(PortError::Validation(_))
        ));
        assert!(completion.last_request().is_none());
    }

    #[test]
    fn speech_options_fall_back_to_configured_voice() {
        let (assistant, _) =
            assistant(ScriptedCompletion::replying("x"), Arc::new(ScriptedSpeech::default()));
        let resolved = assistant.resolve_speech_options(&SpeechOptions {
            speed: Some(1.5),
            ..SpeechOptions::default()
        });

        assert_eq!(resolved.speed, Some(1.5));
        assert_eq!(resolved.pitch, Some(1.0));
        assert_eq!(resolved.voice.as_deref(), Some("educational"));
        assert_eq!(resolved.emotion.as_deref(), Some("neutral"));
        assert_eq!(resolved.language.as_deref(), Some("en-US"));
    }

    #[tokio::test]
    async fn recognition_uses_the_configured_language_by_default() {
        let (assistant, _) =
            assistant(ScriptedCompletion::replying("x"), Arc::new(ScriptedSpeech::default()));
        let result = assistant
            .recognize_speech("base64-audio", &RecognitionOptions::default())
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.language.as_deref(), Some("en-US"));
    }

    #[tokio::test]
    async fn recognition_failures_are_reported_inside_the_result() {
        let assistant = VoiceAssistant::new(
            Arc::new(ScriptedCompletion::replying("x")),
            Arc::new(ScriptedSpeech::default()),
            Arc::new(ScriptedRecognition { fail: true }),
            VoiceSettings::default(),
        );
        let result = assistant
            .recognize_speech("base64-audio", &RecognitionOptions::default())
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("recognizer unavailable"));

        assert!(matches!(
            assistant.recognize_speech("", &RecognitionOptions::default()).await,
            Err(PortError::Validation(_))
        ));
    }
}

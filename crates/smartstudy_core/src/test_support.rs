//! In-memory doubles for the core ports, used by the unit tests in this crate.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::RwLock;

use crate::domain::{
    MaterialFilter, ParentUpdate, ProblemSolution, ProgressRecord, Quiz, RecognitionOptions,
    RecognitionResult, SpeechOptions, StudyMaterial, SynthesizedSpeech, TutorExplanation,
};
use crate::ports::{
    CompletionRequest, CompletionService, PortError, PortResult, SpeechRecognitionService,
    SpeechSynthesisService, StudyStore, TutorService,
};
use crate::quiz::build_quiz;

#[derive(Default)]
pub struct VecStore {
    materials: RwLock<Vec<StudyMaterial>>,
    quizzes: RwLock<Vec<Quiz>>,
    progress: RwLock<Vec<ProgressRecord>>,
    updates: RwLock<Vec<ParentUpdate>>,
}

#[async_trait]
impl StudyStore for VecStore {
    async fn add_material(&self, mut material: StudyMaterial) -> PortResult<StudyMaterial> {
        let mut materials = self.materials.write().await;
        material.id = materials.len() as u64 + 1;
        materials.push(material.clone());
        Ok(material)
    }

    async fn list_materials(&self, filter: &MaterialFilter) -> PortResult<Vec<StudyMaterial>> {
        let materials = self.materials.read().await;
        Ok(materials.iter().filter(|m| filter.matches(m)).cloned().collect())
    }

    async fn add_quiz(&self, mut quiz: Quiz) -> PortResult<Quiz> {
        let mut quizzes = self.quizzes.write().await;
        if let Some(last) = quizzes.last() {
            quiz.id = quiz.id.max(last.id + 1);
        }
        quizzes.push(quiz.clone());
        Ok(quiz)
    }

    async fn get_quiz(&self, quiz_id: u64) -> PortResult<Quiz> {
        let quizzes = self.quizzes.read().await;
        quizzes
            .iter()
            .find(|q| q.id == quiz_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound("Quiz not found".to_string()))
    }

    async fn add_progress(&self, mut record: ProgressRecord) -> PortResult<ProgressRecord> {
        let mut progress = self.progress.write().await;
        record.id = progress.len() as u64 + 1;
        progress.push(record.clone());
        Ok(record)
    }

    async fn progress_for_student(&self, student_id: &str) -> PortResult<Vec<ProgressRecord>> {
        let progress = self.progress.read().await;
        Ok(progress
            .iter()
            .filter(|r| r.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn add_parent_update(&self, update: ParentUpdate) -> PortResult<()> {
        self.updates.write().await.push(update);
        Ok(())
    }

    async fn parent_updates_for_student(
        &self,
        student_id: &str,
    ) -> PortResult<Vec<ParentUpdate>> {
        let updates = self.updates.read().await;
        Ok(updates
            .iter()
            .filter(|u| u.student_id == student_id)
            .cloned()
            .collect())
    }
}

pub struct FixedTutor {
    rng: Mutex<StdRng>,
}

impl Default for FixedTutor {
    fn default() -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(11)),
        }
    }
}

#[async_trait]
impl TutorService for FixedTutor {
    async fn explain(&self, topic: &str, level: &str, _context: &str) -> PortResult<TutorExplanation> {
        Ok(TutorExplanation {
            explanation: format!("{} explained", topic),
            examples: vec!["one".to_string(), "two".to_string()],
            key_points: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            difficulty: level.to_string(),
            estimated_time: 5,
        })
    }

    async fn solve(&self, problem: &str, steps: bool) -> PortResult<ProblemSolution> {
        Ok(ProblemSolution {
            solution: format!("Solved: {}", problem),
            steps: steps.then(|| vec!["step".to_string()]),
            explanation: String::new(),
            related_concepts: Vec::new(),
        })
    }

    async fn generate_quiz(
        &self,
        topic: &str,
        difficulty: &str,
        focus_area: &str,
        _student_level: &str,
    ) -> PortResult<Quiz> {
        let mut rng = self.rng.lock().unwrap();
        Ok(build_quiz(&mut *rng, topic, difficulty, focus_area))
    }

    async fn summarize_progress(
        &self,
        student_id: &str,
        records: &[ProgressRecord],
    ) -> PortResult<ParentUpdate> {
        Ok(ParentUpdate {
            student_id: student_id.to_string(),
            timestamp: Utc::now(),
            summary: format!("{} quizzes taken", records.len()),
            achievements: Vec::new(),
            areas_for_improvement: Vec::new(),
            recommendations: Vec::new(),
            next_steps: String::new(),
        })
    }
}

/// Records requests and returns a canned reply or error.
pub struct ScriptedCompletion {
    reply: Result<String, String>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletion {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, request: CompletionRequest) -> PortResult<String> {
        self.requests.lock().unwrap().push(request);
        self.reply.clone().map_err(PortError::Upstream)
    }
}

/// Records every text it is asked to speak.
#[derive(Default)]
pub struct ScriptedSpeech {
    fail: bool,
    spoken: Mutex<Vec<(String, SpeechOptions)>>,
}

impl ScriptedSpeech {
    pub fn failing() -> Self {
        Self {
            fail: true,
            spoken: Mutex::new(Vec::new()),
        }
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken
            .lock()
            .unwrap()
            .iter()
            .map(|(text, _)| text.clone())
            .collect()
    }

    pub fn last_options(&self) -> Option<SpeechOptions> {
        self.spoken.lock().unwrap().last().map(|(_, o)| o.clone())
    }
}

#[async_trait]
impl SpeechSynthesisService for ScriptedSpeech {
    async fn synthesize(&self, text: &str, options: &SpeechOptions) -> PortResult<SynthesizedSpeech> {
        if self.fail {
            return Err(PortError::Upstream("synthesis unavailable".to_string()));
        }
        self.spoken
            .lock()
            .unwrap()
            .push((text.to_string(), options.clone()));
        Ok(SynthesizedSpeech {
            audio: text.as_bytes().to_vec(),
            format: "wav".to_string(),
            duration: None,
        })
    }
}

#[derive(Default)]
pub struct ScriptedRecognition {
    pub fail: bool,
}

#[async_trait]
impl SpeechRecognitionService for ScriptedRecognition {
    async fn recognize(
        &self,
        _audio: &str,
        options: &RecognitionOptions,
    ) -> PortResult<RecognitionResult> {
        if self.fail {
            return Err(PortError::Upstream("recognizer unavailable".to_string()));
        }
        Ok(RecognitionResult {
            success: true,
            text: "heard".to_string(),
            confidence: Some(0.9),
            language: options.language.clone(),
            interim: false,
            error: None,
        })
    }
}

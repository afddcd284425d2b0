//! services/api/src/adapters/tutor_stub.rs
//!
//! A templated stand-in for a generative tutor. Content is fixed text around
//! the caller's inputs; the only randomness is the question type mix and the
//! estimated study time, both drawn from an injectable RNG.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use smartstudy_core::domain::{ParentUpdate, ProblemSolution, ProgressRecord, Quiz, TutorExplanation};
use smartstudy_core::ports::{PortError, PortResult, TutorService};
use smartstudy_core::quiz::build_quiz;

const SOLUTION_STEPS: [&str; 5] = [
    "Step 1: Understand the problem",
    "Step 2: Identify key concepts",
    "Step 3: Apply relevant formulas",
    "Step 4: Solve step by step",
    "Step 5: Verify the answer",
];

/// How an explanation is pitched for each supported level. Unknown levels use
/// the `high-school` register.
fn level_description(level: &str) -> &'static str {
    match level {
        "kid" => "simple and fun language with examples a child would understand",
        "advanced" => "detailed technical explanations with advanced concepts and applications",
        _ => "clear explanations with relevant examples and step-by-step breakdown",
    }
}

pub struct StubTutorAdapter {
    rng: Mutex<StdRng>,
}

impl StubTutorAdapter {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// A tutor whose random choices repeat for the same seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> PortResult<T> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| PortError::Unexpected("tutor RNG lock poisoned".to_string()))?;
        Ok(f(&mut *rng))
    }
}

impl Default for StubTutorAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TutorService for StubTutorAdapter {
    async fn explain(
        &self,
        topic: &str,
        level: &str,
        _context: &str,
    ) -> PortResult<TutorExplanation> {
        let estimated_time = self.with_rng(|rng| rng.random_range(5..15))?;
        Ok(TutorExplanation {
            explanation: format!(
                "Here's a {} level explanation of {}, using {}.",
                level,
                topic,
                level_description(level)
            ),
            examples: (1..=2)
                .map(|i| format!("Example {}: a {} level example about {}", i, level, topic))
                .collect(),
            key_points: (1..=3)
                .map(|i| format!("Key point {} about {}", i, topic))
                .collect(),
            difficulty: level.to_string(),
            estimated_time,
        })
    }

    async fn solve(&self, problem: &str, steps: bool) -> PortResult<ProblemSolution> {
        Ok(ProblemSolution {
            solution: format!("Complete solution to: {}", problem),
            steps: steps.then(|| SOLUTION_STEPS.iter().map(|s| s.to_string()).collect()),
            explanation: "Detailed explanation of the solution process".to_string(),
            related_concepts: (1..=3).map(|i| format!("Concept {}", i)).collect(),
        })
    }

    async fn generate_quiz(
        &self,
        topic: &str,
        difficulty: &str,
        focus_area: &str,
        _student_level: &str,
    ) -> PortResult<Quiz> {
        self.with_rng(|rng| build_quiz(rng, topic, difficulty, focus_area))
    }

    async fn summarize_progress(
        &self,
        student_id: &str,
        records: &[ProgressRecord],
    ) -> PortResult<ParentUpdate> {
        let passed = records.iter().filter(|r| r.passed).count();
        Ok(ParentUpdate {
            student_id: student_id.to_string(),
            timestamp: Utc::now(),
            summary: format!("Progress update for student {}", student_id),
            achievements: vec![
                format!("Completed {} quizzes, passing {}", records.len(), passed),
                "Improved in problem-solving skills".to_string(),
                "Showed good understanding of core concepts".to_string(),
            ],
            areas_for_improvement: vec![
                "Needs more practice with advanced topics".to_string(),
                "Could benefit from additional examples".to_string(),
            ],
            recommendations: vec![
                "Continue with current study plan".to_string(),
                "Focus on weak areas identified".to_string(),
                "Consider additional practice materials".to_string(),
            ],
            next_steps: "Continue with personalized learning path".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn explanations_have_fixed_shape_and_bounded_time() {
        let tutor = StubTutorAdapter::seeded(5);
        for _ in 0..30 {
            let explanation = tutor.explain("Gravity", "kid", "").await.unwrap();
            assert_eq!(explanation.examples.len(), 2);
            assert_eq!(explanation.key_points.len(), 3);
            assert_eq!(explanation.difficulty, "kid");
            assert!((5..=14).contains(&explanation.estimated_time));
            assert!(explanation.explanation.contains("a child would understand"));
        }
    }

    #[tokio::test]
    async fn steps_are_only_listed_when_requested() {
        let tutor = StubTutorAdapter::seeded(1);
        let with_steps = tutor.solve("2x = 4", true).await.unwrap();
        assert_eq!(with_steps.steps.map(|s| s.len()), Some(5));
        assert_eq!(with_steps.related_concepts.len(), 3);

        let without = tutor.solve("2x = 4", false).await.unwrap();
        assert!(without.steps.is_none());
    }

    #[tokio::test]
    async fn same_seed_gives_same_question_types() {
        let types = |quiz: Quiz| {
            quiz.questions
                .into_iter()
                .map(|q| q.question_type)
                .collect::<Vec<_>>()
        };
        let a = StubTutorAdapter::seeded(99)
            .generate_quiz("Cells", "easy", "", "high-school")
            .await
            .unwrap();
        let b = StubTutorAdapter::seeded(99)
            .generate_quiz("Cells", "easy", "", "high-school")
            .await
            .unwrap();
        assert_eq!(types(a), types(b));
    }
}

//! crates/smartstudy_core/src/progress.rs
//!
//! Progress aggregation and parent updates built from a student's progress records.

use std::sync::Arc;

use tracing::info;

use crate::domain::{ParentUpdate, ProgressRecord, ProgressReport, ProgressSummary};
use crate::ports::{PortResult, StudyStore, TutorService};

/// How many of the latest records are reported as recent activity.
pub const RECENT_ACTIVITY_LEN: usize = 5;

/// Summarizes a student's records, which must be in storage order.
///
/// Recent activity is the tail of the slice in storage order, which equals
/// submission order.
pub fn summarize(records: Vec<ProgressRecord>) -> ProgressReport {
    let total_quizzes = records.len();
    let average_score = if total_quizzes == 0 {
        0.0
    } else {
        records.iter().map(|r| r.score).sum::<f64>() / total_quizzes as f64
    };
    let passed_quizzes = records.iter().filter(|r| r.passed).count();
    let recent_activity = records[total_quizzes.saturating_sub(RECENT_ACTIVITY_LEN)..].to_vec();

    ProgressReport {
        progress: ProgressSummary {
            total_quizzes,
            average_score,
            passed_quizzes,
            recent_activity,
        },
        detailed_progress: records,
    }
}

/// Read-side view over stored progress, plus parent update generation.
#[derive(Clone)]
pub struct ProgressTracker {
    store: Arc<dyn StudyStore>,
    tutor: Arc<dyn TutorService>,
}

impl ProgressTracker {
    pub fn new(store: Arc<dyn StudyStore>, tutor: Arc<dyn TutorService>) -> Self {
        Self { store, tutor }
    }

    pub async fn get_progress(&self, student_id: &str) -> PortResult<ProgressReport> {
        let records = self.store.progress_for_student(student_id).await?;
        Ok(summarize(records))
    }

    /// Summarizes the student's progress through the tutor and stores the update.
    pub async fn generate_parent_update(&self, student_id: &str) -> PortResult<ParentUpdate> {
        let records = self.store.progress_for_student(student_id).await?;
        let update = self.tutor.summarize_progress(student_id, &records).await?;
        self.store.add_parent_update(update.clone()).await?;
        info!(
            "Generated parent update for student {} from {} records",
            student_id,
            records.len()
        );
        Ok(update)
    }

    pub async fn parent_updates(&self, student_id: &str) -> PortResult<Vec<ParentUpdate>> {
        self.store.parent_updates_for_student(student_id).await
    }
}

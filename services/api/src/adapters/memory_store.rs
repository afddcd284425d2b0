//! services/api/src/adapters/memory_store.rs
//!
//! In-process implementation of the storage ports. Every collection sits behind
//! its own `RwLock`, and ids are assigned while the write guard is held so two
//! concurrent inserts can never observe the same count.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use smartstudy_core::domain::{
    MaterialFilter, ParentUpdate, ProfileUpdate, ProgressRecord, Quiz, StudyMaterial, UserProfile,
};
use smartstudy_core::ports::{PortError, PortResult, ProfileStore, StudyStore};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
pub struct MemoryStore {
    materials: RwLock<Vec<StudyMaterial>>,
    quizzes: RwLock<Vec<Quiz>>,
    progress: RwLock<Vec<ProgressRecord>>,
    parent_updates: RwLock<Vec<ParentUpdate>>,
    profiles: RwLock<HashMap<String, UserProfile>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

//=========================================================================================
// `StudyStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl StudyStore for MemoryStore {
    async fn add_material(&self, mut material: StudyMaterial) -> PortResult<StudyMaterial> {
        let mut materials = self.materials.write().await;
        material.id = materials.len() as u64 + 1;
        materials.push(material.clone());
        debug!("Stored material {} ({})", material.id, material.original_name);
        Ok(material)
    }

    async fn list_materials(&self, filter: &MaterialFilter) -> PortResult<Vec<StudyMaterial>> {
        let materials = self.materials.read().await;
        Ok(materials
            .iter()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect())
    }

    /// Keeps the generated timestamp id unless it would collide with or precede
    /// the previous quiz, in which case it becomes `previous + 1`.
    async fn add_quiz(&self, mut quiz: Quiz) -> PortResult<Quiz> {
        let mut quizzes = self.quizzes.write().await;
        if let Some(previous) = quizzes.last() {
            quiz.id = quiz.id.max(previous.id + 1);
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
        self.parent_updates.write().await.push(update);
        Ok(())
    }

    async fn parent_updates_for_student(
        &self,
        student_id: &str,
    ) -> PortResult<Vec<ParentUpdate>> {
        let updates = self.parent_updates.read().await;
        Ok(updates
            .iter()
            .filter(|u| u.student_id == student_id)
            .cloned()
            .collect())
    }
}

//=========================================================================================
// `ProfileStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn create_profile(&self, profile: UserProfile) -> PortResult<UserProfile> {
        let mut profiles = self.profiles.write().await;
        if profiles.contains_key(&profile.uid) {
            return Err(PortError::Validation(format!(
                "Profile already exists for {}",
                profile.uid
            )));
        }
        profiles.insert(profile.uid.clone(), profile.clone());
        Ok(profile)
    }

    async fn get_profile(&self, uid: &str) -> PortResult<UserProfile> {
        self.profiles
            .read()
            .await
            .get(uid)
            .cloned()
            .ok_or_else(|| PortError::NotFound("User not found".to_string()))
    }

    async fn update_profile(&self, uid: &str, update: &ProfileUpdate) -> PortResult<UserProfile> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .get_mut(uid)
            .ok_or_else(|| PortError::NotFound("User not found".to_string()))?;
        update.apply_to(profile);
        Ok(profile.clone())
    }

    async fn touch_last_login(&self, uid: &str) -> PortResult<()> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .get_mut(uid)
            .ok_or_else(|| PortError::NotFound("User not found".to_string()))?;
        profile.last_login_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartstudy_core::domain::Role;
    use std::sync::Arc;

    fn material(subject: &str, grade: &str) -> StudyMaterial {
        StudyMaterial {
            id: 0,
            filename: "1-notes.pdf".to_string(),
            original_name: "notes.pdf".to_string(),
            storage_path: "uploads/1-notes.pdf".to_string(),
            uploaded_by: "uid-1".to_string(),
            subject: subject.to_string(),
            topic: "General".to_string(),
            grade: grade.to_string(),
            uploaded_at: Utc::now(),
            mime_type: "application/pdf".to_string(),
        }
    }

    fn profile(uid: &str) -> UserProfile {
        UserProfile {
            uid: uid.to_string(),
            username: "sam".to_string(),
            email: "sam@example.com".to_string(),
            display_name: "Sam".to_string(),
            role: Role::Student,
            grade: String::new(),
            subject: String::new(),
            photo_url: None,
            email_verified: false,
            provider: "email".to_string(),
            created_at: Utc::now(),
            last_login_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn concurrent_material_uploads_get_distinct_ids() {
        let store = Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..20)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.add_material(material("Math", "All")).await })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().id);
        }
        ids.sort_unstable();
        assert_eq!(ids, (1..=20).collect::<Vec<u64>>());
    }

    #[tokio::test]
    async fn material_filters_are_exact_matches() {
        let store = MemoryStore::new();
        store.add_material(material("Math", "7")).await.unwrap();
        store.add_material(material("Science", "7")).await.unwrap();
        store.add_material(material("Math", "8")).await.unwrap();

        let filter = MaterialFilter {
            subject: Some("Math".to_string()),
            ..MaterialFilter::default()
        };
        assert_eq!(store.list_materials(&filter).await.unwrap().len(), 2);

        let filter = MaterialFilter {
            subject: Some("math".to_string()),
            ..MaterialFilter::default()
        };
        assert!(store.list_materials(&filter).await.unwrap().is_empty());
        assert_eq!(
            store.list_materials(&MaterialFilter::default()).await.unwrap().len(),
            3
        );
    }

    #[tokio::test]
    async fn quiz_ids_are_strictly_increasing() {
        let store = MemoryStore::new();
        let mut ids = Vec::new();
        for _ in 0..3 {
            let quiz = Quiz {
                id: 1_000,
                topic: "t".to_string(),
                difficulty: "medium".to_string(),
                focus_area: String::new(),
                questions: Vec::new(),
                time_limit: 15,
                passing_score: 70.0,
            };
            ids.push(store.add_quiz(quiz).await.unwrap().id);
        }
        assert_eq!(ids, vec![1_000, 1_001, 1_002]);
        assert!(store.get_quiz(1_001).await.is_ok());
        assert!(matches!(store.get_quiz(7).await, Err(PortError::NotFound(_))));
    }

    #[tokio::test]
    async fn profile_updates_only_touch_present_fields() {
        let store = MemoryStore::new();
        store.create_profile(profile("uid-1")).await.unwrap();

        let update = ProfileUpdate {
            grade: Some("9".to_string()),
            ..ProfileUpdate::default()
        };
        let updated = store.update_profile("uid-1", &update).await.unwrap();
        assert_eq!(updated.grade, "9");
        assert_eq!(updated.username, "sam");

        assert!(store.create_profile(profile("uid-1")).await.is_err());
        assert!(matches!(
            store.get_profile("missing").await,
            Err(PortError::NotFound(_))
        ));
    }
}

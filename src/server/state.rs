//! Application state management

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::export::FsArtifactStore;
use crate::inference::Predictor;
use crate::training::{Trainer, TrainingReport};
use crate::utils::UploadStore;

use super::ServerConfig;

/// Training job status
#[derive(Debug, Clone, serde::Serialize)]
pub enum JobStatus {
    Pending,
    Running,
    Completed { report: TrainingReport },
    Failed { error: String },
}

impl JobStatus {
    /// Completed or failed
    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Completed { .. } | JobStatus::Failed { .. })
    }
}

/// Training job information
#[derive(Debug, Clone)]
pub struct TrainingJob {
    pub id: String,
    pub restaurant_id: String,
    pub menu_item: String,
    pub status: JobStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Application state shared across handlers
pub struct AppState {
    pub config: ServerConfig,
    pub store: Arc<FsArtifactStore>,
    pub uploads: UploadStore,
    pub trainer: Trainer,
    pub predictor: Predictor,
    pub jobs: RwLock<HashMap<String, TrainingJob>>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let store = Arc::new(FsArtifactStore::new(&config.models_dir));
        let predictor = Predictor::with_config(store.clone(), config.predictor.clone());

        Self {
            uploads: UploadStore::new(&config.uploads_dir),
            trainer: Trainer::new(config.trainer.clone()),
            store,
            predictor,
            jobs: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub fn generate_id() -> String {
        Uuid::new_v4().to_string()[..8].to_string()
    }

    /// Record a new pending job and return its ID
    pub async fn create_job(&self, restaurant_id: &str, menu_item: &str) -> String {
        let id = Self::generate_id();
        let job = TrainingJob {
            id: id.clone(),
            restaurant_id: restaurant_id.to_string(),
            menu_item: menu_item.to_string(),
            status: JobStatus::Pending,
            created_at: chrono::Utc::now(),
            finished_at: None,
        };
        self.jobs.write().await.insert(id.clone(), job);
        id
    }

    pub async fn set_job_status(&self, job_id: &str, status: JobStatus) {
        let mut jobs = self.jobs.write().await;
        let finished = status.is_finished();
        if let Some(job) = jobs.get_mut(job_id) {
            job.status = status;
            if finished {
                job.finished_at = Some(chrono::Utc::now());
            }
        }
        if finished {
            evict_finished(&mut jobs, self.config.max_finished_jobs);
        }
    }
}

/// Keep at most `keep` finished jobs, dropping the oldest first
fn evict_finished(jobs: &mut HashMap<String, TrainingJob>, keep: usize) {
    let mut finished: Vec<(chrono::DateTime<chrono::Utc>, String)> = jobs
        .values()
        .filter_map(|job| job.finished_at.map(|at| (at, job.id.clone())))
        .collect();
    if finished.len() <= keep {
        return;
    }

    finished.sort();
    let excess = finished.len() - keep;
    for (_, id) in finished.into_iter().take(excess) {
        jobs.remove(&id);
    }
    tracing::debug!(evicted = excess, "Evicted finished training jobs");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn state(dir: &TempDir, max_finished_jobs: usize) -> AppState {
        AppState::new(ServerConfig {
            models_dir: dir.path().join("models").to_string_lossy().into_owned(),
            uploads_dir: dir.path().join("uploads").to_string_lossy().into_owned(),
            max_finished_jobs,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_finished_jobs_are_capped() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, 2);

        let running = state.create_job("r1", "Idli").await;
        state.set_job_status(&running, JobStatus::Running).await;

        let mut finished = Vec::new();
        for item in ["Vada", "Upma", "Poha", "Dosa"] {
            let id = state.create_job("r1", item).await;
            state
                .set_job_status(&id, JobStatus::Failed { error: "boom".to_string() })
                .await;
            finished.push(id);
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let jobs = state.jobs.read().await;
        assert_eq!(jobs.len(), 3);
        assert!(jobs.contains_key(&running));
        assert!(!jobs.contains_key(&finished[0]));
        assert!(!jobs.contains_key(&finished[1]));
        assert!(jobs.contains_key(&finished[2]));
        assert!(jobs.contains_key(&finished[3]));
    }
}

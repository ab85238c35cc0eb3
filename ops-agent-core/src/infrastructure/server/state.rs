use super::dto::{TaskRecord, TrackedStatus};
use crate::application::{CheckPipeline, RunReport};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

/// Shared by every request. Runs never share state; only the tracker is locked.
pub struct ServerState {
    pipeline: Arc<CheckPipeline>,
    tracker: TaskTracker,
}

impl ServerState {
    pub fn new(pipeline: CheckPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            tracker: TaskTracker::default(),
        }
    }

    pub fn pipeline(&self) -> Arc<CheckPipeline> {
        Arc::clone(&self.pipeline)
    }

    pub fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }
}

/// Finished runs retained for `/status` and `/tasks`.
pub const MAX_TRACKED_RUNS: usize = 100;

/// In-memory record of triggered runs, oldest first.
///
/// Once more than `limit` records are held, the oldest finished ones are
/// evicted. Running records are never dropped.
pub struct TaskTracker {
    records: AsyncMutex<Vec<TaskRecord>>,
    limit: usize,
}

impl Default for TaskTracker {
    fn default() -> Self {
        Self::with_limit(MAX_TRACKED_RUNS)
    }
}

impl TaskTracker {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            records: AsyncMutex::new(Vec::new()),
            limit: limit.max(1),
        }
    }

    pub async fn start(&self, task_id: &str) {
        let mut records = self.records.lock().await;
        records.push(TaskRecord {
            task_id: task_id.to_string(),
            status: TrackedStatus::Running,
            start_time: Utc::now(),
            end_time: None,
            message: "Run in progress".to_string(),
            output: None,
            result: None,
            error: None,
        });
        while records.len() > self.limit {
            let Some(oldest) = records
                .iter()
                .position(|r| r.status != TrackedStatus::Running)
            else {
                break;
            };
            let evicted = records.remove(oldest);
            debug!(task_id = %evicted.task_id, "Evicted finished run from tracker");
        }
    }

    pub async fn complete(&self, task_id: &str, report: RunReport) {
        self.update(task_id, |record| {
            record.status = TrackedStatus::Completed;
            record.message = "Run completed".to_string();
            record.output = Some(report.output.clone());
            record.result = Some(report);
        })
        .await;
    }

    pub async fn fail(&self, task_id: &str, error: String) {
        self.update(task_id, |record| {
            record.status = TrackedStatus::Failed;
            record.message = "Run failed".to_string();
            record.error = Some(error);
        })
        .await;
    }

    async fn update<F>(&self, task_id: &str, apply: F)
    where
        F: FnOnce(&mut TaskRecord),
    {
        let mut records = self.records.lock().await;
        if let Some(record) = records.iter_mut().find(|r| r.task_id == task_id) {
            apply(record);
            record.end_time = Some(Utc::now());
        }
    }

    pub async fn get(&self, task_id: &str) -> Option<TaskRecord> {
        self.records
            .lock()
            .await
            .iter()
            .find(|r| r.task_id == task_id)
            .cloned()
    }

    /// Newest first.
    pub async fn list(&self) -> Vec<TaskRecord> {
        let mut records = self.records.lock().await.clone();
        records.reverse();
        records.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        records
    }
}

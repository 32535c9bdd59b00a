use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, broadcast};
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::error::{Result, UploadError};
use crate::storage::{ObjectStore, object_key};
use crate::store::StateStore;
use crate::types::{
    FilePayload, TaskPayloads, UploadId, UploadOutcome, UploadStatus, UploadTask, VideoMetadata,
};

/// Queue tuning. Bucket names live here so the pipeline stays storage-agnostic.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub video_bucket: String,
    pub thumbnail_bucket: String,
    /// Broadcast buffer; subscribers lagging past this lose snapshots.
    pub event_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            video_bucket: "videos".to_string(),
            thumbnail_bucket: "thumbnails".to_string(),
            event_capacity: 256,
        }
    }
}

#[derive(Default)]
struct Registry {
    tasks: HashMap<UploadId, UploadTask>,
    /// File bodies live outside the records so persistence never sees them.
    payloads: HashMap<UploadId, TaskPayloads>,
    /// Tasks currently in the transfer pipeline.
    active: HashSet<UploadId>,
}

/// The upload queue: task registry, transfer pipeline and connectivity
/// reactions in one constructed service.
///
/// All collaborators are injected, nothing global. Registry mutations are
/// serialized behind one lock; the transfer calls themselves run outside it,
/// so any number of `run_task` invocations may be in flight at once.
pub struct UploadQueue {
    registry: Mutex<Registry>,
    online: AtomicBool,
    events: broadcast::Sender<UploadTask>,
    storage: Arc<dyn ObjectStore>,
    state: Arc<dyn StateStore>,
    clock: Arc<dyn Clock>,
    config: QueueConfig,
}

impl UploadQueue {
    /// Builds the queue and restores the snapshot left by a previous process.
    ///
    /// Restored records lost their file bodies with the process that held
    /// them: `uploading` is downgraded to `paused` (no transfer can still be
    /// running), terminal records are dropped. A snapshot that fails to load
    /// is logged and treated as empty.
    pub async fn new(
        storage: Arc<dyn ObjectStore>,
        state: Arc<dyn StateStore>,
        clock: Arc<dyn Clock>,
        config: QueueConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity);
        let queue = Self {
            registry: Mutex::new(Registry::default()),
            online: AtomicBool::new(true),
            events,
            storage,
            state,
            clock,
            config,
        };

        queue.restore().await;
        queue
    }

    async fn restore(&self) {
        let records = match self.state.load().await {
            Ok(records) => records,
            Err(err) => {
                error!("failed to restore upload queue state: {err}");
                return;
            }
        };

        let mut registry = self.registry.lock().await;
        for mut task in records {
            if task.status == UploadStatus::Uploading {
                Self::set_status(&mut task, UploadStatus::Paused);
            }
            if !task.status.is_terminal() {
                registry.tasks.insert(task.id, task);
            }
        }
    }

    /// Every subscriber receives a snapshot of the task on each state change,
    /// independently of the others. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<UploadTask> {
        self.events.subscribe()
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }

    /// Registers a new task as `pending`. No validation of file size or type
    /// happens here; that stays with the caller.
    pub async fn create_task(
        &self,
        video: FilePayload,
        metadata: VideoMetadata,
        thumbnail: Option<FilePayload>,
    ) -> UploadTask {
        let task = UploadTask {
            id: UploadId::new(),
            file_name: video.file_name.clone(),
            file_size: video.len(),
            uploaded_size: 0,
            progress: 0,
            status: UploadStatus::Pending,
            metadata,
            started_at: self.clock.now(),
            paused_at: None,
            error: None,
        };

        let mut registry = self.registry.lock().await;
        registry
            .payloads
            .insert(task.id, TaskPayloads { video, thumbnail });
        registry.tasks.insert(task.id, task.clone());
        self.persist(&registry).await;
        self.notify(&task);

        task
    }

    /// Runs the transfer pipeline for one task.
    ///
    /// Returns `Ok(None)` when the offline pre-flight check parks the task
    /// back to `paused`, or when the task was paused or cancelled while a
    /// transfer was in flight. Transfer errors mark the task `failed` and are
    /// returned to the caller; so is the missing-payload error of a task
    /// restored from a snapshot.
    pub async fn run_task(&self, id: UploadId) -> Result<Option<UploadOutcome>> {
        let payloads = {
            let mut registry = self.registry.lock().await;
            let task = registry
                .tasks
                .get_mut(&id)
                .ok_or(UploadError::TaskNotFound(id))?;
            task.status = UploadStatus::Uploading;
            task.started_at = self.clock.now();
            let snapshot = task.clone();
            registry.active.insert(id);
            self.persist(&registry).await;
            self.notify(&snapshot);
            registry.payloads.get(&id).cloned()
        };

        // Pre-flight only; connectivity is not monitored during the transfer.
        if !self.is_online() {
            let mut registry = self.registry.lock().await;
            if let Some(task) = registry.tasks.get_mut(&id) {
                Self::set_status(task, UploadStatus::Paused);
                task.paused_at = Some(self.clock.now());
                let snapshot = task.clone();
                registry.active.remove(&id);
                self.persist(&registry).await;
                self.notify(&snapshot);
            }
            return Ok(None);
        }

        let Some(payloads) = payloads else {
            // Restored from a snapshot: the record survived the restart, the
            // bytes did not. Fail fast instead of uploading nothing.
            let err = UploadError::MissingPayload(id);
            self.fail_task(id, err.to_string()).await;
            return Err(err);
        };

        // The storage call reports no incremental progress, so the externally
        // visible numbers jump along fixed milestones: 50, 75, 100.
        self.advance(id, |task| {
            task.uploaded_size = task.file_size / 2;
            task.progress = 50;
        })
        .await;

        let video_key = object_key(id, &payloads.video.file_name);
        if let Err(err) = self
            .storage
            .put_object(
                &self.config.video_bucket,
                &video_key,
                payloads.video.content.clone(),
            )
            .await
        {
            self.fail_task(id, err.to_string()).await;
            return Err(err);
        }
        let video_url = self.storage.public_url(&self.config.video_bucket, &video_key);

        if !self.still_uploading(id).await {
            return Ok(None);
        }
        self.advance(id, |task| task.progress = 75).await;

        let mut thumbnail_url = None;
        if let Some(thumbnail) = &payloads.thumbnail {
            let key = object_key(id, &thumbnail.file_name);
            if let Err(err) = self
                .storage
                .put_object(&self.config.thumbnail_bucket, &key, thumbnail.content.clone())
                .await
            {
                self.fail_task(id, err.to_string()).await;
                return Err(err);
            }
            thumbnail_url = Some(self.storage.public_url(&self.config.thumbnail_bucket, &key));
        }

        let mut registry = self.registry.lock().await;
        match registry.tasks.get_mut(&id) {
            Some(task) if task.status == UploadStatus::Uploading => {
                task.uploaded_size = task.file_size;
                task.progress = 100;
                Self::set_status(task, UploadStatus::Completed);
                let snapshot = task.clone();
                registry.active.remove(&id);
                self.persist(&registry).await;
                self.notify(&snapshot);
            }
            // Paused or cancelled while the transfer was in flight; the blobs
            // reached storage but the task is no longer ours to complete.
            _ => return Ok(None),
        }

        Ok(Some(UploadOutcome {
            video_url,
            thumbnail_url,
        }))
    }

    /// Parks an in-flight task. No-op unless the task is currently
    /// `uploading`; a transfer call already issued is not aborted, the
    /// pipeline notices the new status at its next checkpoint.
    pub async fn pause(&self, id: UploadId) {
        let mut registry = self.registry.lock().await;
        let Some(task) = registry.tasks.get_mut(&id) else {
            return;
        };
        if task.status != UploadStatus::Uploading {
            return;
        }

        Self::set_status(task, UploadStatus::Paused);
        task.paused_at = Some(self.clock.now());
        let snapshot = task.clone();
        registry.active.remove(&id);
        self.persist(&registry).await;
        self.notify(&snapshot);
    }

    /// Re-queues a paused task for a fresh run. No-op unless the task is
    /// currently `paused`; rejected silently while offline.
    pub async fn resume(&self, id: UploadId) {
        let mut registry = self.registry.lock().await;
        let Some(task) = registry.tasks.get_mut(&id) else {
            return;
        };
        if task.status != UploadStatus::Paused {
            return;
        }
        if !self.is_online() {
            warn!(%id, "cannot resume upload while offline");
            return;
        }

        Self::set_status(task, UploadStatus::Pending);
        let snapshot = task.clone();
        self.persist(&registry).await;
        self.notify(&snapshot);
    }

    /// Drops the task unconditionally, whatever its status. A transfer
    /// already issued cannot be aborted; it still completes or fails against
    /// storage, just untracked.
    pub async fn cancel(&self, id: UploadId) {
        let mut registry = self.registry.lock().await;
        registry.tasks.remove(&id);
        registry.payloads.remove(&id);
        registry.active.remove(&id);
        self.persist(&registry).await;
    }

    /// Connectivity transitions fan out to the whole queue: going offline
    /// parks every in-flight task, coming back online re-queues everything
    /// paused. No-op when the flag does not actually change.
    pub async fn set_online(&self, online: bool) {
        if self.online.swap(online, Ordering::Relaxed) == online {
            return;
        }

        let mut registry = self.registry.lock().await;
        let mut snapshots = Vec::new();

        if online {
            info!("connection restored, re-queueing paused uploads");
            for task in registry.tasks.values_mut() {
                if task.status == UploadStatus::Paused {
                    Self::set_status(task, UploadStatus::Pending);
                    snapshots.push(task.clone());
                }
            }
        } else {
            info!("connection lost, pausing in-flight uploads");
            let active: Vec<_> = registry.active.drain().collect();
            for id in active {
                if let Some(task) = registry.tasks.get_mut(&id) {
                    if task.status == UploadStatus::Uploading {
                        Self::set_status(task, UploadStatus::Paused);
                        snapshots.push(task.clone());
                    }
                }
            }
        }

        self.persist(&registry).await;
        for snapshot in &snapshots {
            self.notify(snapshot);
        }
    }

    pub async fn get(&self, id: UploadId) -> Option<UploadTask> {
        self.registry.lock().await.tasks.get(&id).cloned()
    }

    pub async fn list_all(&self) -> Vec<UploadTask> {
        let registry = self.registry.lock().await;
        let mut tasks: Vec<_> = registry.tasks.values().cloned().collect();
        tasks.sort_by_key(|task| (task.started_at, task.id));

        tasks
    }

    /// Tasks still waiting for a run: `pending` and `paused`.
    pub async fn list_pending(&self) -> Vec<UploadTask> {
        self.list_all()
            .await
            .into_iter()
            .filter(|task| {
                matches!(task.status, UploadStatus::Pending | UploadStatus::Paused)
            })
            .collect()
    }

    fn set_status(task: &mut UploadTask, to: UploadStatus) {
        debug_assert!(
            UploadStatus::can_transition(task.status, to),
            "illegal transition {:?} -> {to:?}",
            task.status,
        );
        task.status = to;
    }

    async fn advance(&self, id: UploadId, update: impl FnOnce(&mut UploadTask)) {
        let mut registry = self.registry.lock().await;
        if let Some(task) = registry.tasks.get_mut(&id) {
            if task.status == UploadStatus::Uploading {
                update(task);
                let snapshot = task.clone();
                self.notify(&snapshot);
            }
        }
    }

    async fn still_uploading(&self, id: UploadId) -> bool {
        let registry = self.registry.lock().await;
        registry
            .tasks
            .get(&id)
            .is_some_and(|task| task.status == UploadStatus::Uploading)
    }

    /// Marks the task failed, unless it was paused or cancelled in the
    /// meantime.
    async fn fail_task(&self, id: UploadId, message: String) {
        let mut registry = self.registry.lock().await;
        let Some(task) = registry.tasks.get_mut(&id) else {
            return;
        };
        if task.status != UploadStatus::Uploading {
            return;
        }

        Self::set_status(task, UploadStatus::Failed);
        task.error = Some(message);
        let snapshot = task.clone();
        registry.active.remove(&id);
        self.persist(&registry).await;
        self.notify(&snapshot);
    }

    fn notify(&self, task: &UploadTask) {
        // No subscribers is fine.
        let _ = self.events.send(task.clone());
    }

    /// Snapshot the registry to the state store. Terminal records are not
    /// persisted; a restart only needs what could still run.
    async fn persist(&self, registry: &Registry) {
        let records: Vec<_> = registry
            .tasks
            .values()
            .filter(|task| !task.status.is_terminal())
            .cloned()
            .collect();

        if let Err(err) = self.state.save(&records).await {
            error!("failed to save upload queue state: {err}");
        }
    }
}

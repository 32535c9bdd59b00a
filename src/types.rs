use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier of an upload task, stable for the task's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct UploadId(Uuid);

impl UploadId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UploadId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UploadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    /// Waiting in the queue
    Pending,
    /// Transfer in flight
    Uploading,
    /// Parked by the user or by a connectivity loss
    Paused,
    /// All payloads stored
    Completed,
    /// Transfer error, terminal
    Failed,
}

impl UploadStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, UploadStatus::Completed | UploadStatus::Failed)
    }

    /// Edges of the task state machine. Everything else is invalid.
    pub fn can_transition(from: UploadStatus, to: UploadStatus) -> bool {
        use UploadStatus::*;

        matches!(
            (from, to),
            (Pending, Uploading)
                | (Uploading, Paused)
                | (Uploading, Completed)
                | (Uploading, Failed)
                | (Paused, Pending)
        )
    }
}

/// User-entered description of the video, immutable after task creation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub duration_secs: u64,
}

/// An in-memory file body. Never serialized; a restart loses it.
#[derive(Debug, Clone)]
pub struct FilePayload {
    pub file_name: String,
    pub content: Bytes,
}

impl FilePayload {
    pub fn new(file_name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
        }
    }

    pub fn len(&self) -> u64 {
        self.content.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// The binary halves of a task, kept out of the serializable record so a
/// snapshot never carries file bodies.
#[derive(Debug, Clone)]
pub struct TaskPayloads {
    pub video: FilePayload,
    pub thumbnail: Option<FilePayload>,
}

/// Upload task record. This is what observers receive and what persists.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadTask {
    pub id: UploadId,
    pub file_name: String,
    pub file_size: u64,
    pub uploaded_size: u64,
    /// 0-100, jumps along fixed milestones (see the pipeline)
    pub progress: u8,
    pub status: UploadStatus,
    pub metadata: VideoMetadata,
    pub started_at: DateTime<Utc>,
    pub paused_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Public URLs produced by a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub video_url: String,
    pub thumbnail_url: Option<String>,
}

const _: () = {
    const fn assert_send<T: Send>() {}
    assert_send::<UploadTask>();
    assert_send::<TaskPayloads>();
    assert_send::<UploadOutcome>();
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        use UploadStatus::*;

        // valid
        assert!(UploadStatus::can_transition(Pending, Uploading));
        assert!(UploadStatus::can_transition(Uploading, Paused));
        assert!(UploadStatus::can_transition(Uploading, Completed));
        assert!(UploadStatus::can_transition(Uploading, Failed));
        assert!(UploadStatus::can_transition(Paused, Pending));

        // invalid
        assert!(!UploadStatus::can_transition(Failed, Uploading));
        assert!(!UploadStatus::can_transition(Completed, Uploading));
        assert!(!UploadStatus::can_transition(Completed, Pending));
        assert!(!UploadStatus::can_transition(Uploading, Pending));
        assert!(!UploadStatus::can_transition(Paused, Uploading));
    }

    #[test]
    fn test_upload_id_generation() {
        let id1 = UploadId::new();
        let id2 = UploadId::new();

        assert_ne!(id1, id2);
        assert!(!id1.to_string().is_empty());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&UploadStatus::Pending).unwrap();
        assert_eq!(json, "\"pending\"");

        let back: UploadStatus = serde_json::from_str("\"uploading\"").unwrap();
        assert_eq!(back, UploadStatus::Uploading);
    }
}

pub mod clock;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod queue;
pub mod storage;
pub mod store;
pub mod types;

pub use clock::{Clock, SystemClock};
pub use config::Config;
pub use connectivity::ConnectivityWatcher;
pub use error::{Result, UploadError};
pub use queue::{QueueConfig, UploadQueue};
pub use storage::{HttpObjectStore, ObjectStore};
pub use store::{JsonFileStore, StateStore};
pub use types::{
    FilePayload, TaskPayloads, UploadId, UploadOutcome, UploadStatus, UploadTask, VideoMetadata,
};

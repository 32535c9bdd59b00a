use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use uplink::{
    Config, FilePayload, HttpObjectStore, JsonFileStore, QueueConfig, SystemClock, UploadQueue,
    VideoMetadata,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let path = std::env::args()
        .nth(1)
        .context("usage: uplink <video file>")?;
    let config = Config::load("config.toml")?;

    let storage = Arc::new(HttpObjectStore::new(
        &config.endpoint,
        config.token.clone(),
        Duration::from_secs(config.timeout_secs),
    )?);
    let state = Arc::new(JsonFileStore::new(
        config
            .state_file
            .clone()
            .unwrap_or_else(|| "uplink-state.json".into()),
    ));
    let queue = UploadQueue::new(
        storage,
        state,
        Arc::new(SystemClock),
        QueueConfig {
            video_bucket: config.video_bucket,
            thumbnail_bucket: config.thumbnail_bucket,
            ..QueueConfig::default()
        },
    )
    .await;

    let file_name = Path::new(&path)
        .file_name()
        .and_then(|name| name.to_str())
        .context("file name is not valid UTF-8")?
        .to_string();
    let content = tokio::fs::read(&path).await?;

    let metadata = VideoMetadata {
        title: file_name.clone(),
        description: String::new(),
        category: "uncategorized".to_string(),
        tags: Vec::new(),
        duration_secs: 0,
    };

    let task = queue
        .create_task(FilePayload::new(file_name, content), metadata, None)
        .await;
    match queue.run_task(task.id).await? {
        Some(outcome) => println!("Uploaded: {}", outcome.video_url),
        None => println!("Offline, upload parked as paused"),
    }

    Ok(())
}

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::queue::UploadQueue;

/// Bridges platform connectivity signals into the queue.
///
/// Wired once per process: one background task forwards every change of the
/// `watch` channel into [`UploadQueue::set_online`]. There is no polling
/// fallback; whatever feeds the channel is the single source of truth.
pub struct ConnectivityWatcher {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl ConnectivityWatcher {
    pub fn spawn(queue: Arc<UploadQueue>, mut signal: watch::Receiver<bool>) -> Self {
        let token = CancellationToken::new();
        let task_token = token.clone();

        let handle = tokio::spawn(async move {
            // Sync the flag with whatever the signal currently says.
            let initial = *signal.borrow();
            queue.set_online(initial).await;

            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    changed = signal.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let online = *signal.borrow_and_update();
                        queue.set_online(online).await;
                    }
                }
            }
        });

        Self { token, handle }
    }

    pub async fn shutdown(self) {
        self.token.cancel();
        let _ = self.handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::queue::QueueConfig;
    use crate::tests::{FakeObjectStore, MemoryStateStore};

    async fn wait_for_online(queue: &UploadQueue, online: bool) {
        for _ in 0..100 {
            if queue.is_online() == online {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("queue never became online={online}");
    }

    #[tokio::test]
    async fn test_watcher_forwards_connectivity_changes() {
        let queue = Arc::new(
            UploadQueue::new(
                Arc::new(FakeObjectStore::default()),
                Arc::new(MemoryStateStore::default()),
                Arc::new(SystemClock),
                QueueConfig::default(),
            )
            .await,
        );

        let (tx, rx) = watch::channel(true);
        let watcher = ConnectivityWatcher::spawn(queue.clone(), rx);

        tx.send(false).unwrap();
        wait_for_online(&queue, false).await;

        tx.send(true).unwrap();
        wait_for_online(&queue, true).await;

        watcher.shutdown().await;
    }
}

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

use super::{ChangeEvent, ChangeFeed, Subscription};
use crate::store::StoreResult;

const FEED_CAPACITY: usize = 256;

/// 进程内变更通道，配合 MemoryStore 使用
#[derive(Clone)]
pub struct MemoryChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl Default for MemoryChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryChangeFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(FEED_CAPACITY);
        Self { tx }
    }

    pub fn publish(&self, event: ChangeEvent) {
        // 没有订阅者时丢弃
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[async_trait]
impl ChangeFeed for MemoryChangeFeed {
    async fn subscribe(&self, group_id: &str) -> StoreResult<Subscription> {
        let mut rx = self.tx.subscribe();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let watched = group_id.to_string();

        let forwarder = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) if event.group_id == watched => {
                        if events_tx.send(event).is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("Change feed lagged, skipped {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(Subscription::new(group_id.to_string(), events_rx, forwarder))
    }
}

use async_trait::async_trait;
use futures_util::StreamExt;
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use tokio::sync::mpsc;

use super::{CHANGE_CHANNEL, ChangeEvent, ChangeFeed, Subscription};
use crate::store::StoreResult;

/// 基于 LISTEN/NOTIFY 的变更订阅，依赖 migrations 中的 user_locations 触发器
#[derive(Clone)]
pub struct PgChangeFeed {
    pool: PgPool,
}

impl PgChangeFeed {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChangeFeed for PgChangeFeed {
    async fn subscribe(&self, group_id: &str) -> StoreResult<Subscription> {
        // 每个订阅独占一个监听连接
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(CHANGE_CHANNEL).await?;
        tracing::debug!("Listening on {} for group {}", CHANGE_CHANNEL, group_id);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let watched = group_id.to_string();

        let forwarder = tokio::spawn(async move {
            let mut notifications = listener.into_stream();
            while let Some(item) = notifications.next().await {
                let notification = match item {
                    Ok(n) => n,
                    Err(e) => {
                        tracing::error!("Change feed for group {} failed: {}", watched, e);
                        break;
                    }
                };

                match serde_json::from_str::<ChangeEvent>(notification.payload()) {
                    Ok(event) if event.group_id == watched => {
                        if events_tx.send(event).is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(
                        "Ignoring malformed change payload {:?}: {}",
                        notification.payload(),
                        e
                    ),
                }
            }
        });

        Ok(Subscription::new(group_id.to_string(), events_rx, forwarder))
    }
}

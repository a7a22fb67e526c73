//! 成员表变更订阅
//!
//! 事件只说明某个群组的成员行发生了变化，不携带行数据；
//! 收到事件后由 [`bridge`] 重新拉取完整成员列表。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::store::StoreResult;

pub mod bridge;
mod memory;
mod pg;

pub use memory::MemoryChangeFeed;
pub use pg::PgChangeFeed;

/// 数据库触发器使用的 NOTIFY 通道名
pub const CHANGE_CHANNEL: &str = "user_locations_changes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub group_id: String,
    #[serde(rename = "op")]
    pub kind: ChangeKind,
}

/// 单个群组的订阅，drop 时停止转发任务
pub struct Subscription {
    group_id: String,
    events: mpsc::UnboundedReceiver<ChangeEvent>,
    forwarder: JoinHandle<()>,
}

impl Subscription {
    pub(crate) fn new(
        group_id: String,
        events: mpsc::UnboundedReceiver<ChangeEvent>,
        forwarder: JoinHandle<()>,
    ) -> Self {
        Self {
            group_id,
            events,
            forwarder,
        }
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// 下一条事件；底层连接结束后返回 None
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

#[async_trait]
pub trait ChangeFeed: Send + Sync {
    async fn subscribe(&self, group_id: &str) -> StoreResult<Subscription>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_payload_decodes() {
        let event: ChangeEvent =
            serde_json::from_str(r#"{"group_id":"ABC123","op":"DELETE"}"#).unwrap();
        assert_eq!(
            event,
            ChangeEvent {
                group_id: "ABC123".into(),
                kind: ChangeKind::Delete,
            }
        );
    }
}

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::Instrument;

use super::Subscription;
use crate::session::SessionHandle;
use crate::store::LocationStore;

/// 消费群组变更订阅，每收到一条事件就完整重新拉取一次成员列表
///
/// 订阅由调用方在首次拉取成员之前建立，首次拉取之后的变更都不会漏掉。
/// 不做合并或去抖：N 条事件对应 N 次拉取。
pub fn spawn_member_sync(
    store: Arc<dyn LocationStore>,
    session: SessionHandle,
    mut subscription: Subscription,
) -> JoinHandle<()> {
    let group_id = subscription.group_id().to_string();
    let span = tracing::info_span!("member_sync", group_id = %group_id);

    tokio::spawn(async move {
        while let Some(event) = subscription.next().await {
            tracing::debug!("Member change {:?} in group {}", event.kind, event.group_id);

            match store.list_members(&group_id).await {
                Ok(members) => {
                    if !session.set_members_for(&group_id, members) {
                        tracing::debug!("Session moved off group {}, stopping sync", group_id);
                        break;
                    }
                }
                Err(e) => tracing::error!("Error fetching members for {}: {}", group_id, e),
            }
        }

        tracing::debug!("Member sync for group {} finished", group_id);
    }.instrument(span))
}

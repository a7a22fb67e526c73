use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use super::{LocationStore, StoreError, StoreResult};
use crate::models::{Group, Member};
use crate::realtime::{ChangeEvent, ChangeKind, MemoryChangeFeed};

/// 进程内存储，行为与 PgStore 一致，写入时像数据库触发器一样发布变更事件
#[derive(Default)]
pub struct MemoryStore {
    groups: Mutex<HashMap<String, Group>>,
    members: Mutex<HashMap<String, Member>>,
    feed: Option<MemoryChangeFeed>,
    list_calls: AtomicUsize,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(feed: MemoryChangeFeed) -> Self {
        Self {
            feed: Some(feed),
            ..Self::default()
        }
    }

    /// list_members 被调用的次数
    pub fn list_members_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// 模拟远端不可用，之后所有调用都返回 Remote
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn member(&self, user_id: &str) -> Option<Member> {
        self.members.lock().get(user_id).cloned()
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::remote("remote store unavailable"))
        } else {
            Ok(())
        }
    }

    fn publish(&self, group_id: &str, kind: ChangeKind) {
        if let Some(feed) = &self.feed {
            feed.publish(ChangeEvent {
                group_id: group_id.to_string(),
                kind,
            });
        }
    }
}

#[async_trait]
impl LocationStore for MemoryStore {
    async fn create_group(&self, group: &Group) -> StoreResult<()> {
        self.check_available()?;
        let mut groups = self.groups.lock();
        if groups.contains_key(&group.group_id) {
            return Err(StoreError::Conflict(group.group_id.clone()));
        }
        groups.insert(group.group_id.clone(), group.clone());
        Ok(())
    }

    async fn find_group(&self, group_id: &str) -> StoreResult<Group> {
        self.check_available()?;
        self.groups
            .lock()
            .get(group_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(group_id.to_string()))
    }

    async fn upsert_member_location(&self, member: &Member) -> StoreResult<()> {
        self.check_available()?;
        let previous = self
            .members
            .lock()
            .insert(member.id.clone(), member.clone());

        // 成员换了群组时旧群组也会收到一次删除
        match previous {
            Some(old) if old.group_id != member.group_id => {
                self.publish(&old.group_id, ChangeKind::Delete);
                self.publish(&member.group_id, ChangeKind::Insert);
            }
            Some(_) => self.publish(&member.group_id, ChangeKind::Update),
            None => self.publish(&member.group_id, ChangeKind::Insert),
        }
        Ok(())
    }

    async fn list_members(&self, group_id: &str) -> StoreResult<Vec<Member>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self
            .members
            .lock()
            .values()
            .filter(|m| m.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn update_location(
        &self,
        user_id: &str,
        latitude: f64,
        longitude: f64,
    ) -> StoreResult<()> {
        self.check_available()?;
        let group_id = {
            let mut members = self.members.lock();
            match members.get_mut(user_id) {
                Some(member) => {
                    member.move_to(latitude, longitude, Utc::now());
                    Some(member.group_id.clone())
                }
                None => None,
            }
        };

        match group_id {
            Some(group_id) => self.publish(&group_id, ChangeKind::Update),
            None => tracing::debug!("Location update matched no row for user {}", user_id),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(id: &str, leader: &str) -> Group {
        Group {
            group_id: id.into(),
            leader_id: leader.into(),
            alert_distance: 100.0,
        }
    }

    #[tokio::test]
    async fn duplicate_group_keeps_the_original_leader() {
        let store = MemoryStore::new();
        store.create_group(&group("ABC123", "LEAD01")).await.unwrap();

        let err = store
            .create_group(&group("ABC123", "OTHER1"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(ref id) if id == "ABC123"));

        let stored = store.find_group("ABC123").await.unwrap();
        assert_eq!(stored.leader_id, "LEAD01");
    }

    #[tokio::test]
    async fn unknown_group_is_not_found() {
        let store = MemoryStore::new();
        let err = store.find_group("NOPE00").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn empty_group_lists_no_members() {
        let store = MemoryStore::new();
        store.create_group(&group("ABC123", "LEAD01")).await.unwrap();
        assert!(store.list_members("ABC123").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unavailable_store_surfaces_remote_errors() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let err = store.find_group("ABC123").await.unwrap_err();
        assert!(matches!(err, StoreError::Remote(_)));
    }
}

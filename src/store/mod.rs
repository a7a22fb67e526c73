use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Group, Member};

mod memory;
mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// 群组ID已存在
    #[error("group {0} already exists")]
    Conflict(String),
    /// 群组ID不存在
    #[error("group {0} not found")]
    NotFound(String),
    /// 传输或鉴权失败，原样交给调用方
    #[error("{0}")]
    Remote(Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn remote<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        StoreError::Remote(err.into())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Remote(Box::new(err))
    }
}

/// 远端群组/成员数据的读写，所有调用都不重试
#[async_trait]
pub trait LocationStore: Send + Sync {
    /// 新建群组，ID已存在时返回 Conflict 且不覆盖原有记录
    async fn create_group(&self, group: &Group) -> StoreResult<()>;

    async fn find_group(&self, group_id: &str) -> StoreResult<Group>;

    /// 按成员ID插入或整行更新
    async fn upsert_member_location(&self, member: &Member) -> StoreResult<()>;

    /// 列出群组内全部成员，空列表不是错误
    async fn list_members(&self, group_id: &str) -> StoreResult<Vec<Member>>;

    /// 只更新位置和时间戳
    async fn update_location(&self, user_id: &str, latitude: f64, longitude: f64)
    -> StoreResult<()>;
}

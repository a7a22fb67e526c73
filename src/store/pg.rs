use std::str::FromStr;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

use super::{LocationStore, StoreError, StoreResult};
use crate::config::Config;
use crate::models::{Group, GroupRow, Member};

/// 基于 Postgres 的远端存储
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &Config) -> StoreResult<Self> {
        let options = PgConnectOptions::from_str(&config.database_url)?
            .password(&config.database_access_key)
            .application_name("hagure");

        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 建表并安装变更通知触发器
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(StoreError::remote)
    }
}

#[async_trait]
impl LocationStore for PgStore {
    async fn create_group(&self, group: &Group) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO groups (id, leader_id, alert_distance)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(&group.group_id)
        .bind(&group.leader_id)
        .bind(group.alert_distance)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                tracing::warn!("Group id collision on create: {}", group.group_id);
                Err(StoreError::Conflict(group.group_id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_group(&self, group_id: &str) -> StoreResult<Group> {
        let row = sqlx::query_as::<_, GroupRow>(
            r#"
            SELECT id, leader_id, alert_distance::float8 AS alert_distance
            FROM groups
            WHERE id = $1
            "#,
        )
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Group::from)
            .ok_or_else(|| StoreError::NotFound(group_id.to_string()))
    }

    async fn upsert_member_location(&self, member: &Member) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_locations (
                id, group_id, name, icon_url, current_lat, current_lng, last_updated
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                group_id = EXCLUDED.group_id,
                name = EXCLUDED.name,
                icon_url = EXCLUDED.icon_url,
                current_lat = EXCLUDED.current_lat,
                current_lng = EXCLUDED.current_lng,
                last_updated = EXCLUDED.last_updated
            "#,
        )
        .bind(&member.id)
        .bind(&member.group_id)
        .bind(&member.name)
        .bind(&member.icon_url)
        .bind(member.current_lat)
        .bind(member.current_lng)
        .bind(member.last_updated)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_members(&self, group_id: &str) -> StoreResult<Vec<Member>> {
        let members = sqlx::query_as::<_, Member>(
            r#"
            SELECT
                id, group_id, name, icon_url,
                current_lat::float8 AS current_lat,
                current_lng::float8 AS current_lng,
                last_updated
            FROM user_locations
            WHERE group_id = $1
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }

    async fn update_location(
        &self,
        user_id: &str,
        latitude: f64,
        longitude: f64,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE user_locations
            SET current_lat = $2, current_lng = $3, last_updated = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(latitude)
        .bind(longitude)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::debug!("Location update matched no row for user {}", user_id);
        }

        Ok(())
    }
}

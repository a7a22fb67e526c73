use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use super::SessionView;
use crate::AppState;
use crate::error::AppError;
use crate::models::{AVATARS, Group, Member};
use crate::position::{self, Fix};
use crate::realtime::bridge;
use crate::utils::{generate_short_id, normalize_short_id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginMode {
    Join,
    Create,
}

#[derive(Debug, Clone)]
pub struct Login {
    pub name: String,
    pub icon_url: Option<String>,
    pub mode: LoginMode,
    /// 加入模式下必填
    pub group_id: Option<String>,
}

/// 当前会话的后台任务：成员同步和位置上报，drop 时一并取消
///
/// 订阅失败时没有成员同步任务。
pub struct Background {
    sync: Option<JoinHandle<()>>,
    reporter: JoinHandle<()>,
}

impl Drop for Background {
    fn drop(&mut self) {
        if let Some(sync) = &self.sync {
            sync.abort();
        }
        self.reporter.abort();
    }
}

/// 加入或创建群组并建立会话
///
/// 在会话切换之前的任何失败都不会改动现有会话。
pub async fn login(state: &AppState, login: Login) -> Result<SessionView, AppError> {
    let name = login.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("name is required".into()));
    }

    let join_code = match login.mode {
        LoginMode::Join => Some(
            login
                .group_id
                .as_deref()
                .and_then(normalize_short_id)
                .ok_or_else(|| AppError::Validation("group id is required to join".into()))?,
        ),
        LoginMode::Create => None,
    };

    let user_id = generate_short_id();
    let start = state
        .sensor
        .initial_position(
            state.config.initial_fix_timeout(),
            state.config.default_location(),
        )
        .await;

    let group = match join_code {
        None => {
            let group = Group {
                group_id: generate_short_id(),
                leader_id: user_id.clone(),
                alert_distance: state.config.default_alert_distance,
            };
            state.store.create_group(&group).await?;
            tracing::info!("Created group {} led by {}", group.group_id, user_id);
            group
        }
        Some(code) => {
            let group = state.store.find_group(&code).await?;
            tracing::info!("User {} joining group {}", user_id, group.group_id);
            group
        }
    };

    let user = Member {
        id: user_id,
        group_id: group.group_id.clone(),
        name: name.to_string(),
        icon_url: Some(
            login
                .icon_url
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(|| AVATARS[0].to_string()),
        ),
        current_lat: start.latitude,
        current_lng: start.longitude,
        last_updated: Utc::now(),
    };
    state.store.upsert_member_location(&user).await?;

    // 切换群组前先停掉旧会话的后台任务
    stop_background(state);

    // 先订阅再拉取，首次拉取之后的变更由同步任务补上
    let subscription = match state.feed.subscribe(&group.group_id).await {
        Ok(subscription) => Some(subscription),
        Err(e) => {
            tracing::error!("Failed to subscribe to group {}: {}", group.group_id, e);
            None
        }
    };

    let members = match state.store.list_members(&group.group_id).await {
        Ok(members) => members,
        Err(e) => {
            tracing::error!("Error fetching members for {}: {}", group.group_id, e);
            vec![user.clone()]
        }
    };

    let user_id = user.id.clone();
    state.session.begin(user, group, members);

    let background = Background {
        sync: subscription.map(|subscription| {
            bridge::spawn_member_sync(state.store.clone(), state.session.clone(), subscription)
        }),
        reporter: position::spawn_reporter(state.clone(), user_id),
    };
    *state.background.lock() = Some(background);

    state.session.snapshot().ok_or(AppError::NoSession)
}

/// 退出群组：取消后台任务并清空本地会话，远端成员行保留
pub fn leave_group(state: &AppState) {
    if let Some(user_id) = state.session.current_user_id() {
        tracing::info!("User {} left the group", user_id);
    }
    stop_background(state);
    state.session.leave_group();
}

fn stop_background(state: &AppState) {
    let previous = state.background.lock().take();
    drop(previous);
}

/// 两阶段位置更新：本地先生效并标记待确认，远端写入后确认或回滚
pub async fn update_member_location(
    state: &AppState,
    user_id: &str,
    fix: Fix,
) -> Result<(), AppError> {
    let Some(ticket) = state
        .session
        .apply_local_location(user_id, fix.latitude, fix.longitude)
    else {
        return Ok(());
    };

    match state
        .store
        .update_location(user_id, fix.latitude, fix.longitude)
        .await
    {
        Ok(()) => {
            state.session.confirm_location(&ticket);
            Ok(())
        }
        Err(e) => {
            if state.session.rollback_location(&ticket) {
                tracing::debug!("Rolled back local location for {}", user_id);
            }
            Err(e.into())
        }
    }
}

/// 手动上报位置：使用给定坐标，否则单次读取传感器
pub async fn report_position(
    state: &AppState,
    fix: Option<Fix>,
) -> Result<SessionView, AppError> {
    let user_id = state.session.current_user_id().ok_or(AppError::NoSession)?;

    let fix = match fix {
        Some(fix) => fix,
        None => {
            state
                .sensor
                .current_position(state.config.report_fix_timeout())
                .await?
        }
    };

    update_member_location(state, &user_id, fix).await?;
    state.session.snapshot().ok_or(AppError::NoSession)
}

/// SOS 只是本地显示状态，不写远端
pub fn set_sos(state: &AppState, active: bool) -> Result<SessionView, AppError> {
    let view = state.session.set_sos(active).ok_or(AppError::NoSession)?;
    if active {
        tracing::warn!("SOS raised by {}", view.current_user.id);
    } else {
        tracing::info!("SOS cancelled by {}", view.current_user.id);
    }
    Ok(view)
}

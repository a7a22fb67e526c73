//! 会话状态：当前用户、当前群组和成员列表
//!
//! 状态只保存在内存里，登录时建立，退出群组时清空。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::models::{Group, Member};
use crate::proximity::{AlertTransition, LostAlert, MemberStatus, member_statuses};

pub mod service;

#[derive(Debug, Clone, Copy, PartialEq)]
struct PreviousPosition {
    latitude: f64,
    longitude: f64,
    last_updated: DateTime<Utc>,
}

impl PreviousPosition {
    fn of(member: &Member) -> Self {
        Self {
            latitude: member.current_lat,
            longitude: member.current_lng,
            last_updated: member.last_updated,
        }
    }

    fn restore(&self, member: &mut Member) {
        member.move_to(self.latitude, self.longitude, self.last_updated);
    }
}

/// 一次尚未得到远端确认的本地位置更新
#[derive(Debug, Clone, PartialEq)]
pub struct LocationTicket {
    seq: u64,
    pub user_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub updated_at: DateTime<Utc>,
    previous_user: Option<PreviousPosition>,
    previous_member: Option<PreviousPosition>,
}

impl LocationTicket {
    fn still_applied_to(&self, member: &Member) -> bool {
        member.current_lat == self.latitude
            && member.current_lng == self.longitude
            && member.last_updated == self.updated_at
    }
}

#[derive(Debug, Default)]
pub struct Session {
    current_user: Option<Member>,
    current_group: Option<Group>,
    members: Vec<Member>,
    sos: bool,
    alert: LostAlert,
    pending: Option<LocationTicket>,
    next_seq: u64,
}

impl Session {
    fn reevaluate(&mut self) {
        let (Some(me), Some(group)) = (&self.current_user, &self.current_group) else {
            return;
        };

        match self.alert.evaluate(me, group, &self.members) {
            Some(AlertTransition::EnteredLost { distance }) => {
                // TODO: 接入推送，进入走失状态时通知群组成员
                tracing::warn!(
                    "Member {} is {:.0}m from leader {} (limit {:.0}m)",
                    me.id,
                    distance,
                    group.leader_id,
                    group.alert_distance
                );
            }
            Some(AlertTransition::Cleared) => {
                tracing::info!("Member {} is back within range of the leader", me.id);
            }
            None => {}
        }
    }

    fn view(&self) -> Option<SessionView> {
        let user = self.current_user.as_ref()?;
        let group = self.current_group.as_ref()?;

        Some(SessionView {
            current_user: user.clone(),
            current_group: group.clone(),
            members: member_statuses(group, &self.members, user),
            lost: self.alert.is_lost(),
            sos: self.sos,
            pending_location: self.pending.is_some(),
        })
    }
}

/// 提供给界面层的会话快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub current_user: Member,
    pub current_group: Group,
    pub members: Vec<MemberStatus>,
    pub lost: bool,
    pub sos: bool,
    pub pending_location: bool,
}

/// 会话状态句柄，通过 AppState 显式传递
///
/// 锁只在同步代码里短暂持有，不跨 await。
#[derive(Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<Session>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        let session = self.inner.read();
        session.current_user.is_some() && session.current_group.is_some()
    }

    pub fn current_user_id(&self) -> Option<String> {
        self.inner.read().current_user.as_ref().map(|u| u.id.clone())
    }

    pub fn current_group_id(&self) -> Option<String> {
        self.inner
            .read()
            .current_group
            .as_ref()
            .map(|g| g.group_id.clone())
    }

    pub fn is_lost(&self) -> bool {
        self.inner.read().alert.is_lost()
    }

    pub fn members(&self) -> Vec<Member> {
        self.inner.read().members.clone()
    }

    /// 登录成功后建立新会话，覆盖旧会话的全部字段
    pub fn begin(&self, user: Member, group: Group, members: Vec<Member>) {
        let mut session = self.inner.write();
        let next_seq = session.next_seq;
        *session = Session {
            current_user: Some(user),
            current_group: Some(group),
            members,
            next_seq,
            ..Session::default()
        };
        session.reevaluate();
    }

    /// 用重新拉取的成员列表替换本地列表；会话已切到其他群组时忽略
    pub fn set_members_for(&self, group_id: &str, members: Vec<Member>) -> bool {
        let mut session = self.inner.write();
        match &session.current_group {
            Some(group) if group.group_id == group_id => {
                session.members = members;
                session.reevaluate();
                true
            }
            _ => false,
        }
    }

    pub fn leave_group(&self) {
        let mut session = self.inner.write();
        let next_seq = session.next_seq;
        *session = Session {
            next_seq,
            ..Session::default()
        };
    }

    pub fn set_sos(&self, active: bool) -> Option<SessionView> {
        let mut session = self.inner.write();
        session.current_user.as_ref()?;
        session.sos = active;
        session.view()
    }

    /// 先在本地应用位置（成员列表和当前用户），标记为待确认
    ///
    /// 没有当前群组时只更新本地、不返回票据，也就不会写远端。
    pub fn apply_local_location(
        &self,
        user_id: &str,
        latitude: f64,
        longitude: f64,
    ) -> Option<LocationTicket> {
        let now = Utc::now();
        let mut session = self.inner.write();

        let mut previous_member = None;
        if let Some(member) = session.members.iter_mut().find(|m| m.id == user_id) {
            previous_member = Some(PreviousPosition::of(member));
            member.move_to(latitude, longitude, now);
        }

        let mut previous_user = None;
        if let Some(user) = session.current_user.as_mut().filter(|u| u.id == user_id) {
            previous_user = Some(PreviousPosition::of(user));
            user.move_to(latitude, longitude, now);
        }

        session.reevaluate();

        session.current_group.as_ref()?;

        session.next_seq += 1;
        let ticket = LocationTicket {
            seq: session.next_seq,
            user_id: user_id.to_string(),
            latitude,
            longitude,
            updated_at: now,
            previous_user,
            previous_member,
        };
        session.pending = Some(ticket.clone());
        Some(ticket)
    }

    /// 远端确认写入成功
    pub fn confirm_location(&self, ticket: &LocationTicket) {
        let mut session = self.inner.write();
        if session.pending.as_ref().map(|p| p.seq) == Some(ticket.seq) {
            session.pending = None;
        }
    }

    /// 远端写入失败时回滚；已被更新的采样或重新拉取覆盖的条目不动
    pub fn rollback_location(&self, ticket: &LocationTicket) -> bool {
        let mut session = self.inner.write();
        if session.pending.as_ref().map(|p| p.seq) != Some(ticket.seq) {
            return false;
        }
        session.pending = None;

        if let Some(previous) = &ticket.previous_member {
            if let Some(member) = session
                .members
                .iter_mut()
                .find(|m| m.id == ticket.user_id && ticket.still_applied_to(m))
            {
                previous.restore(member);
            }
        }

        if let Some(previous) = &ticket.previous_user {
            if let Some(user) = session
                .current_user
                .as_mut()
                .filter(|u| u.id == ticket.user_id && ticket.still_applied_to(u))
            {
                previous.restore(user);
            }
        }

        session.reevaluate();
        true
    }

    pub fn snapshot(&self) -> Option<SessionView> {
        self.inner.read().view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAT: f64 = 35.681236;
    const LNG: f64 = 139.767125;

    fn member(id: &str, lat: f64, lng: f64) -> Member {
        Member {
            id: id.into(),
            group_id: "GROUP1".into(),
            name: id.to_lowercase(),
            icon_url: None,
            current_lat: lat,
            current_lng: lng,
            last_updated: Utc::now(),
        }
    }

    fn group() -> Group {
        Group {
            group_id: "GROUP1".into(),
            leader_id: "LEADER".into(),
            alert_distance: 100.0,
        }
    }

    fn joined_member() -> SessionHandle {
        let session = SessionHandle::new();
        let me = member("MEMBER", LAT, LNG);
        session.begin(
            me.clone(),
            group(),
            vec![member("LEADER", LAT, LNG), me],
        );
        session
    }

    #[test]
    fn leave_group_resets_everything() {
        let session = joined_member();
        session.set_sos(true);
        assert!(session.is_active());

        session.leave_group();

        assert!(!session.is_active());
        assert_eq!(session.current_user_id(), None);
        assert_eq!(session.current_group_id(), None);
        assert!(session.members().is_empty());
        assert!(session.snapshot().is_none());
        assert!(!session.is_lost());
    }

    #[test]
    fn local_update_moves_user_and_member_entry() {
        let session = joined_member();
        let ticket = session
            .apply_local_location("MEMBER", LAT + 0.0005, LNG)
            .unwrap();

        let view = session.snapshot().unwrap();
        assert!(view.pending_location);
        assert_eq!(view.current_user.current_lat, LAT + 0.0005);
        let entry = view
            .members
            .iter()
            .find(|m| m.member.id == "MEMBER")
            .unwrap();
        assert_eq!(entry.member.current_lat, LAT + 0.0005);

        session.confirm_location(&ticket);
        assert!(!session.snapshot().unwrap().pending_location);
    }

    #[test]
    fn moving_away_raises_and_clears_the_alert() {
        let session = joined_member();

        session.apply_local_location("MEMBER", LAT + 0.00135, LNG);
        assert!(session.is_lost());

        session.apply_local_location("MEMBER", LAT + 0.0008, LNG);
        assert!(!session.is_lost());
    }

    #[test]
    fn rollback_restores_previous_position_and_alert() {
        let session = joined_member();
        let ticket = session
            .apply_local_location("MEMBER", LAT + 0.00135, LNG)
            .unwrap();
        assert!(session.is_lost());

        assert!(session.rollback_location(&ticket));

        let view = session.snapshot().unwrap();
        assert_eq!(view.current_user.current_lat, LAT);
        assert!(!view.pending_location);
        assert!(!view.lost);
    }

    #[test]
    fn stale_ticket_does_not_roll_back_a_newer_sample() {
        let session = joined_member();
        let first = session
            .apply_local_location("MEMBER", LAT + 0.0001, LNG)
            .unwrap();
        let second = session
            .apply_local_location("MEMBER", LAT + 0.0002, LNG)
            .unwrap();

        assert!(!session.rollback_location(&first));
        assert_eq!(
            session.snapshot().unwrap().current_user.current_lat,
            LAT + 0.0002
        );

        session.confirm_location(&second);
        assert!(!session.snapshot().unwrap().pending_location);
    }

    #[test]
    fn no_group_means_nothing_to_persist() {
        let session = SessionHandle::new();
        assert!(session.apply_local_location("MEMBER", LAT, LNG).is_none());
    }

    #[test]
    fn refetch_for_another_group_is_ignored() {
        let session = joined_member();
        let changed = session.set_members_for("OTHER1", vec![]);
        assert!(!changed);
        assert_eq!(session.members().len(), 2);
    }

    #[test]
    fn refetched_leader_position_reevaluates_alert() {
        let session = joined_member();
        let far_leader = member("LEADER", LAT + 0.002, LNG);
        session.set_members_for("GROUP1", vec![far_leader, member("MEMBER", LAT, LNG)]);
        assert!(session.is_lost());
    }

    #[test]
    fn snapshot_distances_follow_the_current_user() {
        let session = joined_member();
        session.apply_local_location("MEMBER", LAT + 0.0005, LNG);

        let view = session.snapshot().unwrap();
        let leader = view.members.iter().find(|m| m.is_leader).unwrap();
        let me = view
            .members
            .iter()
            .find(|m| m.member.id == "MEMBER")
            .unwrap();

        assert_eq!(me.distance_from_me, None);
        let distance = leader.distance_from_me.unwrap();
        assert!((50.0..=60.0).contains(&distance), "got {distance}");
    }
}

//! 走失判定：成员与领队的距离超过群组告警距离即为走失。
//!
//! 没有滞回区间，在阈值附近来回的位置每次重算都会翻转状态。

use serde::{Deserialize, Serialize};

use crate::models::{Group, Member};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Proximity {
    Ok,
    Lost,
}

/// 判定单个成员相对领队的状态，返回状态和距离（米）
pub fn classify(member: &Member, leader: &Member, alert_distance: f64) -> (Proximity, f64) {
    let distance = member.distance_to(leader);
    if member.id != leader.id && distance > alert_distance {
        (Proximity::Lost, distance)
    } else {
        (Proximity::Ok, distance)
    }
}

/// 地图标记用的成员状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberStatus {
    #[serde(flatten)]
    pub member: Member,
    pub is_leader: bool,
    /// 领队不在列表里时为空
    pub distance_to_leader: Option<f64>,
    /// 距当前用户的距离（米，取整），当前用户自己为空
    pub distance_from_me: Option<f64>,
    pub proximity: Proximity,
}

pub fn member_statuses(group: &Group, members: &[Member], me: &Member) -> Vec<MemberStatus> {
    let leader = members.iter().find(|m| m.id == group.leader_id);

    members
        .iter()
        .map(|member| {
            let (proximity, distance) = match leader {
                Some(leader) => {
                    let (p, d) = classify(member, leader, group.alert_distance);
                    (p, Some(d))
                }
                None => (Proximity::Ok, None),
            };
            MemberStatus {
                member: member.clone(),
                is_leader: member.id == group.leader_id,
                distance_to_leader: distance,
                distance_from_me: (member.id != me.id).then(|| member.distance_to(me).round()),
                proximity,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlertTransition {
    EnteredLost { distance: f64 },
    Cleared,
}

/// 当前用户的走失告警状态机
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LostAlert {
    lost: bool,
}

impl LostAlert {
    pub fn is_lost(&self) -> bool {
        self.lost
    }

    /// 用当前用户位置和成员列表里的领队位置重算
    ///
    /// 成员列表里找不到领队时保持原状态。
    pub fn evaluate(
        &mut self,
        me: &Member,
        group: &Group,
        members: &[Member],
    ) -> Option<AlertTransition> {
        let leader = members.iter().find(|m| m.id == group.leader_id)?;
        let (proximity, distance) = classify(me, leader, group.alert_distance);

        match (self.lost, proximity) {
            (false, Proximity::Lost) => {
                self.lost = true;
                Some(AlertTransition::EnteredLost { distance })
            }
            (true, Proximity::Ok) => {
                self.lost = false;
                Some(AlertTransition::Cleared)
            }
            _ => None,
        }
    }
}

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::DEFAULT_ALERT_DISTANCE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub group_id: String,
    pub leader_id: String,
    /// 离开领队超过该距离（米）即视为走失
    pub alert_distance: f64,
}

/// groups 表的原始行，alert_distance 可能为空
#[derive(Debug, FromRow)]
pub struct GroupRow {
    pub id: String,
    pub leader_id: String,
    pub alert_distance: Option<f64>,
}

impl From<GroupRow> for Group {
    fn from(row: GroupRow) -> Self {
        // 空值或非正数回落到默认距离，保证 alert_distance > 0
        let alert_distance = row
            .alert_distance
            .filter(|d| *d > 0.0)
            .unwrap_or(DEFAULT_ALERT_DISTANCE);

        Self {
            group_id: row.id,
            leader_id: row.leader_id,
            alert_distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_zero_alert_distance_falls_back_to_default() {
        for stored in [None, Some(0.0), Some(-5.0)] {
            let group = Group::from(GroupRow {
                id: "ABC123".into(),
                leader_id: "LEAD01".into(),
                alert_distance: stored,
            });
            assert_eq!(group.alert_distance, DEFAULT_ALERT_DISTANCE);
        }

        let group = Group::from(GroupRow {
            id: "ABC123".into(),
            leader_id: "LEAD01".into(),
            alert_distance: Some(250.0),
        });
        assert_eq!(group.alert_distance, 250.0);
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::position::Fix;

/// 群组成员及其最新位置，对应 user_locations 表的一行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Member {
    pub id: String,
    pub group_id: String,
    pub name: String,
    pub icon_url: Option<String>,
    pub current_lat: f64,
    pub current_lng: f64,
    pub last_updated: DateTime<Utc>,
}

impl Member {
    pub fn position(&self) -> Fix {
        Fix {
            latitude: self.current_lat,
            longitude: self.current_lng,
        }
    }

    pub(crate) fn move_to(&mut self, latitude: f64, longitude: f64, at: DateTime<Utc>) {
        self.current_lat = latitude;
        self.current_lng = longitude;
        self.last_updated = at;
    }

    pub fn distance_to(&self, other: &Member) -> f64 {
        let (a, b) = (self.position(), other.position());
        crate::utils::calculate_distance(a.latitude, a.longitude, b.latitude, b.longitude)
    }
}

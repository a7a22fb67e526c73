use axum::Json;
use uuid::Uuid;

use crate::result::ApiResponse;

/// 地球半径（米）
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// 短ID长度
pub const SHORT_ID_LEN: usize = 6;

const SHORT_ID_ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// 使用Haversine公式计算两点之间的大圆距离，单位米
pub fn calculate_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// 生成6位大写base36短码，用作群组ID和成员ID
///
/// 客户端生成，不做唯一性校验，冲突只靠远端主键约束兜底。
pub fn generate_short_id() -> String {
    let mut seed = Uuid::new_v4().as_u128();
    (0..SHORT_ID_LEN)
        .map(|_| {
            let c = SHORT_ID_ALPHABET[(seed % 36) as usize] as char;
            seed /= 36;
            c
        })
        .collect()
}

/// 用户输入的群组码：去掉首尾空白并转大写，空字符串视为未填写
pub fn normalize_short_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_uppercase())
    }
}

pub fn success_to_api_response<T>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code: error_codes::SUCCESS,
        msg: "success".into(),
        resp_data: Some(data),
    })
}

pub fn error_to_api_response<T>(code: i32, msg: String) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code,
        msg,
        resp_data: None,
    })
}

pub mod error_codes {
    pub const SUCCESS: i32 = 0;
    pub const VALIDATION_ERROR: i32 = 1000;
    pub const CONFLICT: i32 = 1001;
    pub const NO_SESSION: i32 = 1002;
    pub const NOT_FOUND: i32 = 1004;
    pub const SENSOR_ERROR: i32 = 1006;
    pub const REMOTE_ERROR: i32 = 5001;
    pub const INTERNAL_ERROR: i32 = 5000;
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKYO_STATION: (f64, f64) = (35.681236, 139.767125);

    fn relative_eq(a: f64, b: f64) -> bool {
        let scale = a.abs().max(b.abs()).max(1.0);
        (a - b).abs() / scale < 1e-6
    }

    #[test]
    fn distance_to_self_is_zero() {
        for (lat, lng) in [TOKYO_STATION, (0.0, 0.0), (-33.8688, 151.2093), (89.9, -179.9)] {
            assert_eq!(calculate_distance(lat, lng, lat, lng), 0.0);
        }
    }

    #[test]
    fn distance_is_symmetric() {
        let points = [
            TOKYO_STATION,
            (34.702485, 135.495951),
            (51.5074, -0.1278),
            (-22.9068, -43.1729),
            (0.0, 179.9),
            (0.0, -179.9),
        ];
        for &(lat1, lng1) in &points {
            for &(lat2, lng2) in &points {
                let ab = calculate_distance(lat1, lng1, lat2, lng2);
                let ba = calculate_distance(lat2, lng2, lat1, lng1);
                assert!(relative_eq(ab, ba), "{ab} != {ba}");
            }
        }
    }

    #[test]
    fn short_hop_north_of_tokyo_station() {
        let (lat, lng) = TOKYO_STATION;
        let d = calculate_distance(lat, lng, lat + 0.0005, lng);
        assert!((50.0..=60.0).contains(&d), "got {d}");
    }

    #[test]
    fn tokyo_to_osaka_is_about_400km() {
        let (lat, lng) = TOKYO_STATION;
        let d = calculate_distance(lat, lng, 34.702485, 135.495951);
        assert!((395_000.0..=410_000.0).contains(&d), "got {d}");
    }

    #[test]
    fn short_ids_are_six_uppercase_alphanumerics() {
        for _ in 0..200 {
            let id = generate_short_id();
            assert_eq!(id.len(), SHORT_ID_LEN);
            assert!(
                id.chars()
                    .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()),
                "{id}"
            );
        }
    }

    #[test]
    fn group_codes_are_trimmed_and_uppercased() {
        assert_eq!(normalize_short_id("  ab12cd "), Some("AB12CD".into()));
        assert_eq!(normalize_short_id("   "), None);
        assert_eq!(normalize_short_id(""), None);
    }
}

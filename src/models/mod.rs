mod group;
mod member;

pub use group::{Group, GroupRow};
pub use member::Member;

/// 默认告警距离（米）
pub const DEFAULT_ALERT_DISTANCE: f64 = 100.0;

/// 默认坐标：东京站，拿不到定位时使用
pub const DEFAULT_LATITUDE: f64 = 35.681236;
pub const DEFAULT_LONGITUDE: f64 = 139.767125;

/// 登录页可选的头像
pub const AVATARS: [&str; 5] = [
    "https://api.dicebear.com/7.x/avataaars/svg?seed=Felix&backgroundColor=b6e3f4",
    "https://api.dicebear.com/7.x/avataaars/svg?seed=Aneka&backgroundColor=c0aede",
    "https://api.dicebear.com/7.x/avataaars/svg?seed=John&backgroundColor=ffdfbf",
    "https://api.dicebear.com/7.x/avataaars/svg?seed=Sarah&backgroundColor=d1d4f9",
    "https://api.dicebear.com/7.x/avataaars/svg?seed=Mike&backgroundColor=c0aede",
];

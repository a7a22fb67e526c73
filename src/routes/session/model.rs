use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::position::Fix;
use crate::session::service::{Login, LoginMode};

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub name: String,
    pub icon_url: Option<String>,
    pub mode: LoginMode,
    pub group_id: Option<String>,
}

impl From<LoginRequest> for Login {
    fn from(req: LoginRequest) -> Self {
        Self {
            name: req.name,
            icon_url: req.icon_url,
            mode: req.mode,
            group_id: req.group_id,
        }
    }
}

/// 手动上报位置；坐标都为空时读取一次传感器
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ReportRequest {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl ReportRequest {
    pub fn fix(&self) -> Result<Option<Fix>, AppError> {
        match (self.latitude, self.longitude) {
            (None, None) => Ok(None),
            (Some(latitude), Some(longitude)) => {
                let fix = Fix {
                    latitude,
                    longitude,
                };
                if fix.is_valid() {
                    Ok(Some(fix))
                } else {
                    Err(AppError::Validation("coordinates out of range".into()))
                }
            }
            _ => Err(AppError::Validation(
                "latitude and longitude must be given together".into(),
            )),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SosRequest {
    pub active: bool,
}

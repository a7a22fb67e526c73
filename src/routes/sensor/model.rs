use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::position::{Fix, PositionSample, SensorError};

/// 设备推送的一次定位采样：坐标或失败原因
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleRequest {
    Fix { latitude: f64, longitude: f64 },
    Failed { error: SensorError },
}

impl TryFrom<SampleRequest> for PositionSample {
    type Error = AppError;

    fn try_from(req: SampleRequest) -> Result<Self, Self::Error> {
        match req {
            SampleRequest::Fix {
                latitude,
                longitude,
            } => {
                let fix = Fix {
                    latitude,
                    longitude,
                };
                if !fix.is_valid() {
                    return Err(AppError::Validation("coordinates out of range".into()));
                }
                Ok(PositionSample::Fix(fix))
            }
            SampleRequest::Failed { error } => Ok(PositionSample::Failed(error)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SampleResponse {
    /// 收到该采样的监听者数量
    pub delivered_to: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_fix_and_failure_payloads() {
        let fix: SampleRequest =
            serde_json::from_str(r#"{"latitude":35.68,"longitude":139.76}"#).unwrap();
        assert!(matches!(
            PositionSample::try_from(fix),
            Ok(PositionSample::Fix(_))
        ));

        let failed: SampleRequest =
            serde_json::from_str(r#"{"error":"permission_denied"}"#).unwrap();
        assert!(matches!(
            PositionSample::try_from(failed),
            Ok(PositionSample::Failed(SensorError::PermissionDenied))
        ));
    }
}

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::AppState;
use crate::session::service;

const SENSOR_CAPACITY: usize = 64;

/// WGS84 坐标
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
}

impl Fix {
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorError {
    #[error("geolocation permission denied")]
    PermissionDenied,
    #[error("position unavailable")]
    PositionUnavailable,
    #[error("timed out waiting for a position fix")]
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionSample {
    Fix(Fix),
    Failed(SensorError),
}

/// 设备定位采样的广播中心，设备端把每次采样推进来
#[derive(Clone)]
pub struct Sensor {
    tx: broadcast::Sender<PositionSample>,
}

impl Default for Sensor {
    fn default() -> Self {
        Self::new()
    }
}

impl Sensor {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(SENSOR_CAPACITY);
        Self { tx }
    }

    /// 返回收到该采样的监听者数量
    pub fn publish(&self, sample: PositionSample) -> usize {
        self.tx.send(sample).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PositionSample> {
        self.tx.subscribe()
    }

    pub fn watcher_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// 单次取位置：等待下一次采样，最多等待 `wait`
    pub async fn current_position(&self, wait: Duration) -> Result<Fix, SensorError> {
        let mut rx = self.subscribe();
        let next = async {
            loop {
                match rx.recv().await {
                    Ok(PositionSample::Fix(fix)) => return Ok(fix),
                    Ok(PositionSample::Failed(e)) => return Err(e),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(SensorError::PositionUnavailable);
                    }
                }
            }
        };

        tokio::time::timeout(wait, next)
            .await
            .unwrap_or(Err(SensorError::Timeout))
    }

    /// 登录时取初始位置，失败或超时静默回落到 `fallback`
    pub async fn initial_position(&self, wait: Duration, fallback: Fix) -> Fix {
        match self.current_position(wait).await {
            Ok(fix) => fix,
            Err(e) => {
                tracing::debug!("Initial position unavailable ({}), using default", e);
                fallback
            }
        }
    }
}

/// 持续监听定位采样并上报当前用户位置，直到任务被取消
///
/// 单次采样失败或上报失败只记录日志，由下一次采样覆盖。
pub fn spawn_reporter(state: AppState, user_id: String) -> JoinHandle<()> {
    let mut rx = state.sensor.subscribe();

    let span = tracing::info_span!("reporter", user_id = %user_id);

    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(PositionSample::Fix(fix)) => {
                    if let Err(e) = service::update_member_location(&state, &user_id, fix).await {
                        tracing::error!("Failed to report location for {}: {}", user_id, e);
                    }
                }
                Ok(PositionSample::Failed(e)) => {
                    tracing::warn!("Geolocation error: {}", e);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Position reporter lagged, skipped {} samples", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }.instrument(span))
}

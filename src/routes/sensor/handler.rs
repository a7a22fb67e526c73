use axum::extract::{Json, State};

use super::model::{SampleRequest, SampleResponse};
use crate::AppState;
use crate::error::AppError;
use crate::position::PositionSample;
use crate::result::ApiResponse;
use crate::utils::success_to_api_response;

#[axum::debug_handler]
pub async fn push_sample(
    State(state): State<AppState>,
    Json(req): Json<SampleRequest>,
) -> Result<Json<ApiResponse<SampleResponse>>, AppError> {
    let sample = PositionSample::try_from(req)?;
    let delivered_to = state.sensor.publish(sample);
    tracing::trace!("Position sample delivered to {} watchers", delivered_to);
    Ok(success_to_api_response(SampleResponse { delivered_to }))
}

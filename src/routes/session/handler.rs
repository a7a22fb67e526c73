use axum::extract::{Json, State};

use super::model::{LoginRequest, ReportRequest, SosRequest};
use crate::AppState;
use crate::error::AppError;
use crate::models::AVATARS;
use crate::result::{ApiResponse, EmptyResponse};
use crate::session::{SessionView, service};
use crate::utils::success_to_api_response;

type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

#[axum::debug_handler]
pub async fn avatars() -> Json<ApiResponse<Vec<String>>> {
    success_to_api_response(AVATARS.iter().map(|a| a.to_string()).collect())
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<SessionView> {
    let view = service::login(&state, req.into()).await?;
    Ok(success_to_api_response(view))
}

#[axum::debug_handler]
pub async fn current(State(state): State<AppState>) -> ApiResult<SessionView> {
    let view = state.session.snapshot().ok_or(AppError::NoSession)?;
    Ok(success_to_api_response(view))
}

#[axum::debug_handler]
pub async fn leave(State(state): State<AppState>) -> ApiResult<EmptyResponse> {
    service::leave_group(&state);
    Ok(success_to_api_response(EmptyResponse {}))
}

#[axum::debug_handler]
pub async fn sos(
    State(state): State<AppState>,
    Json(req): Json<SosRequest>,
) -> ApiResult<SessionView> {
    let view = service::set_sos(&state, req.active)?;
    Ok(success_to_api_response(view))
}

#[axum::debug_handler]
pub async fn report(
    State(state): State<AppState>,
    Json(req): Json<ReportRequest>,
) -> ApiResult<SessionView> {
    let view = service::report_position(&state, req.fix()?).await?;
    Ok(success_to_api_response(view))
}

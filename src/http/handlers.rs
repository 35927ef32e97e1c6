//! Request handlers for the presentation API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::exchange::{Direction, EngineView, ExchangeTransaction, Quote};
use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::session::Session;

#[derive(Debug, Deserialize)]
pub struct IntentRequest {
    #[serde(default)]
    pub direction: Direction,
    pub amount: String,
}

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub session: Session,
}

pub async fn get_status(State(state): State<AppState>) -> Json<EngineView> {
    Json(state.engine.view().await)
}

pub async fn connect(State(state): State<AppState>) -> Result<Json<ConnectResponse>, ApiError> {
    let session = state.engine.connect().await?;
    Ok(Json(ConnectResponse { session }))
}

pub async fn disconnect(State(state): State<AppState>) -> StatusCode {
    state.engine.disconnect().await;
    StatusCode::NO_CONTENT
}

pub async fn set_intent(
    State(state): State<AppState>,
    Json(request): Json<IntentRequest>,
) -> Result<Json<Quote>, ApiError> {
    let quote = state
        .engine
        .set_amount(request.direction, &request.amount)
        .await?;
    Ok(Json(quote))
}

pub async fn set_max(State(state): State<AppState>) -> Result<Json<Quote>, ApiError> {
    Ok(Json(state.engine.set_max().await?))
}

pub async fn toggle_direction(State(state): State<AppState>) -> Result<Json<Quote>, ApiError> {
    Ok(Json(state.engine.toggle_direction().await?))
}

pub async fn execute(
    State(state): State<AppState>,
) -> Result<Json<ExchangeTransaction>, ApiError> {
    Ok(Json(state.engine.execute().await?))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match state.engine.transaction(&id) {
        Some(tx) => (StatusCode::OK, Json(tx)).into_response(),
        None => (StatusCode::NOT_FOUND, "Transaction not found").into_response(),
    }
}

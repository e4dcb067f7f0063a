use axum::extract::State;
use bytes::Bytes;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::counter::service;
use crate::error::AppError;
use crate::proxy::AppState;
use crate::response::Envelope;

pub async fn update_count(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Envelope, AppError> {
    let params: Map<String, Value> = serde_json::from_slice(&body)?;

    match params.get("action").map(Value::as_str) {
        None => Err(AppError::MissingAction),
        Some(Some("inc")) => {
            let count = service::increment(&state.db).await?;
            Ok(Envelope::success(count))
        }
        Some(Some("clear")) => {
            service::clear(&state.db).await?;
            Ok(Envelope::success_empty())
        }
        Some(_) => Err(AppError::InvalidAction),
    }
}

pub async fn get_count(State(state): State<Arc<AppState>>) -> Result<Envelope, AppError> {
    let count = service::read(&state.db).await?;
    Ok(Envelope::success(count))
}

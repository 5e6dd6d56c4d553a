//! Routing config CRUD under `/api/config`.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use casparlink_core::{ConfigSnapshot, InputRecord, InputUpdate, OutputRecord, OutputUpdate};
use serde_json::{Value, json};

use super::AppState;
use super::error::ApiError;

type Body<T> = Result<Json<T>, JsonRejection>;

pub async fn snapshot(State(state): State<AppState>) -> Result<Json<ConfigSnapshot>, ApiError> {
    Ok(Json(state.manager.config_service().snapshot().await?))
}

pub async fn list_inputs(State(state): State<AppState>) -> Result<Json<Vec<InputRecord>>, ApiError> {
    Ok(Json(state.manager.config_service().inputs().await?))
}

pub async fn list_outputs(State(state): State<AppState>) -> Result<Json<Vec<OutputRecord>>, ApiError> {
    Ok(Json(state.manager.config_service().outputs().await?))
}

// ── Inputs ───────────────────────────────────────────────────────────

pub async fn create_input(
    State(state): State<AppState>,
    body: Body<InputRecord>,
) -> Result<Json<Value>, ApiError> {
    let Json(input) = body?;
    let input = state.manager.config_service().create_input(input).await?;
    Ok(Json(json!({ "success": true, "input": input })))
}

pub async fn update_input(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Body<InputUpdate>,
) -> Result<Json<Value>, ApiError> {
    let Json(update) = body?;
    let input = state.manager.config_service().update_input(&id, update).await?;
    Ok(Json(json!({ "success": true, "input": input })))
}

pub async fn delete_input(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.manager.config_service().delete_input(&id).await?;
    Ok(Json(json!({ "success": true })))
}

// ── Outputs ──────────────────────────────────────────────────────────

pub async fn create_output(
    State(state): State<AppState>,
    body: Body<OutputRecord>,
) -> Result<Json<Value>, ApiError> {
    let Json(output) = body?;
    let output = state.manager.config_service().create_output(output).await?;
    Ok(Json(json!({ "success": true, "output": output })))
}

pub async fn update_output(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Body<OutputUpdate>,
) -> Result<Json<Value>, ApiError> {
    let Json(update) = body?;
    let output = state.manager.config_service().update_output(&id, update).await?;
    Ok(Json(json!({ "success": true, "output": output })))
}

pub async fn delete_output(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.manager.config_service().delete_output(&id).await?;
    Ok(Json(json!({ "success": true })))
}

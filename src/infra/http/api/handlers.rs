use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::domain::properties::PropertyDraft;
use crate::infra::http::HttpState;

use super::error::ApiError;

fn parse_draft(
    payload: Result<Json<PropertyDraft>, JsonRejection>,
) -> Result<PropertyDraft, ApiError> {
    payload.map(|Json(draft)| draft).map_err(|rejection| {
        ApiError::bad_request("Invalid request body", Some(rejection.body_text()))
    })
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw)
        .map_err(|err| ApiError::bad_request("Invalid property id", Some(err.to_string())))
}

pub async fn create_property(
    State(state): State<HttpState>,
    payload: Result<Json<PropertyDraft>, JsonRejection>,
) -> Result<Response, ApiError> {
    let draft = parse_draft(payload)?;
    let record = state.store.create(draft).await?;
    Ok((StatusCode::CREATED, Json(record)).into_response())
}

pub async fn update_property(
    State(state): State<HttpState>,
    Path(id): Path<String>,
    payload: Result<Json<PropertyDraft>, JsonRejection>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let draft = parse_draft(payload)?;
    let record = state.store.update(id, draft).await?;
    Ok(Json(record).into_response())
}

pub async fn delete_property(
    State(state): State<HttpState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let record = state.store.delete(id).await?;
    Ok(Json(record).into_response())
}

pub async fn get_property(
    State(state): State<HttpState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let record = state
        .store
        .find(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Property not found"))?;
    Ok(Json(record).into_response())
}

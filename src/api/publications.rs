use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ApiError;
use super::AppState;
use crate::entity::{NewPublication, PublicationConfig};
use crate::validation::{parse_uuid, ValidationError};

/// Body of `POST /publications` and `PUT /publications/{uuid}`.
///
/// `config` stays untyped until `publication_type` has been checked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicationRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub language_code: String,
    #[serde(default)]
    pub publisher_uuid: Uuid,
    #[serde(default)]
    pub publication_type: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

impl TryFrom<PublicationRequest> for NewPublication {
    type Error = ValidationError;

    fn try_from(request: PublicationRequest) -> Result<Self, Self::Error> {
        if request.publication_type.is_empty() {
            return Err(ValidationError::Missing("publication_type"));
        }
        let config = PublicationConfig::decode(&request.publication_type, request.config)?;
        Ok(NewPublication {
            name: request.name,
            description: request.description,
            language_code: request.language_code,
            publisher_id: request.publisher_uuid,
            config,
        })
    }
}

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_publications).post(create_publication))
        .route(
            "/{publication_uuid}",
            get(get_publication)
                .put(update_publication)
                .delete(delete_publication),
        )
}

async fn get_publications(State(state): State<AppState>) -> Result<Response, ApiError> {
    state
        .cache
        .json("/publications", || state.service.get_publications())
        .await
}

async fn create_publication(
    State(state): State<AppState>,
    payload: Result<Json<PublicationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let input = NewPublication::try_from(request)?;
    let publication = state.service.create_publication(input).await?;
    state.cache.clear();
    Ok((StatusCode::CREATED, Json(publication)))
}

async fn get_publication(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_uuid(&raw)?;
    let publication = state
        .service
        .get_publication(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(publication))
}

async fn update_publication(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    payload: Result<Json<PublicationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_uuid(&raw)?;
    let Json(request) = payload?;
    let input = NewPublication::try_from(request)?;
    let result = state.service.update_publication(id, input).await;
    // A failed feed update may still have touched the row.
    state.cache.clear();
    Ok(Json(result?))
}

async fn delete_publication(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_uuid(&raw)?;
    state.service.delete_publication(id).await?;
    state.cache.clear();
    Ok(StatusCode::NO_CONTENT)
}

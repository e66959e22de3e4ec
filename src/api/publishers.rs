use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use super::error::ApiError;
use super::AppState;
use crate::entity::NewPublisher;
use crate::validation::parse_uuid;

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_publishers).post(create_publisher))
        .route(
            "/{publisher_uuid}",
            get(get_publisher)
                .put(update_publisher)
                .delete(delete_publisher),
        )
        .route(
            "/{publisher_uuid}/publications",
            get(get_publisher_publications),
        )
}

async fn get_publishers(State(state): State<AppState>) -> Result<Response, ApiError> {
    state
        .cache
        .json("/publishers", || state.service.get_publishers())
        .await
}

async fn create_publisher(
    State(state): State<AppState>,
    payload: Result<Json<NewPublisher>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(input) = payload?;
    let publisher = state.service.create_publisher(input).await?;
    state.cache.clear();
    Ok((StatusCode::CREATED, Json(publisher)))
}

async fn get_publisher(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_uuid(&raw)?;
    let publisher = state
        .service
        .get_publisher(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(publisher))
}

async fn update_publisher(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    payload: Result<Json<NewPublisher>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_uuid(&raw)?;
    let Json(input) = payload?;
    let publisher = state.service.update_publisher(id, input).await?;
    state.cache.clear();
    Ok(Json(publisher))
}

async fn delete_publisher(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_uuid(&raw)?;
    state.service.delete_publisher(id).await?;
    state.cache.clear();
    Ok(StatusCode::NO_CONTENT)
}

async fn get_publisher_publications(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_uuid(&raw)?;
    let publications = state.service.get_publisher_publications(id).await?;
    Ok(Json(publications))
}

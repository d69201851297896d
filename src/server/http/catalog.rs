//! Category and location routes.

use std::sync::Arc;

use axum::{
    Json,
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;

use super::{ApiError, AppState, Authenticated};
use crate::{
    models::{Category, Location},
    services::{CategoryForm, CategoryView, LocationForm},
};

type AppStateArc = Arc<AppState>;

pub(super) fn routes() -> Router<AppStateArc> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            get(category).put(update_category).delete(delete_category),
        )
        .route("/locations", get(list_locations).post(create_location))
        .route(
            "/locations/:id",
            get(location).put(update_location).delete(delete_location),
        )
}

#[derive(Debug, Default, Deserialize)]
struct CategoryListParams {
    #[serde(default)]
    include_deleted: bool,
}

async fn list_categories(
    State(state): State<AppStateArc>,
    Authenticated(_caller): Authenticated,
    Query(params): Query<CategoryListParams>,
) -> Result<Json<Vec<CategoryView>>, ApiError> {
    Ok(Json(state.catalog.categories(params.include_deleted).await?))
}

async fn category(
    State(state): State<AppStateArc>,
    Authenticated(_caller): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<CategoryView>, ApiError> {
    Ok(Json(state.catalog.category(&id).await?))
}

async fn create_category(
    State(state): State<AppStateArc>,
    Authenticated(caller): Authenticated,
    Json(form): Json<CategoryForm>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let created = state.catalog.create_category(&form, &caller).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_category(
    State(state): State<AppStateArc>,
    Authenticated(caller): Authenticated,
    Path(id): Path<String>,
    Json(form): Json<CategoryForm>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.catalog.update_category(&id, &form, &caller).await?))
}

async fn delete_category(
    State(state): State<AppStateArc>,
    Authenticated(caller): Authenticated,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.catalog.delete_category(&id, &caller).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_locations(
    State(state): State<AppStateArc>,
    Authenticated(_caller): Authenticated,
) -> Result<Json<Vec<Location>>, ApiError> {
    Ok(Json(state.catalog.locations().await?))
}

async fn location(
    State(state): State<AppStateArc>,
    Authenticated(_caller): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<Location>, ApiError> {
    Ok(Json(state.catalog.location(&id).await?))
}

async fn create_location(
    State(state): State<AppStateArc>,
    Authenticated(caller): Authenticated,
    Json(form): Json<LocationForm>,
) -> Result<(StatusCode, Json<Location>), ApiError> {
    let created = state.catalog.create_location(&form, &caller).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_location(
    State(state): State<AppStateArc>,
    Authenticated(caller): Authenticated,
    Path(id): Path<String>,
    Json(form): Json<LocationForm>,
) -> Result<Json<Location>, ApiError> {
    Ok(Json(state.catalog.update_location(&id, &form, &caller).await?))
}

async fn delete_location(
    State(state): State<AppStateArc>,
    Authenticated(caller): Authenticated,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.catalog.delete_location(&id, &caller).await?;
    Ok(StatusCode::NO_CONTENT)
}

//! Dashboard and system parameter routes.

use std::sync::Arc;

use axum::{
    Json,
    Router,
    extract::{Path, Query, State},
    routing::get,
};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;

use super::{ApiError, AppState, Authenticated};
use crate::{
    dashboard::{ActivityPoint, Chart, ChartValue, DateWindow},
    filter::FilterCriteria,
    services::ParameterView,
};

type AppStateArc = Arc<AppState>;

pub(super) fn routes() -> Router<AppStateArc> {
    Router::new()
        .route(
            "/dashboard/status/:categories/:statuses/:severities",
            get(status_chart),
        )
        .route("/dashboard/activity", get(activity_chart))
        .route("/dashboard/request-types", get(request_type_chart))
        .route("/parameters", get(list_parameters))
        .route("/parameters/:id", get(parameter).put(update_parameter))
}

/// Calendar-day bounds; `to` covers the whole day.
#[derive(Debug, Default, Deserialize)]
pub(super) struct WindowParams {
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

impl WindowParams {
    pub(super) fn window(&self, now: NaiveDateTime) -> DateWindow {
        DateWindow::new(
            self.from.and_then(|d| d.and_hms_opt(0, 0, 0)),
            self.to.and_then(|d| d.and_hms_opt(23, 59, 59)),
            now,
        )
    }
}

async fn status_chart(
    State(state): State<AppStateArc>,
    Authenticated(caller): Authenticated,
    Path((categories, statuses, severities)): Path<(String, String, String)>,
) -> Result<Json<Chart<ChartValue>>, ApiError> {
    let criteria = FilterCriteria::parse(&categories, &statuses, &severities)?;
    Ok(Json(state.dashboard.status_chart(&criteria, &caller).await?))
}

async fn activity_chart(
    State(state): State<AppStateArc>,
    Authenticated(caller): Authenticated,
    Query(params): Query<WindowParams>,
) -> Result<Json<Chart<ActivityPoint>>, ApiError> {
    let window = params.window(Utc::now().naive_utc());
    Ok(Json(state.dashboard.activity_chart(&window, &caller).await?))
}

async fn request_type_chart(
    State(state): State<AppStateArc>,
    Authenticated(caller): Authenticated,
    Query(params): Query<WindowParams>,
) -> Result<Json<Chart<ChartValue>>, ApiError> {
    let window = params.window(Utc::now().naive_utc());
    Ok(Json(state.dashboard.request_type_chart(&window, &caller).await?))
}

#[derive(Debug, Deserialize)]
struct ParameterUpdate {
    value: String,
}

async fn list_parameters(
    State(state): State<AppStateArc>,
    Authenticated(caller): Authenticated,
) -> Result<Json<Vec<ParameterView>>, ApiError> {
    Ok(Json(state.parameters.list(&caller).await?))
}

async fn parameter(
    State(state): State<AppStateArc>,
    Authenticated(caller): Authenticated,
    Path(id): Path<i32>,
) -> Result<Json<ParameterView>, ApiError> {
    Ok(Json(state.parameters.get(id, &caller).await?))
}

async fn update_parameter(
    State(state): State<AppStateArc>,
    Authenticated(caller): Authenticated,
    Path(id): Path<i32>,
    Json(body): Json<ParameterUpdate>,
) -> Result<Json<ParameterView>, ApiError> {
    Ok(Json(state.parameters.update(id, &body.value, &caller).await?))
}

//! Ticket routes.

use std::sync::Arc;

use axum::{
    Json,
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;

use super::{ApiError, AppState, Authenticated};
use crate::{
    detail::TicketDetail,
    filter::FilterCriteria,
    kind::TicketKind,
    services::{EditTicketForm, TicketForm, TicketPage, TicketQuery, UpdateForm},
};

type AppStateArc = Arc<AppState>;

// The first segment is named `id` in every shape so the router accepts both
// `/tickets/{id}` and `/tickets/{categories}/{statuses}/{severities}`.
pub(super) fn routes() -> Router<AppStateArc> {
    Router::new()
        .route("/tickets", get(list_landing).post(create_ticket))
        .route(
            "/tickets/:id",
            get(ticket_detail).put(edit_ticket).delete(delete_ticket),
        )
        .route("/tickets/:id/updates", post(add_update))
        .route("/tickets/:id/:statuses/:severities", get(list_filtered))
}

/// Optional listing parameters.
#[derive(Debug, Default, Deserialize)]
pub(super) struct ListParams {
    user: Option<String>,
    kind: Option<TicketKind>,
    page: Option<usize>,
}

impl ListParams {
    fn into_query(self, criteria: FilterCriteria) -> TicketQuery {
        TicketQuery {
            criteria,
            username: self.user,
            kind: self.kind,
            page: self.page.unwrap_or(0),
        }
    }
}

async fn list_landing(
    State(state): State<AppStateArc>,
    Authenticated(caller): Authenticated,
    Query(params): Query<ListParams>,
) -> Result<Json<TicketPage>, ApiError> {
    let query = params.into_query(FilterCriteria::landing());
    Ok(Json(state.tickets.list(&query, &caller).await?))
}

async fn list_filtered(
    State(state): State<AppStateArc>,
    Authenticated(caller): Authenticated,
    Path((categories, statuses, severities)): Path<(String, String, String)>,
    Query(params): Query<ListParams>,
) -> Result<Json<TicketPage>, ApiError> {
    let criteria = FilterCriteria::parse(&categories, &statuses, &severities)?;
    let query = params.into_query(criteria);
    Ok(Json(state.tickets.list(&query, &caller).await?))
}

async fn create_ticket(
    State(state): State<AppStateArc>,
    Authenticated(caller): Authenticated,
    Json(form): Json<TicketForm>,
) -> Result<(StatusCode, Json<TicketDetail>), ApiError> {
    let created = state.tickets.create(&form, &caller).await?;
    Ok((StatusCode::CREATED, Json(created.value)))
}

async fn ticket_detail(
    State(state): State<AppStateArc>,
    Authenticated(caller): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<TicketDetail>, ApiError> {
    Ok(Json(state.tickets.detail(&id, &caller).await?))
}

async fn edit_ticket(
    State(state): State<AppStateArc>,
    Authenticated(caller): Authenticated,
    Path(id): Path<String>,
    Json(form): Json<EditTicketForm>,
) -> Result<Json<TicketDetail>, ApiError> {
    Ok(Json(state.tickets.edit(&id, &form, &caller).await?.value))
}

async fn delete_ticket(
    State(state): State<AppStateArc>,
    Authenticated(caller): Authenticated,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.tickets.delete(&id, &caller).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_update(
    State(state): State<AppStateArc>,
    Authenticated(caller): Authenticated,
    Path(id): Path<String>,
    Json(form): Json<UpdateForm>,
) -> Result<(StatusCode, Json<TicketDetail>), ApiError> {
    let updated = state.tickets.add_update(&id, &form, &caller).await?;
    Ok((StatusCode::CREATED, Json(updated.value)))
}

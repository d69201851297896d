//! JSON HTTP surface.
//!
//! Every route requires HTTP Basic credentials checked against the
//! [`Directory`]. Handlers delegate to the services and convert
//! [`HelpdeskError`](crate::error::HelpdeskError) into status codes through
//! [`ApiError`].

mod auth;
mod catalog;
mod error;
mod insights;
mod tickets;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

pub use self::{
    auth::{Authenticated, AuthRejection, REALM},
    error::{ApiError, ErrorBody},
};
use crate::{
    dashboard::DashboardService,
    db::DbPool,
    directory::Directory,
    notify::{BuiltinRenderer, MailRelay, Mailer, NotificationComposer},
    paging::PagingService,
    params::ParameterStore,
    services::{CatalogService, ParameterService, TicketService},
};

/// Services shared by every request.
pub struct AppState {
    /// Ticket operations.
    pub tickets: TicketService,
    /// Category and location administration.
    pub catalog: CatalogService,
    /// System parameter administration.
    pub parameters: ParameterService,
    /// Chart data.
    pub dashboard: DashboardService,
    /// Credential checks.
    pub directory: Arc<dyn Directory>,
}

impl AppState {
    /// Wire the services over one pool.
    #[must_use]
    pub fn new(
        pool: &DbPool,
        params: &Arc<dyn ParameterStore>,
        relay: Arc<dyn MailRelay>,
        directory: Arc<dyn Directory>,
        page_size: usize,
    ) -> Self {
        let composer = NotificationComposer::new(Arc::clone(params), Arc::new(BuiltinRenderer));
        Self {
            tickets: TicketService::new(
                pool.clone(),
                composer,
                Mailer::new(relay),
                PagingService::new(page_size),
            ),
            catalog: CatalogService::new(pool.clone()),
            parameters: ParameterService::new(pool.clone()),
            dashboard: DashboardService::new(pool.clone(), Arc::clone(params)),
            directory,
        }
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(tickets::routes())
        .merge(catalog::routes())
        .merge(insights::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

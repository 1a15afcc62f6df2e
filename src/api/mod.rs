pub mod error;
pub mod handlers;

use axum::{
    Router,
    body::Body,
    extract::{Query, State, rejection::QueryRejection},
    http::Request,
    routing::get,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::{calc::Operation, history::HistoryStore, logging::SERVICE_NAME};

pub use error::ApiError;
pub use handlers::CalcQuery;

/// Shared handler state. The store is injected so tests can swap it.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn HistoryStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self { store }
    }
}

/// Build the full HTTP surface: one GET route per operation plus history and health.
pub fn router(state: AppState) -> Router {
    let mut router: Router<AppState> = Router::new();

    for op in Operation::ALL {
        router = router.route(
            &format!("/{op}"),
            get(
                move |state: State<AppState>, query: Result<Query<CalcQuery>, QueryRejection>| {
                    handlers::calculate(state, op, query)
                },
            ),
        );
    }

    router
        .route("/history", get(handlers::history))
        .route("/db-health", get(handlers::db_health))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .with_state(state)
}

/// Per-request span. Connection tasks do not inherit the startup span, so the
/// service name is attached here.
fn request_span(request: &Request<Body>) -> Span {
    tracing::info_span!(
        "request",
        service = SERVICE_NAME,
        method = %request.method(),
        uri = %request.uri(),
    )
}

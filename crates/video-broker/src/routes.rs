use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{
    events_handler, get_archive_handler, health_handler, index_handler, join_handler,
    list_archives_handler, room_handler, session_handler, signal_handler, start_archive_handler,
    stop_archive_handler, view_archive_handler,
};
use crate::state::AppState;

/// Build the broker router over `state`.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/session", get(session_handler))
        .route("/room/{name}", get(room_handler))
        .route("/join/{name}", get(join_handler))
        .route("/archive", get(list_archives_handler))
        .route("/archive/start", post(start_archive_handler))
        .route("/archive/{archive_id}", get(get_archive_handler))
        .route("/archive/{archive_id}/stop", post(stop_archive_handler))
        .route(
            "/archive/{archive_id}/view",
            get(view_archive_handler).post(view_archive_handler),
        )
        .route("/signal", post(signal_handler))
        .route("/events/{event_type}", post(events_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

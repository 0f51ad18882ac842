pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};
use state::AppState;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Generous enough for a full batch of maximum-size files; the gateway's
    // per-file ceiling is the authoritative bound and produces the typed
    // error instead of a bare 413.
    let body_limit = state.settings.upload.max_file_size_bytes as usize
        * state.settings.upload.max_files_per_request.max(1)
        + 1024 * 1024;

    // Auth routes
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .route("/me", get(routes::auth::me));

    // Chat + message routes
    let chat_routes = Router::new()
        .route("/", get(routes::chat::list))
        .route("/with/{mentor_id}", get(routes::chat::get_or_create))
        .route(
            "/{chat_id}/message",
            get(routes::message::list).post(routes::message::send),
        )
        .route(
            "/{chat_id}/message/{message_id}",
            put(routes::message::update).delete(routes::message::delete),
        )
        .route(
            "/{chat_id}/message/{message_id}/reaction",
            post(routes::message::toggle_reaction),
        )
        .route(
            "/{chat_id}/message/{message_id}/read",
            put(routes::message::mark_read),
        );

    // File routes. `/{filename}` doubles as the delete target (by id);
    // retrieval is the only unauthenticated entry point and gates private
    // categories itself.
    let file_routes = Router::new()
        .route("/upload", post(routes::file::upload))
        .route("/user/{user_id}", get(routes::file::list_for_user))
        .route(
            "/{filename}",
            get(routes::file::stream).delete(routes::file::delete),
        )
        .route("/{filename}/download", get(routes::file::download));

    // Compose API
    let api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/chat", chat_routes)
        .nest("/file", file_routes);

    // Health check
    let health = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api)
        .merge(health)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

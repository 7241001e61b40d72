use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{make_span_with_request_id, request_id_middleware, require_auth};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    // Everything except registration, login and the health probe sits behind
    // the credential check.
    let protected = Router::new()
        .route("/logout", post(handlers::auth::logout))
        .route("/movies", get(handlers::movies::list_movies))
        .route("/movies/search", post(handlers::movies::search_movies))
        .route("/movies/:id", get(handlers::movies::get_movie))
        .route("/movies/:id/like", post(handlers::movies::toggle_like))
        .route(
            "/movies/:id/comments",
            get(handlers::movies::list_comments).post(handlers::movies::add_comment),
        )
        .route("/user", get(handlers::user::profile))
        .route("/user/liked-movies", get(handlers::user::liked_movies))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .merge(protected)
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

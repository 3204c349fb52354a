use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::error::panic_response;
use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/model/info", get(handlers::model_info))
        // Recommendations
        .route("/recommendations", post(handlers::create_recommendations))
        .route(
            "/recommendations/:user_id",
            get(handlers::get_user_recommendations),
        )
        // Upstream passthrough
        .route("/users/real", get(handlers::real_users))
        .route("/podcasts/real", get(handlers::real_podcasts));

    if state.inner.legacy.is_some() {
        router = router.route("/recommend/:user_id", get(handlers::legacy_recommend));
    }

    router
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(state)
}

use axum::{
    Router,
    routing::{delete, get, post},
    middleware,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn doctor_routes(state: AppState) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/availability", get(handlers::get_available_slots))
        .route("/doctors/{doctor_id}/schedules", get(handlers::list_schedules));

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/doctors/{doctor_id}/schedules", post(handlers::create_schedule))
        .route("/doctors/{doctor_id}/schedules/{template_id}", delete(handlers::delete_schedule))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

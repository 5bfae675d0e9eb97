// libs/appointment-cell/src/router.rs
use axum::{
    Router,
    routing::{get, patch},
    middleware,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: AppState) -> Router {
    // All booking operations require authentication
    let protected_routes = Router::new()
        .route("/bookings", get(handlers::list_bookings).post(handlers::create_booking))
        .route("/bookings/{booking_id}", get(handlers::get_booking))
        .route("/bookings/{booking_id}/status", patch(handlers::update_booking_status))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}

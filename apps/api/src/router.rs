use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use doctor_cell::router::doctor_routes;
use shared_database::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic booking API is running!" }))
        .merge(doctor_routes(state.clone()))
        .merge(appointment_routes(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use shared_utils::test_utils::TestConfig;

    fn app() -> Router {
        create_router(AppState::in_memory(TestConfig::default().to_app_config()))
    }

    #[tokio::test]
    async fn liveness_route_responds() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn both_cells_are_mounted() {
        let availability = app()
            .oneshot(
                Request::builder()
                    .uri("/availability?doctor_id=00000000-0000-0000-0000-000000000001&facility_type=clinic&facility_id=00000000-0000-0000-0000-000000000002&date=2024-06-03")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(availability.status(), StatusCode::OK);

        let bookings = app()
            .oneshot(Request::builder().uri("/bookings").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(bookings.status(), StatusCode::UNAUTHORIZED);
    }
}

// libs/doctor-cell/tests/handlers_test.rs

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use doctor_cell::router::doctor_routes;
use shared_database::AppState;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

fn create_test_app() -> (Router, TestConfig) {
    let config = TestConfig::default();
    let state = AppState::in_memory(config.to_app_config());
    (doctor_routes(state), config)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn schedule_body(facility_id: Uuid) -> Value {
    json!({
        "facility_ref": { "facility_type": "clinic", "id": facility_id },
        "day_of_week": 1,
        "start_time": "09:00",
        "end_time": "09:40",
        "slot_duration_minutes": 20
    })
}

fn post_schedule(doctor_id: Uuid, token: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/doctors/{}/schedules", doctor_id))
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_doctor_creates_schedule_and_sees_slots() {
    let (app, config) = create_test_app();
    let doctor_id = Uuid::new_v4();
    let facility_id = Uuid::new_v4();
    let doctor = TestUser::doctor_with_id(doctor_id);
    let token = JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, None);

    let response = app
        .clone()
        .oneshot(post_schedule(doctor_id, &token, &schedule_body(facility_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["start_time"], "09:00");

    // 2024-06-03 was a Monday
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!(
                    "/availability?doctor_id={}&facility_type=clinic&facility_id={}&date=2024-06-03",
                    doctor_id, facility_id
                ))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["available_slots"], json!(["09:00", "09:20"]));
    assert_eq!(body["total_slots"], 2);
}

#[tokio::test]
async fn test_availability_for_unscheduled_day_is_empty() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!(
                    "/availability?doctor_id={}&facility_type=hospital&facility_id={}&date=2024-06-04",
                    Uuid::new_v4(),
                    Uuid::new_v4()
                ))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["available_slots"], json!([]));
}

#[tokio::test]
async fn test_availability_rejects_malformed_query() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/availability?doctor_id=nope&facility_type=clinic&date=2024-06-04")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_patient_cannot_manage_doctor_schedule() {
    let (app, config) = create_test_app();
    let patient = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, None);

    let response = app
        .oneshot(post_schedule(Uuid::new_v4(), &token, &schedule_body(Uuid::new_v4())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_schedule_creation_requires_token() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/doctors/{}/schedules", Uuid::new_v4()))
                .header("Content-Type", "application/json")
                .body(Body::from(schedule_body(Uuid::new_v4()).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_break_is_a_validation_error() {
    let (app, config) = create_test_app();
    let admin = TestUser::admin("admin@example.com");
    let token = JwtTestUtils::create_test_token(&admin, &config.jwt_secret, None);

    let mut body = schedule_body(Uuid::new_v4());
    body["break_start"] = json!("09:30");
    body["break_end"] = json!("09:10");

    let response = app.oneshot(post_schedule(Uuid::new_v4(), &token, &body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "validation_error");
}

#[tokio::test]
async fn test_slot_longer_than_working_window_is_rejected() {
    let (app, config) = create_test_app();
    let admin = TestUser::admin("admin@example.com");
    let token = JwtTestUtils::create_test_token(&admin, &config.jwt_secret, None);

    let mut body = schedule_body(Uuid::new_v4());
    body["slot_duration_minutes"] = json!(100_000_000);

    let response = app.oneshot(post_schedule(Uuid::new_v4(), &token, &body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "validation_error");
}

#[tokio::test]
async fn test_list_and_delete_schedule() {
    let (app, config) = create_test_app();
    let doctor_id = Uuid::new_v4();
    let token = JwtTestUtils::create_test_token(&TestUser::doctor_with_id(doctor_id), &config.jwt_secret, None);

    let created = body_json(
        app.clone()
            .oneshot(post_schedule(doctor_id, &token, &schedule_body(Uuid::new_v4())))
            .await
            .unwrap(),
    )
    .await;
    let template_id = created["id"].as_str().unwrap().to_string();

    let listed = body_json(
        app.clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/doctors/{}/schedules", doctor_id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(listed["total"], 1);

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/doctors/{}/schedules/{}", doctor_id, template_id))
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

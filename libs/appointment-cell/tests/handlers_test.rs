// libs/appointment-cell/tests/handlers_test.rs

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::NaiveTime;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::router::appointment_routes;
use doctor_cell::models::CreateScheduleRequest;
use doctor_cell::router::doctor_routes;
use doctor_cell::services::ScheduleService;
use shared_database::AppState;
use shared_models::scheduling::FacilityRef;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

struct TestApp {
    router: Router,
    config: TestConfig,
    doctor_id: Uuid,
    facility_id: Uuid,
}

/// Router over in-memory stores with one doctor working Mondays 09:00-10:00.
async fn create_test_app(config: TestConfig) -> TestApp {
    let state = AppState::in_memory(config.to_app_config());
    let doctor_id = Uuid::new_v4();
    let facility_id = Uuid::new_v4();

    ScheduleService::new(&state)
        .create_template(
            doctor_id,
            CreateScheduleRequest {
                facility_ref: FacilityRef::clinic(facility_id),
                day_of_week: 1,
                start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                slot_duration_minutes: 20,
                break_start: None,
                break_end: None,
            },
        )
        .await
        .unwrap();

    let router = doctor_routes(state.clone()).merge(appointment_routes(state));
    TestApp { router, config, doctor_id, facility_id }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn booking_body(doctor_id: Uuid, facility_id: Uuid, start_time: &str) -> Value {
    json!({
        "doctor_id": doctor_id,
        "facility_ref": { "facility_type": "clinic", "id": facility_id },
        "date": "2024-06-03",
        "start_time": start_time,
        "reason": "Persistent cough"
    })
}

fn json_request(http_method: &str, uri: &str, token: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(http_method)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

impl TestApp {
    fn token(&self, user: &TestUser) -> String {
        JwtTestUtils::create_test_token(user, &self.config.jwt_secret, None)
    }

    async fn book(&self, patient: &TestUser, start_time: &str) -> axum::response::Response {
        self.router
            .clone()
            .oneshot(json_request(
                "POST",
                "/bookings",
                &self.token(patient),
                &booking_body(self.doctor_id, self.facility_id, start_time),
            ))
            .await
            .unwrap()
    }

    async fn set_status(&self, user: &TestUser, booking_id: &str, status: &str) -> axum::response::Response {
        self.router
            .clone()
            .oneshot(json_request(
                "PATCH",
                &format!("/bookings/{}/status", booking_id),
                &self.token(user),
                &json!({ "status": status }),
            ))
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn test_create_booking_returns_created_and_hides_slot() {
    let app = create_test_app(TestConfig::default()).await;
    let patient = TestUser::patient("patient@example.com");

    let response = app.book(&patient, "09:20").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let booking = body_json(response).await;
    assert_eq!(booking["status"], "pending");
    assert_eq!(booking["start_time"], "09:20");
    assert_eq!(booking["patient_id"], patient.id);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!(
                    "/availability?doctor_id={}&facility_type=clinic&facility_id={}&date=2024-06-03",
                    app.doctor_id, app.facility_id
                ))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(body_json(response).await["available_slots"], json!(["09:00", "09:40"]));
}

#[tokio::test]
async fn test_booking_taken_slot_is_rejected_with_conflict() {
    let app = create_test_app(TestConfig::default()).await;

    let first = app.book(&TestUser::patient("a@example.com"), "09:00").await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app.book(&TestUser::patient("b@example.com"), "09:00").await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(second).await["code"], "slot_conflict");
}

#[tokio::test]
async fn test_booking_off_grid_time_is_rejected() {
    let app = create_test_app(TestConfig::default()).await;

    let response = app.book(&TestUser::patient("p@example.com"), "09:05").await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "slot_unavailable");
}

#[tokio::test]
async fn test_create_booking_requires_token() {
    let app = create_test_app(TestConfig::default()).await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/bookings")
                .header("Content-Type", "application/json")
                .body(Body::from(booking_body(app.doctor_id, app.facility_id, "09:00").to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_doctor_drives_lifecycle_and_rejects_reopening() {
    let app = create_test_app(TestConfig::default()).await;
    let doctor = TestUser::doctor_with_id(app.doctor_id);

    let booking = body_json(app.book(&TestUser::patient("p@example.com"), "09:00").await).await;
    let id = booking["id"].as_str().unwrap().to_string();

    let confirmed = app.set_status(&doctor, &id, "confirmed").await;
    assert_eq!(confirmed.status(), StatusCode::OK);
    assert_eq!(body_json(confirmed).await["status"], "confirmed");

    let completed = app.set_status(&doctor, &id, "completed").await;
    assert_eq!(completed.status(), StatusCode::OK);

    let reopened = app.set_status(&doctor, &id, "pending").await;
    assert_eq!(reopened.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(reopened).await["code"], "invalid_transition");
}

#[tokio::test]
async fn test_patient_may_cancel_but_not_confirm() {
    let app = create_test_app(TestConfig::default()).await;
    let patient = TestUser::patient("p@example.com");

    let booking = body_json(app.book(&patient, "09:40").await).await;
    let id = booking["id"].as_str().unwrap().to_string();

    let confirm = app.set_status(&patient, &id, "confirmed").await;
    assert_eq!(confirm.status(), StatusCode::FORBIDDEN);

    let cancel = app.set_status(&patient, &id, "cancelled").await;
    assert_eq!(cancel.status(), StatusCode::OK);
    assert_eq!(body_json(cancel).await["status"], "cancelled");

    // The slot is bookable again
    let rebook = app.book(&TestUser::patient("q@example.com"), "09:40").await;
    assert_eq!(rebook.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_other_patients_cannot_see_booking() {
    let app = create_test_app(TestConfig::default()).await;
    let owner = TestUser::patient("owner@example.com");
    let stranger = TestUser::patient("stranger@example.com");

    let booking = body_json(app.book(&owner, "09:00").await).await;
    let uri = format!("/bookings/{}", booking["id"].as_str().unwrap());

    let response = app.router.clone().oneshot(get_request(&uri, &app.token(&owner))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.router.clone().oneshot(get_request(&uri, &app.token(&stranger))).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_bookings_by_role() {
    let app = create_test_app(TestConfig::default()).await;
    let patient = TestUser::patient("p@example.com");
    let doctor = TestUser::doctor_with_id(app.doctor_id);

    app.book(&patient, "09:00").await;
    app.book(&TestUser::patient("other@example.com"), "09:20").await;

    let response = app
        .router
        .clone()
        .oneshot(get_request("/bookings", &app.token(&patient)))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["total"], 1);

    let response = app
        .router
        .clone()
        .oneshot(get_request("/bookings?date=2024-06-03", &app.token(&doctor)))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["total"], 2);
}

#[tokio::test]
async fn test_approval_off_confirms_immediately() {
    let config = TestConfig {
        booking_requires_approval: false,
        ..TestConfig::default()
    };
    let app = create_test_app(config).await;

    let response = app.book(&TestUser::patient("p@example.com"), "09:00").await;

    assert_eq!(body_json(response).await["status"], "confirmed");
}

#[tokio::test]
async fn test_supabase_unique_violation_maps_to_slot_conflict() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let facility_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/schedule_templates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::schedule_template_row(&doctor_id, &facility_id, 1, "09:00:00", "10:00:00", 20)
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    // Another request won the race for the slot
    Mock::given(method("POST"))
        .and(path("/rest/v1/bookings"))
        .respond_with(ResponseTemplate::new(409).set_body_json(MockSupabaseResponses::error_response(
            "duplicate key value violates unique constraint \"bookings_active_slot_key\"",
            "23505",
        )))
        .mount(&mock_server)
        .await;

    let config = TestConfig::supabase(&mock_server.uri());
    let token = JwtTestUtils::create_test_token(&TestUser::patient("p@example.com"), &config.jwt_secret, None);
    let router = appointment_routes(AppState::from_config(config.to_app_config()));

    let response = router
        .oneshot(json_request("POST", "/bookings", &token, &booking_body(doctor_id, facility_id, "09:20")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "slot_conflict");
}

#[tokio::test]
async fn test_supabase_outage_returns_service_unavailable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/schedule_templates"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::supabase(&mock_server.uri());
    let token = JwtTestUtils::create_test_token(&TestUser::patient("p@example.com"), &config.jwt_secret, None);
    let router = appointment_routes(AppState::from_config(config.to_app_config()));

    let response = router
        .oneshot(json_request(
            "POST",
            "/bookings",
            &token,
            &booking_body(Uuid::new_v4(), Uuid::new_v4(), "09:00"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.headers()["retry-after"], "2");
    assert_eq!(body_json(response).await["code"], "store_unavailable");
}

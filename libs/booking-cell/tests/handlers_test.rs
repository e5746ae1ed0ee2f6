use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use booking_cell::router::booking_routes;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

struct TestApp {
    server: MockServer,
    config: TestConfig,
    router: Router,
}

impl TestApp {
    async fn start() -> Self {
        let server = MockServer::start().await;
        let config = TestConfig::with_supabase_url(server.uri());
        let router = booking_routes(config.to_arc());
        Self { server, config, router }
    }

    fn token_for(&self, user: &TestUser) -> String {
        JwtTestUtils::create_test_token(user, &self.config.jwt_secret, None)
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }
}

fn json_request(method: &str, uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

async fn mount_day(server: &MockServer, rows: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("date", "eq.2025-04-10"))
        .and(query_param("practitioner", "eq.Dr. Smith"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(server)
        .await;
}

#[tokio::test]
async fn requests_without_token_are_rejected() {
    let app = TestApp::start().await;

    let request = Request::builder()
        .method("POST")
        .uri("/conflicts/check")
        .header("Content-Type", "application/json")
        .body(Body::from(json!({}).to_string()))
        .unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn conflict_check_reports_overlap() {
    let app = TestApp::start().await;
    let admin = TestUser::admin("admin@clinic.test");
    let existing_id = Uuid::new_v4();

    mount_day(&app.server, json!([
        MockSupabaseResponses::booking_row(existing_id, None, "2025-04-10", "10:00 AM", "Dr. Smith", Some(60), "confirmed")
    ])).await;

    let (status, body) = app.send(json_request(
        "POST",
        "/conflicts/check",
        &app.token_for(&admin),
        json!({
            "date": "2025-04-10",
            "time": "10:30 AM",
            "practitioner": "Dr. Smith",
            "duration_minutes": 60
        }),
    )).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["has_conflict"], true);
    assert_eq!(body["conflicts"][0]["id"], existing_id.to_string());
}

#[tokio::test]
async fn conflict_check_allows_adjacent_and_self_exclusion() {
    let app = TestApp::start().await;
    let admin = TestUser::admin("admin@clinic.test");
    let existing_id = Uuid::new_v4();

    mount_day(&app.server, json!([
        MockSupabaseResponses::booking_row(existing_id, None, "2025-04-10", "10:00 AM", "Dr. Smith", Some(60), "confirmed")
    ])).await;
    let token = app.token_for(&admin);

    let (_, adjacent) = app.send(json_request("POST", "/conflicts/check", &token, json!({
        "date": "2025-04-10", "time": "11:00 AM", "practitioner": "Dr. Smith", "duration_minutes": 60
    }))).await;
    assert_eq!(adjacent["has_conflict"], false);

    let (_, own) = app.send(json_request("POST", "/conflicts/check", &token, json!({
        "date": "2025-04-10", "time": "10:00 AM", "practitioner": "Dr. Smith",
        "exclude_booking_id": existing_id
    }))).await;
    assert_eq!(own["has_conflict"], false);
    assert_eq!(own["conflicts"], json!([]));
}

#[tokio::test]
async fn conflict_check_rejects_invalid_input() {
    let app = TestApp::start().await;
    let token = app.token_for(&TestUser::patient("jane@example.com"));

    for body in [
        json!({ "date": "2025-04-10", "time": "25:00 AM", "practitioner": "Dr. Smith" }),
        json!({ "date": "2025-04-10", "time": "10:00", "practitioner": "Dr. Smith" }),
        json!({ "date": "2025-04-10", "time": "10:00 AM", "practitioner": "Dr. Smith", "duration_minutes": 0 }),
        json!({ "date": "2025-04-10", "time": "10:00 AM", "practitioner": "Dr. Smith", "duration_minutes": -30 }),
        json!({ "date": "", "time": "10:00 AM", "practitioner": "Dr. Smith" }),
        json!({ "date": "2025-04-10", "time": "10:00 AM", "practitioner": "" }),
    ] {
        let (status, response) = app.send(json_request("POST", "/conflicts/check", &token, body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert!(response["error"].is_string());
    }
}

#[tokio::test]
async fn create_on_taken_slot_is_409_and_writes_nothing() {
    let app = TestApp::start().await;
    let patient = TestUser::patient("jane@example.com");

    mount_day(&app.server, json!([
        MockSupabaseResponses::booking_row(Uuid::new_v4(), None, "2025-04-10", "10:00 AM", "Dr. Smith", Some(60), "pending")
    ])).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/bookings"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&app.server)
        .await;

    let (status, body) = app.send(json_request("POST", "/", &app.token_for(&patient), json!({
        "patient_name": "Jane Doe",
        "patient_email": "jane@example.com",
        "date": "2025-04-10",
        "time": "10:00 AM",
        "practitioner": "Dr. Smith"
    }))).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "This slot is already booked");
}

#[tokio::test]
async fn create_on_free_slot_is_201() {
    let app = TestApp::start().await;
    let patient = TestUser::patient("jane@example.com");
    let created_id = Uuid::new_v4();

    mount_day(&app.server, json!([])).await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/bookings"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::booking_row(created_id, Some(&patient.id), "2025-04-10", "2:00 PM", "Dr. Smith", Some(60), "pending")
        ])))
        .expect(1)
        .mount(&app.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/functions/v1/send-booking-email"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&app.server)
        .await;

    let (status, body) = app.send(json_request("POST", "/", &app.token_for(&patient), json!({
        "patient_name": "Jane Doe",
        "patient_email": "jane@example.com",
        "date": "2025-04-10",
        "time": "2:00 PM",
        "practitioner": "Dr. Smith"
    }))).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["booking"]["id"], created_id.to_string());
}

#[tokio::test]
async fn slots_endpoint_lists_free_times() {
    let app = TestApp::start().await;
    let patient = TestUser::patient("jane@example.com");

    mount_day(&app.server, json!([
        MockSupabaseResponses::booking_row(Uuid::new_v4(), None, "2025-04-10", "9:00 AM", "Dr. Smith", None, "confirmed"),
        MockSupabaseResponses::booking_row(Uuid::new_v4(), None, "2025-04-10", "12:00 PM", "Dr. Smith", Some(120), "pending")
    ])).await;

    let (status, body) = app.send(empty_request(
        "GET",
        "/slots?date=2025-04-10&practitioner=Dr.%20Smith&duration_minutes=60",
        &app.token_for(&patient),
    )).await;

    assert_eq!(status, StatusCode::OK);
    let times: Vec<&str> = body["slots"]
        .as_array()
        .unwrap()
        .iter()
        .map(|slot| slot["time"].as_str().unwrap())
        .collect();
    assert_eq!(times, vec!["10:00 AM", "11:00 AM", "2:00 PM", "3:00 PM", "4:00 PM"]);
}

#[tokio::test]
async fn patients_cannot_delete_bookings() {
    let app = TestApp::start().await;
    let patient = TestUser::patient("jane@example.com");

    let (status, _) = app.send(empty_request(
        "DELETE",
        &format!("/{}", Uuid::new_v4()),
        &app.token_for(&patient),
    )).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn missing_booking_is_404() {
    let app = TestApp::start().await;
    let admin = TestUser::admin("admin@clinic.test");

    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&app.server)
        .await;

    let (status, body) = app.send(empty_request(
        "GET",
        &format!("/{}", Uuid::new_v4()),
        &app.token_for(&admin),
    )).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Booking not found");
}

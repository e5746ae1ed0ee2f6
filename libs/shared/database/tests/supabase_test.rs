use assert_matches::assert_matches;
use reqwest::Method;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_config::AppConfig;
use shared_database::supabase::{return_representation, SupabaseClient, SupabaseError};

fn client_for(server: &MockServer) -> SupabaseClient {
    let config = AppConfig {
        supabase_url: server.uri(),
        supabase_anon_key: "test-anon-key".to_string(),
        supabase_jwt_secret: "secret".to_string(),
        ..AppConfig::default()
    };
    SupabaseClient::new(&config)
}

#[tokio::test]
async fn request_sends_api_key_and_bearer_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .and(query_param("practitioner", "eq.Dr. Smith"))
        .and(header("apikey", "test-anon-key"))
        .and(header("authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 1 }])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let rows: Vec<Value> = client
        .request(
            Method::GET,
            "/rest/v1/bookings?practitioner=eq.Dr.%20Smith",
            Some("user-token"),
            None,
        )
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn extra_headers_are_forwarded() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/bookings"))
        .and(header("prefer", "return=representation"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{ "id": 7 }])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let rows: Vec<Value> = client
        .request_with_headers(
            Method::POST,
            "/rest/v1/bookings",
            Some("user-token"),
            Some(json!({ "practitioner": "Dr. Smith" })),
            Some(return_representation()),
        )
        .await
        .unwrap();

    assert_eq!(rows[0]["id"], 7);
}

#[tokio::test]
async fn status_codes_map_to_error_variants() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/unauthorized"))
        .respond_with(ResponseTemplate::new(401).set_body_string("jwt expired"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/duplicate"))
        .respond_with(ResponseTemplate::new(409).set_body_string("duplicate key"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/broken"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = client_for(&server);

    let err = client
        .request::<Value>(Method::GET, "/rest/v1/unauthorized", None, None)
        .await
        .unwrap_err();
    assert_matches!(err, SupabaseError::Auth(ref body) if body == "jwt expired");

    let err = client
        .request::<Value>(Method::POST, "/rest/v1/duplicate", None, Some(json!({})))
        .await
        .unwrap_err();
    assert_matches!(err, SupabaseError::Conflict(_));

    let err = client
        .request::<Value>(Method::GET, "/rest/v1/broken", None, None)
        .await
        .unwrap_err();
    assert_matches!(err, SupabaseError::Api { status: 500, .. });
}

#[tokio::test]
async fn invoke_function_posts_payload() {
    let server = MockServer::start().await;
    let payload = json!({ "kind": "created" });

    Mock::given(method("POST"))
        .and(path("/functions/v1/send-booking-email"))
        .and(body_json(&payload))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client
        .invoke_function("send-booking-email", Some("user-token"), payload)
        .await
        .unwrap();
}

//! HTTP tests against a running server.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database
//! - The API server running (cargo run -p sparkure-server)
//!
//! Set `SPARKURE_BASE_URL` if the server is not on <http://localhost:3000>.

#![allow(clippy::unwrap_used)]

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode, header};
use serde_json::{Value, json};
use uuid::Uuid;

use sparkure_integration_tests::{PASSWORD, base_url, unique_email};

/// A cookie-keeping client with its own client address, so the auth rate
/// limiter buckets tests separately.
fn client() -> Client {
    let bytes = Uuid::new_v4().into_bytes();
    let ip = format!("10.{}.{}.{}", bytes[0], bytes[1], bytes[2]);
    let mut headers = HeaderMap::new();
    headers.insert("x-real-ip", HeaderValue::from_str(&ip).unwrap());

    Client::builder()
        .cookie_store(true)
        .default_headers(headers)
        .build()
        .expect("Failed to create HTTP client")
}

/// Sign up and sign in a fresh customer; the client keeps the cookie.
async fn signed_in_customer(name: &str) -> (Client, String) {
    let client = client();
    let base = base_url();
    let email = unique_email(name);

    let resp = client
        .post(format!("{base}/api/auth/sign-up"))
        .json(&json!({ "fullName": name, "email": email, "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = client
        .post(format!("{base}/api/auth/sign-in"))
        .json(&json!({ "email": email, "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    (client, email)
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_health() {
    let resp = client()
        .get(format!("{}/health", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_sign_in_sets_session_cookie() {
    let client = client();
    let base = base_url();
    let email = unique_email("cookie");

    client
        .post(format!("{base}/api/auth/sign-up"))
        .json(&json!({ "fullName": "Cookie", "email": email, "password": PASSWORD }))
        .send()
        .await
        .unwrap();

    let resp = client
        .post(format!("{base}/api/auth/sign-in"))
        .json(&json!({ "email": email, "password": "wrong-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client
        .post(format!("{base}/api/auth/sign-in"))
        .json(&json!({ "email": email, "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = resp.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(cookie.starts_with("auth-token="));
    assert!(cookie.contains("HttpOnly"));

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["user"]["email"], email);
    assert_eq!(body["user"]["role"], "USER");
    assert!(body["user"].get("passwordHash").is_none());
    assert!(body["token"].is_string());
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_duplicate_sign_up_is_a_conflict() {
    let client = client();
    let base = base_url();
    let email = unique_email("twice");
    let form = json!({ "fullName": "Twice", "email": email, "password": PASSWORD });

    let first = client
        .post(format!("{base}/api/auth/sign-up"))
        .json(&form)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = client
        .post(format!("{base}/api/auth/sign-up"))
        .json(&form)
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_booking_round_trip_over_http() {
    let (client, _) = signed_in_customer("Alice").await;
    let base = base_url();

    let resp = client
        .post(format!("{base}/api/cleanings"))
        .json(&json!({
            "serviceType": "HOME_CLEANING",
            "date": "2030-01-15",
            "address": "123 Main St",
            "price": "89.50",
            "duration": 90
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    let id = body["cleaning"]["id"].as_i64().unwrap();
    assert_eq!(body["cleaning"]["status"], "SCHEDULED");

    let resp = client
        .get(format!("{base}/api/cleanings?limit=5"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["totalCount"], 1);
    assert_eq!(body["hasMore"], false);
    assert_eq!(body["cleanings"][0]["id"], id);

    // Customers may not skip ahead in the lifecycle.
    let resp = client
        .patch(format!("{base}/api/cleanings/{id}"))
        .json(&json!({ "status": "COMPLETED" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = client
        .delete(format!("{base}/api/cleanings/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_other_customers_booking_is_forbidden() {
    let (alice, _) = signed_in_customer("Alice").await;
    let (bob, _) = signed_in_customer("Bob").await;
    let base = base_url();

    let body: Value = alice
        .post(format!("{base}/api/cleanings"))
        .json(&json!({
            "serviceType": "DEEP_CLEANING",
            "date": "2030-02-01T09:00:00Z",
            "address": "1 Alice Lane"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = body["cleaning"]["id"].as_i64().unwrap();

    let resp = bob
        .get(format!("{base}/api/cleanings/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_customer_cannot_reach_admin_endpoints() {
    let (client, _) = signed_in_customer("Carol").await;
    let base = base_url();

    let resp = client
        .get(format!("{base}/api/auth/employee/review"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Insufficient permissions");
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_sign_out_ends_session() {
    let (client, _) = signed_in_customer("Dave").await;
    let base = base_url();

    let resp = client.get(format!("{base}/api/auth/me")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    client
        .post(format!("{base}/api/auth/sign-out"))
        .send()
        .await
        .unwrap();

    let resp = client.get(format!("{base}/api/auth/me")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_contact_form_validation() {
    let (client, email) = signed_in_customer("Erin").await;
    let base = base_url();

    let resp = client
        .post(format!("{base}/api/contact"))
        .json(&json!({
            "firstName": "E",
            "lastName": "Smith",
            "email": email,
            "phone": "5550100200",
            "message": "Please call me back"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client
        .post(format!("{base}/api/contact"))
        .json(&json!({
            "firstName": "Erin",
            "lastName": "Smith",
            "email": email,
            "phone": "5550100200",
            "message": "Please call me back"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
}

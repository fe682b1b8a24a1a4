//! API integration tests
//!
//! Need a running server with the bootstrap admin configured as
//! `admin` / `admin123`. Run with: cargo test -- --ignored

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

async fn login(client: &Client, username: &str, password: &str) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "username": username,
            "password": password
        }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

/// Helper to get an admin token
async fn admin_token(client: &Client) -> String {
    login(client, "admin", "admin123").await
}

/// Register a throwaway member and return its token
async fn member_token(client: &Client) -> String {
    let suffix = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let username = format!("member{}", suffix);
    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "fullname": "Test Member",
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "rahasia123"
        }))
        .send()
        .await
        .expect("Failed to register");
    assert_eq!(response.status(), StatusCode::CREATED);

    login(client, &username, "rahasia123").await
}

async fn create_book(client: &Client, token: &str, stock: i32) -> i64 {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(token)
        .json(&json!({
            "title": "Ronggeng Dukuh Paruk",
            "author": "Ahmad Tohari",
            "total_stock": stock,
            "fine_amount": 50000
        }))
        .send()
        .await
        .expect("Failed to create book");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.expect("Failed to parse book");
    assert_eq!(body["available_stock"], stock);
    body["id"].as_i64().expect("No book id")
}

async fn set_status(client: &Client, token: &str, loan_id: i64, status: &str) -> reqwest::Response {
    client
        .patch(format!("{}/loans/{}/status", BASE_URL, loan_id))
        .bearer_auth(token)
        .json(&json!({ "status": status }))
        .send()
        .await
        .expect("Failed to send status change")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "username": "admin",
            "password": "wrong"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_get_current_user() {
    let client = Client::new();
    let token = admin_token(&client).await;

    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["username"], "admin");
    assert_eq!(body["role"], "admin");
    assert!(body.get("password").is_none());
}

#[tokio::test]
#[ignore]
async fn test_loan_lifecycle() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let member = member_token(&client).await;
    let book_id = create_book(&client, &admin, 2).await;

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .bearer_auth(&member)
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to request loan");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["available_stock"], 1);
    assert_eq!(body["loan"]["status"], "DIAJUKAN");
    let loan_id = body["loan"]["id"].as_i64().unwrap();

    // same member, same book, still pending
    let duplicate = client
        .post(format!("{}/loans", BASE_URL))
        .bearer_auth(&member)
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    // cannot hand over before approval
    let early = set_status(&client, &admin, loan_id, "DIPINJAM").await;
    assert_eq!(early.status(), StatusCode::CONFLICT);

    assert!(set_status(&client, &admin, loan_id, "DISETUJUI").await.status().is_success());
    let borrowed: Value = set_status(&client, &admin, loan_id, "DIPINJAM")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(borrowed["status"], "DIPINJAM");
    assert!(borrowed["date_due"].is_string());

    let returned: Value = set_status(&client, &admin, loan_id, "DIKEMBALIKAN")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(returned["status"], "DIKEMBALIKAN");
    assert_eq!(returned["fine_total"], 0.0);

    let book: Value = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(book["available_stock"], 2);

    let mine: Value = client
        .get(format!("{}/loans/mine", BASE_URL))
        .bearer_auth(&member)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(mine[0]["id"], loan_id);
}

#[tokio::test]
#[ignore]
async fn test_member_cancel_restores_stock() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let member = member_token(&client).await;
    let book_id = create_book(&client, &admin, 1).await;

    let body: Value = client
        .post(format!("{}/loans", BASE_URL))
        .bearer_auth(&member)
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let loan_id = body["loan"]["id"].as_i64().unwrap();

    let other = member_token(&client).await;
    let out_of_stock = client
        .post(format!("{}/loans", BASE_URL))
        .bearer_auth(&other)
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(out_of_stock.status(), StatusCode::CONFLICT);

    let foreign_cancel = client
        .patch(format!("{}/loans/{}/cancel", BASE_URL, loan_id))
        .bearer_auth(&other)
        .send()
        .await
        .unwrap();
    assert_eq!(foreign_cancel.status(), StatusCode::NOT_FOUND);

    let canceled: Value = client
        .patch(format!("{}/loans/{}/cancel", BASE_URL, loan_id))
        .bearer_auth(&member)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(canceled["status"], "DIBATALKAN");

    let book: Value = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(book["available_stock"], 1);
}

#[tokio::test]
#[ignore]
async fn test_list_loans_by_status() {
    let client = Client::new();
    let token = admin_token(&client).await;

    let response = client
        .get(format!("{}/loans?status=dipinjam", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.unwrap();
    for loan in body.as_array().expect("array") {
        assert_eq!(loan["status"], "DIPINJAM");
    }

    let bad = client
        .get(format!("{}/loans?status=unknown", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore]
async fn test_bookmarks_and_progress() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let member = member_token(&client).await;
    let book_id = create_book(&client, &admin, 1).await;

    for _ in 0..2 {
        let response = client
            .post(format!("{}/bookmarks", BASE_URL))
            .bearer_auth(&member)
            .json(&json!({ "book_id": book_id }))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
    }

    let status: Value = client
        .get(format!("{}/bookmarks/{}/status", BASE_URL, book_id))
        .bearer_auth(&member)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["bookmarked"], true);

    let saved = client
        .post(format!("{}/ebook/progress", BASE_URL))
        .bearer_auth(&member)
        .json(&json!({ "book_id": book_id, "page": 42 }))
        .send()
        .await
        .unwrap();
    assert!(saved.status().is_success());

    let page: Value = client
        .get(format!("{}/ebook/progress?book_id={}", BASE_URL, book_id))
        .bearer_auth(&member)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["last_page"], 42);
}

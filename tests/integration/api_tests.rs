//! JSON API integration tests

use axum::http::StatusCode;

use crate::support::{body_json, TestApp};

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::seeded().await;
    let mut client = app.client();

    let response = client.get("/health").await;
    assert!(response.status().is_success());

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_list_books() {
    let app = TestApp::seeded().await;
    let mut client = app.client();

    let body = client.page("/api/books").await;
    let books = body.as_array().expect("Expected an array");
    assert_eq!(books.len(), 5);
    assert_eq!(books[0]["title"], "Python Crash Course");
    // its only loan was returned
    assert_eq!(books[0]["available"], 5);
    // one copy out, one overdue: the overdue loan still counts
    assert_eq!(books[3]["quantity"], 2);
    assert_eq!(books[3]["available"], 1);
    assert_eq!(books[3]["is_available"], true);
}

#[tokio::test]
async fn test_search_books() {
    let app = TestApp::seeded().await;
    let mut client = app.client();

    let body = client.page("/api/books?q=CIXIN").await;
    let books = body.as_array().expect("Expected an array");
    assert_eq!(books.len(), 1);
    assert_eq!(books[0]["isbn"], "9787536692930");

    let body = client.page("/api/books?category=Programming").await;
    assert_eq!(body.as_array().expect("Expected an array").len(), 2);
}

#[tokio::test]
async fn test_get_book() {
    let app = TestApp::seeded().await;
    let mut client = app.client();

    let body = client.page("/api/books/3").await;
    assert_eq!(body["id"], 3);
    assert_eq!(body["category"], "History");

    let response = client.get("/api/books/999").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], "NotFound");
    assert_eq!(body["message"], "Book with id 999 not found");

    let response = client.get("/api/books/abc").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "BadValue");
    assert_eq!(body["message"], "Invalid book ID");
}

#[tokio::test]
async fn test_list_categories() {
    let app = TestApp::seeded().await;
    let mut client = app.client();

    let body = client.page("/api/categories").await;
    assert_eq!(
        body,
        serde_json::json!(["Programming", "History", "Science Fiction", "Literature"])
    );
}

#[tokio::test]
async fn test_list_borrow_records() {
    let app = TestApp::seeded().await;
    let mut client = app.client();

    let body = client.page("/api/borrow-records").await;
    let records = body.as_array().expect("Expected an array");
    assert_eq!(records.len(), 4);
    assert_eq!(records[0]["username"], "admin");
    assert_eq!(records[0]["status"], "returned");
    assert!(records[0]["return_date"].is_string());
    assert!(records[1]["return_date"].is_null());

    let body = client.page("/api/borrow-records?status=overdue").await;
    let overdue = body.as_array().expect("Expected an array");
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0]["username"], "reader");
    assert_eq!(overdue[0]["book_title"], "The Three-Body Problem");
    assert_eq!(overdue[0]["is_overdue"], true);
    assert_eq!(overdue[0]["days_until_due"], 0);

    let body = client.page("/api/borrow-records?user_id=3").await;
    assert_eq!(body.as_array().expect("Expected an array").len(), 2);

    // overdue loans are still out, so they count as active
    let body = client.page("/api/borrow-records?user_id=3&status=active").await;
    assert_eq!(body.as_array().expect("Expected an array").len(), 2);

    let body = client.page("/api/borrow-records?status=active").await;
    let active = body.as_array().expect("Expected an array");
    assert_eq!(active.len(), 3);
    assert!(active.iter().all(|r| r["return_date"].is_null()));
    assert!(active.iter().any(|r| r["is_overdue"] == true));

    let body = client.page("/api/borrow-records?status=returned").await;
    assert_eq!(body.as_array().expect("Expected an array").len(), 1);

    let body = client.page("/api/borrow-records?book_id=1").await;
    assert_eq!(body.as_array().expect("Expected an array").len(), 1);
}

#[tokio::test]
async fn test_openapi_document() {
    let app = TestApp::seeded().await;
    let mut client = app.client();

    let body = client.page("/api-docs/openapi.json").await;
    assert!(body["paths"]["/api/books"].is_object());
    assert!(body["paths"]["/api/borrow-records"].is_object());
}

//! Interactive flow tests: sessions, CSRF, access control and lending

use axum::http::StatusCode;

use crate::support::{location, TestApp};

const NEW_BOOK: &str = "title=Dune&author=Frank+Herbert&isbn=9780441013593&published_year=1965\
&category=Science+Fiction&description=Desert+planet&cover_url=https%3A%2F%2Fimg.example.org%2Fdune.jpg\
&quantity=1";

#[tokio::test]
async fn test_first_visit_sets_session_cookie() {
    let app = TestApp::seeded().await;
    let mut client = app.client();

    let response = client.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .expect("No session cookie")
        .to_string();
    assert!(set_cookie.starts_with("session_id="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Max-Age=86400"));

    // the same session is resumed on the next request
    let first = client.cookie().map(str::to_string);
    client.get("/books").await;
    assert_eq!(client.cookie().map(str::to_string), first);
}

#[tokio::test]
async fn test_home_page() {
    let app = TestApp::seeded().await;
    let mut client = app.client();

    let page = client.page("/").await;
    assert_eq!(page["featured_books"].as_array().map(Vec::len), Some(4));
    assert_eq!(page["categories"].as_array().map(Vec::len), Some(4));
    assert!(page["user"].is_null());
}

#[tokio::test]
async fn test_login_with_csrf_token() {
    let app = TestApp::seeded().await;
    let mut client = app.client();

    let token = client.csrf_token("/login").await;
    let form = format!("username=reader&password=reader123&csrf_token={}", token);

    let response = client.post_form("/login", &form).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard");

    let dashboard = client.page("/dashboard").await;
    assert_eq!(dashboard["user"]["username"], "reader");
    assert_eq!(dashboard["flashes"]["success"], "Welcome back, reader!");
    assert_eq!(dashboard["stats"]["role"], "reader");
    assert_eq!(dashboard["stats"]["borrowed_books_count"], 2);
    assert_eq!(dashboard["stats"]["overdue_books_count"], 1);

    // the flash was shown once
    let dashboard = client.page("/dashboard").await;
    assert!(dashboard["flashes"]["success"].is_null());

    // replaying the same form is refused
    let response = client.post_form("/login", &form).await;
    assert_eq!(location(&response), "/login");
    assert_eq!(
        client.error_flash("/books").await.as_deref(),
        Some("Security verification failed, please try again")
    );
}

#[tokio::test]
async fn test_csrf_token_is_consumed_by_failed_login() {
    let app = TestApp::seeded().await;
    let mut client = app.client();

    let token = client.csrf_token("/login").await;
    let response = client
        .post_form("/login", &format!("username=reader&password=wrong&csrf_token={}", token))
        .await;
    assert_eq!(location(&response), "/login");
    assert_eq!(
        client.error_flash("/books").await.as_deref(),
        Some("Invalid username or password")
    );

    let response = client
        .post_form("/login", &format!("username=reader&password=reader123&csrf_token={}", token))
        .await;
    assert_eq!(location(&response), "/login");
    assert_eq!(
        client.error_flash("/books").await.as_deref(),
        Some("Security verification failed, please try again")
    );
}

#[tokio::test]
async fn test_login_without_token_is_refused() {
    let app = TestApp::seeded().await;
    let mut client = app.client();

    let response = client
        .post_form("/login", "username=admin&password=admin123")
        .await;
    assert_eq!(location(&response), "/login");
    assert_eq!(
        client.error_flash("/books").await.as_deref(),
        Some("Security verification failed, please try again")
    );
    let response = client.get("/dashboard").await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_unknown_user_and_wrong_password_read_the_same() {
    let app = TestApp::seeded().await;
    let mut client = app.client();

    client.login("nobody", "reader123").await;
    let unknown = client.error_flash("/books").await;
    client.login("reader", "nope").await;
    let wrong = client.error_flash("/books").await;
    assert_eq!(unknown, wrong);
}

#[tokio::test]
async fn test_logged_in_visitor_skips_login_page() {
    let app = TestApp::seeded().await;
    let mut client = app.logged_in("reader", "reader123").await;

    for page in ["/login", "/register"] {
        let response = client.get(page).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/dashboard");
    }
}

#[tokio::test]
async fn test_anonymous_is_sent_to_login_and_back() {
    let app = TestApp::seeded().await;
    let mut client = app.client();

    let response = client.get("/admin/books").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    let login_page = client.page("/login").await;
    assert_eq!(login_page["flashes"]["error"], "Please log in first");

    let token = login_page["csrf_token"].as_str().expect("No token").to_string();
    let response = client
        .post_form("/login", &format!("username=admin&password=admin123&csrf_token={}", token))
        .await;
    assert_eq!(location(&response), "/admin/books");

    let page = client.page("/admin/books").await;
    assert_eq!(page["books"].as_array().map(Vec::len), Some(5));
}

#[tokio::test]
async fn test_login_returns_reader_to_nested_page() {
    let app = TestApp::seeded().await;
    let mut client = app.client();

    let response = client.get("/reader/borrowed").await;
    assert_eq!(location(&response), "/login");

    let response = client.login("reader", "reader123").await;
    assert_eq!(location(&response), "/reader/borrowed");

    let page = client.page("/reader/borrowed").await;
    assert_eq!(page["records"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_malformed_ids_become_error_flashes() {
    let app = TestApp::seeded().await;
    let mut client = app.client();

    let response = client.get("/books/abc").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/books");
    assert_eq!(client.error_flash("/books").await.as_deref(), Some("Invalid book ID"));

    let mut reader = app.logged_in("reader", "reader123").await;
    let response = reader.get("/reader/borrow/abc").await;
    assert_eq!(location(&response), "/books");
    assert_eq!(reader.error_flash("/books").await.as_deref(), Some("Invalid book ID"));

    let mut admin = app.logged_in("admin", "admin123").await;
    let response = admin.get("/admin/delete-book/abc").await;
    assert_eq!(location(&response), "/admin/books");
    assert_eq!(
        admin.error_flash("/admin/books").await.as_deref(),
        Some("Invalid book ID")
    );
    assert_eq!(admin.page("/api/books").await.as_array().map(Vec::len), Some(5));

    let mut librarian = app.logged_in("librarian", "librarian123").await;
    let response = librarian.get("/librarian/return-book/abc").await;
    assert_eq!(location(&response), "/librarian/borrow");
    assert_eq!(
        librarian.error_flash("/librarian/borrow").await.as_deref(),
        Some("Invalid borrow record ID")
    );
}

#[tokio::test]
async fn test_role_gates() {
    let app = TestApp::seeded().await;
    let mut reader = app.logged_in("reader", "reader123").await;

    let response = reader.get("/admin/users").await;
    assert_eq!(location(&response), "/dashboard");
    assert_eq!(
        reader.error_flash("/dashboard").await.as_deref(),
        Some("Administrator privileges required")
    );

    let response = reader.get("/librarian/borrow").await;
    assert_eq!(location(&response), "/dashboard");
    assert_eq!(
        reader.error_flash("/dashboard").await.as_deref(),
        Some("Librarian privileges required")
    );

    let mut librarian = app.logged_in("librarian", "librarian123").await;
    let page = librarian.page("/librarian/borrow").await;
    assert_eq!(page["records"].as_array().map(Vec::len), Some(4));
    assert!(page["csrf_token"].is_string());
    let response = librarian.get("/admin/books").await;
    assert_eq!(location(&response), "/dashboard");

    let mut admin = app.logged_in("admin", "admin123").await;
    let page = admin.page("/librarian/books").await;
    assert_eq!(page["books"].as_array().map(Vec::len), Some(5));
    let dashboard = admin.page("/dashboard").await;
    assert_eq!(dashboard["stats"]["role"], "admin");
    assert_eq!(dashboard["stats"]["user_count"], 3);
    assert_eq!(dashboard["stats"]["borrow_count"], 4);
}

#[tokio::test]
async fn test_logout_rotates_session() {
    let app = TestApp::seeded().await;
    let mut client = app.logged_in("reader", "reader123").await;
    let logged_in_cookie = client.cookie().map(str::to_string);

    let response = client.get("/logout").await;
    assert_eq!(location(&response), "/");
    assert_ne!(client.cookie().map(str::to_string), logged_in_cookie);

    let home = client.page("/").await;
    assert_eq!(home["flashes"]["success"], "You have been logged out");
    assert!(home["user"].is_null());

    // the old identifier no longer grants anything
    client.set_cookie(logged_in_cookie);
    let response = client.get("/dashboard").await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_register_logs_in_as_reader() {
    let app = TestApp::seeded().await;
    let mut client = app.client();

    let token = client.csrf_token("/register").await;
    let response = client
        .post_form(
            "/register",
            &format!(
                "username=alice&email=alice%40example.com&password=secret1&confirm_password=secret1&csrf_token={}",
                token
            ),
        )
        .await;
    assert_eq!(location(&response), "/dashboard");

    let dashboard = client.page("/dashboard").await;
    assert_eq!(dashboard["user"]["username"], "alice");
    assert_eq!(dashboard["user"]["role"], "reader");
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_bad_input() {
    let app = TestApp::seeded().await;
    let mut client = app.client();

    let token = client.csrf_token("/register").await;
    let response = client
        .post_form(
            "/register",
            &format!(
                "username=READER&email=other%40example.com&password=secret1&confirm_password=secret1&csrf_token={}",
                token
            ),
        )
        .await;
    assert_eq!(location(&response), "/register");
    assert_eq!(
        client.error_flash("/books").await.as_deref(),
        Some("Username already exists")
    );

    let token = client.csrf_token("/register").await;
    client
        .post_form(
            "/register",
            &format!(
                "username=bob&email=bob%40example.com&password=secret1&confirm_password=other1&csrf_token={}",
                token
            ),
        )
        .await;
    assert_eq!(
        client.error_flash("/books").await.as_deref(),
        Some("Passwords do not match")
    );
}

#[tokio::test]
async fn test_last_copy_lending_scenario() {
    let app = TestApp::seeded().await;

    let mut admin = app.logged_in("admin", "admin123").await;
    let token = admin.csrf_token("/admin/add-book").await;
    let response = admin
        .post_form("/admin/add-book", &format!("{}&csrf_token={}", NEW_BOOK, token))
        .await;
    assert_eq!(location(&response), "/admin/books");
    let page = admin.page("/admin/books").await;
    assert_eq!(page["flashes"]["success"], "Book added: Dune");
    let book_id = page["books"][5]["id"].as_i64().expect("No new book");

    // reader takes the only copy
    let mut reader = app.logged_in("reader", "reader123").await;
    let response = reader.get(&format!("/reader/borrow/{}", book_id)).await;
    assert_eq!(location(&response), "/reader/borrowed");
    let borrowed = reader.page("/reader/borrowed").await;
    assert_eq!(borrowed["records"].as_array().map(Vec::len), Some(3));

    // a second reader is turned away
    let mut alice = app.client();
    let token = alice.csrf_token("/register").await;
    alice
        .post_form(
            "/register",
            &format!(
                "username=alice&email=alice%40example.com&password=secret1&confirm_password=secret1&csrf_token={}",
                token
            ),
        )
        .await;
    let response = alice.get(&format!("/reader/borrow/{}", book_id)).await;
    assert_eq!(location(&response), format!("/books/{}", book_id));
    let detail = alice.page(&format!("/books/{}", book_id)).await;
    assert_eq!(detail["flashes"]["error"], "No available stock for this book");
    assert_eq!(detail["book"]["available"], 0);

    // deleting a borrowed book is refused
    let response = admin.get(&format!("/admin/delete-book/{}", book_id)).await;
    assert_eq!(location(&response), "/admin/books");
    assert_eq!(
        admin.error_flash("/admin/books").await.as_deref(),
        Some("Cannot delete a book that is currently borrowed")
    );

    // the librarian takes the book back
    let records = app
        .client()
        .page(&format!("/api/borrow-records?book_id={}&status=active", book_id))
        .await;
    let record_id = records[0]["id"].as_i64().expect("No active record");
    let mut librarian = app.logged_in("librarian", "librarian123").await;
    let response = librarian
        .get(&format!("/librarian/return-book/{}", record_id))
        .await;
    assert_eq!(location(&response), "/librarian/borrow");

    // returning twice is refused
    librarian
        .get(&format!("/librarian/return-book/{}", record_id))
        .await;
    assert_eq!(
        librarian.error_flash("/librarian/borrow").await.as_deref(),
        Some("This book has already been returned")
    );

    let response = alice.get(&format!("/reader/borrow/{}", book_id)).await;
    assert_eq!(location(&response), "/reader/borrowed");
    let reader_books = alice.page("/reader/books").await;
    assert_eq!(reader_books["borrowed_book_ids"], serde_json::json!([book_id]));
}

#[tokio::test]
async fn test_librarian_creates_loan_with_csrf() {
    let app = TestApp::seeded().await;
    let mut librarian = app.logged_in("librarian", "librarian123").await;

    let token = librarian.csrf_token("/librarian/borrow").await;
    let response = librarian
        .post_form(
            "/librarian/create-borrow",
            &format!("user_id=3&book_id=5&csrf_token={}", token),
        )
        .await;
    assert_eq!(location(&response), "/librarian/borrow");
    let page = librarian.page("/librarian/borrow").await;
    assert_eq!(page["flashes"]["success"], "Loan created");
    assert_eq!(page["records"].as_array().map(Vec::len), Some(5));

    // same reader, same book, fresh token: duplicate active loan
    let token = page["csrf_token"].as_str().expect("No token").to_string();
    librarian
        .post_form(
            "/librarian/create-borrow",
            &format!("user_id=3&book_id=5&csrf_token={}", token),
        )
        .await;
    assert_eq!(
        librarian.error_flash("/librarian/borrow").await.as_deref(),
        Some("You have already borrowed this book and not returned it")
    );
}

#[tokio::test]
async fn test_reader_return_request() {
    let app = TestApp::seeded().await;
    let mut reader = app.logged_in("reader", "reader123").await;

    // loan 3 belongs to the reader, loan 2 to the librarian
    let response = reader.get("/reader/return-book/3").await;
    assert_eq!(location(&response), "/reader/borrowed");
    let page = reader.page("/reader/borrowed").await;
    assert_eq!(
        page["flashes"]["info"],
        "Please hand the book to a librarian to return it"
    );

    reader.get("/reader/return-book/2").await;
    assert_eq!(
        reader.error_flash("/reader/borrowed").await.as_deref(),
        Some("You are not allowed to act on this loan")
    );

    reader.get("/reader/return-book/99").await;
    assert_eq!(
        reader.error_flash("/reader/borrowed").await.as_deref(),
        Some("Borrow record with id 99 not found")
    );
}

#[tokio::test]
async fn test_admin_role_changes() {
    let app = TestApp::seeded().await;
    let mut admin = app.logged_in("admin", "admin123").await;

    admin.get("/admin/change-user-role/1/reader").await;
    assert_eq!(
        admin.error_flash("/admin/users").await.as_deref(),
        Some("You cannot change your own role")
    );

    admin.get("/admin/change-user-role/3/overlord").await;
    assert_eq!(
        admin.error_flash("/admin/users").await.as_deref(),
        Some("Invalid user role: overlord")
    );

    let response = admin.get("/admin/change-user-role/3/librarian").await;
    assert_eq!(location(&response), "/admin/users");
    let page = admin.page("/admin/users").await;
    assert_eq!(page["flashes"]["success"], "User role updated to librarian");
    assert_eq!(page["users"][2]["role"], "librarian");
    assert!(page["users"][2].get("password_hash").is_none());
}

#[tokio::test]
async fn test_edit_book_validation() {
    let app = TestApp::seeded().await;
    let mut admin = app.logged_in("admin", "admin123").await;

    let page = admin.page("/admin/edit-book/1").await;
    assert_eq!(page["book"]["title"], "Python Crash Course");
    let token = page["csrf_token"].as_str().expect("No token").to_string();

    // another book's ISBN
    let form = "title=Python&author=Eric+Matthes&isbn=9787115445353&published_year=2016\
&category=Programming&description=Intro&cover_url=x&quantity=5";
    let response = admin
        .post_form("/admin/edit-book/1", &format!("{}&csrf_token={}", form, token))
        .await;
    assert_eq!(location(&response), "/admin/edit-book/1");
    let page = admin.page("/admin/edit-book/1").await;
    assert_eq!(
        page["flashes"]["error"],
        "A book with ISBN 9787115445353 already exists"
    );

    let token = page["csrf_token"].as_str().expect("No token").to_string();
    let form = "title=Python&author=Eric+Matthes&isbn=9787115428028&published_year=2016\
&category=Programming&description=Intro&cover_url=x&quantity=5";
    let response = admin
        .post_form("/admin/edit-book/1", &format!("{}&csrf_token={}", form, token))
        .await;
    assert_eq!(location(&response), "/admin/books");
    let book = app.client().page("/api/books/1").await;
    assert_eq!(book["title"], "Python");
}

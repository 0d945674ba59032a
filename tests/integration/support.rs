//! In-process test client: drives the router with `oneshot` and carries the
//! session cookie from one request to the next like a browser would.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{
        header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
        Request, StatusCode,
    },
    response::Response,
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use library_server::{
    api,
    clock::SystemClock,
    config::AppConfig,
    repository::Repository,
    services::{seed, Services},
    AppState,
};

/// One application instance over fresh, seeded collections
pub struct TestApp {
    router: Router,
}

impl TestApp {
    pub async fn seeded() -> Self {
        let config = AppConfig::default();
        let services = Services::new(Repository::new(), &config, Arc::new(SystemClock));
        seed::load_sample_data(&services)
            .await
            .expect("Failed to load sample data");

        let state = AppState {
            config: Arc::new(config),
            services: Arc::new(services),
        };
        Self {
            router: api::router(state),
        }
    }

    /// A new visitor with no cookie yet
    pub fn client(&self) -> TestClient {
        TestClient {
            router: self.router.clone(),
            cookie: None,
        }
    }

    /// A visitor already logged in
    pub async fn logged_in(&self, username: &str, password: &str) -> TestClient {
        let mut client = self.client();
        let response = client.login(username, password).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/dashboard");
        client
    }
}

pub struct TestClient {
    router: Router,
    cookie: Option<String>,
}

impl TestClient {
    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    pub fn set_cookie(&mut self, cookie: Option<String>) {
        self.cookie = cookie;
    }

    pub async fn send(&mut self, mut request: Request<Body>) -> Response {
        if let Some(cookie) = &self.cookie {
            request
                .headers_mut()
                .insert(COOKIE, cookie.parse().expect("Invalid cookie header"));
        }

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router failed");

        if let Some(set_cookie) = response.headers().get(SET_COOKIE) {
            let pair = set_cookie
                .to_str()
                .expect("Non-ASCII Set-Cookie")
                .split(';')
                .next()
                .expect("Empty Set-Cookie")
                .to_string();
            self.cookie = Some(pair);
        }
        response
    }

    pub async fn get(&mut self, path: &str) -> Response {
        let request = Request::builder()
            .uri(path)
            .body(Body::empty())
            .expect("Failed to build request");
        self.send(request).await
    }

    pub async fn post_form(&mut self, path: &str, body: &str) -> Response {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .expect("Failed to build request");
        self.send(request).await
    }

    /// GET a page that must answer 200 and return its JSON body
    pub async fn page(&mut self, path: &str) -> Value {
        let response = self.get(path).await;
        assert_eq!(response.status(), StatusCode::OK, "GET {}", path);
        body_json(response).await
    }

    /// Fetch a form page and return the CSRF token it issued
    pub async fn csrf_token(&mut self, path: &str) -> String {
        let page = self.page(path).await;
        page["csrf_token"]
            .as_str()
            .expect("No csrf_token in page")
            .to_string()
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Response {
        let token = self.csrf_token("/login").await;
        self.post_form(
            "/login",
            &format!("username={}&password={}&csrf_token={}", username, password, token),
        )
        .await
    }

    /// Read the pending error flash by loading a page that shows it
    pub async fn error_flash(&mut self, page: &str) -> Option<String> {
        let page = self.page(page).await;
        page["flashes"]["error"].as_str().map(str::to_string)
    }
}

pub fn location(response: &Response) -> &str {
    response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("No Location header")
}

pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

//! HTTP layer: interactive pages, JSON mirrors and routing.
//!
//! Interactive routes never answer with an error status for a domain
//! failure: the error becomes a flash message and the visitor is
//! redirected. Page GETs return their view model as JSON.

pub mod access;
pub mod admin;
pub mod auth;
pub mod books;
pub mod health;
pub mod json;
pub mod librarian;
pub mod openapi;
pub mod reader;
pub mod session;

use axum::{
    extract::{rejection::PathRejection, Path},
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;

use crate::{
    error::AppError,
    models::session::{Identity, FLASH_ERROR, FLASH_INFO, FLASH_SUCCESS},
    services::sessions::Session,
    AppState,
};

/// Flash messages pending for the current page, consumed on read
#[derive(Debug, Default, Serialize)]
pub struct Flashes {
    pub error: Option<String>,
    pub success: Option<String>,
    pub info: Option<String>,
}

impl Flashes {
    pub async fn take(session: &Session) -> Self {
        Self {
            error: session.take_flash(FLASH_ERROR).await,
            success: session.take_flash(FLASH_SUCCESS).await,
            info: session.take_flash(FLASH_INFO).await,
        }
    }
}

/// Context shared by every page: who is looking, and what to tell them
#[derive(Debug, Serialize)]
pub struct PageContext {
    pub title: String,
    pub user: Option<Identity>,
    pub flashes: Flashes,
}

impl PageContext {
    pub async fn load(session: &Session, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            user: session.identity().await,
            flashes: Flashes::take(session).await,
        }
    }
}

/// Store a flash message and redirect
pub async fn flash_redirect(
    session: &Session,
    kind: &str,
    message: impl Into<String>,
    to: &str,
) -> Response {
    if let Err(e) = session.set_flash(kind, message).await {
        tracing::warn!("Could not store flash message: {}", e);
    }
    Redirect::to(to).into_response()
}

/// Unwrap a path parameter, turning a malformed one into a validation error
pub fn path_param<T>(path: Result<Path<T>, PathRejection>, message: &str) -> Result<T, AppError> {
    path.map(|Path(value)| value).map_err(|rejection| {
        tracing::debug!("Rejected path parameter: {}", rejection.body_text());
        AppError::Validation(message.to_string())
    })
}

/// Report a failed operation as an error flash on the page at `to`
pub async fn error_redirect(session: &Session, error: AppError, to: &str) -> Response {
    match &error {
        AppError::Internal(msg) => tracing::error!("Internal error: {}", msg),
        other => tracing::debug!("Request rejected: {}", other),
    }
    flash_redirect(session, FLASH_ERROR, error.user_message(), to).await
}

/// Build the application router with the session layer installed
pub fn router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/books", get(admin::books))
        .route("/users", get(admin::users))
        .route("/add-book", get(admin::add_book_page).post(admin::add_book))
        .route("/edit-book/:id", get(admin::edit_book_page).post(admin::edit_book))
        .route("/delete-book/:id", get(admin::delete_book))
        .route("/change-user-role/:id/:role", get(admin::change_user_role))
        .route_layer(middleware::from_fn(access::require_admin));

    let librarian = Router::new()
        .route("/books", get(librarian::books))
        .route("/borrow", get(librarian::borrow_page))
        .route("/create-borrow", post(librarian::create_borrow))
        .route("/return-book/:id", get(librarian::return_book))
        .route_layer(middleware::from_fn(access::require_staff));

    let reader = Router::new()
        .route("/books", get(reader::books))
        .route("/borrow/:id", get(reader::borrow))
        .route("/borrowed", get(reader::borrowed))
        .route("/return-book/:id", get(reader::return_book))
        .route_layer(middleware::from_fn(access::require_login));

    let logged_in = Router::new()
        .route("/dashboard", get(auth::dashboard))
        .route_layer(middleware::from_fn(access::require_login));

    let api = Router::new()
        .route("/books", get(json::list_books))
        .route("/books/:id", get(json::get_book))
        .route("/categories", get(json::list_categories))
        .route("/borrow-records", get(json::list_borrow_records));

    let app = Router::new()
        .route("/", get(books::index))
        .route("/books", get(books::list))
        .route("/books/:id", get(books::detail))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", get(auth::logout))
        .merge(logged_in)
        .nest("/admin", admin)
        .nest("/librarian", librarian)
        .nest("/reader", reader)
        .nest("/api", api)
        .layer(middleware::from_fn_with_state(state.clone(), session::session_layer))
        .route("/health", get(health::health_check))
        .with_state(state);

    app.merge(openapi::create_openapi_router())
}

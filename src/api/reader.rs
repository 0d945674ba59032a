//! Reader self-service pages

use axum::{
    extract::{rejection::PathRejection, Path, Query, State},
    response::Response,
    Extension, Json,
};
use serde::Serialize;

use crate::{
    error::AppError,
    models::{
        book::{BookQuery, BookWithAvailability},
        loan::BorrowRecordDetails,
        session::{Identity, FLASH_INFO, FLASH_SUCCESS},
    },
    services::sessions::Session,
    AppState,
};

use super::{error_redirect, flash_redirect, path_param, PageContext};

const BORROWED_PAGE: &str = "/reader/borrowed";

#[derive(Serialize)]
pub struct ReaderBooksPage {
    #[serde(flatten)]
    pub page: PageContext,
    pub books: Vec<BookWithAvailability>,
    pub categories: Vec<String>,
    /// Books the reader currently holds
    pub borrowed_book_ids: Vec<i32>,
    pub query: String,
    pub category: String,
}

#[derive(Serialize)]
pub struct BorrowedPage {
    #[serde(flatten)]
    pub page: PageContext,
    pub records: Vec<BorrowRecordDetails>,
}

/// `GET /reader/books`
pub async fn books(
    State(state): State<AppState>,
    session: Session,
    Extension(identity): Extension<Identity>,
    Query(query): Query<BookQuery>,
) -> Json<ReaderBooksPage> {
    let services = &state.services;
    let books = services.catalog.query(&query).await;

    Json(ReaderBooksPage {
        page: PageContext::load(&session, "Books").await,
        books: services.catalog.with_availability(books).await,
        categories: services.catalog.categories().await,
        borrowed_book_ids: services.loans.active_book_ids(identity.user_id).await,
        query: query.q.unwrap_or_default(),
        category: query.category.unwrap_or_default(),
    })
}

/// `GET /reader/borrow/:id`
pub async fn borrow(
    State(state): State<AppState>,
    session: Session,
    Extension(identity): Extension<Identity>,
    path: Result<Path<i32>, PathRejection>,
) -> Response {
    let book_id = match path_param(path, "Invalid book ID") {
        Ok(id) => id,
        Err(e) => return error_redirect(&session, e, "/books").await,
    };
    match state.services.loans.borrow(identity.user_id, book_id).await {
        Ok(_) => {
            let message = format!(
                "Book borrowed, please return it within {} days",
                state.config.loans.loan_period_days
            );
            flash_redirect(&session, FLASH_SUCCESS, message, BORROWED_PAGE).await
        }
        Err(e) => error_redirect(&session, e, &format!("/books/{}", book_id)).await,
    }
}

/// `GET /reader/borrowed`
pub async fn borrowed(
    State(state): State<AppState>,
    session: Session,
    Extension(identity): Extension<Identity>,
) -> Json<BorrowedPage> {
    let loans = &state.services.loans;
    Json(BorrowedPage {
        page: PageContext::load(&session, "My loans").await,
        records: loans.details(loans.by_user(identity.user_id).await).await,
    })
}

/// `GET /reader/return-book/:id`: readers hand books to a librarian, so this
/// only checks the loan is theirs and says so.
pub async fn return_book(
    State(state): State<AppState>,
    session: Session,
    Extension(identity): Extension<Identity>,
    path: Result<Path<i32>, PathRejection>,
) -> Response {
    let id = match path_param(path, "Invalid borrow record ID") {
        Ok(id) => id,
        Err(e) => return error_redirect(&session, e, BORROWED_PAGE).await,
    };
    let record = match state.services.loans.get(id).await {
        Ok(record) => record,
        Err(e) => return error_redirect(&session, e, BORROWED_PAGE).await,
    };

    if record.user_id != identity.user_id {
        let denied = AppError::Authorization("You are not allowed to act on this loan".to_string());
        return error_redirect(&session, denied, BORROWED_PAGE).await;
    }

    flash_redirect(
        &session,
        FLASH_INFO,
        "Please hand the book to a librarian to return it",
        BORROWED_PAGE,
    )
    .await
}

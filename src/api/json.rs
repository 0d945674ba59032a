//! Read-only JSON mirrors of the catalog and the loan ledger

use axum::{
    extract::{rejection::PathRejection, Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::AppResult,
    models::{
        book::{BookQuery, BookWithAvailability},
        loan::{BorrowRecordDetails, LoanStatus},
    },
    AppState,
};

use super::path_param;

/// Borrow record filters, all optional and combined with AND
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct BorrowRecordQuery {
    pub user_id: Option<i32>,
    pub book_id: Option<i32>,
    /// `active` (not yet returned, overdue included), `overdue` or `returned`
    pub status: Option<LoanStatus>,
}

/// List books
#[utoipa::path(
    get,
    path = "/api/books",
    tag = "books",
    params(BookQuery),
    responses(
        (status = 200, description = "Books in catalog order", body = Vec<BookWithAvailability>)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<BookQuery>,
) -> Json<Vec<BookWithAvailability>> {
    let catalog = &state.services.catalog;
    let books = catalog.query(&query).await;
    Json(catalog.with_availability(books).await)
}

/// Get book by ID
#[utoipa::path(
    get,
    path = "/api/books/{id}",
    tag = "books",
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = BookWithAvailability),
        (status = 400, description = "Malformed book ID", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
) -> AppResult<Json<BookWithAvailability>> {
    let id = path_param(path, "Invalid book ID")?;
    let book = state.services.catalog.get_with_availability(id).await?;
    Ok(Json(book))
}

/// List categories
#[utoipa::path(
    get,
    path = "/api/categories",
    tag = "books",
    responses(
        (status = 200, description = "Distinct categories in first-seen order", body = Vec<String>)
    )
)]
pub async fn list_categories(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.services.catalog.categories().await)
}

/// List borrow records
#[utoipa::path(
    get,
    path = "/api/borrow-records",
    tag = "loans",
    params(BorrowRecordQuery),
    responses(
        (status = 200, description = "Borrow records with names and derived state", body = Vec<BorrowRecordDetails>)
    )
)]
pub async fn list_borrow_records(
    State(state): State<AppState>,
    Query(query): Query<BorrowRecordQuery>,
) -> Json<Vec<BorrowRecordDetails>> {
    let loans = &state.services.loans;

    let records = match (query.user_id, query.book_id, query.status) {
        (Some(user_id), _, _) => loans.by_user(user_id).await,
        (None, Some(book_id), _) => loans.by_book(book_id).await,
        (None, None, Some(LoanStatus::Overdue)) => loans.overdue().await,
        (None, None, Some(LoanStatus::Active)) => loans.active().await,
        (None, None, _) => loans.all().await,
    };

    let mut details = loans.details(records).await;
    if let Some(book_id) = query.book_id {
        details.retain(|d| d.record.book_id == book_id);
    }
    match query.status {
        Some(LoanStatus::Active) => details.retain(|d| d.record.is_active()),
        Some(LoanStatus::Overdue) => details.retain(|d| d.is_overdue),
        Some(LoanStatus::Returned) => details.retain(|d| !d.record.is_active()),
        None => {}
    }

    Json(details)
}

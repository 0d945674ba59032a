//! Librarian pages: lending and returns

use axum::{
    extract::{
        rejection::{FormRejection, PathRejection},
        Path, State,
    },
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::Serialize;

use crate::{
    models::{
        book::BookWithAvailability,
        loan::{BorrowForm, BorrowRecordDetails},
        session::{FLASH_ERROR, FLASH_SUCCESS},
        user::User,
    },
    services::sessions::Session,
    AppState,
};

use super::{error_redirect, flash_redirect, path_param, PageContext};

const BORROW_PAGE: &str = "/librarian/borrow";

#[derive(Serialize)]
pub struct LibrarianBooksPage {
    #[serde(flatten)]
    pub page: PageContext,
    pub books: Vec<BookWithAvailability>,
}

#[derive(Serialize)]
pub struct BorrowPage {
    #[serde(flatten)]
    pub page: PageContext,
    pub csrf_token: String,
    pub records: Vec<BorrowRecordDetails>,
    pub users: Vec<User>,
    /// Books with at least one copy on the shelf
    pub books: Vec<BookWithAvailability>,
}

/// `GET /librarian/books`
pub async fn books(State(state): State<AppState>, session: Session) -> Json<LibrarianBooksPage> {
    let catalog = &state.services.catalog;
    let books = catalog.list().await;
    Json(LibrarianBooksPage {
        page: PageContext::load(&session, "Books").await,
        books: catalog.with_availability(books).await,
    })
}

/// `GET /librarian/borrow`
pub async fn borrow_page(State(state): State<AppState>, session: Session) -> Response {
    let csrf_token = match session.issue_csrf_token().await {
        Ok(token) => token,
        Err(e) => return e.into_response(),
    };
    let services = &state.services;

    Json(BorrowPage {
        page: PageContext::load(&session, "Loans").await,
        csrf_token,
        records: services.loans.details(services.loans.all().await).await,
        users: services.users.list().await,
        books: services.catalog.available_books().await,
    })
    .into_response()
}

/// `POST /librarian/create-borrow`
pub async fn create_borrow(
    State(state): State<AppState>,
    session: Session,
    form: Result<Form<BorrowForm>, FormRejection>,
) -> Response {
    let Ok(Form(form)) = form else {
        return flash_redirect(&session, FLASH_ERROR, "Please select a user and a book", BORROW_PAGE).await;
    };

    if let Err(e) = session.verify_csrf_token(&form.csrf_token).await {
        return error_redirect(&session, e, BORROW_PAGE).await;
    }

    match state.services.loans.borrow(form.user_id, form.book_id).await {
        Ok(_) => flash_redirect(&session, FLASH_SUCCESS, "Loan created", BORROW_PAGE).await,
        Err(e) => error_redirect(&session, e, BORROW_PAGE).await,
    }
}

/// `GET /librarian/return-book/:id`
pub async fn return_book(
    State(state): State<AppState>,
    session: Session,
    path: Result<Path<i32>, PathRejection>,
) -> Response {
    let id = match path_param(path, "Invalid borrow record ID") {
        Ok(id) => id,
        Err(e) => return error_redirect(&session, e, BORROW_PAGE).await,
    };
    match state.services.loans.return_loan(id).await {
        Ok(_) => flash_redirect(&session, FLASH_SUCCESS, "Book returned", BORROW_PAGE).await,
        Err(e) => error_redirect(&session, e, BORROW_PAGE).await,
    }
}

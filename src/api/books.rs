//! Public catalog pages

use axum::{
    extract::{rejection::PathRejection, Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::{
    models::book::{BookQuery, BookWithAvailability},
    services::sessions::Session,
    AppState,
};

use super::{error_redirect, path_param, PageContext};

const FEATURED_COUNT: usize = 4;

#[derive(Serialize)]
pub struct HomePage {
    #[serde(flatten)]
    pub page: PageContext,
    pub featured_books: Vec<BookWithAvailability>,
    pub categories: Vec<String>,
}

#[derive(Serialize)]
pub struct BookListPage {
    #[serde(flatten)]
    pub page: PageContext,
    pub books: Vec<BookWithAvailability>,
    pub categories: Vec<String>,
    pub query: String,
    pub category: String,
}

#[derive(Serialize)]
pub struct BookDetailPage {
    #[serde(flatten)]
    pub page: PageContext,
    pub book: BookWithAvailability,
    /// The visitor holds an active loan of this book
    pub borrowed_by_you: bool,
}

/// `GET /`
pub async fn index(State(state): State<AppState>, session: Session) -> Json<HomePage> {
    let catalog = &state.services.catalog;
    let mut books = catalog.list().await;
    books.truncate(FEATURED_COUNT);

    Json(HomePage {
        page: PageContext::load(&session, "Home").await,
        featured_books: catalog.with_availability(books).await,
        categories: catalog.categories().await,
    })
}

/// `GET /books[?q=][&category=]`
pub async fn list(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<BookQuery>,
) -> Json<BookListPage> {
    let catalog = &state.services.catalog;
    let books = catalog.query(&query).await;

    Json(BookListPage {
        page: PageContext::load(&session, "Books").await,
        books: catalog.with_availability(books).await,
        categories: catalog.categories().await,
        query: query.q.unwrap_or_default(),
        category: query.category.unwrap_or_default(),
    })
}

/// `GET /books/:id`
pub async fn detail(
    State(state): State<AppState>,
    session: Session,
    path: Result<Path<i32>, PathRejection>,
) -> Response {
    let id = match path_param(path, "Invalid book ID") {
        Ok(id) => id,
        Err(e) => return error_redirect(&session, e, "/books").await,
    };
    let book = match state.services.catalog.get_with_availability(id).await {
        Ok(book) => book,
        Err(e) => return error_redirect(&session, e, "/books").await,
    };

    let borrowed_by_you = match session.identity().await {
        Some(who) => state
            .services
            .loans
            .active_book_ids(who.user_id)
            .await
            .contains(&id),
        None => false,
    };

    Json(BookDetailPage {
        page: PageContext::load(&session, book.book.title.clone()).await,
        book,
        borrowed_by_you,
    })
    .into_response()
}

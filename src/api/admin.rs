//! Administrator pages: catalog maintenance and user roles

use axum::{
    extract::{
        rejection::{FormRejection, PathRejection},
        Path, State,
    },
    response::{IntoResponse, Response},
    Extension, Form, Json,
};
use serde::Serialize;

use crate::{
    error::AppError,
    models::{
        book::{BookForm, BookWithAvailability},
        session::{Identity, FLASH_ERROR, FLASH_SUCCESS},
        user::{Role, User},
    },
    services::sessions::Session,
    AppState,
};

use super::{auth::FormPage, error_redirect, flash_redirect, path_param, PageContext};

const BOOKS_PAGE: &str = "/admin/books";
const USERS_PAGE: &str = "/admin/users";
const INVALID_BOOK_FORM: &str = "Please fill in all required fields correctly";
const INVALID_BOOK_ID: &str = "Invalid book ID";

#[derive(Serialize)]
pub struct AdminBooksPage {
    #[serde(flatten)]
    pub page: PageContext,
    pub books: Vec<BookWithAvailability>,
}

#[derive(Serialize)]
pub struct AdminUsersPage {
    #[serde(flatten)]
    pub page: PageContext,
    pub users: Vec<User>,
    /// The acting admin, whose own role cannot be changed here
    pub current_user_id: i32,
}

#[derive(Serialize)]
pub struct EditBookPage {
    #[serde(flatten)]
    pub form: FormPage,
    pub book: BookWithAvailability,
}

/// `GET /admin/books`
pub async fn books(State(state): State<AppState>, session: Session) -> Json<AdminBooksPage> {
    let catalog = &state.services.catalog;
    let books = catalog.list().await;
    Json(AdminBooksPage {
        page: PageContext::load(&session, "Manage books").await,
        books: catalog.with_availability(books).await,
    })
}

/// `GET /admin/users`
pub async fn users(
    State(state): State<AppState>,
    session: Session,
    Extension(identity): Extension<Identity>,
) -> Json<AdminUsersPage> {
    Json(AdminUsersPage {
        page: PageContext::load(&session, "Manage users").await,
        users: state.services.users.list().await,
        current_user_id: identity.user_id,
    })
}

/// `GET /admin/add-book`
pub async fn add_book_page(session: Session) -> Response {
    match session.issue_csrf_token().await {
        Ok(csrf_token) => Json(FormPage {
            page: PageContext::load(&session, "Add book").await,
            csrf_token,
        })
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// `POST /admin/add-book`
pub async fn add_book(
    State(state): State<AppState>,
    session: Session,
    form: Result<Form<BookForm>, FormRejection>,
) -> Response {
    const FORM_PAGE: &str = "/admin/add-book";

    let Ok(Form(form)) = form else {
        return flash_redirect(&session, FLASH_ERROR, INVALID_BOOK_FORM, FORM_PAGE).await;
    };
    let (fields, csrf_token) = form.into_parts();

    if let Err(e) = session.verify_csrf_token(&csrf_token).await {
        return error_redirect(&session, e, FORM_PAGE).await;
    }

    match state.services.catalog.create(fields).await {
        Ok(book) => {
            flash_redirect(&session, FLASH_SUCCESS, format!("Book added: {}", book.title), BOOKS_PAGE).await
        }
        Err(e) => error_redirect(&session, e, FORM_PAGE).await,
    }
}

/// `GET /admin/edit-book/:id`
pub async fn edit_book_page(
    State(state): State<AppState>,
    session: Session,
    path: Result<Path<i32>, PathRejection>,
) -> Response {
    let id = match path_param(path, INVALID_BOOK_ID) {
        Ok(id) => id,
        Err(e) => return error_redirect(&session, e, BOOKS_PAGE).await,
    };
    let book = match state.services.catalog.get_with_availability(id).await {
        Ok(book) => book,
        Err(e) => return error_redirect(&session, e, BOOKS_PAGE).await,
    };

    match session.issue_csrf_token().await {
        Ok(csrf_token) => Json(EditBookPage {
            form: FormPage {
                page: PageContext::load(&session, format!("Edit {}", book.book.title)).await,
                csrf_token,
            },
            book,
        })
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// `POST /admin/edit-book/:id`
pub async fn edit_book(
    State(state): State<AppState>,
    session: Session,
    path: Result<Path<i32>, PathRejection>,
    form: Result<Form<BookForm>, FormRejection>,
) -> Response {
    let id = match path_param(path, INVALID_BOOK_ID) {
        Ok(id) => id,
        Err(e) => return error_redirect(&session, e, BOOKS_PAGE).await,
    };
    let form_page = format!("/admin/edit-book/{}", id);

    let Ok(Form(form)) = form else {
        return flash_redirect(&session, FLASH_ERROR, INVALID_BOOK_FORM, &form_page).await;
    };
    let (fields, csrf_token) = form.into_parts();

    if let Err(e) = session.verify_csrf_token(&csrf_token).await {
        return error_redirect(&session, e, &form_page).await;
    }

    match state.services.catalog.update(id, fields).await {
        Ok(book) => {
            flash_redirect(&session, FLASH_SUCCESS, format!("Book updated: {}", book.title), BOOKS_PAGE).await
        }
        Err(e @ AppError::NotFound(_)) => error_redirect(&session, e, BOOKS_PAGE).await,
        Err(e) => error_redirect(&session, e, &form_page).await,
    }
}

/// `GET /admin/delete-book/:id`
pub async fn delete_book(
    State(state): State<AppState>,
    session: Session,
    path: Result<Path<i32>, PathRejection>,
) -> Response {
    let id = match path_param(path, INVALID_BOOK_ID) {
        Ok(id) => id,
        Err(e) => return error_redirect(&session, e, BOOKS_PAGE).await,
    };
    match state.services.catalog.delete(id).await {
        Ok(book) => {
            flash_redirect(&session, FLASH_SUCCESS, format!("Book deleted: {}", book.title), BOOKS_PAGE).await
        }
        Err(e) => error_redirect(&session, e, BOOKS_PAGE).await,
    }
}

/// `GET /admin/change-user-role/:id/:role`
pub async fn change_user_role(
    State(state): State<AppState>,
    session: Session,
    Extension(identity): Extension<Identity>,
    path: Result<Path<(i32, String)>, PathRejection>,
) -> Response {
    let (id, role) = match path_param(path, "Invalid user ID") {
        Ok(params) => params,
        Err(e) => return error_redirect(&session, e, USERS_PAGE).await,
    };
    let role: Role = match role.parse() {
        Ok(role) => role,
        Err(e) => return error_redirect(&session, e, USERS_PAGE).await,
    };

    if id == identity.user_id {
        return flash_redirect(
            &session,
            FLASH_ERROR,
            "You cannot change your own role",
            USERS_PAGE,
        )
        .await;
    }

    match state.services.users.update_role(id, role).await {
        Ok(user) => {
            tracing::info!("{} changed the role of {} to {}", identity.username, user.username, role);
            flash_redirect(
                &session,
                FLASH_SUCCESS,
                format!("User role updated to {}", role),
                USERS_PAGE,
            )
            .await
        }
        Err(e) => error_redirect(&session, e, USERS_PAGE).await,
    }
}

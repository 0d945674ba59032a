//! Login, registration, logout and the dashboard

use axum::{
    extract::{rejection::FormRejection, State},
    response::{IntoResponse, Redirect, Response},
    Extension, Form, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        session::{Identity, FLASH_ERROR, FLASH_REDIRECT, FLASH_SUCCESS},
        user::{CreateUser, LoginForm, RegisterForm, Role, User},
    },
    services::sessions::Session,
    AppState,
};

use super::{error_redirect, flash_redirect, PageContext};

/// Any page carrying a form
#[derive(Serialize)]
pub struct FormPage {
    #[serde(flatten)]
    pub page: PageContext,
    pub csrf_token: String,
}

/// Counters shown on the dashboard, by role
#[derive(Debug, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum DashboardStats {
    Admin {
        user_count: usize,
        book_count: usize,
        borrow_count: usize,
    },
    Librarian {
        book_count: usize,
        active_borrow_count: usize,
        overdue_count: usize,
    },
    Reader {
        borrowed_books_count: usize,
        overdue_books_count: usize,
    },
}

#[derive(Serialize)]
pub struct DashboardPage {
    #[serde(flatten)]
    pub page: PageContext,
    pub now: DateTime<Utc>,
    pub stats: DashboardStats,
}

/// Render a form page with a fresh CSRF token, or send logged-in visitors on
async fn form_page(session: Session, title: &str) -> Response {
    if session.is_logged_in().await {
        return Redirect::to("/dashboard").into_response();
    }

    match session.issue_csrf_token().await {
        Ok(csrf_token) => Json(FormPage {
            page: PageContext::load(&session, title).await,
            csrf_token,
        })
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Only same-site absolute paths are followed after login
fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//")
}

/// Start an authenticated session under a fresh identifier
async fn start_session(session: &Session, user: &User) -> Result<(), AppError> {
    session.cycle().await;
    session.log_in(user).await
}

/// `GET /login`
pub async fn login_page(session: Session) -> Response {
    form_page(session, "Log in").await
}

/// `POST /login`
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Response {
    let form = match form {
        Ok(Form(form)) if !form.username.trim().is_empty() && !form.password.is_empty() => form,
        _ => {
            return flash_redirect(
                &session,
                FLASH_ERROR,
                "Username and password are required",
                "/login",
            )
            .await
        }
    };

    if let Err(e) = session.verify_csrf_token(&form.csrf_token).await {
        return error_redirect(&session, e, "/login").await;
    }

    let user = match state
        .services
        .users
        .authenticate(&form.username, &form.password)
        .await
    {
        Ok(user) => user,
        Err(e) => return error_redirect(&session, e, "/login").await,
    };

    let target = session
        .take_flash(FLASH_REDIRECT)
        .await
        .filter(|path| is_local_path(path))
        .unwrap_or_else(|| "/dashboard".to_string());

    if let Err(e) = start_session(&session, &user).await {
        return error_redirect(&session, e, "/login").await;
    }

    tracing::info!("User {} logged in", user.username);
    flash_redirect(
        &session,
        FLASH_SUCCESS,
        format!("Welcome back, {}!", user.username),
        &target,
    )
    .await
}

/// `GET /register`
pub async fn register_page(session: Session) -> Response {
    form_page(session, "Register").await
}

/// `POST /register`: new accounts are always readers
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    form: Result<Form<RegisterForm>, FormRejection>,
) -> Response {
    let Ok(Form(form)) = form else {
        return flash_redirect(
            &session,
            FLASH_ERROR,
            "Please fill in all required fields and make sure the passwords match",
            "/register",
        )
        .await;
    };

    if let Err(e) = form.validate() {
        return error_redirect(&session, e.into(), "/register").await;
    }

    if let Err(e) = session.verify_csrf_token(&form.csrf_token).await {
        return error_redirect(&session, e, "/register").await;
    }

    let user = match state
        .services
        .users
        .register(CreateUser {
            username: form.username,
            email: form.email,
            password: form.password,
            role: Role::Reader,
        })
        .await
    {
        Ok(user) => user,
        Err(e) => return error_redirect(&session, e, "/register").await,
    };

    if let Err(e) = start_session(&session, &user).await {
        return error_redirect(&session, e, "/login").await;
    }

    flash_redirect(
        &session,
        FLASH_SUCCESS,
        format!("Registration successful! Welcome, {}", user.username),
        "/dashboard",
    )
    .await
}

/// `GET /logout`: clear the session and continue under a new identifier
pub async fn logout(session: Session) -> Response {
    if let Some(who) = session.identity().await {
        tracing::info!("User {} logged out", who.username);
    }
    session.cycle().await;
    flash_redirect(&session, FLASH_SUCCESS, "You have been logged out", "/").await
}

/// `GET /dashboard`
pub async fn dashboard(
    State(state): State<AppState>,
    session: Session,
    Extension(identity): Extension<Identity>,
) -> Json<DashboardPage> {
    let services = &state.services;

    let stats = match identity.role {
        Role::Admin => DashboardStats::Admin {
            user_count: services.users.count().await,
            book_count: services.catalog.count().await,
            borrow_count: services.loans.count().await,
        },
        Role::Librarian => DashboardStats::Librarian {
            book_count: services.catalog.count().await,
            active_borrow_count: services.loans.count_active().await,
            overdue_count: services.loans.count_overdue().await,
        },
        Role::Reader => {
            let (active, overdue) = services.loans.counts_for_user(identity.user_id).await;
            DashboardStats::Reader {
                borrowed_books_count: active,
                overdue_books_count: overdue,
            }
        }
    };

    Json(DashboardPage {
        page: PageContext::load(&session, "Dashboard").await,
        now: services.loans.now(),
        stats,
    })
}

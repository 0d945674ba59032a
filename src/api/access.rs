//! Route gating by session identity and role

use axum::{
    extract::{OriginalUri, Request},
    http::Method,
    middleware::Next,
    response::Response,
};

use crate::{
    models::{
        session::{Identity, FLASH_ERROR, FLASH_REDIRECT},
        user::Role,
    },
    services::sessions::Session,
};

use super::flash_redirect;

/// What a route requires of the visitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    LoggedIn,
    Staff,
    Admin,
}

/// Why a request was turned away and where to send the visitor instead
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDenied {
    pub reason: &'static str,
    pub redirect_to: &'static str,
    /// Anonymous visitor, as opposed to a logged-in one lacking the role
    pub needs_login: bool,
}

/// Decide whether `identity` may use a route requiring `access`
pub fn authorize(identity: Option<&Identity>, access: Access) -> Result<&Identity, AccessDenied> {
    let identity = identity.ok_or(AccessDenied {
        reason: "Please log in first",
        redirect_to: "/login",
        needs_login: true,
    })?;

    let allowed = match access {
        Access::LoggedIn => true,
        Access::Staff => identity.role.is_staff(),
        Access::Admin => identity.role == Role::Admin,
    };
    if allowed {
        return Ok(identity);
    }

    let reason = match access {
        Access::Admin => "Administrator privileges required",
        _ => "Librarian privileges required",
    };
    Err(AccessDenied {
        reason,
        redirect_to: "/dashboard",
        needs_login: false,
    })
}

/// Full request path, including any prefix a nested router stripped
fn requested_path(request: &Request) -> String {
    match request.extensions().get::<OriginalUri>() {
        Some(OriginalUri(uri)) => uri.path().to_string(),
        None => request.uri().path().to_string(),
    }
}

async fn gate(session: Session, mut request: Request, next: Next, access: Access) -> Response {
    let identity = session.identity().await;
    match authorize(identity.as_ref(), access) {
        Ok(identity) => {
            request.extensions_mut().insert(identity.clone());
            next.run(request).await
        }
        Err(denied) => {
            let path = requested_path(&request);
            tracing::debug!("Access denied to {} {}: {}", request.method(), path, denied.reason);
            if denied.needs_login && request.method() == Method::GET {
                if let Err(e) = session.set_flash(FLASH_REDIRECT, path).await {
                    tracing::warn!("Could not remember requested path: {}", e);
                }
            }
            flash_redirect(&session, FLASH_ERROR, denied.reason, denied.redirect_to).await
        }
    }
}

pub async fn require_login(session: Session, request: Request, next: Next) -> Response {
    gate(session, request, next, Access::LoggedIn).await
}

pub async fn require_staff(session: Session, request: Request, next: Next) -> Response {
    gate(session, request, next, Access::Staff).await
}

pub async fn require_admin(session: Session, request: Request, next: Next) -> Response {
    gate(session, request, next, Access::Admin).await
}

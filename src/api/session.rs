//! Cookie session middleware and the `Session` extractor

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::{error::AppError, services::sessions::Session, AppState};

/// Resume or create the visitor's session, expose it to handlers, and write
/// the (possibly rotated) session cookie on the way out.
pub async fn session_layer(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let config = &state.config.session;
    let presented = jar.get(&config.cookie_name).map(|c| c.value().to_string());

    let session = state
        .services
        .sessions
        .create_or_resume(presented.as_deref())
        .await;
    request.extensions_mut().insert(session.clone());

    let response = next.run(request).await;

    let ttl = state.services.sessions.ttl();
    let cookie = Cookie::build((config.cookie_name.clone(), session.id().await))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.secure_cookie)
        .max_age(time::Duration::seconds(ttl.num_seconds()));

    (jar.add(cookie), response).into_response()
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("Session layer is not installed".to_string()))
    }
}

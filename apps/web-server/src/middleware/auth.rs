//! Session cookie extractors.

use actix_web::cookie::{Cookie, SameSite, time::Duration};
use actix_web::http::{StatusCode, header};
use actix_web::{FromRequest, HttpRequest, HttpResponse, ResponseError, dev::Payload, web};
use futures::future::LocalBoxFuture;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use inkwell_core::domain::User;
use inkwell_core::ports::BaseRepository;

use crate::state::AppState;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "sessionid";

/// Characters escaped in the `next` parameter. Slashes stay readable.
const NEXT_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Signed-in user extractor.
///
/// Anonymous requests are answered with a redirect to the login page that
/// brings the user back afterwards:
/// ```ignore
/// async fn create(identity: Identity) -> AppResult<HttpResponse> {
///     tracing::info!(user = %identity.user, "Creating a post");
///     ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Identity {
    pub user: User,
}

/// Optional identity extractor - never fails, anonymous is `None`.
#[derive(Debug, Clone)]
pub struct OptionalIdentity(pub Option<User>);

impl OptionalIdentity {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }
}

/// Rejection for anonymous access to a members-only page.
#[derive(Debug)]
pub struct LoginRequired {
    next: String,
}

impl LoginRequired {
    fn for_request(req: &HttpRequest) -> Self {
        let next = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| req.path().to_string());
        Self { next }
    }
}

/// `/auth/login/?next=<path>`.
pub fn login_url(next: &str) -> String {
    format!("/auth/login/?next={}", utf8_percent_encode(next, NEXT_ESCAPE))
}

impl std::fmt::Display for LoginRequired {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "login required for {}", self.next)
    }
}

impl ResponseError for LoginRequired {
    fn status_code(&self) -> StatusCode {
        StatusCode::FOUND
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::Found()
            .insert_header((header::LOCATION, login_url(&self.next)))
            .finish()
    }
}

/// Resolve the session cookie to a stored user.
async fn current_user(req: &HttpRequest) -> Option<User> {
    let cookie = req.cookie(SESSION_COOKIE)?;
    let Some(state) = req.app_data::<web::Data<AppState>>() else {
        tracing::error!("AppState not found in app data");
        return None;
    };

    let claims = match state.tokens.validate_session(cookie.value()) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring session cookie");
            return None;
        }
    };

    match state.users.find_by_id(claims.user_id).await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!(error = %e, user_id = claims.user_id, "Failed to load session user");
            None
        }
    }
}

impl FromRequest for OptionalIdentity {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move { Ok(OptionalIdentity(current_user(&req).await)) })
    }
}

impl FromRequest for Identity {
    type Error = LoginRequired;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            match current_user(&req).await {
                Some(user) => Ok(Identity { user }),
                None => Err(LoginRequired::for_request(&req)),
            }
        })
    }
}

/// The cookie set after a successful login or password change.
pub fn session_cookie(token: String, ttl_seconds: i64, secure: bool) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(ttl_seconds))
        .finish()
}

/// A cookie that makes the browser forget the session.
pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}

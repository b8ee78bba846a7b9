//! Account pages: signup, login, logout, password change and reset.

use actix_web::{HttpResponse, web};
use minijinja::{Value, context};

use inkwell_core::domain::User;
use inkwell_core::error::RepoError;
use inkwell_core::forms::{
    FormErrors, INVALID_LOGIN, LoginForm, PasswordChangeForm, PasswordResetForm, SetPasswordForm,
    SignupForm, USERNAME_TAKEN,
};
use inkwell_core::ports::BaseRepository;
use inkwell_shared::dto::{
    LoginRequest, NextQuery, PasswordChangeRequest, PasswordResetRequest, SetPasswordRequest,
    SignupRequest,
};

use super::views::{html, redirect};
use crate::middleware::auth::{Identity, OptionalIdentity, removal_cookie, session_cookie};
use crate::middleware::error::AppResult;
use crate::state::AppState;
use crate::templates;

fn page(name: &str, viewer: Option<&User>, ctx: Value) -> AppResult<HttpResponse> {
    let body = templates::render(name, context! { viewer, ..ctx })?;
    Ok(html(body))
}

/// Only same-site paths are followed after login.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => "/",
    }
}

fn signup_page(values: &SignupRequest, errors: FormErrors) -> AppResult<HttpResponse> {
    page(
        "users/signup.html",
        None,
        context! { fields => SignupForm::FIELDS, values, errors },
    )
}

/// GET /auth/signup/
pub async fn signup_form() -> AppResult<HttpResponse> {
    signup_page(&SignupRequest::default(), FormErrors::new())
}

/// POST /auth/signup/
pub async fn signup(
    state: web::Data<AppState>,
    form: web::Form<SignupRequest>,
) -> AppResult<HttpResponse> {
    let request = form.into_inner();
    let submitted = SignupForm {
        first_name: request.first_name.clone(),
        last_name: request.last_name.clone(),
        username: request.username.clone(),
        email: request.email.clone(),
        password1: request.password1.clone(),
        password2: request.password2.clone(),
    };

    let account = match submitted.validate() {
        Ok(account) => account,
        Err(errors) => return signup_page(&request, errors),
    };
    if state.users.find_by_username(&account.username).await?.is_some() {
        let mut errors = FormErrors::new();
        errors.add("username", USERNAME_TAKEN);
        return signup_page(&request, errors);
    }

    let password_hash = state.passwords.hash(&account.password)?;
    let user = User::new(account.username, account.email, password_hash)
        .with_names(account.first_name, account.last_name);

    match state.users.save(user).await {
        Ok(user) => {
            tracing::info!(user_id = user.id, username = %user, "User registered");
            Ok(redirect("/auth/login/"))
        }
        // Lost a race with another signup for the same name.
        Err(RepoError::Constraint(_)) => {
            let mut errors = FormErrors::new();
            errors.add("username", USERNAME_TAKEN);
            signup_page(&request, errors)
        }
        Err(e) => Err(e.into()),
    }
}

fn login_page(
    values: &LoginRequest,
    next: Option<&str>,
    errors: FormErrors,
) -> AppResult<HttpResponse> {
    page(
        "users/login.html",
        None,
        context! {
            fields => LoginForm::FIELDS,
            values => context! { username => &values.username },
            next,
            errors,
        },
    )
}

/// GET /auth/login/
pub async fn login_form(query: web::Query<NextQuery>) -> AppResult<HttpResponse> {
    login_page(
        &LoginRequest::default(),
        query.next.as_deref(),
        FormErrors::new(),
    )
}

/// POST /auth/login/
pub async fn login(
    state: web::Data<AppState>,
    query: web::Query<NextQuery>,
    form: web::Form<LoginRequest>,
) -> AppResult<HttpResponse> {
    let request = form.into_inner();
    let next = request.next.as_deref().or(query.next.as_deref());

    let submitted = LoginForm {
        username: request.username.clone(),
        password: request.password.clone(),
    };
    let (username, password) = match submitted.validate() {
        Ok(pair) => pair,
        Err(errors) => return login_page(&request, next, errors),
    };

    let user = match state.users.find_by_username(&username).await? {
        Some(user) if matches!(state.passwords.verify(&password, &user.password_hash), Ok(true)) => {
            user
        }
        _ => {
            tracing::info!(username = %username, "Failed login");
            let mut errors = FormErrors::new();
            errors.add_non_field(INVALID_LOGIN);
            return login_page(&request, next, errors);
        }
    };

    let token = state.tokens.issue_session(&user)?;
    tracing::info!(user_id = user.id, "User logged in");

    Ok(HttpResponse::Found()
        .insert_header((actix_web::http::header::LOCATION, safe_next(next)))
        .cookie(session_cookie(
            token,
            state.tokens.session_ttl_seconds(),
            state.settings.session_cookie_secure,
        ))
        .finish())
}

/// GET|POST /auth/logout/
pub async fn logout() -> AppResult<HttpResponse> {
    let body = templates::render("users/logged_out.html", context! {})?;
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .cookie(removal_cookie())
        .body(body))
}

fn password_change_page(viewer: &User, errors: FormErrors) -> AppResult<HttpResponse> {
    page(
        "users/password_change_form.html",
        Some(viewer),
        context! {
            fields => PasswordChangeForm::FIELDS,
            values => context! {},
            errors,
        },
    )
}

/// GET /auth/password_change/
pub async fn password_change_form(identity: Identity) -> AppResult<HttpResponse> {
    password_change_page(&identity.user, FormErrors::new())
}

/// POST /auth/password_change/
pub async fn password_change(
    state: web::Data<AppState>,
    identity: Identity,
    form: web::Form<PasswordChangeRequest>,
) -> AppResult<HttpResponse> {
    let request = form.into_inner();
    let old_ok = matches!(
        state
            .passwords
            .verify(&request.old_password, &identity.user.password_hash),
        Ok(true)
    );

    let submitted = PasswordChangeForm {
        old_password: request.old_password,
        new_password1: request.new_password1,
        new_password2: request.new_password2,
    };
    let new_password = match submitted.validate(old_ok) {
        Ok(password) => password,
        Err(errors) => return password_change_page(&identity.user, errors),
    };

    let mut user = identity.user;
    user.password_hash = state.passwords.hash(&new_password)?;
    let user = state.users.save(user).await?;
    tracing::info!(user_id = user.id, "Password changed");

    // The old cookie still validates; hand out a fresh one anyway.
    let token = state.tokens.issue_session(&user)?;
    Ok(HttpResponse::Found()
        .insert_header((
            actix_web::http::header::LOCATION,
            "/auth/password_change/done/",
        ))
        .cookie(session_cookie(
            token,
            state.tokens.session_ttl_seconds(),
            state.settings.session_cookie_secure,
        ))
        .finish())
}

/// GET /auth/password_change/done/
pub async fn password_change_done(identity: Identity) -> AppResult<HttpResponse> {
    page(
        "users/password_change_done.html",
        Some(&identity.user),
        context! {},
    )
}

fn password_reset_page(
    viewer: Option<&User>,
    values: &PasswordResetRequest,
    errors: FormErrors,
) -> AppResult<HttpResponse> {
    page(
        "users/password_reset_form.html",
        viewer,
        context! { fields => PasswordResetForm::FIELDS, values, errors },
    )
}

/// GET /auth/password_reset/
pub async fn password_reset_form(viewer: OptionalIdentity) -> AppResult<HttpResponse> {
    password_reset_page(
        viewer.user(),
        &PasswordResetRequest::default(),
        FormErrors::new(),
    )
}

/// POST /auth/password_reset/
///
/// Mails (logs) a reset link to every account with the address. The
/// response is the same whether or not any account matched.
pub async fn password_reset(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    form: web::Form<PasswordResetRequest>,
) -> AppResult<HttpResponse> {
    let request = form.into_inner();
    let submitted = PasswordResetForm {
        email: request.email.clone(),
    };
    let email = match submitted.validate() {
        Ok(email) => email,
        Err(errors) => return password_reset_page(viewer.user(), &request, errors),
    };

    for user in state.users.find_by_email(&email).await? {
        let token = state.tokens.issue_password_reset(&user)?;
        let link = state
            .settings
            .absolute_url(&format!("/auth/reset/{}/{token}/", user.id));
        tracing::info!(
            to = %user.email,
            username = %user,
            link = %link,
            "Password reset e-mail"
        );
    }

    Ok(redirect("/auth/password_reset/done/"))
}

/// GET /auth/password_reset/done/
pub async fn password_reset_done(viewer: OptionalIdentity) -> AppResult<HttpResponse> {
    page("users/password_reset_done.html", viewer.user(), context! {})
}

/// The user a reset link points at, when the link is still good.
async fn reset_target(state: &AppState, uid: &str, token: &str) -> AppResult<Option<User>> {
    let Ok(id) = uid.parse::<i32>() else {
        return Ok(None);
    };
    let Some(user) = state.users.find_by_id(id).await? else {
        return Ok(None);
    };
    match state.tokens.validate_password_reset(token, &user) {
        Ok(()) => Ok(Some(user)),
        Err(e) => {
            tracing::info!(user_id = id, error = %e, "Rejected password reset link");
            Ok(None)
        }
    }
}

fn reset_confirm_page(
    viewer: Option<&User>,
    validlink: bool,
    errors: FormErrors,
) -> AppResult<HttpResponse> {
    page(
        "users/password_reset_confirm.html",
        viewer,
        context! {
            fields => SetPasswordForm::FIELDS,
            values => context! {},
            validlink,
            errors,
        },
    )
}

/// GET /auth/reset/{uid}/{token}/
pub async fn password_reset_confirm_form(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    viewer: OptionalIdentity,
) -> AppResult<HttpResponse> {
    let (uid, token) = path.into_inner();
    let target = reset_target(&state, &uid, &token).await?;
    reset_confirm_page(viewer.user(), target.is_some(), FormErrors::new())
}

/// POST /auth/reset/{uid}/{token}/
pub async fn password_reset_confirm(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    viewer: OptionalIdentity,
    form: web::Form<SetPasswordRequest>,
) -> AppResult<HttpResponse> {
    let (uid, token) = path.into_inner();
    let Some(mut user) = reset_target(&state, &uid, &token).await? else {
        return reset_confirm_page(viewer.user(), false, FormErrors::new());
    };

    let request = form.into_inner();
    let submitted = SetPasswordForm {
        new_password1: request.new_password1,
        new_password2: request.new_password2,
    };
    let new_password = match submitted.validate() {
        Ok(password) => password,
        Err(errors) => return reset_confirm_page(viewer.user(), true, errors),
    };

    user.password_hash = state.passwords.hash(&new_password)?;
    let user = state.users.save(user).await?;
    tracing::info!(user_id = user.id, "Password reset");

    Ok(redirect("/auth/reset/done/"))
}

/// GET /auth/reset/done/
pub async fn password_reset_complete(viewer: OptionalIdentity) -> AppResult<HttpResponse> {
    page(
        "users/password_reset_complete.html",
        viewer.user(),
        context! {},
    )
}

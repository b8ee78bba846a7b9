//! HTTP handlers and route configuration.

mod auth;
mod posts;
mod views;

#[cfg(test)]
mod tests;

use actix_web::{HttpRequest, HttpResponse, web};

use crate::middleware::error::{AppError, AppResult};

/// Upper bound for a urlencoded form body.
pub const MAX_FORM_BYTES: usize = 1024 * 1024;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    // A malformed id is an unknown page, not a bad request.
    cfg.app_data(
        web::PathConfig::default()
            .error_handler(|_, req| AppError::NotFound(req.path().to_string()).into()),
    );
    cfg.app_data(web::FormConfig::default().limit(MAX_FORM_BYTES));

    cfg.route("/", web::get().to(posts::index))
        .route("/group/{slug}/", web::get().to(posts::group_posts))
        .route("/profile/{username}/", web::get().to(posts::profile))
        .route("/profile/{username}/follow/", web::get().to(posts::profile_follow))
        .route("/profile/{username}/unfollow/", web::get().to(posts::profile_unfollow))
        .route("/posts/{id}/", web::get().to(posts::post_detail))
        .service(
            web::resource("/posts/{id}/edit/")
                .route(web::get().to(posts::post_edit_form))
                .route(web::post().to(posts::post_edit)),
        )
        .route("/posts/{id}/comment/", web::post().to(posts::add_comment))
        .service(
            web::resource("/create/")
                .route(web::get().to(posts::post_create_form))
                .route(web::post().to(posts::post_create)),
        )
        .route("/follow/", web::get().to(posts::follow_index))
        .service(
            web::scope("/auth")
                .service(
                    web::resource("/signup/")
                        .route(web::get().to(auth::signup_form))
                        .route(web::post().to(auth::signup)),
                )
                .service(
                    web::resource("/login/")
                        .route(web::get().to(auth::login_form))
                        .route(web::post().to(auth::login)),
                )
                .service(
                    web::resource("/logout/")
                        .route(web::get().to(auth::logout))
                        .route(web::post().to(auth::logout)),
                )
                .service(
                    web::resource("/password_change/")
                        .route(web::get().to(auth::password_change_form))
                        .route(web::post().to(auth::password_change)),
                )
                .route(
                    "/password_change/done/",
                    web::get().to(auth::password_change_done),
                )
                .service(
                    web::resource("/password_reset/")
                        .route(web::get().to(auth::password_reset_form))
                        .route(web::post().to(auth::password_reset)),
                )
                .route(
                    "/password_reset/done/",
                    web::get().to(auth::password_reset_done),
                )
                .route("/reset/done/", web::get().to(auth::password_reset_complete))
                .service(
                    web::resource("/reset/{uid}/{token}/")
                        .route(web::get().to(auth::password_reset_confirm_form))
                        .route(web::post().to(auth::password_reset_confirm)),
                ),
        )
        .default_service(web::to(not_found));
}

/// Anything no route matched.
pub async fn not_found(req: HttpRequest) -> AppResult<HttpResponse> {
    Err(AppError::NotFound(req.path().to_string()))
}

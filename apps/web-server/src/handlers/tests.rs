use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use actix_web::http::{StatusCode, header};
use actix_web::{App, test, web};
use async_trait::async_trait;

use inkwell_core::domain::{Comment, Group, Post, User};
use inkwell_core::forms::{INVALID_CHOICE, INVALID_LOGIN, REQUIRED, USERNAME_TAKEN};
use inkwell_core::error::RepoError;
use inkwell_core::pagination::{Page, PageRequest};
use inkwell_core::ports::{BaseRepository, PostRepository};
use inkwell_infra::auth::{JwtConfig, JwtTokenService};
use inkwell_infra::database::{DatabaseConfig, DatabaseConnections};
use inkwell_infra::media::FsMediaStore;
use inkwell_shared::dto::{
    CommentRequest, LoginRequest, PasswordChangeRequest, PasswordResetRequest, PostRequest,
    SetPasswordRequest, SignupRequest,
};

use super::configure_routes;
use crate::config::Settings;
use crate::middleware::auth::SESSION_COOKIE;
use crate::state::AppState;

const SMALL_GIF: &[u8] = b"\x47\x49\x46\x38\x39\x61\x02\x00\x01\x00\x80\x00\x00\x00\x00\x00\
    \xFF\xFF\xFF\x21\xF9\x04\x00\x00\x00\x00\x00\x2C\x00\x00\x00\x00\
    \x02\x00\x01\x00\x00\x02\x02\x0C\x0A\x00\x3B";

static MEDIA_DIRS: AtomicUsize = AtomicUsize::new(0);

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state.clone()))
                .configure(configure_routes),
        )
        .await
    };
}

fn media_dir() -> PathBuf {
    std::env::temp_dir().join(format!(
        "inkwell-web-{}-{}",
        std::process::id(),
        MEDIA_DIRS.fetch_add(1, Ordering::SeqCst)
    ))
}

async fn state() -> AppState {
    state_in(media_dir()).await
}

async fn state_in(media: PathBuf) -> AppState {
    let db = DatabaseConnections::init(&DatabaseConfig::in_memory())
        .await
        .unwrap();
    AppState::from_parts(
        db.main,
        JwtTokenService::new(JwtConfig {
            secret: "test-secret".to_string(),
            ..JwtConfig::default()
        }),
        FsMediaStore::new(media),
        Settings::default(),
    )
}

async fn user(state: &AppState, username: &str) -> User {
    state
        .users
        .save(User::new(
            username.to_string(),
            format!("{}@example.com", username.to_lowercase()),
            "!unusable".to_string(),
        ))
        .await
        .unwrap()
}

async fn group(state: &AppState, slug: &str) -> Group {
    state
        .groups
        .save(Group::new(
            "Тестовая группа".to_string(),
            slug.to_string(),
            "Тестовое описание".to_string(),
        ))
        .await
        .unwrap()
}

async fn post(state: &AppState, author: &User, group: Option<&Group>) -> Post {
    state
        .posts
        .save(Post::new(
            author.id,
            "Тестовый пост".to_string(),
            group.map(|g| g.id),
        ))
        .await
        .unwrap()
}

fn session(state: &AppState, user: &User) -> Cookie<'static> {
    Cookie::new(SESSION_COOKIE, state.tokens.issue_session(user).unwrap())
}

fn location(resp: &ServiceResponse) -> String {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn body(resp: ServiceResponse) -> String {
    String::from_utf8(test::read_body(resp).await.to_vec()).unwrap()
}

async fn post_count(state: &AppState) -> u64 {
    state.posts.page_all(PageRequest::first()).await.unwrap().count
}

fn stored_images(media: &Path) -> usize {
    std::fs::read_dir(media.join("posts"))
        .map(|dir| dir.count())
        .unwrap_or(0)
}

/// Multipart post body carrying `SMALL_GIF` as the image.
fn post_with_image(boundary: &str, text: &str) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"text\"\r\n\r\n{text}\r\n\
             --{boundary}\r\nContent-Disposition: form-data; name=\"group\"\r\n\r\n\r\n\
             --{boundary}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"small.gif\"\r\n\
             Content-Type: image/gif\r\n\r\n"
        )
        .as_bytes(),
    );
    payload.extend_from_slice(SMALL_GIF);
    payload.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    payload
}

/// Reads go to the database, every save fails.
struct UnsavablePosts(Arc<dyn PostRepository>);

#[async_trait]
impl BaseRepository<Post, i32> for UnsavablePosts {
    async fn find_by_id(&self, id: i32) -> Result<Option<Post>, RepoError> {
        self.0.find_by_id(id).await
    }

    async fn save(&self, _post: Post) -> Result<Post, RepoError> {
        Err(RepoError::Query("database is locked".to_string()))
    }

    async fn delete(&self, id: i32) -> Result<(), RepoError> {
        self.0.delete(id).await
    }
}

#[async_trait]
impl PostRepository for UnsavablePosts {
    async fn page_all(&self, request: PageRequest) -> Result<Page<Post>, RepoError> {
        self.0.page_all(request).await
    }

    async fn page_by_group(
        &self,
        group_id: i32,
        request: PageRequest,
    ) -> Result<Page<Post>, RepoError> {
        self.0.page_by_group(group_id, request).await
    }

    async fn page_by_author(
        &self,
        author_id: i32,
        request: PageRequest,
    ) -> Result<Page<Post>, RepoError> {
        self.0.page_by_author(author_id, request).await
    }

    async fn page_by_authors(
        &self,
        author_ids: &[i32],
        request: PageRequest,
    ) -> Result<Page<Post>, RepoError> {
        self.0.page_by_authors(author_ids, request).await
    }

    async fn count_by_author(&self, author_id: i32) -> Result<u64, RepoError> {
        self.0.count_by_author(author_id).await
    }
}

async fn newest_post(state: &AppState) -> Post {
    state
        .posts
        .page_all(PageRequest::first())
        .await
        .unwrap()
        .items
        .remove(0)
}

#[actix_web::test]
async fn test_public_pages_use_their_templates() {
    let state = state().await;
    let author = user(&state, "HasNoName").await;
    let group = group(&state, "test_slug").await;
    let post = post(&state, &author, Some(&group)).await;
    let app = app!(state);

    let pages = [
        ("/".to_string(), "<title>Последние обновления на сайте</title>"),
        (
            "/group/test_slug/".to_string(),
            "<title>Записи сообщества Тестовая группа</title>",
        ),
        (
            "/profile/HasNoName/".to_string(),
            "<title>Профайл пользователя HasNoName</title>",
        ),
        (format!("/posts/{}/", post.id), "<title>Пост Тестовый пост</title>"),
    ];
    for (uri, title) in pages {
        let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK, "{uri}");
        assert!(body(resp).await.contains(title), "{uri}");
    }
}

#[actix_web::test]
async fn test_unknown_pages_are_not_found() {
    let state = state().await;
    let app = app!(state);

    for uri in [
        "/unexisting_page/",
        "/group/missing/",
        "/profile/nobody/",
        "/posts/404/",
        "/posts/abc/",
    ] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
        assert!(body(resp).await.contains("<title>Страница не найдена</title>"), "{uri}");
    }
}

#[actix_web::test]
async fn test_anonymous_is_sent_to_login() {
    let state = state().await;
    let author = user(&state, "HasNoName").await;
    let post = post(&state, &author, None).await;
    let app = app!(state);

    let edit = format!("/posts/{}/edit/", post.id);
    for uri in ["/create/", "/follow/", "/profile/HasNoName/follow/", edit.as_str()] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::FOUND, "{uri}");
        assert_eq!(location(&resp), format!("/auth/login/?next={uri}"));
    }

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/posts/{}/comment/", post.id))
            .set_form(CommentRequest {
                text: "Тестовый комментарий".into(),
            })
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert!(location(&resp).starts_with("/auth/login/?next="));
    assert!(state.comments.list_for_post(post.id).await.unwrap().is_empty());
}

#[actix_web::test]
async fn test_members_see_authoring_pages() {
    let state = state().await;
    let author = user(&state, "HasNoName").await;
    let post = post(&state, &author, None).await;
    let app = app!(state);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/create/")
            .cookie(session(&state, &author))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body(resp).await.contains("<title>Новый пост</title>"));

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/posts/{}/edit/", post.id))
            .cookie(session(&state, &author))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body(resp).await;
    assert!(html.contains("<title>Редактировать пост</title>"));
    assert!(html.contains("Тестовый пост"));
}

#[actix_web::test]
async fn test_non_author_edit_redirects_to_post() {
    let state = state().await;
    let author = user(&state, "HasNoName").await;
    let stranger = user(&state, "stranger").await;
    let post = post(&state, &author, None).await;
    let app = app!(state);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/posts/{}/edit/", post.id))
            .cookie(session(&state, &stranger))
            .set_form(PostRequest {
                text: "Чужая правка".into(),
                group: String::new(),
            })
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{}/", post.id));
    let unchanged = state.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(unchanged.text, "Тестовый пост");
}

#[actix_web::test]
async fn test_create_post_redirects_to_profile() {
    let state = state().await;
    let author = user(&state, "HasNoName").await;
    let group = group(&state, "test_slug").await;
    let app = app!(state);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/create/")
            .cookie(session(&state, &author))
            .set_form(PostRequest {
                text: "Тестовый пост".into(),
                group: group.id.to_string(),
            })
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/profile/HasNoName/");
    assert_eq!(post_count(&state).await, 1);
    let created = newest_post(&state).await;
    assert_eq!(created.text, "Тестовый пост");
    assert_eq!(created.group_id, Some(group.id));
    assert_eq!(created.author_id, author.id);
}

#[actix_web::test]
async fn test_create_post_with_image() {
    let state = state().await;
    let author = user(&state, "HasNoName").await;
    let app = app!(state);

    let boundary = "inkwell-test-boundary";
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/create/")
            .cookie(session(&state, &author))
            .insert_header((
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            ))
            .set_payload(post_with_image(boundary, "Тестовый пост"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let created = newest_post(&state).await;
    let image = created.image.clone().unwrap();
    assert!(image.starts_with("posts/"));
    assert!(image.ends_with("-small.gif"));

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/posts/{}/", created.id))
            .to_request(),
    )
    .await;
    let file_name = image.rsplit('/').next().unwrap();
    assert!(body(resp).await.contains(file_name));
    state.media.remove(&image).await.unwrap();
}

#[actix_web::test]
async fn test_failed_save_discards_uploaded_image() {
    let media = media_dir();
    let mut state = state_in(media.clone()).await;
    let author = user(&state, "HasNoName").await;
    let existing = post(&state, &author, None).await;
    state.posts = Arc::new(UnsavablePosts(state.posts.clone()));
    let app = app!(state);
    let boundary = "inkwell-test-boundary";

    for uri in ["/create/".to_string(), format!("/posts/{}/edit/", existing.id)] {
        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri(&uri)
                .cookie(session(&state, &author))
                .insert_header((
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                ))
                .set_payload(post_with_image(boundary, "Новый текст"))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(stored_images(&media), 0);
    }

    assert_eq!(post_count(&state).await, 1);
    let unchanged = state.posts.find_by_id(existing.id).await.unwrap().unwrap();
    assert_eq!(unchanged.image, None);
    assert_eq!(unchanged.text, "Тестовый пост");
}

#[actix_web::test]
async fn test_invalid_post_is_not_saved() {
    let state = state().await;
    let author = user(&state, "HasNoName").await;
    let app = app!(state);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/create/")
            .cookie(session(&state, &author))
            .set_form(PostRequest {
                text: "   ".into(),
                group: "999".into(),
            })
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let html = body(resp).await;
    assert!(html.contains(REQUIRED));
    assert!(html.contains(INVALID_CHOICE));
    assert_eq!(post_count(&state).await, 0);
}

#[actix_web::test]
async fn test_edit_post_keeps_identity() {
    let state = state().await;
    let author = user(&state, "HasNoName").await;
    let group = group(&state, "test_slug").await;
    let post = post(&state, &author, None).await;
    let app = app!(state);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/posts/{}/edit/", post.id))
            .cookie(session(&state, &author))
            .set_form(PostRequest {
                text: "Редактируем тестовый пост".into(),
                group: group.id.to_string(),
            })
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{}/", post.id));
    assert_eq!(post_count(&state).await, 1);
    let edited = state.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(edited.text, "Редактируем тестовый пост");
    assert_eq!(edited.group_id, Some(group.id));
    assert_eq!(edited.author_id, author.id);
}

#[actix_web::test]
async fn test_listings_paginate() {
    let state = state().await;
    let author = user(&state, "HasNoName").await;
    let group = group(&state, "test_slug").await;
    for _ in 0..13 {
        post(&state, &author, Some(&group)).await;
    }
    let app = app!(state);

    for base in ["/", "/group/test_slug/", "/profile/HasNoName/"] {
        for (query, expected) in [("", 10), ("?page=2", 3), ("?page=99", 3), ("?page=x", 10)] {
            let uri = format!("{base}{query}");
            let html = body(
                test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await,
            )
            .await;
            assert_eq!(html.matches("<article").count(), expected, "{uri}");
        }
    }
}

#[actix_web::test]
async fn test_post_lands_only_in_its_group() {
    let state = state().await;
    let author = user(&state, "HasNoName").await;
    let target = group(&state, "test_slug").await;
    group(&state, "other_slug").await;
    post(&state, &author, Some(&target)).await;
    let app = app!(state);

    for (uri, expected) in [
        ("/", 1),
        ("/group/test_slug/", 1),
        ("/profile/HasNoName/", 1),
        ("/group/other_slug/", 0),
    ] {
        let html =
            body(test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await)
                .await;
        assert_eq!(html.matches("<article").count(), expected, "{uri}");
    }
}

#[actix_web::test]
async fn test_comment_is_listed_first() {
    let state = state().await;
    let author = user(&state, "HasNoName").await;
    let reader = user(&state, "reader").await;
    let post = post(&state, &author, None).await;
    state
        .comments
        .save(Comment::new(post.id, author.id, "Старый комментарий".into()))
        .await
        .unwrap();
    let app = app!(state);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/posts/{}/comment/", post.id))
            .cookie(session(&state, &reader))
            .set_form(CommentRequest {
                text: "Тестовый комментарий".into(),
            })
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{}/", post.id));

    let comments = state.comments.list_for_post(post.id).await.unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0].text, "Тестовый комментарий");
    assert_eq!(comments[0].author_id, reader.id);

    let html = body(
        test::call_service(
            &app,
            test::TestRequest::get()
                .uri(&format!("/posts/{}/", post.id))
                .to_request(),
        )
        .await,
    )
    .await;
    let newest = html.find("Тестовый комментарий").unwrap();
    let oldest = html.find("Старый комментарий").unwrap();
    assert!(newest < oldest);
}

#[actix_web::test]
async fn test_blank_comment_is_dropped() {
    let state = state().await;
    let author = user(&state, "HasNoName").await;
    let post = post(&state, &author, None).await;
    let app = app!(state);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/posts/{}/comment/", post.id))
            .cookie(session(&state, &author))
            .set_form(CommentRequest { text: " ".into() })
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert!(state.comments.list_for_post(post.id).await.unwrap().is_empty());
}

#[actix_web::test]
async fn test_long_comment_is_accepted() {
    let state = state().await;
    let author = user(&state, "HasNoName").await;
    let post = post(&state, &author, None).await;
    let app = app!(state);
    let text = "ж".repeat(5_000);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/posts/{}/comment/", post.id))
            .cookie(session(&state, &author))
            .set_form(CommentRequest { text: text.clone() })
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    let comments = state.comments.list_for_post(post.id).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].text, text);
}

#[actix_web::test]
async fn test_index_is_cached_until_cleared() {
    let state = state().await;
    let author = user(&state, "HasNoName").await;
    let doomed = post(&state, &author, None).await;
    let app = app!(state);

    let first = test::call_and_read_body(&app, test::TestRequest::get().uri("/").to_request()).await;
    state.posts.delete(doomed.id).await.unwrap();
    let second =
        test::call_and_read_body(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(first, second);

    state.cache.clear().await;
    let third = test::call_and_read_body(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_ne!(first, third);
}

#[actix_web::test]
async fn test_cached_index_is_the_same_for_everyone() {
    let state = state().await;
    let author = user(&state, "HasNoName").await;
    let reader = user(&state, "reader").await;
    post(&state, &author, None).await;
    let app = app!(state);

    let member = body(
        test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/")
                .cookie(session(&state, &reader))
                .to_request(),
        )
        .await,
    )
    .await;
    let anonymous =
        body(test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await).await;

    assert_eq!(member, anonymous);
    assert!(!anonymous.contains("Пользователь: reader"));
    assert!(!anonymous.contains("/auth/logout/"));
    assert!(anonymous.contains("/auth/login/"));
}

#[actix_web::test]
async fn test_follow_feed() {
    let state = state().await;
    let reader = user(&state, "HasNoName").await;
    let author = user(&state, "author").await;
    let bystander = user(&state, "bystander").await;
    post(&state, &author, None).await;
    let app = app!(state);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/profile/author/follow/")
            .cookie(session(&state, &reader))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/profile/author/");
    assert!(state.follows.is_following(reader.id, author.id).await.unwrap());

    let feed = |who: &User| {
        test::TestRequest::get()
            .uri("/follow/")
            .cookie(session(&state, who))
            .to_request()
    };
    let html = body(test::call_service(&app, feed(&reader)).await).await;
    assert!(html.contains("<title>Избранные авторы</title>"));
    assert_eq!(html.matches("<article").count(), 1);
    let html = body(test::call_service(&app, feed(&bystander)).await).await;
    assert_eq!(html.matches("<article").count(), 0);

    test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/profile/author/unfollow/")
            .cookie(session(&state, &reader))
            .to_request(),
    )
    .await;
    assert!(!state.follows.is_following(reader.id, author.id).await.unwrap());
    let html = body(test::call_service(&app, feed(&reader)).await).await;
    assert_eq!(html.matches("<article").count(), 0);
}

#[actix_web::test]
async fn test_self_follow_is_ignored() {
    let state = state().await;
    let reader = user(&state, "HasNoName").await;
    let app = app!(state);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/profile/HasNoName/follow/")
            .cookie(session(&state, &reader))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(state.follows.following_count(reader.id).await.unwrap(), 0);
}

#[actix_web::test]
async fn test_profile_shows_follow_state() {
    let state = state().await;
    let reader = user(&state, "HasNoName").await;
    let author = user(&state, "author").await;
    state.follows.follow(reader.id, author.id).await.unwrap();
    let app = app!(state);

    let html = body(
        test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/profile/author/")
                .cookie(session(&state, &reader))
                .to_request(),
        )
        .await,
    )
    .await;
    assert!(html.contains("Отписаться"));
    assert!(html.contains("Подписчиков: 1"));
}

#[actix_web::test]
async fn test_signup_creates_account() {
    let state = state().await;
    let app = app!(state);
    let form = SignupRequest {
        first_name: "Лев".into(),
        last_name: "Толстой".into(),
        username: "leo".into(),
        email: "leo@example.com".into(),
        password1: "Qwerty_1234".into(),
        password2: "Qwerty_1234".into(),
    };

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/signup/")
            .set_form(form.clone())
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/auth/login/");

    let user = state.users.find_by_username("leo").await.unwrap().unwrap();
    assert_eq!(user.display_name(), "Лев Толстой");
    assert!(state.passwords.verify("Qwerty_1234", &user.password_hash).unwrap());

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/signup/")
            .set_form(form)
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body(resp).await.contains(USERNAME_TAKEN));
}

#[actix_web::test]
async fn test_login_and_logout() {
    let state = state().await;
    let mut account = User::new(
        "HasNoName".into(),
        String::new(),
        state.passwords.hash("Qwerty_1234").unwrap(),
    );
    account = state.users.save(account).await.unwrap();
    let app = app!(state);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/login/")
            .set_form(LoginRequest {
                username: "HasNoName".into(),
                password: "wrong".into(),
                next: None,
            })
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body(resp).await.contains(INVALID_LOGIN));

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/login/")
            .set_form(LoginRequest {
                username: "HasNoName".into(),
                password: "Qwerty_1234".into(),
                next: Some("/create/".into()),
            })
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/create/");
    let cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .unwrap()
        .into_owned();
    assert_eq!(
        state.tokens.validate_session(cookie.value()).unwrap().user_id,
        account.id
    );

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/create/")
            .cookie(cookie.clone())
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/auth/logout/")
            .cookie(cookie)
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let removal = resp
        .response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .unwrap()
        .into_owned();
    assert_eq!(removal.value(), "");
    assert!(body(resp).await.contains("<title>Вы вышли из системы</title>"));
}

#[actix_web::test]
async fn test_password_change() {
    let state = state().await;
    let account = state
        .users
        .save(User::new(
            "HasNoName".into(),
            String::new(),
            state.passwords.hash("Qwerty_1234").unwrap(),
        ))
        .await
        .unwrap();
    let app = app!(state);

    let change = |old: &str| {
        test::TestRequest::post()
            .uri("/auth/password_change/")
            .cookie(session(&state, &account))
            .set_form(PasswordChangeRequest {
                old_password: old.into(),
                new_password1: "Another_5678".into(),
                new_password2: "Another_5678".into(),
            })
            .to_request()
    };

    let resp = test::call_service(&app, change("wrong")).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(&app, change("Qwerty_1234")).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/auth/password_change/done/");
    assert!(resp.response().cookies().any(|c| c.name() == SESSION_COOKIE));

    let stored = state.users.find_by_id(account.id).await.unwrap().unwrap();
    assert!(state.passwords.verify("Another_5678", &stored.password_hash).unwrap());
}

#[actix_web::test]
async fn test_password_reset_flow() {
    let state = state().await;
    let account = user(&state, "HasNoName").await;
    let app = app!(state);

    for email in ["hasnoname@example.com", "nobody@example.com"] {
        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/auth/password_reset/")
                .set_form(PasswordResetRequest {
                    email: email.into(),
                })
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/auth/password_reset/done/");
    }

    let token = state.tokens.issue_password_reset(&account).unwrap();
    let link = format!("/auth/reset/{}/{token}/", account.id);

    let html = body(
        test::call_service(&app, test::TestRequest::get().uri(&link).to_request()).await,
    )
    .await;
    assert!(html.contains("Введите новый пароль"));

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&link)
            .set_form(SetPasswordRequest {
                new_password1: "Qwerty_1234".into(),
                new_password2: "Qwerty_1234".into(),
            })
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/auth/reset/done/");

    let stored = state.users.find_by_id(account.id).await.unwrap().unwrap();
    assert!(state.passwords.verify("Qwerty_1234", &stored.password_hash).unwrap());

    // The password hash moved on, so the link is spent.
    let html = body(
        test::call_service(&app, test::TestRequest::get().uri(&link).to_request()).await,
    )
    .await;
    assert!(html.contains("Ссылка сброса пароля содержит ошибку"));
}

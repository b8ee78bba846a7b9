//! Blog pages: listings, post detail, authoring, comments and follows.

use actix_multipart::Multipart;
use actix_web::http::header;
use actix_web::{FromRequest, HttpRequest, HttpResponse, web};
use futures::StreamExt;
use minijinja::context;

use inkwell_core::DomainError;
use inkwell_core::domain::{Comment, Group, Post, User};
use inkwell_core::forms::{CommentForm, FormErrors, PostForm, PostInput, Upload};
use inkwell_core::pagination::PageRequest;
use inkwell_core::ports::BaseRepository;
use inkwell_shared::dto::{CommentRequest, PageQuery, PostRequest};

use super::views::{
    AuthorView, GroupView, PostCard, comment_views, html, media_url, post_cards, post_url, profile_url,
    redirect,
};
use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;
use crate::templates;

/// Upper bound for one uploaded image.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

fn page_request(query: &PageQuery) -> PageRequest {
    PageRequest::parse(query.page.as_deref())
}

/// GET / - every post, served from the page cache while it is fresh.
///
/// The cached body is shared by every visitor, so it is rendered as seen
/// by an anonymous one.
pub async fn index(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let key = format!(
        "index_page:{}",
        req.uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
    );
    if let Some(cached) = state.cache.get(&key).await {
        tracing::debug!(key = %key, "Serving index from cache");
        return Ok(html(cached));
    }

    let page = state.posts.page_all(page_request(&query)).await?;
    let page = post_cards(&state, page).await?;
    let body = templates::render("posts/index.html", context! { page })?;

    state
        .cache
        .set(&key, &body, Some(state.settings.index_cache_ttl))
        .await;
    tracing::debug!(key = %key, "Cached index page");
    Ok(html(body))
}

/// GET /group/{slug}/
pub async fn group_posts(
    state: web::Data<AppState>,
    slug: web::Path<String>,
    query: web::Query<PageQuery>,
    viewer: OptionalIdentity,
) -> AppResult<HttpResponse> {
    let slug = slug.into_inner();
    let group = state
        .groups
        .find_by_slug(&slug)
        .await?
        .ok_or_else(|| DomainError::not_found("Group", &slug))?;

    let page = state
        .posts
        .page_by_group(group.id, page_request(&query))
        .await?;
    let page = post_cards(&state, page).await?;

    let body = templates::render(
        "posts/group_list.html",
        context! { viewer => viewer.user(), group => GroupView::from(&group), page },
    )?;
    Ok(html(body))
}

async fn find_author(state: &AppState, username: &str) -> AppResult<User> {
    Ok(state
        .users
        .find_by_username(username)
        .await?
        .ok_or_else(|| DomainError::not_found("User", username))?)
}

/// GET /profile/{username}/
pub async fn profile(
    state: web::Data<AppState>,
    username: web::Path<String>,
    query: web::Query<PageQuery>,
    viewer: OptionalIdentity,
) -> AppResult<HttpResponse> {
    let author = find_author(&state, &username).await?;

    let page = state
        .posts
        .page_by_author(author.id, page_request(&query))
        .await?;
    let posts_count = page.count;
    let page = post_cards(&state, page).await?;

    let following = match viewer.user() {
        Some(user) => state.follows.is_following(user.id, author.id).await?,
        None => false,
    };
    let followers_count = state.follows.followers_count(author.id).await?;
    let following_count = state.follows.following_count(author.id).await?;

    let body = templates::render(
        "posts/profile.html",
        context! {
            viewer => viewer.user(),
            author => AuthorView::from(&author),
            page,
            posts_count,
            followers_count,
            following_count,
            following,
        },
    )?;
    Ok(html(body))
}

async fn find_post(state: &AppState, id: i32) -> AppResult<Post> {
    Ok(state
        .posts
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found("Post", id))?)
}

async fn post_card(state: &AppState, post: &Post) -> AppResult<PostCard> {
    let author = state
        .users
        .find_by_id(post.author_id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("post {} has no author", post.id)))?;
    let group = match post.group_id {
        Some(id) => state.groups.find_by_id(id).await?,
        None => None,
    };
    Ok(PostCard::new(post, &author, group.as_ref()))
}

/// GET /posts/{id}/
pub async fn post_detail(
    state: web::Data<AppState>,
    id: web::Path<i32>,
    viewer: OptionalIdentity,
) -> AppResult<HttpResponse> {
    let post = find_post(&state, id.into_inner()).await?;
    let card = post_card(&state, &post).await?;
    let author_posts_count = state.posts.count_by_author(post.author_id).await?;
    let comments = state.comments.list_for_post(post.id).await?;
    let comments = comment_views(&state, comments).await?;

    let body = templates::render(
        "posts/post_detail.html",
        context! {
            viewer => viewer.user(),
            post => card,
            author_posts_count,
            comments,
            comment_fields => CommentForm::FIELDS,
            values => CommentRequest::default(),
            errors => FormErrors::new(),
        },
    )?;
    Ok(html(body))
}

/// Decode a post submission, multipart (with an image) or urlencoded.
async fn read_post_form(req: &HttpRequest, payload: web::Payload) -> AppResult<PostForm> {
    let is_multipart = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    if !is_multipart {
        let mut payload = payload.into_inner();
        let form = web::Form::<PostRequest>::from_request(req, &mut payload)
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
            .into_inner();
        return Ok(PostForm {
            text: form.text,
            group: form.group,
            image: None,
        });
    }

    let mut multipart = Multipart::new(req.headers(), payload);
    let mut form = PostForm::default();
    while let Some(field) = multipart.next().await {
        let mut field = field.map_err(|e| AppError::BadRequest(e.to_string()))?;
        let name = field.name().unwrap_or_default().to_string();
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| AppError::BadRequest(e.to_string()))?;
            if bytes.len() + chunk.len() > MAX_UPLOAD_BYTES {
                return Err(AppError::BadRequest("upload too large".to_string()));
            }
            bytes.extend_from_slice(&chunk);
        }

        match name.as_str() {
            "text" => form.text = String::from_utf8_lossy(&bytes).into_owned(),
            "group" => form.group = String::from_utf8_lossy(&bytes).into_owned(),
            "image" => form.image = Some(Upload::new(filename.unwrap_or_default(), bytes)),
            other => tracing::debug!(field = other, "Ignoring unknown form field"),
        }
    }
    Ok(form)
}

fn render_post_form(
    viewer: &User,
    values: PostRequest,
    errors: FormErrors,
    groups: Vec<GroupView>,
    edit: Option<&Post>,
) -> AppResult<HttpResponse> {
    let body = templates::render(
        "posts/create_post.html",
        context! {
            viewer,
            fields => PostForm::FIELDS,
            values,
            errors,
            groups,
            is_edit => edit.is_some(),
            post_id => edit.map(|p| p.id),
            current_image => edit.and_then(|p| p.image.as_deref()).map(media_url),
        },
    )?;
    Ok(html(body))
}

async fn group_choices(state: &AppState) -> AppResult<(Vec<Group>, Vec<GroupView>)> {
    let groups = state.groups.list_all().await?;
    let views = groups.iter().map(GroupView::from).collect();
    Ok((groups, views))
}

/// Persist an uploaded image, if any, returning its stored path.
async fn store_image(state: &AppState, input: &mut PostInput) -> AppResult<Option<String>> {
    match input.image.take() {
        Some((upload, kind)) => Ok(Some(state.media.save_image("posts", &upload, kind).await?)),
        None => Ok(None),
    }
}

/// Remove a stored image that no saved post refers to.
async fn discard_image(state: &AppState, path: &str) {
    if let Err(e) = state.media.remove(path).await {
        tracing::warn!(error = %e, path = %path, "Failed to remove image");
    }
}

/// GET /create/
pub async fn post_create_form(
    state: web::Data<AppState>,
    identity: Identity,
) -> AppResult<HttpResponse> {
    let (_, groups) = group_choices(&state).await?;
    render_post_form(
        &identity.user,
        PostRequest::default(),
        FormErrors::new(),
        groups,
        None,
    )
}

/// POST /create/
pub async fn post_create(
    req: HttpRequest,
    payload: web::Payload,
    state: web::Data<AppState>,
    identity: Identity,
) -> AppResult<HttpResponse> {
    let form = read_post_form(&req, payload).await?;
    let values = PostRequest {
        text: form.text.clone(),
        group: form.group.clone(),
    };
    let (groups, group_views) = group_choices(&state).await?;

    let mut input = match form.validate(&groups) {
        Ok(input) => input,
        Err(errors) => {
            return render_post_form(&identity.user, values, errors, group_views, None);
        }
    };

    let mut post = Post::new(identity.user.id, input.text.clone(), input.group_id);
    let stored = store_image(&state, &mut input).await?;
    if let Some(path) = &stored {
        post = post.with_image(path.clone());
    }
    let post = match state.posts.save(post).await {
        Ok(post) => post,
        Err(e) => {
            if let Some(path) = &stored {
                discard_image(&state, path).await;
            }
            return Err(e.into());
        }
    };

    tracing::info!(post_id = post.id, author = %identity.user, "Post created");
    Ok(redirect(profile_url(&identity.user.username)))
}

/// GET /posts/{id}/edit/
pub async fn post_edit_form(
    state: web::Data<AppState>,
    id: web::Path<i32>,
    identity: Identity,
) -> AppResult<HttpResponse> {
    let post = find_post(&state, id.into_inner()).await?;
    if !post.is_authored_by(identity.user.id) {
        return Ok(redirect(post_url(post.id)));
    }

    let (_, groups) = group_choices(&state).await?;
    let values = PostRequest {
        text: post.text.clone(),
        group: post.group_id.map(|id| id.to_string()).unwrap_or_default(),
    };
    render_post_form(&identity.user, values, FormErrors::new(), groups, Some(&post))
}

/// POST /posts/{id}/edit/
pub async fn post_edit(
    req: HttpRequest,
    payload: web::Payload,
    state: web::Data<AppState>,
    id: web::Path<i32>,
    identity: Identity,
) -> AppResult<HttpResponse> {
    let mut post = find_post(&state, id.into_inner()).await?;
    if !post.is_authored_by(identity.user.id) {
        tracing::info!(post_id = post.id, user = %identity.user, "Edit refused for non-author");
        return Ok(redirect(post_url(post.id)));
    }

    let form = read_post_form(&req, payload).await?;
    let values = PostRequest {
        text: form.text.clone(),
        group: form.group.clone(),
    };
    let (groups, group_views) = group_choices(&state).await?;

    let mut input = match form.validate(&groups) {
        Ok(input) => input,
        Err(errors) => {
            return render_post_form(&identity.user, values, errors, group_views, Some(&post));
        }
    };

    post.text = std::mem::take(&mut input.text);
    post.group_id = input.group_id;
    let stored = store_image(&state, &mut input).await?;
    let replaced = match &stored {
        Some(path) => post.image.replace(path.clone()),
        None => None,
    };
    let post = match state.posts.save(post).await {
        Ok(post) => post,
        Err(e) => {
            if let Some(path) = &stored {
                discard_image(&state, path).await;
            }
            return Err(e.into());
        }
    };
    if let Some(old) = replaced {
        discard_image(&state, &old).await;
    }

    tracing::info!(post_id = post.id, "Post updated");
    Ok(redirect(post_url(post.id)))
}

/// POST /posts/{id}/comment/
pub async fn add_comment(
    state: web::Data<AppState>,
    id: web::Path<i32>,
    identity: Identity,
    form: web::Form<CommentRequest>,
) -> AppResult<HttpResponse> {
    let post = find_post(&state, id.into_inner()).await?;

    let form = CommentForm {
        text: form.into_inner().text,
    };
    match form.validate() {
        Ok(text) => {
            let comment = state
                .comments
                .save(Comment::new(post.id, identity.user.id, text))
                .await?;
            tracing::info!(comment_id = comment.id, post_id = post.id, "Comment added");
        }
        Err(errors) => {
            tracing::debug!(?errors, post_id = post.id, "Dropping invalid comment");
        }
    }
    Ok(redirect(post_url(post.id)))
}

/// GET /follow/ - posts by the authors the viewer follows.
pub async fn follow_index(
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
    identity: Identity,
) -> AppResult<HttpResponse> {
    let authors = state.follows.followed_author_ids(identity.user.id).await?;
    let page = state
        .posts
        .page_by_authors(&authors, page_request(&query))
        .await?;
    let page = post_cards(&state, page).await?;

    let body = templates::render(
        "posts/follow.html",
        context! { viewer => &identity.user, page },
    )?;
    Ok(html(body))
}

/// GET /profile/{username}/follow/
pub async fn profile_follow(
    state: web::Data<AppState>,
    username: web::Path<String>,
    identity: Identity,
) -> AppResult<HttpResponse> {
    let author = find_author(&state, &username).await?;
    if state.follows.follow(identity.user.id, author.id).await? {
        tracing::info!(user = %identity.user, author = %author, "Followed");
    }
    Ok(redirect(profile_url(&author.username)))
}

/// GET /profile/{username}/unfollow/
pub async fn profile_unfollow(
    state: web::Data<AppState>,
    username: web::Path<String>,
    identity: Identity,
) -> AppResult<HttpResponse> {
    let author = find_author(&state, &username).await?;
    if state.follows.unfollow(identity.user.id, author.id).await? {
        tracing::info!(user = %identity.user, author = %author, "Unfollowed");
    }
    Ok(redirect(profile_url(&author.username)))
}

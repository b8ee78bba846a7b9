//! View models handed to templates, plus small response helpers.

use std::collections::{HashMap, HashSet};

use actix_web::HttpResponse;
use actix_web::http::header;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;

use inkwell_core::domain::{Comment, Group, Post, User};
use inkwell_core::pagination::Page;

use crate::middleware::error::AppResult;
use crate::state::AppState;

/// Characters escaped in a path segment built from a username or slug.
const SEGMENT_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'@')
    .remove(b'.')
    .remove(b'+')
    .remove(b'-')
    .remove(b'_');

const DATE_FORMAT: &str = "%d.%m.%Y %H:%M";

pub fn profile_url(username: &str) -> String {
    format!("/profile/{}/", utf8_percent_encode(username, SEGMENT_ESCAPE))
}

pub fn group_url(slug: &str) -> String {
    format!("/group/{}/", utf8_percent_encode(slug, SEGMENT_ESCAPE))
}

pub fn post_url(id: i32) -> String {
    format!("/posts/{id}/")
}

pub fn redirect(location: impl AsRef<str>) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location.as_ref()))
        .finish()
}

pub fn html(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body)
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthorView {
    pub id: i32,
    pub username: String,
    pub display_name: String,
    pub url: String,
}

impl From<&User> for AuthorView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name(),
            url: profile_url(&user.username),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupView {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub url: String,
}

impl From<&Group> for GroupView {
    fn from(group: &Group) -> Self {
        Self {
            id: group.id,
            title: group.title.clone(),
            slug: group.slug.clone(),
            description: group.description.clone(),
            url: group_url(&group.slug),
        }
    }
}

/// A post as shown in listings and on its own page.
#[derive(Debug, Clone, Serialize)]
pub struct PostCard {
    pub id: i32,
    pub text: String,
    pub short_text: String,
    pub pub_date: String,
    pub author: AuthorView,
    pub group: Option<GroupView>,
    pub image_url: Option<String>,
    pub url: String,
    pub edit_url: String,
}

impl PostCard {
    pub fn new(post: &Post, author: &User, group: Option<&Group>) -> Self {
        Self {
            id: post.id,
            text: post.text.clone(),
            short_text: post.to_string(),
            pub_date: post.pub_date.format(DATE_FORMAT).to_string(),
            author: author.into(),
            group: group.map(Into::into),
            image_url: post.image.as_deref().map(media_url),
            url: post_url(post.id),
            edit_url: format!("/posts/{}/edit/", post.id),
        }
    }
}

pub fn media_url(path: &str) -> String {
    format!("/media/{path}")
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub text: String,
    pub pub_date: String,
    pub author: AuthorView,
}

/// A page of items plus the navigation the paginator include needs.
#[derive(Debug, Clone, Serialize)]
pub struct PageView<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_page_number: Option<u64>,
    pub next_page_number: Option<u64>,
}

impl<T> PageView<T> {
    fn from_page<S>(page: &Page<S>, items: Vec<T>) -> Self {
        Self {
            items,
            number: page.number,
            num_pages: page.num_pages,
            count: page.count,
            has_previous: page.has_previous(),
            has_next: page.has_next(),
            previous_page_number: page.previous_page_number(),
            next_page_number: page.next_page_number(),
        }
    }
}

async fn authors_by_id(state: &AppState, ids: HashSet<i32>) -> AppResult<HashMap<i32, User>> {
    let ids: Vec<i32> = ids.into_iter().collect();
    let users = state.users.find_many(&ids).await?;
    Ok(users.into_iter().map(|u| (u.id, u)).collect())
}

/// Attach authors and groups to a page of posts.
pub async fn post_cards(state: &AppState, page: Page<Post>) -> AppResult<PageView<PostCard>> {
    let authors = authors_by_id(state, page.iter().map(|p| p.author_id).collect()).await?;

    let group_ids: Vec<i32> = page
        .iter()
        .filter_map(|p| p.group_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let groups: HashMap<i32, Group> = if group_ids.is_empty() {
        HashMap::new()
    } else {
        state
            .groups
            .find_many(&group_ids)
            .await?
            .into_iter()
            .map(|g| (g.id, g))
            .collect()
    };

    let cards = page
        .iter()
        .filter_map(|post| {
            let Some(author) = authors.get(&post.author_id) else {
                tracing::warn!(post_id = post.id, "Post author is missing");
                return None;
            };
            let group = post.group_id.and_then(|id| groups.get(&id));
            Some(PostCard::new(post, author, group))
        })
        .collect();

    Ok(PageView::from_page(&page, cards))
}

pub async fn comment_views(state: &AppState, comments: Vec<Comment>) -> AppResult<Vec<CommentView>> {
    let authors = authors_by_id(state, comments.iter().map(|c| c.author_id).collect()).await?;

    Ok(comments
        .into_iter()
        .filter_map(|comment| {
            let author = authors.get(&comment.author_id)?;
            Some(CommentView {
                pub_date: comment.pub_date.format(DATE_FORMAT).to_string(),
                text: comment.text,
                author: author.into(),
            })
        })
        .collect())
}

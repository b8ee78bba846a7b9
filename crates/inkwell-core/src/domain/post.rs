use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::meta::{FieldMeta, FieldMetadata};

/// Number of characters a post or comment shows in its short form.
pub const SHORT_TEXT_LEN: usize = 15;

/// Post entity - a blog entry written by one author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i32,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author_id: i32,
    pub group_id: Option<i32>,
    /// Path of the attached image relative to the media root.
    pub image: Option<String>,
}

impl Post {
    /// Create a new, not yet persisted post.
    pub fn new(author_id: i32, text: String, group_id: Option<i32>) -> Self {
        Self {
            id: 0,
            text,
            pub_date: Utc::now(),
            author_id,
            group_id,
            image: None,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn is_authored_by(&self, user_id: i32) -> bool {
        self.author_id == user_id
    }
}

pub(crate) fn short_text(text: &str) -> String {
    text.chars().take(SHORT_TEXT_LEN).collect()
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&short_text(&self.text))
    }
}

impl FieldMetadata for Post {
    const FIELDS: &'static [FieldMeta] = &[
        FieldMeta::new("text", "Текст поста").with_help("Введите текст поста"),
        FieldMeta::new("pub_date", "Дата создания"),
        FieldMeta::new("author", "Автор"),
        FieldMeta::new("group", "Группа").with_help("Группа, к которой будет относиться пост"),
        FieldMeta::new("image", "Картинка"),
    ];
}

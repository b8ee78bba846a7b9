use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::meta::{FieldMeta, FieldMetadata};
use super::post::short_text;

/// Comment entity - a reply left on a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i32,
    pub post_id: i32,
    pub author_id: i32,
    pub text: String,
    pub pub_date: DateTime<Utc>,
}

impl Comment {
    pub fn new(post_id: i32, author_id: i32, text: String) -> Self {
        Self {
            id: 0,
            post_id,
            author_id,
            text,
            pub_date: Utc::now(),
        }
    }
}

impl fmt::Display for Comment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&short_text(&self.text))
    }
}

impl FieldMetadata for Comment {
    const FIELDS: &'static [FieldMeta] = &[
        FieldMeta::new("post", "Тект поста"),
        FieldMeta::new("author", "Автор"),
        FieldMeta::new("text", "Текст комментария").with_help("Введите текст комментария"),
        FieldMeta::new("pub_date", "Дата создания"),
    ];
}

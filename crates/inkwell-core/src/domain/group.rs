use std::fmt;

use serde::{Deserialize, Serialize};

use super::meta::{FieldMeta, FieldMetadata};

/// Group entity - a named category posts can optionally belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: i32,
    pub title: String,
    /// Globally unique, used in `/group/<slug>/`.
    pub slug: String,
    pub description: String,
}

impl Group {
    pub const TITLE_MAX_LEN: usize = 200;

    pub fn new(title: String, slug: String, description: String) -> Self {
        Self {
            id: 0,
            title,
            slug,
            description,
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

impl FieldMetadata for Group {
    const FIELDS: &'static [FieldMeta] = &[
        FieldMeta::new("title", "Название группы"),
        FieldMeta::new("slug", "Уникальная ссылка группы"),
        FieldMeta::new("description", "Описание группы"),
    ];
}

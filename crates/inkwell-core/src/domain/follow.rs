use serde::{Deserialize, Serialize};

use super::meta::{FieldMeta, FieldMetadata};
use super::user::User;

/// Follow entity - `user` subscribes to posts written by `author`.
///
/// The pair is unique and a user never follows themself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Follow {
    pub user_id: i32,
    pub author_id: i32,
}

impl Follow {
    /// Returns `None` for a self-follow.
    pub fn new(user_id: i32, author_id: i32) -> Option<Self> {
        (user_id != author_id).then_some(Self { user_id, author_id })
    }

    pub fn describe(user: &User, author: &User) -> String {
        format!("{user} подписан на {author}")
    }
}

impl FieldMetadata for Follow {
    const FIELDS: &'static [FieldMeta] = &[
        FieldMeta::new("user", "Подписчик"),
        FieldMeta::new("author", "Супер знаменитость"),
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_follow_is_rejected() {
        assert!(Follow::new(7, 7).is_none());
        assert_eq!(
            Follow::new(1, 2),
            Some(Follow {
                user_id: 1,
                author_id: 2
            })
        );
    }

    #[test]
    fn test_describe() {
        let reader = User::new("reader".into(), String::new(), String::new());
        let author = User::new("author".into(), String::new(), String::new());
        assert_eq!(Follow::describe(&reader, &author), "reader подписан на author");
    }
}

//! Validated input contracts for posts, comments and accounts.
//!
//! Each form takes raw submitted strings and returns either a clean value or
//! [`FormErrors`] keyed by field name, ready to be shown next to the inputs.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::{FieldMeta, Group};

pub const REQUIRED: &str = "Обязательное поле.";
pub const INVALID_CHOICE: &str =
    "Выберите корректный вариант. Вашего варианта нет среди допустимых значений.";
pub const INVALID_IMAGE: &str = "Загрузите правильное изображение. Файл, который вы загрузили, \
                                 поврежден или не является изображением.";
pub const INVALID_USERNAME: &str = "Введите правильное имя пользователя. Оно может содержать \
                                    только буквы, цифры и знаки @/./+/-/_.";
pub const INVALID_EMAIL: &str = "Введите правильный адрес электронной почты.";
pub const USERNAME_TAKEN: &str = "Пользователь с таким именем уже существует.";
pub const PASSWORD_MISMATCH: &str = "Введенные пароли не совпадают.";
pub const PASSWORD_TOO_SHORT: &str =
    "Введённый пароль слишком короткий. Он должен содержать как минимум 8 символов.";
pub const PASSWORD_NUMERIC: &str = "Введённый пароль состоит только из цифр.";
pub const INVALID_LOGIN: &str = "Пожалуйста, введите правильные имя пользователя и пароль. \
                                 Оба поля могут быть чувствительны к регистру.";
pub const INVALID_OLD_PASSWORD: &str =
    "Ваш старый пароль введен неправильно. Пожалуйста, введите его снова.";

pub const NAME_MAX_LEN: usize = 150;
pub const PASSWORD_MIN_LEN: usize = 8;

/// Field-level and form-level validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormErrors {
    pub fields: BTreeMap<String, Vec<String>>,
    pub non_field: Vec<String>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.non_field.push(message.into());
    }

    /// Messages attached to one field.
    pub fn field(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, name: &str) -> bool {
        !self.field(name).is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.non_field.is_empty()
    }

    /// `Ok(value)` when nothing was reported.
    pub fn finish<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

/// An uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub filename: String,
    pub content: Vec<u8>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content,
        }
    }

    /// A file input left blank still arrives as an empty part.
    pub fn is_blank(&self) -> bool {
        self.filename.is_empty() && self.content.is_empty()
    }
}

/// Image formats accepted for post pictures, detected by signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Gif,
    Png,
    Jpeg,
    Webp,
}

impl ImageKind {
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(Self::Gif)
        } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(Self::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(Self::Webp)
        } else {
            None
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Gif => "gif",
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
        }
    }
}

fn required(errors: &mut FormErrors, field: &str, value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
    }
    value.to_string()
}

fn max_len(errors: &mut FormErrors, field: &str, value: &str, limit: usize) {
    let len = value.chars().count();
    if len > limit {
        errors.add(
            field,
            format!(
                "Убедитесь, что это значение содержит не более {limit} символов (сейчас {len})."
            ),
        );
    }
}

/// Check a new password pair; messages go to `second`.
fn new_password(errors: &mut FormErrors, first: (&str, &str), second: (&str, &str)) {
    let (first_field, p1) = first;
    let (second_field, p2) = second;
    if p1.is_empty() {
        errors.add(first_field, REQUIRED);
    }
    if p2.is_empty() {
        errors.add(second_field, REQUIRED);
    }
    if p1.is_empty() || p2.is_empty() {
        return;
    }
    if p1 != p2 {
        errors.add(second_field, PASSWORD_MISMATCH);
        return;
    }
    if p2.chars().count() < PASSWORD_MIN_LEN {
        errors.add(second_field, PASSWORD_TOO_SHORT);
    }
    if p2.chars().all(|c| c.is_ascii_digit()) {
        errors.add(second_field, PASSWORD_NUMERIC);
    }
}

/// Post create/edit submission.
#[derive(Debug, Clone, Default)]
pub struct PostForm {
    pub text: String,
    /// Raw group id; empty means no group.
    pub group: String,
    pub image: Option<Upload>,
}

/// A validated post submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostInput {
    pub text: String,
    pub group_id: Option<i32>,
    pub image: Option<(Upload, ImageKind)>,
}

impl PostForm {
    /// Form labels; help texts follow the model fields.
    pub const FIELDS: &'static [FieldMeta] = &[
        FieldMeta::new("group", "Выберите группу").with_help("Группа, к которой будет относиться пост"),
        FieldMeta::new("text", "Введите текст").with_help("Введите текст поста"),
        FieldMeta::new("image", "Картинка"),
    ];

    /// Validate against the groups a post may be filed under.
    pub fn validate(self, groups: &[Group]) -> Result<PostInput, FormErrors> {
        let mut errors = FormErrors::new();
        let text = required(&mut errors, "text", &self.text);

        let raw_group = self.group.trim();
        let group_id = if raw_group.is_empty() {
            None
        } else {
            match raw_group.parse::<i32>() {
                Ok(id) if groups.iter().any(|g| g.id == id) => Some(id),
                _ => {
                    errors.add("group", INVALID_CHOICE);
                    None
                }
            }
        };

        let image = match self.image {
            Some(upload) if !upload.is_blank() => match ImageKind::sniff(&upload.content) {
                Some(kind) => Some((upload, kind)),
                None => {
                    errors.add("image", INVALID_IMAGE);
                    None
                }
            },
            _ => None,
        };

        errors.finish(PostInput {
            text,
            group_id,
            image,
        })
    }
}

/// Comment submission.
#[derive(Debug, Clone, Default)]
pub struct CommentForm {
    pub text: String,
}

impl CommentForm {
    pub const FIELDS: &'static [FieldMeta] =
        &[FieldMeta::new("text", "Введите текст").with_help("Введите текст комментария")];

    pub fn validate(self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::new();
        let text = required(&mut errors, "text", &self.text);
        errors.finish(text)
    }
}

/// Registration submission.
#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
}

/// A validated registration; username uniqueness is checked by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

fn valid_username(username: &str) -> bool {
    username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

fn valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

impl SignupForm {
    pub const FIELDS: &'static [FieldMeta] = &[
        FieldMeta::new("first_name", "Имя"),
        FieldMeta::new("last_name", "Фамилия"),
        FieldMeta::new("username", "Имя пользователя").with_help(
            "Обязательное поле. Не более 150 символов. Только буквы, цифры и символы @/./+/-/_.",
        ),
        FieldMeta::new("email", "Адрес электронной почты"),
        FieldMeta::new("password1", "Пароль"),
        FieldMeta::new("password2", "Подтверждение пароля")
            .with_help("Для подтверждения введите, пожалуйста, пароль ещё раз."),
    ];

    pub fn validate(self) -> Result<NewAccount, FormErrors> {
        let mut errors = FormErrors::new();

        let first_name = self.first_name.trim().to_string();
        max_len(&mut errors, "first_name", &first_name, NAME_MAX_LEN);
        let last_name = self.last_name.trim().to_string();
        max_len(&mut errors, "last_name", &last_name, NAME_MAX_LEN);

        let username = required(&mut errors, "username", &self.username);
        if !username.is_empty() {
            max_len(&mut errors, "username", &username, NAME_MAX_LEN);
            if !valid_username(&username) {
                errors.add("username", INVALID_USERNAME);
            }
        }

        let email = self.email.trim().to_string();
        if !email.is_empty() && !valid_email(&email) {
            errors.add("email", INVALID_EMAIL);
        }

        new_password(
            &mut errors,
            ("password1", &self.password1),
            ("password2", &self.password2),
        );

        errors.finish(NewAccount {
            first_name,
            last_name,
            username,
            email,
            password: self.password1,
        })
    }
}

/// Login submission; the credential check happens against the store.
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    pub const FIELDS: &'static [FieldMeta] = &[
        FieldMeta::new("username", "Имя пользователя"),
        FieldMeta::new("password", "Пароль"),
    ];

    pub fn validate(self) -> Result<(String, String), FormErrors> {
        let mut errors = FormErrors::new();
        let username = required(&mut errors, "username", &self.username);
        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        }
        errors.finish((username, self.password))
    }
}

/// Password change by a signed-in user.
#[derive(Debug, Clone, Default)]
pub struct PasswordChangeForm {
    pub old_password: String,
    pub new_password1: String,
    pub new_password2: String,
}

impl PasswordChangeForm {
    pub const FIELDS: &'static [FieldMeta] = &[
        FieldMeta::new("old_password", "Старый пароль"),
        FieldMeta::new("new_password1", "Новый пароль"),
        FieldMeta::new("new_password2", "Подтверждение нового пароля"),
    ];

    /// `old_password_ok` is the outcome of verifying the old password.
    pub fn validate(self, old_password_ok: bool) -> Result<String, FormErrors> {
        let mut errors = FormErrors::new();
        if self.old_password.is_empty() {
            errors.add("old_password", REQUIRED);
        } else if !old_password_ok {
            errors.add("old_password", INVALID_OLD_PASSWORD);
        }
        new_password(
            &mut errors,
            ("new_password1", &self.new_password1),
            ("new_password2", &self.new_password2),
        );
        errors.finish(self.new_password1)
    }
}

/// Password reset request.
#[derive(Debug, Clone, Default)]
pub struct PasswordResetForm {
    pub email: String,
}

impl PasswordResetForm {
    pub const FIELDS: &'static [FieldMeta] =
        &[FieldMeta::new("email", "Адрес электронной почты")];

    pub fn validate(self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::new();
        let email = required(&mut errors, "email", &self.email);
        if !email.is_empty() && !valid_email(&email) {
            errors.add("email", INVALID_EMAIL);
        }
        errors.finish(email)
    }
}

/// New password chosen from a reset link.
#[derive(Debug, Clone, Default)]
pub struct SetPasswordForm {
    pub new_password1: String,
    pub new_password2: String,
}

impl SetPasswordForm {
    pub const FIELDS: &'static [FieldMeta] = &[
        FieldMeta::new("new_password1", "Новый пароль"),
        FieldMeta::new("new_password2", "Подтверждение нового пароля"),
    ];

    pub fn validate(self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::new();
        new_password(
            &mut errors,
            ("new_password1", &self.new_password1),
            ("new_password2", &self.new_password2),
        );
        errors.finish(self.new_password1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_GIF: &[u8] = b"\x47\x49\x46\x38\x39\x61\x02\x00\x01\x00\x80\x00\x00\x00\x00\x00\
        \xFF\xFF\xFF\x21\xF9\x04\x00\x00\x00\x00\x00\x2C\x00\x00\x00\x00\
        \x02\x00\x01\x00\x00\x02\x02\x0C\x0A\x00\x3B";

    fn group(id: i32) -> Group {
        Group {
            id,
            title: "Тестовая группа".into(),
            slug: "test_slug".into(),
            description: "Тестовое описание".into(),
        }
    }

    #[test]
    fn test_post_form_rejects_empty_text() {
        let form = PostForm {
            text: "   ".into(),
            ..Default::default()
        };
        let errors = form.validate(&[]).unwrap_err();
        assert_eq!(errors.field("text"), [REQUIRED.to_string()]);
    }

    #[test]
    fn test_post_form_accepts_known_group_and_image() {
        let form = PostForm {
            text: " Тестовый пост ".into(),
            group: "3".into(),
            image: Some(Upload::new("small.gif", SMALL_GIF.to_vec())),
        };
        let input = form.validate(&[group(3)]).unwrap();
        assert_eq!(input.text, "Тестовый пост");
        assert_eq!(input.group_id, Some(3));
        assert_eq!(input.image.unwrap().1, ImageKind::Gif);
    }

    #[test]
    fn test_post_form_rejects_unknown_group() {
        let form = PostForm {
            text: "text".into(),
            group: "99".into(),
            image: None,
        };
        let errors = form.validate(&[group(3)]).unwrap_err();
        assert!(errors.has("group"));
        assert!(!errors.has("text"));
    }

    #[test]
    fn test_post_form_rejects_non_image_and_ignores_blank_upload() {
        let bad = PostForm {
            text: "text".into(),
            group: String::new(),
            image: Some(Upload::new("notes.txt", b"hello".to_vec())),
        };
        assert_eq!(bad.validate(&[]).unwrap_err().field("image"), [INVALID_IMAGE]);

        let blank = PostForm {
            text: "text".into(),
            group: String::new(),
            image: Some(Upload::new("", Vec::new())),
        };
        assert_eq!(blank.validate(&[]).unwrap().image, None);
    }

    #[test]
    fn test_comment_form() {
        assert!(CommentForm { text: String::new() }.validate().is_err());
        assert_eq!(
            CommentForm {
                text: "Тестовый комментарий".into()
            }
            .validate()
            .unwrap(),
            "Тестовый комментарий"
        );
    }

    #[test]
    fn test_signup_password_rules() {
        let base = SignupForm {
            username: "HasNoName".into(),
            password1: "s3cret-pass".into(),
            password2: "s3cret-pass".into(),
            ..Default::default()
        };
        assert!(base.clone().validate().is_ok());

        let mismatch = SignupForm {
            password2: "other-pass".into(),
            ..base.clone()
        };
        assert_eq!(
            mismatch.validate().unwrap_err().field("password2"),
            [PASSWORD_MISMATCH]
        );

        let numeric = SignupForm {
            password1: "12345678".into(),
            password2: "12345678".into(),
            ..base.clone()
        };
        assert_eq!(
            numeric.validate().unwrap_err().field("password2"),
            [PASSWORD_NUMERIC]
        );

        let short = SignupForm {
            password1: "abc".into(),
            password2: "abc".into(),
            ..base
        };
        assert_eq!(
            short.validate().unwrap_err().field("password2"),
            [PASSWORD_TOO_SHORT]
        );
    }

    #[test]
    fn test_signup_username_and_email() {
        let form = SignupForm {
            username: "bad name!".into(),
            email: "nope".into(),
            password1: "s3cret-pass".into(),
            password2: "s3cret-pass".into(),
            ..Default::default()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.field("username"), [INVALID_USERNAME]);
        assert_eq!(errors.field("email"), [INVALID_EMAIL]);
    }

    #[test]
    fn test_password_change_reports_wrong_old_password() {
        let form = PasswordChangeForm {
            old_password: "old".into(),
            new_password1: "brand-new-pass".into(),
            new_password2: "brand-new-pass".into(),
        };
        assert_eq!(
            form.clone().validate(false).unwrap_err().field("old_password"),
            [INVALID_OLD_PASSWORD]
        );
        assert_eq!(form.validate(true).unwrap(), "brand-new-pass");
    }

    #[test]
    fn test_image_sniffing() {
        assert_eq!(ImageKind::sniff(SMALL_GIF), Some(ImageKind::Gif));
        assert_eq!(
            ImageKind::sniff(b"\x89PNG\r\n\x1a\n...."),
            Some(ImageKind::Png)
        );
        assert_eq!(ImageKind::sniff(b"RIFF\0\0\0\0WEBPVP8 "), Some(ImageKind::Webp));
        assert_eq!(ImageKind::sniff(b"plain"), None);
    }
}

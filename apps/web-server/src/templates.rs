//! HTML templates, embedded in the binary and rendered with minijinja.

use std::sync::LazyLock;

use minijinja::{Environment, Value};

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("includes/forms.html", include_str!("../templates/includes/forms.html")),
    ("includes/paginator.html", include_str!("../templates/includes/paginator.html")),
    ("includes/post_card.html", include_str!("../templates/includes/post_card.html")),
    ("core/404.html", include_str!("../templates/core/404.html")),
    ("core/500.html", include_str!("../templates/core/500.html")),
    ("posts/index.html", include_str!("../templates/posts/index.html")),
    ("posts/group_list.html", include_str!("../templates/posts/group_list.html")),
    ("posts/profile.html", include_str!("../templates/posts/profile.html")),
    ("posts/post_detail.html", include_str!("../templates/posts/post_detail.html")),
    ("posts/create_post.html", include_str!("../templates/posts/create_post.html")),
    ("posts/follow.html", include_str!("../templates/posts/follow.html")),
    ("users/signup.html", include_str!("../templates/users/signup.html")),
    ("users/login.html", include_str!("../templates/users/login.html")),
    ("users/logged_out.html", include_str!("../templates/users/logged_out.html")),
    (
        "users/password_change_form.html",
        include_str!("../templates/users/password_change_form.html"),
    ),
    (
        "users/password_change_done.html",
        include_str!("../templates/users/password_change_done.html"),
    ),
    (
        "users/password_reset_form.html",
        include_str!("../templates/users/password_reset_form.html"),
    ),
    (
        "users/password_reset_done.html",
        include_str!("../templates/users/password_reset_done.html"),
    ),
    (
        "users/password_reset_confirm.html",
        include_str!("../templates/users/password_reset_confirm.html"),
    ),
    (
        "users/password_reset_complete.html",
        include_str!("../templates/users/password_reset_complete.html"),
    ),
];

static ENV: LazyLock<Environment<'static>> = LazyLock::new(|| {
    let mut env = Environment::new();
    for &(name, source) in TEMPLATES {
        if let Err(e) = env.add_template(name, source) {
            tracing::error!(template = name, error = %e, "Template failed to compile");
        }
    }
    env
});

/// Render a template. `.html` names are auto-escaped.
pub fn render(name: &str, ctx: Value) -> Result<String, minijinja::Error> {
    ENV.get_template(name)?.render(ctx)
}

#[cfg(test)]
mod tests {
    use minijinja::context;

    use super::*;

    #[test]
    fn test_every_template_compiles() {
        for &(name, _) in TEMPLATES {
            assert!(ENV.get_template(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn test_output_is_escaped() {
        let html = render(
            "core/404.html",
            context! { path => "<script>alert(1)</script>" },
        )
        .unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}

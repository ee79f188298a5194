//! Server-rendered HTML pages.
//!
//! Templates are compiled in with `include_str!` and filled by plain
//! `{{KEY}}` substitution. Every interpolated value goes through
//! `escape_html` first.

use crate::routes::middleware::AuthState;
use crate::services::user::SignupForm;

const LOGIN_TEMPLATE: &str = include_str!("../templates/login.html");
const SIGNUP_TEMPLATE: &str = include_str!("../templates/signup.html");
const NOT_FOUND_TEMPLATE: &str = include_str!("../templates/not_found.html");

#[must_use]
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn nav(auth: AuthState) -> &'static str {
    if auth.is_logged_in() {
        r#"<a href="/">Homes</a> <a href="/favourites">Favourites</a> <a href="/host/homes">Host</a> <form method="post" action="/logout"><button type="submit">Logout</button></form>"#
    } else {
        r#"<a href="/">Homes</a> <a href="/login">Login</a> <a href="/signup">Signup</a>"#
    }
}

fn error_list(errors: &[String]) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let items: String = errors
        .iter()
        .map(|e| format!("<li>{}</li>", escape_html(e)))
        .collect();
    format!(r#"<ul class="errors">{items}</ul>"#)
}

/// Substitute every `{{KEY}}` in a single pass, so substituted values are
/// never scanned for placeholders themselves. Unknown keys are left as-is.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let hit = after.find("}}").and_then(|end| {
            let key = &after[..end];
            values.iter().find(|(k, _)| *k == key).map(|(_, v)| (end, *v))
        });
        match hit {
            Some((end, value)) => {
                out.push_str(value);
                rest = &after[end + 2..];
            }
            None => {
                out.push_str("{{");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[must_use]
pub fn render_login(auth: AuthState, email: &str, errors: &[String]) -> String {
    fill(
        LOGIN_TEMPLATE,
        &[("NAV", nav(auth)), ("ERRORS", error_list(errors).as_str()), ("EMAIL", escape_html(email).as_str())],
    )
}

#[must_use]
pub fn render_signup(auth: AuthState, form: &SignupForm, errors: &[String]) -> String {
    let user_type = form.user_type.trim().to_ascii_lowercase();
    let checked = |value: &str| if user_type == value { " checked" } else { "" };
    fill(
        SIGNUP_TEMPLATE,
        &[
            ("NAV", nav(auth)),
            ("ERRORS", error_list(errors).as_str()),
            ("FIRST_NAME", escape_html(&form.first_name).as_str()),
            ("LAST_NAME", escape_html(&form.last_name).as_str()),
            ("EMAIL", escape_html(&form.email).as_str()),
            ("GUEST_CHECKED", checked("guest")),
            ("HOST_CHECKED", checked("host")),
        ],
    )
}

#[must_use]
pub fn render_not_found(auth: AuthState, path: &str) -> String {
    fill(NOT_FOUND_TEMPLATE, &[("NAV", nav(auth)), ("PATH", escape_html(path).as_str())])
}

#[cfg(test)]
#[path = "views_test.rs"]
mod tests;

//! Minimal HTML for the credential challenge and the protected pages.

use url::form_urlencoded;

use crate::auth::ClaimSet;

pub(crate) const SIGN_IN_PATH: &str = "/users/auth";
pub(crate) const FAILED_MESSAGE: &str = "Invalid email or password.";

/// What the challenge page needs to render.
#[derive(Debug, Default)]
pub(crate) struct Challenge<'a> {
    pub request_token: &'a str,
    pub return_url: Option<&'a str>,
    /// Email to prefill after a failed attempt.
    pub email: Option<&'a str>,
    pub failed: bool,
}

/// `/users/auth?returnUrl=<path>`; the credential page for a protected path.
pub(crate) fn sign_in_location(return_url: Option<&str>) -> String {
    match return_url {
        Some(url) if !url.is_empty() => {
            let query = form_urlencoded::Serializer::new(String::new())
                .append_pair("returnUrl", url)
                .finish();
            format!("{SIGN_IN_PATH}?{query}")
        }
        _ => SIGN_IN_PATH.to_string(),
    }
}

pub(crate) fn challenge(view: &Challenge<'_>) -> String {
    let action = escape(&sign_in_location(view.return_url));
    let email = escape(view.email.unwrap_or_default());
    let token = escape(view.request_token);
    let error = if view.failed {
        format!("<p class=\"error\" role=\"alert\">{FAILED_MESSAGE}</p>\n")
    } else {
        String::new()
    };

    layout(
        "Sign in",
        &format!(
            r#"<h1>Sign in</h1>
{error}<form method="post" action="{action}">
  <input type="hidden" name="antiforgery_token" value="{token}">
  <label>Email <input type="email" name="email" value="{email}" autocomplete="username" required></label>
  <label>Password <input type="password" name="password" autocomplete="current-password" required></label>
  <button type="submit">Sign in</button>
</form>"#
        ),
    )
}

pub(crate) fn greeting(principal: &ClaimSet) -> String {
    let name = escape(principal.name());
    let admin = if principal.is_admin() {
        "\n<p><a href=\"/admin\">Administration</a></p>"
    } else {
        ""
    };
    layout(
        "Home",
        &format!("<h1>Hello, {name}</h1>{admin}\n<p><a href=\"/users/logout\">Sign out</a></p>"),
    )
}

pub(crate) fn admin(principal: &ClaimSet) -> String {
    let roles = principal
        .roles()
        .map(|role| format!("<li>{}</li>", escape(role)))
        .collect::<String>();
    layout(
        "Administration",
        &format!(
            "<h1>Administration</h1>\n<p>Signed in as {}</p>\n<ul>{roles}</ul>",
            escape(principal.name())
        ),
    )
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n<body>\n{body}\n</body>\n</html>\n"
    )
}

fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

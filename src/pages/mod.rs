//! Web pages.
//!
//! One submodule per page, mirroring the application's three views:
//!
//! - [`main`]: the story form and the story pages themselves
//! - [`login`]: the login form and credential check
//! - [`logout`]: session teardown
//!
//! Shared here: the page chrome (navbar, Bootstrap stylesheet, `en-NZ`
//! document language) and the redirect helpers the handlers lean on.

pub mod login;
pub mod logout;
pub mod main;

use crate::models::User;
use crate::server::AppState;
use crate::session::SessionContext;
use actix_web::http::header;
use actix_web::{HttpResponse, web};
use html_escape::encode_text;

/// Register every route.
///
/// The catch-all pattern must come last: any path that is not one of the
/// application's own routes is treated as a publisher site path.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(main::index))
        .route("/story", web::get().to(main::story_from_query))
        .route("/login", web::get().to(login::form))
        .route("/login", web::post().to(login::submit))
        .route("/logout", web::get().to(logout::logout))
        .route("/{tail:.*}", web::get().to(main::story_from_path));
}

/// Wrap a body fragment in the full page chrome.
pub(crate) fn page(user: Option<&str>, body: &str) -> String {
    let logout_link = match user {
        Some(username) => format!(
            r#"<a class="nav-link text-light" href="/logout">Logout {}</a>"#,
            encode_text(username)
        ),
        None => String::new(),
    };
    format!(
        r#"<!DOCTYPE html>
<html lang="en-NZ">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width">
<title>NZ Harold</title>
<link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/css/bootstrap.min.css" rel="stylesheet">
</head>
<body>
<nav class="navbar navbar-dark bg-black py-0">
<div class="container-fluid">
<span class="navbar-brand"><h4 class="d-inline-block">NZ Harold &#x1F5DE;&#xFE0F;</h4></span>
{logout_link}
</div>
</nav>
<div class="container mt-4">
{body}
</div>
</body>
</html>
"#
    )
}

/// An HTML response for a finished page.
pub(crate) fn html(document: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(document)
}

/// A `303 See Other` to the given location.
pub(crate) fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location.to_string()))
        .finish()
}

/// Send an unauthenticated visitor to the login form, remembering where
/// they were headed.
pub(crate) fn redirect_to_login(next: &str) -> HttpResponse {
    if next == "/" {
        redirect("/login")
    } else {
        redirect(&format!("/login?next={}", urlencoding::encode(next)))
    }
}

/// Reload the logged-in user from the session cookie, if any.
///
/// A cookie pointing at a deleted user simply reads as logged out.
pub(crate) async fn current_user(
    state: &web::Data<AppState>,
    session: &SessionContext,
) -> Option<User> {
    let id = session.user_id()?;
    let store = state.store.clone();
    web::block(move || store.find_by_id(id)).await.ok()?.ok()?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_without_user_has_no_logout_link() {
        let doc = page(None, "<p>hi</p>");
        assert!(doc.contains(r#"lang="en-NZ""#));
        assert!(doc.contains("NZ Harold"));
        assert!(!doc.contains("Logout"));
        assert!(doc.contains("<p>hi</p>"));
    }

    #[test]
    fn test_page_with_user_shows_logout_link() {
        let doc = page(Some("mrcagney"), "");
        assert!(doc.contains(r#"href="/logout""#));
        assert!(doc.contains("Logout mrcagney"));
    }

    #[test]
    fn test_page_escapes_username() {
        let doc = page(Some("<script>"), "");
        assert!(!doc.contains("Logout <script>"));
        assert!(doc.contains("Logout &lt;script&gt;"));
    }

    #[test]
    fn test_redirect_to_login_encodes_next() {
        let res = redirect_to_login("/nz/some-story/ABC/");
        let location = res
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap();
        assert_eq!(location, "/login?next=%2Fnz%2Fsome-story%2FABC%2F");
    }

    #[test]
    fn test_redirect_to_login_from_root() {
        let res = redirect_to_login("/");
        let location = res
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap();
        assert_eq!(location, "/login");
    }
}

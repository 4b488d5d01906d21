//! The story pages.
//!
//! `GET /` shows the URL form; `GET /story?url=...` fetches a pasted URL;
//! every other path is treated as a publisher site path, so rewritten
//! story-to-story links resolve without leaving the application. All three
//! require a logged-in user.

use crate::outputs::html::{render_fallback, render_story};
use crate::scrapers::nzherald;
use crate::server::AppState;
use crate::session::SessionContext;
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;
use tracing::warn;

/// The URL form shown at the top of every story view.
const QUERY_FORM: &str = r#"<p>Paste any New Zealand Herald URL below to fetch its content:</p>
<form class="mb-4" method="get" action="/story">
<input class="form-control" type="url" name="url">
<button class="btn btn-primary mt-2" type="submit">Fetch</button>
</form>
"#;

#[derive(Debug, Deserialize)]
pub struct StoryQuery {
    url: Option<String>,
}

/// `GET /` — just the form.
pub async fn index(state: web::Data<AppState>, session: SessionContext) -> HttpResponse {
    let Some(user) = super::current_user(&state, &session).await else {
        return super::redirect_to_login("/");
    };
    super::html(super::page(Some(&user.username), QUERY_FORM))
}

/// `GET /story?url=...` — fetch a pasted URL.
pub async fn story_from_query(
    state: web::Data<AppState>,
    session: SessionContext,
    query: web::Query<StoryQuery>,
) -> HttpResponse {
    let Some(user) = super::current_user(&state, &session).await else {
        return super::redirect_to_login("/");
    };
    let body = match query.url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => format!("{QUERY_FORM}{}", story_body(url).await),
        _ => QUERY_FORM.to_string(),
    };
    super::html(super::page(Some(&user.username), &body))
}

/// Any other `GET` path — resolve it against the publisher's site.
pub async fn story_from_path(
    state: web::Data<AppState>,
    session: SessionContext,
    req: HttpRequest,
) -> HttpResponse {
    let path = req.path().to_string();
    let Some(user) = super::current_user(&state, &session).await else {
        return super::redirect_to_login(&path);
    };
    let body = format!("{QUERY_FORM}{}", story_body(&path).await);
    super::html(super::page(Some(&user.username), &body))
}

/// Fetch and render one story, collapsing every failure into the static
/// fallback message.
async fn story_body(input: &str) -> String {
    match nzherald::fetch_story(input).await {
        Ok(story) => render_story(&story),
        Err(e) => {
            warn!(%input, error = %e, "Story fetch failed");
            render_fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::UserStore;
    use actix_session::{SessionMiddleware, storage::CookieSessionStore};
    use actix_web::cookie::Key;
    use actix_web::http::{StatusCode, header};
    use actix_web::{App, test};

    fn temp_store(tag: &str) -> UserStore {
        let path = std::env::temp_dir().join(format!(
            "nzharold-main-{tag}-{}.sqlite",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        UserStore::new(path)
    }

    fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
        SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
            .cookie_name("session".into())
            .cookie_secure(false)
            .build()
    }

    #[actix_web::test]
    async fn index_redirects_anonymous_visitors_to_login() {
        let store = temp_store("anon");
        store.init().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppState { store }))
                .wrap(test_session_middleware())
                .configure(crate::pages::routes),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers().get(header::LOCATION).unwrap(), "/login");
    }

    #[actix_web::test]
    async fn deep_path_redirect_preserves_destination() {
        let store = temp_store("deep");
        store.init().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppState { store }))
                .wrap(test_session_middleware())
                .configure(crate::pages::routes),
        )
        .await;

        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/nz/a-story/ABC123/")
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            res.headers().get(header::LOCATION).unwrap(),
            "/login?next=%2Fnz%2Fa-story%2FABC123%2F"
        );
    }
}

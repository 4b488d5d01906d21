//! Session helpers to keep the page handlers free of framework plumbing.
//!
//! A thin wrapper around Actix cookie sessions: the only thing stored is
//! the logged-in user's row id, under one well-known key.

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload, error};
use futures::future::LocalBoxFuture;

pub(crate) const USER_ID_KEY: &str = "user_id";

/// Newtype wrapper exposing the handful of session operations pages need.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    /// Persist the authenticated user's id in the session cookie.
    pub fn persist_user(&self, user_id: i64) -> actix_web::Result<()> {
        self.0
            .insert(USER_ID_KEY, user_id)
            .map_err(error::ErrorInternalServerError)
    }

    /// The current user id, if the cookie carries a valid one.
    pub fn user_id(&self) -> Option<i64> {
        self.0.get::<i64>(USER_ID_KEY).ok().flatten()
    }

    /// Drop the session entirely, logging the user out.
    pub fn clear(&self) {
        self.0.purge();
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = Session::from_request(req, payload);
        Box::pin(async move { fut.await.map(SessionContext::new) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_session::{SessionMiddleware, storage::CookieSessionStore};
    use actix_web::cookie::Key;
    use actix_web::http::StatusCode;
    use actix_web::{App, HttpResponse, test, web};

    fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
        SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
            .cookie_name("session".into())
            .cookie_secure(false)
            .build()
    }

    #[actix_web::test]
    async fn round_trips_user_id() {
        let app = test::init_service(
            App::new()
                .wrap(test_session_middleware())
                .route(
                    "/set",
                    web::get().to(|session: SessionContext| async move {
                        session.persist_user(7)?;
                        Ok::<_, actix_web::Error>(HttpResponse::Ok().finish())
                    }),
                )
                .route(
                    "/get",
                    web::get().to(|session: SessionContext| async move {
                        match session.user_id() {
                            Some(id) => HttpResponse::Ok().body(id.to_string()),
                            None => HttpResponse::Unauthorized().finish(),
                        }
                    }),
                ),
        )
        .await;

        let set_res =
            test::call_service(&app, test::TestRequest::get().uri("/set").to_request()).await;
        assert_eq!(set_res.status(), StatusCode::OK);
        let cookie = set_res
            .response()
            .cookies()
            .find(|cookie| cookie.name() == "session")
            .expect("session cookie set");

        let get_res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/get")
                .cookie(cookie.clone())
                .to_request(),
        )
        .await;
        assert_eq!(get_res.status(), StatusCode::OK);
        let body = test::read_body(get_res).await;
        assert_eq!(body, "7");
    }

    #[actix_web::test]
    async fn missing_session_has_no_user() {
        let app = test::init_service(App::new().wrap(test_session_middleware()).route(
            "/get",
            web::get().to(|session: SessionContext| async move {
                match session.user_id() {
                    Some(_) => HttpResponse::Ok().finish(),
                    None => HttpResponse::Unauthorized().finish(),
                }
            }),
        ))
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/get").to_request()).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}

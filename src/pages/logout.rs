//! The logout page.

use crate::session::SessionContext;
use actix_web::HttpResponse;

/// `GET /logout` — drop the session and offer the way back in.
pub async fn logout(session: SessionContext) -> HttpResponse {
    session.clear();
    super::html(super::page(
        None,
        r#"<p>Logged out. <a href="/login">Log in again?</a></p>"#,
    ))
}

//! The login page.
//!
//! A plain username/password form. A successful check stores the user id in
//! the session cookie and redirects to wherever the visitor was headed; a
//! failed one re-renders the form with the rejection alert.

use crate::server::AppState;
use crate::session::SessionContext;
use crate::users;
use actix_web::{HttpResponse, web};
use html_escape::encode_double_quoted_attribute;
use serde::Deserialize;
use tracing::{error, info};

const REJECTION: &str = "Unrecognized username-password combination.";

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    username: String,
    password: String,
    next: Option<String>,
}

/// `GET /login`.
pub async fn form(
    state: web::Data<AppState>,
    session: SessionContext,
    query: web::Query<NextQuery>,
) -> HttpResponse {
    if super::current_user(&state, &session).await.is_some() {
        return super::redirect("/");
    }
    super::html(super::page(None, &form_body(query.next.as_deref(), None)))
}

/// `POST /login`.
pub async fn submit(
    state: web::Data<AppState>,
    session: SessionContext,
    form: web::Form<LoginForm>,
) -> HttpResponse {
    let LoginForm {
        username,
        password,
        next,
    } = form.into_inner();

    let store = state.store.clone();
    let lookup = {
        let username = username.clone();
        web::block(move || store.find_by_username(&username)).await
    };
    let user = match lookup {
        Ok(Ok(user)) => user,
        Ok(Err(e)) => {
            error!(error = %e, "User lookup failed");
            None
        }
        Err(e) => {
            error!(error = %e, "User lookup did not run");
            None
        }
    };

    match user {
        Some(user) if users::verify_password(&password, &user.password) => {
            if let Err(e) = session.persist_user(user.id) {
                error!(error = %e, "Failed to persist session");
                return HttpResponse::InternalServerError().finish();
            }
            info!(username = %user.username, "Login succeeded");
            super::redirect(&safe_next(next))
        }
        _ => {
            info!(%username, "Login rejected");
            super::html(super::page(None, &form_body(next.as_deref(), Some(REJECTION))))
        }
    }
}

/// Only follow `next` values that are plain local paths.
fn safe_next(next: Option<String>) -> String {
    match next {
        Some(n) if n.starts_with('/') && !n.starts_with("//") => n,
        _ => "/".to_string(),
    }
}

fn form_body(next: Option<&str>, alert: Option<&str>) -> String {
    let next_field = match next {
        Some(next) => format!(
            r#"<input type="hidden" name="next" value="{}">"#,
            encode_double_quoted_attribute(next)
        ),
        None => String::new(),
    };
    let alert_row = match alert {
        Some(message) => format!(r#"<div class="alert alert-danger mt-3">{message}</div>"#),
        None => String::new(),
    };
    format!(
        r#"<form class="col-6 offset-3 mt-5" method="post" action="/login">
<div class="mb-3">
<label class="form-label" for="username">Username</label>
<input class="form-control" id="username" name="username">
</div>
<div class="mb-3">
<label class="form-label" for="password">Password</label>
<input class="form-control" id="password" name="password" type="password">
</div>
{next_field}
<button class="btn btn-primary" type="submit">Submit</button>
{alert_row}
</form>
"#
    )
}

use axum::{
    extract::{Form, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use crate::errors::AppResult;
use crate::handlers::render::{escape_html, flash, render_page};
use crate::middleware::{clear_identity, identity_cookie};
use crate::models::{ErrorQuery, RegisterForm, Username};
use crate::services::CreateOutcome;
use crate::state::AppState;

fn render_register(error: Option<&str>, username: &str) -> AppResult<Response> {
    let message = error.map(|e| flash("error", e)).unwrap_or_default();
    let page = render_page(
        "Register",
        "register",
        &[("message", &message), ("username", &escape_html(username))],
    )?;
    Ok(page.into_response())
}

pub async fn serve_register_page(Query(query): Query<ErrorQuery>) -> AppResult<Response> {
    render_register(query.error.as_deref(), "")
}

pub async fn handle_register(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(register_form): Form<RegisterForm>,
) -> AppResult<Response> {
    let raw = register_form.username.trim();

    let username = match Username::parse(raw) {
        Ok(username) => username,
        Err(e) => {
            tracing::info!("Rejected nickname {:?}: {}", raw, e);
            return render_register(Some(&e.to_string()), raw);
        }
    };

    match state.store.create(&username).await? {
        CreateOutcome::Created(_) => {
            let cookie = identity_cookie(username.as_str(), state.config.identity.cookie_max_age_days);
            Ok((jar.add(cookie), Redirect::to("/")).into_response())
        }
        CreateOutcome::AlreadyExists => {
            render_register(Some("This nickname is already taken, pick another one"), raw)
        }
    }
}

pub async fn handle_logout(jar: CookieJar) -> Response {
    (clear_identity(jar), Redirect::to("/register")).into_response()
}

//! Deliberately vulnerable challenge pages. The flaws are the exercise; do
//! not patch them.
use axum::{
    extract::{Form, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use crate::errors::AppResult;
use crate::handlers::render::{escape_html, flash, render_page};
use crate::models::{ChallengeId, CommentForm, LoginForm};
use crate::services::FlagBook;
use crate::state::AppState;

/// Cookie readable from scripts, like the rest of this app's cookies.
fn script_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value)).path("/").http_only(false).build()
}

// ==================== CHALLENGE 1 - IDOR ====================

struct Document {
    id: i64,
    title: &'static str,
    content: String,
    confidential: bool,
}

fn documents(flags: &FlagBook) -> Vec<Document> {
    vec![
        Document {
            id: 0,
            title: "CONFIDENTIAL Administrator Document",
            content: format!(
                "This document is strictly reserved for administrators.\n\nFLAG: {}\n\nUnauthorized access detected. This resource should not be reachable without proper access control.",
                flags.flag(ChallengeId::IDOR)
            ),
            confidential: true,
        },
        Document {
            id: 1,
            title: "Public document",
            content: "This is a public document available to every user.".to_string(),
            confidential: false,
        },
        Document {
            id: 2,
            title: "User guide",
            content: "How to use the application as a standard user.".to_string(),
            confidential: false,
        },
        Document {
            id: 3,
            title: "General FAQ",
            content: "Frequently asked questions and their answers.".to_string(),
            confidential: false,
        },
        Document {
            id: 4,
            title: "Confidential data",
            content: "Sensitive company information - restricted to managers.".to_string(),
            confidential: true,
        },
    ]
}

/// Leading integer of `raw`, ignoring anything after the digits.
fn parse_leading_int(raw: &str) -> Option<i64> {
    let raw = raw.trim_start();
    let sign_len = usize::from(raw.starts_with('-') || raw.starts_with('+'));
    let digits = raw[sign_len..].chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    raw[..sign_len + digits].parse().ok()
}

pub async fn challenge1_index() -> AppResult<Response> {
    Ok(render_page("Challenge 1", "challenge1", &[("document", "")])?.into_response())
}

/// Serves any document by id; nobody checks who is asking.
pub async fn challenge1_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let document = parse_leading_int(&id)
        .and_then(|id| documents(&state.flags).into_iter().find(|d| d.id == id));

    let html = match document {
        Some(doc) => format!(
            r#"<article class="document{}">
                <h2>#{} {}</h2>
                <p>{}</p>
            </article>"#,
            if doc.confidential { " confidential" } else { "" },
            doc.id,
            escape_html(doc.title),
            escape_html(&doc.content).replace('\n', "<br>")
        ),
        None => flash("error", "Document not found"),
    };
    Ok(render_page("Challenge 1", "challenge1", &[("document", &html)])?.into_response())
}

// ==================== CHALLENGE 2 - PATH TRAVERSAL ====================

pub async fn challenge2_index() -> AppResult<Response> {
    Ok(render_page("Challenge 2", "challenge2", &[])?.into_response())
}

pub async fn challenge2_public() -> Html<&'static str> {
    Html("<h1>Public directory</h1><p>Contents of the public directory...</p>")
}

pub async fn challenge2_docs() -> Html<&'static str> {
    Html("<h1>Docs directory</h1><p>General documentation...</p>")
}

pub async fn challenge2_help() -> Html<&'static str> {
    Html("<h1>Help directory</h1><p>Help and support...</p>")
}

/// Not linked from anywhere; found by guessing directory names.
pub async fn challenge2_admin(State(state): State<AppState>) -> AppResult<Response> {
    let flag = escape_html(state.flags.flag(ChallengeId::PATH_TRAVERSAL));
    Ok(render_page("Admin directory", "challenge2_admin", &[("flag", &flag)])?.into_response())
}

// ==================== CHALLENGE 5 - BROKEN AUTHENTICATION ====================

pub async fn challenge5_index() -> AppResult<Response> {
    Ok(render_page("Challenge 5", "challenge5", &[("message", "")])?.into_response())
}

/// Login whose error messages tell users apart and whose session is two
/// guessable script-readable cookies.
pub async fn challenge5_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(login_form): Form<LoginForm>,
) -> AppResult<Response> {
    let username = login_form.username.as_str();

    let (jar, message) = match username {
        "admin" if login_form.password == "0123456789" => {
            tracing::info!("challenge5: admin login succeeded");
            let jar = jar
                .add(script_cookie("auth_token", "admin_token_12345".to_string()))
                .add(script_cookie("user_role", "administrator".to_string()));
            let text = format!("Login successful! FLAG: {}", state.flags.flag(ChallengeId::BROKEN_AUTH));
            (jar, flash("success", &text))
        }
        "admin" => {
            let jar = jar.add(script_cookie("debug_info", "user_exists".to_string()));
            (jar, flash("error", "User admin exists but the password is incorrect"))
        }
        "root" | "test" => {
            let text = format!("User {} does not have the required permissions", username);
            (jar, flash("error", &text))
        }
        _ => (jar, flash("error", "Unknown user in the system")),
    };

    let page = render_page("Challenge 5", "challenge5", &[("message", &message)])?;
    Ok((jar, page).into_response())
}

// ==================== CHALLENGE 6 - XSS ====================

async fn render_guest_book(state: &AppState, jar: CookieJar) -> AppResult<Response> {
    // Author and text go out exactly as they came in
    let comments = state
        .comments
        .list()
        .await
        .iter()
        .map(|c| {
            format!(
                r#"<div class="comment"><strong>{}</strong><p>{}</p></div>"#,
                c.author, c.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let jar = jar.add(script_cookie("flag", state.flags.flag(ChallengeId::XSS).to_string()));
    let page = render_page("Challenge 6", "challenge6", &[("comments", &comments)])?;
    Ok((jar, page).into_response())
}

pub async fn challenge6_index(State(state): State<AppState>, jar: CookieJar) -> AppResult<Response> {
    render_guest_book(&state, jar).await
}

pub async fn challenge6_comment(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(comment_form): Form<CommentForm>,
) -> AppResult<Response> {
    state.comments.post(comment_form.author, comment_form.text).await;
    render_guest_book(&state, jar).await
}

// ==================== CHALLENGE 7 - GIT SECRETS ====================

pub async fn challenge7_index() -> AppResult<Response> {
    Ok(render_page("Challenge 7", "challenge7", &[])?.into_response())
}

// ==================== CHALLENGE 8 - INFORMATION DISCLOSURE ====================

pub async fn robots_txt() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        "User-agent: *\nDisallow: /challenge8/backup/\n",
    )
}

pub async fn challenge8_index() -> AppResult<Response> {
    Ok(render_page("Challenge 8", "challenge8", &[])?.into_response())
}

/// Leftover backup of the server configuration.
pub async fn challenge8_backup(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Response {
    if file != "config.bak" {
        return (StatusCode::NOT_FOUND, "Not found").into_response();
    }

    tracing::debug!("challenge8: backup file served");
    let dump = format!(
        "# server configuration - backup taken before migration\n\
         [server]\n\
         host = \"0.0.0.0\"\n\
         port = {}\n\
         \n\
         [database]\n\
         url = \"{}\"\n\
         admin_user = \"admin\"\n\
         \n\
         [secrets]\n\
         session_id = \"{}\"\n\
         flag = \"{}\"\n",
        state.config.server.port,
        state.config.database.url,
        state.flags.session_id(),
        state.flags.flag(ChallengeId::INFO_DISCLOSURE)
    );
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], dump).into_response()
}

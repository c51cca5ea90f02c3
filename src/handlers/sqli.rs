use axum::{
    extract::{Form, State},
    response::{IntoResponse, Response},
};
use crate::errors::AppResult;
use crate::handlers::render::{escape_html, flash, render_page};
use crate::models::{ChallengeId, LoginForm, SearchForm};
use crate::services::QueryRows;
use crate::state::AppState;

/// Database errors are shown to the player word for word.
fn sql_error(e: &sqlx::Error) -> String {
    let text = match e.as_database_error() {
        Some(db) => db.message().to_string(),
        None => e.to_string(),
    };
    tracing::debug!("Echoing SQL error to the page: {}", text);
    format!(r#"<div class="sql-error">SQL error: {}</div>"#, escape_html(&text))
}

// ==================== CHALLENGE 3 - SQL INJECTION ====================

pub async fn challenge3_index() -> AppResult<Response> {
    Ok(render_page("Challenge 3", "challenge3", &[("message", "")])?.into_response())
}

pub async fn challenge3_login(
    State(state): State<AppState>,
    Form(login_form): Form<LoginForm>,
) -> AppResult<Response> {
    let message = match state.db.login(&login_form.username, &login_form.password).await {
        Ok(Some(name)) => {
            let text = format!(
                "Login successful! Welcome {}. FLAG: {}",
                name,
                state.flags.flag(ChallengeId::SQL_AUTH_BYPASS)
            );
            flash("success", &text)
        }
        Ok(None) => flash("error", "Invalid credentials"),
        Err(e) => sql_error(&e),
    };
    Ok(render_page("Challenge 3", "challenge3", &[("message", &message)])?.into_response())
}

// ==================== CHALLENGE 4 - ADVANCED SQL INJECTION ====================

fn results_table(results: &QueryRows) -> String {
    if results.rows.is_empty() {
        return flash("info", "No user found");
    }

    let head = results
        .columns
        .iter()
        .map(|c| format!("<th>{}</th>", escape_html(c)))
        .collect::<String>();
    let body = results
        .rows
        .iter()
        .map(|row| {
            let cells = row
                .iter()
                .map(|v| format!("<td>{}</td>", escape_html(v)))
                .collect::<String>();
            format!("<tr>{}</tr>", cells)
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        r#"<table class="results"><thead><tr>{}</tr></thead><tbody>{}</tbody></table>"#,
        head, body
    )
}

pub async fn challenge4_index() -> AppResult<Response> {
    let vars = [("results", ""), ("search", "")];
    Ok(render_page("Challenge 4", "challenge4", &vars)?.into_response())
}

pub async fn challenge4_search(
    State(state): State<AppState>,
    Form(search_form): Form<SearchForm>,
) -> AppResult<Response> {
    let results = match state.db.search(&search_form.search).await {
        Ok(rows) => results_table(&rows),
        Err(e) => sql_error(&e),
    };
    let search = escape_html(&search_form.search);
    let vars = [("results", results.as_str()), ("search", search.as_str())];
    Ok(render_page("Challenge 4", "challenge4", &vars)?.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_table_escapes_cells() {
        let rows = QueryRows {
            columns: vec!["username".into(), "email".into()],
            rows: vec![vec!["<b>x</b>".into(), "x@example.com".into()]],
        };
        let html = results_table(&rows);
        assert!(html.contains("<th>username</th>"));
        assert!(html.contains("<td>&lt;b&gt;x&lt;/b&gt;</td>"));
    }

    #[test]
    fn test_empty_results_say_so() {
        assert!(results_table(&QueryRows::default()).contains("No user found"));
    }
}

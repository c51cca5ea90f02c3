use axum::{
    extract::{Extension, Form, State},
    response::{IntoResponse, Json, Response},
};
use crate::errors::{AppError, AppResult};
use crate::handlers::render::{escape_html, flash, render_page};
use crate::middleware::CurrentUser;
use crate::models::{DashboardView, FlagForm, LeaderboardEntry, Submission, UserRecord};
use crate::services::CompletionOutcome;
use crate::state::AppState;

async fn build_view(state: &AppState, user: &UserRecord) -> DashboardView {
    let leaderboard = state.store.leaderboard(Some(user.username().as_str())).await;
    DashboardView::build(user, leaderboard)
}

fn render_dashboard(view: &DashboardView, outcome: Option<Submission>) -> AppResult<Response> {
    let challenge_rows = view
        .challenges
        .iter()
        .map(|c| {
            format!(
                r#"<tr class="{}">
                <td>{}</td>
                <td><a href="{}">{}</a></td>
                <td>{}</td>
            </tr>"#,
                if c.completed { "completed" } else { "pending" },
                c.number,
                c.route,
                escape_html(c.name),
                if c.completed { "Completed" } else { "Pending" }
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let leaderboard_rows = view
        .leaderboard
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            format!(
                r#"<tr{}>
                <td>{}</td>
                <td>{}</td>
                <td>{}</td>
                <td>{}</td>
            </tr>"#,
                if entry.is_requester { r#" class="me""# } else { "" },
                i + 1,
                escape_html(&entry.username),
                entry.total_points,
                entry.completed_count
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let completed = if view.completed.is_empty() {
        "none yet".to_string()
    } else {
        view.completed.iter().map(u8::to_string).collect::<Vec<_>>().join(", ")
    };
    let message = outcome
        .map(|o| flash(o.kind(), &o.message()))
        .unwrap_or_default();

    let page = render_page(
        "Dashboard",
        "dashboard",
        &[
            ("message", &message),
            ("username", &escape_html(&view.username)),
            ("total_points", &view.total_points.to_string()),
            ("completed", &completed),
            ("challenge_count", &view.challenges.len().to_string()),
            ("challenges", &challenge_rows),
            ("leaderboard", &leaderboard_rows),
        ],
    )?;
    Ok(page.into_response())
}

pub async fn serve_dashboard(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> AppResult<Response> {
    let view = build_view(&state, &user).await;
    render_dashboard(&view, None)
}

/// Checks a submitted flag and records the solve.
pub async fn submit_flag(state: &AppState, username: &str, submitted: &str) -> AppResult<Submission> {
    let Some(challenge) = state.flags.lookup(submitted) else {
        tracing::info!("Incorrect flag submitted by {}", username);
        return Ok(Submission::Incorrect);
    };

    match state.store.set_challenge_complete(username, challenge.index()).await? {
        CompletionOutcome::Completed(_) => Ok(Submission::newly_completed(challenge)),
        CompletionOutcome::AlreadyComplete(_) => Ok(Submission::AlreadyCompleted(challenge)),
        CompletionOutcome::NotFound => Err(AppError::Identity("Unknown player".into())),
    }
}

pub async fn validate_flag(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Form(flag_form): Form<FlagForm>,
) -> AppResult<Response> {
    let username = user.username().as_str().to_string();
    let outcome = submit_flag(&state, &username, &flag_form.flag).await?;

    // Progress attached by the gate predates this submission
    let fresh = state.store.find_by_username(&username).await.unwrap_or(user);
    let view = build_view(&state, &fresh).await;
    render_dashboard(&view, Some(outcome))
}

pub async fn api_progress(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Json<DashboardView> {
    Json(build_view(&state, &user).await)
}

pub async fn api_leaderboard(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Json<Vec<LeaderboardEntry>> {
    Json(state.store.leaderboard(Some(user.username().as_str())).await)
}

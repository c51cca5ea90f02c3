use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{limit::RequestBodyLimitLayer, services::ServeDir};
use crate::{handlers, middleware, state::AppState};

pub fn router(state: AppState) -> Router {
    let max_body_size = state.config.limits.max_body_size;

    Router::new()
        // Registration
        .route("/register", get(handlers::serve_register_page).post(handlers::handle_register))
        .route("/logout", get(handlers::handle_logout))

        // Dashboard and flag submission
        .route("/", get(handlers::serve_dashboard))
        .route("/validate-flag", post(handlers::validate_flag))
        .route("/api/progress", get(handlers::api_progress))
        .route("/api/leaderboard", get(handlers::api_leaderboard))

        // Challenges
        .route("/challenge1", get(handlers::challenge1_index))
        .route("/challenge1/doc/:id", get(handlers::challenge1_document))
        .route("/challenge2", get(handlers::challenge2_index))
        .route("/challenge2/public", get(handlers::challenge2_public))
        .route("/challenge2/docs", get(handlers::challenge2_docs))
        .route("/challenge2/help", get(handlers::challenge2_help))
        .route("/challenge2/admin", get(handlers::challenge2_admin))
        .route("/challenge3", get(handlers::challenge3_index))
        .route("/challenge3/login", post(handlers::challenge3_login))
        .route("/challenge4", get(handlers::challenge4_index))
        .route("/challenge4/search", post(handlers::challenge4_search))
        .route("/challenge5", get(handlers::challenge5_index))
        .route("/challenge5/login", post(handlers::challenge5_login))
        .route("/challenge6", get(handlers::challenge6_index))
        .route("/challenge6/comment", post(handlers::challenge6_comment))
        .route("/challenge7", get(handlers::challenge7_index))
        .route("/challenge8", get(handlers::challenge8_index))
        .route("/challenge8/backup/:file", get(handlers::challenge8_backup))
        .route("/robots.txt", get(handlers::robots_txt))

        // Static files
        .nest_service("/static", ServeDir::new("static"))

        // Every route above goes through the identity gate
        .layer(from_fn_with_state(state.clone(), middleware::require_user))

        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .with_state(state)
}

mod auth;
mod challenges;
mod dashboard;
mod render;
mod sqli;

pub use auth::{serve_register_page, handle_register, handle_logout};
pub use dashboard::{serve_dashboard, validate_flag, api_progress, api_leaderboard};
pub use challenges::{
    challenge1_index, challenge1_document,
    challenge2_index, challenge2_public, challenge2_docs, challenge2_help, challenge2_admin,
    challenge5_index, challenge5_login,
    challenge6_index, challenge6_comment,
    challenge7_index,
    challenge8_index, challenge8_backup, robots_txt,
};
pub use sqli::{challenge3_index, challenge3_login, challenge4_index, challenge4_search};

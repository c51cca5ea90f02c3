use std::sync::Arc;
use crate::config::Config;
use crate::services::{CommentBoard, FlagBook, ProgressStore, VulnDb};

/// Process-wide state handed to every handler.
///
/// The flag book and comment board live only as long as the process.
#[derive(Clone)]
pub struct AppState {
    pub store: ProgressStore,
    pub flags: Arc<FlagBook>,
    pub comments: CommentBoard,
    pub db: VulnDb,
    pub config: Arc<Config>,
}

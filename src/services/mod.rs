mod comments;
mod database;
mod flags;
mod progress_store;

pub use comments::CommentBoard;
pub use database::{QueryRows, VulnDb};
pub use flags::FlagBook;
pub use progress_store::{CompletionOutcome, CreateOutcome, ProgressStore};

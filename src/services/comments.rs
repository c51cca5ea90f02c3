use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub author: String,
    pub text: String,
}

/// Guest book of the stored-XSS challenge. Lives in memory only and starts
/// over with the seed comments on every restart.
#[derive(Clone)]
pub struct CommentBoard {
    comments: Arc<RwLock<Vec<Comment>>>,
}

impl CommentBoard {
    pub fn seeded() -> Self {
        let seed = [
            ("Alice", "Great application, thanks!"),
            ("Bob", "Very useful for learning"),
            ("Charlie", "I learned a lot"),
        ];
        Self {
            comments: Arc::new(RwLock::new(
                seed.into_iter()
                    .map(|(author, text)| Comment {
                        author: author.to_string(),
                        text: text.to_string(),
                    })
                    .collect(),
            )),
        }
    }

    pub async fn list(&self) -> Vec<Comment> {
        self.comments.read().await.clone()
    }

    /// Stores the comment exactly as submitted.
    pub async fn post(&self, author: String, text: String) {
        tracing::debug!("New comment by {:?}", author);
        self.comments.write().await.push(Comment { author, text });
    }
}

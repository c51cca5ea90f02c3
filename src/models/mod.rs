mod challenge;
mod dashboard;
mod forms;
mod user;

pub use challenge::{ChallengeId, CHALLENGE_COUNT};
pub use dashboard::{DashboardView, Submission};
pub use forms::{CommentForm, ErrorQuery, FlagForm, LoginForm, RegisterForm, SearchForm};
pub use user::{InvalidProgress, InvalidUsername, LeaderboardEntry, Progress, UserRecord, Username};

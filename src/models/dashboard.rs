use serde::Serialize;
use super::challenge::{ChallengeId, POINTS_PER_CHALLENGE};
use super::user::{LeaderboardEntry, UserRecord};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeStatus {
    pub number: u8,
    pub name: &'static str,
    pub route: &'static str,
    pub completed: bool,
}

/// Everything the dashboard shows for one player.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub username: String,
    pub completed: Vec<u8>,
    pub total_points: u32,
    pub challenges: Vec<ChallengeStatus>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

impl DashboardView {
    pub fn build(record: &UserRecord, leaderboard: Vec<LeaderboardEntry>) -> Self {
        let progress = record.progress();
        Self {
            username: record.username().to_string(),
            completed: progress.completed().map(ChallengeId::number).collect(),
            total_points: record.total_points(),
            challenges: ChallengeId::all()
                .map(|id| {
                    let info = id.info();
                    ChallengeStatus {
                        number: info.number,
                        name: info.name,
                        route: info.route,
                        completed: progress.is_complete(id),
                    }
                })
                .collect(),
            leaderboard,
        }
    }
}

/// Result of a flag submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Incorrect,
    AlreadyCompleted(ChallengeId),
    NewlyCompleted { challenge: ChallengeId, points: u32 },
}

impl Submission {
    pub fn newly_completed(challenge: ChallengeId) -> Self {
        Self::NewlyCompleted { challenge, points: POINTS_PER_CHALLENGE }
    }

    /// CSS class of the flash message.
    pub fn kind(&self) -> &'static str {
        match self {
            Submission::Incorrect => "error",
            Submission::AlreadyCompleted(_) => "info",
            Submission::NewlyCompleted { .. } => "success",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Submission::Incorrect => "Incorrect flag!".to_string(),
            Submission::AlreadyCompleted(_) => "You have already validated this flag!".to_string(),
            Submission::NewlyCompleted { challenge, points } => {
                format!("Correct flag! +{} points - Challenge {} completed!", points, challenge)
            }
        }
    }
}

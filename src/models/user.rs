use chrono::{DateTime, SubsecRound, Utc};
use serde::{Serialize, Serializer};
use std::{fmt, str::FromStr};
use thiserror::Error;
use super::challenge::{ChallengeId, CHALLENGE_COUNT, POINTS_PER_CHALLENGE};

/// Width of progress strings written by the first version of the game.
pub const LEGACY_PROGRESS_LEN: usize = 10;

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 20;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("nickname must be 3 to 20 characters long and use only letters, digits, '_' or '-'")]
pub struct InvalidUsername;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidProgress {
    #[error("progress has {0} bits, expected {CHALLENGE_COUNT}")]
    Length(usize),
    #[error("progress contains {0:?}, expected only '0' or '1'")]
    Character(char),
    #[error("legacy progress sets bit {0} which no challenge uses")]
    UnusedBit(usize),
}

/// Player nickname, matching `^[A-Za-z0-9_-]{3,20}$`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    pub fn parse(raw: &str) -> Result<Self, InvalidUsername> {
        let allowed = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-';
        if (USERNAME_MIN..=USERNAME_MAX).contains(&raw.len()) && raw.chars().all(allowed) {
            Ok(Self(raw.to_string()))
        } else {
            Err(InvalidUsername)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Completed challenges; bit `i` stands for challenge `i + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress([bool; CHALLENGE_COUNT]);

impl Progress {
    pub fn is_complete(&self, id: ChallengeId) -> bool {
        self.0[id.index()]
    }

    /// Sets the bit for `id`. Returns false when it was already set.
    fn mark(&mut self, id: ChallengeId) -> bool {
        let bit = &mut self.0[id.index()];
        let newly = !*bit;
        *bit = true;
        newly
    }

    pub fn completed_count(&self) -> usize {
        self.0.iter().filter(|done| **done).count()
    }

    pub fn completed(&self) -> impl Iterator<Item = ChallengeId> + '_ {
        ChallengeId::all().filter(|id| self.is_complete(*id))
    }
}

impl FromStr for Progress {
    type Err = InvalidProgress;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let len = s.chars().count();
        if len != CHALLENGE_COUNT && len != LEGACY_PROGRESS_LEN {
            return Err(InvalidProgress::Length(len));
        }

        let mut bits = [false; CHALLENGE_COUNT];
        for (i, c) in s.chars().enumerate() {
            let set = match c {
                '0' => false,
                '1' => true,
                other => return Err(InvalidProgress::Character(other)),
            };
            if i < CHALLENGE_COUNT {
                bits[i] = set;
            } else if set {
                return Err(InvalidProgress::UnusedBit(i));
            }
        }
        Ok(Self(bits))
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for done in self.0 {
            f.write_str(if done { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl Serialize for Progress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One row of the progress table.
///
/// `total_points` is only ever derived from `progress`, so it always equals
/// `POINTS_PER_CHALLENGE` times the number of set bits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    username: Username,
    progress: Progress,
    total_points: u32,
    last_update: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(username: Username, now: DateTime<Utc>) -> Self {
        Self::from_parts(username, Progress::default(), now)
    }

    pub fn from_parts(username: Username, progress: Progress, last_update: DateTime<Utc>) -> Self {
        Self {
            username,
            total_points: points_for(&progress),
            progress,
            // The table keeps millisecond precision
            last_update: last_update.trunc_subsecs(3),
        }
    }

    pub fn username(&self) -> &Username {
        &self.username
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn total_points(&self) -> u32 {
        self.total_points
    }

    pub fn last_update(&self) -> DateTime<Utc> {
        self.last_update
    }

    pub fn completed_count(&self) -> usize {
        self.progress.completed_count()
    }

    /// Marks `id` solved. Returns false and leaves the record untouched if it
    /// already was.
    pub fn complete(&mut self, id: ChallengeId, now: DateTime<Utc>) -> bool {
        if !self.progress.mark(id) {
            return false;
        }
        self.total_points += POINTS_PER_CHALLENGE;
        self.last_update = now.trunc_subsecs(3);
        true
    }
}

pub fn points_for(progress: &Progress) -> u32 {
    // At most CHALLENGE_COUNT bits are set
    progress.completed_count() as u32 * POINTS_PER_CHALLENGE
}

/// Leaderboard row derived from a `UserRecord`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub username: String,
    pub total_points: u32,
    pub completed_count: usize,
    pub is_requester: bool,
}

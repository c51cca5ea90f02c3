use chrono::{DateTime, SecondsFormat, Utc};
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;
use tokio::{fs, sync::Mutex};
use crate::errors::{StoreError, StoreResult};
use crate::models::{
    ChallengeId, InvalidProgress, InvalidUsername, LeaderboardEntry, Progress, UserRecord, Username,
};

/// First line of the progress table.
pub const TABLE_HEADER: &str = "username,progress,totalPoints,lastUpdate";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(UserRecord),
    AlreadyExists,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    Completed(UserRecord),
    AlreadyComplete(UserRecord),
    NotFound,
}

/// Flat-file store of every player's progress.
///
/// Every operation works on the whole table: it is read in full, changed in
/// memory and written back in full. Mutations from this process are
/// serialized by `write_lock`; readers never wait on it.
#[derive(Clone)]
pub struct ProgressStore {
    path: Arc<PathBuf>,
    write_lock: Arc<Mutex<()>>,
}

impl ProgressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the data directory and an empty table if they are missing.
    pub async fn initialize(&self) -> StoreResult<()> {
        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            if !fs::try_exists(dir).await? {
                fs::create_dir_all(dir).await?;
                tracing::info!("Created data directory {}", dir.display());
            }
        }

        if !fs::try_exists(self.path()).await? {
            fs::write(self.path(), format!("{}\n", TABLE_HEADER)).await?;
            tracing::info!("Created progress table {}", self.path.display());
        }
        Ok(())
    }

    /// Reads every record in file order. A missing or unreadable table reads
    /// as empty and malformed rows are skipped.
    pub async fn load_all(&self) -> Vec<UserRecord> {
        match fs::read_to_string(self.path()).await {
            Ok(content) => parse_table(&content),
            Err(e) => {
                tracing::error!("Failed to read progress table {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    /// Replaces the table with `records`.
    ///
    /// The rows go to a sibling temporary file first, which is then renamed
    /// over the table, so a crash never leaves a half-written table behind.
    pub async fn save_all(&self, records: &[UserRecord]) -> StoreResult<()> {
        let tmp = self.temp_path();
        if let Err(e) = fs::write(&tmp, render_table(records)).await {
            tracing::error!("Failed to write progress table {}: {}", tmp.display(), e);
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp, self.path()).await {
            tracing::error!("Failed to replace progress table {}: {}", self.path.display(), e);
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    pub async fn find_by_username(&self, username: &str) -> Option<UserRecord> {
        self.load_all()
            .await
            .into_iter()
            .find(|record| record.username().as_str() == username)
    }

    pub async fn exists(&self, username: &str) -> bool {
        self.find_by_username(username).await.is_some()
    }

    /// Appends a fresh record for `username` unless the name is taken.
    pub async fn create(&self, username: &Username) -> StoreResult<CreateOutcome> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.load_all().await;
        if records.iter().any(|record| record.username() == username) {
            tracing::warn!("Player {} already exists", username);
            return Ok(CreateOutcome::AlreadyExists);
        }

        let record = UserRecord::new(username.clone(), Utc::now());
        records.push(record.clone());
        self.save_all(&records).await?;

        tracing::info!("Registered player {}", username);
        Ok(CreateOutcome::Created(record))
    }

    /// Marks the challenge at bit `index` solved for `username`.
    ///
    /// Nothing is written when the player is unknown or already solved it.
    pub async fn set_challenge_complete(
        &self,
        username: &str,
        index: usize,
    ) -> StoreResult<CompletionOutcome> {
        let challenge = ChallengeId::from_index(index).ok_or(StoreError::UnknownChallenge(index))?;

        let _guard = self.write_lock.lock().await;

        let mut records = self.load_all().await;
        let Some(record) = records
            .iter_mut()
            .find(|record| record.username().as_str() == username)
        else {
            tracing::warn!("Cannot record challenge {} for unknown player {}", challenge, username);
            return Ok(CompletionOutcome::NotFound);
        };

        if !record.complete(challenge, Utc::now()) {
            tracing::info!("Challenge {} already completed by {}", challenge, username);
            return Ok(CompletionOutcome::AlreadyComplete(record.clone()));
        }

        let updated = record.clone();
        self.save_all(&records).await?;

        tracing::info!(
            "Challenge {} completed by {} - total: {} points",
            challenge,
            username,
            updated.total_points()
        );
        Ok(CompletionOutcome::Completed(updated))
    }

    /// Every player ranked by points, then by solved challenges.
    pub async fn leaderboard(&self, requester: Option<&str>) -> Vec<LeaderboardEntry> {
        rank(&self.load_all().await, requester)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("progress"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Sorts by points descending, then solved count descending. Anything still
/// tied keeps table order.
pub fn rank(records: &[UserRecord], requester: Option<&str>) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = records
        .iter()
        .map(|record| LeaderboardEntry {
            username: record.username().to_string(),
            total_points: record.total_points(),
            completed_count: record.completed_count(),
            is_requester: requester == Some(record.username().as_str()),
        })
        .collect();

    entries.sort_by(|a, b| {
        b.total_points
            .cmp(&a.total_points)
            .then(b.completed_count.cmp(&a.completed_count))
    });
    entries
}

#[derive(Debug, Error)]
enum RowError {
    #[error("expected 4 fields, found {0}")]
    FieldCount(usize),
    #[error("invalid username: {0}")]
    Username(#[from] InvalidUsername),
    #[error("invalid progress: {0}")]
    Progress(#[from] InvalidProgress),
    #[error("invalid point total {0:?}")]
    Points(String),
    #[error("invalid timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),
}

fn parse_table(content: &str) -> Vec<UserRecord> {
    let mut lines = content
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    match lines.next() {
        None => return Vec::new(),
        Some((_, header)) if header == TABLE_HEADER => {}
        Some((_, header)) => {
            tracing::error!("Unexpected progress table header {:?}, ignoring table", header);
            return Vec::new();
        }
    }

    let mut records: Vec<UserRecord> = Vec::new();
    for (line_no, line) in lines {
        match parse_row(line) {
            Ok(record) if records.iter().any(|r| r.username() == record.username()) => {
                tracing::warn!("Skipping duplicate player {} on line {}", record.username(), line_no);
            }
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!("Skipping malformed progress row on line {}: {}", line_no, e),
        }
    }
    records
}

fn parse_row(line: &str) -> Result<UserRecord, RowError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let [username, progress, points, last_update] = fields.as_slice() else {
        return Err(RowError::FieldCount(fields.len()));
    };

    let username = Username::parse(username)?;
    let progress: Progress = progress.parse()?;
    let stored_points: u32 = points
        .parse()
        .map_err(|_| RowError::Points(points.to_string()))?;
    let last_update = DateTime::parse_from_rfc3339(last_update)?.with_timezone(&Utc);

    let record = UserRecord::from_parts(username, progress, last_update);
    if record.total_points() != stored_points {
        tracing::warn!(
            "Player {} has {} points stored but {} earned, using {}",
            record.username(),
            stored_points,
            record.total_points(),
            record.total_points()
        );
    }
    Ok(record)
}

fn render_table(records: &[UserRecord]) -> String {
    let mut content = format!("{}\n", TABLE_HEADER);
    for record in records {
        content.push_str(&format!(
            "{},{},{},{}\n",
            record.username(),
            record.progress(),
            record.total_points(),
            record.last_update().to_rfc3339_opts(SecondsFormat::Millis, true)
        ));
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn fresh_store() -> (TempDir, ProgressStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ProgressStore::new(dir.path().join("data").join("progress.csv"));
        store.initialize().await.unwrap();
        (dir, store)
    }

    fn name(raw: &str) -> Username {
        Username::parse(raw).unwrap()
    }

    fn record(raw_name: &str, progress: &str) -> UserRecord {
        UserRecord::from_parts(name(raw_name), progress.parse().unwrap(), Utc::now())
    }

    #[tokio::test]
    async fn test_initialize_creates_table_once() {
        let (_dir, store) = fresh_store().await;
        let content = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(content, "username,progress,totalPoints,lastUpdate\n");

        store.create(&name("alice")).await.unwrap();
        store.initialize().await.unwrap();
        assert!(store.exists("alice").await);
    }

    #[tokio::test]
    async fn test_create_then_find_is_zeroed() {
        let (_dir, store) = fresh_store().await;
        let outcome = store.create(&name("alice")).await.unwrap();
        assert!(matches!(outcome, CreateOutcome::Created(_)));

        let found = store.find_by_username("alice").await.unwrap();
        assert_eq!(found.progress().to_string(), "00000000");
        assert_eq!(found.total_points(), 0);
        assert!(store.exists("alice").await);
        assert!(!store.exists("Alice").await);
    }

    #[tokio::test]
    async fn test_duplicate_registration_is_rejected() {
        let (_dir, store) = fresh_store().await;
        store.create(&name("alice")).await.unwrap();
        store.set_challenge_complete("alice", 0).await.unwrap();
        let before = store.load_all().await;

        let outcome = store.create(&name("alice")).await.unwrap();
        assert_eq!(outcome, CreateOutcome::AlreadyExists);
        assert_eq!(store.load_all().await, before);
    }

    #[tokio::test]
    async fn test_completion_is_idempotent() {
        let (_dir, store) = fresh_store().await;
        store.create(&name("alice")).await.unwrap();

        let first = store.set_challenge_complete("alice", 2).await.unwrap();
        let CompletionOutcome::Completed(after_first) = first else {
            panic!("expected completion, got {:?}", first);
        };
        let content_after_first = std::fs::read_to_string(store.path()).unwrap();

        let second = store.set_challenge_complete("alice", 2).await.unwrap();
        assert_eq!(second, CompletionOutcome::AlreadyComplete(after_first.clone()));
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), content_after_first);
        assert_eq!(store.find_by_username("alice").await.unwrap(), after_first);
    }

    #[tokio::test]
    async fn test_completion_for_unknown_player_or_challenge() {
        let (_dir, store) = fresh_store().await;
        assert_eq!(
            store.set_challenge_complete("ghost", 1).await.unwrap(),
            CompletionOutcome::NotFound
        );
        assert!(store.load_all().await.is_empty());

        store.create(&name("alice")).await.unwrap();
        assert!(matches!(
            store.set_challenge_complete("alice", 8).await,
            Err(StoreError::UnknownChallenge(8))
        ));
    }

    #[tokio::test]
    async fn test_points_track_bits_across_sequences() {
        let (_dir, store) = fresh_store().await;
        store.create(&name("carol")).await.unwrap();

        for index in [4, 1, 4, 7, 0, 1, 3, 7] {
            store.set_challenge_complete("carol", index).await.unwrap();
            let record = store.find_by_username("carol").await.unwrap();
            assert_eq!(
                record.total_points(),
                100 * record.progress().completed_count() as u32
            );
        }
        let record = store.find_by_username("carol").await.unwrap();
        assert_eq!(record.progress().to_string(), "11011001");
        assert_eq!(record.total_points(), 500);
    }

    #[tokio::test]
    async fn test_alice_and_bob_scenario() {
        let (_dir, store) = fresh_store().await;

        store.create(&name("alice")).await.unwrap();
        let alice = store.find_by_username("alice").await.unwrap();
        assert_eq!(alice.progress().to_string(), "00000000");
        assert_eq!(alice.total_points(), 0);

        store.set_challenge_complete("alice", 2).await.unwrap();
        let alice = store.find_by_username("alice").await.unwrap();
        assert_eq!(alice.progress().to_string(), "00100000");
        assert_eq!(alice.total_points(), 100);

        let again = store.set_challenge_complete("alice", 2).await.unwrap();
        assert!(matches!(again, CompletionOutcome::AlreadyComplete(_)));
        assert_eq!(store.find_by_username("alice").await.unwrap(), alice);

        store.create(&name("bob")).await.unwrap();
        store.set_challenge_complete("bob", 0).await.unwrap();
        store.set_challenge_complete("bob", 1).await.unwrap();
        assert_eq!(store.find_by_username("bob").await.unwrap().total_points(), 200);

        let board = store.leaderboard(Some("alice")).await;
        let summary: Vec<(&str, u32, usize, bool)> = board
            .iter()
            .map(|e| (e.username.as_str(), e.total_points, e.completed_count, e.is_requester))
            .collect();
        assert_eq!(summary, vec![("bob", 200, 2, false), ("alice", 100, 1, true)]);
    }

    #[test]
    fn test_rank_orders_and_keeps_ties_stable() {
        let records = vec![
            record("zed", "00000000"),
            record("amy", "10000000"),
            record("kim", "11000000"),
            record("lee", "00010000"),
            record("max", "00000000"),
        ];
        let board = rank(&records, None);
        let names: Vec<&str> = board.iter().map(|e| e.username.as_str()).collect();
        assert_eq!(names, vec!["kim", "amy", "lee", "zed", "max"]);

        for pair in board.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(
                a.total_points > b.total_points
                    || (a.total_points == b.total_points && a.completed_count >= b.completed_count)
            );
        }
        assert!(board.iter().all(|e| !e.is_requester));
    }

    #[tokio::test]
    async fn test_save_then_load_round_trips() {
        let (_dir, store) = fresh_store().await;
        let records = vec![
            record("alice", "00100000"),
            record("bob", "11000000"),
            record("c-3_po", "11111111"),
        ];
        store.save_all(&records).await.unwrap();
        assert_eq!(store.load_all().await, records);
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn test_malformed_rows_are_skipped() {
        let (_dir, store) = fresh_store().await;
        let table = "\
username,progress,totalPoints,lastUpdate
alice,00100000,100,2024-05-01T10:00:00.000Z
truncated,0010
missingfield,00000000,0
bad name!,00000000,0,2024-05-01T10:00:00.000Z
bits,0020000,0,2024-05-01T10:00:00.000Z
points,00000000,lots,2024-05-01T10:00:00.000Z
when,00000000,0,yesterday

bob,11000000,200,2024-05-02T08:30:00.123Z
alice,11111111,800,2024-05-03T00:00:00.000Z
";
        std::fs::write(store.path(), table).unwrap();

        let records = store.load_all().await;
        let names: Vec<&str> = records.iter().map(|r| r.username().as_str()).collect();
        assert_eq!(names, vec!["alice", "bob"]);
        assert_eq!(records[0].total_points(), 100);
        assert_eq!(records[1].progress().to_string(), "11000000");
    }

    #[tokio::test]
    async fn test_legacy_rows_and_wrong_totals_are_normalized() {
        let (_dir, store) = fresh_store().await;
        let table = "\
username,progress,totalPoints,lastUpdate
old,1010000000,200,2023-11-20T09:15:42.512Z
liar,10000000,900,2023-11-20T09:15:42.512Z
";
        std::fs::write(store.path(), table).unwrap();

        let old = store.find_by_username("old").await.unwrap();
        assert_eq!(old.progress().to_string(), "10100000");
        assert_eq!(old.total_points(), 200);
        let liar = store.find_by_username("liar").await.unwrap();
        assert_eq!(liar.total_points(), 100);

        // The next write stores the narrowed form
        store.set_challenge_complete("old", 7).await.unwrap();
        let content = std::fs::read_to_string(store.path()).unwrap();
        assert!(content.contains("\nold,10100001,300,"));
    }

    #[tokio::test]
    async fn test_missing_or_foreign_table_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProgressStore::new(dir.path().join("nope.csv"));
        assert!(store.load_all().await.is_empty());
        assert!(store.leaderboard(None).await.is_empty());

        std::fs::write(store.path(), "name;score\nalice;100\n").unwrap();
        assert!(store.load_all().await.is_empty());
        assert!(!store.exists("alice").await);
    }

    #[tokio::test]
    async fn test_write_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProgressStore::new(dir.path().join("missing-dir").join("progress.csv"));

        let result = store.create(&name("alice")).await;
        assert!(matches!(result, Err(StoreError::Io(_))));
        assert!(!store.exists("alice").await);
    }

    #[tokio::test]
    async fn test_unsynchronized_rewrites_lose_updates() {
        // Two writers that both read before either writes: the later full
        // rewrite wins and the earlier change is gone.
        let (_dir, store) = fresh_store().await;
        store.create(&name("alice")).await.unwrap();
        store.create(&name("bob")).await.unwrap();

        let mut first = store.load_all().await;
        let mut second = store.load_all().await;

        first[0].complete(ChallengeId::new(1).unwrap(), Utc::now());
        store.save_all(&first).await.unwrap();
        second[1].complete(ChallengeId::new(2).unwrap(), Utc::now());
        store.save_all(&second).await.unwrap();

        let alice = store.find_by_username("alice").await.unwrap();
        let bob = store.find_by_username("bob").await.unwrap();
        assert_eq!(alice.total_points(), 0);
        assert_eq!(bob.total_points(), 100);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_mutations_through_store_are_kept() {
        let (_dir, store) = fresh_store().await;

        let mut handles = Vec::new();
        for i in 0..12 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.create(&name(&format!("player{:02}", i))).await.unwrap()
            }));
        }
        for handle in handles {
            assert!(matches!(handle.await.unwrap(), CreateOutcome::Created(_)));
        }
        assert_eq!(store.load_all().await.len(), 12);

        let mut handles = Vec::new();
        for index in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.set_challenge_complete("player00", index).await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        let record = store.find_by_username("player00").await.unwrap();
        assert_eq!(record.progress().to_string(), "11111111");
        assert_eq!(record.total_points(), 800);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_same_name_registers_once() {
        let (_dir, store) = fresh_store().await;

        let mut handles = Vec::new();
        for _ in 0..6 {
            let store = store.clone();
            handles.push(tokio::spawn(async move { store.create(&name("dupe")).await.unwrap() }));
        }
        let mut created = 0;
        for handle in handles {
            if let CreateOutcome::Created(_) = handle.await.unwrap() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(store.load_all().await.len(), 1);
    }
}

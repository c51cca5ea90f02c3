use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::Rng;
use crate::models::{ChallengeId, CHALLENGE_COUNT};

// Challenge 7's flag lives in the project's history, not in this process.
const GIT_HISTORY_FLAG_B64: &str = "Q1RGe2dpdF9zZWNyZXRzX2V4cG9zZWRfaW5faGlzdG9yeX0=";

#[derive(Debug, thiserror::Error)]
pub enum FlagError {
    #[error("embedded flag is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("embedded flag is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// The secret flag of every challenge for the current process.
///
/// Built once at startup and never persisted; a restart invalidates every
/// flag that embeds the session id.
#[derive(Debug, Clone)]
pub struct FlagBook {
    session_id: String,
    flags: [String; CHALLENGE_COUNT],
}

impl FlagBook {
    /// Draws a fresh 8-byte session id.
    pub fn generate() -> Result<Self, FlagError> {
        let bytes: [u8; 8] = rand::thread_rng().gen();
        let session_id = bytes.iter().map(|b| format!("{:02x}", b)).collect::<String>();
        Self::with_session_id(session_id)
    }

    pub fn with_session_id(session_id: impl Into<String>) -> Result<Self, FlagError> {
        let session_id = session_id.into();
        let session_flags = [
            (ChallengeId::IDOR, "idor_access"),
            (ChallengeId::PATH_TRAVERSAL, "directory_traversal"),
            (ChallengeId::SQL_AUTH_BYPASS, "sql_auth_bypass"),
            (ChallengeId::SQL_DATA_EXTRACT, "sql_data_extract"),
            (ChallengeId::BROKEN_AUTH, "broken_auth"),
            (ChallengeId::XSS, "xss_exploit"),
            (ChallengeId::INFO_DISCLOSURE, "info_disclosure"),
        ];

        let mut flags: [String; CHALLENGE_COUNT] = Default::default();
        for (challenge, name) in session_flags {
            flags[challenge.index()] = format!("CTF{{{}_{}}}", name, session_id);
        }
        flags[ChallengeId::GIT_SECRETS.index()] =
            String::from_utf8(STANDARD.decode(GIT_HISTORY_FLAG_B64)?)?;
        Ok(Self { session_id, flags })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn flag(&self, challenge: ChallengeId) -> &str {
        &self.flags[challenge.index()]
    }

    /// Challenge whose flag equals `submitted`, ignoring surrounding whitespace.
    pub fn lookup(&self, submitted: &str) -> Option<ChallengeId> {
        let submitted = submitted.trim();
        self.flags
            .iter()
            .position(|flag| flag == submitted)
            .and_then(ChallengeId::from_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(number: u8) -> ChallengeId {
        ChallengeId::new(number).unwrap()
    }

    #[test]
    fn test_flags_embed_session_id() {
        let book = FlagBook::with_session_id("0123456789abcdef").unwrap();
        assert_eq!(book.flag(id(1)), "CTF{idor_access_0123456789abcdef}");
        assert_eq!(book.flag(id(4)), "CTF{sql_data_extract_0123456789abcdef}");
        assert_eq!(book.flag(ChallengeId::GIT_SECRETS), "CTF{git_secrets_exposed_in_history}");
        assert_eq!(book.flag(id(8)), "CTF{info_disclosure_0123456789abcdef}");
    }

    #[test]
    fn test_lookup_is_exact() {
        let book = FlagBook::with_session_id("feedface00000000").unwrap();
        for challenge in ChallengeId::all() {
            assert_eq!(book.lookup(book.flag(challenge)), Some(challenge));
        }
        assert_eq!(book.lookup("  CTF{xss_exploit_feedface00000000}\n"), Some(id(6)));
        assert_eq!(book.lookup("CTF{xss_exploit_}"), None);
        assert_eq!(book.lookup("ctf{git_secrets_exposed_in_history}"), None);
        assert_eq!(book.lookup(""), None);
    }

    #[test]
    fn test_every_flag_is_distinct_and_filled() {
        let book = FlagBook::with_session_id("0123456789abcdef").unwrap();
        let mut seen: Vec<&str> = ChallengeId::all().map(|c| book.flag(c)).collect();
        assert!(seen.iter().all(|f| f.starts_with("CTF{") && f.ends_with('}')));
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), CHALLENGE_COUNT);
        assert_eq!(book.lookup("CTF{git_secrets_exposed_in_history}"), Some(ChallengeId::GIT_SECRETS));
    }

    #[test]
    fn test_generated_sessions_differ() {
        let a = FlagBook::generate().unwrap();
        let b = FlagBook::generate().unwrap();
        assert_eq!(a.session_id().len(), 16);
        assert!(a.session_id().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a.flag(id(1)), b.flag(id(1)));
        assert_eq!(a.flag(id(7)), b.flag(id(7)));
    }
}

use serde::Serialize;
use std::fmt;

/// Number of challenges tracked in a progress bit-string.
pub const CHALLENGE_COUNT: usize = 8;

/// Points awarded for each solved challenge.
pub const POINTS_PER_CHALLENGE: u32 = 100;

/// One-based challenge number. Only values `1..=CHALLENGE_COUNT` can be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ChallengeId(u8);

impl ChallengeId {
    pub const IDOR: Self = Self(1);
    pub const PATH_TRAVERSAL: Self = Self(2);
    pub const SQL_AUTH_BYPASS: Self = Self(3);
    pub const SQL_DATA_EXTRACT: Self = Self(4);
    pub const BROKEN_AUTH: Self = Self(5);
    pub const XSS: Self = Self(6);
    pub const GIT_SECRETS: Self = Self(7);
    pub const INFO_DISCLOSURE: Self = Self(8);

    pub fn new(number: u8) -> Option<Self> {
        if number >= 1 && usize::from(number) <= CHALLENGE_COUNT {
            Some(Self(number))
        } else {
            None
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        u8::try_from(index + 1).ok().and_then(Self::new)
    }

    pub fn number(self) -> u8 {
        self.0
    }

    /// Bit position in the progress string.
    pub fn index(self) -> usize {
        usize::from(self.0) - 1
    }

    pub fn all() -> impl Iterator<Item = ChallengeId> {
        (0..CHALLENGE_COUNT).filter_map(ChallengeId::from_index)
    }

    pub fn info(self) -> &'static Challenge {
        &CHALLENGES[self.index()]
    }
}

impl fmt::Display for ChallengeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Serialize)]
pub struct Challenge {
    pub number: u8,
    pub name: &'static str,
    pub route: &'static str,
    pub summary: &'static str,
}

pub static CHALLENGES: [Challenge; CHALLENGE_COUNT] = [
    Challenge {
        number: 1,
        name: "Insecure Direct Object Reference",
        route: "/challenge1",
        summary: "Documents are fetched by id. Are they all meant for you?",
    },
    Challenge {
        number: 2,
        name: "Path Traversal",
        route: "/challenge2",
        summary: "A few directories are linked. Others are not.",
    },
    Challenge {
        number: 3,
        name: "SQL Injection",
        route: "/challenge3",
        summary: "Log in without knowing the password.",
    },
    Challenge {
        number: 4,
        name: "Advanced SQL Injection",
        route: "/challenge4",
        summary: "The user search reads from more than one table.",
    },
    Challenge {
        number: 5,
        name: "Broken Authentication",
        route: "/challenge5",
        summary: "The login form says more than it should.",
    },
    Challenge {
        number: 6,
        name: "Cross-Site Scripting",
        route: "/challenge6",
        summary: "Comments are displayed exactly as written.",
    },
    Challenge {
        number: 7,
        name: "Git Secrets & Version Control Security",
        route: "/challenge7",
        summary: "Deleted is not the same as gone.",
    },
    Challenge {
        number: 8,
        name: "Information Disclosure",
        route: "/challenge8",
        summary: "Crawlers are told where not to look.",
    },
];

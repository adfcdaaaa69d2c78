//! Event Document Keys
//!
//! The backend keys the playback-state document by the event's document id.
//! Ids are validated here so a malformed id fails fast instead of turning
//! into a 404 on every poll.

use std::fmt;

/// Maximum id length accepted by the document backend
const MAX_LENGTH: usize = 36;

/// Length of locally minted ids (dev tooling and tests)
const GENERATED_LENGTH: usize = 20;

/// Characters used when minting ids locally
const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// A validated backend document id identifying one event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventId(String);

impl EventId {
    /// Parse an id from surrounding application input.
    ///
    /// Accepts 1-36 characters of ASCII alphanumerics, `_` and `-`, matching
    /// what the backend accepts for document ids. Leading/trailing whitespace
    /// is trimmed; anything else is rejected.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();

        if trimmed.is_empty() || trimmed.len() > MAX_LENGTH {
            return None;
        }

        if trimmed
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        {
            Some(EventId(trimmed.to_string()))
        } else {
            None
        }
    }

    /// Mint a random id, for dev tooling and tests.
    pub fn random() -> Self {
        use rand::Rng;
        let mut rng = rand::thread_rng();

        let mut id = String::with_capacity(GENERATED_LENGTH);
        for _ in 0..GENERATED_LENGTH {
            let idx = rng.gen_range(0..ALPHABET.len());
            id.push(ALPHABET[idx] as char);
        }
        EventId(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

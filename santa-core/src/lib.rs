//! Secret santa draw: who gifts whom, who has already looked, and how the
//! roster survives restarts.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod assignment;
pub mod directory;
pub mod exchange;
pub mod gateway;
pub mod store;

pub use assignment::{
    generate, is_derangement, issue_access_key, issue_token, run_seed, seeded_rng, DEFAULT_SEED,
};
pub use directory::ParticipantDirectory;
pub use exchange::Exchange;
pub use gateway::{AccessGateway, Reveal, VerifiedParticipant};
pub use store::{PersistentStore, StorageRecord, StoreError, CURRENT_FORMAT_VERSION};

pub type Token = u64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    pub name: String,
    /// Index into the roster of the person this participant gifts.
    /// `None` until the first assignment pass.
    pub recipient_index: Option<usize>,
    pub wishlist: String,
    pub has_picked: bool,
    pub token: Token,
}

impl Participant {
    pub fn new(name: impl Into<String>, token: Token) -> Self {
        Self {
            name: name.into(),
            recipient_index: None,
            wishlist: String::new(),
            has_picked: false,
            token,
        }
    }
}

impl std::fmt::Display for Participant {
    /// Log-safe form: only the leading digits of the token are shown.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let digits = self.token.to_string();
        let shown = digits.get(..6).unwrap_or(&digits);
        write!(f, "{}_{}({})", self.name, shown, self.has_picked)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SantaError {
    #[error("no such person")]
    NotFound,
    #[error("invalid token")]
    InvalidToken,
    #[error("person already picked")]
    AlreadyRevealed,
    #[error("recipients have not been drawn yet")]
    NotAssigned,
    #[error("name taken")]
    NameTaken,
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

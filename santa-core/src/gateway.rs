//! Token check in front of every participant-facing read or write.
//!
//! A caller starts `UNVERIFIED` with a name and a presented token.
//! [`AccessGateway::verify`] is the only way to obtain a
//! [`VerifiedParticipant`], and only a verified participant can reveal,
//! read the recipient's wishlist, or edit their own.
//!
//! Tokens are compared as exact decimal strings, so `"0042"` does not match
//! `42`. There is no throttling on failed attempts.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::directory::ParticipantDirectory;
use crate::{SantaError, Token};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reveal {
    pub own_token: Token,
    pub own_wishlist: String,
    pub recipient_name: String,
    pub recipient_wishlist: String,
}

pub struct AccessGateway<'a> {
    directory: &'a mut ParticipantDirectory,
}

impl<'a> AccessGateway<'a> {
    pub fn new(directory: &'a mut ParticipantDirectory) -> Self {
        Self { directory }
    }

    pub fn verify(self, name: &str, token: &str) -> Result<VerifiedParticipant<'a>, SantaError> {
        let index = self.directory.position(name)?;
        if self.directory.get(index).token.to_string() != token {
            warn!(name, "token mismatch");
            return Err(SantaError::InvalidToken);
        }
        Ok(VerifiedParticipant {
            directory: self.directory,
            index,
        })
    }
}

/// A participant whose token has been checked. Holds the directory borrow,
/// so the index cannot go stale while this value lives.
pub struct VerifiedParticipant<'a> {
    directory: &'a mut ParticipantDirectory,
    index: usize,
}

impl VerifiedParticipant<'_> {
    pub fn name(&self) -> &str {
        &self.directory.get(self.index).name
    }

    /// First and only look at the recipient. A second call is an error, not
    /// a replay of the first answer.
    pub fn reveal(&mut self) -> Result<Reveal, SantaError> {
        if self.directory.get(self.index).has_picked {
            return Err(SantaError::AlreadyRevealed);
        }
        let recipient = self.directory.recipient_index_of(self.index)?;
        let recipient = self.directory.get(recipient);
        let recipient_name = recipient.name.clone();
        let recipient_wishlist = recipient.wishlist.clone();

        let me = self.directory.get_mut(self.index);
        me.has_picked = true;
        info!(name = %me.name, "revealed recipient");
        Ok(Reveal {
            own_token: me.token,
            own_wishlist: me.wishlist.clone(),
            recipient_name,
            recipient_wishlist,
        })
    }

    pub fn recipient_wishlist(&self) -> Result<String, SantaError> {
        let recipient = self.directory.recipient_index_of(self.index)?;
        Ok(self.directory.get(recipient).wishlist.clone())
    }

    /// Editing a wishlist counts as taking part, so it also marks the
    /// participant as picked.
    pub fn update_own_wishlist(&mut self, text: impl Into<String>) {
        let me = self.directory.get_mut(self.index);
        me.wishlist = text.into();
        me.has_picked = true;
        info!(name = %me.name, "updated wishlist");
    }
}

use rand::Rng;
use tracing::info;

use crate::assignment::issue_access_key;
use crate::directory::ParticipantDirectory;
use crate::store::{StorageRecord, StoreError};
use crate::SantaError;

/// Everything a running exchange holds in memory, always at the current
/// storage format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub directory: ParticipantDirectory,
    pub shared_access_key: u64,
}

impl Exchange {
    pub fn fresh<R, S>(names: &[S], rng: &mut R) -> Result<Self, SantaError>
    where
        R: Rng + ?Sized,
        S: AsRef<str>,
    {
        info!(people = names.len(), "initializing people");
        let directory = ParticipantDirectory::fresh(names, rng)?;
        Ok(Self {
            directory,
            shared_access_key: issue_access_key(rng),
        })
    }

    /// Brings a stored record up to the current format. Records written
    /// before the access key existed get a new one. A roster that decodes
    /// but does not hang together is refused.
    pub fn restore<R: Rng + ?Sized>(
        record: StorageRecord,
        rng: &mut R,
    ) -> Result<Self, StoreError> {
        let (roster, shared_access_key) = match record {
            StorageRecord::V1 { roster } => {
                info!("record predates the access key, generating one");
                (roster, issue_access_key(rng))
            }
            StorageRecord::V2 {
                shared_access_key,
                roster,
            } => (roster, shared_access_key),
        };
        let directory = ParticipantDirectory::from_stored(roster)
            .map_err(|reason| StoreError::Decode(format!("inconsistent roster: {reason}")))?;
        Ok(Self {
            directory,
            shared_access_key,
        })
    }

    pub fn to_record(&self) -> StorageRecord {
        StorageRecord::V2 {
            shared_access_key: self.shared_access_key,
            roster: self.directory.participants().to_vec(),
        }
    }

    /// New tokens for everyone plus a new access key, so clients holding
    /// the old key drop their cached reveal.
    pub fn reset_tokens<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.directory.reset_tokens(rng);
        self.shared_access_key = issue_access_key(rng);
        info!("reset tokens");
    }

    pub fn set_access_key(&mut self, key: u64) {
        self.shared_access_key = key;
    }
}

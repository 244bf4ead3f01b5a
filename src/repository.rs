//! Profile repository
//!
//! Domain operations over a [`RecordStore`]. The repository treats the CPF as
//! an opaque key; format validation is the caller's concern. Store failures
//! are returned wrapped with the operation name and are never retried here.

use crate::error::{RepositoryError, Result};
use crate::profile::{Profile, PERSONAL_ATTRS};
use crate::store::{RecordStore, Removal};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a point lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(Profile),
    NotFound,
}

impl Lookup {
    pub fn into_profile(self) -> Option<Profile> {
        match self {
            Lookup::Found(profile) => Some(profile),
            Lookup::NotFound => None,
        }
    }
}

/// Result of a redaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redaction {
    /// Personal attributes removed; the record and its key remain
    Redacted,
    /// No record exists for the CPF and none was created
    NotFound,
}

#[derive(Clone)]
pub struct ProfileRepository {
    store: Arc<dyn RecordStore>,
}

impl ProfileRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Reads the profile stored under `cpf`
    pub async fn lookup(&self, cpf: &str) -> Result<Lookup> {
        ensure_key(cpf)?;
        debug!(cpf = %cpf, "Looking up profile");

        let item = self
            .store
            .get(cpf)
            .await
            .map_err(RepositoryError::store("lookup"))?;

        match item {
            Some(item) => {
                let profile = Profile::from_item(item).map_err(RepositoryError::store("lookup"))?;
                Ok(Lookup::Found(profile))
            }
            None => Ok(Lookup::NotFound),
        }
    }

    /// Writes `profile` as a full replacement of any existing record.
    ///
    /// This is not a merge: attributes stored earlier but absent from
    /// `profile` are dropped. Use [`ProfileRepository::merge`] to patch.
    pub async fn upsert(&self, profile: &Profile) -> Result<()> {
        ensure_key(&profile.cpf)?;
        info!(cpf = %profile.cpf, "Upserting profile");

        self.store
            .put(&profile.cpf, profile.to_item())
            .await
            .map_err(RepositoryError::store("upsert"))
    }

    /// Sets only the attributes present in `profile`, creating the record if needed
    pub async fn merge(&self, profile: &Profile) -> Result<()> {
        ensure_key(&profile.cpf)?;
        info!(cpf = %profile.cpf, "Merging profile attributes");

        self.store
            .set_attributes(&profile.cpf, profile.attributes())
            .await
            .map_err(RepositoryError::store("merge"))
    }

    /// Removes the personal attributes, keeping the key and the record
    pub async fn redact(&self, cpf: &str) -> Result<Redaction> {
        ensure_key(cpf)?;
        info!(cpf = %cpf, "Redacting profile");

        let removal = self
            .store
            .remove_attributes(cpf, &PERSONAL_ATTRS)
            .await
            .map_err(RepositoryError::store("redact"))?;

        match removal {
            Removal::Applied => Ok(Redaction::Redacted),
            Removal::Missing => {
                warn!(cpf = %cpf, "Redaction requested for unregistered cpf");
                Ok(Redaction::NotFound)
            }
        }
    }
}

fn ensure_key(cpf: &str) -> Result<()> {
    if cpf.is_empty() {
        return Err(RepositoryError::EmptyKey);
    }
    Ok(())
}

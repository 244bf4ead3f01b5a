//! Authorization by CPF
//!
//! A CPF is authorized when a record exists for it, whatever its contents:
//! a redacted record still attests that the person was registered. A store
//! failure produces no decision at all.

use crate::error::Result;
use crate::profile::Profile;
use crate::repository::{Lookup, ProfileRepository, Redaction};
use serde::{Deserialize, Serialize};
use tracing::info;

pub const AUTHORIZED_MESSAGE: &str = "user authorized";
pub const UNAUTHORIZED_MESSAGE: &str = "user unauthorized";

/// Authorization decision returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationResult {
    pub authorized: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
}

impl AuthorizationResult {
    pub fn granted(profile: Profile) -> Self {
        Self {
            authorized: true,
            message: AUTHORIZED_MESSAGE.to_string(),
            profile: Some(profile),
        }
    }

    pub fn denied() -> Self {
        Self {
            authorized: false,
            message: UNAUTHORIZED_MESSAGE.to_string(),
            profile: None,
        }
    }
}

/// Facade used by the HTTP adapter
#[derive(Clone)]
pub struct AuthorizationService {
    repository: ProfileRepository,
}

impl AuthorizationService {
    pub fn new(repository: ProfileRepository) -> Self {
        Self { repository }
    }

    /// Decides whether `cpf` is authorized
    pub async fn authorize(&self, cpf: &str) -> Result<AuthorizationResult> {
        match self.repository.lookup(cpf).await? {
            Lookup::Found(profile) => {
                info!(cpf = %cpf, "User authorized");
                Ok(AuthorizationResult::granted(profile))
            }
            Lookup::NotFound => {
                info!(cpf = %cpf, "User unauthorized");
                Ok(AuthorizationResult::denied())
            }
        }
    }

    /// Registers `profile`, replacing any existing record in full
    pub async fn create_or_replace(&self, profile: &Profile) -> Result<()> {
        self.repository.upsert(profile).await
    }

    /// Patches the attributes present in `profile`
    pub async fn update(&self, profile: &Profile) -> Result<()> {
        self.repository.merge(profile).await
    }

    pub async fn redact(&self, cpf: &str) -> Result<Redaction> {
        self.repository.redact(cpf).await
    }
}

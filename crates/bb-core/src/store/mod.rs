//! Credential persistence: the only state that survives across events.

use async_trait::async_trait;

use crate::{
    domain::{Credentials, UserId},
    Result,
};

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Port for the user id -> credential pair mapping.
///
/// Implementations must be safe under concurrent independent calls; the
/// orchestrator adds no locking of its own.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// `Ok(None)` when the user never logged in.
    async fn retrieve(&self, user: UserId) -> Result<Option<Credentials>>;

    async fn save(&self, user: UserId, creds: &Credentials) -> Result<()>;
}

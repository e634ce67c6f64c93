use async_trait::async_trait;

use crate::{
    domain::{CardRecord, Credentials},
    Result,
};

/// Port for the remote card account service.
///
/// Implementations report a rejected pair as `Error::Validation` and a failed
/// balance lookup as `Error::Remote`; the orchestrator shows both to the user.
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Check the pair against the service (and open a session for it).
    async fn validate_and_link(&self, creds: &Credentials) -> Result<()>;

    /// All cards for the pair, in the order the service lists them.
    async fn fetch_balances(&self, creds: &Credentials) -> Result<Vec<CardRecord>>;
}

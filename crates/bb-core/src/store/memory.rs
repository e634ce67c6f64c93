use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    domain::{Credentials, UserId},
    store::CredentialStore,
    Result,
};

/// Process-local store. Forgets everything on restart.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<UserId, Credentials>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn retrieve(&self, user: UserId) -> Result<Option<Credentials>> {
        Ok(self.inner.lock().await.get(&user).cloned())
    }

    async fn save(&self, user: UserId, creds: &Credentials) -> Result<()> {
        self.inner.lock().await.insert(user, creds.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_overwrites_previous_pair() {
        let store = MemoryStore::new();
        assert!(store.retrieve(UserId(1)).await.unwrap().is_none());

        store
            .save(UserId(1), &Credentials::new("a", "1"))
            .await
            .unwrap();
        store
            .save(UserId(1), &Credentials::new("b", "2"))
            .await
            .unwrap();

        assert_eq!(
            store.retrieve(UserId(1)).await.unwrap(),
            Some(Credentials::new("b", "2"))
        );
        assert!(store.retrieve(UserId(2)).await.unwrap().is_none());
    }
}

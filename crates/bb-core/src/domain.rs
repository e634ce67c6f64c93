use serde::{Deserialize, Serialize};

/// Telegram user id (numeric). The only key into the credential store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a sent message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// Identifier + secret pair required by the card account service.
///
/// A stored pair has always been accepted by `AccountService::validate_and_link` first.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub identifier: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }

    /// Both halves present. Stores may hand back blank pairs; those count as "not logged in".
    pub fn is_complete(&self) -> bool {
        !self.identifier.is_empty() && !self.secret.is_empty()
    }
}

// Keep secrets out of `{:?}` in logs and panics.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"***")
            .finish()
    }
}

/// One balance-bearing card as returned by the account service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CardRecord {
    pub number: String,
    pub balance: String,
}

impl CardRecord {
    pub fn new(number: impl Into<String>, balance: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            balance: balance.into(),
        }
    }
}

/// An inbound chat event, consumed once by the dispatch loop.
#[derive(Clone, Debug)]
pub struct InboundEvent {
    pub chat_id: ChatId,
    pub user_id: UserId,
    /// Sender label for logs (Telegram username, if any).
    pub username: Option<String>,
    /// `None` for updates without a text payload; those are discarded.
    pub text: Option<String>,
}

impl InboundEvent {
    pub fn from_label(&self) -> &str {
        self.username.as_deref().unwrap_or("unknown")
    }
}

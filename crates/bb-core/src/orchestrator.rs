//! Dispatch loop and the login / balance flows.
//!
//! One loop consumes inbound events in arrival order. `/login` runs inline so
//! its store write has committed (or failed) before the next event is looked
//! at; `/balance` is handed to [`BalanceWorkers`] and may finish out of order.
//!
//! Precondition: the producer feeding the channel preserves per-sender order.
//! Given that, a `/balance` sent after `/login` by the same user always reads
//! the outcome of that login.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::{
    account::AccountService,
    command::{classify, Command, UsageError},
    domain::{Credentials, InboundEvent},
    messages,
    messaging::outbox::Outbox,
    store::CredentialStore,
    workers::BalanceWorkers,
};

/// Collaborators the flows need. Cheap to clone into balance tasks.
#[derive(Clone)]
pub struct Deps {
    pub store: Arc<dyn CredentialStore>,
    pub accounts: Arc<dyn AccountService>,
    pub outbox: Outbox,
}

pub struct Orchestrator {
    deps: Deps,
    workers: BalanceWorkers,
}

impl Orchestrator {
    pub fn new(deps: Deps, balance_workers: usize) -> Self {
        Self {
            deps,
            workers: BalanceWorkers::new(balance_workers),
        }
    }

    /// Consume events until the sender side closes, then wait for in-flight balance tasks.
    pub async fn run(mut self, mut events: mpsc::Receiver<InboundEvent>) {
        tracing::info!("dispatch loop started");
        while let Some(event) = events.recv().await {
            self.dispatch(event).await;
        }
        tracing::info!(
            in_flight = self.workers.in_flight(),
            "event stream closed, draining balance tasks"
        );
        self.workers.drain().await;
        self.deps.outbox.flush().await;
        tracing::info!("dispatch loop stopped");
    }

    /// Handle a single event. Returns once login work is done or balance work is scheduled.
    ///
    /// Replies are only queued on the outbox; delivery (and any throttling) happens off the loop.
    pub async fn dispatch(&mut self, event: InboundEvent) {
        let command = match event.text.as_deref() {
            Some(text) if !text.trim().is_empty() => classify(text),
            _ => {
                tracing::debug!(
                    chat_id = event.chat_id.0,
                    user_id = event.user_id.0,
                    "skipping update without text"
                );
                return;
            }
        };

        tracing::info!(
            chat_id = event.chat_id.0,
            user_id = event.user_id.0,
            from = event.from_label(),
            "new message"
        );

        match command {
            Err(UsageError) => {
                tracing::info!(
                    chat_id = event.chat_id.0,
                    user_id = event.user_id.0,
                    from = event.from_label(),
                    "malformed /login, sending usage"
                );
                self.deps
                    .outbox
                    .post(event.chat_id, messages::LOGIN_USAGE)
                    .await;
            }
            Ok(Command::Login(creds)) => login(&self.deps, &event, creds).await,
            Ok(Command::Balance) => {
                let deps = self.deps.clone();
                self.workers
                    .spawn(async move { balance(&deps, &event).await })
                    .await;
            }
            Ok(Command::Unknown) => {
                tracing::info!(
                    chat_id = event.chat_id.0,
                    user_id = event.user_id.0,
                    from = event.from_label(),
                    text = event.text.as_deref().unwrap_or_default(),
                    "unknown command"
                );
                self.deps
                    .outbox
                    .post(event.chat_id, messages::UNKNOWN_COMMAND)
                    .await;
            }
        }
    }
}

async fn login(deps: &Deps, event: &InboundEvent, creds: Credentials) {
    if let Err(e) = deps.accounts.validate_and_link(&creds).await {
        tracing::error!(
            chat_id = event.chat_id.0,
            user_id = event.user_id.0,
            from = event.from_label(),
            error = %e,
            "login rejected by account service"
        );
        deps.outbox
            .post(event.chat_id, e.user_facing().to_string())
            .await;
        return;
    }

    // Validated but not saved is left as-is; the user retries /login.
    if let Err(e) = deps.store.save(event.user_id, &creds).await {
        tracing::error!(
            chat_id = event.chat_id.0,
            user_id = event.user_id.0,
            from = event.from_label(),
            error = %e,
            "failed to save credentials"
        );
        deps.outbox
            .post(event.chat_id, e.user_facing().to_string())
            .await;
        return;
    }

    tracing::info!(
        chat_id = event.chat_id.0,
        user_id = event.user_id.0,
        from = event.from_label(),
        "login success"
    );
    deps.outbox
        .post(event.chat_id, messages::LOGIN_SUCCESS)
        .await;
}

async fn balance(deps: &Deps, event: &InboundEvent) {
    let creds = match deps.store.retrieve(event.user_id).await {
        Ok(Some(c)) if c.is_complete() => c,
        Ok(_) => {
            tracing::info!(
                chat_id = event.chat_id.0,
                user_id = event.user_id.0,
                from = event.from_label(),
                "not logged in, telling user to do that"
            );
            deps.outbox
                .post(event.chat_id, messages::PLEASE_LOGIN)
                .await;
            return;
        }
        Err(e) => {
            // Same answer as "never logged in"; store detail stays in the log.
            tracing::error!(
                chat_id = event.chat_id.0,
                user_id = event.user_id.0,
                from = event.from_label(),
                error = %e,
                "failed to read credentials"
            );
            deps.outbox
                .post(event.chat_id, messages::PLEASE_LOGIN)
                .await;
            return;
        }
    };

    let cards = match deps.accounts.fetch_balances(&creds).await {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(
                chat_id = event.chat_id.0,
                user_id = event.user_id.0,
                from = event.from_label(),
                error = %e,
                "failed to fetch balances"
            );
            deps.outbox
                .post(event.chat_id, e.user_facing().to_string())
                .await;
            return;
        }
    };

    for card in &cards {
        tracing::info!(
            chat_id = event.chat_id.0,
            user_id = event.user_id.0,
            from = event.from_label(),
            card = %card.number,
            "got card balance"
        );
        deps.outbox
            .post(
                event.chat_id,
                messages::card_balance(&card.number, &card.balance),
            )
            .await;
    }
}

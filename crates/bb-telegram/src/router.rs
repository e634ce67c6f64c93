use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tokio::sync::mpsc;

use bb_core::{
    account::AccountService,
    config::Config,
    domain::{ChatId, InboundEvent, UserId},
    messaging::{
        outbox::Outbox,
        port::MessagingPort,
        throttled::{ThrottleConfig, ThrottledMessenger},
    },
    orchestrator::{Deps, Orchestrator},
    store::CredentialStore,
};

use crate::TelegramMessenger;

/// Poll Telegram until Ctrl-C, feeding every message to the core dispatch loop.
///
/// All updates share one distribution key, so teloxide hands them to
/// `forward_message` one at a time in arrival order. The channel therefore
/// preserves per-sender order, which the orchestrator relies on.
pub async fn run_polling(
    cfg: Arc<Config>,
    store: Arc<dyn CredentialStore>,
    accounts: Arc<dyn AccountService>,
) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    match bot.get_me().await {
        Ok(me) => tracing::info!(username = %me.username(), "authorized on account"),
        Err(e) => return Err(anyhow::anyhow!("telegram getMe failed: {e}")),
    }

    // Balance replies are one message per card; throttle so bursts don't hit 429s.
    // The Telegram adapter still retries once on RetryAfter.
    let raw_messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let messenger: Arc<dyn MessagingPort> = Arc::new(ThrottledMessenger::new(
        raw_messenger,
        ThrottleConfig {
            global_min_interval: cfg.throttle_global,
            per_chat_min_interval: cfg.throttle_per_chat,
        },
    ));

    let orchestrator = Orchestrator::new(
        Deps {
            store,
            accounts,
            outbox: Outbox::new(messenger),
        },
        cfg.balance_workers,
    );

    let (tx, rx) = mpsc::channel::<InboundEvent>(cfg.event_buffer);
    let dispatch_loop = tokio::spawn(orchestrator.run(rx));

    let handler = dptree::entry().branch(Update::filter_message().endpoint(forward_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![tx])
        .distribution_function(|_| Some(()))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    // The dispatcher (and with it the last sender) is gone; the loop drains and exits.
    tracing::info!("polling stopped");
    dispatch_loop
        .await
        .map_err(|e| anyhow::anyhow!("dispatch loop failed: {e}"))?;

    Ok(())
}

async fn forward_message(msg: Message, tx: mpsc::Sender<InboundEvent>) -> ResponseResult<()> {
    let Some(event) = to_event(&msg) else {
        return Ok(());
    };
    if tx.send(event).await.is_err() {
        tracing::warn!(chat_id = msg.chat.id.0, "dispatch loop is gone, dropping message");
    }
    Ok(())
}

fn to_event(msg: &Message) -> Option<InboundEvent> {
    let sender = msg.from().map(|u| (u.id.0, u.username.clone()));
    inbound_event(msg.chat.id.0, sender, msg.text())
}

/// Map the Telegram fields the core needs. Messages without a sender (channel
/// posts) have no user to key credentials by and are dropped.
fn inbound_event(
    chat_id: i64,
    sender: Option<(u64, Option<String>)>,
    text: Option<&str>,
) -> Option<InboundEvent> {
    let (user_id, username) = sender?;
    Some(InboundEvent {
        chat_id: ChatId(chat_id),
        user_id: UserId(user_id as i64),
        username,
        text: text.map(|s| s.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_id_is_the_credential_key() {
        // Group chat: chat id and sender id differ.
        let event = inbound_event(
            -100123,
            Some((42, Some("alice".to_string()))),
            Some("/balance"),
        )
        .unwrap();
        assert_eq!(event.user_id, UserId(42));
        assert_eq!(event.chat_id, ChatId(-100123));
        assert_eq!(event.from_label(), "alice");
        assert_eq!(event.text.as_deref(), Some("/balance"));
    }

    #[test]
    fn non_text_message_has_no_payload() {
        let event = inbound_event(7, Some((7, None)), None).unwrap();
        assert_eq!(event.text, None);
        assert_eq!(event.from_label(), "unknown");
    }

    #[test]
    fn message_without_sender_is_dropped() {
        assert!(inbound_event(-100123, None, Some("/login a b")).is_none());
    }
}

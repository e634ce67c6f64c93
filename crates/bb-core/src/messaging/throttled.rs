use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{
    domain::{ChatId, MessageRef},
    messaging::port::MessagingPort,
    Result,
};

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Minimum spacing between *any* two sends.
    pub global_min_interval: Duration,
    /// Minimum spacing between sends to the same chat (Telegram allows ~1/sec per chat).
    pub per_chat_min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            global_min_interval: Duration::from_millis(40),
            per_chat_min_interval: Duration::from_millis(1050),
        }
    }
}

/// Earliest instants the next send may go out, globally and per chat.
#[derive(Debug)]
struct Pacer {
    global_next: Instant,
    chat_next: HashMap<ChatId, Instant>,
}

impl Pacer {
    /// Book the chat's next slot and return how long to wait for it.
    ///
    /// Chats whose next slot is already in the past carry no constraint, so
    /// they are forgotten whenever a new chat is booked.
    fn book_chat(&mut self, interval: Duration, chat_id: ChatId, now: Instant) -> Duration {
        if !self.chat_next.contains_key(&chat_id) {
            self.chat_next.retain(|_, next| *next > now);
        }

        let slot = self
            .chat_next
            .get(&chat_id)
            .copied()
            .map_or(now, |ready| ready.max(now));
        self.chat_next.insert(chat_id, slot + interval);
        slot.saturating_duration_since(now)
    }

    /// Book the next global slot. Called once the chat slot has arrived, so a
    /// chat waiting far ahead never pushes the global slot out for others.
    fn book_global(&mut self, interval: Duration, now: Instant) -> Duration {
        let slot = self.global_next.max(now);
        self.global_next = slot + interval;
        slot.saturating_duration_since(now)
    }
}

/// MessagingPort decorator that spaces outbound sends.
///
/// A balance reply is one message per card, so a user with several cards
/// produces a burst; this paces it instead of tripping Telegram 429s. Only
/// the outbox lane for that chat waits; the sleep never happens on the
/// dispatch loop.
pub struct ThrottledMessenger {
    inner: Arc<dyn MessagingPort>,
    cfg: ThrottleConfig,
    pacer: Mutex<Pacer>,
}

impl ThrottledMessenger {
    pub fn new(inner: Arc<dyn MessagingPort>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            cfg,
            pacer: Mutex::new(Pacer {
                global_next: Instant::now(),
                chat_next: HashMap::new(),
            }),
        }
    }

    #[cfg(test)]
    async fn tracked_chats(&self) -> usize {
        self.pacer.lock().await.chat_next.len()
    }
}

#[async_trait::async_trait]
impl MessagingPort for ThrottledMessenger {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        let chat_wait = self.pacer.lock().await.book_chat(
            self.cfg.per_chat_min_interval,
            chat_id,
            Instant::now(),
        );
        if !chat_wait.is_zero() {
            sleep(chat_wait).await;
        }

        let global_wait = self
            .pacer
            .lock()
            .await
            .book_global(self.cfg.global_min_interval, Instant::now());
        if !global_wait.is_zero() {
            sleep(global_wait).await;
        }

        self.inner.send_text(chat_id, text).await
    }
}

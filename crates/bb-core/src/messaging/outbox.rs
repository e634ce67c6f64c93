use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

use tokio::sync::{Mutex, Notify};

use crate::{domain::ChatId, messaging::port::MessagingPort};

/// Fire-and-forget sender used by the orchestrator.
///
/// `post` only enqueues. Each chat with pending text gets one lane task that
/// delivers its queue in order and exits once the queue is empty, so a slow or
/// throttled chat delays nobody but itself. Send failures are logged and
/// dropped.
#[derive(Clone)]
pub struct Outbox {
    inner: Arc<OutboxInner>,
}

struct OutboxInner {
    port: Arc<dyn MessagingPort>,
    /// A chat has an entry exactly while its lane task is running.
    lanes: Mutex<HashMap<ChatId, VecDeque<String>>>,
    idle: Notify,
}

impl Outbox {
    pub fn new(port: Arc<dyn MessagingPort>) -> Self {
        Self {
            inner: Arc::new(OutboxInner {
                port,
                lanes: Mutex::new(HashMap::new()),
                idle: Notify::new(),
            }),
        }
    }

    /// Queue `text` for `chat_id`. Never waits on the transport.
    pub async fn post(&self, chat_id: ChatId, text: impl Into<String>) {
        let text = text.into();
        let mut lanes = self.inner.lanes.lock().await;
        if let Some(queue) = lanes.get_mut(&chat_id) {
            queue.push_back(text);
            return;
        }
        lanes.insert(chat_id, VecDeque::from([text]));
        drop(lanes);

        let inner = self.inner.clone();
        tokio::spawn(async move { inner.drain_lane(chat_id).await });
    }

    /// Wait until every queued message has been handed to the transport.
    pub async fn flush(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.inner.lanes.lock().await.is_empty() {
                return;
            }
            notified.await;
        }
    }
}

impl OutboxInner {
    async fn drain_lane(&self, chat_id: ChatId) {
        loop {
            let next = {
                let mut lanes = self.lanes.lock().await;
                match lanes.get_mut(&chat_id).and_then(|q| q.pop_front()) {
                    Some(text) => text,
                    None => {
                        lanes.remove(&chat_id);
                        if lanes.is_empty() {
                            self.idle.notify_waiters();
                        }
                        return;
                    }
                }
            };

            if let Err(e) = self.port.send_text(chat_id, &next).await {
                tracing::warn!(chat_id = chat_id.0, error = %e, "failed to send message");
            }
        }
    }
}

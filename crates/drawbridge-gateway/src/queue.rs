//! In-memory FIFO command queue.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

/// A planned command waiting for the plugin to collect it. Only `payload`
/// goes over the wire; the rest is bookkeeping.
#[derive(Debug, Clone)]
pub struct QueuedCommand {
    pub id: Uuid,
    pub payload: Value,
    pub queued_at: DateTime<Utc>,
}

/// FIFO queue between the prompt endpoints and the polling plugin.
#[derive(Default)]
pub struct CommandQueue {
    inner: Mutex<VecDeque<QueuedCommand>>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue commands in order. Returns how many were queued.
    pub async fn push_all(&self, commands: Vec<Value>) -> usize {
        let count = commands.len();
        let mut queue = self.inner.lock().await;
        for payload in commands {
            queue.push_back(QueuedCommand {
                id: Uuid::new_v4(),
                payload,
                queued_at: Utc::now(),
            });
        }
        count
    }

    /// Take the oldest command, if any.
    pub async fn pop(&self) -> Option<QueuedCommand> {
        self.inner.lock().await.pop_front()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

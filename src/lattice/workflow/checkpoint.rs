// SPDX-License-Identifier: MIT

//! In-memory conversation checkpoints
//!
//! A [`MemorySaver`] keeps the message history of every thread id for the
//! lifetime of the process. Threads are created on first save and only
//! removed by [`MemorySaver::clear`]. A turn that loads a thread, runs and
//! saves it back holds [`MemorySaver::lock_thread`] throughout, so turns on
//! one thread never overwrite each other.

use crate::adk::model::Message;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Saved history of one thread
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub thread_id: String,
    pub messages: Vec<Message>,
    /// Number of saves on this thread
    pub invocations: usize,
    pub updated_at: DateTime<Utc>,
}

/// Cloneable handle to a shared checkpoint table
#[derive(Clone, Default)]
pub struct MemorySaver {
    threads: Arc<RwLock<HashMap<String, Checkpoint>>>,
    turns: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl MemorySaver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclusive turn on `thread_id`, released when the guard drops
    pub async fn lock_thread(&self, thread_id: &str) -> OwnedMutexGuard<()> {
        let turn = {
            let mut turns = self.turns.lock().await;
            turns.entry(thread_id.to_string()).or_default().clone()
        };
        turn.lock_owned().await
    }

    /// History of `thread_id`, empty for unknown threads
    pub async fn load(&self, thread_id: &str) -> Vec<Message> {
        let threads = self.threads.read().await;
        threads
            .get(thread_id)
            .map(|c| c.messages.clone())
            .unwrap_or_default()
    }

    /// Replace the history of `thread_id`
    pub async fn save(&self, thread_id: &str, messages: Vec<Message>) {
        let mut threads = self.threads.write().await;
        let checkpoint = threads
            .entry(thread_id.to_string())
            .or_insert_with(|| Checkpoint {
                thread_id: thread_id.to_string(),
                messages: Vec::new(),
                invocations: 0,
                updated_at: Utc::now(),
            });
        checkpoint.messages = messages;
        checkpoint.invocations += 1;
        checkpoint.updated_at = Utc::now();
        log::debug!(
            "Checkpoint '{}' saved with {} messages",
            thread_id,
            checkpoint.messages.len()
        );
    }

    pub async fn get(&self, thread_id: &str) -> Option<Checkpoint> {
        self.threads.read().await.get(thread_id).cloned()
    }

    /// Forget `thread_id`; true if it existed
    pub async fn clear(&self, thread_id: &str) -> bool {
        self.threads.write().await.remove(thread_id).is_some()
    }

    /// Known thread ids, sorted
    pub async fn threads(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.threads.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

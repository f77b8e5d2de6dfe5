//! In-memory checkpoint storage for development, tests, and single-process deployments.
//!
//! [`InMemoryCheckpointSaver`] keeps every checkpoint in a `HashMap` guarded by per-thread
//! mutexes, so writes for distinct `thread_id`s never block each other while writes for the
//! same thread are strictly serialized — matching the durability contract `CheckpointSaver`
//! documents. Data does not survive a process restart; production deployments should back
//! [`CheckpointSaver`] with SQLite or another durable store instead.
//!
//! # Example
//!
//! ```rust
//! use ledgerflow_checkpoint::{CheckpointSaver, InMemoryCheckpointSaver};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let saver = InMemoryCheckpointSaver::new();
//! let cp = saver.put("thread-1", json!({"status": "RUNNING"}), "INTAKE".to_string(), None).await?;
//! assert_eq!(cp.version, 1);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream;
use tokio::sync::{Mutex, RwLock};

use crate::checkpoint::{Checkpoint, CheckpointConfig, CheckpointTuple, PendingInterrupt};
use crate::error::{CheckpointError, Result};
use crate::traits::{CheckpointSaver, CheckpointStream};

type ThreadLog = Arc<Mutex<Vec<Checkpoint>>>;

/// In-memory, per-thread-locked implementation of [`CheckpointSaver`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryCheckpointSaver {
    threads: Arc<RwLock<HashMap<String, ThreadLog>>>,
}

impl InMemoryCheckpointSaver {
    /// Create an empty saver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct threads with at least one checkpoint.
    pub async fn thread_count(&self) -> usize {
        self.threads.read().await.len()
    }

    /// Total checkpoints stored across every thread.
    pub async fn checkpoint_count(&self) -> usize {
        let threads = self.threads.read().await;
        let mut total = 0;
        for log in threads.values() {
            total += log.lock().await.len();
        }
        total
    }

    /// Drop all stored checkpoints. Intended for test isolation.
    pub async fn clear(&self) {
        self.threads.write().await.clear();
    }

    async fn log_for(&self, thread_id: &str) -> ThreadLog {
        if let Some(log) = self.threads.read().await.get(thread_id) {
            return log.clone();
        }
        let mut threads = self.threads.write().await;
        threads
            .entry(thread_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Vec::new())))
            .clone()
    }
}

#[async_trait]
impl CheckpointSaver for InMemoryCheckpointSaver {
    async fn get_tuple(&self, config: &CheckpointConfig) -> Result<Option<CheckpointTuple>> {
        let thread_id = config
            .thread_id
            .as_ref()
            .ok_or_else(|| CheckpointError::Invalid("thread_id is required".to_string()))?;

        let threads = self.threads.read().await;
        let Some(log) = threads.get(thread_id) else {
            return Ok(None);
        };
        let log = log.lock().await;

        let found = if let Some(checkpoint_id) = &config.checkpoint_id {
            log.iter().find(|cp| &cp.id == checkpoint_id).cloned()
        } else {
            log.last().cloned()
        };

        Ok(found.map(|checkpoint| CheckpointTuple::new(config.clone(), checkpoint)))
    }

    async fn list(&self, thread_id: &str) -> Result<CheckpointStream> {
        let threads = self.threads.read().await;
        let results: Vec<Result<CheckpointTuple>> = match threads.get(thread_id) {
            Some(log) => log
                .lock()
                .await
                .iter()
                .rev()
                .map(|cp| {
                    Ok(CheckpointTuple::new(
                        CheckpointConfig::at(thread_id.to_string(), cp.id.clone()),
                        cp.clone(),
                    ))
                })
                .collect(),
            None => Vec::new(),
        };

        Ok(Box::pin(stream::iter(results)))
    }

    async fn put(
        &self,
        thread_id: &str,
        serialized_state: serde_json::Value,
        position_node: String,
        pending_interrupt: Option<PendingInterrupt>,
    ) -> Result<Checkpoint> {
        let log = self.log_for(thread_id).await;
        let mut log = log.lock().await;

        let version = log.last().map(|cp| cp.version + 1).unwrap_or(1);
        let mut checkpoint = Checkpoint::new(
            thread_id.to_string(),
            version,
            serialized_state,
            position_node,
        );
        if let Some(interrupt) = pending_interrupt {
            checkpoint = checkpoint.with_pending_interrupt(interrupt);
        }

        log.push(checkpoint.clone());
        Ok(checkpoint)
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        self.threads.write().await.remove(thread_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn put_assigns_increasing_versions() {
        let saver = InMemoryCheckpointSaver::new();
        let first = saver
            .put("t1", json!({"n": 1}), "INTAKE".to_string(), None)
            .await
            .unwrap();
        let second = saver
            .put("t1", json!({"n": 2}), "UNDERSTAND".to_string(), None)
            .await
            .unwrap();

        assert_eq!(first.version, 1);
        assert_eq!(second.version, 2);
    }

    #[tokio::test]
    async fn get_tuple_without_checkpoint_id_returns_latest() {
        let saver = InMemoryCheckpointSaver::new();
        saver
            .put("t1", json!({"n": 1}), "INTAKE".to_string(), None)
            .await
            .unwrap();
        saver
            .put("t1", json!({"n": 2}), "UNDERSTAND".to_string(), None)
            .await
            .unwrap();

        let tuple = saver
            .get_tuple(&CheckpointConfig::latest("t1"))
            .await
            .unwrap()
            .expect("checkpoint present");

        assert_eq!(tuple.checkpoint.position_node, "UNDERSTAND");
        assert_eq!(tuple.checkpoint.version, 2);
    }

    #[tokio::test]
    async fn get_tuple_for_unknown_thread_is_none() {
        let saver = InMemoryCheckpointSaver::new();
        let tuple = saver
            .get_tuple(&CheckpointConfig::latest("missing"))
            .await
            .unwrap();
        assert!(tuple.is_none());
    }

    #[tokio::test]
    async fn pending_interrupt_persists_on_the_written_checkpoint() {
        let saver = InMemoryCheckpointSaver::new();
        let cp = saver
            .put(
                "t1",
                json!({"status": "PAUSED"}),
                "HITL_DECISION".to_string(),
                Some(PendingInterrupt::new("HITL_DECISION", json!({"reason": "low score"}))),
            )
            .await
            .unwrap();

        assert!(cp.is_interrupted());
    }

    #[tokio::test]
    async fn list_returns_most_recent_first() {
        let saver = InMemoryCheckpointSaver::new();
        for i in 0..3 {
            saver
                .put("t1", json!({"n": i}), format!("stage-{i}"), None)
                .await
                .unwrap();
        }

        use futures::StreamExt;
        let results: Vec<_> = saver.list("t1").await.unwrap().collect().await;
        assert_eq!(results.len(), 3);
        let first = results[0].as_ref().unwrap();
        assert_eq!(first.checkpoint.version, 3);
    }

    #[tokio::test]
    async fn delete_thread_removes_all_checkpoints() {
        let saver = InMemoryCheckpointSaver::new();
        saver
            .put("t1", json!({}), "INTAKE".to_string(), None)
            .await
            .unwrap();
        assert_eq!(saver.thread_count().await, 1);

        saver.delete_thread("t1").await.unwrap();
        assert_eq!(saver.thread_count().await, 0);
    }

    #[tokio::test]
    async fn independent_threads_do_not_interfere() {
        let saver = InMemoryCheckpointSaver::new();
        saver
            .put("a", json!({}), "INTAKE".to_string(), None)
            .await
            .unwrap();
        saver
            .put("b", json!({}), "INTAKE".to_string(), None)
            .await
            .unwrap();
        saver
            .put("a", json!({}), "UNDERSTAND".to_string(), None)
            .await
            .unwrap();

        let a = saver
            .get_tuple(&CheckpointConfig::latest("a"))
            .await
            .unwrap()
            .unwrap();
        let b = saver
            .get_tuple(&CheckpointConfig::latest("b"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(a.checkpoint.version, 2);
        assert_eq!(b.checkpoint.version, 1);
    }
}

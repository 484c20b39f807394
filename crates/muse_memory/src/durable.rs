//! Durable mirror plumbing: the background writer and an in-process store.

use async_trait::async_trait;
use muse_core::{DurableStore, Memory, MemoryStatus, Pattern, PersistenceError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, RwLock};
use uuid::Uuid;

// ============================================================================
// Background writer
// ============================================================================

#[derive(Debug)]
pub(crate) enum MirrorOp {
    Insert(Memory),
    UpdateStatus(Uuid, MemoryStatus),
    UpsertPattern(Pattern),
    /// Acknowledged once every op queued before it has been applied.
    Flush(oneshot::Sender<()>),
}

/// Handle to the single task that applies mirror operations in order.
pub(crate) struct DurableMirror {
    tx: mpsc::UnboundedSender<MirrorOp>,
    store: Arc<dyn DurableStore>,
}

impl DurableMirror {
    /// Must be called from within a tokio runtime.
    pub(crate) fn spawn(store: Arc<dyn DurableStore>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<MirrorOp>();
        let writer_store = store.clone();

        tokio::spawn(async move {
            while let Some(op) = rx.recv().await {
                let result = match op {
                    MirrorOp::Insert(memory) => writer_store.insert(&memory).await,
                    MirrorOp::UpdateStatus(id, status) => {
                        writer_store.update_status(id, status).await
                    }
                    MirrorOp::UpsertPattern(pattern) => writer_store.upsert_pattern(&pattern).await,
                    MirrorOp::Flush(ack) => {
                        let _ = ack.send(());
                        Ok(())
                    }
                };
                if let Err(e) = result {
                    tracing::warn!("Durable mirror write failed: {}", e);
                }
            }
            tracing::debug!("Durable mirror writer stopped");
        });

        Self { tx, store }
    }

    /// Queue an operation. Never blocks; a dead writer only costs a log line.
    pub(crate) fn send(&self, op: MirrorOp) {
        if self.tx.send(op).is_err() {
            tracing::warn!("Durable mirror writer is gone, dropping write");
        }
    }

    pub(crate) async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.send(MirrorOp::Flush(ack_tx));
        let _ = ack_rx.await;
    }

    pub(crate) fn store(&self) -> &Arc<dyn DurableStore> {
        &self.store
    }
}

// ============================================================================
// In-memory durable store
// ============================================================================

/// `DurableStore` that lives in process memory.
///
/// Used by tests and as the degraded-mode store when no database is configured.
#[derive(Default)]
pub struct InMemoryDurableStore {
    records: RwLock<HashMap<Uuid, (Memory, MemoryStatus)>>,
    patterns: RwLock<HashMap<String, Pattern>>,
    unavailable: AtomicBool,
}

impl InMemoryDurableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `PersistenceError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn status(&self, id: Uuid) -> Option<MemoryStatus> {
        self.records.read().await.get(&id).map(|(_, status)| *status)
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    pub async fn pattern(&self, word: &str) -> Option<Pattern> {
        self.patterns.read().await.get(word).cloned()
    }

    fn check(&self) -> Result<(), PersistenceError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(PersistenceError::Unavailable("in-memory store disabled".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DurableStore for InMemoryDurableStore {
    async fn insert(&self, memory: &Memory) -> Result<(), PersistenceError> {
        self.check()?;
        self.records
            .write()
            .await
            .insert(memory.id, (memory.clone(), MemoryStatus::Active));
        Ok(())
    }

    async fn query_active(&self) -> Result<Vec<Memory>, PersistenceError> {
        self.check()?;
        let mut active: Vec<Memory> = self
            .records
            .read()
            .await
            .values()
            .filter(|(_, status)| *status == MemoryStatus::Active)
            .map(|(memory, _)| memory.clone())
            .collect();
        active.sort_by_key(|m| m.timestamp);
        Ok(active)
    }

    async fn update_status(&self, id: Uuid, status: MemoryStatus) -> Result<(), PersistenceError> {
        self.check()?;
        match self.records.write().await.get_mut(&id) {
            Some(entry) => {
                entry.1 = status;
                Ok(())
            }
            None => Err(PersistenceError::NotFound { id }),
        }
    }

    async fn upsert_pattern(&self, pattern: &Pattern) -> Result<(), PersistenceError> {
        self.check()?;
        self.patterns
            .write()
            .await
            .insert(pattern.word.clone(), pattern.clone());
        Ok(())
    }

    async fn query_patterns(&self) -> Result<Vec<Pattern>, PersistenceError> {
        self.check()?;
        Ok(self.patterns.read().await.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use muse_core::{EmotionalState, MemoryKind};

    fn memory(content: &str) -> Memory {
        Memory::new(content, MemoryKind::Fact, EmotionalState::Neutral, None).unwrap()
    }

    #[tokio::test]
    async fn test_in_memory_store_lifecycle() {
        let store = InMemoryDurableStore::new();
        let m = memory("water is wet");
        store.insert(&m).await.unwrap();
        assert_eq!(store.query_active().await.unwrap().len(), 1);

        store.update_status(m.id, MemoryStatus::Archived).await.unwrap();
        assert!(store.query_active().await.unwrap().is_empty());
        assert_eq!(store.status(m.id).await, Some(MemoryStatus::Archived));
    }

    #[tokio::test]
    async fn test_update_unknown_is_not_found() {
        let store = InMemoryDurableStore::new();
        let err = store
            .update_status(Uuid::new_v4(), MemoryStatus::Archived)
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_mirror_applies_in_order_and_survives_failures() {
        let store = Arc::new(InMemoryDurableStore::new());
        let mirror = DurableMirror::spawn(store.clone());

        let m = memory("first");
        // Status update before insert fails (logged), the insert still lands.
        mirror.send(MirrorOp::UpdateStatus(m.id, MemoryStatus::Archived));
        mirror.send(MirrorOp::Insert(m.clone()));
        mirror.flush().await;
        assert_eq!(store.status(m.id).await, Some(MemoryStatus::Active));

        store.set_unavailable(true);
        mirror.send(MirrorOp::Insert(memory("lost")));
        mirror.flush().await;
        store.set_unavailable(false);
        assert_eq!(store.len().await, 1);
    }
}

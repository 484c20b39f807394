use chrono::{DateTime, Duration, Utc};
use muse_core::config::MemoryConfig;
use muse_core::text::words;
use muse_core::{
    ConsolidationError, DurableStore, EmotionalState, Memory, MemoryKind, MemoryStatus, Pattern,
    PersistenceError, ValidationError,
};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::durable::{DurableMirror, MirrorOp};
use crate::patterns::PatternMiner;

/// Filter for [`MemoryStore::query`]. Unset fields match everything.
#[derive(Debug, Clone)]
pub struct MemoryQuery {
    pub kind: Option<MemoryKind>,
    pub emotional_context: Option<EmotionalState>,
    pub platform: Option<String>,
    pub limit: usize,
}

impl Default for MemoryQuery {
    fn default() -> Self {
        Self {
            kind: None,
            emotional_context: None,
            platform: None,
            limit: 10,
        }
    }
}

impl MemoryQuery {
    pub fn kind(kind: MemoryKind) -> Self {
        Self {
            kind: Some(kind),
            ..Default::default()
        }
    }

    fn matches(&self, memory: &Memory) -> bool {
        self.kind.map_or(true, |k| memory.kind == k)
            && self
                .emotional_context
                .map_or(true, |s| memory.emotional_context == s)
            && self
                .platform
                .as_deref()
                .map_or(true, |p| memory.platform.as_deref() == Some(p))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsolidationReport {
    pub promoted: usize,
    pub evicted: usize,
    pub stm_len: usize,
    pub ltm_len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryStats {
    pub stm_len: usize,
    pub ltm_len: usize,
    pub pattern_count: usize,
    pub durable: bool,
}

#[derive(Default)]
struct Tiers {
    /// Oldest first.
    stm: VecDeque<Memory>,
    ltm: Vec<Memory>,
    patterns: PatternMiner,
}

impl Tiers {
    fn iter_all(&self) -> impl Iterator<Item = &Memory> {
        self.stm.iter().chain(self.ltm.iter())
    }

    fn iter_all_mut(&mut self) -> impl Iterator<Item = &mut Memory> {
        self.stm.iter_mut().chain(self.ltm.iter_mut())
    }

    fn push_stm(&mut self, memory: Memory, limit: usize) {
        self.stm.push_back(memory);
        while self.stm.len() > limit {
            if let Some(dropped) = self.stm.pop_front() {
                tracing::debug!("STM full, dropping oldest memory {}", dropped.id);
            }
        }
    }

    /// Most important first; the tail beyond `limit` is returned.
    fn evict_ltm(&mut self, limit: usize) -> Vec<Memory> {
        if self.ltm.len() <= limit {
            return Vec::new();
        }
        self.ltm.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        self.ltm.split_off(limit)
    }
}

/// The two memory tiers, pattern miner and optional durable mirror.
///
/// All tier mutations happen under one write lock, so `consolidate` is atomic
/// with respect to `add`, `query` and `clear_old_memories`.
pub struct MemoryStore {
    tiers: RwLock<Tiers>,
    config: MemoryConfig,
    mirror: Option<DurableMirror>,
}

impl MemoryStore {
    /// Purely in-process store with no durable mirror.
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            tiers: RwLock::new(Tiers::default()),
            config,
            mirror: None,
        }
    }

    /// Store that mirrors every write to `durable` through a background task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_durable(config: MemoryConfig, durable: Arc<dyn DurableStore>) -> Self {
        Self {
            tiers: RwLock::new(Tiers::default()),
            config,
            mirror: Some(DurableMirror::spawn(durable)),
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    fn mirror(&self, op: MirrorOp) {
        if let Some(mirror) = &self.mirror {
            mirror.send(op);
        }
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Create a record stamped now and append it to STM.
    pub async fn add(
        &self,
        content: &str,
        kind: MemoryKind,
        emotional_context: EmotionalState,
        platform: Option<&str>,
    ) -> Result<Memory, ValidationError> {
        let memory = Memory::new(content, kind, emotional_context, platform)?;
        self.insert(memory.clone()).await;
        Ok(memory)
    }

    /// Append a pre-built record to STM, keeping its id and timestamp.
    pub async fn insert(&self, memory: Memory) {
        let mut tiers = self.tiers.write().await;
        self.push(&mut tiers, memory);
    }

    /// Append a stimulus record and fold its content into the pattern
    /// statistics in one step. Returns the patterns created or updated.
    ///
    /// Nothing is written unless the whole call completes.
    pub async fn insert_and_mine(&self, memory: Memory) -> Vec<Pattern> {
        let mut tiers = self.tiers.write().await;
        let changed = tiers.patterns.observe(&memory.content, Utc::now());
        for pattern in &changed {
            self.mirror(MirrorOp::UpsertPattern(pattern.clone()));
        }
        self.push(&mut tiers, memory);
        changed
    }

    fn push(&self, tiers: &mut Tiers, memory: Memory) {
        tracing::debug!(
            "Storing {} memory {} (importance {:.2})",
            memory.kind.as_str(),
            memory.id,
            memory.importance
        );
        self.mirror(MirrorOp::Insert(memory.clone()));
        tiers.push_stm(memory, self.config.stm_limit);
    }

    // ========================================================================
    // Consolidation & retention
    // ========================================================================

    pub async fn consolidate(&self) -> Result<ConsolidationReport, ConsolidationError> {
        self.consolidate_at(Utc::now()).await
    }

    /// Promote aged, important STM entries into LTM as of `now`.
    ///
    /// The sweep is computed on a snapshot and swapped in only if it passes
    /// the integrity check; otherwise both tiers are left untouched.
    pub async fn consolidate_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<ConsolidationReport, ConsolidationError> {
        let age = self.config.consolidation_age();
        let threshold = self.config.consolidation_importance;

        let mut tiers = self.tiers.write().await;

        let (promoted, staying): (Vec<Memory>, Vec<Memory>) = tiers
            .stm
            .iter()
            .cloned()
            .partition(|m| m.age_at(now) > age && m.importance > threshold);

        let ltm_ids: HashSet<_> = tiers.ltm.iter().map(|m| m.id).collect();
        if let Some(conflict) = promoted.iter().find(|m| ltm_ids.contains(&m.id)) {
            return Err(ConsolidationError::TierConflict { id: conflict.id });
        }

        let promoted_ids: Vec<_> = promoted.iter().map(|m| m.id).collect();
        let mut next = Tiers {
            stm: staying.into(),
            ltm: tiers.ltm.iter().cloned().chain(promoted).collect(),
            patterns: std::mem::take(&mut tiers.patterns),
        };
        let evicted = next.evict_ltm(self.config.ltm_limit);
        *tiers = next;

        for id in &promoted_ids {
            self.mirror(MirrorOp::UpdateStatus(*id, MemoryStatus::Archived));
        }

        let report = ConsolidationReport {
            promoted: promoted_ids.len(),
            evicted: evicted.len(),
            stm_len: tiers.stm.len(),
            ltm_len: tiers.ltm.len(),
        };
        tracing::info!(
            "Consolidation: {} promoted, {} evicted (STM {}, LTM {})",
            report.promoted,
            report.evicted,
            report.stm_len,
            report.ltm_len
        );
        Ok(report)
    }

    pub async fn clear_old_memories(&self, retention_days: i64) -> usize {
        self.clear_old_memories_at(retention_days, Utc::now()).await
    }

    /// Drop records older than the retention window unless they are important
    /// enough to keep forever. Returns how many were removed.
    pub async fn clear_old_memories_at(&self, retention_days: i64, now: DateTime<Utc>) -> usize {
        let cutoff = now - Duration::days(retention_days.max(0));
        let keep_above = self.config.retention_importance;
        let expired = |m: &Memory| m.timestamp < cutoff && m.importance <= keep_above;

        let mut tiers = self.tiers.write().await;
        let removed: Vec<_> = tiers.iter_all().filter(|&m| expired(m)).map(|m| m.id).collect();
        tiers.stm.retain(|m| !expired(m));
        tiers.ltm.retain(|m| !expired(m));
        drop(tiers);

        for id in &removed {
            self.mirror(MirrorOp::UpdateStatus(*id, MemoryStatus::Archived));
        }
        if !removed.is_empty() {
            tracing::info!(
                "Cleared {} memories older than {} days",
                removed.len(),
                retention_days
            );
        }
        removed.len()
    }

    // ========================================================================
    // Retrieval
    // ========================================================================

    /// Matching records from both tiers, most important first.
    ///
    /// Returned records are marked as accessed.
    pub async fn query(&self, query: &MemoryQuery) -> Vec<Memory> {
        let now = Utc::now();
        let mut tiers = self.tiers.write().await;

        let mut hits: Vec<Memory> = tiers
            .iter_all()
            .filter(|m| query.matches(m))
            .cloned()
            .collect();
        hits.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        hits.truncate(query.limit);

        let ids: HashSet<_> = hits.iter().map(|m| m.id).collect();
        for memory in tiers.iter_all_mut().filter(|m| ids.contains(&m.id)) {
            memory.touch(now);
        }
        for hit in &mut hits {
            hit.touch(now);
        }
        hits
    }

    /// Records whose content contains the most words of `content`.
    pub async fn associated_memories(&self, content: &str, limit: usize) -> Vec<Memory> {
        let query_words: Vec<String> = {
            let mut seen = HashSet::new();
            words(content)
                .into_iter()
                .filter(|w| seen.insert(w.clone()))
                .collect()
        };
        if query_words.is_empty() {
            return Vec::new();
        }

        let tiers = self.tiers.read().await;
        let mut scored: Vec<(usize, &Memory)> = tiers
            .iter_all()
            .filter_map(|m| {
                let haystack = m.content.to_lowercase();
                let score = query_words
                    .iter()
                    .filter(|w| haystack.contains(w.as_str()))
                    .count();
                (score > 0).then_some((score, m))
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored
            .into_iter()
            .take(limit)
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// Contents of the newest STM records, oldest first.
    pub async fn recent_contents(&self, limit: usize) -> Vec<String> {
        let tiers = self.tiers.read().await;
        let skip = tiers.stm.len().saturating_sub(limit);
        tiers.stm.iter().skip(skip).map(|m| m.content.clone()).collect()
    }

    pub async fn short_term(&self) -> Vec<Memory> {
        self.tiers.read().await.stm.iter().cloned().collect()
    }

    pub async fn long_term(&self) -> Vec<Memory> {
        self.tiers.read().await.ltm.clone()
    }

    // ========================================================================
    // Patterns
    // ========================================================================

    /// Fold `content` into the recurring-word statistics.
    ///
    /// Returns the patterns created or updated by this call.
    pub async fn mine_patterns(&self, content: &str) -> Vec<Pattern> {
        let changed = self.tiers.write().await.patterns.observe(content, Utc::now());
        for pattern in &changed {
            self.mirror(MirrorOp::UpsertPattern(pattern.clone()));
        }
        changed
    }

    /// All tracked patterns, highest frequency first.
    pub async fn patterns(&self) -> Vec<Pattern> {
        self.tiers.read().await.patterns.sorted()
    }

    // ========================================================================
    // Durable mirror
    // ========================================================================

    /// Reload active records and tracked patterns from the durable store.
    ///
    /// Records younger than the consolidation age land in STM, older ones in
    /// LTM; both caps are applied and LTM overflow is archived. Returns how
    /// many records were loaded.
    pub async fn rehydrate(&self) -> Result<usize, PersistenceError> {
        let Some(mirror) = &self.mirror else {
            return Ok(0);
        };
        let mut records = mirror.store().query_active().await?;
        let patterns = mirror.store().query_patterns().await?;
        records.sort_by_key(|m| m.timestamp);

        let now = Utc::now();
        let age = self.config.consolidation_age();
        let count = records.len();

        let mut tiers = self.tiers.write().await;
        let known: HashSet<_> = tiers.iter_all().map(|m| m.id).collect();
        for memory in records.into_iter().filter(|m| !known.contains(&m.id)) {
            if memory.age_at(now) > age {
                tiers.ltm.push(memory);
            } else {
                tiers.push_stm(memory, self.config.stm_limit);
            }
        }
        let evicted = tiers.evict_ltm(self.config.ltm_limit);
        tiers.patterns.restore(patterns);

        for memory in &evicted {
            self.mirror(MirrorOp::UpdateStatus(memory.id, MemoryStatus::Archived));
        }

        tracing::info!(
            "Rehydrated {} memories (STM {}, LTM {}, {} evicted), {} patterns",
            count,
            tiers.stm.len(),
            tiers.ltm.len(),
            evicted.len(),
            tiers.patterns.len()
        );
        Ok(count)
    }

    /// Wait until every queued mirror write has been applied.
    pub async fn flush(&self) {
        if let Some(mirror) = &self.mirror {
            mirror.flush().await;
        }
    }

    pub async fn stats(&self) -> MemoryStats {
        let tiers = self.tiers.read().await;
        MemoryStats {
            stm_len: tiers.stm.len(),
            ltm_len: tiers.ltm.len(),
            pattern_count: tiers.patterns.len(),
            durable: self.mirror.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MemoryConfig {
        MemoryConfig::default()
    }

    fn aged(content: &str, hours: i64, importance: f32) -> Memory {
        Memory::new(content, MemoryKind::Experience, EmotionalState::Neutral, None)
            .unwrap()
            .with_timestamp(Utc::now() - Duration::hours(hours))
            .with_importance(importance)
    }

    #[tokio::test]
    async fn test_add_then_query_by_kind() {
        let store = MemoryStore::new(config());
        store
            .add("I saw a comet.", MemoryKind::Experience, EmotionalState::Excited, Some("x"))
            .await
            .unwrap();
        store
            .add("Comets are icy.", MemoryKind::Fact, EmotionalState::Analytical, None)
            .await
            .unwrap();

        let facts = store.query(&MemoryQuery::kind(MemoryKind::Fact)).await;
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].content, "Comets are icy.");
        assert!(facts[0].last_accessed.is_some());
    }

    #[tokio::test]
    async fn test_add_rejects_empty() {
        let store = MemoryStore::new(config());
        let err = store
            .add("   ", MemoryKind::Fact, EmotionalState::Neutral, None)
            .await
            .unwrap_err();
        assert_eq!(err, ValidationError::EmptyContent);
        assert_eq!(store.stats().await.stm_len, 0);
    }

    #[tokio::test]
    async fn test_stm_keeps_most_recent() {
        let store = MemoryStore::new(MemoryConfig {
            stm_limit: 10,
            ..config()
        });
        for i in 0..11 {
            store
                .add(&format!("entry {}", i), MemoryKind::Interaction, EmotionalState::Neutral, None)
                .await
                .unwrap();
        }
        let stm = store.short_term().await;
        assert_eq!(stm.len(), 10);
        assert_eq!(stm[0].content, "entry 1");
        assert_eq!(stm[9].content, "entry 10");
    }

    #[tokio::test]
    async fn test_consolidation_moves_aged_important() {
        let store = MemoryStore::new(config());
        store.insert(aged("old and vital", 2, 0.9)).await;
        store.insert(aged("old but dull", 2, 0.5)).await;
        store.insert(aged("fresh and vital", 0, 0.9)).await;

        let report = store.consolidate().await.unwrap();
        assert_eq!(report.promoted, 1);
        assert_eq!(report.stm_len, 2);

        let ltm = store.long_term().await;
        assert_eq!(ltm.len(), 1);
        assert_eq!(ltm[0].content, "old and vital");
        assert!(store.short_term().await.iter().all(|m| m.id != ltm[0].id));
    }

    #[tokio::test]
    async fn test_ltm_evicts_least_important() {
        let store = MemoryStore::new(MemoryConfig {
            ltm_limit: 2,
            ..config()
        });
        store.insert(aged("a", 2, 0.75)).await;
        store.insert(aged("b", 2, 0.95)).await;
        store.insert(aged("c", 2, 0.85)).await;

        let report = store.consolidate().await.unwrap();
        assert_eq!(report.promoted, 3);
        assert_eq!(report.evicted, 1);

        let contents: Vec<String> = store.long_term().await.into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_query_sorted_and_limited() {
        let store = MemoryStore::new(config());
        for (content, importance) in [("low", 0.2), ("high", 0.9), ("mid", 0.5)] {
            store.insert(aged(content, 0, importance)).await;
        }
        let hits = store
            .query(&MemoryQuery {
                limit: 2,
                ..Default::default()
            })
            .await;
        let contents: Vec<&str> = hits.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["high", "mid"]);
    }

    #[tokio::test]
    async fn test_associated_memories_scoring() {
        let store = MemoryStore::new(config());
        store.insert(aged("rust borrow checker", 0, 0.5)).await;
        store.insert(aged("the rust language", 0, 0.5)).await;
        store.insert(aged("gardening tips", 0, 0.5)).await;

        let hits = store.associated_memories("rust borrow", 5).await;
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].content, "rust borrow checker");
    }

    #[tokio::test]
    async fn test_clear_old_memories_keeps_important() {
        let store = MemoryStore::new(config());
        store.insert(aged("ancient trivia", 24 * 40, 0.6)).await;
        store.insert(aged("ancient wisdom", 24 * 40, 0.95)).await;
        store.insert(aged("recent trivia", 1, 0.6)).await;

        assert_eq!(store.clear_old_memories(30).await, 1);
        let left: Vec<String> = store.short_term().await.into_iter().map(|m| m.content).collect();
        assert_eq!(left, vec!["ancient wisdom", "recent trivia"]);
    }

    #[tokio::test]
    async fn test_insert_and_mine() {
        let store = MemoryStore::new(config());
        let memory = aged("echo echo echo", 0, 0.5);
        let changed = store.insert_and_mine(memory.clone()).await;
        assert_eq!(changed.len(), 1);
        assert_eq!(store.short_term().await, vec![memory]);
        assert_eq!(store.patterns().await[0].frequency, 3);
    }

    #[tokio::test]
    async fn test_recent_contents_oldest_first() {
        let store = MemoryStore::new(config());
        for c in ["one", "two", "three"] {
            store.insert(aged(c, 0, 0.5)).await;
        }
        assert_eq!(store.recent_contents(2).await, vec!["two", "three"]);
    }
}

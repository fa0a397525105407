use crate::index::write_atomic;
use crate::state::{StateError, StateResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::Path;

pub const STATE_SCHEMA_VERSION: u32 = 1;

/// Pending entries kept; the oldest are dropped beyond this
pub const MAX_QUEUE_SIZE: usize = 10_000;

/// Seen URLs remembered; the oldest are forgotten beyond this
pub const MAX_SEEN_SIZE: usize = 50_000;

/// A pending fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub url: String,
    pub depth: u32,
}

/// Resumable crawl progress
///
/// Both collections are bounded. Overflowing the queue drops its oldest
/// entry and overflowing `seen` forgets its oldest URL, so a very large crawl
/// can miss some pages or revisit a page it already fetched. That loss is
/// accepted in exchange for bounded memory and state-file size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlState {
    schema_version: u32,
    queue: VecDeque<QueueEntry>,
    /// Insertion order of `seen_set`, oldest first
    seen: VecDeque<String>,
    #[serde(skip)]
    seen_set: HashSet<String>,
    /// Documents indexed in the current pass
    pub document_count: u64,
    pub last_run_at: Option<DateTime<Utc>>,
    #[serde(default)]
    dropped: u64,
}

#[derive(Deserialize)]
struct SchemaHeader {
    schema_version: u32,
}

impl Default for CrawlState {
    fn default() -> Self {
        Self::new()
    }
}

impl CrawlState {
    pub fn new() -> Self {
        Self {
            schema_version: STATE_SCHEMA_VERSION,
            queue: VecDeque::new(),
            seen: VecDeque::new(),
            seen_set: HashSet::new(),
            document_count: 0,
            last_run_at: None,
            dropped: 0,
        }
    }

    /// Enqueues a canonical URL unless it was already seen
    ///
    /// # Returns
    ///
    /// `true` if the URL was added to the queue
    pub fn enqueue(&mut self, url: String, depth: u32) -> bool {
        if !self.mark_seen(&url) {
            return false;
        }

        self.queue.push_back(QueueEntry { url, depth });
        if self.queue.len() > MAX_QUEUE_SIZE {
            if let Some(dropped) = self.queue.pop_front() {
                self.dropped += 1;
                tracing::debug!("Queue full, dropped oldest entry {}", dropped.url);
            }
        }
        true
    }

    /// Records a URL as seen
    ///
    /// # Returns
    ///
    /// `false` if it was already present
    pub fn mark_seen(&mut self, url: &str) -> bool {
        if self.seen_set.contains(url) {
            return false;
        }

        self.seen_set.insert(url.to_string());
        self.seen.push_back(url.to_string());
        if self.seen.len() > MAX_SEEN_SIZE {
            if let Some(evicted) = self.seen.pop_front() {
                self.seen_set.remove(&evicted);
            }
        }
        true
    }

    pub fn is_seen(&self, url: &str) -> bool {
        self.seen_set.contains(url)
    }

    /// Takes the next entry in FIFO order
    pub fn pop_next(&mut self) -> Option<QueueEntry> {
        self.queue.pop_front()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn seen_len(&self) -> usize {
        self.seen.len()
    }

    /// Queue entries lost to the size cap over this state's lifetime
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    /// Whether the previous pass ran its queue dry
    pub fn is_pass_complete(&self) -> bool {
        self.queue.is_empty()
    }

    /// Forgets `seen`, the queue and the pass document count so the next
    /// seeding recrawls every page
    pub fn start_new_pass(&mut self) {
        self.queue.clear();
        self.seen.clear();
        self.seen_set.clear();
        self.document_count = 0;
        self.dropped = 0;
    }

    /// Puts an interrupted entry back at the head of the queue
    ///
    /// The URL is already in `seen`, so [`CrawlState::enqueue`] would refuse it.
    pub fn requeue(&mut self, entry: QueueEntry) {
        self.mark_seen(&entry.url);
        self.queue.push_front(entry);
    }

    pub fn record_indexed(&mut self) {
        self.document_count += 1;
    }

    pub fn touch(&mut self) {
        self.last_run_at = Some(Utc::now());
    }

    /// Loads persisted state
    ///
    /// # Errors
    ///
    /// Returns [`StateError::SchemaMismatch`] or [`StateError::Corrupted`]
    /// rather than silently starting over.
    pub fn load(path: &Path) -> StateResult<Option<Self>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StateError::Io(e)),
        };

        let corrupted = |reason: String| StateError::Corrupted {
            path: path.display().to_string(),
            reason,
        };

        let header: SchemaHeader =
            serde_json::from_slice(&bytes).map_err(|e| corrupted(e.to_string()))?;
        if header.schema_version != STATE_SCHEMA_VERSION {
            return Err(StateError::SchemaMismatch {
                path: path.display().to_string(),
                found: header.schema_version,
                expected: STATE_SCHEMA_VERSION,
            });
        }

        let mut state: CrawlState =
            serde_json::from_slice(&bytes).map_err(|e| corrupted(e.to_string()))?;
        state.seen_set = state.seen.iter().cloned().collect();
        if state.seen_set.len() != state.seen.len() {
            return Err(corrupted("duplicate entries in seen set".to_string()));
        }

        Ok(Some(state))
    }

    /// Saves with `pending` entries at the head of the persisted queue
    ///
    /// Entries handed to fetch tasks have left the queue but are already
    /// seen. A checkpoint taken while they run must still list them, or a
    /// crash before they finish skips them for the rest of the pass.
    pub fn save_with_pending<'a>(
        &self,
        path: &Path,
        pending: impl IntoIterator<Item = &'a QueueEntry>,
    ) -> StateResult<()> {
        let mut pending = pending.into_iter().peekable();
        if pending.peek().is_none() {
            return self.save(path);
        }

        let mut snapshot = self.clone();
        for entry in pending {
            snapshot.requeue(entry.clone());
        }
        snapshot.save(path)
    }

    pub fn save(&self, path: &Path) -> StateResult<()> {
        let json = serde_json::to_vec(self).map_err(|e| StateError::Corrupted {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        write_atomic(path, &json)?;
        Ok(())
    }
}

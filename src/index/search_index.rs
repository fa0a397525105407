//! Ranked full-text index with JSON persistence

use crate::index::field::FieldIndex;
use crate::index::tokenizer::tokenize_query;
use crate::index::{Document, IndexError, IndexResult};
use crate::url::{is_whitelisted, matches_domain};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// Bumped whenever the persisted layout changes
pub const INDEX_SCHEMA_VERSION: u32 = 1;

pub const TITLE_WEIGHT: f64 = 3.0;
pub const CONTENT_WEIGHT: f64 = 1.0;
pub const DOMAIN_WEIGHT: f64 = 0.5;

/// Multiplier for terms matched only by prefix
pub const PREFIX_WEIGHT: f64 = 0.5;

/// Shortest query term that is expanded by prefix
const MIN_PREFIX_CHARS: usize = 2;

/// Search parameters
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub limit: usize,
    /// Exact-or-subdomain filter on the document's host
    pub domain_filter: Option<String>,
    pub min_score: f64,
    pub offset: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            domain_filter: None,
            min_score: 0.0,
            offset: 0,
        }
    }
}

/// A ranked match
#[derive(Debug, Clone, Copy)]
pub struct ScoredDocument<'a> {
    pub document: &'a Document,
    pub score: f64,
}

/// Aggregate index statistics
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub document_count: usize,
    pub unique_terms: usize,
    pub total_content_chars: usize,
    pub documents_by_domain: BTreeMap<String, usize>,
    pub documents_by_type: BTreeMap<String, usize>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct SchemaHeader {
    schema_version: u32,
}

/// Full-text index over crawled documents
///
/// Identity is the document URL: adding a URL that is already present
/// replaces the earlier document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchIndex {
    schema_version: u32,
    documents: BTreeMap<String, Document>,
    title: FieldIndex,
    content: FieldIndex,
    domain: FieldIndex,
    updated_at: Option<DateTime<Utc>>,
}

impl Default for SearchIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchIndex {
    pub fn new() -> Self {
        Self {
            schema_version: INDEX_SCHEMA_VERSION,
            documents: BTreeMap::new(),
            title: FieldIndex::default(),
            content: FieldIndex::default(),
            domain: FieldIndex::default(),
            updated_at: None,
        }
    }

    /// Inserts a document or replaces the one with the same URL
    ///
    /// # Returns
    ///
    /// `true` if an existing document was replaced
    pub fn add_document(&mut self, document: Document) -> bool {
        let url = document.url.clone();
        let replaced = self.remove_by_url(&url);

        self.title.insert(&url, &document.title);
        self.content.insert(&url, &document.content);
        self.domain.insert(&url, &document.domain);
        self.documents.insert(url, document);
        self.updated_at = Some(Utc::now());

        replaced
    }

    /// Removes a document by canonical URL
    pub fn remove_by_url(&mut self, url: &str) -> bool {
        if self.documents.remove(url).is_none() {
            return false;
        }
        self.title.remove(url);
        self.content.remove(url);
        self.domain.remove(url);
        self.updated_at = Some(Utc::now());
        true
    }

    /// Drops every document whose domain left the whitelist
    ///
    /// # Returns
    ///
    /// The removed URLs
    pub fn retain_domains<S: AsRef<str>>(&mut self, whitelist: &[S]) -> Vec<String> {
        let stale: Vec<String> = self
            .documents
            .values()
            .filter(|doc| !is_whitelisted(&doc.domain, whitelist))
            .map(|doc| doc.url.clone())
            .collect();

        for url in &stale {
            self.remove_by_url(url);
        }
        stale
    }

    pub fn get(&self, url: &str) -> Option<&Document> {
        self.documents.get(url)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    /// Ranked search with OR semantics across query terms
    ///
    /// Each term is scored with BM25 in the title, content and domain fields,
    /// weighted 3.0 / 1.0 / 0.5. Indexed terms that merely start with a query
    /// term contribute at half weight. Ties are broken by URL so paging is
    /// stable.
    ///
    /// # Errors
    ///
    /// [`IndexError::MissingQuery`] when the query is empty or whitespace.
    pub fn search(&self, query: &str, options: &SearchOptions) -> IndexResult<Vec<ScoredDocument<'_>>> {
        if query.trim().is_empty() {
            return Err(IndexError::MissingQuery);
        }

        let terms = tokenize_query(query);
        let mut scores: HashMap<&str, f64> = HashMap::new();

        for term in &terms {
            for (field, weight) in [
                (&self.title, TITLE_WEIGHT),
                (&self.content, CONTENT_WEIGHT),
                (&self.domain, DOMAIN_WEIGHT),
            ] {
                for url in field.postings(term) {
                    *scores.entry(url.as_str()).or_insert(0.0) += weight * field.bm25(term, url);
                }

                if term.chars().count() >= MIN_PREFIX_CHARS {
                    for extended in field.prefix_terms(term) {
                        for url in field.postings(extended) {
                            *scores.entry(url.as_str()).or_insert(0.0) +=
                                weight * PREFIX_WEIGHT * field.bm25(extended, url);
                        }
                    }
                }
            }
        }

        let domain_filter = options
            .domain_filter
            .as_deref()
            .map(|d| d.trim().trim_end_matches('.').to_ascii_lowercase())
            .filter(|d| !d.is_empty());

        let mut hits: Vec<ScoredDocument> = scores
            .into_iter()
            .filter_map(|(url, score)| {
                let document = self.documents.get(url)?;
                Some(ScoredDocument { document, score })
            })
            .filter(|hit| hit.score > 0.0 && hit.score >= options.min_score)
            .filter(|hit| {
                domain_filter
                    .as_deref()
                    .map_or(true, |d| matches_domain(d, &hit.document.domain))
            })
            .collect();

        hits.sort_by(score_ordering);

        Ok(hits
            .into_iter()
            .skip(options.offset)
            .take(options.limit)
            .collect())
    }

    pub fn get_stats(&self) -> IndexStats {
        let mut documents_by_domain = BTreeMap::new();
        let mut documents_by_type = BTreeMap::new();
        let mut total_content_chars = 0;

        for doc in self.documents.values() {
            *documents_by_domain.entry(doc.domain.clone()).or_insert(0) += 1;
            *documents_by_type
                .entry(doc.content_type.as_str().to_string())
                .or_insert(0) += 1;
            total_content_chars += doc.content.chars().count();
        }

        IndexStats {
            document_count: self.documents.len(),
            unique_terms: self.content.term_count(),
            total_content_chars,
            documents_by_domain,
            documents_by_type,
            updated_at: self.updated_at,
        }
    }

    /// Loads an index from disk
    ///
    /// # Errors
    ///
    /// * [`IndexError::NotFound`] when the file does not exist
    /// * [`IndexError::SchemaMismatch`] when it was written by another layout
    /// * [`IndexError::Corrupted`] when it cannot be decoded or is inconsistent
    pub fn load(path: &Path) -> IndexResult<Self> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(IndexError::NotFound(path.display().to_string()));
            }
            Err(e) => return Err(IndexError::Io(e)),
        };

        let corrupted = |reason: String| IndexError::Corrupted {
            path: path.display().to_string(),
            reason,
        };

        let header: SchemaHeader =
            serde_json::from_slice(&bytes).map_err(|e| corrupted(e.to_string()))?;
        if header.schema_version != INDEX_SCHEMA_VERSION {
            return Err(IndexError::SchemaMismatch {
                path: path.display().to_string(),
                found: header.schema_version,
                expected: INDEX_SCHEMA_VERSION,
            });
        }

        let index: SearchIndex =
            serde_json::from_slice(&bytes).map_err(|e| corrupted(e.to_string()))?;

        let consistent = [&index.title, &index.content, &index.domain]
            .iter()
            .all(|field| field.doc_count() == index.documents.len())
            && index.documents.keys().all(|url| index.content.contains_doc(url));
        if !consistent {
            return Err(corrupted(
                "document store and inverted index disagree".to_string(),
            ));
        }

        tracing::debug!("Loaded index with {} documents from {}", index.len(), path.display());
        Ok(index)
    }

    /// Loads the index, or starts empty when the file does not exist yet
    pub fn load_or_default(path: &Path) -> IndexResult<Self> {
        match Self::load(path) {
            Err(IndexError::NotFound(_)) => Ok(Self::new()),
            other => other,
        }
    }

    /// Writes the index atomically (temp file then rename)
    pub fn save(&self, path: &Path) -> IndexResult<()> {
        let json = serde_json::to_vec(self).map_err(|e| IndexError::Corrupted {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        write_atomic(path, &json)?;
        tracing::debug!("Saved index with {} documents to {}", self.len(), path.display());
        Ok(())
    }
}

fn score_ordering(a: &ScoredDocument, b: &ScoredDocument) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.document.url.cmp(&b.document.url))
}

/// Writes `bytes` next to `path` and renames over it
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}

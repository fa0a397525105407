//! Inverted index for a single document field

use crate::index::tokenizer::tokenize;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub(crate) const BM25_K1: f64 = 1.2;
pub(crate) const BM25_B: f64 = 0.75;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub(crate) struct FieldIndex {
    /// term -> urls containing it
    postings: BTreeMap<String, BTreeSet<String>>,
    /// url -> term -> count
    term_freqs: HashMap<String, HashMap<String, u32>>,
    /// url -> number of terms
    doc_lengths: HashMap<String, usize>,
    total_length: usize,
}

impl FieldIndex {
    pub fn insert(&mut self, url: &str, text: &str) {
        self.remove(url);

        let mut term_freq: HashMap<String, u32> = HashMap::new();
        for term in tokenize(text) {
            *term_freq.entry(term).or_insert(0) += 1;
        }

        for term in term_freq.keys() {
            self.postings
                .entry(term.clone())
                .or_default()
                .insert(url.to_string());
        }

        let doc_len = term_freq.values().map(|n| *n as usize).sum::<usize>();
        self.total_length += doc_len;
        self.doc_lengths.insert(url.to_string(), doc_len);
        self.term_freqs.insert(url.to_string(), term_freq);
    }

    pub fn remove(&mut self, url: &str) {
        if let Some(term_freq) = self.term_freqs.remove(url) {
            for term in term_freq.keys() {
                if let Some(urls) = self.postings.get_mut(term) {
                    urls.remove(url);
                    if urls.is_empty() {
                        self.postings.remove(term);
                    }
                }
            }
        }
        if let Some(doc_len) = self.doc_lengths.remove(url) {
            self.total_length = self.total_length.saturating_sub(doc_len);
        }
    }

    pub fn doc_count(&self) -> usize {
        self.doc_lengths.len()
    }

    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    pub fn contains_doc(&self, url: &str) -> bool {
        self.doc_lengths.contains_key(url)
    }

    /// Urls whose field contains `term` exactly
    pub fn postings(&self, term: &str) -> impl Iterator<Item = &String> {
        self.postings.get(term).into_iter().flatten()
    }

    /// Indexed terms that extend `prefix` (the prefix itself excluded)
    pub fn prefix_terms<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a String> + 'a {
        self.postings
            .range::<str, _>((std::ops::Bound::Excluded(prefix), std::ops::Bound::Unbounded))
            .map(|(term, _)| term)
            .take_while(move |term| term.starts_with(prefix))
    }

    /// BM25 contribution of `term` to the document at `url`
    pub fn bm25(&self, term: &str, url: &str) -> f64 {
        let Some(tf) = self.term_freqs.get(url).and_then(|tf| tf.get(term)) else {
            return 0.0;
        };
        let doc_len = self.doc_lengths.get(url).copied().unwrap_or(0);
        let total_docs = self.doc_count();
        if doc_len == 0 || total_docs == 0 {
            return 0.0;
        }

        let df = self.postings.get(term).map_or(0, BTreeSet::len) as f64;
        let n = total_docs as f64;
        let idf = ((n - df + 0.5) / (df + 0.5)).ln_1p().max(0.0);

        let avg_doc_len = (self.total_length as f64 / n).max(1.0);
        let tf = f64::from(*tf);
        let length_norm = BM25_B.mul_add(doc_len as f64 / avg_doc_len, 1.0 - BM25_B);
        let denom = BM25_K1.mul_add(length_norm, tf);
        if denom <= 0.0 {
            return 0.0;
        }
        idf * (tf * (BM25_K1 + 1.0) / denom)
    }
}

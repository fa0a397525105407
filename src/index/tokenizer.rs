/// Words too common to carry ranking signal
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is", "it", "of", "on",
    "or", "that", "the", "this", "to", "was", "with",
];

/// Longest token kept; longer runs are usually hashes or minified code
const MAX_TOKEN_CHARS: usize = 64;

/// Splits text into lowercase index terms
///
/// Terms are runs of alphanumerics and underscores, so `os.listdir` yields
/// `os` and `listdir` while `__init__` stays whole. Stopwords are dropped.
///
/// # Examples
///
/// ```
/// use docsift::index::tokenize;
///
/// assert_eq!(tokenize("The os.listdir() call"), vec!["os", "listdir", "call"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    raw_terms(text)
        .filter(|term| !STOPWORDS.contains(&term.as_str()))
        .collect()
}

/// Tokenizes a query, deduplicated in order
///
/// A query made only of stopwords keeps them rather than matching nothing.
pub fn tokenize_query(query: &str) -> Vec<String> {
    let mut terms = tokenize(query);
    if terms.is_empty() {
        terms = raw_terms(query).collect();
    }

    let mut seen = std::collections::HashSet::new();
    terms.retain(|t| seen.insert(t.clone()));
    terms
}

fn raw_terms(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|piece| !piece.is_empty() && piece.chars().count() <= MAX_TOKEN_CHARS)
        .map(str::to_lowercase)
}

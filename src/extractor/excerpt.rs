/// Builds a short human-readable excerpt
///
/// Fenced code is dropped and inline backticks removed, then the text is
/// cut to at most `max_chars`, preferring the last sentence end in the
/// window. Without a usable sentence end the cut falls on a word boundary
/// and an ellipsis is appended.
pub fn make_excerpt(content: &str, max_chars: usize) -> String {
    let prose = strip_code(content);
    if prose.chars().count() <= max_chars {
        return prose;
    }

    let window: String = prose.chars().take(max_chars).collect();

    let sentence_end = window
        .char_indices()
        .filter(|&(i, c)| {
            matches!(c, '.' | '!' | '?')
                && window[i + c.len_utf8()..]
                    .chars()
                    .next()
                    .map_or(true, char::is_whitespace)
        })
        .map(|(i, c)| i + c.len_utf8())
        .last();

    if let Some(end) = sentence_end {
        if window[..end].chars().count() >= max_chars / 3 {
            return window[..end].trim().to_string();
        }
    }

    let cut = window.rfind(char::is_whitespace).unwrap_or(window.len());
    format!("{}…", window[..cut].trim_end())
}

/// Removes fenced blocks and backticks, flattening the rest to one line
pub(crate) fn strip_code(content: &str) -> String {
    let mut in_fence = false;
    let mut words: Vec<&str> = Vec::new();

    for line in content.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        let line = line.trim().trim_start_matches("- ");
        words.extend(line.split_whitespace());
    }

    words.join(" ").replace('`', "")
}

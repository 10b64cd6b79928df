pub mod drug_mentions;
pub mod fallback;

pub use drug_mentions::*;
pub use fallback::*;

use crate::models::ClinicalSummary;

/// Fill in structured drug mentions mined from free-text clinical context.
///
/// Runs only when the model returned prose context but no structured
/// mentions; model-provided mentions are never overwritten. Returns the
/// number of mentions added.
pub fn enrich_drug_mentions(summary: &mut ClinicalSummary) -> usize {
    if !summary.drug_mentions.is_empty() || summary.clinical_context.trim().is_empty() {
        return 0;
    }

    let mentions = extract_drug_mentions(&summary.clinical_context);
    let added = mentions.len();
    summary.drug_mentions = mentions;
    added
}

/// Byte spans of case-insensitive whole-word occurrences of `term`.
///
/// Boundaries are non-alphanumeric characters, so "diabetes" does not match
/// inside "prediabetes". Multi-word terms match across single spaces.
pub fn whole_word_spans(text: &str, term: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    if term.is_empty() {
        return spans;
    }

    let len = term.len();
    let mut i = 0;
    while i + len <= text.len() {
        if !text.is_char_boundary(i) {
            i += 1;
            continue;
        }
        match text.get(i..i + len) {
            Some(slice)
                if slice.eq_ignore_ascii_case(term)
                    && boundary_before(text, i)
                    && boundary_after(text, i + len) =>
            {
                spans.push((i, i + len));
                i += len;
            }
            _ => i += 1,
        }
    }

    spans
}

/// Case-insensitive whole-word occurrence count
pub fn count_whole_word(text: &str, term: &str) -> usize {
    whole_word_spans(text, term).len()
}

/// Excerpt around a match, ellipsized where it truncates the source
pub fn snippet_around(text: &str, match_start: usize, match_end: usize) -> String {
    const BEFORE: usize = 30;
    const AFTER: usize = 70;

    let mut start = match_start.saturating_sub(BEFORE);
    while !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = (match_end + AFTER).min(text.len());
    while !text.is_char_boundary(end) {
        end += 1;
    }

    let mut snippet = String::new();
    if start > 0 {
        snippet.push_str("...");
    }
    snippet.push_str(text[start..end].trim());
    if end < text.len() {
        snippet.push_str("...");
    }
    snippet
}

fn boundary_before(text: &str, idx: usize) -> bool {
    idx == 0 || text[..idx].chars().next_back().is_some_and(|c| !c.is_alphanumeric())
}

fn boundary_after(text: &str, idx: usize) -> bool {
    idx >= text.len() || text[idx..].chars().next().is_some_and(|c| !c.is_alphanumeric())
}

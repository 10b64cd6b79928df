use std::collections::HashSet;

use crate::models::DrugMention;

use super::{snippet_around, whole_word_spans};

/// Tokens that signal a drug name may sit immediately before or after
const DRUG_INDICATORS: &[&str] = &[
    "medication",
    "medications",
    "drug",
    "drugs",
    "prescription",
    "prescribed",
    "prescribing",
    "dose",
    "dosage",
    "mg",
    "mcg",
    "refill",
    "taking",
    "switching to",
    "authorization for",
];

/// Common capitalized words that are never drug names
const CAPITALIZED_STOPLIST: &[&str] = &[
    "The", "This", "That", "There", "These", "Those", "They", "Then", "Thank", "Thanks",
    "I", "We", "You", "She", "He", "It", "Her", "His", "Our", "Your", "Their",
    "And", "But", "However", "Also", "Okay", "Yes", "No", "Please",
    "Patient", "Doctor", "Agent", "Customer", "Caller", "Pharmacy",
    "Hello", "Good", "Morning", "Afternoon",
];

/// Mine structured drug mentions out of free-text clinical context.
///
/// Candidates come from two passes over each sentence: capitalized words of
/// three or more letters (brand-name shape), and words adjacent to a drug
/// indicator token. Each surviving candidate is counted across the whole
/// context and carries an excerpt around its first occurrence. Noisy by
/// design; results enrich display only and never overwrite model output.
pub fn extract_drug_mentions(context: &str) -> Vec<DrugMention> {
    let mut candidates: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for sentence in rough_sentences(context) {
        let sentence_words = words(sentence);

        for word in &sentence_words {
            if is_capitalized_candidate(word) && !is_stoplisted(word) && seen.insert(word.to_lowercase()) {
                candidates.push((*word).to_string());
            }
        }

        for indicator in DRUG_INDICATORS {
            for neighbor in indicator_neighbors(&sentence_words, indicator) {
                if is_adjacent_candidate(neighbor)
                    && !is_stoplisted(neighbor)
                    && !is_indicator(neighbor)
                    && seen.insert(neighbor.to_lowercase())
                {
                    candidates.push(neighbor.to_string());
                }
            }
        }
    }

    let mut mentions = Vec::new();
    for candidate in candidates {
        let spans = whole_word_spans(context, &candidate);
        let Some(&(start, end)) = spans.first() else { continue };
        mentions.push(DrugMention::new(
            candidate,
            spans.len() as i64,
            snippet_around(context, start, end),
        ));
    }

    mentions
}

fn rough_sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split(['.', '!', '?']).map(str::trim).filter(|s| !s.is_empty())
}

/// Whitespace tokens with edge punctuation stripped
fn words(sentence: &str) -> Vec<&str> {
    sentence
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
        .collect()
}

/// Words immediately before and after each occurrence of `indicator`
fn indicator_neighbors<'a>(sentence_words: &[&'a str], indicator: &str) -> Vec<&'a str> {
    let parts: Vec<&str> = indicator.split_whitespace().collect();
    let mut neighbors = Vec::new();

    if parts.is_empty() || sentence_words.len() < parts.len() {
        return neighbors;
    }

    for i in 0..=sentence_words.len() - parts.len() {
        let matched = sentence_words[i..i + parts.len()]
            .iter()
            .zip(&parts)
            .all(|(w, p)| w.eq_ignore_ascii_case(p));
        if matched {
            if i > 0 {
                neighbors.push(sentence_words[i - 1]);
            }
            if let Some(after) = sentence_words.get(i + parts.len()) {
                neighbors.push(after);
            }
        }
    }

    neighbors
}

fn is_capitalized_candidate(word: &str) -> bool {
    word.chars().next().is_some_and(char::is_uppercase)
        && word.chars().count() >= 3
        && word.chars().all(char::is_alphabetic)
}

fn is_adjacent_candidate(word: &str) -> bool {
    word.chars().count() > 3 && word.chars().all(char::is_alphabetic)
}

fn is_stoplisted(word: &str) -> bool {
    CAPITALIZED_STOPLIST.iter().any(|s| s.eq_ignore_ascii_case(word))
}

fn is_indicator(word: &str) -> bool {
    DRUG_INDICATORS.iter().any(|s| s.eq_ignore_ascii_case(word))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristics::enrich_drug_mentions;
    use crate::models::ClinicalSummary;

    #[test]
    fn test_capitalized_brand_name_extracted() {
        let mentions = extract_drug_mentions("Patient started Ozempic 0.5mg weekly.");

        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].name, "Ozempic");
        assert!(mentions[0].count >= 1);
        assert!(mentions[0].context.contains("Ozempic"));
    }

    #[test]
    fn test_indicator_adjacent_lowercase_name_extracted() {
        let mentions = extract_drug_mentions("they approved authorization for ozempic yesterday");

        assert!(mentions.iter().any(|m| m.name == "ozempic"));
    }

    #[test]
    fn test_stoplist_and_short_words_excluded() {
        let mentions = extract_drug_mentions("The Doctor said However Patient must call us back.");
        assert!(mentions.is_empty());
    }

    #[test]
    fn test_counts_span_the_whole_context() {
        let mentions = extract_drug_mentions("Ozempic was discussed. Later ozempic came up again.");

        let ozempic = mentions.iter().find(|m| m.name == "Ozempic").unwrap();
        assert_eq!(ozempic.count, 2);
    }

    #[test]
    fn test_snippet_is_ellipsized_when_truncated() {
        let context = format!(
            "{} switching to Jardiance after the previous medication caused persistent side effects over several months {}",
            "long preamble about insurance paperwork and hold times",
            "and a long trailing discussion of copay assistance programs"
        );
        let mentions = extract_drug_mentions(&context);

        let jardiance = mentions.iter().find(|m| m.name == "Jardiance").unwrap();
        assert!(jardiance.context.starts_with("..."));
        assert!(jardiance.context.ends_with("..."));
        assert!(jardiance.context.contains("Jardiance"));
    }

    #[test]
    fn test_enrichment_respects_preconditions() {
        // Existing structured mentions are never overwritten
        let mut with_mentions = ClinicalSummary {
            medical_conditions: Vec::new(),
            drug_mentions: vec![DrugMention::new("Humira", 3, "already structured")],
            clinical_context: "Patient started Ozempic recently.".to_string(),
        };
        assert_eq!(enrich_drug_mentions(&mut with_mentions), 0);
        assert_eq!(with_mentions.drug_mentions[0].name, "Humira");

        // Empty context gives the extractor nothing to mine
        let mut no_context = ClinicalSummary::default();
        assert_eq!(enrich_drug_mentions(&mut no_context), 0);
        assert!(no_context.drug_mentions.is_empty());

        // Empty mentions plus prose context triggers extraction
        let mut eligible = ClinicalSummary {
            medical_conditions: Vec::new(),
            drug_mentions: Vec::new(),
            clinical_context: "Patient started Ozempic recently.".to_string(),
        };
        assert_eq!(enrich_drug_mentions(&mut eligible), 1);
        assert_eq!(eligible.drug_mentions[0].name, "Ozempic");
    }
}

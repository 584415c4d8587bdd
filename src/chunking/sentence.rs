//! Sentence-boundary detection used when a single line is too long to embed whole.

use regex::Regex;

/// Splits text into ordered sentences.
///
/// The chunk builder only depends on this trait, so a different tokenizer can
/// be swapped in without touching the chunking algorithm.
pub trait SentenceSplitter: Send + Sync {
    /// Split `text` into sentences, preserving order. Joining the output with
    /// spaces must reproduce the words of the input.
    fn split(&self, text: &str) -> Vec<String>;
}

/// Lowercased tokens that end in a period without ending a sentence.
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "st", "jr", "sr", "vs", "etc", "e.g", "i.e", "no", "approx",
];

/// Punctuation-based splitter.
///
/// Breaks after `.`, `!` or `?` (plus any closing quotes or brackets) when
/// followed by whitespace, except after common abbreviations and single-letter
/// initials.
pub struct PunctuationSplitter {
    boundary: Regex,
}

impl PunctuationSplitter {
    pub fn new() -> Self {
        let boundary = Regex::new(r#"[.!?]+["'\u{201D}\u{2019})\]]*\s+"#).expect("Invalid regex");
        Self { boundary }
    }

    fn is_abbreviation(preceding: &str) -> bool {
        let token = preceding
            .split_whitespace()
            .last()
            .unwrap_or_default()
            .trim_start_matches(['"', '\'', '(', '['])
            .to_lowercase();

        if token.chars().count() == 1 && token.chars().all(char::is_alphabetic) {
            return true;
        }

        ABBREVIATIONS.contains(&token.as_str())
    }
}

impl Default for PunctuationSplitter {
    fn default() -> Self {
        Self::new()
    }
}

impl SentenceSplitter for PunctuationSplitter {
    fn split(&self, text: &str) -> Vec<String> {
        let mut sentences = Vec::new();
        let mut start = 0;

        for m in self.boundary.find_iter(text) {
            let punct_is_period = text[m.start()..].starts_with('.');
            if punct_is_period && Self::is_abbreviation(&text[start..m.start()]) {
                continue;
            }

            let sentence = text[start..m.end()].trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            start = m.end();
        }

        let rest = text[start..].trim();
        if !rest.is_empty() {
            sentences.push(rest.to_string());
        }

        sentences
    }
}

use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use std::collections::HashSet;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)\b\w\w+\b").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        // Contractions split at the apostrophe, so only their leading
        // fragments ("don", "isn") can ever reach this set.
        let words: &[&str] = &[
            "about","above","after","again","against","all","am","an","and","any","are","aren","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","cannot","could","couldn",
            "did","didn","do","does","doesn","doing","don","down","during",
            "each","few","for","from","further",
            "had","hadn","has","hasn","have","haven","having","he","her","here","hers","herself","him","himself","his","how",
            "if","in","into","is","isn","it","its","itself",
            "let","ll","me","more","most","mustn","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "re","same","she","should","shouldn","so","some","such",
            "than","that","the","their","theirs","them","themselves","then","there","these","they","this","those","through","to","too",
            "under","until","up","ve","very",
            "was","wasn","we","were","weren","what","when","where","which","while","who","whom","why","with","won","would","wouldn",
            "you","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

/// Analyzer settings fixed at index build time and re-applied to every query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizerOptions {
    /// Longest n-gram emitted: 1 for unigrams, 2 adds adjacent-word bigrams.
    pub ngram_max: usize,
    pub stop_words: bool,
    pub stem: bool,
}

impl Default for TokenizerOptions {
    fn default() -> Self {
        Self { ngram_max: 1, stop_words: false, stem: false }
    }
}

fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Split text into words using NFKC normalization, lowercase and
/// two-or-more-character word extraction. Stop words and stemming follow `opts`.
pub fn tokenize(text: &str, opts: &TokenizerOptions) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    let mut tokens = Vec::new();
    for mat in RE.find_iter(&normalized) {
        let token = mat.as_str();
        if opts.stop_words && is_stopword(token) { continue; }
        let word = if opts.stem { STEMMER.stem(token).to_string() } else { token.to_string() };
        tokens.push(word);
    }
    tokens
}

/// Expand text into the terms that make up vocabulary columns: every unigram,
/// followed by space-joined bigrams of adjacent surviving words when enabled.
pub fn terms(text: &str, opts: &TokenizerOptions) -> Vec<String> {
    let words = tokenize(text, opts);
    if opts.ngram_max < 2 || words.len() < 2 {
        return words;
    }
    let mut out = Vec::with_capacity(words.len() * 2 - 1);
    out.extend(words.iter().cloned());
    for pair in words.windows(2) {
        out.push(format!("{} {}", pair[0], pair[1]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        let t = tokenize("Rice, rice's fields!", &TokenizerOptions::default());
        assert_eq!(t, vec!["rice", "rice", "fields"]);
    }

    #[test]
    fn single_characters_are_dropped() {
        let t = tokenize("a b NPK", &TokenizerOptions::default());
        assert_eq!(t, vec!["npk"]);
    }

    #[test]
    fn bigrams_follow_unigrams() {
        let opts = TokenizerOptions { ngram_max: 2, ..Default::default() };
        let t = terms("well-drained soil", &opts);
        assert_eq!(t, vec!["well", "drained", "soil", "well drained", "drained soil"]);
    }

    #[test]
    fn contraction_fragments_are_stop_words() {
        let opts = TokenizerOptions { stop_words: true, ..Default::default() };
        assert_eq!(terms("don't isn't can't shouldn't water", &opts), vec!["water"]);
        assert_eq!(terms("We'll say you're right, they've won't", &opts), vec!["say", "right"]);
    }
}

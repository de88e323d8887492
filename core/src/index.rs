use crate::error::{Error, Result};
use crate::tokenizer::{terms, TokenizerOptions};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

pub type TermId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusEntry {
    /// Topic label, expected unique within a corpus.
    #[serde(alias = "topic")]
    pub key: String,
    /// Answer content that gets indexed and returned.
    #[serde(alias = "content")]
    pub text: String,
}

impl CorpusEntry {
    pub fn new(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self { key: key.into(), text: text.into() }
    }
}

/// Term to column mapping. Columns follow lexicographic term order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Vocabulary {
    columns: BTreeMap<String, TermId>,
}

impl Vocabulary {
    pub fn get(&self, term: &str) -> Option<TermId> { self.columns.get(term).copied() }
    pub fn len(&self) -> usize { self.columns.len() }
    pub fn is_empty(&self) -> bool { self.columns.is_empty() }
    pub fn terms(&self) -> impl Iterator<Item = &str> + '_ { self.columns.keys().map(String::as_str) }
}

/// Sparse L2-normalized row, sorted by column.
type Row = Vec<(TermId, f64)>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryParams {
    pub top_k: usize,
    pub threshold: f32,
}

impl Default for QueryParams {
    fn default() -> Self { Self { top_k: 1, threshold: 0.0 } }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match<'a> {
    pub entry: &'a CorpusEntry,
    /// Cosine similarity in [0, 1], accumulated in f64 so an exact
    /// self-match reports 1.0.
    pub score: f32,
    /// Position of the entry in the corpus it was built from.
    pub position: usize,
}

/// Fitted vocabulary plus the normalized TF-IDF matrix of a corpus.
/// Never mutated after [`Index::build_with`] returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Index {
    entries: Vec<CorpusEntry>,
    options: TokenizerOptions,
    vocabulary: Vocabulary,
    idf: Vec<f64>,
    rows: Vec<Row>,
}

impl Index {
    pub fn build(corpus: Vec<CorpusEntry>) -> Result<Self> {
        Self::build_with(corpus, TokenizerOptions::default())
    }

    pub fn build_with(corpus: Vec<CorpusEntry>, options: TokenizerOptions) -> Result<Self> {
        if corpus.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        let ngram_max = options.ngram_max.clamp(1, 2);
        if ngram_max != options.ngram_max {
            tracing::warn!(requested = options.ngram_max, used = ngram_max, "ngram_max out of range");
        }
        let options = TokenizerOptions { ngram_max, ..options };

        let mut seen_keys: HashSet<&str> = HashSet::new();
        for entry in &corpus {
            if !seen_keys.insert(entry.key.as_str()) {
                tracing::warn!(key = %entry.key, "duplicate corpus key");
            }
        }

        // Raw term counts per entry
        let counts: Vec<HashMap<String, u32>> = corpus
            .iter()
            .map(|e| {
                let mut tf: HashMap<String, u32> = HashMap::new();
                for term in terms(&e.text, &options) {
                    *tf.entry(term).or_insert(0) += 1;
                }
                tf
            })
            .collect();

        let all_terms: BTreeSet<&str> = counts.iter().flat_map(|tf| tf.keys().map(String::as_str)).collect();
        if all_terms.is_empty() {
            return Err(Error::NoVocabulary { entries: corpus.len() });
        }
        let columns: BTreeMap<String, TermId> = all_terms
            .into_iter()
            .enumerate()
            .map(|(i, t)| (t.to_string(), i as TermId))
            .collect();
        let vocabulary = Vocabulary { columns };

        let mut df: Vec<u32> = vec![0; vocabulary.len()];
        for tf in &counts {
            for term in tf.keys() {
                if let Some(tid) = vocabulary.get(term) {
                    df[tid as usize] += 1;
                }
            }
        }
        let n = corpus.len() as f64;
        let idf: Vec<f64> = df.iter().map(|&d| ((1.0 + n) / (1.0 + d as f64)).ln() + 1.0).collect();

        let rows: Vec<Row> = counts
            .iter()
            .map(|tf| {
                let raw = tf.iter().filter_map(|(term, &c)| vocabulary.get(term).map(|tid| (tid, c)));
                weigh(raw, &idf)
            })
            .collect();

        tracing::info!(entries = corpus.len(), terms = vocabulary.len(), "index built");
        Ok(Self { entries: corpus, options, vocabulary, idf, rows })
    }

    pub fn entries(&self) -> &[CorpusEntry] { &self.entries }
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
    pub fn vocabulary(&self) -> &Vocabulary { &self.vocabulary }
    pub fn options(&self) -> &TokenizerOptions { &self.options }

    /// First entry carrying `key`.
    pub fn entry(&self, key: &str) -> Option<&CorpusEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// Rank entries against `text`. Results are sorted by descending score with
    /// ties in corpus order; entries scoring below the threshold are dropped.
    pub fn query(&self, text: &str, params: QueryParams) -> Vec<Match<'_>> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let k = params.top_k.max(1);
        // NaN and negatives mean no filtering
        let threshold = if params.threshold > 0.0 { params.threshold } else { 0.0 };

        let q = self.vectorize(text);
        let mut scored: Vec<(usize, f32)> = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| (i, dot(&q, row).clamp(0.0, 1.0) as f32))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0)));

        scored
            .into_iter()
            .take_while(|(_, s)| *s >= threshold)
            .take(k)
            .map(|(position, score)| Match { entry: &self.entries[position], score, position })
            .collect()
    }

    /// Single best answer, or `None` when nothing reaches the threshold.
    pub fn best_match(&self, text: &str, threshold: f32) -> Option<Match<'_>> {
        self.query(text, QueryParams { top_k: 1, threshold }).into_iter().next()
    }

    /// Structural checks for an index that did not come from `build_with`,
    /// such as a decoded snapshot. Querying a failing index would panic.
    pub(crate) fn validate(&self) -> Result<()> {
        let corrupt = |msg: String| Err(Error::CorruptIndex(msg));
        if self.entries.is_empty() {
            return corrupt("no entries".into());
        }
        if self.rows.len() != self.entries.len() {
            return corrupt(format!("{} rows for {} entries", self.rows.len(), self.entries.len()));
        }
        if self.idf.len() != self.vocabulary.len() {
            return corrupt(format!("{} idf weights for {} terms", self.idf.len(), self.vocabulary.len()));
        }
        let columns = self.idf.len();
        if self.vocabulary.columns.values().any(|&tid| tid as usize >= columns) {
            return corrupt("vocabulary column out of range".into());
        }
        if self.rows.iter().flatten().any(|&(tid, _)| tid as usize >= columns) {
            return corrupt("row column out of range".into());
        }
        Ok(())
    }

    /// Project `text` into the fitted column space. Unknown terms are ignored;
    /// the result is empty when nothing overlaps.
    fn vectorize(&self, text: &str) -> Row {
        let mut tf: HashMap<TermId, u32> = HashMap::new();
        for term in terms(text, &self.options) {
            if let Some(tid) = self.vocabulary.get(&term) {
                *tf.entry(tid).or_insert(0) += 1;
            }
        }
        weigh(tf.into_iter(), &self.idf)
    }
}

/// tf * idf per column, sorted by column and scaled to unit length.
fn weigh(raw: impl Iterator<Item = (TermId, u32)>, idf: &[f64]) -> Row {
    let mut row: Row = raw.map(|(tid, c)| (tid, c as f64 * idf[tid as usize])).collect();
    row.sort_by_key(|(tid, _)| *tid);
    let norm = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
        for (_, w) in row.iter_mut() {
            *w /= norm;
        }
    }
    row
}

fn dot(a: &[(TermId, f64)], b: &[(TermId, f64)]) -> f64 {
    let (mut i, mut j) = (0, 0);
    let mut sum = 0.0f64;
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                sum += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    sum
}

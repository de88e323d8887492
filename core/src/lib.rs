//! TF-IDF retrieval over a small question/answer knowledge base.
//!
//! [`build`] fits a vocabulary and a normalized term-weight matrix once per
//! corpus; [`query`] ranks entries by cosine similarity against that fitted
//! space. The loading helpers in [`corpus`] and [`persist`] sit outside the
//! ranking path.

pub mod corpus;
pub mod error;
pub mod index;
pub mod persist;
pub mod tokenizer;

pub use error::{Error, Result};
pub use index::{CorpusEntry, Index, Match, QueryParams, TermId, Vocabulary};
pub use tokenizer::TokenizerOptions;

/// Fit an index over `corpus` with default tokenizer options.
pub fn build(corpus: Vec<CorpusEntry>) -> Result<Index> {
    Index::build(corpus)
}

/// Top `top_k` entries scoring at least `threshold`, best first.
pub fn query<'a>(index: &'a Index, text: &str, top_k: usize, threshold: f32) -> Vec<Match<'a>> {
    index.query(text, QueryParams { top_k, threshold })
}

use thiserror::Error;

/// Failures building or loading an index. Querying never fails.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("corpus is empty")]
    EmptyCorpus,

    #[error("corpus has no indexable terms ({entries} entries, all empty or stop words only)")]
    NoVocabulary { entries: usize },

    #[error("index is inconsistent: {0}")]
    CorruptIndex(String),
}

pub type Result<T> = std::result::Result<T, Error>;

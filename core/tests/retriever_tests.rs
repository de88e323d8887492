use agro_core::corpus::builtin_corpus;
use agro_core::{build, query, CorpusEntry, Error, Index, QueryParams, TokenizerOptions};
use quickcheck::TestResult;
use quickcheck_macros::quickcheck;

const WORDS: &[&str] = &[
    "wheat", "rice", "soil", "water", "clay", "loamy", "rain", "sun", "npk", "urea",
    "seed", "crop", "field", "drip", "mulch", "pest", "weed", "harvest",
];

fn sentence(picks: &[u8]) -> String {
    picks.iter().map(|p| WORDS[*p as usize % WORDS.len()]).collect::<Vec<_>>().join(" ")
}

fn corpus_from(picks: &[Vec<u8>]) -> Vec<CorpusEntry> {
    picks.iter().enumerate().map(|(i, p)| CorpusEntry::new(format!("e{i}"), sentence(p))).collect()
}

#[test]
fn rice_question_prefers_rice_entry() {
    let index = build(vec![
        CorpusEntry::new("wheat", "Wheat needs cool weather and well-drained soil."),
        CorpusEntry::new("rice", "Rice requires standing water in fields."),
    ])
    .unwrap();
    let hits = query(&index, "water for rice fields", 2, 0.0);
    assert_eq!(hits[0].entry.key, "rice");
    assert!(hits[0].score > hits[1].score);
}

#[test]
fn unrelated_query_is_below_threshold() {
    let index = build(vec![CorpusEntry::new("fertilizer", "Use NPK fertilizers based on soil test.")]).unwrap();
    assert!(query(&index, "unrelated xyz query", 1, 0.5).is_empty());
    // without a threshold the only entry comes back with an honest zero
    let hits = query(&index, "unrelated xyz query", 1, 0.0);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].score, 0.0);
}

#[test]
fn blank_queries_return_nothing() {
    let index = build(builtin_corpus()).unwrap();
    assert!(query(&index, "", 1, 0.0).is_empty());
    assert!(query(&index, "   \t\n", 3, 0.0).is_empty());
}

#[test]
fn negative_threshold_means_no_filtering() {
    let index = build(builtin_corpus()).unwrap();
    let all = query(&index, "soil", 5, -1.0);
    assert_eq!(all.len(), 5);
    assert_eq!(all, query(&index, "soil", 5, 0.0));
}

#[test]
fn nan_threshold_means_no_filtering() {
    let index = build(builtin_corpus()).unwrap();
    assert_eq!(query(&index, "soil", 5, f32::NAN), query(&index, "soil", 5, 0.0));
    assert_eq!(query(&index, "qwerty", 2, f32::NAN).len(), 2);
}

#[test]
fn duplicate_keys_rank_independently() {
    let index = build(vec![
        CorpusEntry::new("rice", "Rice requires standing water."),
        CorpusEntry::new("wheat", "Wheat needs cool weather."),
        CorpusEntry::new("rice", "Transplant rice seedlings into puddled fields."),
    ])
    .unwrap();
    let hits = query(&index, "rice seedlings", 3, 0.0);
    assert_eq!(hits[0].position, 2);
    assert_eq!(hits[1].position, 0);
    assert!(hits[0].score > hits[1].score);
    assert_eq!(index.entry("rice").unwrap().text, "Rice requires standing water.");
}

#[test]
fn builtin_entries_match_themselves_exactly() {
    let index = build(builtin_corpus()).unwrap();
    for (i, entry) in index.entries().iter().enumerate() {
        let top = index.best_match(&entry.text, 0.0).unwrap();
        assert_eq!(top.position, i);
        assert_eq!(top.score, 1.0);
    }
}

#[test]
fn threshold_above_best_score_is_empty() {
    let index = build(builtin_corpus()).unwrap();
    let best = index.best_match("clay soil moisture", 0.0).unwrap();
    assert_eq!(best.entry.key, "rice");
    assert!(query(&index, "clay soil moisture", 3, best.score + 0.01).is_empty());
}

#[test]
fn builtin_corpus_answers_questions() {
    let index = build(builtin_corpus()).unwrap();
    let ask = |q: &str| index.best_match(q, 0.1).map(|m| m.entry.key.clone());
    assert_eq!(ask("how much fertilizer NPK should I use").as_deref(), Some("fertilizer"));
    assert_eq!(ask("tropical rainfall crop").as_deref(), Some("sugarcane"));
    assert_eq!(ask("tomatoes sunlight").as_deref(), Some("tomato"));
    assert_eq!(ask("qwerty"), None);
}

#[test]
fn empty_corpus_is_rejected() {
    assert_eq!(build(Vec::new()).unwrap_err(), Error::EmptyCorpus);
}

#[test]
fn corpus_without_terms_is_rejected() {
    let corpus = vec![CorpusEntry::new("a", "the and of"), CorpusEntry::new("b", "  ! ")];
    let opts = TokenizerOptions { stop_words: true, ..Default::default() };
    assert_eq!(Index::build_with(corpus, opts).unwrap_err(), Error::NoVocabulary { entries: 2 });
}

#[test]
fn bigrams_reward_phrase_order() {
    let corpus = vec![
        CorpusEntry::new("a", "soil water"),
        CorpusEntry::new("b", "water soil"),
    ];
    let unigram = Index::build(corpus.clone()).unwrap();
    let hits = unigram.query("water soil", QueryParams { top_k: 2, threshold: 0.0 });
    assert_eq!(hits[0].score, hits[1].score);

    let opts = TokenizerOptions { ngram_max: 2, ..Default::default() };
    let bigram = Index::build_with(corpus, opts).unwrap();
    let hits = bigram.query("water soil", QueryParams { top_k: 2, threshold: 0.0 });
    assert_eq!(hits[0].entry.key, "b");
    assert!(hits[0].score > hits[1].score);
}

#[test]
fn rebuild_is_deterministic() {
    let a = build(builtin_corpus()).unwrap();
    let b = build(builtin_corpus()).unwrap();
    for q in ["rice water", "soil", "npk urea", "unknown"] {
        let ra: Vec<(String, f32)> = query(&a, q, 5, 0.0).iter().map(|m| (m.entry.key.clone(), m.score)).collect();
        let rb: Vec<(String, f32)> = query(&b, q, 5, 0.0).iter().map(|m| (m.entry.key.clone(), m.score)).collect();
        assert_eq!(ra, rb);
    }
}

#[quickcheck]
fn scores_stay_in_unit_interval(docs: Vec<Vec<u8>>, q: Vec<u8>) -> TestResult {
    let index = match build(corpus_from(&docs)) {
        Ok(index) => index,
        Err(_) => return TestResult::discard(),
    };
    let hits = query(&index, &sentence(&q), index.len(), 0.0);
    TestResult::from_bool(hits.iter().all(|m| (0.0..=1.0).contains(&m.score)))
}

#[quickcheck]
fn query_is_deterministic(docs: Vec<Vec<u8>>, q: Vec<u8>, k: u8) -> TestResult {
    let index = match build(corpus_from(&docs)) {
        Ok(index) => index,
        Err(_) => return TestResult::discard(),
    };
    let text = sentence(&q);
    let top_k = k as usize % 4 + 1;
    TestResult::from_bool(query(&index, &text, top_k, 0.1) == query(&index, &text, top_k, 0.1))
}

#[quickcheck]
fn entry_text_matches_itself(docs: Vec<Vec<u8>>, pick: usize) -> TestResult {
    let docs: Vec<Vec<u8>> = docs.into_iter().filter(|d| !d.is_empty()).collect();
    let corpus = corpus_from(&docs);
    let index = match build(corpus) {
        Ok(index) => index,
        Err(_) => return TestResult::discard(),
    };
    let target = pick % index.len();
    let text = index.entries()[target].text.clone();
    let hits = query(&index, &text, index.len(), 0.0);
    let own = hits.iter().find(|m| m.position == target).map(|m| m.score).unwrap_or(0.0);
    TestResult::from_bool((hits[0].score - 1.0).abs() < 1e-4 && (own - 1.0).abs() < 1e-4)
}

use agro_core::corpus::builtin_corpus;
use agro_core::tokenizer::{terms, TokenizerOptions};
use agro_core::{build, query, Index};
use criterion::{criterion_group, criterion_main, Criterion};

fn bench_tokenize(c: &mut Criterion) {
    let text: String = builtin_corpus().into_iter().map(|e| e.text).collect::<Vec<_>>().join(" ");
    let opts = TokenizerOptions { ngram_max: 2, ..Default::default() };
    c.bench_function("terms_bigrams", |b| b.iter(|| terms(&text, &opts)));
}

fn bench_build(c: &mut Criterion) {
    c.bench_function("build_builtin", |b| b.iter(|| build(builtin_corpus())));
}

fn bench_query(c: &mut Criterion) {
    let index: Index = match build(builtin_corpus()) {
        Ok(index) => index,
        Err(err) => panic!("builtin corpus failed to index: {err}"),
    };
    c.bench_function("query_top3", |b| b.iter(|| query(&index, "how much water does rice need", 3, 0.0).len()));
}

criterion_group!(benches, bench_tokenize, bench_build, bench_query);
criterion_main!(benches);

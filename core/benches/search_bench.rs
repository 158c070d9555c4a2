use criterion::{criterion_group, criterion_main, Criterion};
use docindex_core::tokenizer::tokenize;
use docindex_core::DocumentIndex;

const WORDS: &[&str] = &[
    "invoice", "receipt", "total", "meeting", "notes", "document", "documentation", "scan",
    "contract", "payment", "quarterly", "report", "summary", "budget", "agenda", "signature",
];

fn synthetic_text(seed: usize, len: usize) -> String {
    (0..len)
        .map(|i| WORDS[(seed * 31 + i * 7) % WORDS.len()])
        .collect::<Vec<_>>()
        .join(" ")
}

fn bench_tokenize(c: &mut Criterion) {
    let text = synthetic_text(1, 2_000);
    c.bench_function("tokenize_2k_words", |b| b.iter(|| tokenize(&text).count()));
}

fn bench_search(c: &mut Criterion) {
    let index = DocumentIndex::new(500);
    for i in 0..1_000 {
        index
            .index_document(&format!("doc-{i}"), "bench", "txt", &synthetic_text(i, 300))
            .expect("index bench document");
    }
    c.bench_function("search_exact_1k_docs", |b| b.iter(|| index.search("invoice report", 20)));
    c.bench_function("search_prefix_1k_docs", |b| b.iter(|| index.search("docu", 20)));
}

criterion_group!(benches, bench_tokenize, bench_search);
criterion_main!(benches);

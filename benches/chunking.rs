use chat_kb::ingestion::{ChunkAssembler, Chunker, SourceDocument};
use chat_kb::tokenizer::Tokenizer;
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn build_document() -> SourceDocument {
    let sentences = [
        "The knowledge base ingests raw post content and splits it into token-budgeted chunks",
        "Each chunk is embedded by an external service and persisted alongside its vector",
        "Queries are embedded the same way and ranked against the stored vectors",
        "Cosine similarity with a configurable threshold decides which chunks qualify",
    ];
    let content = sentences.join(". ").repeat(120);

    SourceDocument {
        id: Some("bench-doc".to_string()),
        title: "Benchmark Document".to_string(),
        content,
    }
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let tokenizer = Tokenizer::new().expect("can load vocabulary");
    let chunker = Chunker::new(tokenizer.clone());
    let assembler = ChunkAssembler::new(tokenizer, chunker, 1000);
    let document = build_document();

    c.bench_function("chunking", |b| {
        b.iter(|| assembler.chunk_document(black_box(&document)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

//! Benchmarks for normalization and segmentation.
//!
//! Both run on every content change during streaming, so they must stay
//! linear and cheap.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use markstream::normalize::normalize;
use markstream::segment::segment;

fn chat_reply(paragraphs: usize) -> String {
    let mut out = String::new();
    for i in 0..paragraphs {
        if i % 4 == 3 {
            out.push_str("```rust\nfn step() -> usize {\n    1\n}\n```\n\n");
        } else {
            out.push_str("Some prose with inline \\(x_i\\) math and a [link](https://example.com).\n\n");
        }
    }
    out
}

fn bench_segment_simple(c: &mut Criterion) {
    let md = "a\n\nb\n\nc";
    c.bench_function("segment_simple", |b| b.iter(|| segment(black_box(md))));
}

fn bench_segment_chat_reply(c: &mut Criterion) {
    let md = chat_reply(64);
    c.bench_function("segment_chat_reply", |b| b.iter(|| segment(black_box(&md))));
}

fn bench_segment_unterminated_fence(c: &mut Criterion) {
    let mut md = chat_reply(32);
    md.push_str("```python\nstill streaming");
    c.bench_function("segment_unterminated_fence", |b| {
        b.iter(|| segment(black_box(&md)))
    });
}

fn bench_normalize_chat_reply(c: &mut Criterion) {
    let md = chat_reply(64);
    c.bench_function("normalize_chat_reply", |b| {
        b.iter(|| normalize(black_box(&md)))
    });
}

criterion_group!(
    benches,
    bench_segment_simple,
    bench_segment_chat_reply,
    bench_segment_unterminated_fence,
    bench_normalize_chat_reply
);
criterion_main!(benches);

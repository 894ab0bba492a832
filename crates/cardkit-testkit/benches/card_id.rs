use criterion::{black_box, criterion_group, criterion_main, Criterion};

use cardkit_core::{generate_card_id, parse_card, take_snapshot, Ed25519Crypto};
use cardkit_testkit::fixtures::TestFixture;

fn bench_card_id(c: &mut Criterion) {
    let fixture = TestFixture::with_seed([0x42; 32]);
    let model = fixture.make_model("alice", 1_736_870_400, None);
    let crypto = Ed25519Crypto::new();

    c.bench_function("generate_card_id", |b| {
        b.iter(|| generate_card_id(&crypto, black_box(model.content_snapshot())))
    });

    let content = model.content().expect("fixture content decodes");
    c.bench_function("take_snapshot/content", |b| {
        b.iter(|| take_snapshot(black_box(&content)))
    });

    c.bench_function("parse_card", |b| {
        b.iter(|| parse_card(&crypto, black_box(&model), false))
    });
}

criterion_group!(benches, bench_card_id);
criterion_main!(benches);

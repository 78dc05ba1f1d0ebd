//! # Move Signature Benchmarks
//!
//! Encoding and signing happen once per round; these keep an eye on the
//! cost of the k256 path.
//!
//! Run with: cargo bench -p rann_blockchain --bench signature_benchmark

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rann_blockchain::MoveSigner;
use rann_shared::{Move, MoveDecision};

const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

fn bench_encode(c: &mut Criterion) {
    let decision = MoveDecision::new(Move::Special, Move::Recover);
    c.bench_function("encode_and_digest", |b| {
        b.iter(|| MoveSigner::digest(black_box(decision)));
    });
}

fn bench_sign(c: &mut Criterion) {
    let Ok(signer) = MoveSigner::from_hex_key(DEV_KEY) else {
        return;
    };
    let decision = MoveDecision::new(Move::Strike, Move::Dodge);
    c.bench_function("sign_move_pair", |b| {
        b.iter(|| signer.sign(black_box(decision)));
    });
}

criterion_group!(benches, bench_encode, bench_sign);
criterion_main!(benches);

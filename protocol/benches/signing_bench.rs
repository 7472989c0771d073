// Signing & recovery benchmarks for the escrow relay primitives.
//
// Covers secp256k1 keypair generation, authorization-style payload encoding
// and hashing, message signing, and signer recovery at various batch sizes.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use escrow_protocol::crypto::hash::keccak256;
use escrow_protocol::crypto::keys::EscrowKeypair;
use escrow_protocol::crypto::signatures::{recover_message_signer, sign_message_hash};
use escrow_protocol::encoding::PackedEncoder;
use escrow_protocol::{Address, Nonce};

fn sample_payload(nonce: u64) -> Vec<u8> {
    PackedEncoder::new()
        .nonce(&Nonce::from(nonce))
        .address(&Address::new([0x11; 20]))
        .uint(20_000_000_000)
        .address(&Address::new([0x22; 20]))
        .uint(1_000_000_000_000_000)
        .uint(500_000_000)
        .finish()
}

fn bench_keypair_generation(c: &mut Criterion) {
    c.bench_function("secp256k1/keypair_generate", |b| {
        b.iter(EscrowKeypair::generate);
    });
}

fn bench_authorization_hash(c: &mut Criterion) {
    c.bench_function("keccak256/authorization_hash", |b| {
        b.iter(|| keccak256(&sample_payload(42)));
    });
}

fn bench_sign_message(c: &mut Criterion) {
    let keypair = EscrowKeypair::generate();
    let hash = keccak256(&sample_payload(42));

    c.bench_function("secp256k1/sign_message_hash", |b| {
        b.iter(|| sign_message_hash(&keypair, &hash).unwrap());
    });
}

fn bench_recover_signer(c: &mut Criterion) {
    let keypair = EscrowKeypair::generate();
    let hash = keccak256(&sample_payload(42));
    let signature = sign_message_hash(&keypair, &hash).unwrap();

    c.bench_function("secp256k1/recover_signer", |b| {
        b.iter(|| recover_message_signer(&hash, signature.as_ref()).unwrap());
    });
}

fn bench_batch_recover(c: &mut Criterion) {
    let mut group = c.benchmark_group("secp256k1/batch_recover");

    for size in [10, 50, 100] {
        let items: Vec<_> = (0..size)
            .map(|i| {
                let kp = EscrowKeypair::generate();
                let hash = keccak256(&sample_payload(i));
                let sig = sign_message_hash(&kp, &hash).unwrap();
                (hash, sig)
            })
            .collect();

        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &items, |b, items| {
            b.iter(|| {
                for (hash, sig) in items {
                    recover_message_signer(hash, sig.as_ref()).unwrap();
                }
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_keypair_generation,
    bench_authorization_hash,
    bench_sign_message,
    bench_recover_signer,
    bench_batch_recover,
);
criterion_main!(benches);

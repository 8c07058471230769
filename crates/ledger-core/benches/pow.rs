use criterion::{criterion_group, criterion_main, Criterion};
use ledger_core::{Block, ProofOfWork, Transaction, TxInput, TxOutput};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::hint::black_box;

fn template(bits: u32) -> Block {
    let mut rng = StdRng::seed_from_u64(42);
    let funding = Transaction::coinbase("alice").unwrap();
    let txs: Vec<Transaction> = (0..10)
        .map(|i| {
            Transaction::new(
                vec![TxInput {
                    txid: funding.id,
                    vout: 0,
                    script_sig: format!("alice-{i}"),
                }],
                vec![TxOutput::new(rng.gen_range(1..10), "bob")],
            )
            .unwrap()
        })
        .collect();

    Block {
        timestamp: 1_700_000_000,
        transactions: txs,
        prev_block_hash: Some([7u8; 32]),
        hash: [0u8; 32],
        nonce: 0,
        height: 1,
        target_bits: bits,
    }
}

fn bench_pow(c: &mut Criterion) {
    let block = template(16);
    let pow = ProofOfWork::new(16).unwrap();

    c.bench_function("solve_target_16", |b| {
        b.iter(|| pow.solve(black_box(&block)).unwrap());
    });
    c.bench_function("solve_parallel_target_16", |b| {
        b.iter(|| pow.solve_parallel(black_box(&block)).unwrap());
    });

    let (nonce, hash) = pow.solve(&block).unwrap();
    let mined = Block { nonce, hash, ..block.clone() };
    c.bench_function("validate", |b| {
        b.iter(|| assert!(pow.validate(black_box(&mined))));
    });
}

criterion_group!(benches, bench_pow);
criterion_main!(benches);

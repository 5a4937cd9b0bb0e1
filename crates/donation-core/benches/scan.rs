use criterion::{criterion_group, criterion_main, Criterion};
use donation_core::Ledger;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Balance and integrity queries are linear scans over the whole chain;
/// this tracks what that costs at a thousand blocks.
fn bench_scan(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let mut ledger = Ledger::in_memory();
    for _ in 0..1_000 {
        for _ in 0..5 {
            ledger
                .add_transaction(
                    format!("donor-{}", rng.gen_range(0..50)),
                    "shelter".to_string(),
                    rng.gen_range(1..10_000),
                    String::new(),
                )
                .unwrap();
        }
        ledger.mine().unwrap();
    }

    c.bench_function("verify_1000_blocks", |b| b.iter(|| ledger.verify()));
    c.bench_function("balance_of_1000_blocks", |b| {
        b.iter(|| ledger.balance_of("shelter"))
    });
}

criterion_group!(benches, bench_scan);
criterion_main!(benches);

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use std::thread;
use std::time::{Duration, Instant};

use ledger_core::Money;
use ledger_infra::{InMemoryAccountStore, Ledger, LedgerConfig, TransferProcessor};
use ledger_infra::store::AccountStore;
use ledger_transfers::{Account, TransferMoney};

fn eur(amount: i64) -> Money {
    Money::of(amount, "EUR").unwrap()
}

fn seeded_store(accounts: usize, balance: i64) -> InMemoryAccountStore {
    let store = InMemoryAccountStore::new();
    for i in 0..accounts {
        store
            .open(Account::new(format!("acc-{i}"), "Bench", "Mark", eur(balance)))
            .unwrap();
    }
    store
}

/// Processor alone: validation plus two account writes, no bus.
fn bench_processor_handle(c: &mut Criterion) {
    let mut group = c.benchmark_group("processor_handle");
    group.throughput(Throughput::Elements(1));

    group.bench_function("successful_transfer", |b| {
        let processor = TransferProcessor::new(seeded_store(2, i64::MAX / 4));
        b.iter(|| {
            let command = TransferMoney::new("acc-0", "acc-1", eur(1));
            black_box(processor.handle(&command).unwrap());
        });
    });

    group.bench_function("duplicate_rejected", |b| {
        let processor = TransferProcessor::new(seeded_store(2, 1_000));
        let command = TransferMoney::new("acc-0", "acc-1", eur(1));
        processor.handle(&command).unwrap();
        b.iter(|| black_box(processor.handle(&command).unwrap()));
    });

    group.bench_function("insufficient_balance", |b| {
        let processor = TransferProcessor::new(seeded_store(2, 0));
        b.iter(|| {
            let command = TransferMoney::new("acc-0", "acc-1", eur(1));
            black_box(processor.handle(&command).unwrap());
        });
    });

    group.finish();
}

/// End to end: submit a batch and wait until every outcome is recorded.
fn bench_pipeline_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_throughput");
    group.sample_size(20);

    for batch_size in [10usize, 100, 1_000].iter() {
        group.throughput(Throughput::Elements(*batch_size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            batch_size,
            |b, &size| {
                let ledger =
                    Ledger::start_with_store(seeded_store(8, 1_000_000), LedgerConfig::default())
                        .unwrap();
                b.iter(|| {
                    let ids: Vec<_> = (0..size)
                        .map(|i| {
                            let from = format!("acc-{}", i % 8);
                            let to = format!("acc-{}", (i + 1) % 8);
                            ledger
                                .submit_transfer(TransferMoney::new(from, to, eur(1)))
                                .unwrap()
                        })
                        .collect();

                    let deadline = Instant::now() + Duration::from_secs(30);
                    for id in &ids {
                        while ledger.find_transfer_outcome(id).is_none() {
                            assert!(Instant::now() < deadline, "pipeline stalled");
                            thread::yield_now();
                        }
                    }
                });
                ledger.stop();
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_processor_handle, bench_pipeline_throughput);
criterion_main!(benches);

//! Benchmarks for the Kodigo document store
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kodigo::store::*;
use tempfile::tempdir;

fn task(i: i64) -> NewDocument {
    NewDocument::new()
        .field("task_text", format!("task {}", i))
        .field("is_completed", i % 2 == 0)
        .field("created_at", i)
}

fn bench_insert(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("insert");
    group.throughput(Throughput::Elements(1));

    group.bench_function("no_subscribers", |b| {
        let store = MemoryStore::in_memory();
        let mut i = 0;
        b.iter(|| {
            i += 1;
            rt.block_on(async { store.add("todos", black_box(task(i))).await.unwrap() })
        });
    });

    group.bench_function("server_timestamp", |b| {
        let store = MemoryStore::in_memory();
        b.iter(|| {
            rt.block_on(async {
                store
                    .add(
                        "messages",
                        NewDocument::new()
                            .field("text", "hola")
                            .server_timestamp("createdAt"),
                    )
                    .await
                    .unwrap()
            })
        });
    });

    group.finish();
}

/// Cost of one commit as the collection and its subscriber count grow
fn bench_fanout(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("snapshot_fanout");

    for (documents, subscribers) in [(100, 1), (100, 10), (1000, 1), (1000, 10)] {
        let store = MemoryStore::in_memory();
        let mut live = Vec::new();

        rt.block_on(async {
            for i in 0..documents {
                store.add("todos", task(i)).await.unwrap();
            }
            for _ in 0..subscribers {
                live.push(
                    store
                        .subscribe(Query::new("todos", "created_at"))
                        .await
                        .unwrap(),
                );
            }
        });

        group.throughput(Throughput::Elements(subscribers as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}docs_{}subs", documents, subscribers)),
            &documents,
            |b, _| {
                b.iter(|| {
                    rt.block_on(async {
                        let id = store.add("todos", task(-1)).await.unwrap();
                        store.delete("todos", &id).await.unwrap();
                        // Take the latest snapshot, as a live view would
                        for sub in live.iter_mut() {
                            while let Ok(Some(_)) = tokio::time::timeout(
                                std::time::Duration::ZERO,
                                sub.next(),
                            )
                            .await
                            {}
                        }
                    })
                });
            },
        );
    }

    group.finish();
}

fn bench_flush(c: &mut Criterion) {
    let mut group = c.benchmark_group("persist");
    let rt = tokio::runtime::Runtime::new().unwrap();

    group.bench_function("flush_1000", |b| {
        let dir = tempdir().unwrap();
        let store = MemoryStore::new(MemoryStoreConfig::persistent(dir.path())).unwrap();
        rt.block_on(async {
            for i in 0..1000 {
                store.add("todos", task(i)).await.unwrap();
            }
        });

        b.iter(|| {
            rt.block_on(async {
                let id = store.add("todos", task(-1)).await.unwrap();
                store.delete("todos", &id).await.unwrap();
            });
            store.flush().unwrap()
        });
    });

    group.finish();
}

criterion_group!(benches, bench_insert, bench_fanout, bench_flush);
criterion_main!(benches);

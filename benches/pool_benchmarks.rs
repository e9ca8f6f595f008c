use criterion::{criterion_group, criterion_main, Criterion, BenchmarkId, Throughput};
use elastic_pool::{Config as PoolConfig, ElasticPool, SubmitError};
use std::{hint::black_box, thread, time::Duration};


fn create_pool(workers: usize) -> ElasticPool {
    ElasticPool::with_config(PoolConfig {
        min_workers: workers,
        max_workers: workers,
        queue_capacity: 4096,
        ..Default::default()
    })
    .unwrap()
}

/// Отправка с повтором: переполнение очереди здесь не ошибка, а backpressure
fn submit_retrying<F>(pool: &ElasticPool, f: F)
where
    F: FnOnce() + Send + Clone + 'static,
{
    loop {
        match pool.submit(f.clone()) {
            Ok(()) => return,
            Err(SubmitError::CapacityExceeded { .. }) => thread::yield_now(),
            Err(err) => panic!("pool rejected task: {}", err),
        }
    }
}

fn wait_completed(pool: &ElasticPool, target: usize) {
    while pool.metrics().completed < target {
        thread::yield_now();
    }
}

// Benchmark 1: Submit overhead
fn bench_submit_overhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit_overhead");

    for size in [100, 1000, 10000] {
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(
            BenchmarkId::new("fire_and_forget", size),
            &size,
            |b, &size| {
                let pool = create_pool(num_cpus::get());
                let mut done = 0;
                b.iter(|| {
                    for i in 0..size {
                        submit_retrying(&pool, move || {
                            black_box(i);
                        });
                    }
                    done += size;
                    wait_completed(&pool, done);
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("with_handle", size),
            &size,
            |b, &size| {
                let pool = create_pool(num_cpus::get());
                b.iter(|| {
                    let handles: Vec<_> = (0..size)
                        .map(|i| loop {
                            match pool.submit_with_handle(move || black_box(i)) {
                                Ok(handle) => break handle,
                                Err(_) => thread::yield_now(),
                            }
                        })
                        .collect();

                    for handle in handles {
                        black_box(handle.blocking_wait().unwrap());
                    }
                });
            },
        );

        // tokio baseline
        group.bench_with_input(
            BenchmarkId::new("tokio_spawn_blocking", size),
            &size,
            |b, &size| {
                let rt = tokio::runtime::Runtime::new().unwrap();

                b.to_async(&rt).iter(|| async move {
                    let handles: Vec<_> = (0..size)
                        .map(|i| tokio::task::spawn_blocking(move || black_box(i)))
                        .collect();

                    for handle in handles {
                        black_box(handle.await.unwrap());
                    }
                });
            },
        );
    }

    group.finish();
}

// Benchmark 2: Elastic growth against a fixed pool
fn bench_growth(c: &mut Criterion) {
    let mut group = c.benchmark_group("growth");
    group.sample_size(10);

    let task = || thread::sleep(Duration::from_millis(1));

    group.bench_function("fixed_2", |b| {
        let pool = create_pool(2);
        let mut done = 0;
        b.iter(|| {
            for _ in 0..200 {
                submit_retrying(&pool, task);
            }
            done += 200;
            wait_completed(&pool, done);
        });
    });

    group.bench_function("elastic_2_to_16", |b| {
        let pool = ElasticPool::with_config(PoolConfig {
            min_workers: 2,
            max_workers: 16,
            queue_capacity: 256,
            backlog_threshold: 8,
            monitor_interval: Duration::from_millis(5),
            idle_timeout: Duration::from_secs(1),
            ..Default::default()
        })
        .unwrap();
        let mut done = 0;
        b.iter(|| {
            for _ in 0..200 {
                submit_retrying(&pool, task);
            }
            done += 200;
            wait_completed(&pool, done);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_submit_overhead, bench_growth);

criterion_main!(benches);

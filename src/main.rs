use elastic_pool::{Config, ElasticPool, ShutdownMode};
use std::{
    thread,
    time::{Duration, Instant},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};


fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "elastic_pool=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let pool = match ElasticPool::with_config(Config {
        shutdown_mode: ShutdownMode::Drain,
        ..Default::default()
    }) {
        Ok(pool) => pool,
        Err(err) => {
            tracing::error!(%err, "failed to start pool");
            return;
        }
    };

    let now = Instant::now();
    for id in 1..=30u64 {
        // от 500мс до 1.5с на задачу
        let work = Duration::from_millis(500 + (id * 397) % 1000);
        let submitted = pool.submit(move || {
            thread::sleep(work);
            tracing::info!(task = id, ?work, "task done");
        });

        if let Err(err) = submitted {
            tracing::warn!(task = id, %err, "task rejected");
        }
        thread::sleep(Duration::from_millis(200));
    }

    tracing::info!(workers = pool.current_workers(), "all tasks submitted, waiting for idle workers to retire");
    thread::sleep(Duration::from_secs(8));

    pool.shutdown();
    pool.join();
    let metrics = pool.metrics();
    tracing::info!(
        elapsed = ?now.elapsed(),
        completed = metrics.completed,
        rejected = metrics.rejected,
        workers = metrics.current_workers,
        "done"
    );
}

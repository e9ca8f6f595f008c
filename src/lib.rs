//! Эластичный пул потоков для синхронных задач
//!
//! # Features
//! - Ограниченная FIFO очередь: `submit` не блокируется и сразу отказывает при переполнении
//! - Рост по глубине очереди через фоновый монитор
//! - Сжатие за счет воркеров, которые уходят после простоя, но не ниже минимума
//! - Остановка сразу или с дочитыванием очереди
//! - Перехват паник в задачах и метрики пула
//! - Handle на результат для задач, которым он нужен

pub mod errors;
pub mod handle;
pub mod model;
pub mod pool;
pub mod queue;
pub mod result;
pub mod signal;
pub mod worker;

mod monitor;

pub use errors::{PoolError, SpawnError, SubmitError};
pub use handle::{JoinHandle, Task};
pub use model::{PoolMetrics, ShutdownMode};
pub use pool::{Config, ElasticPool};

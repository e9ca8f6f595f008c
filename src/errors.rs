use thiserror::Error;


/// Ошибки создания пула и его роста
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("invalid pool config: {0}")]
    InvalidConfig(String),
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Отказ в приеме задачи. Вызывающий сам решает: повторить, отбросить или притормозить
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum SubmitError {
    #[error("work queue is full (capacity {capacity})")]
    CapacityExceeded { capacity: usize },
    #[error("pool is shut down")]
    ShutDown,
}

/// Результат задачи, отправленной через `submit_with_handle`
#[derive(Debug, Error, PartialEq, PartialOrd, Eq, Ord, Clone)]
pub enum SpawnError {
    #[error("task panicked: {0}")]
    Panic(String),
    #[error("task was dropped before it ran")]
    Dropped,
    #[error("timed out waiting for task result")]
    Timeout,
}

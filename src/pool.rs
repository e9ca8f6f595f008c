use super::{
    errors::{PoolError, SubmitError},
    handle::{JoinHandle, Task},
    model::{PoolMetrics, ShutdownMode},
    monitor::ScalingMonitor,
    queue::WorkQueue,
    result::PoolResult,
    signal::StopSignal,
    worker::Worker,
};
use std::{
    io,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Condvar, Mutex, MutexGuard, PoisonError,
    },
    time::{Duration, Instant},
};
use tracing::{debug, error, info, trace};


/// Конфигурация эластичного пула
#[derive(Debug, Clone)]
pub struct Config {
    pub min_workers: usize,
    pub max_workers: usize,
    pub queue_capacity: usize,
    /// Сколько воркер ждет задачу, прежде чем попробовать уйти
    pub idle_timeout: Duration,
    pub monitor_interval: Duration,
    /// Пул растет, когда в очереди строго больше задач
    pub backlog_threshold: usize,
    pub shutdown_mode: ShutdownMode,
    pub thread_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_workers: 2,
            max_workers: 10,
            queue_capacity: 10,
            idle_timeout: Duration::from_secs(3),
            monitor_interval: Duration::from_millis(500),
            backlog_threshold: 5,
            shutdown_mode: ShutdownMode::Immediate,
            thread_name: "elastic-worker".to_string(),
        }
    }
}

impl Config {
    pub fn cpu_bound() -> Self {
        let num_cpus = num_cpus::get();
        Self {
            min_workers: 1,
            max_workers: num_cpus,
            queue_capacity: num_cpus * 10,
            ..Default::default()
        }
    }

    pub fn io_bound() -> Self {
        let num_cpus = num_cpus::get();
        Self {
            min_workers: num_cpus,
            max_workers: num_cpus * 4,
            queue_capacity: num_cpus * 20,
            ..Default::default()
        }
    }

    /// Некорректные границы отклоняются, а не подрезаются
    pub fn validate(&self) -> PoolResult<()> {
        let invalid = |msg: String| Err(PoolError::InvalidConfig(msg));

        if self.min_workers == 0 {
            return invalid("min_workers must be at least 1".into());
        }
        if self.max_workers == 0 {
            return invalid("max_workers must be at least 1".into());
        }
        if self.min_workers > self.max_workers {
            return invalid(format!(
                "min_workers ({}) is larger than max_workers ({})",
                self.min_workers, self.max_workers
            ));
        }
        if self.queue_capacity == 0 {
            return invalid("queue_capacity must be at least 1".into());
        }
        if self.idle_timeout.is_zero() {
            return invalid("idle_timeout must be non-zero".into());
        }
        if self.monitor_interval.is_zero() {
            return invalid("monitor_interval must be non-zero".into());
        }
        Ok(())
    }
}


/// Счетчик воркеров. Меняется только под `Shared::state`
#[derive(Debug)]
pub(crate) struct PoolState {
    current: usize,
    min: usize,
    max: usize,
    closed: bool,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) busy: AtomicUsize,
    pub(crate) submitted: AtomicUsize,
    pub(crate) rejected: AtomicUsize,
    pub(crate) completed: AtomicUsize,
    pub(crate) panicked: AtomicUsize,
    pub(crate) spawned: AtomicUsize,
    pub(crate) retired: AtomicUsize,
}

/// Сколько потоков пула (воркеры и монитор) еще не вышли
#[derive(Debug, Default)]
pub(crate) struct LiveThreads {
    count: Mutex<usize>,
    exited: Condvar,
}

impl LiveThreads {
    pub(crate) fn enter(&self) {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner) += 1;
    }

    pub(crate) fn leave(&self) {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.exited.notify_all();
        }
    }

    fn wait(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);

        while *count > 0 {
            count = match deadline {
                None => self.exited.wait(count).unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let left = deadline.saturating_duration_since(Instant::now());
                    if left.is_zero() {
                        return false;
                    }
                    self.exited
                        .wait_timeout(count, left)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
        true
    }
}


/// Состояние, общее для владельца пула, воркеров и монитора
pub(crate) struct Shared {
    pub(crate) config: Config,
    pub(crate) queue: WorkQueue,
    pub(crate) halt: StopSignal,
    pub(crate) counters: Counters,
    pub(crate) threads: LiveThreads,
    state: Mutex<PoolState>,
}

impl Shared {
    pub(crate) fn new(config: Config) -> Self {
        Self {
            queue: WorkQueue::new(config.queue_capacity),
            halt: StopSignal::new(),
            counters: Counters::default(),
            threads: LiveThreads::default(),
            state: Mutex::new(PoolState {
                current: config.min_workers,
                min: config.min_workers,
                max: config.max_workers,
                closed: false,
            }),
            config,
        }
    }

    #[inline]
    fn lock_state(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn_worker(self: &Arc<Self>) -> io::Result<()> {
        let id = self.counters.spawned.fetch_add(1, Ordering::Relaxed);
        Worker::new(id, self.clone()).spawn()
    }

    /// Проверка и инкремент идут под одной блокировкой, поэтому параллельные
    /// вызовы не выйдут за `max`. Поток стартует уже после снятия блокировки
    pub(crate) fn add_worker(self: &Arc<Self>) -> PoolResult<bool> {
        let total = {
            let mut state = self.lock_state();
            if state.closed || state.current >= state.max {
                return Ok(false);
            }
            state.current += 1;
            state.current
        };

        if let Err(err) = self.spawn_worker() {
            let mut state = self.lock_state();
            if state.current > state.min {
                state.current -= 1;
            }
            return Err(PoolError::Spawn(err));
        }

        info!(workers = total, "worker added");
        Ok(true)
    }

    /// Уменьшает счетчик, если пул выше минимума. Возвращает новое значение
    pub(crate) fn try_retire(&self) -> Option<usize> {
        let mut state = self.lock_state();
        if state.current > state.min {
            state.current -= 1;
            self.counters.retired.fetch_add(1, Ordering::Relaxed);
            Some(state.current)
        } else {
            None
        }
    }

    fn close(&self) -> bool {
        let mut state = self.lock_state();
        !std::mem::replace(&mut state.closed, true)
    }

    /// Останавливает то, что успело стартовать при неудачном создании пула
    pub(crate) fn abort(&self) {
        self.close();
        self.halt.fire();
        self.queue.close();
    }
}


/// Эластичный пул потоков.
///
/// Сразу поднимает `min_workers` воркеров и поток-монитор. Монитор добавляет
/// воркеров, пока очередь глубже `backlog_threshold`, а простаивающие воркеры
/// уходят сами, но не ниже `min_workers`.
///
/// `submit` никогда не блокируется. Ошибка задачи остается внутри задачи:
/// паника перехватывается и учитывается в метриках, результат наружу
/// не передается. Для результата есть `submit_with_handle`.
pub struct ElasticPool {
    shared: Arc<Shared>,
    monitor: ScalingMonitor,
}

impl ElasticPool {
    pub fn new(min_workers: usize, max_workers: usize, queue_capacity: usize) -> PoolResult<Self> {
        Self::with_config(Config {
            min_workers,
            max_workers,
            queue_capacity,
            ..Default::default()
        })
    }

    pub fn with_config(config: Config) -> PoolResult<Self> {
        config.validate()?;
        let shared = Arc::new(Shared::new(config));

        for _ in 0..shared.config.min_workers {
            if let Err(err) = shared.spawn_worker() {
                shared.abort();
                return Err(PoolError::Spawn(err));
            }
        }

        let monitor = match ScalingMonitor::start(shared.clone()) {
            Ok(monitor) => monitor,
            Err(err) => {
                shared.abort();
                return Err(PoolError::Spawn(err));
            }
        };

        info!(
            min = shared.config.min_workers,
            max = shared.config.max_workers,
            capacity = shared.config.queue_capacity,
            "pool started"
        );

        Ok(Self { shared, monitor })
    }

    /// Ставит задачу в очередь или сразу отказывает
    pub fn submit<F>(&self, f: F) -> Result<(), SubmitError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.push_task(Box::new(f))
    }

    pub fn submit_with_handle<T, F>(&self, f: F) -> Result<JoinHandle<T>, SubmitError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (task, handle) = JoinHandle::wrap(f);
        self.push_task(task)?;
        Ok(handle)
    }

    #[inline]
    fn push_task(&self, task: Task) -> Result<(), SubmitError> {
        let counters = &self.shared.counters;
        match self.shared.queue.try_enqueue(task) {
            Ok(()) => {
                counters.submitted.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(err) => {
                counters.rejected.fetch_add(1, Ordering::Relaxed);
                trace!(%err, "task rejected");
                Err(err)
            }
        }
    }

    /// Добавляет воркера, если пул ниже `max_workers`. `Ok(false)` - рост упёрся в потолок
    /// или пул остановлен. Обычно вызывается только монитором
    pub fn add_worker(&self) -> PoolResult<bool> {
        self.shared.add_worker().inspect_err(|err| {
            error!(%err, "failed to add worker");
        })
    }

    /// Останавливает пул в режиме из конфига. Не ждет выхода воркеров
    pub fn shutdown(&self) {
        self.shutdown_with(self.shared.config.shutdown_mode);
    }

    /// Повторный вызов ничего не делает, кроме одного случая: `Immediate`
    /// после `Drain` прерывает дочитывание очереди
    pub fn shutdown_with(&self, mode: ShutdownMode) {
        if mode == ShutdownMode::Immediate {
            self.shared.halt.fire();
        }

        if self.shared.close() {
            self.monitor.stop();
            self.shared.queue.close();
            info!(?mode, "pool shutting down");
        }

        if mode == ShutdownMode::Immediate {
            let dropped = self.shared.queue.purge();
            if dropped > 0 {
                debug!(dropped, "queued tasks discarded");
            }
        }
    }

    /// Ждет выхода всех потоков пула. Без `shutdown` не вернется
    pub fn join(&self) {
        self.shared.threads.wait(None);
    }

    pub fn join_timeout(&self, timeout: Duration) -> bool {
        self.shared.threads.wait(Some(timeout))
    }

    #[inline]
    pub fn current_workers(&self) -> usize {
        self.shared.lock_state().current
    }

    #[inline]
    pub fn queue_depth(&self) -> usize {
        self.shared.queue.depth()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.lock_state().closed
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    pub fn metrics(&self) -> PoolMetrics {
        let counters = &self.shared.counters;
        PoolMetrics {
            current_workers: self.current_workers(),
            min_workers: self.shared.config.min_workers,
            max_workers: self.shared.config.max_workers,
            busy_workers: counters.busy.load(Ordering::Relaxed),
            queued: self.shared.queue.depth(),
            capacity: self.shared.queue.capacity(),
            submitted: counters.submitted.load(Ordering::Relaxed),
            rejected: counters.rejected.load(Ordering::Relaxed),
            completed: counters.completed.load(Ordering::Relaxed),
            panicked: counters.panicked.load(Ordering::Relaxed),
            spawned: counters.spawned.load(Ordering::Relaxed),
            retired: counters.retired.load(Ordering::Relaxed),
        }
    }
}

impl Drop for ElasticPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invalid(config: Config) {
        match config.validate() {
            Err(PoolError::InvalidConfig(_)) => {}
            other => panic!("expected InvalidConfig, got {:?}", other),
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
        assert!(Config::cpu_bound().validate().is_ok());
        assert!(Config::io_bound().validate().is_ok());
    }

    #[test]
    fn rejects_bad_bounds() {
        assert_invalid(Config { min_workers: 0, ..Default::default() });
        assert_invalid(Config { min_workers: 1, max_workers: 0, ..Default::default() });
        assert_invalid(Config { min_workers: 5, max_workers: 4, ..Default::default() });
        assert_invalid(Config { queue_capacity: 0, ..Default::default() });
        assert_invalid(Config { idle_timeout: Duration::ZERO, ..Default::default() });
        assert_invalid(Config { monitor_interval: Duration::ZERO, ..Default::default() });
    }

    #[test]
    fn retire_respects_floor() {
        let shared = Shared::new(Config { min_workers: 2, max_workers: 3, ..Default::default() });
        assert_eq!(shared.try_retire(), None);

        shared.lock_state().current = 3;
        assert_eq!(shared.try_retire(), Some(2));
        assert_eq!(shared.try_retire(), None);
        assert_eq!(shared.counters.retired.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn live_threads_wait() {
        let threads = LiveThreads::default();
        assert!(threads.wait(Some(Duration::from_millis(10))));

        threads.enter();
        assert!(!threads.wait(Some(Duration::from_millis(20))));
        threads.leave();
        assert!(threads.wait(Some(Duration::from_millis(10))));
    }
}

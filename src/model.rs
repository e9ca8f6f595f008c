/// Снимок состояния пула. Счетчики читаются без блокировки, поэтому
/// поля между собой могут слегка расходиться
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolMetrics {
    pub current_workers: usize,
    pub min_workers: usize,
    pub max_workers: usize,
    pub busy_workers: usize,
    pub queued: usize,
    pub capacity: usize,
    pub submitted: usize,
    pub rejected: usize,
    pub completed: usize,
    pub panicked: usize,
    pub spawned: usize,
    pub retired: usize,
}

impl PoolMetrics {
    pub fn utilization(&self) -> f64 {
        if self.current_workers == 0 {
            return 0.0;
        }
        self.busy_workers.min(self.current_workers) as f64 / self.current_workers as f64
    }

    pub fn queue_pressure(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.queued as f64 / self.capacity as f64
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.completed + self.panicked;
        if total == 0 {
            return 1.0;
        }
        self.completed as f64 / total as f64
    }
}


/// Что делать с очередью при остановке пула
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShutdownMode {
    /// Воркеры выходят сразу, задачи в очереди не запускаются
    #[default]
    Immediate,
    /// Новые задачи не принимаются, воркеры дорабатывают очередь и выходят
    Drain,
}

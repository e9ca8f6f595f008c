use super::{
    pool::Shared,
    signal::StopSignal,
};
use std::{io, sync::Arc, thread};
use crossbeam::channel::{select, tick, Receiver};
use tracing::{debug, error};


/// Фоновый поток, который расширяет пул, когда очередь копится.
///
/// Сжатием он не занимается: лишние воркеры уходят сами по таймауту простоя.
pub(crate) struct ScalingMonitor {
    stop: StopSignal,
}

impl ScalingMonitor {
    pub(crate) fn start(shared: Arc<Shared>) -> io::Result<Self> {
        let stop = StopSignal::new();
        let name = format!("{}-monitor", shared.config.thread_name);
        let runner = MonitorLoop::new(shared, stop.listener().clone());

        thread::Builder::new()
            .name(name)
            .spawn(move || runner.run())?;

        Ok(Self { stop })
    }

    #[inline]
    pub(crate) fn stop(&self) -> bool {
        self.stop.fire()
    }
}

struct MonitorLoop {
    shared: Arc<Shared>,
    stop: Receiver<()>,
}

impl MonitorLoop {
    fn new(shared: Arc<Shared>, stop: Receiver<()>) -> Self {
        shared.threads.enter();
        Self { shared, stop }
    }

    fn run(self) {
        let ticker = tick(self.shared.config.monitor_interval);
        loop {
            let stopped = select! {
                recv(ticker) -> _ => false,
                recv(self.stop) -> _ => true,
            };
            if stopped {
                break;
            }
            check_backlog(&self.shared);
        }
        debug!("scaling monitor stopped");
    }
}

impl Drop for MonitorLoop {
    fn drop(&mut self) {
        self.shared.threads.leave();
    }
}

/// Один тик: при очереди глубже порога добавляет ровно одного воркера.
/// Глубина читается без блокировки и может быть устаревшей
pub(crate) fn check_backlog(shared: &Arc<Shared>) -> bool {
    let depth = shared.queue.depth();
    if depth <= shared.config.backlog_threshold {
        return false;
    }

    match shared.add_worker() {
        Ok(grew) => {
            debug!(depth, grew, "backlog above threshold");
            grew
        }
        Err(err) => {
            error!(%err, depth, "failed to grow pool");
            false
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Config;

    #[test]
    fn grows_only_above_threshold() {
        let shared = Arc::new(Shared::new(Config {
            min_workers: 1,
            max_workers: 3,
            queue_capacity: 10,
            backlog_threshold: 2,
            ..Default::default()
        }));

        for _ in 0..2 {
            shared.queue.try_enqueue(Box::new(|| {})).unwrap();
        }
        assert!(!check_backlog(&shared));

        shared.queue.try_enqueue(Box::new(|| {})).unwrap();
        assert!(check_backlog(&shared));

        shared.abort();
        assert!(!shared.add_worker().unwrap());
    }
}

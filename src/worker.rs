use super::{
    handle::{panic_message, Task},
    pool::Shared,
    queue::Dequeued,
};
use std::{
    io,
    panic::{self, AssertUnwindSafe},
    sync::{atomic::Ordering, Arc},
    thread,
};
use tracing::{debug, info, warn};


/// Почему воркер вышел из цикла
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Простой дольше `idle_timeout` при `current > min`, счетчик уменьшен
    Retired,
    /// Сработал сигнал остановки пула
    Stopped,
    /// Очередь закрыта и пуста
    Drained,
}

enum WorkerState {
    Running,
    Executing(Task),
    Terminating(WorkerExit),
}


/// Воркер живет в собственном потоке. Своей идентичности кроме номера
/// для имени потока и логов у него нет.
pub(crate) struct Worker {
    id: usize,
    shared: Arc<Shared>,
}

impl Worker {
    /// Регистрирует поток в пуле. Если поток так и не стартует, `Drop`
    /// снимет регистрацию вместе с замыканием
    pub(crate) fn new(id: usize, shared: Arc<Shared>) -> Self {
        shared.threads.enter();
        Self { id, shared }
    }

    pub(crate) fn spawn(self) -> io::Result<()> {
        let name = format!("{}-{}", self.shared.config.thread_name, self.id);
        thread::Builder::new()
            .name(name)
            .spawn(move || {
                self.run();
            })
            .map(|_| ())
    }

    fn run(self) -> WorkerExit {
        let idle_timeout = self.shared.config.idle_timeout;
        let mut state = WorkerState::Running;

        loop {
            state = match state {
                WorkerState::Running => self.next_state(self.shared.queue.dequeue(&self.shared.halt, idle_timeout)),
                WorkerState::Executing(task) => {
                    self.execute(task);
                    WorkerState::Running
                }
                WorkerState::Terminating(exit) => {
                    debug!(worker = self.id, ?exit, "worker exiting");
                    return exit;
                }
            };
        }
    }

    fn next_state(&self, dequeued: Dequeued) -> WorkerState {
        match dequeued {
            // задача могла выиграть гонку с сигналом в select!
            Dequeued::Task(task) if self.shared.halt.is_fired() => {
                drop(task);
                WorkerState::Terminating(WorkerExit::Stopped)
            }
            Dequeued::Task(task) => WorkerState::Executing(task),
            Dequeued::IdleTimeout => match self.shared.try_retire() {
                Some(remaining) => {
                    info!(worker = self.id, workers = remaining, "worker retired after idle timeout");
                    WorkerState::Terminating(WorkerExit::Retired)
                }
                None => WorkerState::Running,
            },
            Dequeued::Stopped => WorkerState::Terminating(WorkerExit::Stopped),
            Dequeued::Closed => WorkerState::Terminating(WorkerExit::Drained),
        }
    }

    fn execute(&self, task: Task) {
        let counters = &self.shared.counters;
        counters.busy.fetch_add(1, Ordering::Relaxed);
        let outcome = panic::catch_unwind(AssertUnwindSafe(task));
        counters.busy.fetch_sub(1, Ordering::Relaxed);

        match outcome {
            Ok(()) => {
                counters.completed.fetch_add(1, Ordering::Relaxed);
            }
            Err(payload) => {
                counters.panicked.fetch_add(1, Ordering::Relaxed);
                warn!(worker = self.id, panic = %panic_message(payload.as_ref()), "task panicked");
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shared.threads.leave();
    }
}

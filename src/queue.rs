use super::{
    errors::SubmitError,
    handle::Task,
    signal::StopSignal,
};
use std::{
    sync::{PoisonError, RwLock},
    time::Duration,
};
use crossbeam::channel::{bounded, select, Receiver, Sender, TrySendError};


/// Чем закончилось ожидание воркера: ровно одна причина на пробуждение
pub enum Dequeued {
    Task(Task),
    IdleTimeout,
    Stopped,
    /// Очередь закрыта и пуста
    Closed,
}

/// Ограниченная FIFO очередь задач.
///
/// Отправитель лежит под `RwLock` только ради `close`: после закрытия
/// воркеры дочитывают остаток и получают `Dequeued::Closed`.
pub struct WorkQueue {
    sender: RwLock<Option<Sender<Task>>>,
    receiver: Receiver<Task>,
    capacity: usize,
}

impl WorkQueue {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender: RwLock::new(Some(sender)),
            receiver,
            capacity,
        }
    }

    /// Никогда не блокируется: полная очередь сразу дает `CapacityExceeded`
    pub fn try_enqueue(&self, task: Task) -> Result<(), SubmitError> {
        let guard = self.sender.read().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = guard.as_ref() else {
            return Err(SubmitError::ShutDown);
        };

        sender.try_send(task).map_err(|err| match err {
            TrySendError::Full(_) => SubmitError::CapacityExceeded { capacity: self.capacity },
            TrySendError::Disconnected(_) => SubmitError::ShutDown,
        })
    }

    /// Ждет задачу, таймаут простоя или сигнал остановки одним `select!`
    pub fn dequeue(&self, stop: &StopSignal, idle_timeout: Duration) -> Dequeued {
        select! {
            recv(stop.listener()) -> _ => Dequeued::Stopped,
            recv(self.receiver) -> task => match task {
                Ok(task) => Dequeued::Task(task),
                Err(_) => Dequeued::Closed,
            },
            default(idle_timeout) => Dequeued::IdleTimeout,
        }
    }

    /// Глубина очереди без блокировок. К моменту использования может устареть
    #[inline]
    pub fn depth(&self) -> usize {
        self.receiver.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Перестает принимать задачи. Уже поставленные остаются доступны воркерам
    pub fn close(&self) -> bool {
        self.sender
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }

    /// Выбрасывает все, что еще лежит в очереди. Возвращает количество
    pub fn purge(&self) -> usize {
        self.receiver.try_iter().count()
    }

    pub fn is_closed(&self) -> bool {
        self.sender
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

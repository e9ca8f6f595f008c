use std::sync::{Mutex, PoisonError};
use crossbeam::channel::{bounded, Receiver, Sender, TryRecvError};


/// Одноразовый широковещательный сигнал остановки.
///
/// Через канал никогда ничего не отправляется: `fire` просто роняет
/// единственный `Sender`. Отключенный канал готов к чтению всегда, поэтому
/// сигнал виден в любом `select!` и не сбрасывается.
pub struct StopSignal {
    trigger: Mutex<Option<Sender<()>>>,
    listener: Receiver<()>,
}

impl StopSignal {
    pub fn new() -> Self {
        let (tx, rx) = bounded(0);
        Self {
            trigger: Mutex::new(Some(tx)),
            listener: rx,
        }
    }

    /// Возвращает `true`, если сигнал сработал именно этим вызовом
    pub fn fire(&self) -> bool {
        self.trigger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }

    #[inline]
    pub fn is_fired(&self) -> bool {
        matches!(self.listener.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Сторона для `select!`
    #[inline]
    pub fn listener(&self) -> &Receiver<()> {
        &self.listener
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

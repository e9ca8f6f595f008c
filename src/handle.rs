use super::{
    errors::SpawnError,
    result::SpawnResult,
};
use std::{
    any::Any,
    future::Future,
    panic::{self, AssertUnwindSafe},
    pin::Pin,
    task::{Context, Poll},
};
use tokio::{
    sync::oneshot,
    time::Duration,
};


pub type Task = Box<dyn FnOnce() + Send + 'static>;


/// Handle на результат задачи.
///
/// Обычный `submit` результата не возвращает. Handle нужен, когда
/// вызывающему важно значение или паника задачи.
pub struct JoinHandle<T> {
    receiver: oneshot::Receiver<SpawnResult<T>>,
}

impl<T> JoinHandle<T>
where
    T: Send + 'static,
{
    /// Оборачивает замыкание в `Task`, который отправит результат в handle
    pub(crate) fn wrap<F>(f: F) -> (Task, JoinHandle<T>)
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = oneshot::channel::<SpawnResult<T>>();
        let task: Task = Box::new(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(f))
                .map_err(|payload| SpawnError::Panic(panic_message(payload.as_ref())));
            let _ = tx.send(result);
        });
        (task, JoinHandle { receiver: rx })
    }

    /// Для синхронного кода. Нельзя вызывать внутри async контекста
    pub fn blocking_wait(self) -> SpawnResult<T> {
        self.receiver.blocking_recv().unwrap_or(Err(SpawnError::Dropped))
    }

    pub async fn await_timeout(self, timeout: Duration) -> SpawnResult<T> {
        match tokio::time::timeout(timeout, self.receiver).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(SpawnError::Dropped),
            Err(_) => Err(SpawnError::Timeout),
        }
    }
}

impl<T> Future for JoinHandle<T> {
    type Output = SpawnResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Ready(res) => Poll::Ready(res.unwrap_or(Err(SpawnError::Dropped))),
            Poll::Pending => Poll::Pending,
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_value() {
        let (task, handle) = JoinHandle::wrap(|| 2 + 2);
        task();
        assert_eq!(handle.blocking_wait(), Ok(4));
    }

    #[test]
    fn captures_panic() {
        let (task, handle) = JoinHandle::<()>::wrap(|| panic!("boom"));
        task();
        assert_eq!(handle.blocking_wait(), Err(SpawnError::Panic("boom".into())));
    }

    #[test]
    fn dropped_task_resolves_as_dropped() {
        let (task, handle) = JoinHandle::wrap(|| 1);
        drop(task);
        assert_eq!(handle.blocking_wait(), Err(SpawnError::Dropped));
    }

    #[tokio::test]
    async fn timeout_when_task_never_runs() {
        let (_task, handle) = JoinHandle::wrap(|| 1);
        let res = handle.await_timeout(Duration::from_millis(20)).await;
        assert_eq!(res, Err(SpawnError::Timeout));
    }
}

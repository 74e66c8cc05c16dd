//! UI-thread dispatch queue.
//!
//! Background tasks never touch UI state directly; they enqueue zero-argument
//! callbacks that the UI context executes in FIFO order while draining the
//! queue from its own loop. Enqueueing is fire-and-forget. Callbacks from
//! different concurrent fetches may interleave; the last render dispatched
//! wins the visible result.

use tokio::sync::mpsc;

/// A deferred UI mutation.
pub type UiTask = Box<dyn FnOnce() + Send + 'static>;

/// Create a connected dispatcher/queue pair.
#[must_use]
pub fn ui_channel() -> (UiDispatcher, UiQueue) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (UiDispatcher { sender }, UiQueue { receiver })
}

/// Cloneable handle used by background tasks to schedule UI work.
#[derive(Clone)]
pub struct UiDispatcher {
    sender: mpsc::UnboundedSender<UiTask>,
}

impl UiDispatcher {
    /// Enqueue `task` for execution on the UI context.
    ///
    /// A closed queue means the UI is shutting down; the task is dropped.
    pub fn dispatch(&self, task: impl FnOnce() + Send + 'static) {
        let _ = self.sender.send(Box::new(task));
    }
}

/// Single consumer draining dispatched tasks.
pub struct UiQueue {
    receiver: mpsc::UnboundedReceiver<UiTask>,
}

impl UiQueue {
    /// Wait for the next task. Returns `None` once every dispatcher is gone.
    pub async fn recv(&mut self) -> Option<UiTask> {
        self.receiver.recv().await
    }

    /// Execute tasks until every dispatcher handle has been dropped.
    pub async fn run(mut self) {
        while let Some(task) = self.recv().await {
            task();
        }
    }

    /// Execute everything currently queued without waiting; returns the
    /// number of tasks run.
    pub fn drain_ready(&mut self) -> usize {
        let mut executed = 0;
        while let Ok(task) = self.receiver.try_recv() {
            task();
            executed += 1;
        }
        executed
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_tasks_run_in_dispatch_order() {
        let (dispatcher, mut queue) = ui_channel();
        let log = Arc::new(Mutex::new(Vec::new()));

        for value in 0..5 {
            let log = log.clone();
            dispatcher.dispatch(move || log.lock().unwrap().push(value));
        }

        assert_eq!(queue.drain_ready(), 5);
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_dispatch_from_background_task() {
        let (dispatcher, mut queue) = ui_channel();
        let flag = Arc::new(Mutex::new(false));

        let task_flag = flag.clone();
        let handle = tokio::spawn(async move {
            dispatcher.dispatch(move || *task_flag.lock().unwrap() = true);
        });
        handle.await.unwrap();

        let task = queue.recv().await.unwrap();
        task();
        assert!(*flag.lock().unwrap());
    }

    #[tokio::test]
    async fn test_dispatch_after_queue_dropped_is_ignored() {
        let (dispatcher, queue) = ui_channel();
        drop(queue);
        // Must not panic.
        dispatcher.dispatch(|| {});
    }
}

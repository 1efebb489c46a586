//! Task scope tied to a view model's lifetime

use std::future::Future;
use std::sync::Mutex;

use tokio::task::{AbortHandle, JoinHandle};

/// Spawned work owned by a view model
///
/// Tasks launched here are aborted when the scope is dropped, so a
/// screen that goes away takes its in-flight requests with it.
#[derive(Default)]
pub struct ViewModelScope {
    tasks: Mutex<Vec<AbortHandle>>,
}

impl ViewModelScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `future` on the runtime and keep track of it
    ///
    /// The returned handle may be awaited or dropped; dropping it does not
    /// cancel the task.
    pub fn launch<F>(&self, future: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(future);
        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.retain(|task| !task.is_finished());
            tasks.push(handle.abort_handle());
        }
        handle
    }

    /// Abort everything still running
    pub fn cancel_all(&self) {
        if let Ok(mut tasks) = self.tasks.lock() {
            for task in tasks.drain(..) {
                task.abort();
            }
        }
    }

    /// Number of tasks that have not finished yet
    pub fn active(&self) -> usize {
        self.tasks
            .lock()
            .map(|tasks| tasks.iter().filter(|task| !task.is_finished()).count())
            .unwrap_or(0)
    }
}

impl Drop for ViewModelScope {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

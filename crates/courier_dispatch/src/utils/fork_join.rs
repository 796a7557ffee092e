use std::{thread, time::Duration};

use jiff::SignedDuration;
use tracing::{debug, warn};

use crate::error::DispatchError;

use super::completion_latch::{CompletionLatch, LatchResult};

pub(crate) struct WorkerContext<'a> {
    pub index: usize,
    pub count: usize,
    latch: &'a CompletionLatch,
}

impl WorkerContext<'_> {
    pub fn is_cancelled(&self) -> bool {
        self.latch.is_cancelled()
    }
}

/// Runs `task` on `workers` dedicated threads and returns their outputs ordered by
/// worker index.
///
/// Each thread owns its output, nothing is shared between workers apart from the
/// completion latch. The first failing worker (by index) fails the whole call, the
/// outputs of the other workers are dropped. Panics are caught when joining.
pub(crate) fn fork_join<T, F>(
    name: &str,
    workers: usize,
    timeout: Option<SignedDuration>,
    task: F,
) -> Result<Vec<Vec<T>>, DispatchError>
where
    T: Send,
    F: Fn(&WorkerContext<'_>) -> Result<Vec<T>, DispatchError> + Sync,
{
    if workers == 0 {
        return Ok(Vec::new());
    }

    let latch = CompletionLatch::new(workers);
    let wait_timeout = timeout.map(|timeout| Duration::try_from(timeout).unwrap_or(Duration::ZERO));

    thread::scope(|s| {
        let mut handles = Vec::with_capacity(workers);

        for index in 0..workers {
            let latch = &latch;
            let task = &task;

            let spawned = thread::Builder::new()
                .name(format!("{name}-{index}"))
                .spawn_scoped(s, move || {
                    let _signal = latch.signal_on_drop();
                    let context = WorkerContext {
                        index,
                        count: workers,
                        latch,
                    };
                    task(&context)
                });

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    latch.cancel();
                    for handle in handles {
                        // Only the spawn error is reported
                        let _ = handle.join();
                    }
                    return Err(DispatchError::ThreadSpawn(err));
                }
            }
        }

        debug!(name, workers, "Waiting for workers");

        let timed_out = latch.wait(wait_timeout) == LatchResult::TimedOut;
        if timed_out {
            warn!(name, workers, ?timeout, "Workers timed out, cancelling");
            latch.cancel();
        }

        let mut outputs = Vec::with_capacity(workers);
        let mut first_error = None;

        for (worker, handle) in handles.into_iter().enumerate() {
            match handle.join() {
                Ok(Ok(output)) => outputs.push(output),
                Ok(Err(source)) => {
                    first_error.get_or_insert(DispatchError::Worker {
                        worker,
                        source: Box::new(source),
                    });
                }
                Err(_) => {
                    tracing::error!(name, worker, "Worker panicked");
                    first_error.get_or_insert(DispatchError::WorkerPanicked { worker });
                }
            }
        }

        if timed_out && let Some(timeout) = timeout {
            return Err(DispatchError::WorkerTimeout(timeout));
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(outputs),
        }
    })
}

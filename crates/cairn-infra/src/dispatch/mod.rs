// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A fixed-size pool of worker threads fed through a shared job queue.

use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use cairn_core::error::{ErrorKind, PhysicsError, PhysicsResult};
use crossbeam_channel::{Receiver, Sender, TryRecvError};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Executes batches of independent tasks on a fixed set of threads.
///
/// A pool with zero workers runs every task inline, on the dispatching thread.
/// Dropping the dispatcher closes the queue and joins every worker.
#[derive(Debug)]
pub struct WorkDispatcher {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkDispatcher {
    /// Spawns `worker_count` workers.
    ///
    /// Fails with `AllocationFailure` if the OS refuses to create a thread.
    pub fn new(worker_count: usize) -> PhysicsResult<Self> {
        let (sender, receiver) = crossbeam_channel::unbounded::<Job>();
        let mut dispatcher = Self {
            sender: Some(sender),
            workers: Vec::with_capacity(worker_count),
        };

        for index in 0..worker_count {
            let receiver: Receiver<Job> = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("cairn-worker-{index}"))
                .spawn(move || {
                    while let Ok(job) = receiver.recv() {
                        job();
                    }
                })
                .map_err(|e| {
                    PhysicsError::new(
                        ErrorKind::AllocationFailure,
                        format!("failed to spawn worker thread {index}: {e}"),
                    )
                })?;
            dispatcher.workers.push(handle);
        }

        log::info!("Work dispatcher started with {worker_count} worker(s).");
        Ok(dispatcher)
    }

    /// Number of worker threads; zero means tasks run inline.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Queues `tasks` and returns immediately.
    ///
    /// Results are collected through the returned [`PendingBatch`], in the
    /// order the tasks were given. A panicking task does not take its worker
    /// down; it turns the whole batch into a `DispatchFailure`.
    pub fn dispatch<T, F>(&self, tasks: Vec<F>) -> PhysicsResult<PendingBatch<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (result_tx, result_rx) = crossbeam_channel::unbounded();
        let len = tasks.len();

        for (index, task) in tasks.into_iter().enumerate() {
            let result_tx = result_tx.clone();
            let job: Job = Box::new(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(task));
                // The batch may have been dropped; nobody is waiting then.
                let _ = result_tx.send((index, result.is_ok(), result.ok()));
            });
            match &self.sender {
                Some(sender) if !self.workers.is_empty() => {
                    sender.send(job).map_err(|_| {
                        PhysicsError::new(ErrorKind::DispatchFailure, "the worker queue is closed")
                    })?;
                }
                _ => job(),
            }
        }

        Ok(PendingBatch {
            receiver: result_rx,
            results: (0..len).map(|_| None).collect(),
            remaining: len,
            failed: false,
        })
    }

    /// Queues `tasks` and blocks until all of them have completed.
    pub fn run_all<T, F>(&self, tasks: Vec<F>) -> PhysicsResult<Vec<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        self.dispatch(tasks)?.wait()
    }
}

impl Drop for WorkDispatcher {
    fn drop(&mut self) {
        self.sender.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::error!("A worker thread terminated abnormally.");
            }
        }
        log::debug!("Work dispatcher shut down.");
    }
}

/// The in-flight results of one [`WorkDispatcher::dispatch`] call.
#[derive(Debug)]
pub struct PendingBatch<T> {
    receiver: Receiver<(usize, bool, Option<T>)>,
    results: Vec<Option<T>>,
    remaining: usize,
    failed: bool,
}

impl<T> PendingBatch<T> {
    /// Number of tasks in the batch.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns `true` if the batch holds no tasks.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Number of tasks that have not reported yet.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    fn accept(&mut self, (index, ok, value): (usize, bool, Option<T>)) {
        self.remaining -= 1;
        if ok {
            self.results[index] = value;
        } else {
            self.failed = true;
        }
    }

    /// Collects finished results without blocking. Returns `true` once every
    /// task has reported.
    pub fn poll(&mut self) -> bool {
        while self.remaining > 0 {
            match self.receiver.try_recv() {
                Ok(message) => self.accept(message),
                Err(TryRecvError::Empty) => return false,
                Err(TryRecvError::Disconnected) => {
                    // Every sender is gone: the missing tasks will never report.
                    self.failed = true;
                    self.remaining = 0;
                }
            }
        }
        true
    }

    /// Blocks until every task has reported and returns the results in task order.
    pub fn wait(mut self) -> PhysicsResult<Vec<T>> {
        while self.remaining > 0 {
            match self.receiver.recv() {
                Ok(message) => self.accept(message),
                Err(_) => {
                    self.failed = true;
                    self.remaining = 0;
                }
            }
        }
        if self.failed {
            return Err(PhysicsError::new(
                ErrorKind::DispatchFailure,
                "a worker task panicked; the batch was discarded",
            ));
        }
        self.results
            .into_iter()
            .collect::<Option<Vec<T>>>()
            .ok_or_else(|| PhysicsError::new(ErrorKind::DispatchFailure, "a task result is missing"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn results_come_back_in_task_order() {
        let dispatcher = WorkDispatcher::new(3).unwrap();
        let tasks: Vec<_> = (0..32u64)
            .map(|i| {
                move || {
                    // Uneven work so completion order differs from task order.
                    thread::sleep(Duration::from_micros((32 - i) * 50));
                    i * i
                }
            })
            .collect();
        let results = dispatcher.run_all(tasks).unwrap();
        assert_eq!(results, (0..32u64).map(|i| i * i).collect::<Vec<_>>());
    }

    #[test]
    fn zero_workers_run_inline() {
        let dispatcher = WorkDispatcher::new(0).unwrap();
        assert_eq!(dispatcher.worker_count(), 0);
        let caller = thread::current().id();
        let mut batch = dispatcher
            .dispatch(vec![move || thread::current().id() == caller])
            .unwrap();
        assert!(batch.poll());
        assert_eq!(batch.wait().unwrap(), vec![true]);
    }

    #[test]
    fn panicking_task_fails_the_batch_but_not_the_pool() {
        let dispatcher = WorkDispatcher::new(2).unwrap();
        let tasks: Vec<Box<dyn FnOnce() -> u32 + Send>> = vec![
            Box::new(|| 1),
            Box::new(|| panic!("boom")),
            Box::new(|| 3),
        ];
        let err = dispatcher.run_all(tasks).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DispatchFailure);

        // Workers survived and keep serving.
        assert_eq!(dispatcher.run_all(vec![|| 7]).unwrap(), vec![7]);
    }

    #[test]
    fn poll_reports_completion() {
        let dispatcher = WorkDispatcher::new(1).unwrap();
        let (gate_tx, gate_rx) = crossbeam_channel::bounded::<()>(0);
        let mut batch = dispatcher
            .dispatch(vec![move || {
                let _ = gate_rx.recv();
                5
            }])
            .unwrap();
        assert!(!batch.poll());
        assert_eq!(batch.remaining(), 1);
        gate_tx.send(()).unwrap();
        assert_eq!(batch.wait().unwrap(), vec![5]);
    }

    #[test]
    fn drop_joins_after_draining_queued_jobs() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let dispatcher = WorkDispatcher::new(2).unwrap();
            let tasks: Vec<_> = (0..16)
                .map(|_| {
                    let counter = Arc::clone(&counter);
                    move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                    }
                })
                .collect();
            let _batch = dispatcher.dispatch(tasks).unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 16);
    }

    #[test]
    fn empty_batch_is_complete() {
        let dispatcher = WorkDispatcher::new(1).unwrap();
        let mut batch = dispatcher.dispatch(Vec::<fn() -> u8>::new()).unwrap();
        assert!(batch.is_empty());
        assert!(batch.poll());
        assert!(batch.wait().unwrap().is_empty());
    }
}

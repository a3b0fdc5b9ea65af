//! Prioritized, cancellable task scheduler on a rayon thread pool.
//!
//! Work is not handed to rayon directly. `submit` puts the task into a shared
//! priority queue and spawns one runner on the pool; each runner pops the most
//! urgent queued task (lowest priority value, then oldest) and runs it. This
//! keeps queued work removable: `cancel_if_pending` takes a task back out of
//! the queue before any runner reaches it. Once a runner has popped a task it
//! always runs to completion.
//!
//! Every submit spawns exactly one runner and every runner pops at most one
//! task, so there are never fewer outstanding runners than queued tasks;
//! runners that find the queue empty simply return.

use std::collections::BTreeMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use tracing::{trace, warn};

use crate::error::Result;

/// A unit of work runnable on the scheduler.
pub trait Task: Send + Sync {
    fn run(&self);
}

/// Receipt for a submitted task, used to cancel it while queued.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskHandle {
    priority: u32,
    seq: u64,
}

impl TaskHandle {
    pub fn priority(&self) -> u32 {
        self.priority
    }

    /// Submission order; later submissions have larger values
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

#[derive(Default)]
struct QueueState {
    pending: BTreeMap<TaskHandle, Arc<dyn Task>>,
    running: usize,
    next_seq: u64,
    paused: bool,
}

impl QueueState {
    fn is_quiet(&self) -> bool {
        self.running == 0 && (self.paused || self.pending.is_empty())
    }
}

struct Shared {
    state: Mutex<QueueState>,
    quiet: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // A task panicking never holds this lock, so poisoning cannot leave
        // the queue half-updated
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn run_next(&self) {
        let task = {
            let mut state = self.lock();
            if state.paused {
                return;
            }
            match state.pending.pop_first() {
                Some((_, task)) => {
                    state.running += 1;
                    task
                }
                None => return,
            }
        };

        let _guard = RunningGuard { shared: self };
        task.run();
    }
}

/// Decrements the running count even if the task panics, so `drain_all`
/// cannot wait forever on a dead task.
struct RunningGuard<'a> {
    shared: &'a Shared,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        state.running -= 1;
        if state.is_quiet() {
            self.shared.quiet.notify_all();
        }
    }
}

/// Shared worker pool with a cancellable priority queue in front of it.
pub struct Scheduler {
    pool: rayon::ThreadPool,
    shared: Arc<Shared>,
}

impl Scheduler {
    /// Create a scheduler with `threads` workers (0 = one per core).
    pub fn new(threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("atlas-worker-{i}"))
            .panic_handler(|_| warn!("worker task panicked"))
            .build()?;

        Ok(Self {
            pool,
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState::default()),
                quiet: Condvar::new(),
            }),
        })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Queue a task. Lower `priority` values run first; equal priorities run
    /// in submission order.
    pub fn submit(&self, task: Arc<dyn Task>, priority: u32) -> TaskHandle {
        let handle = {
            let mut state = self.shared.lock();
            let handle = TaskHandle { priority, seq: state.next_seq };
            state.next_seq += 1;
            state.pending.insert(handle, task);
            handle
        };
        trace!(priority, seq = handle.seq, "task queued");
        self.spawn_runners(1);
        handle
    }

    /// Remove a task from the queue if no worker has taken it yet.
    ///
    /// Returns `true` if the task was removed, in which case it will never
    /// run. Returns `false` if it is running, finished, or was never queued.
    pub fn cancel_if_pending(&self, handle: TaskHandle) -> bool {
        self.shared.lock().pending.remove(&handle).is_some()
    }

    pub fn is_pending(&self, handle: TaskHandle) -> bool {
        self.shared.lock().pending.contains_key(&handle)
    }

    /// Drop every queued task. Running tasks are unaffected.
    pub fn clear_pending(&self) -> usize {
        let mut state = self.shared.lock();
        let dropped = state.pending.len();
        state.pending.clear();
        if state.is_quiet() {
            self.shared.quiet.notify_all();
        }
        dropped
    }

    /// Block until no task is running and nothing runnable is queued.
    ///
    /// Must not be called from inside a task.
    pub fn drain_all(&self) {
        let mut state = self.shared.lock();
        while !state.is_quiet() {
            state = self.shared.quiet.wait(state).unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Stop handing queued tasks to workers. Running tasks finish normally.
    pub fn pause(&self) {
        self.shared.lock().paused = true;
    }

    pub fn resume(&self) {
        let queued = {
            let mut state = self.shared.lock();
            state.paused = false;
            state.pending.len()
        };
        // Runners that saw the pause returned without popping; replace them
        self.spawn_runners(queued);
    }

    pub fn is_paused(&self) -> bool {
        self.shared.lock().paused
    }

    pub fn pending_len(&self) -> usize {
        self.shared.lock().pending.len()
    }

    pub fn running(&self) -> usize {
        self.shared.lock().running
    }

    /// Queued handles in submission order.
    pub fn pending_handles(&self) -> Vec<TaskHandle> {
        let mut handles: Vec<TaskHandle> = self.shared.lock().pending.keys().copied().collect();
        handles.sort_by_key(|h| h.seq);
        handles
    }

    fn spawn_runners(&self, count: usize) {
        for _ in 0..count {
            let shared = Arc::clone(&self.shared);
            self.pool.spawn(move || shared.run_next());
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.clear_pending();
        self.drain_all();
    }
}

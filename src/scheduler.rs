//! Fixed-size worker pool with a bounded FIFO queue.
//!
//! The pool is the only concurrency primitive in the renderer. Work is
//! submitted as boxed closures into a ring buffer of fixed capacity; a fixed
//! set of worker threads drains it. [`WorkerPool::wait`] blocks until every
//! submitted job has finished, which is the barrier between pipeline stages.
//!
//! # Protocol
//!
//! ```text
//!  execute ──► [ queue (capacity N) ] ──► worker: pop, unlock, run, pending -= 1
//!     │              ▲                                   │
//!     └ blocks while full (space_available)              └ pending == 0 → all_done
//! ```
//!
//! - Workers never hold the queue lock while running a job.
//! - Shutdown drains: a worker exits only once stop is requested *and* the
//!   queue is empty, so every accepted job runs exactly once.
//! - A panicking job is caught, logged and still counted as finished.
//!
//! [`WorkerPool::scope`] and [`run_bands`] build on this to hand borrowed,
//! row-disjoint slices of the frame to workers.

use std::collections::VecDeque;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crate::error::PoolError;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Queue {
    jobs: VecDeque<Job>,
    capacity: usize,
    /// Submitted but not yet finished (queued + running).
    pending: usize,
    /// Jobs that panicked since the pool started.
    panicked: usize,
    shutdown: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    work_available: Condvar,
    space_available: Condvar,
    all_done: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Queue> {
        // Jobs run outside the lock, so a poisoned mutex still holds
        // consistent queue state.
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A fixed set of worker threads draining a bounded job queue.
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Starts `workers` threads behind a queue holding up to `capacity`
    /// pending jobs.
    pub fn new(workers: usize, capacity: usize) -> Result<Self, PoolError> {
        if workers == 0 {
            return Err(PoolError::NoWorkers);
        }
        if capacity == 0 {
            return Err(PoolError::NoCapacity);
        }

        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                jobs: VecDeque::with_capacity(capacity),
                capacity,
                pending: 0,
                panicked: 0,
                shutdown: false,
            }),
            work_available: Condvar::new(),
            space_available: Condvar::new(),
            all_done: Condvar::new(),
        });

        // Built incrementally so that a spawn failure drops (and joins) the
        // workers that did start.
        let mut pool = Self {
            shared,
            workers: Vec::with_capacity(workers),
        };
        for index in 0..workers {
            let shared = Arc::clone(&pool.shared);
            let handle = thread::Builder::new()
                .name(format!("shadeline-worker-{index}"))
                .spawn(move || worker_loop(&shared, index))?;
            pool.workers.push(handle);
        }

        log::debug!("worker pool started: {workers} workers, queue capacity {capacity}");
        Ok(pool)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn capacity(&self) -> usize {
        self.shared.lock().capacity
    }

    /// Enqueues a job. Blocks while the queue is full.
    pub fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(Box::new(job));
    }

    fn submit(&self, job: Job) {
        let mut queue = self.shared.lock();
        while queue.jobs.len() >= queue.capacity {
            queue = self
                .shared
                .space_available
                .wait(queue)
                .unwrap_or_else(PoisonError::into_inner);
        }
        queue.jobs.push_back(job);
        queue.pending += 1;
        drop(queue);
        self.shared.work_available.notify_one();
    }

    /// Blocks until every job submitted so far has finished.
    pub fn wait(&self) {
        let mut queue = self.shared.lock();
        while queue.pending > 0 {
            queue = self
                .shared
                .all_done
                .wait(queue)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Number of jobs that panicked since the pool started.
    pub fn panicked_jobs(&self) -> usize {
        self.shared.lock().panicked
    }

    /// Runs `f` with a [`Scope`] whose jobs may borrow from the caller.
    ///
    /// The scope always ends with [`WorkerPool::wait`], also when `f` unwinds.
    /// If any job submitted through the scope panicked, the panic is
    /// re-raised here after the barrier.
    pub fn scope<'env, F, R>(&self, f: F) -> R
    where
        F: for<'scope> FnOnce(&'scope Scope<'scope, 'env>) -> R,
    {
        struct WaitOnDrop<'a>(&'a WorkerPool);
        impl Drop for WaitOnDrop<'_> {
            fn drop(&mut self) {
                self.0.wait();
            }
        }

        let scope = Scope {
            pool: self,
            panicked: Arc::new(AtomicBool::new(false)),
            _env: PhantomData,
        };
        let barrier = WaitOnDrop(self);
        let result = f(&scope);
        drop(barrier);

        // Only this scope's jobs count; other submitters share the pool.
        if scope.panicked.load(Ordering::Acquire) {
            panic!("a scoped worker job panicked");
        }
        result
    }

    /// Requests shutdown, lets the workers drain the queue, joins them.
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        self.shared.lock().shutdown = true;
        self.shared.work_available.notify_all();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::error!("worker thread terminated abnormally");
            }
        }
        log::debug!("worker pool stopped");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

fn worker_loop(shared: &Shared, index: usize) {
    loop {
        let job = {
            let mut queue = shared.lock();
            loop {
                if let Some(job) = queue.jobs.pop_front() {
                    break job;
                }
                if queue.shutdown {
                    return;
                }
                queue = shared
                    .work_available
                    .wait(queue)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };
        shared.space_available.notify_one();

        let outcome = panic::catch_unwind(AssertUnwindSafe(job));

        let mut queue = shared.lock();
        if outcome.is_err() {
            queue.panicked += 1;
            log::error!("job panicked on worker {index}");
        }
        queue.pending -= 1;
        if queue.pending == 0 {
            shared.all_done.notify_all();
        }
    }
}

/// Submission handle passed to the closure of [`WorkerPool::scope`].
pub struct Scope<'scope, 'env: 'scope> {
    pool: &'scope WorkerPool,
    panicked: Arc<AtomicBool>,
    /// Invariant in `'env`, like `std::thread::Scope`.
    _env: PhantomData<&'env mut &'env ()>,
}

impl<'scope, 'env> Scope<'scope, 'env> {
    /// Enqueues a job that may borrow anything living for `'env`.
    pub fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'env,
    {
        let panicked = Arc::clone(&self.panicked);
        let job: Box<dyn FnOnce() + Send + 'env> = Box::new(move || {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                panicked.store(true, Ordering::Release);
                panic::resume_unwind(payload);
            }
        });
        // SAFETY: `WorkerPool::scope` does not return (or unwind past its
        // frame) before `wait` has observed every job finish, and every
        // borrow captured by the job outlives that call.
        let job: Job = unsafe { std::mem::transmute::<Box<dyn FnOnce() + Send + 'env>, Job>(job) };
        self.pool.submit(job);
    }
}

/// Runs `f` once per band: on the pool when one is given, inline otherwise.
///
/// Returns after every band has been processed.
pub fn run_bands<T, F>(pool: Option<&WorkerPool>, bands: Vec<T>, f: F)
where
    T: Send,
    F: Fn(T) + Sync,
{
    match pool {
        Some(pool) => pool.scope(|scope| {
            let f = &f;
            for band in bands {
                scope.execute(move || f(band));
            }
        }),
        None => bands.into_iter().for_each(f),
    }
}

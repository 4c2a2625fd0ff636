//! Serialized execution context guarding a piece of shared state

use crossbeam::channel::{self, Sender};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

type Job<S> = Box<dyn FnOnce(&RwLock<S>) + Send>;

struct Worker<S> {
    jobs: Sender<Job<S>>,
    handle: JoinHandle<()>,
}

/// Owns a value and runs work against it, either on the calling thread or
/// queued on a background worker.
///
/// Shared work (`run_sync`, `run_async`) may overlap with other shared work.
/// Exclusive work (`run_sync_exclusive`, `run_async_exclusive`) runs alone.
/// Queued jobs execute in submission order; they are not ordered relative to
/// synchronous calls made afterwards. Dropping the context drains the queue.
///
/// # Examples
///
/// ```
/// use esox_gatedpool::SerialContext;
///
/// let context = SerialContext::new(Vec::<u32>::new());
/// context.run_async_exclusive(|items| items.push(1));
/// context.run_async_exclusive(|items| items.push(2));
///
/// let (tx, rx) = std::sync::mpsc::channel();
/// context.run_async(move |items| tx.send(items.clone()).unwrap());
/// assert_eq!(rx.recv().unwrap(), vec![1, 2]);
///
/// context.run_sync_exclusive(|items| items.clear());
/// assert!(context.run_sync(|items| items.is_empty()));
/// ```
pub struct SerialContext<S: Send + Sync + 'static> {
    state: Arc<RwLock<S>>,
    worker: Mutex<Option<Worker<S>>>,
}

impl<S: Send + Sync + 'static> SerialContext<S> {
    pub fn new(state: S) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
            worker: Mutex::new(None),
        }
    }

    /// Run `f` with shared access on the calling thread
    pub fn run_sync<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.state.read())
    }

    /// Run `f` with exclusive access on the calling thread
    pub fn run_sync_exclusive<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.state.write())
    }

    /// Queue `f` for shared access on the worker
    pub fn run_async<F>(&self, f: F)
    where
        F: FnOnce(&S) + Send + 'static,
    {
        self.submit(Box::new(move |state: &RwLock<S>| f(&state.read())));
    }

    /// Queue `f` for exclusive access on the worker
    pub fn run_async_exclusive<F>(&self, f: F)
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        self.submit(Box::new(move |state: &RwLock<S>| f(&mut state.write())));
    }

    fn submit(&self, job: Job<S>) {
        let mut worker = self.worker.lock();
        let worker = worker.get_or_insert_with(|| self.spawn_worker());

        if let Err(channel::SendError(job)) = worker.jobs.send(job) {
            // Receiver only goes away if a previous job panicked the worker.
            tracing::warn!("serial context worker is gone, running job inline");
            job(&*self.state);
        }
    }

    fn spawn_worker(&self) -> Worker<S> {
        let (jobs, queue) = channel::unbounded::<Job<S>>();
        let state = Arc::clone(&self.state);

        tracing::debug!("starting serial context worker");
        let handle = thread::spawn(move || {
            for job in queue {
                job(&*state);
            }
        });

        Worker { jobs, handle }
    }
}

impl<S: Send + Sync + 'static> Drop for SerialContext<S> {
    fn drop(&mut self) {
        if let Some(Worker { jobs, handle }) = self.worker.get_mut().take() {
            drop(jobs);
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                tracing::error!("serial context worker panicked");
            }
        }
    }
}

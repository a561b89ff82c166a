// MainThreadDispatcher - Confines work to the single interaction thread
//
// Background loader threads never touch UI-owned state directly. They hand a
// closure to the dispatcher, which either runs it right away (caller already on
// the interaction thread) or queues it for the MainLoop owned by that thread.
//
// The dispatcher provides:
// - Inline execution when called from the interaction thread
// - FIFO queueing per producer thread otherwise
// - Rejection of any dispatch made before the interaction thread is known

use crate::metrics::Metrics;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};
use thiserror::Error;
use tokio::sync::mpsc;

type Task = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Task),
    Shutdown,
}

/// Errors returned by the dispatcher
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Work was submitted before `establish()` ran; startup ordering is broken
    #[error("interaction thread has not been established")]
    NotEstablished,

    #[error("interaction thread was already established")]
    AlreadyEstablished,

    /// The main loop has been dropped, nothing will run queued work
    #[error("main loop has stopped")]
    LoopClosed,
}

/// How a unit of work was handed to the interaction thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Ran synchronously before `run_on_main` returned
    Inline,
    /// Queued for the main loop
    Queued,
}

struct Established {
    thread: ThreadId,
    tx: mpsc::UnboundedSender<Message>,
}

struct Inner {
    established: OnceLock<Established>,
    metrics: Arc<Metrics>,
}

/// Cloneable handle for submitting work to the interaction thread.
///
/// `run_on_main` is thread-agnostic. [`establish`](Self::establish) must be
/// called exactly once, from the interaction thread, before any work is
/// submitted; the captured thread identity never changes afterwards.
#[derive(Clone)]
pub struct MainThreadDispatcher {
    inner: Arc<Inner>,
}

impl MainThreadDispatcher {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            inner: Arc::new(Inner {
                established: OnceLock::new(),
                metrics,
            }),
        }
    }

    /// Designate the calling thread as the interaction thread.
    ///
    /// Returns the [`MainLoop`] that must be driven on this same thread.
    pub fn establish(&self) -> Result<MainLoop, DispatchError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let thread = thread::current().id();

        self.inner
            .established
            .set(Established { thread, tx })
            .map_err(|_| DispatchError::AlreadyEstablished)?;

        tracing::debug!("Interaction thread established: {:?}", thread);

        Ok(MainLoop {
            rx,
            metrics: self.inner.metrics.clone(),
            shutdown_requested: false,
            _not_send: PhantomData,
        })
    }

    pub fn is_established(&self) -> bool {
        self.inner.established.get().is_some()
    }

    /// True when called from the interaction thread
    pub fn is_interaction_thread(&self) -> bool {
        self.inner
            .established
            .get()
            .is_some_and(|e| e.thread == thread::current().id())
    }

    /// Run `work` on the interaction thread.
    ///
    /// Executes synchronously if the caller already is the interaction thread,
    /// otherwise enqueues it and returns immediately.
    pub fn run_on_main<F>(&self, work: F) -> Result<Dispatch, DispatchError>
    where
        F: FnOnce() + Send + 'static,
    {
        let Some(established) = self.inner.established.get() else {
            tracing::error!("run_on_main called before the interaction thread was established");
            return Err(DispatchError::NotEstablished);
        };

        if established.thread == thread::current().id() {
            work();
            self.inner.metrics.record_task_inline();
            return Ok(Dispatch::Inline);
        }

        match established.tx.send(Message::Run(Box::new(work))) {
            Ok(()) => {
                self.inner.metrics.record_task_queued();
                Ok(Dispatch::Queued)
            }
            Err(_) => {
                tracing::warn!("Failed to queue work - main loop has stopped");
                Err(DispatchError::LoopClosed)
            }
        }
    }

    /// Ask a blocking [`MainLoop::run`] to return after the work queued so far.
    pub fn shutdown(&self) -> Result<(), DispatchError> {
        let established = self
            .inner
            .established
            .get()
            .ok_or(DispatchError::NotEstablished)?;

        established
            .tx
            .send(Message::Shutdown)
            .map_err(|_| DispatchError::LoopClosed)
    }
}

/// Single consumer of the dispatcher queue.
///
/// Not `Send`: it stays on the thread that called
/// [`MainThreadDispatcher::establish`].
pub struct MainLoop {
    rx: mpsc::UnboundedReceiver<Message>,
    metrics: Arc<Metrics>,
    shutdown_requested: bool,
    _not_send: PhantomData<*const ()>,
}

impl MainLoop {
    /// Run every work item queued so far without blocking.
    ///
    /// Returns the number of items executed. Draining stops at a shutdown
    /// request, which is remembered so a later [`run`](Self::run) returns
    /// immediately.
    pub fn run_pending(&mut self) -> usize {
        let mut executed = 0;
        while !self.shutdown_requested {
            match self.rx.try_recv() {
                Ok(Message::Run(task)) => {
                    task();
                    self.metrics.record_task_executed();
                    executed += 1;
                }
                Ok(Message::Shutdown) => self.shutdown_requested = true,
                Err(_) => break,
            }
        }
        executed
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested
    }

    /// Block and run work items until shutdown is requested.
    ///
    /// Must not be called from inside a tokio runtime.
    pub fn run(mut self) {
        if self.shutdown_requested {
            tracing::debug!("Shutdown already requested, main loop not started");
            return;
        }
        tracing::debug!("Main loop started");

        while let Some(message) = self.rx.blocking_recv() {
            match message {
                Message::Run(task) => {
                    task();
                    self.metrics.record_task_executed();
                }
                Message::Shutdown => break,
            }
        }

        tracing::debug!("Main loop terminated");
    }
}

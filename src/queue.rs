//! # Resubmission queue and halt signal (§5)
//!
//! Newly-derived facts from trigger functions feed back into dispatch
//! through a bounded channel rather than direct recursion, so a long
//! chain of triggers-causing-triggers can't blow the native call stack.
//! `HaltSignal` lets a caller stop an in-progress dispatch loop (e.g. a
//! REPL handling Ctrl-C) from another thread.

use crate::fact::Fact;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("resubmission queue is full")]
    Full,
    #[error("resubmission queue is closed")]
    Closed,
}

/// Bounded MPSC queue of facts awaiting (re-)dispatch.
pub struct FactQueue {
    tx: Sender<Fact>,
    rx: Receiver<Fact>,
}

impl FactQueue {
    pub fn bounded(capacity: usize) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        FactQueue { tx, rx }
    }

    pub fn push(&self, fact: Fact) -> Result<(), QueueError> {
        self.tx.try_send(fact).map_err(|e| match e {
            TrySendError::Full(_) => QueueError::Full,
            TrySendError::Disconnected(_) => QueueError::Closed,
        })
    }

    pub fn pop(&self) -> Option<Fact> {
        self.rx.try_recv().ok()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }
}

/// Cooperative stop flag for a dispatch loop, shareable across threads.
#[derive(Clone, Default)]
pub struct HaltSignal(Arc<AtomicBool>);

impl HaltSignal {
    pub fn new() -> Self {
        HaltSignal(Arc::new(AtomicBool::new(false)))
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

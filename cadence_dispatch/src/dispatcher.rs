// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! [`Dispatcher`] and [`DispatchSender`].

use core::fmt;
use std::thread::{self, ThreadId};

use cadence_core::PacingError;
use calloop::channel::{self, Channel, Event};
use calloop::{InsertError, LoopHandle, RegistrationToken};

/// A unit of work posted to the bound thread.
pub type Task = Box<dyn FnOnce() + Send>;

struct Binding<'l, D> {
    handle: LoopHandle<'l, D>,
    token: RegistrationToken,
}

/// Runs posted closures on the thread that created it.
///
/// Owns a channel source registered with that thread's `calloop` event loop.
/// Closures posted from other threads travel through the channel and run
/// when the loop dispatches; closures posted from the bound thread run
/// immediately.
///
/// Created on the target thread with [`for_current_thread`]. Hand out
/// [`DispatchSender`]s to other threads with [`sender`].
///
/// Dropping the dispatcher unregisters the source. Closures still in the
/// channel at that point are dropped without running.
///
/// [`for_current_thread`]: Self::for_current_thread
/// [`sender`]: Self::sender
pub struct Dispatcher<'l, D> {
    thread: ThreadId,
    binding: Option<Binding<'l, D>>,
    tx: Option<channel::Sender<Task>>,
}

impl<D> fmt::Debug for Dispatcher<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("thread", &self.thread)
            .field("degraded", &self.binding.is_none())
            .finish_non_exhaustive()
    }
}

impl<'l, D> Dispatcher<'l, D> {
    /// Binds a dispatcher to the calling thread's event loop.
    ///
    /// With no loop handle, or if the channel cannot be registered, the
    /// dispatcher runs degraded: [`DispatchSender::post`] then executes the
    /// closure on the *calling* thread. The thread-affinity requirement is
    /// violated, but the work is never silently dropped.
    #[must_use]
    pub fn for_current_thread(handle: Option<&LoopHandle<'l, D>>) -> Self {
        let thread = thread::current().id();
        let Some(handle) = handle else {
            tracing::warn!(
                ?thread,
                "{}",
                PacingError::ThreadAffinityViolation
            );
            return Self::degraded(thread);
        };

        let (tx, rx): (channel::Sender<Task>, Channel<Task>) = channel::channel();
        let inserted = handle.insert_source(rx, |event, _metadata, _data| {
            if let Event::Msg(task) = event {
                task();
            }
        });
        match inserted {
            Ok(token) => {
                tracing::debug!(?thread, "dispatcher bound to event loop");
                Self {
                    thread,
                    binding: Some(Binding {
                        handle: handle.clone(),
                        token,
                    }),
                    tx: Some(tx),
                }
            }
            Err(InsertError { error, .. }) => {
                tracing::warn!(
                    ?thread,
                    %error,
                    "could not register dispatcher source; {}",
                    PacingError::ThreadAffinityViolation
                );
                Self::degraded(thread)
            }
        }
    }

    fn degraded(thread: ThreadId) -> Self {
        Self {
            thread,
            binding: None,
            tx: None,
        }
    }

    /// The thread this dispatcher was created on.
    #[must_use]
    pub fn bound_thread(&self) -> ThreadId {
        self.thread
    }

    /// Why posted work does not run on the bound thread, if it does not.
    #[must_use]
    pub fn degradation(&self) -> Option<PacingError> {
        self.binding
            .is_none()
            .then_some(PacingError::ThreadAffinityViolation)
    }

    /// Returns a handle other threads can post through.
    #[must_use]
    pub fn sender(&self) -> DispatchSender {
        DispatchSender {
            thread: self.thread,
            tx: self.tx.clone(),
        }
    }

    /// Posts `task`; see [`DispatchSender::post`].
    pub fn post(&self, task: impl FnOnce() + Send + 'static) {
        post(self.thread, self.tx.as_ref(), Box::new(task));
    }
}

impl<D> Drop for Dispatcher<'_, D> {
    fn drop(&mut self) {
        if let Some(binding) = self.binding.take() {
            binding.handle.remove(binding.token);
            tracing::debug!(thread = ?self.thread, "dispatcher unbound");
        }
    }
}

/// A `Send` handle that posts closures to a [`Dispatcher`]'s thread.
///
/// Obtained from [`Dispatcher::sender`]. Cloning is cheap.
#[derive(Clone)]
pub struct DispatchSender {
    thread: ThreadId,
    tx: Option<channel::Sender<Task>>,
}

impl fmt::Debug for DispatchSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchSender")
            .field("thread", &self.thread)
            .finish_non_exhaustive()
    }
}

impl DispatchSender {
    /// Runs `task` on the bound thread.
    ///
    /// - On the bound thread itself, `task` runs before `post` returns.
    /// - On any other thread, `task` is queued and runs the next time the
    ///   bound thread's event loop dispatches.
    /// - If the dispatcher is degraded, `task` runs on the calling thread.
    /// - If the dispatcher has been dropped, `task` is dropped unrun.
    pub fn post(&self, task: impl FnOnce() + Send + 'static) {
        post(self.thread, self.tx.as_ref(), Box::new(task));
    }

    /// The thread posted work runs on.
    #[must_use]
    pub fn bound_thread(&self) -> ThreadId {
        self.thread
    }
}

fn post(thread: ThreadId, tx: Option<&channel::Sender<Task>>, task: Task) {
    if thread::current().id() == thread {
        task();
        return;
    }
    match tx {
        Some(tx) => {
            if tx.send(task).is_err() {
                tracing::debug!(?thread, "dispatcher is gone; dropping posted task");
            }
        }
        None => task(),
    }
}

//! Prompt, failure-safe resource management for pipes.
//!
//! A [`Scope`] is a registry of finalizers shared by the pipes built against
//! it. [`bracket`] acquires a resource inside a pipe and guarantees its
//! release on *every* exit path: normal completion, abandonment by a
//! downstream that stopped early, and failure of any effect. The last is by
//! way of [`Scope::run`], which drains the registry no matter how the pipe
//! ended.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::convert::Infallible;
use core::future::Future;

use crate::pipe::{Finalizer, Pipe};
use crate::run_pipe;

/// A single-threaded registry of finalizers.
///
/// Cloning a `Scope` clones the handle, not the registry: all clones register
/// into, and release from, the same slots. Scopes are not `Send`; a pipe and
/// its scope live and die on one thread.
pub struct Scope<'s, E> {
    slots: Rc<RefCell<Vec<Option<Finalizer<'s, E>>>>>,
}

/// Names one registered finalizer of a [`Scope`].
///
/// Keys are only meaningful to the scope that issued them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceKey(usize);

impl<'s, E> Clone for Scope<'s, E> {
    fn clone(&self) -> Self {
        Scope {
            slots: Rc::clone(&self.slots),
        }
    }
}

impl<'s, E: 's> Default for Scope<'s, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'s, E: 's> Scope<'s, E> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Scope {
            slots: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Registers a finalizer, to be run by [`release`](Scope::release) or by
    /// the terminal [`drain`](Scope::drain).
    pub fn register(&self, fin: Finalizer<'s, E>) -> ResourceKey {
        let mut slots = self.slots.borrow_mut();
        slots.push(Some(fin));
        ResourceKey(slots.len() - 1)
    }

    /// Runs the named finalizer if it has not run yet.
    ///
    /// Releasing the same key again, or a key already covered by a drain, is
    /// a no-op.
    pub async fn release(&self, key: ResourceKey) -> Result<(), E> {
        let fin = self
            .slots
            .borrow_mut()
            .get_mut(key.0)
            .and_then(Option::take);
        match fin {
            Some(fin) => fin.await,
            None => Ok(()),
        }
    }

    /// Runs every finalizer that has not run yet, most recently registered
    /// first.
    ///
    /// Every remaining finalizer is attempted even when one of them fails;
    /// the first failure is reported once all have run.
    pub async fn drain(&self) -> Result<(), E> {
        let mut first_failure = None;
        loop {
            // Take the next pending finalizer out of the registry before
            // awaiting it, so the registry is not borrowed across the await.
            let next = {
                let mut slots = self.slots.borrow_mut();
                let mut found = None;
                for slot in slots.iter_mut().rev() {
                    if slot.is_some() {
                        found = slot.take();
                        break;
                    }
                }
                found
            };
            match next {
                Some(fin) => {
                    if let Err(failure) = fin.await {
                        first_failure.get_or_insert(failure);
                    }
                }
                None => break,
            }
        }
        match first_failure {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }

    /// Interprets a saturated pipe and then drains the registry, no matter
    /// how the pipe ended.
    ///
    /// This is the failure-safe entry point: if an effect fails mid-pipe,
    /// every still-registered finalizer runs before the error is returned.
    pub async fn run<R: 's>(
        &self,
        pipe: Pipe<'s, Infallible, Infallible, Infallible, (), E, R>,
    ) -> Result<R, E> {
        let outcome = run_pipe(pipe).await;
        let drained = self.drain().await;
        match outcome {
            Ok(result) => drained.map(|()| result),
            Err(failure) => Err(failure),
        }
    }
}

/// Runs a pipe with a scoped resource.
///
/// Awaits `acquire`, registers `release` for the acquired resource in the
/// scope, and runs `body` with the resource. The release runs exactly once,
/// at the earliest of: the body finishing, the body being abandoned by a
/// downstream that stopped early, or (through [`Scope::run`]) any effect
/// failing.
///
/// The resource seed handed to both `release` and `body` must be `Clone`;
/// wrap resources that are not in an [`Rc`].
///
/// ```
/// use pipefuse::prelude::*;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let scope: Scope<Infallible> = Scope::new();
/// let closed = Rc::new(Cell::new(false));
/// let closed_flag = closed.clone();
///
/// let source = bracket(
///     &scope,
///     async { Ok("a handle") },
///     move |_handle| async move {
///         closed_flag.set(true);
///         Ok(())
///     },
///     |handle| emit(handle.len()),
/// );
///
/// let pipeline = fuse(source, input());
/// assert_eq!(pollster::block_on(scope.run(pipeline)), Ok(Some(8)));
/// assert!(closed.get());
/// ```
pub fn bracket<'s, L, I, O, U, E, R, Res, Acq, Rel, RelFut, Body>(
    scope: &Scope<'s, E>,
    acquire: Acq,
    release: Rel,
    body: Body,
) -> Pipe<'s, L, I, O, U, E, R>
where
    L: 's,
    I: 's,
    O: 's,
    U: 's,
    E: 's,
    R: 's,
    Res: Clone + 's,
    Acq: Future<Output = Result<Res, E>> + 's,
    Rel: FnOnce(Res) -> RelFut + 's,
    RelFut: Future<Output = Result<(), E>> + 's,
    Body: FnOnce(Res) -> Pipe<'s, L, I, O, U, E, R> + 's,
{
    let scope = scope.clone();
    Pipe::effect(async move {
        let resource = acquire.await?;
        let key = scope.register(Box::pin(release(resource.clone())));
        Ok(body(resource).add_cleanup(move |_completed| async move { scope.release(key).await }))
    })
}

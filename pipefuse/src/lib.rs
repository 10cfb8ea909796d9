#![no_std]
#![allow(clippy::type_complexity)]

//! A demand-driven streaming composition core.
//!
//! This crate models producers, consumers, and stream transformers as values
//! of one algebraic type, the [`Pipe`], and provides the composition operator
//! that [`fuse`]s two pipes into one. A pipe can receive items from upstream,
//! emit items downstream, push unconsumed input back as *leftovers*, perform
//! effects, and register cleanup actions that run when it is abandoned.
//!
//! ## Fundamental Design Choices
//!
//! - Pipes are inert values, stepped by drivers; nothing runs behind your back.
//! - Pull-driven fusion: an upstream effect runs only once downstream has
//!   asked for data. Stopping early never pays for items it did not want.
//! - At most one item in flight between two fused pipes, no hidden buffering.
//! - A dedicated upstream-result channel: a pipe learns *how* its upstream
//!   finished and may emit a final tail accordingly.
//! - Finalizers are first-class and run exactly once, on the abandonment path
//!   they were registered for.
//! - Fatal errors: an effect failure abandons the pipe; recovery is the
//!   caller's business, prompt release of resources is this crate's
//!   ([`Scope`], [`bracket`]).
//! - `no_std` with `alloc`; effects are plain boxed futures, no executor is
//!   prescribed.
//!
//! ## Caveats
//!
//! - The futures involved are `!Send`; a pipe lives and dies on one thread.
//! - Pipes are linear values: stepping consumes them, and abandoning one
//!   means dropping it and letting its registered cleanup run.
//! - Unwinding a panic through a pipe leaves no guarantees; do not attempt to
//!   recover from panics when using this crate.
//!
//! ## Module Overview
//!
//! The central module is [`pipe`]: the step type, the primitives that build
//! pipes, and the transformations that rewrite them. The [`fuse`] module
//! connects pipes end-to-end, including the resume-capable variant. The
//! [`scope`] module supplies the registered-finalizer facility that makes
//! resource use failure-safe.
//!
//! ```
//! use pipefuse::prelude::*;
//!
//! fn total<'s>() -> Pipe<'s, Infallible, u32, Infallible, (), Infallible, u32> {
//!     fn go<'s>(sum: u32) -> Pipe<'s, Infallible, u32, Infallible, (), Infallible, u32> {
//!         input().and_then(move |next| match next {
//!             Some(item) => go(sum + item),
//!             None => Pipe::Done(sum),
//!         })
//!     }
//!     go(0)
//! }
//!
//! let pipeline = fuse(from_iter([1, 2, 4]), total());
//! assert_eq!(pollster::block_on(run_pipe(pipeline)), Ok(7));
//! ```

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

// We re-export Either here so downstream code can match on request steps
// without naming the dependency. We hide it from our docs though.
#[doc(hidden)]
pub use either::Either;

pub mod pipe;
pub use pipe::{
    build, echo, emit, emit_with, finalizer, from_iter, has_input, input, input_or_final,
    noop_finalizer, unread, EffectFuture, Finalizer, Pipe, Sink, Source, Transform,
    TransformEffects,
};

pub mod fuse;
pub use fuse::{fuse, fuse_resume, Resumable};

pub mod scope;
pub use scope::{bracket, ResourceKey, Scope};

#[cfg(feature = "dev")]
mod test_source;
#[cfg(feature = "dev")]
pub use test_source::{
    build_test_source, AbandonLog, TestSource, TestSourceBuilder, TestSourceBuilderError,
};

use core::convert::Infallible;

/// A “prelude” for crates using the `pipefuse` crate.
///
/// This prelude is similar to the standard library’s prelude in that you’ll
/// almost always want to import its entire contents, but unlike the standard
/// library’s prelude you’ll have to do so manually:
///
/// use pipefuse::prelude::*;
///
/// The prelude may grow over time.
pub mod prelude {
    pub use crate::{
        bracket, build, echo, emit, emit_with, finalizer, from_iter, fuse, fuse_resume, has_input,
        input, input_or_final, noop_finalizer, run_pipe, unread, EffectFuture, Finalizer, Pipe,
        ResourceKey, Resumable, Scope, Sink, Source, Transform, TransformEffects,
    };

    #[cfg(feature = "dev")]
    pub use crate::{
        build_test_source, AbandonLog, TestSource, TestSourceBuilder, TestSourceBuilderError,
    };

    pub use either::Either::{self, Left, Right};

    pub use core::convert::Infallible;
}

/// Interprets a fully saturated pipe: one that consumes no input, emits no
/// output, and pushes nothing back.
///
/// Runs every effect in program order and answers every request with
/// "upstream finished". Returns the pipe's result, or the first effect
/// failure — in which case finalizers registered in a [`Scope`] have *not*
/// run yet; use [`Scope::run`] for the failure-safe variant.
pub async fn run_pipe<'s, E, R>(
    pipe: Pipe<'s, Infallible, Infallible, Infallible, (), E, R>,
) -> Result<R, E>
where
    E: 's,
    R: 's,
{
    let mut current = pipe;
    loop {
        match current {
            Pipe::Done(result) => return Ok(result),
            Pipe::Effect(effect) => current = effect.await?,
            Pipe::Request(on_step) => current = on_step(Either::Right(())),
            Pipe::Emit(_, _, impossible) => match impossible {},
            Pipe::Unread(_, impossible) => match impossible {},
        }
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    //! Small drivers and probes shared by the unit tests.

    use alloc::boxed::Box;
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;
    use core::convert::Infallible;

    use either::Either::{Left, Right};

    use crate::pipe::{noop_finalizer, Finalizer, Pipe};

    /// A shared record of which probes fired, in order.
    pub(crate) type Log = Rc<RefCell<Vec<&'static str>>>;

    pub(crate) fn new_log() -> Log {
        Rc::new(RefCell::new(Vec::new()))
    }

    /// A pipe step that records its execution.
    pub(crate) fn log_effect<'s, L: 's, I: 's, O: 's, U: 's, E: 's>(
        log: &Log,
        entry: &'static str,
    ) -> Pipe<'s, L, I, O, U, E, ()> {
        let log = log.clone();
        Pipe::effect(async move {
            log.borrow_mut().push(entry);
            Ok(Pipe::Done(()))
        })
    }

    /// A finalizer that records its execution.
    pub(crate) fn log_finalizer<'s, E: 's>(log: &Log, entry: &'static str) -> Finalizer<'s, E> {
        let log = log.clone();
        Box::pin(async move {
            log.borrow_mut().push(entry);
            Ok(())
        })
    }

    /// Steps a source, collecting emissions, until it finishes or fails.
    ///
    /// Consumed emissions drop their finalizers unrun, like fusion does.
    pub(crate) async fn drain_source<O, R, E>(
        mut pipe: Pipe<'_, Infallible, Infallible, O, (), E, R>,
    ) -> Result<(Vec<O>, R), E> {
        let mut emitted = Vec::new();
        loop {
            match pipe {
                Pipe::Emit(next, _fin, item) => {
                    emitted.push(item);
                    pipe = *next;
                }
                Pipe::Request(on_step) => pipe = on_step(Right(())),
                Pipe::Done(result) => return Ok((emitted, result)),
                Pipe::Effect(effect) => pipe = effect.await?,
                Pipe::Unread(_, impossible) => match impossible {},
            }
        }
    }

    /// Feeds a sink from a queue of items, routing leftovers back to the
    /// front of the queue, until the sink finishes or fails.
    pub(crate) async fn drive_sink<I, R, E>(
        mut pipe: Pipe<'_, I, I, Infallible, (), E, R>,
        items: Vec<I>,
    ) -> Result<R, E> {
        let mut queue: std::collections::VecDeque<I> = items.into();
        loop {
            match pipe {
                Pipe::Done(result) => return Ok(result),
                Pipe::Request(on_step) => {
                    pipe = match queue.pop_front() {
                        Some(item) => on_step(Left(item)),
                        None => on_step(Right(())),
                    }
                }
                Pipe::Unread(next, item) => {
                    queue.push_front(item);
                    pipe = *next;
                }
                Pipe::Effect(effect) => pipe = effect.await?,
                Pipe::Emit(_, _, impossible) => match impossible {},
            }
        }
    }

    /// A sink that consumes everything and finishes with the collected items
    /// once upstream is done.
    pub(crate) fn collect<'s, I: 's, E: 's>(
    ) -> Pipe<'s, Infallible, I, Infallible, (), E, Vec<I>> {
        fn go<'s, I: 's, E: 's>(
            mut acc: Vec<I>,
        ) -> Pipe<'s, Infallible, I, Infallible, (), E, Vec<I>> {
            Pipe::request(move |step| match step {
                Left(item) => {
                    acc.push(item);
                    go(acc)
                }
                Right(()) => Pipe::Done(acc),
            })
        }
        go(Vec::new())
    }

    /// A sink that consumes up to `limit` items, then finishes.
    pub(crate) fn take<'s, I: 's, E: 's>(
        limit: usize,
    ) -> Pipe<'s, Infallible, I, Infallible, (), E, Vec<I>> {
        fn go<'s, I: 's, E: 's>(
            mut acc: Vec<I>,
            remaining: usize,
        ) -> Pipe<'s, Infallible, I, Infallible, (), E, Vec<I>> {
            if remaining == 0 {
                return Pipe::Done(acc);
            }
            Pipe::request(move |step| match step {
                Left(item) => {
                    acc.push(item);
                    go(acc, remaining - 1)
                }
                Right(()) => Pipe::Done(acc),
            })
        }
        go(Vec::new(), limit)
    }

    /// A transform that maps every item, finishing when upstream does.
    pub(crate) fn map_transform<'s, I: 's, O: 's, E: 's, F>(
        mut fun: F,
    ) -> Pipe<'s, Infallible, I, O, (), E, ()>
    where
        F: FnMut(I) -> O + 's,
    {
        Pipe::request(move |step| match step {
            Left(item) => {
                let out = fun(item);
                Pipe::Emit(Box::new(map_transform(fun)), noop_finalizer(), out)
            }
            Right(()) => Pipe::Done(()),
        })
    }
}

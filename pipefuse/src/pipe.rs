//! The step type at the heart of the crate, and the operations that build and
//! transform it.
//!
//! A [`Pipe`] describes a staged streaming computation as a value: it can
//! emit items downstream, request items from upstream, push unconsumed input
//! back, perform effects, and finish with a result. Pipes are *inert*: they
//! only make progress when a driver steps them, either [`run_pipe`](crate::run_pipe)
//! for a fully saturated pipe or [`fuse`](crate::fuse) to connect two pipes
//! end-to-end.
//!
//! ## Building Pipes
//!
//! The primitives [`input`], [`input_or_final`], [`emit`], [`emit_with`],
//! [`unread`], [`echo`], [`has_input`], [`from_iter`], and [`build`] construct
//! pipes; [`Pipe::and_then`] sequences them. Everything else in this module
//! rewrites an existing pipe: output and input mapping, error mapping, effect
//! transformation, leftover absorption, cleanup registration.

use alloc::boxed::Box;
use core::convert::Infallible;
use core::future::Future;
use core::pin::Pin;

use either::Either;

mod add_cleanup;
mod generalize;
mod leftovers;
mod map_error;
mod map_input;
mod map_output;
mod primitives;
mod trans_effects;
mod upstream_done;

pub use primitives::{build, echo, emit, emit_with, from_iter, has_input, input, input_or_final, unread};
pub use trans_effects::TransformEffects;

/// A single effect in the host context: a boxed future that either produces a
/// `T` or fails with an `E`.
///
/// Effects are `!Send` and lazily evaluated; dropping one without awaiting it
/// discards the effect entirely. This is load-bearing for finalizers, which
/// are stored as effects and must run at most once.
pub type EffectFuture<'s, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + 's>>;

/// An effect run when a pipe is abandoned: the payload of [`Emit`](Pipe::Emit)
/// nodes and the unit of currency of [`Scope`](crate::Scope) registration.
pub type Finalizer<'s, E> = EffectFuture<'s, (), E>;

/// One step of a streaming computation.
///
/// A pipe value is a tree of steps; drivers consume it from the root. The six
/// type parameters:
///
/// | parameter | meaning |
/// |---|---|
/// | `L` | leftover items this pipe may push back into its input stream |
/// | `I` | items received from upstream |
/// | `O` | items emitted downstream |
/// | `U` | the result delivered by upstream when it finishes first |
/// | `E` | the error channel of embedded effects |
/// | `R` | the result this pipe finishes with |
///
/// Use [`Infallible`] for any position that cannot occur; matches on the
/// corresponding variants then become vacuous. The aliases [`Source`],
/// [`Sink`], and [`Transform`] capture the three common instantiations.
///
/// #### Invariants
///
/// A pipe is a linear value: stepping past a node consumes it, and no node is
/// ever observed twice. The finalizer of an [`Emit`](Pipe::Emit) node is owned
/// by that node alone; it runs exactly once when the node's successor is
/// abandoned, and never when the successor is resumed.
#[must_use = "pipes are inert and do nothing unless fused or run"]
pub enum Pipe<'s, L: 's, I: 's, O: 's, U: 's, E: 's, R: 's> {
    /// Emit an item downstream.
    ///
    /// The finalizer must run exactly once if the pipe is abandoned without
    /// resuming the successor; it must never run if the successor is resumed.
    Emit(Box<Pipe<'s, L, I, O, U, E, R>>, Finalizer<'s, E>, O),
    /// Wait for upstream: either the next input item (`Left`) or the upstream
    /// result once upstream has finished (`Right`).
    Request(Box<dyn FnOnce(Either<I, U>) -> Pipe<'s, L, I, O, U, E, R> + 's>),
    /// Finish with a result.
    Done(R),
    /// Run an effect in the host context to obtain the next step.
    Effect(EffectFuture<'s, Pipe<'s, L, I, O, U, E, R>, E>),
    /// Push an item back into the input stream; the next consumer of input
    /// must see it before any genuinely new item.
    Unread(Box<Pipe<'s, L, I, O, U, E, R>>, L),
}

/// A pipe that consumes no input and emits items of type `O`.
pub type Source<'s, O, E> = Pipe<'s, Infallible, Infallible, O, (), E, ()>;

/// A pipe that emits nothing and consumes items of type `I` into a result `R`.
///
/// Sinks may push back input they looked at but did not consume, hence the
/// leftover type equals the input type.
pub type Sink<'s, I, E, R> = Pipe<'s, I, I, Infallible, (), E, R>;

/// A pipe that consumes items of type `I` and emits items of type `O`.
pub type Transform<'s, I, O, E> = Pipe<'s, I, I, O, (), E, ()>;

/// Wraps a future as a [`Finalizer`].
pub fn finalizer<'s, E, Fut>(fut: Fut) -> Finalizer<'s, E>
where
    E: 's,
    Fut: Future<Output = Result<(), E>> + 's,
{
    Box::pin(fut)
}

/// The finalizer that does nothing and cannot fail to do it.
pub fn noop_finalizer<'s, E: 's>() -> Finalizer<'s, E> {
    Box::pin(core::future::ready(Ok(())))
}

impl<'s, L: 's, I: 's, O: 's, U: 's, E: 's, R: 's> Pipe<'s, L, I, O, U, E, R> {
    /// Creates a [`Pipe::Request`] step, hiding the boxing.
    pub fn request<F>(on_step: F) -> Self
    where
        F: FnOnce(Either<I, U>) -> Self + 's,
    {
        Pipe::Request(Box::new(on_step))
    }

    /// Creates a [`Pipe::Effect`] step, hiding the boxing and pinning.
    pub fn effect<Fut>(fut: Fut) -> Self
    where
        Fut: Future<Output = Result<Self, E>> + 's,
    {
        Pipe::Effect(Box::pin(fut))
    }

    /// Sequences this pipe with a continuation on its result.
    ///
    /// Runs `self` to completion, then continues as `on_result(r)` where `r`
    /// is the result `self` finished with. Emissions, requests, leftovers and
    /// effects of `self` all happen before anything of the continuation, in
    /// their original order. The finalizer of an emission belongs to the
    /// emission alone and does not compose with the continuation.
    ///
    /// ```
    /// use pipefuse::prelude::*;
    ///
    /// let source = emit(1).and_then(|()| emit(2));
    /// let pipeline = fuse(source, sum());
    ///
    /// fn sum<'s>() -> Pipe<'s, Infallible, u32, Infallible, (), Infallible, u32> {
    ///     fn go<'s>(total: u32) -> Pipe<'s, Infallible, u32, Infallible, (), Infallible, u32> {
    ///         input().and_then(move |next| match next {
    ///             Some(item) => go(total + item),
    ///             None => Pipe::Done(total),
    ///         })
    ///     }
    ///     go(0)
    /// }
    ///
    /// assert_eq!(pollster::block_on(run_pipe(pipeline)), Ok(3));
    /// ```
    pub fn and_then<R2, F>(self, on_result: F) -> Pipe<'s, L, I, O, U, E, R2>
    where
        R2: 's,
        F: FnOnce(R) -> Pipe<'s, L, I, O, U, E, R2> + 's,
    {
        match self {
            Pipe::Done(result) => on_result(result),
            Pipe::Emit(next, fin, item) => Pipe::Emit(Box::new(next.and_then(on_result)), fin, item),
            Pipe::Request(on_step) => Pipe::request(move |step| on_step(step).and_then(on_result)),
            Pipe::Effect(effect) => Pipe::effect(async move { Ok(effect.await?.and_then(on_result)) }),
            Pipe::Unread(next, item) => Pipe::Unread(Box::new(next.and_then(on_result)), item),
        }
    }

    /// Maps the result this pipe finishes with.
    pub fn map_result<R2, F>(self, fun: F) -> Pipe<'s, L, I, O, U, E, R2>
    where
        R2: 's,
        F: FnOnce(R) -> R2 + 's,
    {
        self.and_then(|result| Pipe::Done(fun(result)))
    }
}

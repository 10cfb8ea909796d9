//! Fusion: connecting two pipes end-to-end into one.
//!
//! [`fuse`] drives the downstream pipe and consults the upstream pipe only
//! when downstream genuinely needs input. This right-biased dispatch is the
//! crate's central contract: no upstream effect runs before downstream asks
//! for data, so stopping early never pays for data it did not want.
//!
//! [`fuse_resume`] is the variant that keeps the upstream pipe alive across
//! the composition, for consumers that stop while upstream still has items
//! to give — see [`Resumable`].

use alloc::boxed::Box;

use either::Either::{Left, Right};

use crate::pipe::{noop_finalizer, Finalizer, Pipe};

use core::convert::Infallible;

/// Fuses two pipes: the left pipe supplies the input of the right pipe.
///
/// The result consumes what the left pipe consumes and emits what the right
/// pipe emits; it finishes with the right pipe's result. When the right pipe
/// finishes, the pending finalizer of the left pipe's most recently accepted
/// emission runs exactly once; the rest of the left pipe is dropped without
/// being stepped. When the left pipe finishes first, its result is delivered
/// to every subsequent request of the right pipe, which is why the
/// intermediate result type must be `Clone`.
///
/// Neither side may push back input: both leftover types are [`Infallible`].
/// Absorb leftovers first ([`Pipe::inject_leftovers`]) or use [`fuse_resume`],
/// which routes them.
///
/// ```
/// use pipefuse::prelude::*;
///
/// fn double<'s>() -> Transform<'s, u32, u32, Infallible> {
///     input().and_then(|next| match next {
///         Some(item) => emit(item * 2).and_then(|()| double()),
///         None => Pipe::Done(()),
///     })
/// }
///
/// fn first<'s>() -> Pipe<'s, Infallible, u32, Infallible, (), Infallible, Option<u32>> {
///     input()
/// }
///
/// // A `Transform` may push back input, so absorb leftovers before fusing.
/// let pipeline = fuse(from_iter([3, 4]), fuse(double().inject_leftovers(), first()));
/// assert_eq!(pollster::block_on(run_pipe(pipeline)), Ok(Some(6)));
/// ```
pub fn fuse<'s, A, B, C, R0, R1, R2, E>(
    left: Pipe<'s, Infallible, A, B, R0, E, R1>,
    right: Pipe<'s, Infallible, B, C, R1, E, R2>,
) -> Pipe<'s, Infallible, A, C, R0, E, R2>
where
    A: 's,
    B: 's,
    C: 's,
    R0: 's,
    R1: Clone + 's,
    R2: 's,
    E: 's,
{
    fuse_with(noop_finalizer(), left, right)
}

/// The fusion loop proper, carrying the pending left-side finalizer: the
/// action to run if the left pipe is abandoned right now.
fn fuse_with<'s, A, B, C, R0, R1, R2, E>(
    pending: Finalizer<'s, E>,
    left: Pipe<'s, Infallible, A, B, R0, E, R1>,
    right: Pipe<'s, Infallible, B, C, R1, E, R2>,
) -> Pipe<'s, Infallible, A, C, R0, E, R2>
where
    A: 's,
    B: 's,
    C: 's,
    R0: 's,
    R1: Clone + 's,
    R2: 's,
    E: 's,
{
    match right {
        // Downstream is finished: settle the pending upstream finalizer, then
        // finish with downstream's result. The rest of the left pipe is
        // dropped unstepped.
        Pipe::Done(result) => Pipe::effect(async move {
            pending.await?;
            Ok(Pipe::Done(result))
        }),
        Pipe::Emit(next, fin, item) => {
            Pipe::Emit(Box::new(fuse_with(pending, left, *next)), fin, item)
        }
        Pipe::Effect(effect) => {
            Pipe::effect(async move { Ok(fuse_with(pending, left, effect.await?)) })
        }
        Pipe::Unread(_, impossible) => match impossible {},
        // Downstream needs input: now, and only now, step the upstream pipe.
        Pipe::Request(on_step) => match left {
            // Upstream finished first. Its result is what downstream's
            // upstream-done branch receives, now and on every later request.
            // The pending finalizer belongs to no live emission any more and
            // is dropped.
            Pipe::Done(result) => {
                let parked = Pipe::Done(result.clone());
                fuse_with(noop_finalizer(), parked, on_step(Right(result)))
            }
            // An item for downstream. The emission's finalizer supplants the
            // pending one, which is dropped: its emission was accepted.
            Pipe::Emit(next, fin, item) => fuse_with(fin, *next, on_step(Left(item))),
            Pipe::Effect(effect) => Pipe::effect(async move {
                Ok(fuse_with(pending, effect.await?, Pipe::Request(on_step)))
            }),
            Pipe::Request(on_left_step) => Pipe::request(move |step| {
                fuse_with(pending, on_left_step(step), Pipe::Request(on_step))
            }),
            Pipe::Unread(_, impossible) => match impossible {},
        },
    }
}

/// The upstream half of a paused composition: a pipe that can keep producing,
/// together with the finalizer pending for its most recently accepted
/// emission.
///
/// Produced by [`fuse_resume`] when the downstream pipe finishes. Either fuse
/// it again, or [`close`](Resumable::close) it to settle the pending
/// finalizer.
#[must_use = "a resumable pipe holds a pending finalizer; fuse it again or close it"]
pub struct Resumable<'s, L: 's, I: 's, O: 's, U: 's, E: 's, R: 's> {
    pipe: Pipe<'s, L, I, O, U, E, R>,
    pending: Finalizer<'s, E>,
}

impl<'s, L: 's, I: 's, O: 's, U: 's, E: 's, R: 's> Resumable<'s, L, I, O, U, E, R> {
    /// Wraps a fresh pipe with no pending finalizer.
    pub fn new(pipe: Pipe<'s, L, I, O, U, E, R>) -> Self {
        Resumable {
            pipe,
            pending: noop_finalizer(),
        }
    }

    /// Splits into the pipe and the pending finalizer.
    ///
    /// The caller takes over the obligation to either resume the pipe or run
    /// the finalizer.
    pub fn into_parts(self) -> (Pipe<'s, L, I, O, U, E, R>, Finalizer<'s, E>) {
        (self.pipe, self.pending)
    }

    /// Abandons the pipe and runs the pending finalizer.
    pub async fn close(self) -> Result<(), E> {
        drop(self.pipe);
        self.pending.await
    }

    /// Re-attaches a leftover stripped off during fusion.
    fn pushed_back(self, item: L) -> Self {
        Resumable {
            pipe: Pipe::Unread(Box::new(self.pipe), item),
            pending: self.pending,
        }
    }
}

/// Fuses two pipes like [`fuse`], but keeps the left pipe usable afterwards.
///
/// The composed pipe finishes with the right pipe's result *paired with* the
/// left pipe's remaining state as a [`Resumable`], so a consumer that stops
/// early (a parser reading a prefix, say) does not forfeit the rest of the
/// stream.
///
/// Differences from [`fuse`]:
///
/// - When the right pipe finishes, the pending left finalizer is *not* run;
///   it travels with the returned [`Resumable`].
/// - The right pipe may push back input. A pushed-back item is re-attached to
///   the left side as a synthesised emission, so it will be produced again on
///   the next pull.
/// - The left pipe may also push back input; its leftovers are stripped
///   during fusion and re-attached to the resumable pipe afterwards.
/// - When the left pipe finishes while the right pipe still wants input, the
///   right pipe is drained with [`Pipe::upstream_done`]; leftovers it pushes
///   during that drain are discarded.
pub fn fuse_resume<'s, L, A, B, C, R0, R1, R2, E>(
    left: Resumable<'s, L, A, B, R0, E, R1>,
    right: Pipe<'s, B, B, C, R1, E, R2>,
) -> Pipe<'s, L, A, C, R0, E, (Resumable<'s, L, A, B, R0, E, R1>, R2)>
where
    L: 's,
    A: 's,
    B: 's,
    C: 's,
    R0: 's,
    R1: Clone + 's,
    R2: 's,
    E: 's,
{
    let Resumable { pipe, pending } = left;
    fuse_resume_with(pending, pipe, right)
}

fn fuse_resume_with<'s, L, A, B, C, R0, R1, R2, E>(
    pending: Finalizer<'s, E>,
    left: Pipe<'s, L, A, B, R0, E, R1>,
    right: Pipe<'s, B, B, C, R1, E, R2>,
) -> Pipe<'s, L, A, C, R0, E, (Resumable<'s, L, A, B, R0, E, R1>, R2)>
where
    L: 's,
    A: 's,
    B: 's,
    C: 's,
    R0: 's,
    R1: Clone + 's,
    R2: 's,
    E: 's,
{
    match right {
        Pipe::Done(result) => Pipe::Done((
            Resumable {
                pipe: left,
                pending,
            },
            result,
        )),
        Pipe::Emit(next, fin, item) => {
            Pipe::Emit(Box::new(fuse_resume_with(pending, left, *next)), fin, item)
        }
        Pipe::Effect(effect) => {
            Pipe::effect(async move { Ok(fuse_resume_with(pending, left, effect.await?)) })
        }
        // A pushback across the fusion boundary: materialise it as a left
        // emission carrying the pending finalizer, to be produced again on
        // the next pull.
        Pipe::Unread(next, item) => {
            let synthesised = Pipe::Emit(Box::new(left), pending, item);
            fuse_resume_with(noop_finalizer(), synthesised, *next)
        }
        Pipe::Request(on_step) => match left {
            Pipe::Emit(next, fin, item) => fuse_resume_with(fin, *next, on_step(Left(item))),
            Pipe::Effect(effect) => Pipe::effect(async move {
                Ok(fuse_resume_with(pending, effect.await?, Pipe::Request(on_step)))
            }),
            Pipe::Request(on_left_step) => Pipe::request(move |step| {
                fuse_resume_with(pending, on_left_step(step), Pipe::Request(on_step))
            }),
            // Strip the left pushback for the duration of the fusion and
            // re-attach it to whatever is left of the left pipe at the end.
            Pipe::Unread(next, item) => fuse_resume_with(pending, *next, Pipe::Request(on_step))
                .map_result(move |(resumable, result)| (resumable.pushed_back(item), result)),
            // Upstream finished: drain the right pipe, then pair its result
            // with the finished left state.
            Pipe::Done(result) => {
                let drained = on_step(Right(result.clone())).upstream_done(result.clone());
                drained.map_result(move |right_result| {
                    (
                        Resumable {
                            pipe: Pipe::Done(result),
                            pending,
                        },
                        right_result,
                    )
                })
            }
        },
    }
}

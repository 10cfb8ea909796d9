use alloc::boxed::Box;
use core::future::Future;

use super::Pipe;

impl<'s, L: 's, I: 's, O: 's, U: 's, E: 's, R: 's> Pipe<'s, L, I, O, U, E, R> {
    /// Registers a cleanup action that runs when this pipe finishes or is
    /// abandoned.
    ///
    /// The callback receives `true` when the pipe ran to completion and
    /// `false` when it was abandoned; it runs exactly once either way. On the
    /// abandonment path the cleanup runs before the emission's own
    /// early-close finalizer.
    ///
    /// The callback must be `Clone` because completion and abandonment are
    /// alternative futures of the same pipe, and each path needs to own it.
    pub fn add_cleanup<C, Fut>(self, cleanup: C) -> Self
    where
        C: FnOnce(bool) -> Fut + Clone + 's,
        Fut: Future<Output = Result<(), E>> + 's,
    {
        match self {
            Pipe::Done(result) => Pipe::effect(async move {
                cleanup(true).await?;
                Ok(Pipe::Done(result))
            }),
            Pipe::Emit(next, fin, item) => {
                let on_abandon = cleanup.clone();
                Pipe::Emit(
                    Box::new(next.add_cleanup(cleanup)),
                    Box::pin(async move {
                        on_abandon(false).await?;
                        fin.await
                    }),
                    item,
                )
            }
            Pipe::Request(on_step) => Pipe::request(move |step| on_step(step).add_cleanup(cleanup)),
            Pipe::Effect(effect) => Pipe::effect(async move { Ok(effect.await?.add_cleanup(cleanup)) }),
            Pipe::Unread(next, item) => Pipe::Unread(Box::new(next.add_cleanup(cleanup)), item),
        }
    }
}

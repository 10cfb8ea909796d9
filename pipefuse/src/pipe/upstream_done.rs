use alloc::boxed::Box;

use either::Either::Right;

use super::Pipe;

impl<'s, L: 's, I: 's, O: 's, U: 's, E: 's, R: 's> Pipe<'s, L, I, O, U, E, R> {
    /// Answers every request of this pipe with "upstream finished with
    /// `result`".
    ///
    /// Emissions and effects are preserved; requests are eliminated, which
    /// frees the input and upstream-result types. Leftovers are unwrapped and
    /// their items discarded: with upstream gone, there is no input stream
    /// left to receive a pushback.
    ///
    /// The resume-capable fusion uses this to drain the downstream pipe once
    /// its upstream has finished.
    pub fn upstream_done<L2, I2, U2>(self, result: U) -> Pipe<'s, L2, I2, O, U2, E, R>
    where
        U: Clone,
        L2: 's,
        I2: 's,
        U2: 's,
    {
        match self {
            Pipe::Done(done) => Pipe::Done(done),
            Pipe::Emit(next, fin, item) => {
                Pipe::Emit(Box::new(next.upstream_done(result)), fin, item)
            }
            Pipe::Request(on_step) => on_step(Right(result.clone())).upstream_done(result),
            Pipe::Effect(effect) => {
                Pipe::effect(async move { Ok(effect.await?.upstream_done(result)) })
            }
            Pipe::Unread(next, _discarded) => next.upstream_done(result),
        }
    }
}

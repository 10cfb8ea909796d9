use alloc::boxed::Box;

use either::Either::{Left, Right};

use super::Pipe;

impl<'s, L: 's, I: 's, O: 's, U: 's, E: 's, R: 's> Pipe<'s, L, I, O, U, E, R> {
    /// Adapts the input side of a pipe: incoming items are converted with
    /// `fun` before this pipe sees them, and leftovers this pipe pushes back
    /// are converted with `unfun` before the new input stream sees them.
    ///
    /// `unfun` is partial because not every leftover survives the change of
    /// representation; leftovers it maps to `None` are dropped.
    pub fn map_input<I2, L2, F, G>(self, mut fun: F, mut unfun: G) -> Pipe<'s, L2, I2, O, U, E, R>
    where
        I2: 's,
        L2: 's,
        F: FnMut(I2) -> I + 's,
        G: FnMut(L) -> Option<L2> + 's,
    {
        match self {
            Pipe::Done(result) => Pipe::Done(result),
            Pipe::Emit(next, fin, item) => Pipe::Emit(Box::new(next.map_input(fun, unfun)), fin, item),
            Pipe::Request(on_step) => Pipe::request(move |step| match step {
                Left(item) => {
                    let converted = fun(item);
                    on_step(Left(converted)).map_input(fun, unfun)
                }
                Right(result) => on_step(Right(result)).map_input(fun, unfun),
            }),
            Pipe::Effect(effect) => Pipe::effect(async move { Ok(effect.await?.map_input(fun, unfun)) }),
            Pipe::Unread(next, item) => match unfun(item) {
                Some(converted) => Pipe::Unread(Box::new(next.map_input(fun, unfun)), converted),
                None => next.map_input(fun, unfun),
            },
        }
    }
}

use alloc::boxed::Box;

use either::Either::Left;

use super::Pipe;

impl<'s, I: 's, O: 's, U: 's, E: 's, R: 's> Pipe<'s, I, I, O, U, E, R> {
    /// Absorbs every leftover back into the input stream.
    ///
    /// Each pushed-back item is delivered to the very next consumer of input
    /// inside the pipe itself, so the transformed pipe never surfaces a
    /// leftover, which is what frees its leftover type parameter.
    pub fn inject_leftovers<L2: 's>(self) -> Pipe<'s, L2, I, O, U, E, R> {
        match self {
            Pipe::Done(result) => Pipe::Done(result),
            Pipe::Emit(next, fin, item) => Pipe::Emit(Box::new(next.inject_leftovers()), fin, item),
            Pipe::Request(on_step) => Pipe::request(move |step| on_step(step).inject_leftovers()),
            Pipe::Effect(effect) => Pipe::effect(async move { Ok(effect.await?.inject_leftovers()) }),
            Pipe::Unread(next, item) => inject(item, *next).inject_leftovers(),
        }
    }

    /// Semantically prepends one item to the input stream of this pipe.
    ///
    /// Unlike [`unread`](super::unread), which *records* a pushback for the
    /// surrounding driver to route, this delivers the item into the pipe
    /// directly: a waiting request receives it immediately (flattening any
    /// leftover the continuation pushes straight back), and a finished pipe
    /// records it as a leftover for whoever drives the pipe next.
    pub fn push_input(self, item: I) -> Pipe<'s, I, I, O, U, E, R> {
        match self {
            Pipe::Done(result) => Pipe::Unread(Box::new(Pipe::Done(result)), item),
            Pipe::Emit(next, fin, out) => Pipe::Emit(Box::new(next.push_input(item)), fin, out),
            Pipe::Request(on_step) => match on_step(Left(item)) {
                Pipe::Unread(next, pushed) => next.push_input(pushed),
                advanced => advanced,
            },
            Pipe::Effect(effect) => Pipe::effect(async move { Ok(effect.await?.push_input(item)) }),
            Pipe::Unread(next, pushed) => next.push_input(pushed).push_input(item),
        }
    }
}

/// Feeds one unit of virtual input into a pipe, as if upstream had delivered
/// it.
///
/// The nested-leftover rule: when the pipe itself starts with a pushback, the
/// pushed item gets first claim on the virtual slot; only if it consumes the
/// slot for real does the original item get re-attached for the next round.
fn inject<'s, I: 's, O: 's, U: 's, E: 's, R: 's>(
    item: I,
    pipe: Pipe<'s, I, I, O, U, E, R>,
) -> Pipe<'s, I, I, O, U, E, R> {
    match pipe {
        Pipe::Done(result) => Pipe::Done(result),
        Pipe::Request(on_step) => on_step(Left(item)),
        Pipe::Effect(effect) => Pipe::effect(async move { Ok(inject(item, effect.await?)) }),
        Pipe::Emit(next, fin, out) => Pipe::Emit(Box::new(inject(item, *next)), fin, out),
        Pipe::Unread(next, nested) => match inject(nested, *next) {
            Pipe::Unread(absorbed, _) => *absorbed,
            advanced => Pipe::Unread(Box::new(advanced), item),
        },
    }
}

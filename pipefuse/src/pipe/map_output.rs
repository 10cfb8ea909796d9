use alloc::boxed::Box;

use super::Pipe;

impl<'s, L: 's, I: 's, O: 's, U: 's, E: 's, R: 's> Pipe<'s, L, I, O, U, E, R> {
    /// Maps every emitted item with a function.
    ///
    /// Requests, leftovers, effects, finalizers, and the result are untouched.
    pub fn map_output<O2, F>(self, mut fun: F) -> Pipe<'s, L, I, O2, U, E, R>
    where
        O2: 's,
        F: FnMut(O) -> O2 + 's,
    {
        match self {
            Pipe::Done(result) => Pipe::Done(result),
            Pipe::Emit(next, fin, item) => {
                let mapped = fun(item);
                Pipe::Emit(Box::new(next.map_output(fun)), fin, mapped)
            }
            Pipe::Request(on_step) => Pipe::request(move |step| on_step(step).map_output(fun)),
            Pipe::Effect(effect) => Pipe::effect(async move { Ok(effect.await?.map_output(fun)) }),
            Pipe::Unread(next, item) => Pipe::Unread(Box::new(next.map_output(fun)), item),
        }
    }

    /// Maps every emitted item with a function, dropping items for which it
    /// returns `None`.
    ///
    /// A dropped emission never reached downstream, so its early-close
    /// finalizer is dropped along with it rather than run.
    pub fn filter_map_output<O2, F>(self, mut fun: F) -> Pipe<'s, L, I, O2, U, E, R>
    where
        O2: 's,
        F: FnMut(O) -> Option<O2> + 's,
    {
        match self {
            Pipe::Done(result) => Pipe::Done(result),
            Pipe::Emit(next, fin, item) => match fun(item) {
                Some(mapped) => Pipe::Emit(Box::new(next.filter_map_output(fun)), fin, mapped),
                None => {
                    drop(fin);
                    next.filter_map_output(fun)
                }
            },
            Pipe::Request(on_step) => {
                Pipe::request(move |step| on_step(step).filter_map_output(fun))
            }
            Pipe::Effect(effect) => {
                Pipe::effect(async move { Ok(effect.await?.filter_map_output(fun)) })
            }
            Pipe::Unread(next, item) => Pipe::Unread(Box::new(next.filter_map_output(fun)), item),
        }
    }
}

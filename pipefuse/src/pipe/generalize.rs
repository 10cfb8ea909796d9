use alloc::boxed::Box;
use core::convert::Infallible;

use super::Pipe;

impl<'s, L: 's, I: 's, U: 's, E: 's, R: 's> Pipe<'s, L, I, Infallible, U, E, R> {
    /// Frees the output type of a pipe that provably emits nothing.
    ///
    /// Lets a sink participate in compositions that are typed for an
    /// arbitrary output. The emission case is vacuous.
    pub fn generalize_output<O2: 's>(self) -> Pipe<'s, L, I, O2, U, E, R> {
        match self {
            Pipe::Done(result) => Pipe::Done(result),
            Pipe::Emit(_, _, impossible) => match impossible {},
            Pipe::Request(on_step) => Pipe::request(move |step| on_step(step).generalize_output()),
            Pipe::Effect(effect) => Pipe::effect(async move { Ok(effect.await?.generalize_output()) }),
            Pipe::Unread(next, item) => Pipe::Unread(Box::new(next.generalize_output()), item),
        }
    }
}

impl<'s, I: 's, O: 's, U: 's, E: 's, R: 's> Pipe<'s, Infallible, I, O, U, E, R> {
    /// Frees the leftover type of a pipe that provably pushes nothing back.
    ///
    /// The leftover case is vacuous. Compare
    /// [`inject_leftovers`](Pipe::inject_leftovers), which earns the same
    /// freedom for pipes that do push back, by absorbing the pushbacks.
    pub fn generalize_leftovers<L2: 's>(self) -> Pipe<'s, L2, I, O, U, E, R> {
        match self {
            Pipe::Done(result) => Pipe::Done(result),
            Pipe::Emit(next, fin, item) => {
                Pipe::Emit(Box::new(next.generalize_leftovers()), fin, item)
            }
            Pipe::Request(on_step) => Pipe::request(move |step| on_step(step).generalize_leftovers()),
            Pipe::Effect(effect) => {
                Pipe::effect(async move { Ok(effect.await?.generalize_leftovers()) })
            }
            Pipe::Unread(_, impossible) => match impossible {},
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fuse;
    use crate::pipe::from_iter;
    use crate::testutil::*;

    #[test]
    fn a_generalized_sink_fuses_where_outputs_are_expected() {
        let widened: Pipe<Infallible, u32, std::string::String, (), Infallible, std::vec::Vec<u32>> =
            collect().generalize_output();
        let pipeline = fuse(from_iter([1, 2]), widened);
        pollster::block_on(async {
            let (emitted, collected) = drain_source(pipeline).await.unwrap();
            assert_eq!(emitted, std::vec::Vec::<std::string::String>::new());
            assert_eq!(collected, std::vec![1, 2]);
        });
    }

    #[test]
    fn a_generalized_pipe_is_otherwise_unchanged() {
        // `collect` never pushes back, so its leftover type can become the
        // input type, which is what `drive_sink` expects of a sink.
        let relabelled: Pipe<u32, u32, Infallible, (), Infallible, std::vec::Vec<u32>> =
            collect().generalize_leftovers();
        pollster::block_on(async {
            let collected = drive_sink(relabelled, std::vec![1, 2, 3]).await.unwrap();
            assert_eq!(collected, std::vec![1, 2, 3]);
        });
    }
}

use alloc::boxed::Box;

use super::Pipe;

impl<'s, L: 's, I: 's, O: 's, U: 's, E: 's, R: 's> Pipe<'s, L, I, O, U, E, R> {
    /// Maps the error channel of every embedded effect and finalizer.
    ///
    /// The common special case of an effect transformation: re-tagging the
    /// failure type without touching the effects themselves. For arbitrary
    /// wrapping of effects, see [`trans_effects`](Pipe::trans_effects).
    pub fn map_error<E2, F>(self, fun: F) -> Pipe<'s, L, I, O, U, E2, R>
    where
        E2: 's,
        F: FnMut(E) -> E2 + Clone + 's,
    {
        match self {
            Pipe::Done(result) => Pipe::Done(result),
            Pipe::Emit(next, fin, item) => {
                let mut for_finalizer = fun.clone();
                Pipe::Emit(
                    Box::new(next.map_error(fun)),
                    Box::pin(async move { fin.await.map_err(&mut for_finalizer) }),
                    item,
                )
            }
            Pipe::Request(on_step) => Pipe::request(move |step| on_step(step).map_error(fun)),
            Pipe::Effect(effect) => Pipe::effect(async move {
                let mut for_failure = fun.clone();
                match effect.await {
                    Ok(next) => Ok(next.map_error(fun)),
                    Err(error) => Err(for_failure(error)),
                }
            }),
            Pipe::Unread(next, item) => Pipe::Unread(Box::new(next.map_error(fun)), item),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipe::emit;
    use crate::testutil::*;
    use core::future::ready;

    #[test]
    fn map_error_retags_effect_failures() {
        let source: Pipe<core::convert::Infallible, core::convert::Infallible, u32, (), &str, ()> =
            emit(1).and_then(|()| Pipe::effect(ready(Err("boom"))));
        let retagged = source.map_error(|e| std::format!("wrapped: {e}"));
        pollster::block_on(async {
            let outcome = drain_source(retagged).await;
            assert_eq!(outcome, Err(std::string::String::from("wrapped: boom")));
        });
    }

    #[test]
    fn map_error_leaves_successful_runs_alone() {
        let source: Pipe<core::convert::Infallible, core::convert::Infallible, u32, (), &str, ()> =
            emit(1).and_then(|()| emit(2));
        let retagged = source.map_error(|e| std::format!("wrapped: {e}"));
        pollster::block_on(async {
            let (emitted, ()) = drain_source(retagged).await.unwrap();
            assert_eq!(emitted, std::vec![1, 2]);
        });
    }
}

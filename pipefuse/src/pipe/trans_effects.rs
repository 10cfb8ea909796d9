use alloc::boxed::Box;

use super::{EffectFuture, Pipe};

/// A uniform transformation of the effect context of a pipe.
///
/// `transform` is applied to *every* effect embedded in a pipe (the payload
/// of every [`Effect`](Pipe::Effect) node and the finalizer of every
/// [`Emit`](Pipe::Emit) node), so it must be uniform: it may wrap, instrument,
/// or re-tag an effect, but it works at every success type `T` alike.
///
/// This is a capability object with a single generic method because the
/// transformation has to be usable at each of the infinitely many success
/// types occurring inside one pipe.
pub trait TransformEffects<'s, E1: 's, E2: 's> {
    /// Transforms one embedded effect.
    fn transform<T: 's>(&self, effect: EffectFuture<'s, T, E1>) -> EffectFuture<'s, T, E2>;
}

impl<'s, L: 's, I: 's, O: 's, U: 's, E: 's, R: 's> Pipe<'s, L, I, O, U, E, R> {
    /// Applies a uniform effect transformation to every effect and finalizer
    /// embedded in this pipe.
    pub fn trans_effects<E2, N>(self, nat: N) -> Pipe<'s, L, I, O, U, E2, R>
    where
        E2: 's,
        N: TransformEffects<'s, E, E2> + 's,
    {
        match self {
            Pipe::Done(result) => Pipe::Done(result),
            Pipe::Emit(next, fin, item) => {
                let fin = nat.transform(fin);
                Pipe::Emit(Box::new(next.trans_effects(nat)), fin, item)
            }
            Pipe::Request(on_step) => Pipe::request(move |step| on_step(step).trans_effects(nat)),
            Pipe::Effect(effect) => {
                let effect = nat.transform(effect);
                Pipe::effect(async move { Ok(effect.await?.trans_effects(nat)) })
            }
            Pipe::Unread(next, item) => Pipe::Unread(Box::new(next.trans_effects(nat)), item),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipe::{emit, emit_with};
    use crate::testutil::*;
    use core::convert::Infallible;

    #[derive(Clone)]
    struct CountEffects {
        runs: std::rc::Rc<core::cell::Cell<usize>>,
    }

    impl<'s> TransformEffects<'s, Infallible, Infallible> for CountEffects {
        fn transform<T: 's>(
            &self,
            effect: EffectFuture<'s, T, Infallible>,
        ) -> EffectFuture<'s, T, Infallible> {
            let runs = self.runs.clone();
            Box::pin(async move {
                runs.set(runs.get() + 1);
                effect.await
            })
        }
    }

    #[test]
    fn trans_effects_wraps_every_executed_effect() {
        let log = new_log();
        let runs = std::rc::Rc::new(core::cell::Cell::new(0));
        let source: Pipe<Infallible, Infallible, u32, (), Infallible, ()> =
            log_effect(&log, "one")
                .and_then(|()| emit(1))
                .and_then(|()| log_effect(&log, "two"))
                .and_then(|()| emit(2));
        let counted = source.trans_effects(CountEffects { runs: runs.clone() });
        pollster::block_on(async {
            let (emitted, ()) = drain_source(counted).await.unwrap();
            assert_eq!(emitted, std::vec![1, 2]);
        });
        // Both effects were wrapped and ran; no finalizer ran.
        assert_eq!(runs.get(), 2);
        assert_eq!(log.borrow().as_slice(), ["one", "two"]);
    }

    #[test]
    fn trans_effects_reaches_finalizers_when_they_run() {
        let log = new_log();
        let runs = std::rc::Rc::new(core::cell::Cell::new(0));
        let source: Pipe<Infallible, Infallible, u32, (), Infallible, ()> =
            emit_with(1, log_finalizer(&log, "abandoned one"))
                .and_then(|()| emit_with(2, log_finalizer(&log, "abandoned two")));
        let counted = source.trans_effects(CountEffects { runs: runs.clone() });
        pollster::block_on(async {
            // Fusing with a consumer that stops after one item abandons the
            // source mid-stream, which runs the pending finalizer.
            let consumed = crate::run_pipe(crate::fuse(counted, take(1))).await.unwrap();
            assert_eq!(consumed, std::vec![1]);
        });
        assert_eq!(log.borrow().as_slice(), ["abandoned one"]);
        assert_eq!(runs.get(), 1);
    }
}

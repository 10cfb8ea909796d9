//! The building blocks users assemble pipes from.

use alloc::boxed::Box;
use core::future::Future;

use either::Either::{Left, Right};

use super::{noop_finalizer, Pipe};

/// Waits for the next input item.
///
/// Finishes with `Some(item)` when upstream delivers an item, and with `None`
/// once upstream has finished. The upstream result is discarded; use
/// [`input_or_final`] to keep it.
///
/// ```
/// use pipefuse::prelude::*;
///
/// let pipeline = fuse(from_iter([4]), input());
/// assert_eq!(pollster::block_on(run_pipe(pipeline)), Ok::<_, Infallible>(Some(4)));
/// ```
pub fn input<'s, L: 's, I: 's, O: 's, U: 's, E: 's>() -> Pipe<'s, L, I, O, U, E, Option<I>> {
    Pipe::request(|step| match step {
        Left(item) => Pipe::Done(Some(item)),
        Right(_) => Pipe::Done(None),
    })
}

/// Waits for the next input item, preserving the upstream result.
///
/// Finishes with `Left(item)` when upstream delivers an item, and with
/// `Right(result)` once upstream has finished. This lets a pipe emit a
/// final tail that depends on how upstream ended.
pub fn input_or_final<'s, L: 's, I: 's, O: 's, U: 's, E: 's>(
) -> Pipe<'s, L, I, O, U, E, either::Either<I, U>> {
    Pipe::request(Pipe::Done)
}

/// Emits one item downstream, with no early-close finalizer.
pub fn emit<'s, L: 's, I: 's, O: 's, U: 's, E: 's>(item: O) -> Pipe<'s, L, I, O, U, E, ()> {
    Pipe::Emit(Box::new(Pipe::Done(())), noop_finalizer(), item)
}

/// Emits one item downstream with an early-close finalizer.
///
/// The finalizer runs exactly once if downstream never resumes this pipe
/// after the emission; it never runs if the pipe is resumed.
pub fn emit_with<'s, L: 's, I: 's, O: 's, U: 's, E: 's, Fut>(
    item: O,
    on_abandon: Fut,
) -> Pipe<'s, L, I, O, U, E, ()>
where
    Fut: Future<Output = Result<(), E>> + 's,
{
    Pipe::Emit(Box::new(Pipe::Done(())), Box::pin(on_abandon), item)
}

/// Pushes an item back into the input stream.
///
/// The next consumer of input sees the pushed item before any genuinely new
/// item.
pub fn unread<'s, L: 's, I: 's, O: 's, U: 's, E: 's>(item: L) -> Pipe<'s, L, I, O, U, E, ()> {
    Pipe::Unread(Box::new(Pipe::Done(())), item)
}

/// Passes every input item through unchanged, finishing with the upstream
/// result once upstream finishes.
///
/// This is the identity of [`fuse`](crate::fuse) on both sides.
pub fn echo<'s, L: 's, A: 's, E: 's, R: 's>() -> Pipe<'s, L, A, A, R, E, R> {
    Pipe::request(|step| match step {
        Left(item) => Pipe::Emit(Box::new(echo()), noop_finalizer(), item),
        Right(result) => Pipe::Done(result),
    })
}

/// Reports whether upstream has another item, without consuming it.
///
/// Peeks by receiving the next item and immediately pushing it back as a
/// leftover, so the following consumer of input still sees it.
pub fn has_input<'s, I: 's, O: 's, U: 's, E: 's>() -> Pipe<'s, I, I, O, U, E, bool> {
    Pipe::request(|step| match step {
        Left(item) => Pipe::Unread(Box::new(Pipe::Done(true)), item),
        Right(_) => Pipe::Done(false),
    })
}

/// Emits every item of an iterator in order, then finishes.
///
/// The node chain is built up front; the resulting pipe performs no effects.
///
/// ```
/// use pipefuse::prelude::*;
///
/// let pipeline = fuse(from_iter([1, 2, 3]), input());
/// assert_eq!(pollster::block_on(run_pipe(pipeline)), Ok::<_, Infallible>(Some(1)));
/// ```
pub fn from_iter<'s, L: 's, I: 's, U: 's, E: 's, T>(
    items: T,
) -> Pipe<'s, L, I, T::Item, U, E, ()>
where
    T: IntoIterator,
    T::Item: 's,
    T::IntoIter: DoubleEndedIterator,
{
    items
        .into_iter()
        .rev()
        .fold(Pipe::Done(()), |rest, item| {
            Pipe::Emit(Box::new(rest), noop_finalizer(), item)
        })
}

/// Builds a source in continuation-passing style.
///
/// The callback receives a `cons` function that prepends an emission to a
/// pipe, and the terminal `nil` pipe, and assembles the source from them:
///
/// ```
/// use pipefuse::prelude::*;
///
/// let source: Pipe<Infallible, Infallible, u32, (), Infallible, ()> =
///     build(|cons, nil| cons(1, cons(2, nil)));
/// ```
pub fn build<'s, L: 's, I: 's, O: 's, U: 's, E: 's, G>(assemble: G) -> Pipe<'s, L, I, O, U, E, ()>
where
    G: FnOnce(
        fn(O, Pipe<'s, L, I, O, U, E, ()>) -> Pipe<'s, L, I, O, U, E, ()>,
        Pipe<'s, L, I, O, U, E, ()>,
    ) -> Pipe<'s, L, I, O, U, E, ()>,
{
    fn cons<'s, L: 's, I: 's, O: 's, U: 's, E: 's>(
        item: O,
        rest: Pipe<'s, L, I, O, U, E, ()>,
    ) -> Pipe<'s, L, I, O, U, E, ()> {
        Pipe::Emit(Box::new(rest), noop_finalizer(), item)
    }
    assemble(cons, Pipe::Done(()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::*;
    use core::convert::Infallible;
    use either::Either;

    #[test]
    fn input_distinguishes_items_from_upstream_end() {
        pollster::block_on(async {
            let some = drive_sink(input(), std::vec![5]).await;
            assert_eq!(some, Ok::<_, Infallible>(Some(5)));

            let none = drive_sink(input(), std::vec![]).await;
            assert_eq!(none, Ok::<_, Infallible>(None::<u32>));
        });
    }

    #[test]
    fn input_or_final_keeps_the_upstream_result() {
        pollster::block_on(async {
            let item = drive_sink(input_or_final(), std::vec![5]).await;
            assert_eq!(item, Ok::<_, Infallible>(Either::Left(5)));

            let fin = drive_sink(input_or_final(), std::vec![]).await;
            assert_eq!(fin, Ok::<_, Infallible>(Either::<u32, ()>::Right(())));
        });
    }

    #[test]
    fn has_input_peeks_without_consuming() {
        let peek_then_read = has_input().and_then(|available| {
            input().map_result(move |next| (available, next))
        });
        pollster::block_on(async {
            let observed = drive_sink(peek_then_read, std::vec![7]).await;
            assert_eq!(observed, Ok::<_, Infallible>((true, Some(7))));
        });
    }

    #[test]
    fn has_input_reports_exhaustion() {
        pollster::block_on(async {
            let observed = drive_sink(has_input::<u32, _, _, _>(), std::vec![]).await;
            assert_eq!(observed, Ok::<_, Infallible>(false));
        });
    }

    #[test]
    fn from_iter_emits_in_order() {
        pollster::block_on(async {
            let (emitted, ()) = drain_source::<_, _, Infallible>(from_iter([1, 2, 3]))
                .await
                .unwrap();
            assert_eq!(emitted, std::vec![1, 2, 3]);
        });
    }

    #[test]
    fn build_assembles_the_same_chain_as_from_iter() {
        pollster::block_on(async {
            let built = drain_source::<_, _, Infallible>(build(|cons, nil| cons(1, cons(2, nil))))
                .await
                .unwrap();
            let folded = drain_source::<_, _, Infallible>(from_iter([1, 2])).await.unwrap();
            assert_eq!(built, folded);
        });
    }

    #[test]
    fn echo_passes_items_through_and_returns_the_upstream_result() {
        use either::Either::{Left, Right};

        let mut pipe: Pipe<Infallible, u32, u32, &str, Infallible, &str> = echo();
        let mut emitted = std::vec::Vec::new();
        for item in [1, 2] {
            pipe = match pipe {
                Pipe::Request(on_step) => on_step(Left(item)),
                _ => panic!("echo must wait for input"),
            };
            pipe = match pipe {
                Pipe::Emit(next, _, out) => {
                    emitted.push(out);
                    *next
                }
                _ => panic!("echo must emit what it received"),
            };
        }
        let result = match pipe {
            Pipe::Request(on_step) => on_step(Right("the end")),
            _ => panic!("echo must wait for input"),
        };
        assert_eq!(emitted, std::vec![1, 2]);
        match result {
            Pipe::Done("the end") => {}
            _ => panic!("echo must finish with the upstream result"),
        }
    }

    #[test]
    fn emit_with_finalizer_is_dropped_when_the_emission_is_consumed() {
        let log = new_log();
        let source: Pipe<Infallible, Infallible, u32, (), Infallible, ()> =
            emit_with(1, log_finalizer(&log, "abandoned"));
        pollster::block_on(async {
            let (emitted, ()) = drain_source(source).await.unwrap();
            assert_eq!(emitted, std::vec![1]);
        });
        assert!(log.borrow().is_empty());
    }
}

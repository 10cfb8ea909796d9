//! A source with fully scripted observable behaviour, for testing code that
//! drives arbitrary pipes.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use arbitrary::Arbitrary;
use derive_builder::Builder;

use crate::pipe::{Pipe, Source};

/// Returns a [`TestSourceBuilder`] for building a source with fully
/// configurable observable behaviour.
///
/// ```
/// use pipefuse::prelude::*;
///
/// let log = AbandonLog::new();
/// let source = build_test_source::<u32, char>()
///     .items(vec![1, 2, 3])
///     .build()
///     .unwrap()
///     .into_source(&log);
///
/// let pipeline = fuse(source, input());
/// assert_eq!(pollster::block_on(run_pipe(pipeline)), Ok(Some(1)));
/// // The source was abandoned right after its first emission was accepted.
/// assert_eq!(log.fired(), vec![0]);
/// ```
pub fn build_test_source<O, E>() -> TestSourceBuilder<O, E>
where
    O: Clone,
    E: Clone,
{
    TestSourceBuilder::create_empty()
}

/// A source that emits a scripted sequence of items and then either finishes
/// regularly or fails with a scripted error.
///
/// Every emission carries a finalizer that reports to an [`AbandonLog`], so
/// tests can observe exactly where a driver abandoned the source.
///
/// Create via [`build_test_source`], [`TestSource::new`], or the `Arbitrary`
/// implementation (for use from a fuzzer).
#[derive(Debug, Clone, Builder)]
#[builder(no_std)]
pub struct TestSource<O, E> {
    /// Configures the items the built [`TestSource`] will emit, in order.
    items: Vec<O>,
    /// Configures the error the built [`TestSource`] will fail with after its
    /// last item; without one, the source finishes regularly.
    #[builder(default)]
    #[builder(setter(strip_option))]
    failure: Option<E>,
}

impl<O, E> TestSource<O, E> {
    /// Creates a source that emits the given items and then finishes
    /// regularly.
    pub fn new(items: Vec<O>) -> Self {
        TestSource {
            items,
            failure: None,
        }
    }

    /// Returns the items the source will emit.
    pub fn as_slice(&self) -> &[O] {
        &self.items
    }

    /// Returns a reference to the error the source will fail with, if any.
    pub fn peek_failure(&self) -> Option<&E> {
        self.failure.as_ref()
    }

    /// Consumes the script and returns the actual source pipe.
    ///
    /// The finalizer of the emission at index `i` reports `i` to the log when
    /// it runs, that is, when the source is abandoned after emission `i` was
    /// accepted but before the next one was pulled.
    pub fn into_source<'s>(self, log: &AbandonLog) -> Source<'s, O, E>
    where
        O: 's,
        E: 's,
    {
        let terminal: Source<'s, O, E> = match self.failure {
            None => Pipe::Done(()),
            Some(error) => Pipe::effect(core::future::ready(Err(error))),
        };
        self.items
            .into_iter()
            .enumerate()
            .rev()
            .fold(terminal, |rest, (index, item)| {
                let log = log.clone();
                Pipe::Emit(
                    Box::new(rest),
                    Box::pin(async move {
                        log.note(index);
                        Ok(())
                    }),
                    item,
                )
            })
    }
}

impl<'a, O, E> Arbitrary<'a> for TestSource<O, E>
where
    O: Arbitrary<'a>,
    E: Arbitrary<'a>,
{
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(TestSource {
            items: Arbitrary::arbitrary(u)?,
            failure: Arbitrary::arbitrary(u)?,
        })
    }
}

/// A shared record of which [`TestSource`] emission finalizers ran, by item
/// index, in order.
///
/// Cloning clones the handle; all clones observe the same record.
#[derive(Debug, Clone, Default)]
pub struct AbandonLog {
    fired: Rc<RefCell<Vec<usize>>>,
}

impl AbandonLog {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the indices whose finalizers ran, in order.
    pub fn fired(&self) -> Vec<usize> {
        self.fired.borrow().clone()
    }

    /// Returns whether no finalizer ran yet.
    pub fn is_empty(&self) -> bool {
        self.fired.borrow().is_empty()
    }

    fn note(&self, index: usize) {
        self.fired.borrow_mut().push(index);
    }
}

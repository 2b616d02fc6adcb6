//! Concurrent fan-out combinators.
//!
//! [`parallel`] invokes a list of producers and [`async_each`] maps a function
//! over a slice. Both invoke everything eagerly, before anything is awaited, then
//! join the resulting promises. Results come back in input order regardless of
//! completion order.
//!
//! The first rejection rejects the joined promise with the original reason. The
//! promises still outstanding at that point are not cancelled: they are handed
//! to the background [`pool`](crate::pool) and run to completion there, their
//! outcomes ignored.
use std::{
    mem,
    pin::Pin,
    task::{Context, Poll},
};

use futures::{
    FutureExt, StreamExt,
    future::{self, BoxFuture},
    stream::FuturesUnordered,
};

use crate::{
    pool,
    promise::{IntoPromise, Promise},
};

/// A boxed zero-argument producer, for lists mixing different closures.
pub type Producer<T, E> = Box<dyn FnOnce() -> Promise<T, E> + Send>;

/// Boxes a closure into a [`Producer`], lifting its output into a promise.
pub fn producer<F, P>(f: F) -> Producer<P::Value, P::Error>
where
    F: FnOnce() -> P + Send + 'static,
    P: IntoPromise,
{
    Box::new(move || f().into_promise())
}

// Await-all over indexed promises, values stored back in input order.
struct Join<T, E> {
    pending: FuturesUnordered<BoxFuture<'static, (usize, Result<T, E>)>>,
    values: Vec<Option<T>>,
}

// Values are never pinned in place.
impl<T, E> Unpin for Join<T, E> {}

impl<T, E> Join<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn new(promises: Vec<Promise<T, E>>) -> Self {
        let values = promises.iter().map(|_| None).collect();
        let pending = promises
            .into_iter()
            .enumerate()
            .map(|(index, promise)| promise.map(move |settled| (index, settled)).boxed())
            .collect();
        Self { pending, values }
    }

    fn detach_rest(&mut self, cx: &mut Context<'_>) {
        // Poll whatever was never polled while still on the caller's executor,
        // so runtime-bound futures are created in their runtime's context.
        while let Poll::Ready(Some(_)) = self.pending.poll_next_unpin(cx) {}
        if self.pending.is_empty() {
            return;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(outstanding = self.pending.len(), "join rejected, detaching the rest");

        let rest = mem::take(&mut self.pending);
        pool::detach(rest.for_each(|_| future::ready(())));
    }
}

impl<T, E> Future for Join<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Output = Result<Vec<T>, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        loop {
            match this.pending.poll_next_unpin(cx) {
                Poll::Ready(Some((index, Ok(value)))) => this.values[index] = Some(value),
                Poll::Ready(Some((_, Err(reason)))) => {
                    this.detach_rest(cx);
                    return Poll::Ready(Err(reason));
                }
                Poll::Ready(None) => {
                    let values = mem::take(&mut this.values);
                    return Poll::Ready(Ok(values.into_iter().flatten().collect()));
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

fn join<T, E>(promises: Vec<Promise<T, E>>) -> Promise<Vec<T>, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    Promise::new(Join::new(promises))
}

/// Runs every producer concurrently and collects their values in input order.
///
/// All producers are called before this function returns. A single producer
/// still yields a one-element vector.
///
/// # Example
/// ```
/// # use asyncflow::{Promise, parallel};
/// # futures::executor::block_on(async {
/// let results = parallel((1..=3).map(|n| move || Promise::<_, String>::resolve(n * 10)));
///
/// assert_eq!(results.await, Ok(vec![10, 20, 30]));
/// # });
/// ```
pub fn parallel<I, F, P>(producers: I) -> Promise<Vec<P::Value>, P::Error>
where
    I: IntoIterator<Item = F>,
    F: FnOnce() -> P,
    P: IntoPromise,
{
    let promises: Vec<_> = producers
        .into_iter()
        .map(|produce| produce().into_promise())
        .collect();

    #[cfg(feature = "tracing")]
    tracing::debug!(producers = promises.len(), "parallel: all producers invoked");

    join(promises)
}

/// Calls `iteratee` for every element of `collection` concurrently and collects
/// the results in input order.
///
/// The iteratee receives the element and the whole collection. It runs
/// synchronously for every element before this function returns, so the
/// promise it returns must own whatever it needs.
///
/// # Example
/// ```
/// # use asyncflow::async_each;
/// # futures::executor::block_on(async {
/// let doubled = async_each(&[1, 2, 3], |item, _| Ok::<_, String>(item * 2));
/// assert_eq!(doubled.await, Ok(vec![2, 4, 6]));
/// # });
/// ```
pub fn async_each<T, F, P>(collection: &[T], mut iteratee: F) -> Promise<Vec<P::Value>, P::Error>
where
    F: FnMut(&T, &[T]) -> P,
    P: IntoPromise,
{
    let promises: Vec<_> = collection
        .iter()
        .map(|item| iteratee(item, collection).into_promise())
        .collect();

    #[cfg(feature = "tracing")]
    tracing::debug!(items = promises.len(), "async_each: iteratee invoked for every item");

    join(promises)
}

/// Runs the given producers concurrently; variadic form of [`parallel`].
///
/// Each argument may return a different promise-like type as long as they all
/// lift to the same value and error types.
///
/// ```
/// # use asyncflow::{Promise, parallel};
/// # futures::executor::block_on(async {
/// let results = parallel![
///     || Promise::<u8, String>::resolve(1),
///     || Ok::<u8, String>(2),
/// ];
/// assert_eq!(results.await, Ok(vec![1, 2]));
/// # });
/// ```
#[macro_export]
macro_rules! parallel {
    ($($producer:expr),+ $(,)?) => {
        $crate::parallel(::std::vec![$($crate::parallel::producer($producer)),+])
    };
}

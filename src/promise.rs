//! Defines the `Promise` type, the `Deferred` producer and the `IntoPromise`
//! capability every combinator in this crate is built on.
//!
//! A `Promise<T, E>` is an owned future resolving to `Result<T, E>`: `Ok` is
//! fulfilment and `Err` is rejection. Because the future is consumed when it is
//! awaited, a promise settles exactly once.
//!
//! Anything that can stand where a promise is expected implements
//! [`IntoPromise`]. Plain synchronous outcomes are expressed as `Result`, so a
//! step returning `Err` behaves like a synchronous throw: it rejects the
//! enclosing promise.
use std::{
    convert::Infallible,
    fmt,
    pin::Pin,
    task::{Context, Poll},
};

use futures::{
    FutureExt,
    channel::oneshot,
    future::{self, BoxFuture},
};

/// An eventual value of type `T` or a rejection reason of type `E`.
///
/// Promises are lazy like every Rust future: the work behind them progresses
/// only while the promise (or a combinator holding it) is polled.
#[must_use = "promises do nothing unless polled or .awaited"]
pub struct Promise<T, E> {
    future: BoxFuture<'static, Result<T, E>>,
}

impl<T, E> Promise<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Wraps a future resolving to `Result<T, E>`.
    pub fn new(future: impl Future<Output = Result<T, E>> + Send + 'static) -> Self {
        Self {
            future: future.boxed(),
        }
    }

    /// Returns a promise that is already fulfilled with `value`.
    pub fn resolve(value: T) -> Self {
        Self::new(future::ok(value))
    }

    /// Returns a promise that is already rejected with `reason`.
    pub fn reject(reason: E) -> Self {
        Self::new(future::err(reason))
    }

    /// Chains `on_fulfilled` after this promise.
    ///
    /// The callback receives the fulfilled value and may return either a plain
    /// `Result` or another promise; either way the returned promise settles with
    /// its outcome. A rejection of this promise skips the callback and is passed
    /// through unchanged.
    ///
    /// # Example
    /// ```
    /// # use asyncflow::Promise;
    /// # futures::executor::block_on(async {
    /// let promise = Promise::<u32, String>::resolve(1)
    ///     .then(|n| Ok(n + 1))
    ///     .then(|n| Promise::resolve(n * 10));
    ///
    /// assert_eq!(promise.await, Ok(20));
    /// # });
    /// ```
    pub fn then<F, P>(self, on_fulfilled: F) -> Promise<P::Value, E>
    where
        F: FnOnce(T) -> P + Send + 'static,
        P: IntoPromise<Error = E>,
    {
        Promise::new(async move {
            let value = self.await?;
            let next = on_fulfilled(value).into_promise();
            next.await
        })
    }

    /// Chains `on_rejected` after this promise.
    ///
    /// The callback receives the rejection reason and may recover with a value
    /// or reject again, possibly with a different error type. A fulfilled value
    /// is passed through unchanged.
    pub fn catch<F, P>(self, on_rejected: F) -> Promise<T, P::Error>
    where
        F: FnOnce(E) -> P + Send + 'static,
        P: IntoPromise<Value = T>,
    {
        Promise::new(async move {
            match self.await {
                Ok(value) => Ok(value),
                Err(reason) => {
                    let next = on_rejected(reason).into_promise();
                    next.await
                }
            }
        })
    }
}

impl<T, E> Future for Promise<T, E> {
    type Output = Result<T, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.future.as_mut().poll(cx)
    }
}

impl<T, E> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise").finish_non_exhaustive()
    }
}

/// Values that can be lifted into a [`Promise`].
///
/// This is the explicit "is promise-like" capability. Promises convert to
/// themselves, so lifting never wraps twice. Synchronous outcomes (`Result`,
/// `()`) become promises that are already settled.
pub trait IntoPromise {
    /// The fulfilled value.
    type Value: Send + 'static;
    /// The rejection reason.
    type Error: Send + 'static;

    /// Converts `self` into a promise.
    fn into_promise(self) -> Promise<Self::Value, Self::Error>;
}

impl<T, E> IntoPromise for Promise<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Value = T;
    type Error = E;

    fn into_promise(self) -> Promise<T, E> {
        self
    }
}

impl<T, E> IntoPromise for Result<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Value = T;
    type Error = E;

    fn into_promise(self) -> Promise<T, E> {
        match self {
            Ok(value) => Promise::resolve(value),
            Err(reason) => Promise::reject(reason),
        }
    }
}

impl<T, E> IntoPromise for BoxFuture<'static, Result<T, E>>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Value = T;
    type Error = E;

    fn into_promise(self) -> Promise<T, E> {
        Promise { future: self }
    }
}

// Synchronous actions that return nothing.
impl IntoPromise for () {
    type Value = ();
    type Error = Infallible;

    fn into_promise(self) -> Promise<(), Infallible> {
        Promise::resolve(())
    }
}

/// Lifts `value` into a promise.
///
/// A value that already is a promise is returned unchanged; anything else
/// becomes a promise settled with that value.
///
/// # Example
/// ```
/// # use asyncflow::{Promise, promisify};
/// # futures::executor::block_on(async {
/// let lifted = promisify(Ok::<_, String>(None::<u8>));
/// assert_eq!(lifted.await, Ok(None));
///
/// let same = promisify(promisify(Promise::<_, String>::resolve("one")));
/// assert_eq!(same.await, Ok("one"));
/// # });
/// ```
pub fn promisify<P: IntoPromise>(value: P) -> Promise<P::Value, P::Error> {
    value.into_promise()
}

/// The producing half of a promise, settled by calling [`resolve`] or [`reject`].
///
/// Both methods consume the `Deferred`, so the paired promise can only be
/// settled once. Dropping a `Deferred` without settling it leaves the paired
/// promise pending forever.
///
/// [`resolve`]: Deferred::resolve
/// [`reject`]: Deferred::reject
pub struct Deferred<T, E> {
    sender: oneshot::Sender<Result<T, E>>,
}

impl<T, E> Deferred<T, E> {
    /// Fulfils the paired promise with `value`.
    pub fn resolve(self, value: T) {
        // The promise may already be gone; nobody is left to observe the value.
        let _ = self.sender.send(Ok(value));
    }

    /// Rejects the paired promise with `reason`.
    pub fn reject(self, reason: E) {
        let _ = self.sender.send(Err(reason));
    }

    /// Returns `true` if the paired promise was dropped.
    pub fn is_canceled(&self) -> bool {
        self.sender.is_canceled()
    }
}

impl<T, E> fmt::Debug for Deferred<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("canceled", &self.is_canceled())
            .finish()
    }
}

/// Creates a deferred/promise pair.
///
/// # Example
/// ```
/// # use asyncflow::deferred;
/// # use std::thread;
/// # futures::executor::block_on(async {
/// let (deferred, promise) = deferred::<String, String>();
///
/// thread::spawn(move || deferred.resolve("done".into()));
/// assert_eq!(promise.await, Ok("done".to_string()));
/// # });
/// ```
pub fn deferred<T, E>() -> (Deferred<T, E>, Promise<T, E>)
where
    T: Send + 'static,
    E: Send + 'static,
{
    let (sender, receiver) = oneshot::channel();
    let promise = Promise::new(async move {
        match receiver.await {
            Ok(settled) => settled,
            Err(oneshot::Canceled) => future::pending().await,
        }
    });
    (Deferred { sender }, promise)
}

//! Sequential composition.
//!
//! [`series`] threads an accumulator through an ordered list of steps. Each step
//! is invoked only after the previous one settled, with exactly the value it
//! fulfilled with. The first rejection (including a step returning `Err`
//! synchronously) rejects the chain and no later step is invoked.
use crate::promise::{IntoPromise, Promise};

/// A boxed step, for chains mixing different closures.
pub type Step<T, E> = Box<dyn FnOnce(T) -> Promise<T, E> + Send>;

/// Boxes a closure into a [`Step`], lifting its output into a promise.
pub fn step<T, F, P>(f: F) -> Step<T, P::Error>
where
    F: FnOnce(T) -> P + Send + 'static,
    P: IntoPromise<Value = T>,
{
    Box::new(move |value| f(value).into_promise())
}

/// Runs `steps` one after another, feeding each the previous step's value.
///
/// The first step receives `initial_value`. The returned promise fulfils with
/// the last step's value, or with `initial_value` when there are no steps.
///
/// # Example
/// ```
/// # use asyncflow::{Promise, series, series::step};
/// # futures::executor::block_on(async {
/// let chain = series(
///     vec![
///         step(|n: u32| Ok::<_, String>(n + 1)),
///         step(|n| Promise::resolve(n * 10)),
///     ],
///     1,
/// );
///
/// assert_eq!(chain.await, Ok(20));
/// # });
/// ```
pub fn series<T, E, I, S, P>(steps: I, initial_value: T) -> Promise<T, E>
where
    I: IntoIterator<Item = S>,
    S: FnOnce(T) -> P + Send + 'static,
    P: IntoPromise<Value = T, Error = E>,
    T: Send + 'static,
    E: Send + 'static,
{
    let steps: Vec<S> = steps.into_iter().collect();

    Promise::new(async move {
        let mut value = initial_value;
        for (_index, step) in steps.into_iter().enumerate() {
            let next = step(value).into_promise();
            value = match next.await {
                Ok(value) => value,
                Err(reason) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(step = _index, "series: step rejected, skipping the rest");
                    return Err(reason);
                }
            };
        }
        Ok(value)
    })
}

/// Runs the given steps in order; variadic form of [`series`].
///
/// The first step receives `Default::default()`, which is the empty string when
/// the chain threads a `String`.
///
/// ```
/// # use asyncflow::series;
/// # futures::executor::block_on(async {
/// let chain = series![
///     |s: String| Ok::<_, String>(s + "a"),
///     |s: String| Ok(s + "b"),
/// ];
/// assert_eq!(chain.await, Ok("ab".to_string()));
/// # });
/// ```
#[macro_export]
macro_rules! series {
    ($($step:expr),+ $(,)?) => {
        $crate::series(
            ::std::vec![$($crate::series::step($step)),+],
            ::core::default::Default::default(),
        )
    };
}

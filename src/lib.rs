//! Promise combinators for structured asynchronous control flow.
//!
//! `asyncflow` layers a handful of control-flow helpers on top of a small
//! promise abstraction:
//!
//! - [`promisify`] lifts a plain outcome or an existing promise into a [`Promise`]
//! - [`parallel()`] runs producers concurrently and collects their values in order
//! - [`series()`] threads a value through steps, one after another
//! - [`async_each`] maps an asynchronous function over a slice concurrently
//! - [`polling()`] repeats an action on a fixed interval, never overlapping runs
//!
//! A [`Promise`] is an owned future resolving to `Result<T, E>`. Anything that
//! can stand in for one implements [`IntoPromise`]: promises themselves, plain
//! `Result`s, boxed futures and [`HttpPromise`]s (which collapse to their
//! payload). Rejections always carry the caller's own error, unmodified.
//!
//! The crate does not depend on any specific async runtime. Timers are driven by
//! a dedicated thread, see [`timing`]. Promises left outstanding by a rejected
//! join finish on a small background pool, see [`pool`].
//!
//! # Optional tracing
//!
//! Enable the `tracing` feature to get `debug`/`trace` events from the
//! combinators and the polling handles. When disabled, the instrumentation is
//! compiled out.

pub mod error;
pub mod parallel;
pub mod polling;
pub mod pool;
pub mod promise;
pub mod promise_ext;
pub mod response;
pub mod series;
pub mod timing;

pub use error::PoolError;
pub use parallel::{async_each, parallel};
pub use polling::{Polling, PollingTask, polling};
pub use promise::{Deferred, IntoPromise, Promise, deferred, promisify};
pub use promise_ext::PromiseExt;
pub use response::{HttpPromise, ReadyState, Response};
pub use series::series;

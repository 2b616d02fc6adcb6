use std::time::Duration;

use crate::{promise::Promise, timing::Delay};

/// Extend `Future` with promise conversion and time-based operations.
pub trait PromiseExt: Future {
    /// Boxes a fallible future into a [`Promise`].
    fn promise<T, E>(self) -> Promise<T, E>
    where
        Self: Future<Output = Result<T, E>> + Sized + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        Promise::new(self)
    }

    /// Defers the first poll of this future by `due`.
    fn delay(self, due: Duration) -> Delay<Self>
    where
        Self: Sized,
    {
        Delay::new(self, due)
    }
}

impl<T> PromiseExt for T where T: Future {}

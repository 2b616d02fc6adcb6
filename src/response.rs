//! HTTP-style response promises.
//!
//! A request primitive settles with several values at once: the payload, the
//! status and the raw transport details. [`HttpPromise`] carries all of them as a
//! [`Response`], while its [`IntoPromise`] implementation keeps only the payload.
//! Every combinator lifts its inputs through `IntoPromise`, so this is the one
//! place deciding that response-like promises collapse to their payload.
use std::{
    collections::BTreeMap,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
    task::{Context, Poll},
};

use crate::promise::{IntoPromise, Promise};

/// Progress of an [`HttpPromise`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadyState {
    /// Created but never polled.
    Unsent = 0,
    /// The request is being driven.
    Loading = 1,
    /// The request settled, successfully or not.
    Done = 2,
}

impl ReadyState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ReadyState::Unsent,
            1 => ReadyState::Loading,
            _ => ReadyState::Done,
        }
    }
}

/// Everything an HTTP-style request resolves with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response<P> {
    /// The decoded body.
    pub payload: P,
    /// Numeric status code, e.g. `200`.
    pub status: u16,
    /// Status text, e.g. `"OK"`.
    pub status_text: String,
    /// Raw response headers.
    pub headers: BTreeMap<String, String>,
}

impl<P> Response<P> {
    /// A `200 OK` response with no headers.
    pub fn ok(payload: P) -> Self {
        Self {
            payload,
            status: 200,
            status_text: "OK".to_string(),
            headers: BTreeMap::new(),
        }
    }

    /// Drops everything but the payload.
    pub fn into_payload(self) -> P {
        self.payload
    }
}

/// A promise for a [`Response`] that tracks its [`ReadyState`].
///
/// Awaiting it directly yields the full `Response`. Passing it anywhere a
/// promise-like value is expected (`promisify`, `parallel`, `series`,
/// `async_each`) yields only the payload.
#[must_use = "promises do nothing unless polled or .awaited"]
#[derive(Debug)]
pub struct HttpPromise<P, E> {
    response: Promise<Response<P>, E>,
    ready_state: Arc<AtomicU8>,
}

impl<P, E> HttpPromise<P, E>
where
    P: Send + 'static,
    E: Send + 'static,
{
    /// Wraps a request future.
    pub fn new(request: impl Future<Output = Result<Response<P>, E>> + Send + 'static) -> Self {
        let ready_state = Arc::new(AtomicU8::new(ReadyState::Unsent as u8));
        let state = Arc::clone(&ready_state);
        let response = Promise::new(async move {
            state.store(ReadyState::Loading as u8, Ordering::Release);
            let settled = request.await;
            state.store(ReadyState::Done as u8, Ordering::Release);
            settled
        });
        Self {
            response,
            ready_state,
        }
    }

    /// Current progress of the request.
    pub fn ready_state(&self) -> ReadyState {
        ReadyState::from_u8(self.ready_state.load(Ordering::Acquire))
    }

    /// Returns the promise for the full response, bypassing payload unwrapping.
    pub fn into_response(self) -> Promise<Response<P>, E> {
        self.response
    }
}

impl<P, E> Future for HttpPromise<P, E> {
    type Output = Result<Response<P>, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.response).poll(cx)
    }
}

impl<P, E> IntoPromise for HttpPromise<P, E>
where
    P: Send + 'static,
    E: Send + 'static,
{
    type Value = P;
    type Error = E;

    fn into_promise(self) -> Promise<P, E> {
        self.response
            .then(|response| Ok(response.into_payload()))
    }
}

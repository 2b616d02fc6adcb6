//! Self-rescheduling periodic actions.
//!
//! A [`Polling`] handle invokes an action every `wait`, but never sooner than the
//! previous invocation's promise settled: the next delay is armed only after the
//! action finished, and only if the handle was not stopped meanwhile.
//!
//! Handles are executor agnostic. [`Polling::start`] returns a [`PollingTask`]
//! that has to be spawned (or awaited) on whatever executor the caller uses.
use std::{
    fmt,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
    task::{Context, Poll},
    time::Duration,
};

use futures::{
    FutureExt,
    future::{self, BoxFuture, Either},
    lock::Mutex,
    task::AtomicWaker,
};

use crate::{promise::IntoPromise, timing::sleep};

// State shared between a handle and the tasks it started.
struct Shared<A, G> {
    // Held for a whole invocation, so invocations never overlap.
    action: Mutex<(G, A)>,
    wait: Duration,
    armed: AtomicBool,
    // Bumped by every `start`; tasks of older generations retire.
    generation: AtomicU64,
    times: AtomicUsize,
    stop_waker: AtomicWaker,
}

impl<A, G> Shared<A, G> {
    fn is_current(&self, generation: u64) -> bool {
        self.armed.load(Ordering::Acquire) && self.generation.load(Ordering::Acquire) == generation
    }
}

/// Controls a periodic action created by [`polling`].
///
/// Lifecycle: created → armed (timer pending) → invoking (action running) →
/// armed again, or stopped. [`stop`](Polling::stop) is reachable from both
/// armed and invoking; [`start`](Polling::start) after a stop re-arms the
/// handle and keeps counting from where it was.
///
/// Dropping the handle stops it.
pub struct Polling<A, G> {
    shared: Arc<Shared<A, G>>,
}

/// Creates a polling handle that calls `action(&args)` every `wait`.
///
/// The action may be synchronous (returning `()` or a `Result`) or return a
/// promise. Nothing runs until [`Polling::start`] is called and the returned
/// task is driven. A rejected action promise is treated like a fulfilled one:
/// the handle re-arms if it is still armed.
///
/// # Example
/// ```
/// # use asyncflow::polling;
/// # use std::{sync::{Arc, atomic::{AtomicU32, Ordering}}, time::Duration};
/// # futures::executor::block_on(async {
/// let count = Arc::new(AtomicU32::new(1));
/// let counter = Arc::clone(&count);
///
/// let handle = polling(
///     move |step: &u32| {
///         counter.fetch_add(*step, Ordering::Relaxed);
///     },
///     Duration::from_millis(20),
///     2,
/// );
///
/// let task = handle.start();
/// let stopper = async {
///     asyncflow::timing::sleep(Duration::from_millis(30)).await;
///     handle.stop();
/// };
/// futures::join!(task, stopper);
///
/// assert_eq!(handle.times(), 1);
/// assert_eq!(count.load(Ordering::Relaxed), 3);
/// # });
/// ```
pub fn polling<A, G, P>(action: G, wait: Duration, args: A) -> Polling<A, G>
where
    G: FnMut(&A) -> P + Send + 'static,
    P: IntoPromise + 'static,
    A: Send + 'static,
{
    Polling {
        shared: Arc::new(Shared {
            action: Mutex::new((action, args)),
            wait,
            armed: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            times: AtomicUsize::new(0),
            stop_waker: AtomicWaker::new(),
        }),
    }
}

impl<A, G, P> Polling<A, G>
where
    G: FnMut(&A) -> P + Send + 'static,
    P: IntoPromise + 'static,
    A: Send + 'static,
{
    /// Arms the handle and returns the task driving it.
    ///
    /// The first invocation happens `wait` after the task is first polled.
    /// Starting an already started handle retires the previous task before it
    /// invokes the action again.
    pub fn start(&self) -> PollingTask {
        let generation = self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.shared.armed.store(true, Ordering::Release);
        // Let a sleeping task of an older generation notice it was replaced.
        self.shared.stop_waker.wake();

        #[cfg(feature = "tracing")]
        tracing::debug!(generation, wait = ?self.shared.wait, "polling started");

        PollingTask {
            future: run(Arc::clone(&self.shared), generation).boxed(),
        }
    }
}

impl<A, G> Polling<A, G> {
    /// Disarms the handle and releases the pending timer.
    ///
    /// An invocation that is already running is not interrupted; it completes
    /// and the task then exits instead of re-arming.
    pub fn stop(&self) {
        self.shared.armed.store(false, Ordering::Release);
        self.shared.stop_waker.wake();

        #[cfg(feature = "tracing")]
        tracing::debug!(times = self.times(), "polling stopped");
    }

    /// Number of times the action has been invoked so far.
    pub fn times(&self) -> usize {
        self.shared.times.load(Ordering::Acquire)
    }

    /// Returns `true` if the handle will schedule another invocation.
    pub fn is_armed(&self) -> bool {
        self.shared.armed.load(Ordering::Acquire)
    }

    /// The delay between invocations.
    pub fn wait(&self) -> Duration {
        self.shared.wait
    }
}

impl<A, G> Drop for Polling<A, G> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<A, G> fmt::Debug for Polling<A, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Polling")
            .field("wait", &self.shared.wait)
            .field("armed", &self.is_armed())
            .field("times", &self.times())
            .finish()
    }
}

/// The future driving a started [`Polling`] handle.
///
/// Completes once the handle is stopped, dropped or started again.
#[must_use = "polling does nothing unless the task is spawned or .awaited"]
pub struct PollingTask {
    future: BoxFuture<'static, ()>,
}

impl Future for PollingTask {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.future.as_mut().poll(cx)
    }
}

impl fmt::Debug for PollingTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollingTask").finish_non_exhaustive()
    }
}

// Resolves once the task's generation is no longer the armed one.
struct Retired<A, G> {
    shared: Arc<Shared<A, G>>,
    generation: u64,
}

impl<A, G> Future for Retired<A, G> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if !self.shared.is_current(self.generation) {
            return Poll::Ready(());
        }
        self.shared.stop_waker.register(cx.waker());
        // Check again: `stop` may have run before the waker was registered.
        if !self.shared.is_current(self.generation) {
            return Poll::Ready(());
        }
        Poll::Pending
    }
}

async fn run<A, G, P>(shared: Arc<Shared<A, G>>, generation: u64)
where
    G: FnMut(&A) -> P + Send + 'static,
    P: IntoPromise + 'static,
    A: Send + 'static,
{
    loop {
        // Armed: wait for the timer unless the handle is stopped first.
        let retired = Retired {
            shared: Arc::clone(&shared),
            generation,
        };
        if let Either::Right(_) = future::select(sleep(shared.wait), retired).await {
            return;
        }

        // Invoking.
        let mut guard = shared.action.lock().await;
        if !shared.is_current(generation) {
            return;
        }
        let _times = shared.times.fetch_add(1, Ordering::AcqRel) + 1;

        #[cfg(feature = "tracing")]
        tracing::trace!(times = _times, "polling: invoking action");

        let (action, args) = &mut *guard;
        let promise = action(&*args).into_promise();
        let _settled = promise.await;
        drop(guard);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            times = _times,
            rejected = _settled.is_err(),
            "polling: action settled"
        );

        if !shared.is_current(generation) {
            return;
        }
    }
}

//! Timing utilities for asynchronous workflows.
//!
//! Provides an executor agnostic timer ([`Sleep`]) and a wrapper that defers
//! the start of a future ([`Delay`]). Pending timers live in one registry that a
//! dedicated thread drives, so they work the same under `tokio`, `smol` or a
//! plain `block_on`.

use std::{
    collections::BTreeMap,
    pin::Pin,
    sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock, PoisonError},
    task::{Context, Poll},
    time::{Duration, Instant},
};

use futures::task::AtomicWaker;
use pin_project_lite::pin_project;

// Pending timers ordered by deadline. The id keeps equal deadlines apart.
struct Timers {
    entries: BTreeMap<(Instant, u64), Arc<AtomicWaker>>,
    next_id: u64,
}

struct TimerQueue {
    timers: Mutex<Timers>,
    // Signalled when a new earliest deadline is registered.
    changed: Condvar,
}

static QUEUE: TimerQueue = TimerQueue {
    timers: Mutex::new(Timers {
        entries: BTreeMap::new(),
        next_id: 0,
    }),
    changed: Condvar::new(),
};

static DRIVER: OnceLock<bool> = OnceLock::new();

// Spawns the timer thread on first use. `false` if it could not be created.
fn driver_running() -> bool {
    *DRIVER.get_or_init(|| {
        match std::thread::Builder::new()
            .name("asyncflow-timer".into())
            .spawn(|| QUEUE.run())
        {
            Ok(_) => true,
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %_err, "timer thread unavailable, timers will busy-poll");
                false
            }
        }
    })
}

impl TimerQueue {
    fn lock(&self) -> MutexGuard<'_, Timers> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, due: Instant, waker: Arc<AtomicWaker>) -> u64 {
        let mut timers = self.lock();
        let id = timers.next_id;
        timers.next_id += 1;
        let earliest = timers.entries.keys().next().is_none_or(|&(next, _)| due < next);
        timers.entries.insert((due, id), waker);
        drop(timers);

        if earliest {
            self.changed.notify_one();
        }
        id
    }

    fn remove(&self, due: Instant, id: u64) {
        self.lock().entries.remove(&(due, id));
    }

    fn run(&self) {
        let mut timers = self.lock();
        loop {
            let now = Instant::now();
            let mut fired = Vec::new();
            while let Some(entry) = timers.entries.first_entry() {
                if entry.key().0 > now {
                    break;
                }
                fired.push(entry.remove());
            }

            if !fired.is_empty() {
                // Wake outside the lock; a woken task may register right away.
                drop(timers);
                fired.iter().for_each(|waker| waker.wake());
                timers = self.lock();
                continue;
            }

            let next = timers.entries.keys().next().map(|&(next, _)| next);
            timers = match next {
                Some(next) => {
                    let timeout = next.saturating_duration_since(now);
                    match self.changed.wait_timeout(timers, timeout) {
                        Ok((guard, _)) => guard,
                        Err(poisoned) => poisoned.into_inner().0,
                    }
                }
                None => self
                    .changed
                    .wait(timers)
                    .unwrap_or_else(PoisonError::into_inner),
            };
        }
    }
}

/// A future that completes once its deadline has passed.
///
/// Created with [`sleep`]. The deadline is fixed at creation time and the timer
/// is registered on the first poll. Dropping a `Sleep` removes it from the
/// registry right away.
#[must_use = "futures do nothing unless polled or .awaited"]
#[derive(Debug)]
pub struct Sleep {
    due: Instant,
    waker: Arc<AtomicWaker>,
    id: Option<u64>,
}

/// Returns a future that completes after `duration` has elapsed.
pub fn sleep(duration: Duration) -> Sleep {
    Sleep::until(Instant::now() + duration)
}

impl Sleep {
    /// Creates a timer that completes at `due`.
    pub fn until(due: Instant) -> Self {
        Self {
            due,
            waker: Arc::new(AtomicWaker::new()),
            id: None,
        }
    }

    /// Returns `true` once the deadline has passed.
    pub fn is_elapsed(&self) -> bool {
        Instant::now() >= self.due
    }
}

impl Future for Sleep {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.is_elapsed() {
            return Poll::Ready(());
        }
        self.waker.register(cx.waker());

        if self.id.is_none() {
            if !driver_running() {
                // No thread to wait on; keep re-polling until the deadline.
                cx.waker().wake_by_ref();
                return Poll::Pending;
            }

            #[cfg(feature = "tracing")]
            tracing::trace!(remaining = ?self.due.saturating_duration_since(Instant::now()), "registering timer");

            let id = QUEUE.insert(self.due, Arc::clone(&self.waker));
            self.id = Some(id);
        }

        // The deadline may have passed while registering.
        if self.is_elapsed() {
            return Poll::Ready(());
        }
        Poll::Pending
    }
}

impl Drop for Sleep {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            QUEUE.remove(self.due, id);
        }
    }
}

pin_project! {
    /// A future that begins polling its inner future only after a specified delay.
    ///
    /// The delay is counted from the first poll of the `Delay` itself, not from its
    /// creation. Once the delay has passed, every poll goes straight to the inner
    /// future.
    ///
    /// A more convenient way to construct this is via the
    /// [`delay()`](crate::promise_ext::PromiseExt::delay) operator.
    #[must_use = "futures do nothing unless polled or .awaited"]
    pub struct Delay<F> {
        #[pin]
        future: F,
        delay: Duration,
        sleep: Option<Sleep>,
        elapsed: bool,
    }
}

impl<F> Delay<F> {
    /// Creates a new `Delay` that defers the execution of the given future.
    pub fn new(future: F, delay: Duration) -> Self {
        Self {
            future,
            delay,
            sleep: None,
            elapsed: false,
        }
    }
}

impl<F> Future for Delay<F>
where
    F: Future,
{
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        if !*this.elapsed {
            let delay = *this.delay;
            let timer = this.sleep.get_or_insert_with(|| sleep(delay));
            if Pin::new(timer).poll(cx).is_pending() {
                return Poll::Pending;
            }
            *this.elapsed = true;
            this.sleep.take();
        }
        this.future.poll(cx)
    }
}

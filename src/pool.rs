//! Background pool for promises that outlive their join.
//!
//! When [`parallel`](crate::parallel()) or [`async_each`](crate::async_each)
//! rejects, the promises that have not settled yet are handed to this pool and
//! run to completion there. Their outcomes are ignored.

use std::sync::OnceLock;

use futures::executor::{ThreadPool, ThreadPoolBuilder};

use crate::error::PoolError;

/// Number of pool threads used when [`init_pool`] was never called.
pub const DEFAULT_POOL_SIZE: usize = 4;

static POOL: OnceLock<ThreadPool> = OnceLock::new();

fn build_pool(size: usize) -> Result<ThreadPool, PoolError> {
    let pool = ThreadPoolBuilder::new()
        .pool_size(size.max(1))
        .name_prefix("asyncflow-detached-")
        .create()?;
    Ok(pool)
}

/// Builds the background pool with `size` threads.
///
/// Must be called before the first join rejects, otherwise the pool is built
/// with [`DEFAULT_POOL_SIZE`] threads.
///
/// # Errors
///
/// - `PoolError::AlreadyInitialized`: the pool already exists.
/// - `PoolError::Spawn`: the pool threads could not be created.
pub fn init_pool(size: usize) -> Result<(), PoolError> {
    if POOL.get().is_some() {
        return Err(PoolError::AlreadyInitialized);
    }
    let pool = build_pool(size)?;
    POOL.set(pool).map_err(|_| PoolError::AlreadyInitialized)
}

fn pool() -> Result<&'static ThreadPool, PoolError> {
    if let Some(pool) = POOL.get() {
        return Ok(pool);
    }
    // A racing initializer may win; the pool built here is then dropped.
    let pool = build_pool(DEFAULT_POOL_SIZE)?;
    Ok(POOL.get_or_init(|| pool))
}

/// Drives `future` to completion in the background, discarding its output.
pub(crate) fn detach<F>(future: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    match pool() {
        Ok(pool) => pool.spawn_ok(future),
        Err(_err) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %_err, "background pool unavailable, driving on a dedicated thread");
            let spawned = std::thread::Builder::new()
                .name("asyncflow-detached".into())
                .spawn(move || futures::executor::block_on(future));
            if let Err(_err) = spawned {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %_err, "outstanding promises dropped");
            }
        }
    }
}

//! Errors raised by the crate itself.
//!
//! Rejections of user promises are never wrapped: they carry the caller's own
//! error type unchanged. The types here only cover the crate's own machinery.

use thiserror::Error;

/// Errors produced while setting up the crate's background threads.
#[derive(Error, Debug)]
pub enum PoolError {
    /// The background pool was already built, either by an earlier call to
    /// [`init_pool`](crate::pool::init_pool) or by a join that needed it first.
    #[error("background pool is already initialized")]
    AlreadyInitialized,

    /// The operating system refused to create the threads.
    #[error("failed to spawn background threads: {0}")]
    Spawn(#[from] std::io::Error),
}

//! Weighted concurrency gates, §4.6.
//!
//! Two independent weight-1 semaphores, not a mutex, so that waiters honor cancellation via
//! [`tokio::select!`] rather than blocking uninterruptibly.

use std::time::Duration;

use tokio::sync::{Semaphore, SemaphorePermit};

use crate::{Error, Result};

/// Serializes calls to the upstream code-forge API and gates archive materialization.
#[derive(Debug)]
pub struct Gates {
	/// Held around any call to the GitHub API.
	upstream: Semaphore,

	/// Held across HEAD → BUILD → PUT → cache-store for one batch.
	archive: Semaphore,
}

/// How long a caller waits for a permit before giving up with [`Error::throttled`].
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

impl Gates {
	pub fn new() -> Self {
		Self { upstream: Semaphore::new(1), archive: Semaphore::new(1) }
	}

	/// Acquires the upstream semaphore, or fails with [`Error::throttled`] after
	/// [`ACQUIRE_TIMEOUT`].
	pub async fn acquire_upstream(&self) -> Result<SemaphorePermit<'_>> {
		acquire(&self.upstream).await
	}

	/// Acquires the archive semaphore, or fails with [`Error::throttled`] after
	/// [`ACQUIRE_TIMEOUT`].
	pub async fn acquire_archive(&self) -> Result<SemaphorePermit<'_>> {
		acquire(&self.archive).await
	}
}

impl Default for Gates {
	fn default() -> Self {
		Self::new()
	}
}

async fn acquire(semaphore: &Semaphore) -> Result<SemaphorePermit<'_>> {
	tokio::time::timeout(ACQUIRE_TIMEOUT, semaphore.acquire())
		.await
		.map_err(|_elapsed| Error::throttled())?
		.map_err(|_closed| Error::throttled())
}

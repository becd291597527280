// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Dispatchers that retry work a delegate rejected.
//!
//! Only [`Error::Rejected`](crate::Error::Rejected) is retried. Failures of
//! the work itself reach the caller unchanged.

mod blocking;
mod rejection;

use std::{
	fmt::{self, Debug, Formatter},
	sync::Arc,
};

pub use blocking::BlockingRetryDispatcher;
pub use rejection::RejectionRetryDispatcher;

/// Callback fired on retry events.
pub type Hook = Arc<dyn Fn() + Send + Sync>;

/// Callbacks of a [`RejectionRetryDispatcher`].
#[derive(Clone, Default)]
pub struct RetryHooks {
	on_rejected: Option<Hook>,
	on_retry_successful: Option<Hook>,
}

impl RetryHooks {
	pub fn new() -> Self {
		Self::default()
	}

	/// Fired each time the delegate rejects an attempt.
	pub fn on_rejected<F>(mut self, f: F) -> Self
	where
		F: Fn() + Send + Sync + 'static,
	{
		self.on_rejected = Some(Arc::new(f));
		self
	}

	/// Fired once a retried job ran on the delegate, before its future
	/// completes.
	pub fn on_retry_successful<F>(mut self, f: F) -> Self
	where
		F: Fn() + Send + Sync + 'static,
	{
		self.on_retry_successful = Some(Arc::new(f));
		self
	}

	pub(crate) fn rejected(&self) {
		if let Some(hook) = &self.on_rejected {
			hook();
		}
	}

	pub(crate) fn retry_successful(&self) {
		if let Some(hook) = &self.on_retry_successful {
			hook();
		}
	}
}

impl Debug for RetryHooks {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("RetryHooks")
			.field("on_rejected", &self.on_rejected.is_some())
			.field("on_retry_successful", &self.on_retry_successful.is_some())
			.finish()
	}
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Builder for layering dispatch decorators over a scheduler

use std::sync::Arc;

use reifydb_context::TransactionCoordinator;

use crate::{
	conditional::ConditionalDispatcher,
	config::RetryConfig,
	retry::{BlockingRetryDispatcher, RejectionRetryDispatcher, RetryHooks},
	scheduler::Scheduler,
};

/// Composes decorators over a delegate scheduler.
///
/// Each call wraps everything built so far, so the first layer added sits
/// closest to the delegate.
///
/// ```ignore
/// let scheduler = DispatchBuilder::new(pool)
///     .blocking_retry(&RetryConfig::default(), || {})
///     .inline_in_transaction(coordinator)
///     .build();
/// ```
pub struct DispatchBuilder {
	scheduler: Arc<dyn Scheduler>,
}

impl DispatchBuilder {
	pub fn new(delegate: Arc<dyn Scheduler>) -> Self {
		Self {
			scheduler: delegate,
		}
	}

	/// Retry rejections by blocking the caller
	pub fn blocking_retry<F>(self, config: &RetryConfig, on_retry: F) -> Self
	where
		F: Fn() + Send + Sync + 'static,
	{
		self.wrap(|inner| BlockingRetryDispatcher::new(inner, config).on_retry(on_retry))
	}

	/// Retry rejections asynchronously through `retry_scheduler`
	pub fn rejection_retry(self, retry_scheduler: Arc<dyn Scheduler>, config: &RetryConfig, hooks: RetryHooks) -> Self {
		self.wrap(|inner| RejectionRetryDispatcher::new(inner, retry_scheduler, config, hooks))
	}

	/// Run work inline whenever `predicate` holds
	pub fn conditional<P>(self, predicate: P) -> Self
	where
		P: Fn(&dyn Scheduler) -> bool + Send + Sync + 'static,
	{
		self.wrap(|inner| ConditionalDispatcher::new(inner, predicate))
	}

	/// Run work inline while `coordinator` reports an active transaction
	pub fn inline_in_transaction(self, coordinator: Arc<dyn TransactionCoordinator>) -> Self {
		self.wrap(|inner| ConditionalDispatcher::when_transaction_active(inner, coordinator))
	}

	pub fn build(self) -> Arc<dyn Scheduler> {
		self.scheduler
	}

	fn wrap<S, F>(self, layer: F) -> Self
	where
		S: Scheduler + 'static,
		F: FnOnce(Arc<dyn Scheduler>) -> S,
	{
		Self {
			scheduler: Arc::new(layer(self.scheduler)),
		}
	}
}

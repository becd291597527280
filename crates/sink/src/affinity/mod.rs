// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

mod exit;
mod registry;

use std::{
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
	thread::{self, ThreadId},
	time::Duration,
};

use reifydb_context::{Context, TransactionCoordinator};
use reifydb_scheduler::{Scheduler, TaskError, TaskFuture};
use tracing::{debug, trace, warn};

pub use self::registry::ThreadRegistry;
use crate::{
	config::SweepConfig,
	error::Result,
	sink::Sink,
	supplier::{SinkFactory, SinkSupplier},
};

/// Pins each thread to its own sink while a transaction is active.
///
/// Outside a transaction every call goes to the delegate supplier. Inside
/// one, the calling thread always gets the same sink, created on first use,
/// so everything a transaction emits stays in order on one sink.
///
/// A thread's sink is completed and dropped when the thread exits, when
/// [`evict`](Self::evict) or [`evict_idle`](Self::evict_idle) removes it, or
/// on [`dispose`](SinkSupplier::dispose).
pub struct ThreadAffineSinkSupplier<T> {
	delegate: Arc<dyn SinkSupplier<T>>,
	coordinator: Arc<dyn TransactionCoordinator>,
	registry: Arc<ThreadRegistry<T>>,
	disposed: AtomicBool,
}

impl<T: 'static> ThreadAffineSinkSupplier<T> {
	pub fn new(
		delegate: Arc<dyn SinkSupplier<T>>,
		factory: SinkFactory<T>,
		coordinator: Arc<dyn TransactionCoordinator>,
	) -> Self {
		Self {
			delegate,
			coordinator,
			registry: Arc::new(ThreadRegistry::new(factory)),
			disposed: AtomicBool::new(false),
		}
	}

	pub fn registry(&self) -> &ThreadRegistry<T> {
		&self.registry
	}

	/// Completes and drops the sink of `thread`.
	pub fn evict(&self, thread: ThreadId) -> bool {
		self.registry.evict(thread)
	}

	/// Completes and drops every sink unused for at least `ttl`.
	pub fn evict_idle(&self, ttl: Duration) -> usize {
		self.registry.evict_idle(ttl)
	}

	/// Runs [`evict_idle`](Self::evict_idle) periodically on `scheduler`.
	///
	/// The sweep holds only a weak reference to the registry and ends once
	/// the supplier is gone. Cancel the returned future to stop it earlier.
	pub fn schedule_sweep(&self, scheduler: &dyn Scheduler, config: &SweepConfig) -> Result<TaskFuture> {
		let registry = Arc::downgrade(&self.registry);
		let ttl = config.idle_ttl;

		let sweep = Arc::new(move || match registry.upgrade() {
			Some(registry) => {
				registry.evict_idle(ttl);
				Ok(())
			}
			None => Err(TaskError::failed("thread registry dropped")),
		});

		Ok(scheduler.schedule_with_fixed_delay(sweep, config.interval, config.interval)?)
	}

	/// The sink pinned to the calling thread, or `None` when it could not be
	/// kept pinned and the caller should use the delegate.
	fn thread_sink(&self) -> Option<Arc<dyn Sink<T>>> {
		let thread = thread::current().id();
		let (sink, created) = self.registry.get_or_create(thread);

		if created {
			trace!(?thread, "created thread sink");
			let registry = Arc::downgrade(&self.registry);
			let hooked = exit::on_thread_exit(self.registry.id(), move || {
				if let Some(registry) = registry.upgrade() {
					registry.evict(thread);
				}
			});

			if !hooked {
				warn!(?thread, "thread is exiting, not pinning a sink to it");
				self.registry.evict(thread);
				return None;
			}

			// raced with dispose, which may have drained before the insert
			if self.disposed.load(Ordering::Acquire) {
				self.registry.evict(thread);
				return None;
			}
		}

		Some(sink)
	}
}

impl<T: 'static> SinkSupplier<T> for ThreadAffineSinkSupplier<T> {
	fn get(&self) -> Arc<dyn Sink<T>> {
		if !self.disposed.load(Ordering::Acquire) && self.coordinator.is_transaction_active() {
			if let Some(sink) = self.thread_sink() {
				return sink;
			}
		}
		self.delegate.get()
	}

	fn get_with(&self, ctx: &Context) -> Arc<dyn Sink<T>> {
		if !self.disposed.load(Ordering::Acquire) && self.coordinator.is_tx_active_by_context(ctx) {
			if let Some(sink) = self.thread_sink() {
				return sink;
			}
		}
		self.delegate.get_with(ctx)
	}

	fn dispose(&self) {
		if self.disposed.swap(true, Ordering::AcqRel) {
			return;
		}

		self.delegate.dispose();
		let evicted = self.registry.evict_all();
		debug!(evicted, "thread-affine supplier disposed");
	}
}

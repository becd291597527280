// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	fmt::{self, Debug, Formatter},
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
	time::{Duration, Instant},
};

use reifydb_context::TransactionCoordinator;
use tracing::{debug, trace};

use crate::{
	error::{Error, Result},
	future::TaskFuture,
	immediate::ImmediateScheduler,
	interrupt,
	scheduler::Scheduler,
	task::{Job, Output, RecurringJob},
};

/// Decides per call whether work runs inline. Receives the delegate.
pub type DispatchPredicate = Arc<dyn Fn(&dyn Scheduler) -> bool + Send + Sync>;

/// Routes each call either to the calling thread or to a delegate.
///
/// The predicate is evaluated on every call. When it holds, work runs
/// inline; otherwise the call goes to the delegate unchanged. Periodic work
/// cannot run inline and is rejected while the predicate holds.
///
/// Shutdown stops both paths. The dispatcher counts as shut down (or
/// terminated) only once its inline path is closed and the delegate is shut
/// down (or terminated) too.
pub struct ConditionalDispatcher {
	name: String,
	delegate: Arc<dyn Scheduler>,
	predicate: DispatchPredicate,
	inline: &'static ImmediateScheduler,
	inline_shutdown: AtomicBool,
}

impl ConditionalDispatcher {
	pub fn new<P>(delegate: Arc<dyn Scheduler>, predicate: P) -> Self
	where
		P: Fn(&dyn Scheduler) -> bool + Send + Sync + 'static,
	{
		Self {
			name: format!("conditional({})", delegate.name()),
			delegate,
			predicate: Arc::new(predicate),
			inline: ImmediateScheduler::instance(),
			inline_shutdown: AtomicBool::new(false),
		}
	}

	/// Runs work inline whenever `coordinator` reports an active transaction.
	pub fn when_transaction_active(delegate: Arc<dyn Scheduler>, coordinator: Arc<dyn TransactionCoordinator>) -> Self {
		Self::new(delegate, move |_| coordinator.is_transaction_active())
	}

	pub fn delegate(&self) -> &Arc<dyn Scheduler> {
		&self.delegate
	}

	fn inline_requested(&self) -> bool {
		(self.predicate)(self.delegate.as_ref())
	}

	/// Picks the scheduler for a single-shot call.
	fn target(&self) -> Result<&dyn Scheduler> {
		if !self.inline_requested() {
			return Ok(self.delegate.as_ref());
		}

		if self.inline_shutdown.load(Ordering::Acquire) {
			return Err(Error::rejected(&self.name, "inline dispatch is shut down"));
		}

		trace!(scheduler = %self.name, "dispatching inline");
		Ok(self.inline)
	}

	fn recurring_target(&self) -> Result<&dyn Scheduler> {
		if self.inline_requested() {
			return Err(Error::rejected(&self.name, "cannot schedule recurring work while inline dispatch is active"));
		}
		Ok(self.delegate.as_ref())
	}
}

impl Scheduler for ConditionalDispatcher {
	fn name(&self) -> &str {
		&self.name
	}

	fn submit(&self, job: Job) -> Result<TaskFuture> {
		self.target()?.submit(job)
	}

	fn execute(&self, job: Job) -> Result<()> {
		self.target()?.execute(job)
	}

	fn schedule(&self, job: Job, delay: Duration) -> Result<TaskFuture> {
		self.target()?.schedule(job, delay)
	}

	fn schedule_at_fixed_rate(&self, job: RecurringJob, initial_delay: Duration, period: Duration)
	-> Result<TaskFuture> {
		self.recurring_target()?.schedule_at_fixed_rate(job, initial_delay, period)
	}

	fn schedule_with_fixed_delay(&self, job: RecurringJob, initial_delay: Duration, delay: Duration)
	-> Result<TaskFuture> {
		self.recurring_target()?.schedule_with_fixed_delay(job, initial_delay, delay)
	}

	fn invoke_all(&self, jobs: Vec<Job>) -> Result<Vec<TaskFuture>> {
		self.target()?.invoke_all(jobs)
	}

	fn invoke_any(&self, jobs: Vec<Job>) -> Result<Output> {
		self.target()?.invoke_any(jobs)
	}

	fn shutdown(&self) {
		debug!(scheduler = %self.name, "shutting down");
		self.inline_shutdown.store(true, Ordering::Release);
		self.delegate.shutdown();
	}

	fn shutdown_now(&self) -> Vec<Job> {
		debug!(scheduler = %self.name, "shutting down now");
		self.inline_shutdown.store(true, Ordering::Release);
		self.delegate.shutdown_now()
	}

	fn is_shutdown(&self) -> bool {
		self.inline_shutdown.load(Ordering::Acquire) && self.delegate.is_shutdown()
	}

	fn is_terminated(&self) -> bool {
		self.inline_shutdown.load(Ordering::Acquire) && self.delegate.is_terminated()
	}

	/// Waits for this dispatcher to be shut down, then for the delegate to
	/// terminate, both within `timeout`.
	fn await_termination(&self, timeout: Duration) -> Result<bool> {
		let deadline = Instant::now().checked_add(timeout);
		let remaining = || deadline.map_or(timeout, |deadline| deadline.saturating_duration_since(Instant::now()));

		while !self.inline_shutdown.load(Ordering::Acquire) {
			let left = remaining();
			if left.is_zero() {
				return Ok(false);
			}
			interrupt::sleep(left.min(interrupt::POLL_INTERVAL))?;
		}
		self.delegate.await_termination(remaining())
	}
}

impl Debug for ConditionalDispatcher {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("ConditionalDispatcher")
			.field("name", &self.name)
			.field("inline_shutdown", &self.inline_shutdown.load(Ordering::Relaxed))
			.finish()
	}
}

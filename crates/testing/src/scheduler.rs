// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	sync::{
		Arc,
		atomic::{AtomicBool, AtomicUsize, Ordering},
	},
	thread::{self, ThreadId},
	time::Duration,
};

use parking_lot::Mutex;
use reifydb_scheduler::{Error, ImmediateScheduler, Job, RecurringJob, Result, Scheduler, TaskFuture};
use tracing::trace;

/// Scheduler that rejects on demand.
///
/// Accepted work is forwarded to an inner scheduler, inline by default.
/// Every offer, rejection and acceptance is counted, and the threads that
/// ran accepted single-shot work are recorded.
pub struct ScriptedScheduler {
	name: String,
	inner: Arc<dyn Scheduler>,
	reject_remaining: AtomicUsize,
	rejecting: AtomicBool,
	shutdown: AtomicBool,
	offers: AtomicUsize,
	rejections: AtomicUsize,
	accepted: AtomicUsize,
	threads: Arc<Mutex<Vec<ThreadId>>>,
}

impl ScriptedScheduler {
	pub fn accepting() -> Self {
		Self::over(Arc::new(ImmediateScheduler))
	}

	/// Rejects the first `count` offers, then accepts.
	pub fn reject_first(count: usize) -> Self {
		let scheduler = Self::accepting();
		scheduler.reject_remaining.store(count, Ordering::SeqCst);
		scheduler
	}

	/// Rejects every offer until [`accept`](Self::accept) is called.
	pub fn rejecting() -> Self {
		let scheduler = Self::accepting();
		scheduler.rejecting.store(true, Ordering::SeqCst);
		scheduler
	}

	/// Forwards accepted work to `inner`.
	pub fn over(inner: Arc<dyn Scheduler>) -> Self {
		Self {
			name: "scripted".to_string(),
			inner,
			reject_remaining: AtomicUsize::new(0),
			rejecting: AtomicBool::new(false),
			shutdown: AtomicBool::new(false),
			offers: AtomicUsize::new(0),
			rejections: AtomicUsize::new(0),
			accepted: AtomicUsize::new(0),
			threads: Arc::new(Mutex::new(Vec::new())),
		}
	}

	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = name.into();
		self
	}

	pub fn accept(&self) {
		self.rejecting.store(false, Ordering::SeqCst);
		self.reject_remaining.store(0, Ordering::SeqCst);
	}

	pub fn reject(&self) {
		self.rejecting.store(true, Ordering::SeqCst);
	}

	pub fn offers(&self) -> usize {
		self.offers.load(Ordering::SeqCst)
	}

	pub fn rejections(&self) -> usize {
		self.rejections.load(Ordering::SeqCst)
	}

	pub fn accepted(&self) -> usize {
		self.accepted.load(Ordering::SeqCst)
	}

	/// Threads that ran accepted single-shot work, in order.
	pub fn execution_threads(&self) -> Vec<ThreadId> {
		self.threads.lock().clone()
	}

	fn offer(&self) -> Result<()> {
		self.offers.fetch_add(1, Ordering::SeqCst);

		let rejected = self.shutdown.load(Ordering::SeqCst)
			|| self.rejecting.load(Ordering::SeqCst)
			|| self.reject_remaining.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok();

		if rejected {
			let rejections = self.rejections.fetch_add(1, Ordering::SeqCst) + 1;
			trace!(scheduler = %self.name, rejections, "scripted rejection");
			return Err(Error::rejected(&self.name, "scripted rejection"));
		}

		self.accepted.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}

	fn recorded(&self, job: Job) -> Job {
		let threads = self.threads.clone();
		Box::new(move || {
			threads.lock().push(thread::current().id());
			job()
		})
	}
}

impl Scheduler for ScriptedScheduler {
	fn name(&self) -> &str {
		&self.name
	}

	fn submit(&self, job: Job) -> Result<TaskFuture> {
		self.offer()?;
		self.inner.submit(self.recorded(job))
	}

	fn execute(&self, job: Job) -> Result<()> {
		self.offer()?;
		self.inner.execute(self.recorded(job))
	}

	fn schedule(&self, job: Job, delay: Duration) -> Result<TaskFuture> {
		self.offer()?;
		self.inner.schedule(self.recorded(job), delay)
	}

	fn schedule_at_fixed_rate(&self, job: RecurringJob, initial_delay: Duration, period: Duration)
	-> Result<TaskFuture> {
		self.offer()?;
		self.inner.schedule_at_fixed_rate(job, initial_delay, period)
	}

	fn schedule_with_fixed_delay(&self, job: RecurringJob, initial_delay: Duration, delay: Duration)
	-> Result<TaskFuture> {
		self.offer()?;
		self.inner.schedule_with_fixed_delay(job, initial_delay, delay)
	}

	fn shutdown(&self) {
		self.shutdown.store(true, Ordering::SeqCst);
		self.inner.shutdown();
	}

	fn shutdown_now(&self) -> Vec<Job> {
		self.shutdown.store(true, Ordering::SeqCst);
		self.inner.shutdown_now()
	}

	fn is_shutdown(&self) -> bool {
		self.shutdown.load(Ordering::SeqCst)
	}

	// an inline inner scheduler never reports shutdown, so only our flag counts
	fn is_terminated(&self) -> bool {
		self.is_shutdown() && (!self.inner.is_shutdown() || self.inner.is_terminated())
	}

	fn await_termination(&self, timeout: Duration) -> Result<bool> {
		if self.inner.is_shutdown() {
			return self.inner.await_termination(timeout);
		}
		Ok(self.is_shutdown())
	}
}

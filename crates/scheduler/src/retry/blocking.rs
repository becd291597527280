// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{sync::Arc, time::Duration};

use tracing::{debug, trace};

use super::Hook;
use crate::{
	config::RetryConfig,
	error::{Error, Result},
	future::TaskFuture,
	interrupt,
	scheduler::Scheduler,
	task::{Job, JobSlot, RecurringJob},
};

/// Retries rejected work on the calling thread until the delegate accepts
/// it.
///
/// Each rejected attempt fires `on_retry` and sleeps for the configured
/// interval. The loop ends with [`Error::Rejected`] once the delegate is shut
/// down, or when the sleeping thread is interrupted; in the latter case the
/// thread stays marked as interrupted.
///
/// `invoke_all` and `invoke_any` go through the retrying `submit`, one job
/// at a time.
pub struct BlockingRetryDispatcher {
	name: String,
	delegate: Arc<dyn Scheduler>,
	interval: Duration,
	on_retry: Option<Hook>,
}

impl BlockingRetryDispatcher {
	pub fn new(delegate: Arc<dyn Scheduler>, config: &RetryConfig) -> Self {
		Self {
			name: format!("blocking-retry({})", delegate.name()),
			delegate,
			interval: config.interval,
			on_retry: None,
		}
	}

	pub fn on_retry<F>(mut self, f: F) -> Self
	where
		F: Fn() + Send + Sync + 'static,
	{
		self.on_retry = Some(Arc::new(f));
		self
	}

	pub fn delegate(&self) -> &Arc<dyn Scheduler> {
		&self.delegate
	}

	fn retry<T>(&self, mut attempt: impl FnMut(&dyn Scheduler) -> Result<T>) -> Result<T> {
		let mut attempts = 0u64;

		while !self.delegate.is_shutdown() && !self.delegate.is_terminated() {
			attempts += 1;
			match attempt(self.delegate.as_ref()) {
				Err(err) if err.is_rejection() => {
					trace!(scheduler = %self.name, attempts, %err, "rejected, retrying");
					if let Some(hook) = &self.on_retry {
						hook();
					}

					if interrupt::sleep(self.interval).is_err() {
						interrupt::reassert();
						debug!(scheduler = %self.name, attempts, "interrupted while waiting to retry");
						return Err(Error::rejected(&self.name, "interrupted while waiting to retry"));
					}
				}
				other => return other,
			}
		}

		debug!(scheduler = %self.name, attempts, "delegate shut down, giving up");
		Err(Error::rejected(&self.name, format!("{} is shut down", self.delegate.name())))
	}
}

impl Scheduler for BlockingRetryDispatcher {
	fn name(&self) -> &str {
		&self.name
	}

	fn submit(&self, job: Job) -> Result<TaskFuture> {
		let slot = JobSlot::new(job);
		self.retry(|delegate| delegate.submit(slot.offer()))
	}

	fn execute(&self, job: Job) -> Result<()> {
		let slot = JobSlot::new(job);
		self.retry(|delegate| delegate.execute(slot.offer()))
	}

	fn schedule(&self, job: Job, delay: Duration) -> Result<TaskFuture> {
		let slot = JobSlot::new(job);
		self.retry(|delegate| delegate.schedule(slot.offer(), delay))
	}

	fn schedule_at_fixed_rate(&self, job: RecurringJob, initial_delay: Duration, period: Duration)
	-> Result<TaskFuture> {
		self.retry(|delegate| delegate.schedule_at_fixed_rate(job.clone(), initial_delay, period))
	}

	fn schedule_with_fixed_delay(&self, job: RecurringJob, initial_delay: Duration, delay: Duration)
	-> Result<TaskFuture> {
		self.retry(|delegate| delegate.schedule_with_fixed_delay(job.clone(), initial_delay, delay))
	}

	fn shutdown(&self) {
		self.delegate.shutdown();
	}

	fn shutdown_now(&self) -> Vec<Job> {
		self.delegate.shutdown_now()
	}

	fn is_shutdown(&self) -> bool {
		self.delegate.is_shutdown()
	}

	fn is_terminated(&self) -> bool {
		self.delegate.is_terminated()
	}

	fn await_termination(&self, timeout: Duration) -> Result<bool> {
		self.delegate.await_termination(timeout)
	}
}

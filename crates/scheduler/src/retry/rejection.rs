// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{mem, sync::Arc, time::Duration};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::RetryHooks;
use crate::{
	config::RetryConfig,
	error::{Error, Result},
	future::{Promise, TaskFuture},
	scheduler::Scheduler,
	task::{Job, JobSlot, Output, RecurringJob},
};

/// Hands rejected work to a retry scheduler instead of blocking the caller.
///
/// On the first rejection the caller immediately gets a future bridged to
/// the eventual execution. The retry scheduler re-offers the work to the
/// delegate every interval until it is accepted. Work that can never be
/// handed to the retry scheduler fails its future with that error. Work
/// that either scheduler drops without running, e.g. on shutdown, fails it
/// with [`Error::Rejected`].
///
/// Only `submit` and `execute` are retried. Every other call passes through
/// to the delegate.
pub struct RejectionRetryDispatcher {
	shared: Arc<Shared>,
}

struct Shared {
	name: String,
	delegate: Arc<dyn Scheduler>,
	retry_scheduler: Arc<dyn Scheduler>,
	hooks: RetryHooks,
	interval: Duration,
}

#[derive(Clone, Copy, Debug)]
enum Mode {
	Submit,
	Execute,
}

/// Write side of the caller's future for work that was rejected at least
/// once.
///
/// Held by the pending retry and, once the delegate accepted it, by the
/// accepted wrapper. Dropping the last handle before the work ran fails the
/// future, so a retry discarded by either scheduler never leaves the caller
/// waiting.
struct Bridge {
	scheduler: String,
	promise: Promise,
}

impl Bridge {
	fn complete(&self, result: Result<Output>) -> bool {
		self.promise.complete(result)
	}
}

impl Drop for Bridge {
	fn drop(&mut self) {
		if self.promise.complete(Err(Error::rejected(&self.scheduler, "retry abandoned"))) {
			warn!(scheduler = %self.scheduler, "retried task dropped before it ran");
		}
	}
}

/// Work that was rejected at least once. A further rejection reschedules
/// this same value.
struct RetryTask {
	slot: JobSlot,
	bridge: Arc<Bridge>,
	mode: Mode,
	attempt: u64,
}

/// Where a retry whose attempt was rejected again goes next.
///
/// While `schedule` is still on the stack the next retry is handed back to
/// it, so a retry scheduler that runs work inline loops instead of
/// recursing.
enum Handoff {
	Scheduling,
	Returned(RetryTask),
	Detached,
}

impl RejectionRetryDispatcher {
	pub fn new(
		delegate: Arc<dyn Scheduler>,
		retry_scheduler: Arc<dyn Scheduler>,
		config: &RetryConfig,
		hooks: RetryHooks,
	) -> Self {
		Self {
			shared: Arc::new(Shared {
				name: format!("rejection-retry({})", delegate.name()),
				delegate,
				retry_scheduler,
				hooks,
				interval: config.interval,
			}),
		}
	}

	pub fn delegate(&self) -> &Arc<dyn Scheduler> {
		&self.shared.delegate
	}
}

impl Shared {
	fn offer(&self, job: Job, mode: Mode) -> Result<Option<TaskFuture>> {
		match mode {
			Mode::Submit => self.delegate.submit(job).map(Some),
			Mode::Execute => self.delegate.execute(job).map(|()| None),
		}
	}

	/// First attempt. Returns the delegate's future when accepted directly,
	/// a bridged future when the work went to the retry scheduler.
	fn dispatch(self: &Arc<Self>, job: Job, mode: Mode) -> Result<Option<TaskFuture>> {
		let slot = JobSlot::new(job);

		match self.offer(slot.offer(), mode) {
			Err(err) if err.is_rejection() => {
				debug!(scheduler = %self.name, %err, interval = ?self.interval, "rejected, handing to retry scheduler");
				self.hooks.rejected();

				let promise = Promise::new();
				self.schedule_retry(RetryTask {
					slot,
					bridge: Arc::new(Bridge {
						scheduler: self.name.clone(),
						promise: promise.clone(),
					}),
					mode,
					attempt: 1,
				});
				Ok(Some(TaskFuture::pending(promise)))
			}
			other => other,
		}
	}

	fn schedule_retry(self: &Arc<Self>, mut task: RetryTask) {
		loop {
			let bridge = task.bridge.clone();
			let handoff = Arc::new(Mutex::new(Handoff::Scheduling));

			let retry: Job = {
				let shared = Arc::clone(self);
				let handoff = handoff.clone();
				Box::new(move || {
					if let Some(next) = shared.attempt(task) {
						let mut state = handoff.lock();
						if matches!(*state, Handoff::Scheduling) {
							*state = Handoff::Returned(next);
						} else {
							drop(state);
							shared.schedule_retry(next);
						}
					}
					Ok(Box::new(()) as Output)
				})
			};

			let scheduled = self.retry_scheduler.schedule(retry, self.interval);
			let returned = mem::replace(&mut *handoff.lock(), Handoff::Detached);

			match scheduled {
				Ok(future) if future.is_interrupted() => {
					warn!(scheduler = %self.name, "interrupted while waiting to retry, failing task");
					bridge.complete(Err(Error::Interrupted));
				}
				Ok(_) => {}
				Err(err) => {
					warn!(scheduler = %self.name, %err, "retry scheduler refused retry, failing task");
					bridge.complete(Err(err));
				}
			}

			match returned {
				Handoff::Returned(next) => task = next,
				Handoff::Scheduling | Handoff::Detached => return,
			}
		}
	}

	/// Offers the work to the delegate again. Returns the task when it was
	/// rejected and needs another retry.
	fn attempt(&self, task: RetryTask) -> Option<RetryTask> {
		let run: Job = {
			let slot = task.slot.clone();
			let bridge = task.bridge.clone();
			let hooks = self.hooks.clone();
			let mode = task.mode;
			Box::new(move || {
				let result = slot.run();
				hooks.retry_successful();
				match mode {
					Mode::Submit => {
						bridge.complete(result.map_err(Error::Task));
						Ok(Box::new(()) as Output)
					}
					// nobody reads the future, let the delegate report the outcome
					Mode::Execute => {
						bridge.complete(
							result.as_ref().map(|_| Box::new(()) as Output).map_err(|err| Error::Task(err.clone())),
						);
						result
					}
				}
			})
		};

		match self.offer(run, task.mode) {
			Ok(_) => {
				trace!(scheduler = %self.name, attempt = task.attempt, mode = ?task.mode, "retried task accepted");
				None
			}
			Err(err) if err.is_rejection() => {
				debug!(scheduler = %self.name, attempt = task.attempt, %err, "retried task rejected again");
				self.hooks.rejected();
				Some(RetryTask {
					attempt: task.attempt + 1,
					..task
				})
			}
			Err(err) => {
				task.bridge.complete(Err(err));
				None
			}
		}
	}
}

impl Scheduler for RejectionRetryDispatcher {
	fn name(&self) -> &str {
		&self.shared.name
	}

	fn submit(&self, job: Job) -> Result<TaskFuture> {
		match self.shared.dispatch(job, Mode::Submit)? {
			Some(future) => Ok(future),
			None => Err(Error::rejected(&self.shared.name, "submission produced no future")),
		}
	}

	fn execute(&self, job: Job) -> Result<()> {
		self.shared.dispatch(job, Mode::Execute).map(|_| ())
	}

	fn schedule(&self, job: Job, delay: Duration) -> Result<TaskFuture> {
		self.shared.delegate.schedule(job, delay)
	}

	fn schedule_at_fixed_rate(&self, job: RecurringJob, initial_delay: Duration, period: Duration)
	-> Result<TaskFuture> {
		self.shared.delegate.schedule_at_fixed_rate(job, initial_delay, period)
	}

	fn schedule_with_fixed_delay(&self, job: RecurringJob, initial_delay: Duration, delay: Duration)
	-> Result<TaskFuture> {
		self.shared.delegate.schedule_with_fixed_delay(job, initial_delay, delay)
	}

	fn invoke_all(&self, jobs: Vec<Job>) -> Result<Vec<TaskFuture>> {
		self.shared.delegate.invoke_all(jobs)
	}

	fn invoke_any(&self, jobs: Vec<Job>) -> Result<Output> {
		self.shared.delegate.invoke_any(jobs)
	}

	fn shutdown(&self) {
		self.shared.delegate.shutdown();
	}

	fn shutdown_now(&self) -> Vec<Job> {
		self.shared.delegate.shutdown_now()
	}

	fn is_shutdown(&self) -> bool {
		self.shared.delegate.is_shutdown()
	}

	fn is_terminated(&self) -> bool {
		self.shared.delegate.is_terminated()
	}

	fn await_termination(&self, timeout: Duration) -> Result<bool> {
		self.shared.delegate.await_termination(timeout)
	}
}

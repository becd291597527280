// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, unbounded};
use tracing::trace;

use crate::{
	error::{Error, Result, TaskError},
	future::{JobHandle, TaskFuture},
	interrupt,
	task::{self, Job, Output, RecurringJob},
};

/// A service that runs work now, later, or periodically.
///
/// Every implementation in this crate is either an executor or a decorator
/// over another `Arc<dyn Scheduler>`. Submission fails with
/// [`Error::Rejected`] when the scheduler refuses the work; failures of the
/// work itself are reported through the returned [`TaskFuture`].
pub trait Scheduler: Send + Sync {
	/// Name used in log events and rejection errors.
	fn name(&self) -> &str;

	fn submit(&self, job: Job) -> Result<TaskFuture>;

	/// Fire-and-forget submission. Task failures are logged and dropped.
	fn execute(&self, job: Job) -> Result<()>;

	fn schedule(&self, job: Job, delay: Duration) -> Result<TaskFuture>;

	/// Runs `job` every `period`, measured from the start of each run.
	///
	/// Runs never overlap. A failing run ends the schedule and fails the
	/// returned future.
	fn schedule_at_fixed_rate(&self, job: RecurringJob, initial_delay: Duration, period: Duration)
	-> Result<TaskFuture>;

	/// Runs `job` repeatedly with `delay` between the end of one run and the
	/// start of the next.
	fn schedule_with_fixed_delay(&self, job: RecurringJob, initial_delay: Duration, delay: Duration)
	-> Result<TaskFuture>;

	/// Submits all jobs and waits until every one of them is done.
	///
	/// If any submission is rejected, the futures already obtained are
	/// cancelled and the rejection returned.
	fn invoke_all(&self, jobs: Vec<Job>) -> Result<Vec<TaskFuture>> {
		let mut futures = Vec::with_capacity(jobs.len());
		for job in jobs {
			match self.submit(job) {
				Ok(future) => futures.push(future),
				Err(err) => {
					futures.iter().for_each(|future| {
						future.cancel();
					});
					return Err(err);
				}
			}
		}

		for future in &futures {
			future.wait()?;
		}
		Ok(futures)
	}

	/// Returns the output of the first job that succeeds, or the last
	/// failure if none does.
	fn invoke_any(&self, jobs: Vec<Job>) -> Result<Output> {
		if jobs.is_empty() {
			return Err(Error::NoTasks);
		}

		let (tx, rx) = unbounded();
		let mut futures = Vec::with_capacity(jobs.len());

		for job in jobs {
			let tx = tx.clone();
			let reporting: Job = Box::new(move || {
				let _ = tx.send(task::run(job));
				Ok(Box::new(()) as Output)
			});

			match self.submit(reporting) {
				Ok(future) => futures.push(future),
				Err(err) => {
					futures.iter().for_each(|future| {
						future.cancel();
					});
					return Err(err);
				}
			}
		}
		drop(tx);

		let mut last_failure: Option<TaskError> = None;
		loop {
			if interrupt::interrupted() {
				futures.iter().for_each(|future| {
					future.cancel();
				});
				return Err(Error::Interrupted);
			}

			match rx.recv_timeout(interrupt::POLL_INTERVAL) {
				Ok(Ok(output)) => {
					futures.iter().for_each(|future| {
						future.cancel();
					});
					return Ok(output);
				}
				Ok(Err(err)) => {
					trace!(scheduler = self.name(), %err, "invoke_any candidate failed");
					last_failure = Some(err);
				}
				Err(RecvTimeoutError::Timeout) => {}
				Err(RecvTimeoutError::Disconnected) => {
					return Err(last_failure.map(Error::Task).unwrap_or(Error::Cancelled));
				}
			}
		}
	}

	/// Stops accepting new work. Accepted work still runs.
	fn shutdown(&self);

	/// Stops accepting new work and drops queued work.
	///
	/// Returns the jobs that were accepted but never started, where the
	/// scheduler can still hand them back.
	fn shutdown_now(&self) -> Vec<Job>;

	fn is_shutdown(&self) -> bool;

	/// Shut down and all accepted work finished.
	fn is_terminated(&self) -> bool;

	/// Blocks until terminated or `timeout` passes. Interruptible.
	fn await_termination(&self, timeout: Duration) -> Result<bool>;
}

/// Typed convenience layer over [`Scheduler`].
pub trait SchedulerExt: Scheduler {
	fn spawn<T, F>(&self, f: F) -> Result<JobHandle<T>>
	where
		T: Send + 'static,
		F: FnOnce() -> T + Send + 'static,
	{
		self.submit(task::job(f)).map(JobHandle::new)
	}

	fn spawn_fallible<T, F>(&self, f: F) -> Result<JobHandle<T>>
	where
		T: Send + 'static,
		F: FnOnce() -> std::result::Result<T, TaskError> + Send + 'static,
	{
		self.submit(task::fallible(f)).map(JobHandle::new)
	}

	fn spawn_after<T, F>(&self, delay: Duration, f: F) -> Result<JobHandle<T>>
	where
		T: Send + 'static,
		F: FnOnce() -> T + Send + 'static,
	{
		self.schedule(task::job(f), delay).map(JobHandle::new)
	}

	/// Submits `job` and drops the future. Unlike `execute`, task failures
	/// are not logged.
	fn execute_async(&self, job: Job) -> Result<()> {
		self.submit(job).map(drop)
	}

	fn run<F>(&self, f: F) -> Result<()>
	where
		F: FnOnce() + Send + 'static,
	{
		self.execute(task::job(f))
	}

	fn every<F>(&self, period: Duration, f: F) -> Result<TaskFuture>
	where
		F: Fn() + Send + Sync + 'static,
	{
		self.schedule_at_fixed_rate(task::recurring(f), period, period)
	}
}

impl<S: Scheduler + ?Sized> SchedulerExt for S {}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::time::Duration;

use tracing::{trace, warn};

use crate::{
	error::{Error, Result, TaskError},
	future::{SynchronousFuture, TaskFuture},
	interrupt,
	scheduler::Scheduler,
	task::{self, Job, Output, RecurringJob},
};

static IMMEDIATE: ImmediateScheduler = ImmediateScheduler;

/// Runs every job on the calling thread before returning.
///
/// Stateless and shared process-wide through [`ImmediateScheduler::instance`].
/// It never shuts down: lifecycle calls are no-ops, which leaves termination
/// to whoever owns a real executor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateScheduler;

impl ImmediateScheduler {
	pub fn instance() -> &'static ImmediateScheduler {
		&IMMEDIATE
	}
}

impl Scheduler for ImmediateScheduler {
	fn name(&self) -> &str {
		"immediate"
	}

	fn submit(&self, job: Job) -> Result<TaskFuture> {
		Ok(SynchronousFuture::from_result(task::run(job)).into())
	}

	fn execute(&self, job: Job) -> Result<()> {
		if let Err(err) = task::run(job) {
			warn!(scheduler = self.name(), %err, "inline task failed");
		}
		Ok(())
	}

	/// Sleeps on the calling thread, then runs the job.
	///
	/// An interruption during the sleep skips the job, keeps the thread
	/// marked as interrupted and yields an interrupted future.
	fn schedule(&self, job: Job, delay: Duration) -> Result<TaskFuture> {
		if interrupt::sleep(delay).is_err() {
			interrupt::reassert();
			trace!(scheduler = self.name(), ?delay, "interrupted before delayed inline task");
			return Ok(SynchronousFuture::interrupted().into());
		}
		self.submit(job)
	}

	fn schedule_at_fixed_rate(&self, _job: RecurringJob, _initial_delay: Duration, _period: Duration)
	-> Result<TaskFuture> {
		Err(Error::rejected(self.name(), "periodic work cannot run on the calling thread"))
	}

	fn schedule_with_fixed_delay(&self, _job: RecurringJob, _initial_delay: Duration, _delay: Duration)
	-> Result<TaskFuture> {
		Err(Error::rejected(self.name(), "periodic work cannot run on the calling thread"))
	}

	fn invoke_all(&self, jobs: Vec<Job>) -> Result<Vec<TaskFuture>> {
		jobs.into_iter().map(|job| self.submit(job)).collect()
	}

	/// Runs the jobs in order and stops at the first success.
	fn invoke_any(&self, jobs: Vec<Job>) -> Result<Output> {
		let mut last_failure: Option<TaskError> = None;
		for job in jobs {
			match task::run(job) {
				Ok(output) => return Ok(output),
				Err(err) => last_failure = Some(err),
			}
		}
		Err(last_failure.map(Error::Task).unwrap_or(Error::NoTasks))
	}

	fn shutdown(&self) {}

	fn shutdown_now(&self) -> Vec<Job> {
		Vec::new()
	}

	fn is_shutdown(&self) -> bool {
		false
	}

	fn is_terminated(&self) -> bool {
		false
	}

	fn await_termination(&self, _timeout: Duration) -> Result<bool> {
		Ok(false)
	}
}

#[cfg(test)]
mod tests {
	use std::{
		sync::{
			Arc,
			atomic::{AtomicUsize, Ordering},
		},
		thread,
		time::Instant,
	};

	use super::*;
	use crate::{
		scheduler::SchedulerExt,
		task::{fallible, job},
	};

	#[test]
	fn test_submit_runs_on_calling_thread() {
		let caller = thread::current().id();
		let handle = ImmediateScheduler::instance().spawn(move || thread::current().id() == caller).unwrap();
		assert!(handle.is_done());
		assert_eq!(handle.get(), Ok(true));
	}

	#[test]
	fn test_failure_lands_in_future() {
		let future = ImmediateScheduler
			.submit(fallible::<(), _>(|| Err(TaskError::failed("broken"))))
			.unwrap();
		assert!(future.is_synchronous());
		assert_eq!(future.get().err(), Some(Error::Task(TaskError::Failed("broken".to_string()))));
	}

	#[test]
	fn test_execute_swallows_failure() {
		let result = ImmediateScheduler.execute(job(|| -> () { panic!("ignored") }));
		assert_eq!(result, Ok(()));
	}

	#[test]
	fn test_schedule_waits_for_delay() {
		let start = Instant::now();
		let handle = ImmediateScheduler.spawn_after(Duration::from_millis(20), || 5).unwrap();
		assert!(start.elapsed() >= Duration::from_millis(20));
		assert_eq!(handle.get(), Ok(5));
	}

	#[test]
	fn test_schedule_interrupted() {
		let ran = Arc::new(AtomicUsize::new(0));
		let counter = ran.clone();

		interrupt::reassert();
		let future = ImmediateScheduler
			.schedule(
				job(move || {
					counter.fetch_add(1, Ordering::SeqCst);
				}),
				Duration::from_secs(10),
			)
			.unwrap();

		assert!(future.is_interrupted());
		assert_eq!(ran.load(Ordering::SeqCst), 0);
		// the interruption stays visible to the caller
		assert!(interrupt::interrupted());
	}

	#[test]
	fn test_periodic_work_rejected() {
		let err = ImmediateScheduler.every(Duration::from_millis(1), || {}).unwrap_err();
		assert!(err.is_rejection());
	}

	#[test]
	fn test_invoke_any_first_success() {
		let jobs = vec![
			fallible::<u8, _>(|| Err(TaskError::failed("first"))),
			job(|| 2u8),
			job(|| -> u8 { unreachable!("not reached after a success") }),
		];
		let output = ImmediateScheduler.invoke_any(jobs).unwrap();
		assert_eq!(*output.downcast::<u8>().unwrap(), 2);
	}

	#[test]
	fn test_invoke_any_all_fail() {
		let jobs = vec![
			fallible::<u8, _>(|| Err(TaskError::failed("first"))),
			fallible::<u8, _>(|| Err(TaskError::failed("second"))),
		];
		let err = ImmediateScheduler.invoke_any(jobs).err();
		assert_eq!(err, Some(Error::Task(TaskError::Failed("second".to_string()))));
		assert_eq!(ImmediateScheduler.invoke_any(Vec::new()).err(), Some(Error::NoTasks));
	}

	#[test]
	fn test_invoke_all_in_order() {
		let futures = ImmediateScheduler.invoke_all(vec![job(|| 1u8), job(|| 2u8)]).unwrap();
		assert!(futures.iter().all(TaskFuture::is_done));
	}

	#[test]
	fn test_lifecycle_is_inert() {
		let scheduler = ImmediateScheduler::instance();
		scheduler.shutdown();
		assert!(!scheduler.is_shutdown());
		assert!(!scheduler.is_terminated());
		assert!(scheduler.shutdown_now().is_empty());
		assert_eq!(scheduler.await_termination(Duration::from_secs(1)), Ok(false));
		assert!(scheduler.run(|| {}).is_ok());
	}
}

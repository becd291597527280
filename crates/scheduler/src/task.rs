// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Type-erased units of work accepted by every [`Scheduler`](crate::Scheduler).

use std::{
	any::Any,
	panic::{AssertUnwindSafe, catch_unwind},
	sync::Arc,
};

use parking_lot::Mutex;

use crate::error::TaskError;

/// Value produced by a job. Downcast by [`JobHandle`](crate::JobHandle).
pub type Output = Box<dyn Any + Send>;

pub type TaskResult = std::result::Result<Output, TaskError>;

/// A single-shot unit of work.
pub type Job = Box<dyn FnOnce() -> TaskResult + Send + 'static>;

/// A unit of work run repeatedly by periodic scheduling.
pub type RecurringJob = Arc<dyn Fn() -> std::result::Result<(), TaskError> + Send + Sync + 'static>;

/// Wraps an infallible closure into a [`Job`].
pub fn job<T, F>(f: F) -> Job
where
	T: Send + 'static,
	F: FnOnce() -> T + Send + 'static,
{
	Box::new(move || Ok(Box::new(f()) as Output))
}

/// Wraps a fallible closure into a [`Job`].
pub fn fallible<T, F>(f: F) -> Job
where
	T: Send + 'static,
	F: FnOnce() -> std::result::Result<T, TaskError> + Send + 'static,
{
	Box::new(move || f().map(|value| Box::new(value) as Output))
}

/// Wraps an infallible closure into a [`RecurringJob`].
pub fn recurring<F>(f: F) -> RecurringJob
where
	F: Fn() + Send + Sync + 'static,
{
	Arc::new(move || {
		f();
		Ok(())
	})
}

/// Runs `job`, turning a panic into [`TaskError::Panicked`].
pub(crate) fn run(job: Job) -> TaskResult {
	match catch_unwind(AssertUnwindSafe(job)) {
		Ok(result) => result,
		Err(payload) => Err(TaskError::Panicked(panic_message(payload.as_ref()))),
	}
}

pub(crate) fn run_recurring(job: &RecurringJob) -> std::result::Result<(), TaskError> {
	match catch_unwind(AssertUnwindSafe(|| job())) {
		Ok(result) => result,
		Err(payload) => Err(TaskError::Panicked(panic_message(payload.as_ref()))),
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&str>() {
		message.to_string()
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.clone()
	} else {
		"unknown panic payload".to_string()
	}
}

/// Holds a job so it can be offered to a scheduler more than once.
///
/// The job leaves the slot only when an offered wrapper actually runs. A
/// wrapper dropped without running (a rejected offer) leaves the job in place
/// for the next attempt.
#[derive(Clone)]
pub(crate) struct JobSlot {
	job: Arc<Mutex<Option<Job>>>,
}

impl JobSlot {
	pub(crate) fn new(job: Job) -> Self {
		Self {
			job: Arc::new(Mutex::new(Some(job))),
		}
	}

	pub(crate) fn offer(&self) -> Job {
		let slot = self.clone();
		Box::new(move || slot.run())
	}

	pub(crate) fn run(&self) -> TaskResult {
		let job = self.job.lock().take();
		match job {
			Some(job) => run(job),
			None => Err(TaskError::failed("job already consumed by an earlier attempt")),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_job_output_downcasts() {
		let output = run(job(|| 21 * 2)).unwrap();
		assert_eq!(*output.downcast::<i32>().unwrap(), 42);
	}

	#[test]
	fn test_fallible_job_error() {
		let result = run(fallible::<(), _>(|| Err(TaskError::failed("nope"))));
		assert_eq!(result.err(), Some(TaskError::Failed("nope".to_string())));
	}

	#[test]
	fn test_panic_is_captured() {
		let result = run(job(|| -> u8 { panic!("exploded") }));
		assert_eq!(result.err(), Some(TaskError::Panicked("exploded".to_string())));
	}

	#[test]
	fn test_recurring_panic_is_captured() {
		let job = recurring(|| panic!("again"));
		assert_eq!(run_recurring(&job), Err(TaskError::Panicked("again".to_string())));
	}

	#[test]
	fn test_slot_survives_dropped_offer() {
		let slot = JobSlot::new(job(|| "hello"));

		// a rejected offer is simply dropped
		drop(slot.offer());

		let output = slot.offer()().unwrap();
		assert_eq!(*output.downcast::<&str>().unwrap(), "hello");

		// the second run finds the slot empty
		assert!(slot.run().is_err());
	}
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
	time::Instant,
};

use parking_lot::{Condvar, Mutex};

use crate::{
	error::{Error, Result, TaskError},
	interrupt,
	task::Output,
};

enum State {
	Pending,
	Done(Result<Output>),
	Taken,
}

struct Inner {
	state: Mutex<State>,
	done: Condvar,
	cancelled: AtomicBool,
}

/// Write side of an asynchronously completed result. The first completion
/// wins; later ones are ignored.
#[derive(Clone)]
pub(crate) struct Promise {
	inner: Arc<Inner>,
}

impl Promise {
	pub(crate) fn new() -> Self {
		Self {
			inner: Arc::new(Inner {
				state: Mutex::new(State::Pending),
				done: Condvar::new(),
				cancelled: AtomicBool::new(false),
			}),
		}
	}

	/// Returns false if the promise was already completed.
	pub(crate) fn complete(&self, result: Result<Output>) -> bool {
		let mut state = self.inner.state.lock();
		if !matches!(*state, State::Pending) {
			return false;
		}
		*state = State::Done(result);
		self.inner.done.notify_all();
		true
	}

	pub(crate) fn cancel(&self) -> bool {
		let cancelled = self.complete(Err(Error::Cancelled));
		if cancelled {
			self.inner.cancelled.store(true, Ordering::Release);
		}
		cancelled
	}

	pub(crate) fn is_done(&self) -> bool {
		!matches!(*self.inner.state.lock(), State::Pending)
	}

	pub(crate) fn is_cancelled(&self) -> bool {
		self.inner.cancelled.load(Ordering::Acquire)
	}

	/// Blocks until completed or `deadline` passes. Interruptible.
	pub(crate) fn wait(&self, deadline: Option<Instant>) -> Result<bool> {
		let mut state = self.inner.state.lock();
		interrupt::wait_until(&self.inner.done, &mut state, deadline, |state| !matches!(state, State::Pending))
	}

	/// Blocks until completed and moves the result out.
	pub(crate) fn take(&self) -> Result<Output> {
		let mut state = self.inner.state.lock();
		interrupt::wait_until(&self.inner.done, &mut state, None, |state| !matches!(state, State::Pending))?;

		match std::mem::replace(&mut *state, State::Taken) {
			State::Done(result) => result,
			_ => Err(Error::Task(TaskError::failed("result already taken"))),
		}
	}
}

#[cfg(test)]
mod tests {
	use std::{thread, time::Duration};

	use super::*;

	#[test]
	fn test_first_completion_wins() {
		let promise = Promise::new();
		assert!(promise.complete(Ok(Box::new(1u8))));
		assert!(!promise.complete(Ok(Box::new(2u8))));
		assert!(!promise.cancel());
		assert!(!promise.is_cancelled());
		assert_eq!(*promise.take().unwrap().downcast::<u8>().unwrap(), 1);
	}

	#[test]
	fn test_take_blocks_until_completed() {
		let promise = Promise::new();
		let completer = promise.clone();

		let handle = thread::spawn(move || {
			thread::sleep(Duration::from_millis(20));
			completer.complete(Ok(Box::new("late")));
		});

		assert_eq!(*promise.take().unwrap().downcast::<&str>().unwrap(), "late");
		handle.join().unwrap();
	}

	#[test]
	fn test_wait_times_out() {
		let promise = Promise::new();
		let deadline = Instant::now() + Duration::from_millis(20);
		assert_eq!(promise.wait(Some(deadline)), Ok(false));
		assert!(!promise.is_done());
	}

	#[test]
	fn test_cancel() {
		let promise = Promise::new();
		assert!(promise.cancel());
		assert!(promise.is_done());
		assert!(promise.is_cancelled());
		assert_eq!(promise.take().err(), Some(Error::Cancelled));
	}

	#[test]
	fn test_wait_is_interruptible() {
		let promise = Promise::new();
		interrupt::reassert();
		assert_eq!(promise.wait(None), Err(Error::Interrupted));
	}
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Handles to the results of submitted work.

mod promise;
mod synchronous;

use std::{
	any::type_name,
	fmt::{self, Debug, Formatter},
	marker::PhantomData,
	time::{Duration, Instant},
};

pub(crate) use promise::Promise;
pub use synchronous::{Outcome, SynchronousFuture};

use crate::{
	error::{Error, Result, TaskError},
	task::Output,
};

/// Result handle returned by every [`Scheduler`](crate::Scheduler).
///
/// Either already resolved, when the work ran on the calling thread, or
/// pending until a worker completes it.
pub struct TaskFuture {
	state: FutureState,
}

enum FutureState {
	Ready(SynchronousFuture),
	Pending(Promise),
}

impl TaskFuture {
	pub fn ready(future: SynchronousFuture) -> Self {
		Self {
			state: FutureState::Ready(future),
		}
	}

	pub(crate) fn pending(promise: Promise) -> Self {
		Self {
			state: FutureState::Pending(promise),
		}
	}

	/// Whether the result was produced on the calling thread.
	pub fn is_synchronous(&self) -> bool {
		matches!(self.state, FutureState::Ready(_))
	}

	/// True for an inline execution that was interrupted before it ran.
	pub fn is_interrupted(&self) -> bool {
		match &self.state {
			FutureState::Ready(future) => future.is_interrupted(),
			FutureState::Pending(_) => false,
		}
	}

	pub fn is_done(&self) -> bool {
		match &self.state {
			FutureState::Ready(_) => true,
			FutureState::Pending(promise) => promise.is_done(),
		}
	}

	pub fn is_cancelled(&self) -> bool {
		match &self.state {
			FutureState::Ready(_) => false,
			FutureState::Pending(promise) => promise.is_cancelled(),
		}
	}

	/// Cancels a pending future. Work already running is not stopped, its
	/// result is discarded. Periodic work stops firing.
	///
	/// Returns false for resolved futures.
	pub fn cancel(&self) -> bool {
		match &self.state {
			FutureState::Ready(_) => false,
			FutureState::Pending(promise) => promise.cancel(),
		}
	}

	/// Blocks until the future is done or `timeout` passes. Interruptible.
	pub fn wait_timeout(&self, timeout: Duration) -> Result<bool> {
		match &self.state {
			FutureState::Ready(_) => Ok(true),
			FutureState::Pending(promise) => promise.wait(Instant::now().checked_add(timeout)),
		}
	}

	/// Blocks until the future is done. Interruptible.
	pub fn wait(&self) -> Result<()> {
		match &self.state {
			FutureState::Ready(_) => Ok(()),
			FutureState::Pending(promise) => promise.wait(None).map(|_| ()),
		}
	}

	/// Blocks for the result. Interruptible.
	pub fn get(self) -> Result<Output> {
		match self.state {
			FutureState::Ready(future) => future.get(),
			FutureState::Pending(promise) => promise.take(),
		}
	}
}

impl From<SynchronousFuture> for TaskFuture {
	fn from(future: SynchronousFuture) -> Self {
		TaskFuture::ready(future)
	}
}

impl Debug for TaskFuture {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match &self.state {
			FutureState::Ready(future) => f.debug_tuple("TaskFuture::Ready").field(future).finish(),
			FutureState::Pending(_) => f
				.debug_struct("TaskFuture::Pending")
				.field("done", &self.is_done())
				.field("cancelled", &self.is_cancelled())
				.finish(),
		}
	}
}

/// Typed view over a [`TaskFuture`].
pub struct JobHandle<T> {
	future: TaskFuture,
	_output: PhantomData<fn() -> T>,
}

impl<T: 'static> JobHandle<T> {
	pub(crate) fn new(future: TaskFuture) -> Self {
		Self {
			future,
			_output: PhantomData,
		}
	}

	pub fn is_done(&self) -> bool {
		self.future.is_done()
	}

	pub fn cancel(&self) -> bool {
		self.future.cancel()
	}

	pub fn wait_timeout(&self, timeout: Duration) -> Result<bool> {
		self.future.wait_timeout(timeout)
	}

	pub fn get(self) -> Result<T> {
		let output = self.future.get()?;
		output.downcast::<T>().map(|value| *value).map_err(|_| {
			Error::Task(TaskError::UnexpectedOutput {
				expected: type_name::<T>(),
			})
		})
	}

	pub fn into_future(self) -> TaskFuture {
		self.future
	}
}

impl<T> Debug for JobHandle<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("JobHandle").field("future", &self.future).finish()
	}
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::fmt::Display;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by schedulers and the futures they return.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
	/// The scheduler refused the work, e.g. because it is saturated or shut
	/// down.
	#[error("task rejected by {scheduler}: {reason}")]
	Rejected {
		scheduler: String,
		reason: String,
	},

	/// The calling thread was interrupted while blocked.
	#[error("wait interrupted")]
	Interrupted,

	/// The task itself failed.
	#[error(transparent)]
	Task(#[from] TaskError),

	/// The future was cancelled before it produced a value.
	#[error("task cancelled")]
	Cancelled,

	#[error("no tasks supplied")]
	NoTasks,
}

impl Error {
	pub fn rejected(scheduler: impl Into<String>, reason: impl Into<String>) -> Self {
		Error::Rejected {
			scheduler: scheduler.into(),
			reason: reason.into(),
		}
	}

	pub fn is_rejection(&self) -> bool {
		matches!(self, Error::Rejected { .. })
	}
}

/// Failure of a task body. Never retried by any dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
	#[error("task failed: {0}")]
	Failed(String),

	#[error("task panicked: {0}")]
	Panicked(String),

	/// The task produced a value of a different type than the caller asked
	/// for.
	#[error("task output is not a {expected}")]
	UnexpectedOutput {
		expected: &'static str,
	},
}

impl TaskError {
	pub fn failed(reason: impl Display) -> Self {
		TaskError::Failed(reason.to_string())
	}
}

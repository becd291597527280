// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::fmt::{self, Debug, Formatter};

use crate::{
	error::{Error, Result, TaskError},
	task::{Output, TaskResult},
};

/// How an inline execution ended.
pub enum Outcome {
	Value(Output),
	Failed(TaskError),
	/// The caller was interrupted before the work ran.
	Interrupted,
}

/// Future whose result is known at construction time.
///
/// Returned by work that ran on the calling thread. It is never cancellable
/// and `get` never blocks.
pub struct SynchronousFuture {
	outcome: Outcome,
}

impl SynchronousFuture {
	pub fn from_result(result: TaskResult) -> Self {
		let outcome = match result {
			Ok(value) => Outcome::Value(value),
			Err(err) => Outcome::Failed(err),
		};
		Self {
			outcome,
		}
	}

	pub fn interrupted() -> Self {
		Self {
			outcome: Outcome::Interrupted,
		}
	}

	pub fn outcome(&self) -> &Outcome {
		&self.outcome
	}

	pub fn is_interrupted(&self) -> bool {
		matches!(self.outcome, Outcome::Interrupted)
	}

	pub fn is_failed(&self) -> bool {
		matches!(self.outcome, Outcome::Failed(_))
	}

	pub fn get(self) -> Result<Output> {
		match self.outcome {
			Outcome::Value(value) => Ok(value),
			Outcome::Failed(err) => Err(Error::Task(err)),
			Outcome::Interrupted => Err(Error::Interrupted),
		}
	}
}

impl Debug for SynchronousFuture {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let outcome = match &self.outcome {
			Outcome::Value(_) => "value".to_string(),
			Outcome::Failed(err) => err.to_string(),
			Outcome::Interrupted => "interrupted".to_string(),
		};
		f.debug_struct("SynchronousFuture").field("outcome", &outcome).finish()
	}
}

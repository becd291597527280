// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::fmt::Display;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
	#[error("a round-robin supplier needs at least one sink")]
	NoSinks,

	#[error(transparent)]
	Scheduler(#[from] reifydb_scheduler::Error),
}

/// Terminal error signal delivered to a [`Sink`](crate::Sink).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct SinkError {
	message: String,
}

impl SinkError {
	pub fn new(message: impl Display) -> Self {
		Self {
			message: message.to_string(),
		}
	}

	pub fn message(&self) -> &str {
		&self.message
	}
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a [`PoolScheduler`](crate::PoolScheduler).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
	/// Number of worker threads when the pool is built from this config.
	///
	/// Default: number of logical CPUs
	pub threads: usize,
	/// Maximum number of submitted jobs queued or running at once.
	/// Submissions above the limit are rejected.
	///
	/// Default: 1024
	pub max_in_flight: usize,
	/// Prefix for worker and timer thread names.
	pub thread_name: String,
	/// Capacity of the timer command channel.
	pub timer_capacity: usize,
}

impl Default for PoolConfig {
	fn default() -> Self {
		Self {
			threads: num_cpus::get(),
			max_in_flight: 1024,
			thread_name: "dispatch".to_string(),
			timer_capacity: 256,
		}
	}
}

impl PoolConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn threads(mut self, threads: usize) -> Self {
		self.threads = threads;
		self
	}

	pub fn max_in_flight(mut self, max_in_flight: usize) -> Self {
		self.max_in_flight = max_in_flight;
		self
	}

	pub fn thread_name(mut self, name: impl Into<String>) -> Self {
		self.thread_name = name.into();
		self
	}

	pub fn timer_capacity(mut self, capacity: usize) -> Self {
		self.timer_capacity = capacity;
		self
	}
}

/// Fixed retry interval shared by both retry dispatchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
	#[serde(rename = "interval_ms", with = "millis")]
	pub interval: Duration,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			interval: Duration::from_millis(10),
		}
	}
}

impl RetryConfig {
	pub fn new(interval: Duration) -> Self {
		Self {
			interval,
		}
	}
}

/// (De)serializes a [`Duration`] as whole milliseconds.
pub mod millis {
	use std::time::Duration;

	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
		u64::deserialize(deserializer).map(Duration::from_millis)
	}
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::time::Duration;

use reifydb_scheduler::config::millis;
use serde::{Deserialize, Serialize};

/// Periodic eviction of idle per-thread sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
	/// Sinks unused for this long are completed and dropped.
	///
	/// Default: 60s
	#[serde(rename = "idle_ttl_ms", with = "millis")]
	pub idle_ttl: Duration,
	/// Time between sweeps.
	///
	/// Default: 10s
	#[serde(rename = "interval_ms", with = "millis")]
	pub interval: Duration,
}

impl Default for SweepConfig {
	fn default() -> Self {
		Self {
			idle_ttl: Duration::from_secs(60),
			interval: Duration::from_secs(10),
		}
	}
}

impl SweepConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn idle_ttl(mut self, ttl: Duration) -> Self {
		self.idle_ttl = ttl;
		self
	}

	pub fn interval(mut self, interval: Duration) -> Self {
		self.interval = interval;
		self
	}
}

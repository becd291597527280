// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::{error::Result, interrupt};

struct State {
	shutdown: bool,
	in_flight: usize,
	timer_running: bool,
}

impl State {
	fn terminated(&self) -> bool {
		self.shutdown && self.in_flight == 0 && !self.timer_running
	}
}

/// Admission and termination bookkeeping of a pool scheduler.
///
/// Shutdown and admission share one lock so no job is admitted after
/// shutdown was observed.
pub(super) struct Tracker {
	state: Mutex<State>,
	idle: Condvar,
}

pub(super) enum Admission {
	Admitted,
	ShutDown,
	Saturated,
}

impl Tracker {
	pub(super) fn new() -> Self {
		Self {
			state: Mutex::new(State {
				shutdown: false,
				in_flight: 0,
				timer_running: true,
			}),
			idle: Condvar::new(),
		}
	}

	pub(super) fn admit(&self, limit: Option<usize>) -> Admission {
		let mut state = self.state.lock();
		if state.shutdown {
			return Admission::ShutDown;
		}
		if limit.is_some_and(|limit| state.in_flight >= limit) {
			return Admission::Saturated;
		}
		state.in_flight += 1;
		Admission::Admitted
	}

	/// Counts a timer firing. Timers only fire before shutdown completes,
	/// so no shutdown check.
	pub(super) fn enter(&self) {
		self.state.lock().in_flight += 1;
	}

	pub(super) fn leave(&self) {
		let mut state = self.state.lock();
		state.in_flight -= 1;
		if state.terminated() {
			self.idle.notify_all();
		}
	}

	/// Returns true on the first call only.
	pub(super) fn shut_down(&self) -> bool {
		let mut state = self.state.lock();
		let first = !state.shutdown;
		state.shutdown = true;
		if state.terminated() {
			self.idle.notify_all();
		}
		first
	}

	pub(super) fn timer_stopped(&self) {
		let mut state = self.state.lock();
		state.timer_running = false;
		if state.terminated() {
			self.idle.notify_all();
		}
	}

	pub(super) fn is_shutdown(&self) -> bool {
		self.state.lock().shutdown
	}

	pub(super) fn is_terminated(&self) -> bool {
		self.state.lock().terminated()
	}

	pub(super) fn in_flight(&self) -> usize {
		self.state.lock().in_flight
	}

	pub(super) fn await_termination(&self, timeout: Duration) -> Result<bool> {
		let mut state = self.state.lock();
		interrupt::wait_until(&self.idle, &mut state, Instant::now().checked_add(timeout), |state| {
			state.terminated()
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_admission_limit() {
		let tracker = Tracker::new();
		assert!(matches!(tracker.admit(Some(1)), Admission::Admitted));
		assert!(matches!(tracker.admit(Some(1)), Admission::Saturated));
		// unlimited admission ignores the cap
		assert!(matches!(tracker.admit(None), Admission::Admitted));
		assert_eq!(tracker.in_flight(), 2);
	}

	#[test]
	fn test_terminates_after_last_job() {
		let tracker = Tracker::new();
		assert!(matches!(tracker.admit(None), Admission::Admitted));

		assert!(tracker.shut_down());
		assert!(!tracker.shut_down());
		assert!(matches!(tracker.admit(None), Admission::ShutDown));

		tracker.timer_stopped();
		assert!(!tracker.is_terminated());
		assert_eq!(tracker.await_termination(Duration::from_millis(10)), Ok(false));

		tracker.leave();
		assert!(tracker.is_terminated());
		assert_eq!(tracker.await_termination(Duration::ZERO), Ok(true));
	}
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Cooperative thread interruption.
//!
//! Each thread owns an interrupt flag. Another thread raises it through an
//! [`Interrupter`] obtained from [`current`]. Blocking waits of this crate
//! observe the flag: they clear it and fail with [`Error::Interrupted`].
//! Code that converts the interruption into another error calls
//! [`reassert`] so callers further up still see the thread as interrupted.

use std::{
	fmt::{self, Debug, Formatter},
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
	thread::{self, Thread, ThreadId},
	time::{Duration, Instant},
};

use parking_lot::{Condvar, MutexGuard};

use crate::error::{Error, Result};

/// Upper bound on how long a condvar wait goes without checking the flag.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(10);

struct Signal {
	flag: AtomicBool,
	thread: Thread,
}

thread_local! {
	static SIGNAL: Arc<Signal> = Arc::new(Signal {
		flag: AtomicBool::new(false),
		thread: thread::current(),
	});
}

/// Handle that interrupts the thread it was obtained on.
#[derive(Clone)]
pub struct Interrupter {
	signal: Arc<Signal>,
}

impl Interrupter {
	/// Raises the interrupt flag and wakes the thread if it is sleeping.
	pub fn interrupt(&self) {
		self.signal.flag.store(true, Ordering::SeqCst);
		self.signal.thread.unpark();
	}

	pub fn is_interrupted(&self) -> bool {
		self.signal.flag.load(Ordering::SeqCst)
	}

	pub fn thread_id(&self) -> ThreadId {
		self.signal.thread.id()
	}
}

impl Debug for Interrupter {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Interrupter")
			.field("thread", &self.signal.thread.id())
			.field("interrupted", &self.is_interrupted())
			.finish()
	}
}

/// Returns the interrupter of the calling thread.
pub fn current() -> Interrupter {
	SIGNAL.with(|signal| Interrupter {
		signal: signal.clone(),
	})
}

/// Whether the calling thread's flag is raised. Does not clear it.
pub fn is_interrupted() -> bool {
	SIGNAL.with(|signal| signal.flag.load(Ordering::SeqCst))
}

/// Reads and clears the calling thread's flag.
pub fn interrupted() -> bool {
	SIGNAL.with(|signal| signal.flag.swap(false, Ordering::SeqCst))
}

/// Raises the calling thread's flag again after an interruption was consumed.
pub fn reassert() {
	SIGNAL.with(|signal| signal.flag.store(true, Ordering::SeqCst));
}

/// Sleeps for `duration` unless interrupted first.
///
/// A flag that is already raised fails immediately. On interruption the
/// flag is cleared and [`Error::Interrupted`] returned.
pub fn sleep(duration: Duration) -> Result<()> {
	let deadline = Instant::now().checked_add(duration);

	loop {
		if interrupted() {
			return Err(Error::Interrupted);
		}

		match deadline {
			Some(deadline) => {
				let now = Instant::now();
				if now >= deadline {
					return Ok(());
				}
				thread::park_timeout(deadline - now);
			}
			None => thread::park(),
		}
	}
}

/// Waits on `condvar` until `done` holds, `deadline` passes, or the thread
/// is interrupted.
///
/// Returns `Ok(true)` once `done` holds and `Ok(false)` on timeout.
pub(crate) fn wait_until<T>(
	condvar: &Condvar,
	guard: &mut MutexGuard<'_, T>,
	deadline: Option<Instant>,
	mut done: impl FnMut(&mut T) -> bool,
) -> Result<bool> {
	loop {
		if done(&mut **guard) {
			return Ok(true);
		}

		if interrupted() {
			return Err(Error::Interrupted);
		}

		let slice = match deadline {
			Some(deadline) => {
				let now = Instant::now();
				if now >= deadline {
					return Ok(false);
				}
				(deadline - now).min(POLL_INTERVAL)
			}
			None => POLL_INTERVAL,
		};

		condvar.wait_for(guard, slice);
	}
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Coordinator thread for delayed and periodic work.
//!
//! Deadlines live in a min-heap owned by one thread. Due entries are handed
//! to the pool; periodic entries come back through the command channel once
//! their run finished, so runs of one schedule never overlap.

use std::{
	cmp::Ordering as CmpOrdering,
	collections::BinaryHeap,
	thread::{self, JoinHandle},
	time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use parking_lot::Mutex;
use tracing::{debug, trace};

use super::Dispatch;
use crate::{
	error::Result,
	future::Promise,
	task::{Job, Output, RecurringJob},
};

/// Cancels the wrapped promise if dropped before completion, so timer work
/// discarded anywhere along the way never leaves a caller waiting.
pub(super) struct Completion(Promise);

impl Completion {
	pub(super) fn new(promise: Promise) -> Self {
		Self(promise)
	}

	pub(super) fn complete(&self, result: Result<Output>) {
		self.0.complete(result);
	}

	pub(super) fn is_done(&self) -> bool {
		self.0.is_done()
	}
}

impl Drop for Completion {
	fn drop(&mut self) {
		self.0.cancel();
	}
}

#[derive(Debug, Clone, Copy)]
pub(super) enum Cadence {
	/// Next run at the previous deadline plus the period.
	FixedRate(Duration),
	/// Next run the given delay after the previous run finished.
	FixedDelay(Duration),
}

impl Cadence {
	fn next_deadline(self, previous: Instant) -> Instant {
		match self {
			Cadence::FixedRate(period) => previous.checked_add(period).map_or_else(far_future, |next| next.max(Instant::now())),
			Cadence::FixedDelay(delay) => deadline_after(delay),
		}
	}
}

pub(super) enum TimerKind {
	Once {
		job: Job,
		completion: Completion,
	},
	Recurring {
		job: RecurringJob,
		cadence: Cadence,
		completion: Completion,
	},
}

struct TimerEntry {
	id: u64,
	deadline: Instant,
	kind: TimerKind,
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
	fn eq(&self, other: &Self) -> bool {
		self.deadline == other.deadline && self.id == other.id
	}
}

impl Ord for TimerEntry {
	// BinaryHeap is a max-heap, reversed to pop the earliest deadline first
	fn cmp(&self, other: &Self) -> CmpOrdering {
		other.deadline.cmp(&self.deadline).then_with(|| other.id.cmp(&self.id))
	}
}

impl PartialOrd for TimerEntry {
	fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
		Some(self.cmp(other))
	}
}

pub(super) enum TimerCommand {
	Arm {
		deadline: Instant,
		kind: TimerKind,
	},
	/// Stop the coordinator. With `drain`, pending one-shot jobs are sent
	/// back instead of being dropped.
	Shutdown {
		drain: bool,
		reply: Sender<Vec<Job>>,
	},
}

/// Handle to the coordinator thread.
pub(super) struct Timer {
	command_tx: Sender<TimerCommand>,
	join_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Timer {
	/// # Panics
	///
	/// Panics if the coordinator thread cannot be spawned.
	pub(super) fn start(name: &str, capacity: usize, dispatch: Dispatch) -> Self {
		let (command_tx, command_rx) = bounded(capacity.max(1));
		let rearm_tx = command_tx.clone();

		let join_handle = thread::Builder::new()
			.name(format!("{name}-timer"))
			.spawn(move || {
				timer_loop(command_rx, rearm_tx, &dispatch);
				dispatch.timer_stopped();
			})
			.expect("failed to spawn timer coordinator thread");

		Self {
			command_tx,
			join_handle: Mutex::new(Some(join_handle)),
		}
	}

	/// Returns false if the coordinator is gone. The command is dropped,
	/// which cancels its completion.
	pub(super) fn arm(&self, deadline: Instant, kind: TimerKind) -> bool {
		self.command_tx
			.send(TimerCommand::Arm {
				deadline,
				kind,
			})
			.is_ok()
	}

	/// Stops the coordinator and waits for it to exit.
	pub(super) fn shutdown(&self, drain: bool) -> Vec<Job> {
		let (reply_tx, reply_rx) = bounded(1);

		let pending = if self
			.command_tx
			.send(TimerCommand::Shutdown {
				drain,
				reply: reply_tx,
			})
			.is_ok()
		{
			reply_rx.recv().unwrap_or_default()
		} else {
			Vec::new()
		};

		if let Some(handle) = self.join_handle.lock().take() {
			let _ = handle.join();
		}

		pending
	}
}

impl Drop for Timer {
	fn drop(&mut self) {
		let (reply_tx, _) = bounded(1);
		let _ = self.command_tx.send(TimerCommand::Shutdown {
			drain: false,
			reply: reply_tx,
		});
		// not joined, dropping must not block
	}
}

pub(super) fn deadline_after(delay: Duration) -> Instant {
	Instant::now().checked_add(delay).unwrap_or_else(far_future)
}

fn far_future() -> Instant {
	// roughly thirty years
	Instant::now() + Duration::from_secs(30 * 365 * 24 * 60 * 60)
}

fn timer_loop(command_rx: Receiver<TimerCommand>, rearm_tx: Sender<TimerCommand>, dispatch: &Dispatch) {
	let mut heap: BinaryHeap<TimerEntry> = BinaryHeap::new();
	let mut next_id = 0u64;

	loop {
		let timeout = heap.peek().map(|entry| entry.deadline.saturating_duration_since(Instant::now()));

		let command = match timeout {
			Some(Duration::ZERO) => command_rx.try_recv().ok(),
			Some(timeout) => match command_rx.recv_timeout(timeout) {
				Ok(command) => Some(command),
				Err(RecvTimeoutError::Timeout) => None,
				Err(RecvTimeoutError::Disconnected) => break,
			},
			None => match command_rx.recv() {
				Ok(command) => Some(command),
				Err(_) => break,
			},
		};

		match command {
			Some(TimerCommand::Arm {
				deadline,
				kind,
			}) => {
				next_id += 1;
				heap.push(TimerEntry {
					id: next_id,
					deadline,
					kind,
				});
			}
			Some(TimerCommand::Shutdown {
				drain,
				reply,
			}) => {
				let pending = drain_heap(heap, drain);
				debug!(returned = pending.len(), "timer coordinator stopping");
				let _ = reply.send(pending);

				// anything still queued is dropped, cancelling its completion
				while command_rx.try_recv().is_ok() {}
				return;
			}
			None => {}
		}

		let now = Instant::now();
		while heap.peek().is_some_and(|entry| entry.deadline <= now) {
			let Some(entry) = heap.pop() else {
				break;
			};
			fire(entry, dispatch, &rearm_tx);
		}
	}
}

fn fire(entry: TimerEntry, dispatch: &Dispatch, rearm_tx: &Sender<TimerCommand>) {
	match entry.kind {
		TimerKind::Once {
			job,
			completion,
		} => {
			if completion.is_done() {
				trace!(id = entry.id, "skipping cancelled timer");
				return;
			}
			dispatch.spawn_timer(job, completion);
		}
		TimerKind::Recurring {
			job,
			cadence,
			completion,
		} => {
			if completion.is_done() {
				trace!(id = entry.id, "dropping cancelled periodic timer");
				return;
			}

			let rearm_tx = rearm_tx.clone();
			let previous = entry.deadline;
			dispatch.spawn_recurring(job, completion, move |job, completion| {
				let _ = rearm_tx.send(TimerCommand::Arm {
					deadline: cadence.next_deadline(previous),
					kind: TimerKind::Recurring {
						job,
						cadence,
						completion,
					},
				});
			});
		}
	}
}

fn drain_heap(heap: BinaryHeap<TimerEntry>, keep_jobs: bool) -> Vec<Job> {
	let mut entries = heap.into_vec();
	entries.sort_by_key(|entry| (entry.deadline, entry.id));

	let mut jobs = Vec::new();
	for entry in entries {
		if let TimerKind::Once {
			job,
			completion,
		} = entry.kind
		{
			if keep_jobs && !completion.is_done() {
				jobs.push(job);
			}
		}
	}
	jobs
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	collections::HashSet,
	sync::atomic::{AtomicBool, Ordering},
	thread::{self, ThreadId},
};

use parking_lot::Mutex;
use reifydb_context::TransactionCoordinator;

/// Coordinator whose answer is flipped by the test.
#[derive(Debug, Default)]
pub struct SwitchCoordinator {
	active: AtomicBool,
}

impl SwitchCoordinator {
	pub fn new(active: bool) -> Self {
		Self {
			active: AtomicBool::new(active),
		}
	}

	pub fn set_active(&self, active: bool) {
		self.active.store(active, Ordering::SeqCst);
	}
}

impl TransactionCoordinator for SwitchCoordinator {
	fn is_transaction_active(&self) -> bool {
		self.active.load(Ordering::SeqCst)
	}
}

/// Coordinator with a transaction per thread.
#[derive(Debug, Default)]
pub struct ThreadLocalCoordinator {
	active: Mutex<HashSet<ThreadId>>,
}

impl ThreadLocalCoordinator {
	pub fn new() -> Self {
		Self::default()
	}

	/// Starts a transaction on the calling thread.
	pub fn begin(&self) {
		self.active.lock().insert(thread::current().id());
	}

	/// Ends the transaction of the calling thread.
	pub fn end(&self) {
		self.active.lock().remove(&thread::current().id());
	}
}

impl TransactionCoordinator for ThreadLocalCoordinator {
	fn is_transaction_active(&self) -> bool {
		self.active.lock().contains(&thread::current().id())
	}
}

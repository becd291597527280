// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::sync::{
	Arc,
	atomic::{AtomicBool, AtomicUsize, Ordering},
};

use tracing::debug;

use crate::{
	error::{Error, Result, SinkError},
	sink::{CancelCallback, RequestCallback, Sink},
	supplier::SinkSupplier,
};

/// Spreads values over a fixed set of sinks in turn.
///
/// The sinks are created once, up front. The cursor advances lock-free, so
/// any `n` consecutive calls to [`get`](SinkSupplier::get) return each sink
/// exactly once, starting with the first.
///
/// The supplier is itself a [`Sink`]: `next` and `error` go to the sink under
/// the cursor, `complete` reaches every sink. Completion and
/// [`dispose`](SinkSupplier::dispose) share one flag, so each sink sees a
/// single completion.
pub struct RoundRobinSinkSupplier<T> {
	sinks: Vec<Arc<dyn Sink<T>>>,
	cursor: AtomicUsize,
	completed: AtomicBool,
}

impl<T> RoundRobinSinkSupplier<T> {
	/// Creates `count` sinks by calling `factory` `count` times.
	pub fn new<F>(count: usize, factory: F) -> Result<Self>
	where
		F: Fn() -> Arc<dyn Sink<T>>,
	{
		Self::from_sinks((0..count).map(|_| factory()).collect())
	}

	pub fn from_sinks(sinks: Vec<Arc<dyn Sink<T>>>) -> Result<Self> {
		if sinks.is_empty() {
			return Err(Error::NoSinks);
		}

		Ok(Self {
			sinks,
			cursor: AtomicUsize::new(0),
			completed: AtomicBool::new(false),
		})
	}

	pub fn len(&self) -> usize {
		self.sinks.len()
	}

	pub fn is_empty(&self) -> bool {
		self.sinks.is_empty()
	}

	pub fn sinks(&self) -> &[Arc<dyn Sink<T>>] {
		&self.sinks
	}

	/// Returns the current index and moves the cursor on.
	fn advance(&self) -> usize {
		let count = self.sinks.len();
		match self.cursor.fetch_update(Ordering::AcqRel, Ordering::Acquire, |index| Some((index + 1) % count)) {
			Ok(index) | Err(index) => index,
		}
	}

	fn current(&self) -> &Arc<dyn Sink<T>> {
		&self.sinks[self.advance()]
	}

	fn complete_all(&self) -> bool {
		if self.completed.swap(true, Ordering::AcqRel) {
			return false;
		}

		for sink in &self.sinks {
			sink.complete();
		}
		true
	}
}

impl<T> SinkSupplier<T> for RoundRobinSinkSupplier<T> {
	fn get(&self) -> Arc<dyn Sink<T>> {
		self.current().clone()
	}

	fn dispose(&self) {
		if self.complete_all() {
			debug!(sinks = self.sinks.len(), "round-robin supplier disposed");
		}
	}
}

impl<T> Sink<T> for RoundRobinSinkSupplier<T> {
	fn next(&self, value: T) {
		self.current().next(value);
	}

	fn complete(&self) {
		self.complete_all();
	}

	fn error(&self, error: SinkError) {
		self.current().error(error);
	}

	fn requested_from_downstream(&self) -> u64 {
		self.sinks.iter().fold(0u64, |total, sink| total.saturating_add(sink.requested_from_downstream()))
	}

	fn on_request(&self, callback: RequestCallback) {
		for sink in &self.sinks {
			sink.on_request(callback.clone());
		}
	}

	fn on_cancel(&self, callback: CancelCallback) {
		for sink in &self.sinks {
			sink.on_cancel(callback.clone());
		}
	}
}

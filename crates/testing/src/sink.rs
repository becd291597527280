// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	sync::{
		Arc,
		atomic::{AtomicU64, Ordering},
	},
	thread::{self, ThreadId},
};

use parking_lot::Mutex;
use reifydb_sink::{CancelCallback, RequestCallback, Sink, SinkError, SinkFactory};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent<T> {
	Next(T),
	Complete,
	Error(SinkError),
}

/// Sink that records every signal it receives.
pub struct RecordingSink<T> {
	id: usize,
	events: Mutex<Vec<SinkEvent<T>>>,
	threads: Mutex<Vec<ThreadId>>,
	demand: AtomicU64,
	request_callbacks: Mutex<Vec<RequestCallback>>,
	cancel_callbacks: Mutex<Vec<CancelCallback>>,
}

impl<T: Clone + Send + 'static> RecordingSink<T> {
	pub fn new(id: usize) -> Arc<Self> {
		Arc::new(Self {
			id,
			events: Mutex::new(Vec::new()),
			threads: Mutex::new(Vec::new()),
			demand: AtomicU64::new(0),
			request_callbacks: Mutex::new(Vec::new()),
			cancel_callbacks: Mutex::new(Vec::new()),
		})
	}

	pub fn id(&self) -> usize {
		self.id
	}

	pub fn events(&self) -> Vec<SinkEvent<T>> {
		self.events.lock().clone()
	}

	pub fn values(&self) -> Vec<T> {
		self.events
			.lock()
			.iter()
			.filter_map(|event| match event {
				SinkEvent::Next(value) => Some(value.clone()),
				_ => None,
			})
			.collect()
	}

	pub fn completions(&self) -> usize {
		self.events.lock().iter().filter(|event| matches!(event, SinkEvent::Complete)).count()
	}

	pub fn errors(&self) -> Vec<SinkError> {
		self.events
			.lock()
			.iter()
			.filter_map(|event| match event {
				SinkEvent::Error(error) => Some(error.clone()),
				_ => None,
			})
			.collect()
	}

	/// Threads that delivered `next` signals, in order.
	pub fn threads(&self) -> Vec<ThreadId> {
		self.threads.lock().clone()
	}

	pub fn set_demand(&self, demand: u64) {
		self.demand.store(demand, Ordering::SeqCst);
	}

	/// Simulates downstream requesting `n` more items.
	pub fn request(&self, n: u64) {
		self.demand.fetch_add(n, Ordering::SeqCst);
		let callbacks = self.request_callbacks.lock().clone();
		for callback in callbacks {
			callback(n);
		}
	}

	/// Simulates downstream cancelling.
	pub fn cancel(&self) {
		let callbacks = self.cancel_callbacks.lock().clone();
		for callback in callbacks {
			callback();
		}
	}
}

impl<T: Clone + Send + 'static> Sink<T> for RecordingSink<T> {
	fn next(&self, value: T) {
		self.threads.lock().push(thread::current().id());
		self.events.lock().push(SinkEvent::Next(value));
	}

	fn complete(&self) {
		self.events.lock().push(SinkEvent::Complete);
	}

	fn error(&self, error: SinkError) {
		self.events.lock().push(SinkEvent::Error(error));
	}

	fn requested_from_downstream(&self) -> u64 {
		self.demand.load(Ordering::SeqCst)
	}

	fn on_request(&self, callback: RequestCallback) {
		self.request_callbacks.lock().push(callback);
	}

	fn on_cancel(&self, callback: CancelCallback) {
		self.cancel_callbacks.lock().push(callback);
	}
}

/// Factory of [`RecordingSink`]s that keeps every sink it created.
pub struct SinkRecorder<T> {
	sinks: Mutex<Vec<Arc<RecordingSink<T>>>>,
}

impl<T: Clone + Send + 'static> SinkRecorder<T> {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			sinks: Mutex::new(Vec::new()),
		})
	}

	pub fn create(&self) -> Arc<RecordingSink<T>> {
		let mut sinks = self.sinks.lock();
		let sink = RecordingSink::new(sinks.len());
		sinks.push(sink.clone());
		sink
	}

	pub fn factory(self: &Arc<Self>) -> SinkFactory<T> {
		let recorder = self.clone();
		Arc::new(move || recorder.create() as Arc<dyn Sink<T>>)
	}

	pub fn sinks(&self) -> Vec<Arc<RecordingSink<T>>> {
		self.sinks.lock().clone()
	}

	pub fn created(&self) -> usize {
		self.sinks.lock().len()
	}

	/// # Panics
	///
	/// Panics if fewer than `id + 1` sinks were created.
	pub fn sink(&self, id: usize) -> Arc<RecordingSink<T>> {
		self.sinks.lock()[id].clone()
	}
}

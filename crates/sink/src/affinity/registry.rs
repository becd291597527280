// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	sync::{
		Arc,
		atomic::{AtomicU64, Ordering},
	},
	thread::ThreadId,
	time::{Duration, Instant},
};

use dashmap::{DashMap, mapref::entry::Entry};
use parking_lot::Mutex;
use tracing::debug;

use crate::{sink::Sink, supplier::SinkFactory};

struct Slot<T> {
	sink: Arc<dyn Sink<T>>,
	last_used: Mutex<Instant>,
}

impl<T> Slot<T> {
	fn touch(&self) {
		*self.last_used.lock() = Instant::now();
	}

	fn idle_for(&self) -> Duration {
		self.last_used.lock().elapsed()
	}
}

/// Per-thread sinks, created on first use.
///
/// Every removal completes the removed sink, once.
pub struct ThreadRegistry<T> {
	id: u64,
	slots: DashMap<ThreadId, Slot<T>>,
	factory: SinkFactory<T>,
}

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

impl<T> ThreadRegistry<T> {
	pub fn new(factory: SinkFactory<T>) -> Self {
		Self {
			id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
			slots: DashMap::new(),
			factory,
		}
	}

	/// Process-unique, never reused.
	pub fn id(&self) -> u64 {
		self.id
	}

	/// Returns the sink of `thread`, creating it if needed. The flag tells
	/// whether it was created by this call.
	pub fn get_or_create(&self, thread: ThreadId) -> (Arc<dyn Sink<T>>, bool) {
		match self.slots.entry(thread) {
			Entry::Occupied(occupied) => {
				let slot = occupied.get();
				slot.touch();
				(slot.sink.clone(), false)
			}
			Entry::Vacant(vacant) => {
				let sink = (self.factory)();
				vacant.insert(Slot {
					sink: sink.clone(),
					last_used: Mutex::new(Instant::now()),
				});
				(sink, true)
			}
		}
	}

	pub fn contains(&self, thread: ThreadId) -> bool {
		self.slots.contains_key(&thread)
	}

	pub fn len(&self) -> usize {
		self.slots.len()
	}

	pub fn is_empty(&self) -> bool {
		self.slots.is_empty()
	}

	/// Removes and completes the sink of `thread`.
	pub fn evict(&self, thread: ThreadId) -> bool {
		match self.slots.remove(&thread) {
			Some((_, slot)) => {
				debug!(?thread, "evicting thread sink");
				slot.sink.complete();
				true
			}
			None => false,
		}
	}

	/// Removes and completes every sink unused for at least `ttl`.
	pub fn evict_idle(&self, ttl: Duration) -> usize {
		let idle: Vec<ThreadId> =
			self.slots.iter().filter(|slot| slot.value().idle_for() >= ttl).map(|slot| *slot.key()).collect();

		let mut evicted = 0;
		for thread in idle {
			// a lookup in between refreshed the slot
			if let Some((_, slot)) = self.slots.remove_if(&thread, |_, slot| slot.idle_for() >= ttl) {
				slot.sink.complete();
				evicted += 1;
			}
		}

		if evicted > 0 {
			debug!(evicted, ?ttl, "evicted idle thread sinks");
		}
		evicted
	}

	/// Removes and completes every sink.
	pub fn evict_all(&self) -> usize {
		let threads: Vec<ThreadId> = self.slots.iter().map(|slot| *slot.key()).collect();
		threads.into_iter().filter(|thread| self.evict(*thread)).count()
	}
}

#[cfg(test)]
mod tests {
	use std::{
		sync::atomic::{AtomicUsize, Ordering},
		thread,
	};

	use super::*;
	use crate::error::SinkError;

	#[derive(Default)]
	struct CompletionCounter {
		completions: AtomicUsize,
	}

	impl Sink<u8> for CompletionCounter {
		fn next(&self, _value: u8) {}

		fn complete(&self) {
			self.completions.fetch_add(1, Ordering::SeqCst);
		}

		fn error(&self, _error: SinkError) {}

		fn requested_from_downstream(&self) -> u64 {
			0
		}
	}

	fn registry() -> (ThreadRegistry<u8>, Arc<Mutex<Vec<Arc<CompletionCounter>>>>) {
		let created = Arc::new(Mutex::new(Vec::new()));
		let sinks = created.clone();
		let registry = ThreadRegistry::new(Arc::new(move || {
			let sink = Arc::new(CompletionCounter::default());
			sinks.lock().push(sink.clone());
			sink as Arc<dyn Sink<u8>>
		}));
		(registry, created)
	}

	#[test]
	fn test_get_or_create_once_per_thread() {
		let (registry, created) = registry();
		let me = thread::current().id();

		let (first, created_first) = registry.get_or_create(me);
		let (second, created_second) = registry.get_or_create(me);
		assert!(created_first);
		assert!(!created_second);
		assert!(Arc::ptr_eq(&first, &second));

		let other = thread::spawn(|| thread::current().id()).join().unwrap();
		let (third, _) = registry.get_or_create(other);
		assert!(!Arc::ptr_eq(&first, &third));
		assert_eq!(created.lock().len(), 2);
	}

	#[test]
	fn test_evict_completes_once() {
		let (registry, created) = registry();
		let me = thread::current().id();
		registry.get_or_create(me);

		assert!(registry.evict(me));
		assert!(!registry.evict(me));
		assert_eq!(created.lock()[0].completions.load(Ordering::SeqCst), 1);
		assert!(registry.is_empty());
	}

	#[test]
	fn test_evict_idle_spares_recent() {
		let (registry, created) = registry();
		let me = thread::current().id();
		registry.get_or_create(me);

		assert_eq!(registry.evict_idle(Duration::from_secs(60)), 0);
		assert!(registry.contains(me));

		thread::sleep(Duration::from_millis(20));
		assert_eq!(registry.evict_idle(Duration::from_millis(10)), 1);
		assert!(!registry.contains(me));
		assert_eq!(created.lock()[0].completions.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn test_evict_all() {
		let (registry, created) = registry();
		registry.get_or_create(thread::current().id());
		registry.get_or_create(thread::spawn(|| thread::current().id()).join().unwrap());

		assert_eq!(registry.evict_all(), 2);
		assert_eq!(registry.evict_all(), 0);
		assert!(created.lock().iter().all(|sink| sink.completions.load(Ordering::SeqCst) == 1));
	}
}

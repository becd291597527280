// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Per-thread sinks inside transactions

use std::{
	sync::{Arc, Barrier},
	thread,
	time::Duration,
};

use reifydb_context::{Context, NoTransactions, TransactionCoordinator, push_scope};
use reifydb_scheduler::{Error, PoolConfig, PoolScheduler, Scheduler, TaskError};
use reifydb_sink::{RoundRobinSinkSupplier, SinkSupplier, SweepConfig, ThreadAffineSinkSupplier};
use reifydb_testing::{SinkRecorder, ThreadLocalCoordinator, init_tracing, util::wait::wait_for};

struct Fixture {
	supplier: Arc<ThreadAffineSinkSupplier<u32>>,
	shared: Arc<SinkRecorder<u32>>,
	pinned: Arc<SinkRecorder<u32>>,
}

fn fixture(coordinator: Arc<dyn TransactionCoordinator>) -> Fixture {
	let shared = SinkRecorder::new();
	let factory = shared.factory();
	let delegate = Arc::new(RoundRobinSinkSupplier::new(2, || factory()).unwrap());

	let pinned = SinkRecorder::new();
	let supplier = Arc::new(ThreadAffineSinkSupplier::new(delegate, pinned.factory(), coordinator));

	Fixture {
		supplier,
		shared,
		pinned,
	}
}

#[test]
fn test_outside_transaction_uses_delegate() {
	init_tracing();
	let f = fixture(Arc::new(ThreadLocalCoordinator::new()));

	for value in 0..4 {
		f.supplier.get().next(value);
	}

	assert_eq!(f.shared.sink(0).values(), vec![0, 2]);
	assert_eq!(f.shared.sink(1).values(), vec![1, 3]);
	assert_eq!(f.pinned.created(), 0);
	assert!(f.supplier.registry().is_empty());
}

#[test]
fn test_transaction_pins_thread_to_one_sink() {
	let coordinator = Arc::new(ThreadLocalCoordinator::new());
	let f = fixture(coordinator.clone());

	coordinator.begin();
	for value in 0..5 {
		f.supplier.get().next(value);
	}
	coordinator.end();
	f.supplier.get().next(99);

	assert_eq!(f.pinned.created(), 1);
	assert_eq!(f.pinned.sink(0).values(), vec![0, 1, 2, 3, 4]);
	assert_eq!(f.shared.sink(0).values(), vec![99]);
	assert!(f.supplier.registry().contains(thread::current().id()));
}

#[test]
fn test_threads_get_distinct_sinks() {
	let coordinator = Arc::new(ThreadLocalCoordinator::new());
	let f = fixture(coordinator.clone());
	let pinned = Arc::new(Barrier::new(4));
	let release = Arc::new(Barrier::new(4));

	let workers: Vec<_> = (0..3u32)
		.map(|worker| {
			let supplier = f.supplier.clone();
			let coordinator = coordinator.clone();
			let pinned = pinned.clone();
			let release = release.clone();
			thread::spawn(move || {
				coordinator.begin();
				for step in 0..3 {
					supplier.get().next(worker * 10 + step);
				}
				pinned.wait();
				release.wait();
			})
		})
		.collect();

	pinned.wait();
	assert_eq!(f.supplier.registry().len(), 3);
	release.wait();
	for worker in workers {
		worker.join().unwrap();
	}

	let mut per_sink: Vec<Vec<u32>> = f.pinned.sinks().iter().map(|sink| sink.values()).collect();
	per_sink.sort();
	assert_eq!(per_sink, vec![vec![0, 1, 2], vec![10, 11, 12], vec![20, 21, 22]]);

	// every sink saw a single thread
	assert!(f.pinned.sinks().iter().all(|sink| sink.threads().windows(2).all(|pair| pair[0] == pair[1])));
}

#[test]
fn test_scope_in_context_pins_without_transaction() {
	let f = fixture(Arc::new(NoTransactions));
	let ctx = push_scope(&Context::empty(), "upstream");

	f.supplier.get_with(&ctx).next(1);
	f.supplier.get_with(&ctx).next(2);
	f.supplier.get_with(&Context::empty()).next(3);

	assert_eq!(f.pinned.created(), 1);
	assert_eq!(f.pinned.sink(0).values(), vec![1, 2]);
	assert_eq!(f.shared.sink(0).values(), vec![3]);
}

#[test]
fn test_thread_exit_completes_sink() {
	let coordinator = Arc::new(ThreadLocalCoordinator::new());
	let f = fixture(coordinator.clone());

	let worker = {
		let supplier = f.supplier.clone();
		let coordinator = coordinator.clone();
		thread::spawn(move || {
			coordinator.begin();
			supplier.get().next(5);
			coordinator.end();
		})
	};
	worker.join().unwrap();

	wait_for(|| f.supplier.registry().is_empty(), "exited thread evicted");
	assert_eq!(f.pinned.sink(0).completions(), 1);
}

#[test]
fn test_explicit_eviction() {
	let coordinator = Arc::new(ThreadLocalCoordinator::new());
	let f = fixture(coordinator.clone());
	let me = thread::current().id();

	coordinator.begin();
	f.supplier.get().next(1);
	assert!(f.supplier.evict(me));
	assert!(!f.supplier.evict(me));

	// a fresh sink replaces the evicted one
	f.supplier.get().next(2);
	coordinator.end();

	assert_eq!(f.pinned.created(), 2);
	assert_eq!(f.pinned.sink(0).completions(), 1);
	assert_eq!(f.pinned.sink(1).values(), vec![2]);
}

#[test]
fn test_evict_idle() {
	let coordinator = Arc::new(ThreadLocalCoordinator::new());
	let f = fixture(coordinator.clone());

	coordinator.begin();
	f.supplier.get().next(1);
	coordinator.end();

	assert_eq!(f.supplier.evict_idle(Duration::from_secs(60)), 0);
	thread::sleep(Duration::from_millis(20));
	assert_eq!(f.supplier.evict_idle(Duration::from_millis(10)), 1);
	assert_eq!(f.pinned.sink(0).completions(), 1);
}

#[test]
fn test_dispose_completes_everything_once() {
	let coordinator = Arc::new(ThreadLocalCoordinator::new());
	let f = fixture(coordinator.clone());

	coordinator.begin();
	f.supplier.get().next(1);

	f.supplier.dispose();
	f.supplier.dispose();

	assert!(f.supplier.registry().is_empty());
	assert_eq!(f.pinned.sink(0).completions(), 1);
	assert!(f.shared.sinks().iter().all(|sink| sink.completions() == 1));

	// a disposed supplier no longer pins
	f.supplier.get().next(2);
	coordinator.end();
	assert_eq!(f.pinned.created(), 1);
	assert_eq!(f.shared.sink(0).values(), vec![2]);
}

#[test]
fn test_sweep_evicts_idle_sinks() {
	let pool = PoolScheduler::with_config(&PoolConfig::new().threads(1).thread_name("sweep"));
	let coordinator = Arc::new(ThreadLocalCoordinator::new());
	let f = fixture(coordinator.clone());

	let config = SweepConfig::new().idle_ttl(Duration::from_millis(10)).interval(Duration::from_millis(5));
	let sweep = f.supplier.schedule_sweep(&pool, &config).unwrap();

	coordinator.begin();
	f.supplier.get().next(1);
	coordinator.end();

	wait_for(|| f.supplier.registry().is_empty(), "idle sink swept");
	assert_eq!(f.pinned.sink(0).completions(), 1);

	assert!(sweep.cancel());
	pool.shutdown();
	assert!(pool.await_termination(Duration::from_secs(5)).unwrap());
}

#[test]
fn test_sweep_ends_with_supplier() {
	let pool = PoolScheduler::with_config(&PoolConfig::new().threads(1).thread_name("sweep-drop"));
	let f = fixture(Arc::new(NoTransactions));

	let config = SweepConfig::new().interval(Duration::from_millis(5));
	let sweep = f.supplier.schedule_sweep(&pool, &config).unwrap();
	drop(f);

	wait_for(|| sweep.is_done(), "sweep stopped after supplier dropped");
	assert_eq!(sweep.get().err(), Some(Error::Task(TaskError::failed("thread registry dropped"))));
	pool.shutdown();
}

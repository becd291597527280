// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Inline-or-delegate routing of the conditional dispatcher

use std::{
	sync::{
		Arc,
		atomic::{AtomicBool, AtomicUsize, Ordering},
	},
	thread,
	time::{Duration, Instant},
};

use reifydb_scheduler::{
	ConditionalDispatcher, PoolConfig, PoolScheduler, Scheduler, SchedulerExt, interrupt,
	task::{job, recurring},
};
use reifydb_testing::{ScriptedScheduler, SwitchCoordinator, init_tracing};

fn pool() -> Arc<PoolScheduler> {
	Arc::new(PoolScheduler::with_config(&PoolConfig::new().threads(2).thread_name("conditional-test")))
}

#[test]
fn test_predicate_true_runs_inline() {
	init_tracing();
	let delegate = Arc::new(ScriptedScheduler::accepting());
	let dispatcher = ConditionalDispatcher::new(delegate.clone(), |_| true);
	let caller = thread::current().id();

	let handle = dispatcher.spawn(move || thread::current().id() == caller).unwrap();
	assert!(handle.is_done());
	assert_eq!(handle.get(), Ok(true));

	dispatcher.run(|| {}).unwrap();
	assert_eq!(dispatcher.invoke_all(vec![job(|| 1), job(|| 2)]).unwrap().len(), 2);
	assert_eq!(*dispatcher.invoke_any(vec![job(|| 3u8)]).unwrap().downcast::<u8>().unwrap(), 3);

	// nothing reached the delegate
	assert_eq!(delegate.offers(), 0);
}

#[test]
fn test_predicate_false_forwards() {
	let delegate = pool();
	let dispatcher = ConditionalDispatcher::new(delegate.clone(), |_| false);
	let caller = thread::current().id();

	let on_pool = dispatcher.spawn(move || thread::current().id() != caller).unwrap();
	assert_eq!(on_pool.get(), Ok(true));
}

#[test]
fn test_predicate_evaluated_on_every_call() {
	let delegate = Arc::new(ScriptedScheduler::accepting());
	let inline = Arc::new(AtomicBool::new(true));
	let calls = Arc::new(AtomicUsize::new(0));

	let dispatcher = {
		let inline = inline.clone();
		let calls = calls.clone();
		ConditionalDispatcher::new(delegate.clone(), move |_| {
			calls.fetch_add(1, Ordering::SeqCst);
			inline.load(Ordering::SeqCst)
		})
	};

	dispatcher.run(|| {}).unwrap();
	assert_eq!(delegate.offers(), 0);

	inline.store(false, Ordering::SeqCst);
	dispatcher.run(|| {}).unwrap();
	assert_eq!(delegate.offers(), 1);

	inline.store(true, Ordering::SeqCst);
	dispatcher.run(|| {}).unwrap();
	assert_eq!(delegate.offers(), 1);
	assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_predicate_receives_delegate() {
	let delegate = Arc::new(ScriptedScheduler::accepting().with_name("io"));
	let dispatcher = ConditionalDispatcher::new(delegate, |scheduler| scheduler.name() == "io");
	dispatcher.run(|| {}).unwrap();
	assert_eq!(dispatcher.name(), "conditional(io)");
	assert_eq!(dispatcher.delegate().name(), "io");
}

#[test]
fn test_inline_schedule_blocks_caller() {
	let dispatcher = ConditionalDispatcher::new(pool(), |_| true);
	let start = Instant::now();

	let handle = dispatcher.spawn_after(Duration::from_millis(25), || "late").unwrap();
	assert!(start.elapsed() >= Duration::from_millis(25));
	assert!(handle.is_done());
	assert_eq!(handle.get(), Ok("late"));
}

#[test]
fn test_inline_schedule_interrupted() {
	let dispatcher = ConditionalDispatcher::new(pool(), |_| true);

	interrupt::reassert();
	let future = dispatcher.schedule(job(|| ()), Duration::from_secs(10)).unwrap();
	assert!(future.is_interrupted());
	assert!(interrupt::interrupted());
}

#[test]
fn test_periodic_rejected_while_inline() {
	let delegate = Arc::new(ScriptedScheduler::accepting());
	let dispatcher = ConditionalDispatcher::new(delegate.clone(), |_| true);

	let err = dispatcher.every(Duration::from_millis(5), || {}).unwrap_err();
	assert!(err.is_rejection());
	assert!(err.to_string().contains("cannot schedule recurring work while inline dispatch is active"));

	let err = dispatcher
		.schedule_with_fixed_delay(recurring(|| {}), Duration::ZERO, Duration::from_millis(5))
		.unwrap_err();
	assert!(err.is_rejection());
	assert_eq!(delegate.offers(), 0);
}

#[test]
fn test_periodic_forwarded_when_not_inline() {
	let dispatcher = ConditionalDispatcher::new(pool(), |_| false);
	let runs = Arc::new(AtomicUsize::new(0));
	let counter = runs.clone();

	let future = dispatcher
		.every(Duration::from_millis(5), move || {
			counter.fetch_add(1, Ordering::SeqCst);
		})
		.unwrap();

	reifydb_testing::util::wait::wait_for(|| runs.load(Ordering::SeqCst) >= 2, "periodic runs on delegate");
	assert!(future.cancel());
}

#[test]
fn test_shutdown_closes_inline_path() {
	let delegate = Arc::new(ScriptedScheduler::accepting());
	let dispatcher = ConditionalDispatcher::new(delegate.clone(), |_| true);

	dispatcher.shutdown();

	assert!(delegate.is_shutdown());
	assert!(dispatcher.is_shutdown());
	let err = dispatcher.spawn(|| ()).unwrap_err();
	assert!(err.is_rejection());
}

#[test]
fn test_lifecycle_is_conjunction() {
	let delegate = pool();
	let dispatcher = ConditionalDispatcher::new(delegate.clone(), |_| false);

	// the delegate alone shutting down is not enough
	delegate.shutdown();
	assert!(delegate.is_terminated());
	assert!(!dispatcher.is_shutdown());
	assert!(!dispatcher.is_terminated());

	// an open inline path waits out the timeout
	let start = Instant::now();
	assert_eq!(dispatcher.await_termination(Duration::from_millis(30)), Ok(false));
	assert!(start.elapsed() >= Duration::from_millis(30));

	dispatcher.shutdown();
	assert!(dispatcher.is_shutdown());
	assert!(dispatcher.is_terminated());
	assert_eq!(dispatcher.await_termination(Duration::from_secs(1)), Ok(true));
}

#[test]
fn test_await_termination_sees_later_shutdown() {
	let delegate = pool();
	let dispatcher = Arc::new(ConditionalDispatcher::new(delegate, |_| false));

	let closer = {
		let dispatcher = dispatcher.clone();
		thread::spawn(move || {
			thread::sleep(Duration::from_millis(30));
			dispatcher.shutdown();
		})
	};

	let start = Instant::now();
	assert_eq!(dispatcher.await_termination(Duration::from_secs(5)), Ok(true));
	assert!(start.elapsed() < Duration::from_secs(5));
	closer.join().unwrap();
}

#[test]
fn test_transaction_coordinator_routing() {
	let coordinator = Arc::new(SwitchCoordinator::new(false));
	let delegate = Arc::new(ScriptedScheduler::accepting());
	let dispatcher = ConditionalDispatcher::when_transaction_active(delegate.clone(), coordinator.clone());

	dispatcher.run(|| {}).unwrap();
	assert_eq!(delegate.offers(), 1);

	coordinator.set_active(true);
	dispatcher.run(|| {}).unwrap();
	assert_eq!(delegate.offers(), 1);
}

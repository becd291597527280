// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! [`Scheduler`] adapter over a rayon thread pool.

mod timer;
mod tracker;

use std::{
	fmt::{self, Debug, Formatter},
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
	time::Duration,
};

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, trace, warn};

use self::{
	timer::{Cadence, Completion, Timer, TimerKind, deadline_after},
	tracker::{Admission, Tracker},
};
use crate::{
	config::PoolConfig,
	error::{Error, Result},
	future::{Promise, TaskFuture},
	scheduler::Scheduler,
	task::{self, Job, RecurringJob},
};

/// Runs work on a rayon [`ThreadPool`] with admission control.
///
/// At most `max_in_flight` submitted jobs are queued or running at once;
/// further `submit`/`execute` calls are rejected. Delayed and periodic work
/// waits on a timer coordinator thread and then runs on the pool without
/// counting against the limit.
///
/// Panics inside jobs are caught and reported through the job's future.
#[derive(Clone)]
pub struct PoolScheduler {
	inner: Arc<Inner>,
}

struct Inner {
	dispatch: Dispatch,
	max_in_flight: usize,
	timer: Timer,
}

/// Everything a pool thread needs to run a job and account for it.
#[derive(Clone)]
pub(super) struct Dispatch {
	name: Arc<str>,
	pool: Arc<ThreadPool>,
	tracker: Arc<Tracker>,
	/// Set by `shutdown_now`: queued jobs are skipped instead of run.
	halted: Arc<AtomicBool>,
}

impl PoolScheduler {
	/// Adapts an existing pool.
	///
	/// # Panics
	///
	/// Panics if the timer coordinator thread cannot be spawned.
	pub fn new(pool: Arc<ThreadPool>, config: &PoolConfig) -> Self {
		let dispatch = Dispatch {
			name: Arc::from(config.thread_name.as_str()),
			pool,
			tracker: Arc::new(Tracker::new()),
			halted: Arc::new(AtomicBool::new(false)),
		};
		let timer = Timer::start(&config.thread_name, config.timer_capacity, dispatch.clone());

		debug!(scheduler = %config.thread_name, max_in_flight = config.max_in_flight, "pool scheduler started");

		Self {
			inner: Arc::new(Inner {
				dispatch,
				max_in_flight: config.max_in_flight,
				timer,
			}),
		}
	}

	/// Builds a dedicated pool of `config.threads` workers.
	///
	/// # Panics
	///
	/// Panics if the rayon thread pool fails to build.
	pub fn with_config(config: &PoolConfig) -> Self {
		let prefix = config.thread_name.clone();
		let pool = ThreadPoolBuilder::new()
			.num_threads(config.threads)
			.thread_name(move |i| format!("{prefix}-{i}"))
			.build()
			.expect("failed to build rayon pool");

		Self::new(Arc::new(pool), config)
	}

	pub fn pool(&self) -> &Arc<ThreadPool> {
		&self.inner.dispatch.pool
	}

	/// Jobs queued or running, timer firings included.
	pub fn in_flight(&self) -> usize {
		self.inner.dispatch.tracker.in_flight()
	}

	fn admit(&self) -> Result<()> {
		match self.inner.dispatch.tracker.admit(Some(self.inner.max_in_flight)) {
			Admission::Admitted => Ok(()),
			Admission::ShutDown => Err(Error::rejected(self.name(), "scheduler is shut down")),
			Admission::Saturated => {
				trace!(scheduler = self.name(), limit = self.inner.max_in_flight, "admission limit reached");
				Err(Error::rejected(
					self.name(),
					format!("{} tasks already in flight", self.inner.max_in_flight),
				))
			}
		}
	}

	fn arm(&self, delay: Duration, kind: impl FnOnce(Completion) -> TimerKind) -> Result<TaskFuture> {
		if self.inner.dispatch.tracker.is_shutdown() {
			return Err(Error::rejected(self.name(), "scheduler is shut down"));
		}

		let promise = Promise::new();
		if !self.inner.timer.arm(deadline_after(delay), kind(Completion::new(promise.clone()))) {
			return Err(Error::rejected(self.name(), "timer coordinator has stopped"));
		}
		Ok(TaskFuture::pending(promise))
	}

	fn arm_recurring(
		&self,
		job: RecurringJob,
		initial_delay: Duration,
		cadence: Cadence,
		interval: Duration,
	) -> Result<TaskFuture> {
		if interval.is_zero() {
			return Err(Error::rejected(self.name(), "periodic interval must be greater than zero"));
		}

		self.arm(initial_delay, |completion| TimerKind::Recurring {
			job,
			cadence,
			completion,
		})
	}
}

impl Scheduler for PoolScheduler {
	fn name(&self) -> &str {
		&self.inner.dispatch.name
	}

	fn submit(&self, job: Job) -> Result<TaskFuture> {
		self.admit()?;
		let promise = Promise::new();
		self.inner.dispatch.spawn(job, Some(Completion::new(promise.clone())));
		Ok(TaskFuture::pending(promise))
	}

	fn execute(&self, job: Job) -> Result<()> {
		self.admit()?;
		self.inner.dispatch.spawn(job, None);
		Ok(())
	}

	fn schedule(&self, job: Job, delay: Duration) -> Result<TaskFuture> {
		self.arm(delay, |completion| TimerKind::Once {
			job,
			completion,
		})
	}

	fn schedule_at_fixed_rate(&self, job: RecurringJob, initial_delay: Duration, period: Duration)
	-> Result<TaskFuture> {
		self.arm_recurring(job, initial_delay, Cadence::FixedRate(period), period)
	}

	fn schedule_with_fixed_delay(&self, job: RecurringJob, initial_delay: Duration, delay: Duration)
	-> Result<TaskFuture> {
		self.arm_recurring(job, initial_delay, Cadence::FixedDelay(delay), delay)
	}

	fn shutdown(&self) {
		if self.inner.dispatch.tracker.shut_down() {
			debug!(scheduler = self.name(), "shutting down");
			self.inner.timer.shutdown(false);
		}
	}

	fn shutdown_now(&self) -> Vec<Job> {
		self.inner.dispatch.halted.store(true, Ordering::Release);
		if !self.inner.dispatch.tracker.shut_down() {
			return Vec::new();
		}

		let pending = self.inner.timer.shutdown(true);
		debug!(scheduler = self.name(), returned = pending.len(), "shut down now");
		pending
	}

	fn is_shutdown(&self) -> bool {
		self.inner.dispatch.tracker.is_shutdown()
	}

	fn is_terminated(&self) -> bool {
		self.inner.dispatch.tracker.is_terminated()
	}

	fn await_termination(&self, timeout: Duration) -> Result<bool> {
		self.inner.dispatch.tracker.await_termination(timeout)
	}
}

impl Debug for PoolScheduler {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("PoolScheduler")
			.field("name", &self.name())
			.field("threads", &self.inner.dispatch.pool.current_num_threads())
			.field("max_in_flight", &self.inner.max_in_flight)
			.field("in_flight", &self.in_flight())
			.finish()
	}
}

impl Dispatch {
	/// Runs an admitted job. Without a completion, failures are logged.
	fn spawn(&self, job: Job, completion: Option<Completion>) {
		let this = self.clone();
		self.pool.spawn(move || {
			this.run(job, completion);
			this.tracker.leave();
		});
	}

	/// Runs a due one-shot timer.
	fn spawn_timer(&self, job: Job, completion: Completion) {
		self.tracker.enter();
		self.spawn(job, Some(completion));
	}

	/// Runs one firing of a periodic timer. `rearm` is called after a
	/// successful run; a failing run completes the schedule with its error.
	fn spawn_recurring<F>(&self, job: RecurringJob, completion: Completion, rearm: F)
	where
		F: FnOnce(RecurringJob, Completion) + Send + 'static,
	{
		self.tracker.enter();
		let this = self.clone();
		self.pool.spawn(move || {
			if !this.halted.load(Ordering::Acquire) && !completion.is_done() {
				match task::run_recurring(&job) {
					Ok(()) => rearm(job, completion),
					Err(err) => {
						debug!(scheduler = %this.name, %err, "periodic task failed, cancelling schedule");
						completion.complete(Err(Error::Task(err)));
					}
				}
			}
			this.tracker.leave();
		});
	}

	fn run(&self, job: Job, completion: Option<Completion>) {
		if self.halted.load(Ordering::Acquire) {
			trace!(scheduler = %self.name, "skipping queued task after shutdown_now");
			return;
		}

		if completion.as_ref().is_some_and(Completion::is_done) {
			trace!(scheduler = %self.name, "skipping cancelled task");
			return;
		}

		let result = task::run(job);
		match completion {
			Some(completion) => completion.complete(result.map_err(Error::Task)),
			None => {
				if let Err(err) = result {
					warn!(scheduler = %self.name, %err, "task failed");
				}
			}
		}
	}

	fn timer_stopped(&self) {
		self.tracker.timer_stopped();
	}
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Task dispatch and scheduling.
//!
//! A [`Scheduler`] runs work now, later, or periodically. The executors are
//! [`ImmediateScheduler`], which runs everything on the calling thread, and
//! [`PoolScheduler`], which adapts a rayon pool. Decorators layer behavior on
//! top of any scheduler:
//!
//! - [`ConditionalDispatcher`] runs work inline while a predicate holds,
//! - [`RejectionRetryDispatcher`] retries rejected work in the background,
//! - [`BlockingRetryDispatcher`] retries rejected work on the calling thread.
//!
//! [`DispatchBuilder`] assembles such a chain.

mod builder;
mod conditional;
pub mod config;
mod error;
mod future;
mod immediate;
pub mod interrupt;
mod pool;
mod retry;
mod scheduler;
pub mod task;

pub use builder::DispatchBuilder;
pub use conditional::{ConditionalDispatcher, DispatchPredicate};
pub use config::{PoolConfig, RetryConfig};
pub use error::{Error, Result, TaskError};
pub use future::{JobHandle, Outcome, SynchronousFuture, TaskFuture};
pub use immediate::ImmediateScheduler;
pub use pool::PoolScheduler;
pub use retry::{BlockingRetryDispatcher, Hook, RejectionRetryDispatcher, RetryHooks};
pub use scheduler::{Scheduler, SchedulerExt};
pub use task::{Job, Output, RecurringJob, TaskResult};

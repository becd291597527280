// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Test doubles for the dispatch and sink crates.

mod coordinator;
mod logging;
mod scheduler;
mod sink;
pub mod util;

pub use coordinator::{SwitchCoordinator, ThreadLocalCoordinator};
pub use logging::init_tracing;
pub use scheduler::ScriptedScheduler;
pub use sink::{RecordingSink, SinkEvent, SinkRecorder};

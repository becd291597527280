// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Sink suppliers for fanning values out to parallel consumers.

mod affinity;
pub mod config;
mod error;
mod round_robin;
mod sink;
mod supplier;

pub use affinity::{ThreadAffineSinkSupplier, ThreadRegistry};
pub use config::SweepConfig;
pub use error::{Error, Result, SinkError};
pub use round_robin::RoundRobinSinkSupplier;
pub use sink::{CancelCallback, RequestCallback, Sink};
pub use supplier::{SinkFactory, SinkSupplier};

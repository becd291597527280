// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::sync::Arc;

use crate::error::SinkError;

/// Called with the number of items downstream requested.
pub type RequestCallback = Arc<dyn Fn(u64) + Send + Sync>;

/// Called when downstream cancels.
pub type CancelCallback = Arc<dyn Fn() + Send + Sync>;

/// Push side of a reactive stream.
///
/// `complete` and `error` are terminal. Implementations decide how to treat
/// signals after a terminal one; the suppliers of this crate never send
/// more than one terminal signal to a sink they created.
pub trait Sink<T>: Send + Sync {
	fn next(&self, value: T);

	fn complete(&self);

	fn error(&self, error: SinkError);

	/// Outstanding demand signalled by downstream.
	fn requested_from_downstream(&self) -> u64;

	fn on_request(&self, _callback: RequestCallback) {}

	fn on_cancel(&self, _callback: CancelCallback) {}
}

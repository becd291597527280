// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::sync::Arc;

use reifydb_context::Context;

use crate::sink::Sink;

/// Creates a fresh sink each time it is called.
pub type SinkFactory<T> = Arc<dyn Fn() -> Arc<dyn Sink<T>> + Send + Sync>;

/// Hands out the sink a producer should push its next value into.
pub trait SinkSupplier<T>: Send + Sync {
	fn get(&self) -> Arc<dyn Sink<T>>;

	/// Like [`get`](Self::get), with the reactive call context of the caller
	/// available for the decision.
	fn get_with(&self, _ctx: &Context) -> Arc<dyn Sink<T>> {
		self.get()
	}

	/// Completes the sinks owned by this supplier. Idempotent.
	fn dispose(&self);
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use crate::{context::Context, scope};

/// Answers whether work is running inside a transaction.
///
/// Implemented by the transaction subsystem; this layer only consumes it.
pub trait TransactionCoordinator: Send + Sync {
	/// Whether a transaction is active on the calling thread.
	fn is_transaction_active(&self) -> bool;

	/// Whether a transaction is active for the chain carrying `ctx`.
	///
	/// A non-empty scope stack forces the answer to `true`, even when no
	/// real transaction is bound to the calling thread.
	fn is_tx_active_by_context(&self, ctx: &Context) -> bool {
		scope::is_active(ctx) || self.is_transaction_active()
	}
}

/// Coordinator for deployments without transactions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTransactions;

impl TransactionCoordinator for NoTransactions {
	fn is_transaction_active(&self) -> bool {
		false
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::scope::push_scope;

	#[test]
	fn test_scope_forces_active() {
		let coordinator = NoTransactions;
		let ctx = Context::empty();

		assert!(!coordinator.is_tx_active_by_context(&ctx));
		assert!(coordinator.is_tx_active_by_context(&push_scope(&ctx, "upstream")));
	}
}

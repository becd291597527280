// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Call context propagated through reactive chains, and the transaction-scope
//! marker built on top of it.

mod context;
mod coordinator;
pub mod scope;

pub use context::Context;
pub use coordinator::{NoTransactions, TransactionCoordinator};
pub use scope::{ScopeStack, TX_SCOPES_KEY, current_scope, is_active, pop_scope, push_scope, scopes};

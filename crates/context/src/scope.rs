// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Transaction-scope marker.
//!
//! An upstream chain pushes a location label before handing work to a
//! downstream chain, and pops it once the downstream chain is done. While at
//! least one label is on the stack the downstream chain behaves as if a
//! transaction were active, which keeps the work on the calling thread.
//!
//! Push and pop must be strictly paired per logical scope. Popping an empty
//! stack is a programming error and panics.

use std::sync::Arc;

use crate::context::Context;

/// Context key under which the scope stack is stored.
pub const TX_SCOPES_KEY: &str = "reifydb.tx.scopes";

/// Persistent stack of scope labels. Pushing and popping share the frames
/// below the top with the previous stack.
#[derive(Clone, Default)]
pub struct ScopeStack {
	top: Option<Arc<Frame>>,
}

struct Frame {
	location: Arc<str>,
	below: Option<Arc<Frame>>,
	depth: usize,
}

impl ScopeStack {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&self, location: impl Into<Arc<str>>) -> Self {
		let depth = self.depth() + 1;
		Self {
			top: Some(Arc::new(Frame {
				location: location.into(),
				below: self.top.clone(),
				depth,
			})),
		}
	}

	/// Returns the stack without its top frame, or `None` if empty.
	pub fn pop(&self) -> Option<Self> {
		self.top.as_ref().map(|frame| Self {
			top: frame.below.clone(),
		})
	}

	pub fn peek(&self) -> Option<&str> {
		self.top.as_deref().map(|frame| &*frame.location)
	}

	pub fn depth(&self) -> usize {
		self.top.as_ref().map_or(0, |frame| frame.depth)
	}

	pub fn is_empty(&self) -> bool {
		self.top.is_none()
	}

	/// Iterates the labels from the top of the stack downwards.
	pub fn iter(&self) -> Iter<'_> {
		Iter {
			next: self.top.as_deref(),
		}
	}
}

impl std::fmt::Debug for ScopeStack {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_list().entries(self.iter()).finish()
	}
}

pub struct Iter<'a> {
	next: Option<&'a Frame>,
}

impl<'a> Iterator for Iter<'a> {
	type Item = &'a str;

	fn next(&mut self) -> Option<Self::Item> {
		let frame = self.next?;
		self.next = frame.below.as_deref();
		Some(&*frame.location)
	}
}

/// Returns a context with `location` pushed on top of the scope stack.
pub fn push_scope(ctx: &Context, location: impl Into<Arc<str>>) -> Context {
	let stack = ctx.get::<ScopeStack>(TX_SCOPES_KEY).cloned().unwrap_or_default();
	ctx.put(TX_SCOPES_KEY, stack.push(location))
}

/// Returns a context with the top of the scope stack removed.
///
/// # Panics
///
/// Panics if the stack is empty, which means push and pop are not paired.
pub fn pop_scope(ctx: &Context) -> Context {
	let Some(popped) = ctx.get::<ScopeStack>(TX_SCOPES_KEY).and_then(ScopeStack::pop) else {
		panic!("transaction scope stack underflow: pop without matching push");
	};

	if popped.is_empty() {
		ctx.delete(TX_SCOPES_KEY)
	} else {
		ctx.put(TX_SCOPES_KEY, popped)
	}
}

/// Whether a transaction is logically active along this call chain.
pub fn is_active(ctx: &Context) -> bool {
	ctx.get::<ScopeStack>(TX_SCOPES_KEY).is_some_and(|stack| !stack.is_empty())
}

/// The innermost scope label, if any.
pub fn current_scope(ctx: &Context) -> Option<&str> {
	ctx.get::<ScopeStack>(TX_SCOPES_KEY).and_then(ScopeStack::peek)
}

/// All scope labels, innermost first.
pub fn scopes(ctx: &Context) -> Vec<&str> {
	ctx.get::<ScopeStack>(TX_SCOPES_KEY).map(|stack| stack.iter().collect()).unwrap_or_default()
}

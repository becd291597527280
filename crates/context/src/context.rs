// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Immutable call context carried along a reactive chain.
//!
//! Every mutation returns a new [`Context`]; existing handles never observe
//! the change. Values are shared between the old and the new context, only
//! the key index is copied.

use std::{
	any::Any,
	collections::BTreeMap,
	fmt::{self, Debug, Formatter},
	sync::Arc,
};

type Value = Arc<dyn Any + Send + Sync>;

/// Key/value context propagated through a reactive call chain.
#[derive(Clone, Default)]
pub struct Context {
	entries: Arc<BTreeMap<&'static str, Value>>,
}

impl Context {
	/// Creates an empty context.
	pub fn empty() -> Self {
		Self::default()
	}

	/// Returns a context where `key` maps to `value`.
	pub fn put<V>(&self, key: &'static str, value: V) -> Self
	where
		V: Any + Send + Sync,
	{
		let mut entries = (*self.entries).clone();
		entries.insert(key, Arc::new(value));
		Self {
			entries: Arc::new(entries),
		}
	}

	/// Returns a context without `key`.
	///
	/// Returns a cheap clone of `self` when the key is absent.
	pub fn delete(&self, key: &str) -> Self {
		if !self.entries.contains_key(key) {
			return self.clone();
		}

		let mut entries = (*self.entries).clone();
		entries.remove(key);
		Self {
			entries: Arc::new(entries),
		}
	}

	/// Looks up `key` and downcasts the value to `V`.
	///
	/// Returns `None` if the key is absent or holds a value of another type.
	pub fn get<V>(&self, key: &str) -> Option<&V>
	where
		V: Any + Send + Sync,
	{
		self.entries.get(key).and_then(|value| (**value).downcast_ref::<V>())
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.entries.contains_key(key)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
		self.entries.keys().copied()
	}
}

impl Debug for Context {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Context").field("keys", &self.entries.keys().collect::<Vec<_>>()).finish()
	}
}

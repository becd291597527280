// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Callbacks run when a thread exits.

use std::cell::RefCell;

type ExitHook = Box<dyn FnOnce()>;

/// Hooks of one thread, at most one per key.
#[derive(Default)]
struct ExitHooks {
	hooks: RefCell<Vec<(u64, ExitHook)>>,
}

impl Drop for ExitHooks {
	fn drop(&mut self) {
		for (_, hook) in std::mem::take(self.hooks.get_mut()) {
			hook();
		}
	}
}

thread_local! {
	static EXIT_HOOKS: ExitHooks = ExitHooks::default();
}

/// Runs `hook` on the calling thread when it exits, unless a hook for `key`
/// is already registered on this thread, in which case `hook` is dropped.
///
/// Returns false when the thread is already tearing down its locals; the
/// hook is dropped without running.
pub(crate) fn on_thread_exit(key: u64, hook: impl FnOnce() + 'static) -> bool {
	EXIT_HOOKS
		.try_with(|hooks| {
			let mut hooks = hooks.hooks.borrow_mut();
			if !hooks.iter().any(|(registered, _)| *registered == key) {
				hooks.push((key, Box::new(hook)));
			}
		})
		.is_ok()
}

/// Hooks registered on the calling thread.
#[cfg(test)]
pub(crate) fn registered() -> usize {
	EXIT_HOOKS.with(|hooks| hooks.hooks.borrow().len())
}

#[cfg(test)]
mod tests {
	use std::{
		sync::{
			Arc,
			atomic::{AtomicUsize, Ordering},
		},
		thread,
	};

	use super::*;

	#[test]
	fn test_hooks_run_on_exit() {
		let ran = Arc::new(AtomicUsize::new(0));

		let counter = ran.clone();
		thread::spawn(move || {
			for key in 0..2 {
				let counter = counter.clone();
				assert!(on_thread_exit(key, move || {
					counter.fetch_add(1, Ordering::SeqCst);
				}));
			}
			assert_eq!(counter.load(Ordering::SeqCst), 0);
		})
		.join()
		.unwrap();

		assert_eq!(ran.load(Ordering::SeqCst), 2);
	}

	#[test]
	fn test_one_hook_per_key() {
		let ran = Arc::new(AtomicUsize::new(0));

		let counter = ran.clone();
		thread::spawn(move || {
			for _ in 0..100 {
				let counter = counter.clone();
				assert!(on_thread_exit(7, move || {
					counter.fetch_add(1, Ordering::SeqCst);
				}));
			}
			assert_eq!(registered(), 1);
		})
		.join()
		.unwrap();

		assert_eq!(ran.load(Ordering::SeqCst), 1);
	}
}

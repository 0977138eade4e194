//! Thread-local scoped context stacks.
//!
//! The active policy, policy-resolution mode, and null behavior live on
//! per-thread stacks. Entering a scope pushes a frame and returns an RAII
//! guard; the frame is popped when the guard drops, on every exit path
//! including unwinding. Stacks in one thread never affect another.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::null::NullBehavior;
use crate::policy::{default_policy, Policy};

/// How the policy for a binary operation is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyResolution {
    /// Prefer the ambient context policy; fall back to the library default.
    Context,
    /// Use the left operand's policy.
    LeftOperand,
    /// Require identical policy signatures on both operands.
    StrictMatch,
}

thread_local! {
    static POLICY_STACK: RefCell<Vec<Arc<Policy>>> = const { RefCell::new(Vec::new()) };
    static RESOLUTION_STACK: RefCell<Vec<PolicyResolution>> = const { RefCell::new(Vec::new()) };
    static NULLS_STACK: RefCell<Vec<NullBehavior>> = const { RefCell::new(Vec::new()) };
}

/// The ambient policy, if any scope is active on this thread.
pub fn ambient_policy() -> Option<Arc<Policy>> {
    POLICY_STACK.with(|s| s.borrow().last().cloned())
}

/// The ambient policy or the library default.
pub fn active_policy() -> Arc<Policy> {
    ambient_policy().unwrap_or_else(default_policy)
}

/// The active resolution mode; `Context` when no scope is open.
pub fn active_resolution() -> PolicyResolution {
    RESOLUTION_STACK.with(|s| s.borrow().last().copied()).unwrap_or(PolicyResolution::Context)
}

/// The active null behavior; the propagate/skip default when no scope is open.
pub fn active_nulls() -> NullBehavior {
    NULLS_STACK.with(|s| s.borrow().last().copied()).unwrap_or_default()
}

// Guards are !Send (PhantomData over a raw pointer) so a scope cannot be
// moved off the thread whose stack it will pop.

/// RAII guard for a policy scope.
#[must_use = "the scope ends when the guard drops"]
pub struct PolicyScope {
    _not_send: PhantomData<*const ()>,
}

/// Push a policy for the current scope.
pub fn use_policy(policy: Arc<Policy>) -> PolicyScope {
    POLICY_STACK.with(|s| s.borrow_mut().push(policy));
    PolicyScope {
        _not_send: PhantomData,
    }
}

impl Drop for PolicyScope {
    fn drop(&mut self) {
        POLICY_STACK.with(|s| {
            s.borrow_mut().pop();
        });
    }
}

/// RAII guard for a resolution-mode scope.
#[must_use = "the scope ends when the guard drops"]
pub struct ResolutionScope {
    _not_send: PhantomData<*const ()>,
}

/// Push a policy-resolution mode for the current scope.
pub fn use_resolution(mode: PolicyResolution) -> ResolutionScope {
    RESOLUTION_STACK.with(|s| s.borrow_mut().push(mode));
    ResolutionScope {
        _not_send: PhantomData,
    }
}

impl Drop for ResolutionScope {
    fn drop(&mut self) {
        RESOLUTION_STACK.with(|s| {
            s.borrow_mut().pop();
        });
    }
}

/// RAII guard for a null-behavior scope.
#[must_use = "the scope ends when the guard drops"]
pub struct NullsScope {
    _not_send: PhantomData<*const ()>,
}

/// Push a null behavior for the current scope.
pub fn use_nulls(behavior: NullBehavior) -> NullsScope {
    NULLS_STACK.with(|s| s.borrow_mut().push(behavior));
    NullsScope {
        _not_send: PhantomData,
    }
}

impl Drop for NullsScope {
    fn drop(&mut self) {
        NULLS_STACK.with(|s| {
            s.borrow_mut().pop();
        });
    }
}

/// Run a closure under a specific null behavior.
pub fn with_nulls<T>(behavior: NullBehavior, f: impl FnOnce() -> T) -> T {
    let _scope = use_nulls(behavior);
    f()
}

//! Builtin calculation library, organized by business domain.
//!
//! Each module owns a namespaced [`Collection`](crate::registry::Collection)
//! and registers its calculations when [`load_builtins`] runs. Loading is
//! explicit and happens exactly once per process -- the engine constructor
//! calls it, and after that the registry is effectively read-only.
//!
//! All functions follow the same shape: pick a policy from the operands,
//! short-circuit nones into a none-Value of the declared result unit, and
//! let value arithmetic carry unit algebra and strict-mode behavior.

pub mod growth;
pub mod pricing;
pub mod profitability;
pub mod ratios;
pub mod variance;

mod support;

use std::sync::Once;

/// Materialise the builtin library. Safe to call repeatedly.
pub fn load_builtins() {
    static LOAD: Once = Once::new();
    LOAD.call_once(|| {
        for result in [
            pricing::register_all(),
            profitability::register_all(),
            ratios::register_all(),
            growth::register_all(),
            variance::register_all(),
        ] {
            if let Err(e) = result {
                // Duplicate or invalid builtin names are programming
                // errors; keep loading the rest but make the failure loud.
                tracing::error!(error = %e, "builtin calculation registration failed");
            }
        }
    });
}

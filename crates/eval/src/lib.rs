//! tally-eval: dependency-driven calculation engine over tally-core values.
//!
//! Calculations are registered by name with declared string dependencies;
//! the [`Engine`] resolves a target's dependency subgraph against a
//! per-call context, detects cycles, and evaluates in topological order
//! with per-call caching. A builtin metric library (pricing,
//! profitability, ratios, growth, variance) is loaded on first engine
//! construction.
//!
//! # Example
//!
//! ```
//! use tally_eval::{Context, Engine};
//! use tally_core::{Raw, Unit, Value};
//!
//! let engine = Engine::new();
//! let mut ctx = Context::new();
//! ctx.insert("sales".into(), Raw::Value(Value::of("1000", Unit::money("USD"))));
//! ctx.insert("cost".into(), Raw::Value(Value::of("650", Unit::money("USD"))));
//!
//! let margin = engine.calculate("profitability.gross_margin_ratio", &ctx)?;
//! assert_eq!(margin.unit(), &Unit::Ratio);
//! # Ok::<(), tally_eval::EngineError>(())
//! ```

pub mod calculations;
pub mod engine;
pub mod error;
pub mod registry;

pub use calculations::load_builtins;
pub use engine::{Context, Engine};
pub use error::EngineError;
pub use registry::{
    all_calculations, clear_registry, descriptor, is_registered, register, register_descriptor,
    CalcDescriptor, CalcFn, Collection,
};

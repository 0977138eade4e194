//! tally-core: policy-aware business arithmetic.
//!
//! The central type is [`Value`]: an immutable triple of decimal amount,
//! unit tag, and policy handle, with optional content-addressed provenance.
//! All arithmetic runs on `rust_decimal::Decimal` -- never through binary
//! floating point -- and missing data is an explicit none amount that
//! propagates through calculations instead of erroring.
//!
//! # Public API
//!
//! Key types and entry points are re-exported at the crate root:
//!
//! - [`Value`], [`Raw`], [`Unit`] -- values, raw inputs, unit tags
//! - [`Policy`], [`default_policy`], [`use_policy`] -- policy handles and
//!   scoped context
//! - [`NullBehavior`], [`use_nulls`], [`with_nulls`] -- missing-data modes
//! - [`sum`], [`mean`], [`weighted_mean`] -- reductions
//! - [`register_conversion`], [`use_conversion_policy`] -- unit conversion
//! - [`span`], [`to_trace_json`], [`explain`] -- provenance
//!
//! # Example
//!
//! ```
//! use tally_core::{Unit, Value};
//!
//! let revenue = Value::of("1000", Unit::money("USD"));
//! let cost = Value::of("600", Unit::money("USD"));
//! let profit = revenue.sub(&cost)?;
//! let margin = profit.div(&revenue)?;
//! assert_eq!(margin.unit(), &Unit::Ratio);
//! assert_eq!(margin.as_percentage().to_string(), "40.00%");
//! # Ok::<(), tally_core::ValueError>(())
//! ```

pub mod context;
pub mod conversion;
pub mod error;
pub mod factories;
pub mod format;
pub mod null;
pub mod policy;
pub mod provenance;
pub mod reductions;
pub mod units;
pub mod value;

// ── Convenience re-exports: key types ────────────────────────────────

pub use context::{
    active_nulls, active_policy, ambient_policy, use_nulls, use_policy, use_resolution,
    with_nulls, PolicyResolution,
};
pub use conversion::{
    active_conversion_policy, clear_conversions, register_conversion, use_conversion_policy,
    ConversionContext, ConversionPolicy,
};
pub use error::ValueError;
pub use factories::{dimensionless, money, money_in, percent, percent_of_ratio, quantity, ratio};
pub use format::{BasicFormatter, Formatter};
pub use null::{
    NullBehavior, NullBinaryMode, NullReductionMode, DEFAULT_NULLS, STRICT_RAISE, SUM_PROPAGATE,
    SUM_RAISE, SUM_ZERO,
};
pub use policy::{
    default_policy, default_quantizer, CurrencyStyle, DisplayPolicy, PercentDisplay, Policy,
    Rounding,
};
pub use provenance::{
    explain, graph, set_global_config, span, span_with, to_trace_json, use_provenance_config,
    ProvNode, ProvenanceConfig,
};
pub use reductions::{
    mean, reduce, register_reducer, sum, weighted_mean, weighted_mean_of,
};
pub use units::{add_sub_unit, div_unit, mul_unit, Unit};
pub use value::{Raw, Value};

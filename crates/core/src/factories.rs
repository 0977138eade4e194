//! Ergonomic value constructors.
//!
//! Free functions for the common unit tags. All honor the ambient policy
//! and coerce leniently (unparseable text becomes a none-Value).

use crate::units::Unit;
use crate::value::{Raw, Value};
use rust_decimal::Decimal;

/// Money without a currency label.
pub fn money(raw: impl Into<Raw>) -> Value {
    Value::of(raw, Unit::money_unlabelled())
}

/// Money in a specific currency.
pub fn money_in(code: impl Into<String>, raw: impl Into<Raw>) -> Value {
    Value::of(raw, Unit::money(code))
}

/// A ratio stored in 0..1 space.
pub fn ratio(raw: impl Into<Raw>) -> Value {
    Value::of(raw, Unit::Ratio)
}

/// A percent-tagged value from a percent figure: `percent(15)` stores 0.15.
pub fn percent(raw: impl Into<Raw>) -> Value {
    let base = Value::of(raw, Unit::Percent);
    match base.amount() {
        Some(d) => Value::of(d / Decimal::ONE_HUNDRED, Unit::Percent),
        None => base,
    }
}

/// A percent-tagged value from an already-scaled ratio: `percent_of_ratio(0.15)`.
pub fn percent_of_ratio(raw: impl Into<Raw>) -> Value {
    Value::of(raw, Unit::Percent)
}

/// A plain number.
pub fn dimensionless(raw: impl Into<Raw>) -> Value {
    Value::of(raw, Unit::Dimensionless)
}

/// An open-tagged quantity.
pub fn quantity(tag: impl Into<String>, raw: impl Into<Raw>) -> Value {
    Value::of(raw, Unit::quantity(tag))
}

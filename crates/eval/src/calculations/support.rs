//! Shared helpers for the builtin calculation library.

use std::sync::Arc;

use tally_core::{active_policy, Policy, Unit, Value};

/// First non-none argument's policy, else the ambient policy.
pub(crate) fn policy_of(args: &[Value]) -> Arc<Policy> {
    args.iter()
        .find(|v| !v.is_none())
        .map(|v| v.policy().clone())
        .unwrap_or_else(active_policy)
}

pub(crate) fn none_of(unit: Unit, policy: &Arc<Policy>) -> Value {
    Value::none_with_policy(unit, policy.clone())
}

/// Dimensionless one, for `1 + rate` style terms.
pub(crate) fn one(policy: &Arc<Policy>) -> Value {
    Value::of_with(1, Unit::Dimensionless, policy.clone())
}

/// Retag a result as Ratio under the given policy.
pub(crate) fn ratio_with(value: Value, policy: &Arc<Policy>) -> Value {
    value.as_ratio().with_policy(policy.clone())
}

/// Negative sales are treated as unreportable and collapse to none.
pub(crate) fn negative_sales(sales: &Value) -> bool {
    sales.is_negative()
}

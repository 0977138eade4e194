//! Reductions over value sequences with explicit missing-data semantics.
//!
//! `sum` folds with value addition under left-operand policy resolution,
//! so the result is exactly the left-fold the arithmetic layer would
//! produce. The none-handling mode comes from the ambient null behavior
//! unless overridden per call.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock, RwLock};

use crate::context::{active_nulls, active_policy, use_resolution, PolicyResolution};
use crate::error::ValueError;
use crate::null::NullReductionMode;
use crate::policy::Policy;
use crate::provenance::{self, ProvNode};
use crate::units::Unit;
use crate::value::Value;

/// Sum under the ambient reduction mode and policy.
pub fn sum(items: &[Value]) -> Result<Value, ValueError> {
    sum_with(items, None, None)
}

/// Sum with explicit mode/policy overrides.
pub fn sum_with(
    items: &[Value],
    mode: Option<NullReductionMode>,
    policy: Option<Arc<Policy>>,
) -> Result<Value, ValueError> {
    let mode = mode.unwrap_or_else(|| active_nulls().reduction);
    let policy = pick_policy(items, policy);
    let unit = pick_unit(items)?;

    let mut saw_none = false;
    let mut saw_value = false;
    let mut total = Value::zero(unit.clone()).with_policy(policy.clone());
    {
        let _mode = use_resolution(PolicyResolution::LeftOperand);
        for item in items {
            if item.is_none() {
                saw_none = true;
                if mode == NullReductionMode::Raise {
                    return Err(ValueError::NullInReduction {
                        reduction: "sum".to_string(),
                    });
                }
                continue;
            }
            total = total.add(item)?;
            saw_value = true;
        }
    }

    let result = match mode {
        NullReductionMode::Propagate if saw_none => Value::none_with_policy(unit, policy.clone()),
        NullReductionMode::Zero => total,
        _ => {
            if saw_value {
                total
            } else {
                Value::none_with_policy(unit, policy.clone())
            }
        }
    };
    Ok(attach_reduction_provenance("sum", items, result, &policy))
}

/// Mean under the ambient reduction mode and policy.
pub fn mean(items: &[Value]) -> Result<Value, ValueError> {
    mean_with(items, None, None)
}

/// Mean with explicit mode/policy overrides.
///
/// In skip mode the divisor counts only present elements; in zero mode it
/// counts every element. An empty (or all-none zero-mode) input is a
/// none-Value.
pub fn mean_with(
    items: &[Value],
    mode: Option<NullReductionMode>,
    policy: Option<Arc<Policy>>,
) -> Result<Value, ValueError> {
    let mode = mode.unwrap_or_else(|| active_nulls().reduction);
    let policy = pick_policy(items, policy);
    let unit = pick_unit(items)?;

    let any_none = items.iter().any(Value::is_none);
    if mode == NullReductionMode::Raise && any_none {
        return Err(ValueError::NullInReduction {
            reduction: "mean".to_string(),
        });
    }
    if mode == NullReductionMode::Propagate && any_none {
        let out = Value::none_with_policy(unit, policy.clone());
        return Ok(attach_reduction_provenance("mean", items, out, &policy));
    }

    let divisor = match mode {
        NullReductionMode::Zero => items.len(),
        _ => items.iter().filter(|v| !v.is_none()).count(),
    };
    let all_none = !items.is_empty() && items.iter().all(Value::is_none);
    if divisor == 0 || items.is_empty() || (mode == NullReductionMode::Zero && all_none) {
        let out = Value::none_with_policy(unit, policy.clone());
        return Ok(attach_reduction_provenance("mean", items, out, &policy));
    }

    let total = sum_with(items, Some(NullReductionMode::Skip), Some(policy.clone()))?;
    let count = Value::of_with(divisor as i64, Unit::Dimensionless, policy.clone());
    let out = {
        let _mode = use_resolution(PolicyResolution::LeftOperand);
        total.div(&count)?
    };
    Ok(attach_reduction_provenance("mean", items, out, &policy))
}

/// Weighted mean over (value, weight) pairs.
pub fn weighted_mean(pairs: &[(Value, Value)]) -> Result<Value, ValueError> {
    weighted_mean_with(pairs, None, None)
}

/// Weighted mean with explicit mode/policy overrides.
///
/// Skip drops pairs where either side is none. Zero treats a none value
/// as 0 with its weight still counted, and a none weight as 0 (the pair
/// contributes nothing). A zero total weight under non-strict arithmetic
/// is a none-Value.
pub fn weighted_mean_with(
    pairs: &[(Value, Value)],
    mode: Option<NullReductionMode>,
    policy: Option<Arc<Policy>>,
) -> Result<Value, ValueError> {
    let mode = mode.unwrap_or_else(|| active_nulls().reduction);
    let values: Vec<Value> = pairs.iter().map(|(v, _)| v.clone()).collect();
    let policy = pick_policy(&values, policy);
    let unit = pick_unit(&values)?;

    let any_none = pairs.iter().any(|(v, w)| v.is_none() || w.is_none());
    if mode == NullReductionMode::Raise && any_none {
        return Err(ValueError::NullInReduction {
            reduction: "weighted_mean".to_string(),
        });
    }
    if (mode == NullReductionMode::Propagate && any_none) || pairs.is_empty() {
        let out = Value::none_with_policy(unit, policy.clone());
        return Ok(attach_weighted_provenance(pairs, out, &policy));
    }

    let mut kept: Vec<(Value, Value)> = Vec::with_capacity(pairs.len());
    for (v, w) in pairs {
        match mode {
            NullReductionMode::Zero => {
                let v2 = if v.is_none() {
                    Value::zero(unit.clone()).with_policy(policy.clone())
                } else {
                    v.clone()
                };
                let w2 = if w.is_none() {
                    Value::zero(Unit::Dimensionless).with_policy(policy.clone())
                } else {
                    w.clone()
                };
                kept.push((v2, w2));
            }
            _ => {
                if !v.is_none() && !w.is_none() {
                    kept.push((v.clone(), w.clone()));
                }
            }
        }
    }
    if kept.is_empty() {
        let out = Value::none_with_policy(unit, policy.clone());
        return Ok(attach_weighted_provenance(pairs, out, &policy));
    }

    let _mode = use_resolution(PolicyResolution::LeftOperand);
    let mut weighted_sum = Value::zero(unit.clone()).with_policy(policy.clone());
    let mut total_weight = Value::zero(Unit::Dimensionless).with_policy(policy.clone());
    for (v, w) in &kept {
        weighted_sum = weighted_sum.add(&v.mul(w)?)?;
        total_weight = total_weight.add(w)?;
    }
    let out = if total_weight.is_zero() {
        Value::none_with_policy(unit, policy.clone())
    } else {
        weighted_sum.div(&total_weight)?
    };
    drop(_mode);
    Ok(attach_weighted_provenance(pairs, out, &policy))
}

/// Weighted mean over parallel value/weight slices. A length mismatch is
/// a none-Value, not an error.
pub fn weighted_mean_of(values: &[Value], weights: &[Value]) -> Result<Value, ValueError> {
    if values.len() != weights.len() {
        let policy = pick_policy(values, None);
        let unit = pick_unit(values)?;
        return Ok(Value::none_with_policy(unit, policy));
    }
    let pairs: Vec<(Value, Value)> = values
        .iter()
        .cloned()
        .zip(weights.iter().cloned())
        .collect();
    weighted_mean(&pairs)
}

// ── Custom reducers ──────────────────────────────────────────────────

/// A user-registered reduction function.
pub type ReducerFn = Arc<dyn Fn(&[Value]) -> Result<Value, ValueError> + Send + Sync>;

fn reducer_table() -> &'static RwLock<BTreeMap<String, ReducerFn>> {
    static TABLE: OnceLock<RwLock<BTreeMap<String, ReducerFn>>> = OnceLock::new();
    TABLE.get_or_init(|| RwLock::new(BTreeMap::new()))
}

/// Register (or replace) a named reducer.
pub fn register_reducer<F>(name: impl Into<String>, f: F)
where
    F: Fn(&[Value]) -> Result<Value, ValueError> + Send + Sync + 'static,
{
    reducer_table()
        .write()
        .unwrap_or_else(|e| e.into_inner())
        .insert(name.into(), Arc::new(f));
}

/// Run a named reducer over a sequence.
pub fn reduce(name: &str, items: &[Value]) -> Result<Value, ValueError> {
    let f = {
        let table = reducer_table().read().unwrap_or_else(|e| e.into_inner());
        table.get(name).cloned()
    };
    match f {
        Some(f) => f(items),
        None => Err(ValueError::UnknownReducer {
            name: name.to_string(),
        }),
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Explicit policy, else first non-none element's, else ambient/default.
fn pick_policy(items: &[Value], explicit: Option<Arc<Policy>>) -> Arc<Policy> {
    if let Some(p) = explicit {
        return p;
    }
    for item in items {
        if !item.is_none() {
            return item.policy().clone();
        }
    }
    active_policy()
}

/// First non-none element's unit, else Dimensionless. Mixed incompatible
/// units fail.
fn pick_unit(items: &[Value]) -> Result<Unit, ValueError> {
    let mut chosen: Option<Unit> = None;
    for item in items {
        if item.is_none() {
            continue;
        }
        match &chosen {
            None => chosen = Some(item.unit().clone()),
            Some(unit) => {
                if !unit.compatible(item.unit()) {
                    return Err(ValueError::IncompatibleUnits {
                        op: "reduce".to_string(),
                        left: unit.label(),
                        right: item.unit().label(),
                    });
                }
            }
        }
    }
    Ok(chosen.unwrap_or(Unit::Dimensionless))
}

/// Replace the fold's provenance chain with a single reduction node whose
/// inputs are the elements.
fn attach_reduction_provenance(
    op: &str,
    items: &[Value],
    result: Value,
    policy: &Arc<Policy>,
) -> Value {
    let parents = element_nodes(items.iter());
    let mut meta = BTreeMap::new();
    meta.insert("count".to_string(), serde_json::json!(items.len()));
    let prov =
        provenance::node_from_parents(op, parents, meta, policy, &provenance::active_config());
    Value::assemble(result.amount(), result.unit().clone(), result.policy().clone(), prov)
}

fn attach_weighted_provenance(
    pairs: &[(Value, Value)],
    result: Value,
    policy: &Arc<Policy>,
) -> Value {
    let parents = element_nodes(pairs.iter().flat_map(|(v, w)| [v, w]));
    let mut meta = BTreeMap::new();
    meta.insert("count".to_string(), serde_json::json!(pairs.len()));
    let prov = provenance::node_from_parents(
        "weighted_mean",
        parents,
        meta,
        policy,
        &provenance::active_config(),
    );
    Value::assemble(result.amount(), result.unit().clone(), result.policy().clone(), prov)
}

fn element_nodes<'a>(items: impl Iterator<Item = &'a Value>) -> Vec<Arc<ProvNode>> {
    let mut parents = Vec::new();
    for item in items {
        match item.provenance() {
            Some(node) => parents.push(Arc::clone(node)),
            None => {
                if let Some(lit) =
                    provenance::literal_node(item.amount().as_ref(), item.policy())
                {
                    parents.push(lit);
                }
            }
        }
    }
    parents
}

//! Unit conversion registry.
//!
//! Conversions are user-registered directed edges `(from, to, fn)` over
//! unit tags. Conversion between unconnected units composes edges along a
//! breadth-first shortest path when the active policy allows it. The
//! registry is process-wide behind a read/write lock; shortest paths are
//! memoised and the cache is invalidated on every registration.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock, RwLock};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValueError;
use crate::provenance;
use crate::units::Unit;
use crate::value::Value;

/// Context handed to registered conversion functions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionContext {
    /// Timestamp the conversion should be valid at (ISO 8601), if any.
    pub at: Option<String>,
    pub meta: BTreeMap<String, String>,
}

impl ConversionContext {
    pub fn new() -> ConversionContext {
        ConversionContext::default()
    }

    pub fn at(mut self, at: impl Into<String>) -> ConversionContext {
        self.at = Some(at.into());
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> ConversionContext {
        self.meta.insert(key.into(), value.into());
        self
    }
}

/// Behavior toggles for conversion lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionPolicy {
    /// Fail with [`ValueError::MissingConversion`] when no path exists.
    pub strict: bool,
    /// Compose multi-hop paths when no direct edge exists.
    pub allow_paths: bool,
}

impl Default for ConversionPolicy {
    fn default() -> Self {
        ConversionPolicy {
            strict: true,
            allow_paths: true,
        }
    }
}

thread_local! {
    static CONVERSION_POLICY_STACK: RefCell<Vec<ConversionPolicy>> =
        const { RefCell::new(Vec::new()) };
}

/// The active conversion policy; the strict/paths default when no scope is
/// open.
pub fn active_conversion_policy() -> ConversionPolicy {
    CONVERSION_POLICY_STACK
        .with(|s| s.borrow().last().copied())
        .unwrap_or_default()
}

/// RAII guard for a conversion-policy scope.
#[must_use = "the scope ends when the guard drops"]
pub struct ConversionPolicyScope {
    _not_send: PhantomData<*const ()>,
}

/// Push a conversion policy for the current scope.
pub fn use_conversion_policy(policy: ConversionPolicy) -> ConversionPolicyScope {
    CONVERSION_POLICY_STACK.with(|s| s.borrow_mut().push(policy));
    ConversionPolicyScope {
        _not_send: PhantomData,
    }
}

impl Drop for ConversionPolicyScope {
    fn drop(&mut self) {
        CONVERSION_POLICY_STACK.with(|s| {
            s.borrow_mut().pop();
        });
    }
}

/// A registered conversion function.
pub type ConvertFn = Arc<dyn Fn(Decimal, &ConversionContext) -> Result<Decimal, ValueError> + Send + Sync>;

#[derive(Default)]
struct Registry {
    /// Adjacency in registration order, which keeps path search
    /// deterministic.
    edges: HashMap<Unit, Vec<(Unit, ConvertFn)>>,
    /// Memoised node paths, endpoints included. `None` records a miss.
    path_cache: HashMap<(Unit, Unit), Option<Vec<Unit>>>,
}

fn registry() -> &'static RwLock<Registry> {
    static REGISTRY: OnceLock<RwLock<Registry>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(Registry::default()))
}

/// Register a conversion edge. Re-registering an edge replaces its
/// function. Invalidates the path cache.
pub fn register_conversion<F>(from: Unit, to: Unit, f: F)
where
    F: Fn(Decimal, &ConversionContext) -> Result<Decimal, ValueError> + Send + Sync + 'static,
{
    let mut reg = registry().write().unwrap_or_else(|e| e.into_inner());
    let list = reg.edges.entry(from).or_default();
    let func: ConvertFn = Arc::new(f);
    match list.iter_mut().find(|(dst, _)| *dst == to) {
        Some(slot) => slot.1 = func,
        None => list.push((to, func)),
    }
    reg.path_cache.clear();
}

/// Drop every registered edge and cached path. Intended for tests.
pub fn clear_conversions() {
    let mut reg = registry().write().unwrap_or_else(|e| e.into_inner());
    reg.edges.clear();
    reg.path_cache.clear();
}

/// Breadth-first shortest node path, endpoints included.
fn find_path(reg: &Registry, from: &Unit, to: &Unit) -> Option<Vec<Unit>> {
    let mut queue = VecDeque::new();
    let mut prev: HashMap<Unit, Unit> = HashMap::new();
    queue.push_back(from.clone());
    prev.insert(from.clone(), from.clone());
    while let Some(current) = queue.pop_front() {
        if current == *to {
            let mut path = vec![current.clone()];
            let mut cursor = current;
            loop {
                let parent = prev[&cursor].clone();
                if parent == cursor {
                    break;
                }
                path.push(parent.clone());
                cursor = parent;
            }
            path.reverse();
            return Some(path);
        }
        if let Some(neighbors) = reg.edges.get(&current) {
            for (next, _) in neighbors {
                if !prev.contains_key(next) {
                    prev.insert(next.clone(), current.clone());
                    queue.push_back(next.clone());
                }
            }
        }
    }
    None
}

/// Collect the edge functions along a node path.
fn chain_for(reg: &Registry, path: &[Unit]) -> Option<Vec<ConvertFn>> {
    let mut chain = Vec::with_capacity(path.len().saturating_sub(1));
    for pair in path.windows(2) {
        let funcs = reg.edges.get(&pair[0])?;
        let (_, f) = funcs.iter().find(|(dst, _)| *dst == pair[1])?;
        chain.push(f.clone());
    }
    Some(chain)
}

/// Resolve the function chain from `from` to `to`, consulting and filling
/// the path cache.
fn resolve_chain(from: &Unit, to: &Unit, allow_paths: bool) -> Option<Vec<ConvertFn>> {
    {
        let reg = registry().read().unwrap_or_else(|e| e.into_inner());
        // Direct edge wins without touching the cache.
        if let Some(funcs) = reg.edges.get(from) {
            if let Some((_, f)) = funcs.iter().find(|(dst, _)| dst == to) {
                return Some(vec![f.clone()]);
            }
        }
        if !allow_paths {
            return None;
        }
        if let Some(cached) = reg.path_cache.get(&(from.clone(), to.clone())) {
            return cached.as_ref().and_then(|path| chain_for(&reg, path));
        }
    }
    let mut reg = registry().write().unwrap_or_else(|e| e.into_inner());
    let path = find_path(&reg, from, to);
    reg.path_cache
        .insert((from.clone(), to.clone()), path.clone());
    path.and_then(|p| chain_for(&reg, &p))
}

/// Convert a value to a target unit.
///
/// Same unit returns the value unchanged. A none amount converts to a
/// none-Value in the target unit. With no path, strict mode fails with
/// [`ValueError::MissingConversion`]; non-strict mode logs and returns the
/// input unchanged.
pub fn convert(value: &Value, target: &Unit, ctx: &ConversionContext) -> Result<Value, ValueError> {
    if value.unit() == target {
        return Ok(value.clone());
    }
    let policy = active_conversion_policy();
    let from = value.unit().clone();
    let Some(amount) = value.amount() else {
        return Ok(converted_value(value, None, target, ctx));
    };
    match resolve_chain(&from, target, policy.allow_paths) {
        Some(chain) => {
            let mut current = amount;
            for f in &chain {
                current = f(current, ctx).map_err(|e| ValueError::ConversionFailed {
                    from: from.label(),
                    to: target.label(),
                    message: e.to_string(),
                })?;
            }
            let quantized = value.policy().quantize(current);
            Ok(converted_value(value, Some(quantized), target, ctx))
        }
        None => {
            if policy.strict {
                return Err(ValueError::MissingConversion {
                    from: from.label(),
                    to: target.label(),
                });
            }
            tracing::warn!(
                from = %from.label(),
                to = %target.label(),
                "no conversion path; returning value unchanged"
            );
            Ok(value.clone())
        }
    }
}

fn converted_value(
    source: &Value,
    amount: Option<Decimal>,
    target: &Unit,
    ctx: &ConversionContext,
) -> Value {
    let mut meta = BTreeMap::new();
    meta.insert(
        "from".to_string(),
        serde_json::Value::String(source.unit().label()),
    );
    meta.insert(
        "to".to_string(),
        serde_json::Value::String(target.label()),
    );
    if let Some(at) = &ctx.at {
        meta.insert("at".to_string(), serde_json::Value::String(at.clone()));
    }
    let policy = source.policy().clone();
    let parents = match source.provenance() {
        Some(node) => vec![Arc::clone(node)],
        None => Vec::new(),
    };
    let prov = provenance::node_from_parents(
        "convert",
        parents,
        meta,
        &policy,
        &provenance::active_config(),
    );
    Value::assemble(amount, target.clone(), policy, prov)
}

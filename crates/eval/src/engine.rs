//! The calculation engine.
//!
//! A call resolves its target's transitive dependency subgraph against the
//! supplied context, detects cycles, orders the nodes topologically (ties
//! broken by dependency declaration order), and evaluates each node at
//! most once into a per-call cache. Nothing is retained across calls, so
//! evaluation is deterministic and side-effect free.
//!
//! Dependency names resolve in order: context entry, registered
//! calculation under the verbatim name, registered sibling in the
//! depending calculation's namespace, and finally a missing input (an
//! error unless partial evaluation substitutes a none-Value).

use std::collections::BTreeMap;
use std::sync::Arc;

use tally_core::provenance::calculation_node;
use tally_core::{ambient_policy, default_policy, use_policy, Policy, Raw, Unit, Value};

use crate::error::EngineError;
use crate::registry::{descriptor, is_registered, CalcDescriptor};

/// Per-call input map: name to raw value.
pub type Context = BTreeMap<String, Raw>;

/// Evaluator for registered calculations.
#[derive(Debug, Clone)]
pub struct Engine {
    default_policy: Arc<Policy>,
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

impl Engine {
    /// An engine with the library default policy. Loads the builtin
    /// calculation library on first use.
    pub fn new() -> Engine {
        crate::calculations::load_builtins();
        Engine {
            default_policy: default_policy(),
        }
    }

    /// An engine with an explicit default policy.
    pub fn with_policy(policy: Arc<Policy>) -> Engine {
        crate::calculations::load_builtins();
        Engine {
            default_policy: policy,
        }
    }

    /// Compute one named metric over a context.
    pub fn calculate(&self, name: &str, ctx: &Context) -> Result<Value, EngineError> {
        self.calculate_with(name, ctx, None, false)
    }

    /// Compute one named metric with an explicit policy and/or partial
    /// evaluation (missing inputs become none-Values).
    pub fn calculate_with(
        &self,
        name: &str,
        ctx: &Context,
        policy: Option<Arc<Policy>>,
        allow_partial: bool,
    ) -> Result<Value, EngineError> {
        let mut results = self.calculate_many_with(&[name], ctx, policy, allow_partial)?;
        results
            .remove(name)
            .ok_or_else(|| EngineError::UnknownCalculation {
                name: name.to_string(),
            })
    }

    /// Compute several metrics in one pass with shared dependency
    /// resolution.
    pub fn calculate_many(
        &self,
        targets: &[&str],
        ctx: &Context,
    ) -> Result<BTreeMap<String, Value>, EngineError> {
        self.calculate_many_with(targets, ctx, None, false)
    }

    pub fn calculate_many_with(
        &self,
        targets: &[&str],
        ctx: &Context,
        policy: Option<Arc<Policy>>,
        allow_partial: bool,
    ) -> Result<BTreeMap<String, Value>, EngineError> {
        let call_policy = policy
            .or_else(ambient_policy)
            .unwrap_or_else(|| self.default_policy.clone());
        let plan = build_plan(targets, Some(ctx), allow_partial)?;

        let _scope = use_policy(call_policy.clone());
        let mut cache: BTreeMap<String, Value> = BTreeMap::new();
        for name in &plan.order {
            let value = match &plan.kinds[name] {
                NodeKind::ContextLeaf => Value::from_input(name, &ctx[name], call_policy.clone()),
                NodeKind::MissingLeaf => {
                    tracing::debug!(input = %name, "missing input substituted with none");
                    Value::none_with_policy(Unit::Dimensionless, call_policy.clone())
                }
                NodeKind::Calc { desc, arg_keys } => {
                    self.invoke(desc, arg_keys, &cache, &call_policy, allow_partial)?
                }
            };
            cache.insert(name.clone(), value);
        }

        let mut results = BTreeMap::new();
        for target in targets {
            if let Some(value) = cache.get(*target) {
                results.insert(target.to_string(), value.clone());
            }
        }
        Ok(results)
    }

    fn invoke(
        &self,
        desc: &Arc<CalcDescriptor>,
        arg_keys: &[String],
        cache: &BTreeMap<String, Value>,
        call_policy: &Arc<Policy>,
        allow_partial: bool,
    ) -> Result<Value, EngineError> {
        // Dependencies are evaluated before dependents, so every argument
        // is in the cache by construction.
        let args: Vec<Value> = arg_keys.iter().map(|k| cache[k].clone()).collect();
        let result = match (desc.func)(&args) {
            Ok(v) => v,
            Err(e) if allow_partial => {
                tracing::warn!(calculation = %desc.name, error = %e, "calculation failed under partial evaluation");
                Value::none_with_policy(Unit::Dimensionless, call_policy.clone())
            }
            Err(e) => {
                return Err(EngineError::CalculationFailed {
                    name: desc.name.clone(),
                    source: e,
                })
            }
        };
        // Provenance records the declared input names, not the resolved
        // node keys.
        let inputs: Vec<(&str, &Value)> = desc
            .deps
            .iter()
            .zip(args.iter())
            .map(|(d, v)| (d.as_str(), v))
            .collect();
        Ok(calculation_node(&desc.name, &inputs, result))
    }

    /// The ordered transitive dependency closure of a calculation:
    /// resolved calculation names and leaf input names, dependencies
    /// first.
    pub fn dependencies(&self, name: &str) -> Result<Vec<String>, EngineError> {
        let plan = build_plan(&[name], None, true)?;
        Ok(plan.order.into_iter().filter(|n| n != name).collect())
    }

    /// Check a calculation's dependency graph without evaluating: unknown
    /// targets and cycles fail, leaf inputs are fine.
    pub fn validate(&self, name: &str) -> Result<(), EngineError> {
        build_plan(&[name], None, true).map(|_| ())
    }
}

// ── Dependency planning ──────────────────────────────────────────────

enum NodeKind {
    ContextLeaf,
    MissingLeaf,
    Calc {
        desc: Arc<CalcDescriptor>,
        /// Resolved cache keys, parallel to `desc.deps`.
        arg_keys: Vec<String>,
    },
}

struct Plan {
    /// Stable topological order: DFS postorder over declared dependencies.
    order: Vec<String>,
    kinds: BTreeMap<String, NodeKind>,
}

#[derive(Clone, Copy, PartialEq)]
enum Color {
    Grey,
    Black,
}

/// Resolve a dependency name to the node key it evaluates under.
fn resolve_name(dep: &str, namespace: Option<&str>, ctx: Option<&Context>) -> String {
    if ctx.map(|c| c.contains_key(dep)).unwrap_or(false) {
        return dep.to_string();
    }
    if is_registered(dep) {
        return dep.to_string();
    }
    if let Some(ns) = namespace {
        let sibling = format!("{}.{}", ns, dep);
        if is_registered(&sibling) {
            return sibling;
        }
    }
    dep.to_string()
}

/// Build the evaluation plan for a set of targets.
fn build_plan(
    targets: &[&str],
    ctx: Option<&Context>,
    allow_partial: bool,
) -> Result<Plan, EngineError> {
    for target in targets {
        let in_ctx = ctx.map(|c| c.contains_key(*target)).unwrap_or(false);
        if !in_ctx && descriptor(target).is_none() {
            return Err(EngineError::UnknownCalculation {
                name: target.to_string(),
            });
        }
    }
    let mut plan = Plan {
        order: Vec::new(),
        kinds: BTreeMap::new(),
    };
    let mut colors: BTreeMap<String, Color> = BTreeMap::new();
    let mut path: Vec<String> = Vec::new();
    for target in targets {
        visit(target, ctx, allow_partial, &mut colors, &mut path, &mut plan)?;
    }
    Ok(plan)
}

fn visit(
    name: &str,
    ctx: Option<&Context>,
    allow_partial: bool,
    colors: &mut BTreeMap<String, Color>,
    path: &mut Vec<String>,
    plan: &mut Plan,
) -> Result<(), EngineError> {
    match colors.get(name) {
        Some(Color::Black) => return Ok(()),
        Some(Color::Grey) => {
            // Grey means `name` is on the current path: a cycle. Report it
            // from its first occurrence, closed with the repeated node.
            let start = path.iter().position(|n| n == name).unwrap_or(0);
            let mut cycle: Vec<String> = path[start..].to_vec();
            cycle.push(name.to_string());
            return Err(EngineError::CircularDependency { path: cycle });
        }
        None => {}
    }

    if ctx.map(|c| c.contains_key(name)).unwrap_or(false) {
        colors.insert(name.to_string(), Color::Black);
        plan.kinds.insert(name.to_string(), NodeKind::ContextLeaf);
        plan.order.push(name.to_string());
        return Ok(());
    }

    match descriptor(name) {
        Some(desc) => {
            colors.insert(name.to_string(), Color::Grey);
            path.push(name.to_string());
            let namespace = desc.name.rsplit_once('.').map(|(ns, _)| ns.to_string());
            let mut arg_keys = Vec::with_capacity(desc.deps.len());
            for dep in &desc.deps {
                let key = resolve_name(dep, namespace.as_deref(), ctx);
                visit(&key, ctx, allow_partial, colors, path, plan)?;
                arg_keys.push(key);
            }
            path.pop();
            colors.insert(name.to_string(), Color::Black);
            plan.kinds
                .insert(name.to_string(), NodeKind::Calc { desc, arg_keys });
            plan.order.push(name.to_string());
            Ok(())
        }
        None => {
            if !allow_partial {
                return Err(EngineError::MissingInput {
                    name: name.to_string(),
                });
            }
            colors.insert(name.to_string(), Color::Black);
            plan.kinds.insert(name.to_string(), NodeKind::MissingLeaf);
            plan.order.push(name.to_string());
            Ok(())
        }
    }
}

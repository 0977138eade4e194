//! Process-wide calculation registry.
//!
//! Calculations are registered under fully-qualified names with their
//! ordered dependency names stored verbatim; resolution against the
//! context happens at engine build time. The registry is write-once at
//! load time in normal operation: [`crate::calculations::load_builtins`]
//! materialises the builtin library before first use, and reads afterwards
//! take a shared lock on a map that no longer changes.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock, RwLock};

use tally_core::{Unit, Value, ValueError};

use crate::error::EngineError;

/// A calculation function: resolved dependency values, in declaration
/// order, to a result value.
pub type CalcFn = Arc<dyn Fn(&[Value]) -> Result<Value, ValueError> + Send + Sync>;

/// A registered calculation.
#[derive(Clone)]
pub struct CalcDescriptor {
    /// Fully-qualified name, e.g. `pricing.total_cost`.
    pub name: String,
    /// Ordered dependency names, stored verbatim.
    pub deps: Vec<String>,
    pub func: CalcFn,
    /// Declared return unit, for documentation and introspection only.
    pub return_unit: Option<Unit>,
    /// Declared input units, for documentation and introspection only.
    pub input_units: Option<Vec<Unit>>,
}

impl std::fmt::Debug for CalcDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalcDescriptor")
            .field("name", &self.name)
            .field("deps", &self.deps)
            .field("return_unit", &self.return_unit)
            .finish()
    }
}

fn registry() -> &'static RwLock<BTreeMap<String, Arc<CalcDescriptor>>> {
    static REGISTRY: OnceLock<RwLock<BTreeMap<String, Arc<CalcDescriptor>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(BTreeMap::new()))
}

fn validate_name(name: &str) -> Result<(), EngineError> {
    if name.trim().is_empty() {
        return Err(EngineError::InvalidName {
            name: name.to_string(),
            reason: "empty".to_string(),
        });
    }
    if name.contains(char::is_whitespace) {
        return Err(EngineError::InvalidName {
            name: name.to_string(),
            reason: "contains whitespace".to_string(),
        });
    }
    if name.split('.').any(str::is_empty) {
        return Err(EngineError::InvalidName {
            name: name.to_string(),
            reason: "empty name segment".to_string(),
        });
    }
    Ok(())
}

/// Register a calculation under a fully-qualified name.
pub fn register<F>(name: &str, deps: &[&str], f: F) -> Result<(), EngineError>
where
    F: Fn(&[Value]) -> Result<Value, ValueError> + Send + Sync + 'static,
{
    register_descriptor(CalcDescriptor {
        name: name.to_string(),
        deps: deps.iter().map(|d| d.to_string()).collect(),
        func: Arc::new(f),
        return_unit: None,
        input_units: None,
    })
}

/// Register a full descriptor (declared units included).
pub fn register_descriptor(desc: CalcDescriptor) -> Result<(), EngineError> {
    validate_name(&desc.name)?;
    for dep in &desc.deps {
        validate_name(dep)?;
        if *dep == desc.name {
            return Err(EngineError::InvalidName {
                name: desc.name.clone(),
                reason: "depends on itself".to_string(),
            });
        }
    }
    let mut reg = registry().write().unwrap_or_else(|e| e.into_inner());
    if reg.contains_key(&desc.name) {
        return Err(EngineError::DuplicateCalculation {
            name: desc.name,
        });
    }
    reg.insert(desc.name.clone(), Arc::new(desc));
    Ok(())
}

/// Look up a calculation by fully-qualified name.
pub fn descriptor(name: &str) -> Option<Arc<CalcDescriptor>> {
    registry()
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .get(name)
        .cloned()
}

pub fn is_registered(name: &str) -> bool {
    registry()
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .contains_key(name)
}

/// All registered names, sorted.
pub fn all_calculations() -> Vec<String> {
    registry()
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .keys()
        .cloned()
        .collect()
}

/// Drop every registration. Intended for tests.
pub fn clear_registry() {
    registry()
        .write()
        .unwrap_or_else(|e| e.into_inner())
        .clear();
}

// ── Namespaced collections ───────────────────────────────────────────

/// A registration handle that prefixes local names with a namespace.
///
/// A name without a `.` is qualified as `<namespace>.<name>`. Names that
/// already contain a `.`, or that carry a leading `:` sigil (stripped),
/// are absolute and left alone. Dependencies are qualified by the same
/// rule.
#[derive(Debug, Clone)]
pub struct Collection {
    namespace: String,
}

impl Collection {
    pub fn new(namespace: impl Into<String>) -> Collection {
        Collection {
            namespace: namespace.into().trim_matches('.').to_string(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Apply the qualification rule to one name.
    pub fn qualify(&self, name: &str) -> String {
        if let Some(absolute) = name.strip_prefix(':') {
            return absolute.to_string();
        }
        if name.contains('.') || self.namespace.is_empty() {
            return name.to_string();
        }
        format!("{}.{}", self.namespace, name)
    }

    /// Register a calculation under this namespace.
    ///
    /// Dependency names are stored verbatim (a leading `:` sigil marking
    /// an absolute name is stripped); resolution against the context and
    /// sibling calculations happens at engine build time.
    pub fn register<F>(&self, name: &str, deps: &[&str], f: F) -> Result<(), EngineError>
    where
        F: Fn(&[Value]) -> Result<Value, ValueError> + Send + Sync + 'static,
    {
        let cleaned: Vec<&str> = deps
            .iter()
            .map(|d| d.strip_prefix(':').unwrap_or(d))
            .collect();
        register(&self.qualify(name), &cleaned, f)
    }
}

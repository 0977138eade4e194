//! Provenance tracking configuration.
//!
//! A process-wide default can be overridden per thread with a scoped guard.
//! Tracking failures never abort arithmetic unless `fail_on_error` is set;
//! they log and degrade to absent provenance.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::RwLock;

/// Toggles and budgets for provenance tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvenanceConfig {
    /// Master switch. When off, no nodes are recorded at all.
    pub enabled: bool,
    pub track_literals: bool,
    pub track_operations: bool,
    pub track_calculations: bool,
    pub track_spans: bool,
    /// Surface tracking failures instead of degrading.
    pub fail_on_error: bool,
    /// Share duplicate id strings through the intern table.
    pub intern_ids: bool,
    /// Parent chains deeper than this are cut; the id is kept, the
    /// subtree is dropped from the in-memory graph.
    pub max_history_depth: usize,
    /// Node budget for graph export.
    pub max_graph_size: usize,
}

impl Default for ProvenanceConfig {
    fn default() -> Self {
        ProvenanceConfig {
            enabled: true,
            track_literals: true,
            track_operations: true,
            track_calculations: true,
            track_spans: true,
            fail_on_error: false,
            intern_ids: true,
            max_history_depth: 1000,
            max_graph_size: 10_000,
        }
    }
}

static GLOBAL_CONFIG: RwLock<Option<ProvenanceConfig>> = RwLock::new(None);

thread_local! {
    static CONFIG_STACK: RefCell<Vec<ProvenanceConfig>> = const { RefCell::new(Vec::new()) };
}

/// The active configuration: thread-local override, else the process
/// default, else the built-in default.
pub fn active_config() -> ProvenanceConfig {
    if let Some(cfg) = CONFIG_STACK.with(|s| s.borrow().last().cloned()) {
        return cfg;
    }
    GLOBAL_CONFIG
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
        .unwrap_or_default()
}

/// Replace the process-wide default configuration.
pub fn set_global_config(config: ProvenanceConfig) {
    *GLOBAL_CONFIG.write().unwrap_or_else(|e| e.into_inner()) = Some(config);
}

/// RAII guard for a thread-local configuration override.
#[must_use = "the override ends when the guard drops"]
pub struct ConfigScope {
    _not_send: PhantomData<*const ()>,
}

/// Override the provenance configuration for the current scope.
pub fn use_provenance_config(config: ProvenanceConfig) -> ConfigScope {
    CONFIG_STACK.with(|s| s.borrow_mut().push(config));
    ConfigScope {
        _not_send: PhantomData,
    }
}

impl Drop for ConfigScope {
    fn drop(&mut self) {
        CONFIG_STACK.with(|s| {
            s.borrow_mut().pop();
        });
    }
}

/// Disabled-tracking preset.
pub fn disabled() -> ProvenanceConfig {
    ProvenanceConfig {
        enabled: false,
        ..ProvenanceConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_overrides_and_restores() {
        assert!(active_config().enabled);
        {
            let _scope = use_provenance_config(disabled());
            assert!(!active_config().enabled);
        }
        assert!(active_config().enabled);
    }

    #[test]
    fn nested_scopes_layer() {
        let outer = ProvenanceConfig {
            max_graph_size: 5,
            ..ProvenanceConfig::default()
        };
        let inner = ProvenanceConfig {
            max_graph_size: 7,
            ..ProvenanceConfig::default()
        };
        let _a = use_provenance_config(outer);
        assert_eq!(active_config().max_graph_size, 5);
        {
            let _b = use_provenance_config(inner);
            assert_eq!(active_config().max_graph_size, 7);
        }
        assert_eq!(active_config().max_graph_size, 5);
    }
}

//! Calculation spans.
//!
//! A span is a scoped label: every provenance node created while the span
//! guard is alive records the span name, its attributes, and the enclosing
//! hierarchy. Span frames live on a thread-local stack.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::marker::PhantomData;

use super::config::active_config;

#[derive(Debug, Clone)]
struct SpanFrame {
    name: String,
    attrs: BTreeMap<String, serde_json::Value>,
}

thread_local! {
    static SPAN_STACK: RefCell<Vec<SpanFrame>> = const { RefCell::new(Vec::new()) };
}

/// RAII guard for a provenance span.
#[must_use = "the span ends when the guard drops"]
pub struct SpanScope {
    pushed: bool,
    _not_send: PhantomData<*const ()>,
}

/// Open a named span with no attributes.
pub fn span(name: impl Into<String>) -> SpanScope {
    span_with(name, BTreeMap::new())
}

/// Open a named span with attributes.
///
/// When span tracking is disabled the guard is inert.
pub fn span_with(
    name: impl Into<String>,
    attrs: BTreeMap<String, serde_json::Value>,
) -> SpanScope {
    let cfg = active_config();
    if !cfg.enabled || !cfg.track_spans {
        return SpanScope {
            pushed: false,
            _not_send: PhantomData,
        };
    }
    SPAN_STACK.with(|s| {
        s.borrow_mut().push(SpanFrame {
            name: name.into(),
            attrs,
        })
    });
    SpanScope {
        pushed: true,
        _not_send: PhantomData,
    }
}

impl Drop for SpanScope {
    fn drop(&mut self) {
        if self.pushed {
            SPAN_STACK.with(|s| {
                s.borrow_mut().pop();
            });
        }
    }
}

/// Span metadata for a node created right now: `span`, `span_attrs`, and
/// for nested spans `span_hierarchy` / `span_depth`. Empty when no span is
/// open.
pub(crate) fn current_span_meta() -> BTreeMap<String, serde_json::Value> {
    SPAN_STACK.with(|s| {
        let stack = s.borrow();
        let mut meta = BTreeMap::new();
        let Some(current) = stack.last() else {
            return meta;
        };
        meta.insert(
            "span".to_string(),
            serde_json::Value::String(current.name.clone()),
        );
        if !current.attrs.is_empty() {
            meta.insert(
                "span_attrs".to_string(),
                serde_json::Value::Object(current.attrs.clone().into_iter().collect()),
            );
        }
        if stack.len() > 1 {
            let hierarchy: Vec<serde_json::Value> = stack
                .iter()
                .map(|f| serde_json::Value::String(f.name.clone()))
                .collect();
            meta.insert(
                "span_hierarchy".to_string(),
                serde_json::Value::Array(hierarchy),
            );
            meta.insert("span_depth".to_string(), serde_json::json!(stack.len()));
        }
        meta
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provenance::config::{disabled, use_provenance_config};

    #[test]
    fn no_span_means_empty_meta() {
        assert!(current_span_meta().is_empty());
    }

    #[test]
    fn single_span_records_name_and_attrs() {
        let mut attrs = BTreeMap::new();
        attrs.insert("quarter".to_string(), serde_json::json!("Q1"));
        let _s = span_with("quarterly_analysis", attrs);
        let meta = current_span_meta();
        assert_eq!(meta["span"], serde_json::json!("quarterly_analysis"));
        assert_eq!(meta["span_attrs"]["quarter"], serde_json::json!("Q1"));
        assert!(!meta.contains_key("span_hierarchy"));
    }

    #[test]
    fn nested_spans_record_hierarchy_and_depth() {
        let _outer = span("report");
        let _inner = span("margin");
        let meta = current_span_meta();
        assert_eq!(meta["span"], serde_json::json!("margin"));
        assert_eq!(
            meta["span_hierarchy"],
            serde_json::json!(["report", "margin"])
        );
        assert_eq!(meta["span_depth"], serde_json::json!(2));
    }

    #[test]
    fn span_pops_on_drop() {
        {
            let _s = span("transient");
            assert!(!current_span_meta().is_empty());
        }
        assert!(current_span_meta().is_empty());
    }

    #[test]
    fn disabled_tracking_makes_spans_inert() {
        let _cfg = use_provenance_config(disabled());
        let _s = span("ignored");
        assert!(current_span_meta().is_empty());
    }
}

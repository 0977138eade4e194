//! Content-addressed provenance records.
//!
//! Every literal, arithmetic result, conversion, reduction, and calculation
//! result can carry a [`ProvNode`]. A node's id is the SHA-256 hex digest of
//! a canonical serialization of (op, ordered input ids, meta, policy
//! signature) -- equal inputs always produce equal ids, across processes.
//!
//! Nodes hold `Arc` references to their parents, so the lineage graph is
//! acyclic by construction (inputs exist before outputs) and the transitive
//! closure is reachable from any value. Deep chains are cut at the
//! configured history depth: the parent id stays in the wire format but the
//! subtree is released.

pub mod config;
mod export;
mod span;

pub use config::{
    active_config, disabled, set_global_config, use_provenance_config, ConfigScope,
    ProvenanceConfig,
};
pub use export::{explain, graph, to_trace_json};
pub use span::{span, span_with, SpanScope};

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, OnceLock};

use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use crate::policy::Policy;

/// Immutable provenance record.
#[derive(Debug, Clone)]
pub struct ProvNode {
    id: Arc<str>,
    op: String,
    input_ids: Vec<Arc<str>>,
    parents: Vec<Arc<ProvNode>>,
    meta: BTreeMap<String, serde_json::Value>,
    depth: usize,
}

impl ProvNode {
    /// Stable content hash (SHA-256, hex).
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Operation tag: `"literal"`, `"+"`, `"convert"`, `"calc:<name>"`, ...
    pub fn op(&self) -> &str {
        &self.op
    }

    /// Ordered parent ids as recorded in the wire format.
    pub fn input_ids(&self) -> impl Iterator<Item = &str> {
        self.input_ids.iter().map(|id| id.as_ref())
    }

    /// Parent nodes still held in memory. May be fewer than `input_ids`
    /// when history truncation cut a deep chain.
    pub fn parents(&self) -> &[Arc<ProvNode>] {
        &self.parents
    }

    pub fn meta(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.meta
    }

    /// Longest parent chain below this node.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

// ── Id interning ─────────────────────────────────────────────────────

fn intern_table() -> &'static Mutex<HashSet<Arc<str>>> {
    static TABLE: OnceLock<Mutex<HashSet<Arc<str>>>> = OnceLock::new();
    TABLE.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Share storage for duplicate id strings when interning is enabled.
fn intern(id: String) -> Arc<str> {
    if !active_config().intern_ids {
        return Arc::from(id);
    }
    let mut table = intern_table().lock().unwrap_or_else(|e| e.into_inner());
    if let Some(existing) = table.get(id.as_str()) {
        return existing.clone();
    }
    let shared: Arc<str> = Arc::from(id);
    table.insert(shared.clone());
    shared
}

// ── Hashing ──────────────────────────────────────────────────────────

/// Canonical JSON for a meta map. `serde_json::Map` is BTree-backed, so
/// keys serialize in sorted order.
fn canonical_meta(meta: &BTreeMap<String, serde_json::Value>) -> Result<String, serde_json::Error> {
    let map: serde_json::Map<String, serde_json::Value> =
        meta.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    serde_json::to_string(&serde_json::Value::Object(map))
}

/// Content hash over (op, ordered input ids, canonical meta, policy
/// signature).
fn hash_id(op: &str, input_ids: &[Arc<str>], meta_json: &str, policy_sig: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"op:");
    hasher.update(op.as_bytes());
    hasher.update(b";inputs:");
    for (i, id) in input_ids.iter().enumerate() {
        if i > 0 {
            hasher.update(b",");
        }
        hasher.update(id.as_bytes());
    }
    hasher.update(b";meta:");
    hasher.update(meta_json.as_bytes());
    hasher.update(b";policy:");
    hasher.update(policy_sig.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ── Node constructors ────────────────────────────────────────────────

/// Build a literal node for an amount, or `None` when literal tracking is
/// off. The stored value is normalized so `100` and `100.00` hash alike.
pub(crate) fn literal_node(amount: Option<&Decimal>, policy: &Policy) -> Option<Arc<ProvNode>> {
    literal_node_named(amount, policy, None)
}

/// Literal node that additionally records the context input name it was
/// lifted from.
pub(crate) fn literal_node_named(
    amount: Option<&Decimal>,
    policy: &Policy,
    input_name: Option<&str>,
) -> Option<Arc<ProvNode>> {
    let cfg = active_config();
    if !cfg.enabled || !cfg.track_literals {
        return None;
    }
    let mut meta = span::current_span_meta();
    meta.insert(
        "value".to_string(),
        match amount {
            Some(d) => serde_json::Value::String(d.normalize().to_string()),
            None => serde_json::Value::Null,
        },
    );
    if let Some(name) = input_name {
        meta.insert(
            "input_name".to_string(),
            serde_json::Value::String(name.to_string()),
        );
    }
    node_from_parents("literal", Vec::new(), meta, policy, &cfg)
}

/// Attach a calculation node to a result value.
///
/// `inputs` pairs each declared input name with the value that was passed
/// for it; their provenance ids become the node's ordered inputs and land
/// in `meta.input_names`. When calculation tracking is off the result is
/// returned untouched.
pub fn calculation_node(
    name: &str,
    inputs: &[(&str, &crate::value::Value)],
    result: crate::value::Value,
) -> crate::value::Value {
    let cfg = active_config();
    if !cfg.enabled || !cfg.track_calculations {
        return result;
    }
    let mut parents: Vec<Arc<ProvNode>> = Vec::with_capacity(inputs.len());
    let mut input_names = serde_json::Map::new();
    for (input_name, value) in inputs {
        let node = match value.provenance() {
            Some(n) => Some(Arc::clone(n)),
            None => literal_node(value.amount().as_ref(), value.policy()),
        };
        if let Some(n) = node {
            input_names.insert(
                (*input_name).to_string(),
                serde_json::Value::String(n.id().to_string()),
            );
            parents.push(n);
        }
    }
    let mut meta = BTreeMap::new();
    meta.insert(
        "calculation".to_string(),
        serde_json::Value::String(name.to_string()),
    );
    meta.insert(
        "input_names".to_string(),
        serde_json::Value::Object(input_names),
    );
    let policy = result.policy().clone();
    let prov = node_from_parents(&format!("calc:{}", name), parents, meta, &policy, &cfg);
    crate::value::Value::assemble(result.amount(), result.unit().clone(), policy, prov)
}

/// Build an operation node over parent values' provenance.
///
/// Parents without a node of their own (tracking was off when they were
/// built) contribute a literal node on the fly so lineage stays connected.
pub(crate) fn op_node(
    op: &str,
    inputs: &[(Option<&Arc<ProvNode>>, Option<&Decimal>, &Policy)],
    policy: &Policy,
    extra_meta: BTreeMap<String, serde_json::Value>,
) -> Option<Arc<ProvNode>> {
    let cfg = active_config();
    if !cfg.enabled || !cfg.track_operations {
        return None;
    }
    let mut parents: Vec<Arc<ProvNode>> = Vec::with_capacity(inputs.len());
    for (node, amount, input_policy) in inputs {
        match node {
            Some(n) => parents.push(Arc::clone(n)),
            None => {
                if let Some(lit) = literal_node(*amount, input_policy) {
                    parents.push(lit);
                }
            }
        }
    }
    let mut meta = span::current_span_meta();
    meta.extend(extra_meta);
    node_from_parents(op, parents, meta, policy, &cfg)
}

/// Build a node from already-materialized parent nodes (reductions and
/// calculation results, where inputs are gathered by the caller).
pub(crate) fn node_from_parents(
    op: &str,
    parents: Vec<Arc<ProvNode>>,
    mut meta: BTreeMap<String, serde_json::Value>,
    policy: &Policy,
    cfg: &ProvenanceConfig,
) -> Option<Arc<ProvNode>> {
    if !cfg.enabled {
        return None;
    }
    for (key, value) in span::current_span_meta() {
        meta.entry(key).or_insert(value);
    }
    let mut input_ids: Vec<Arc<str>> = Vec::with_capacity(parents.len());
    let mut kept: Vec<Arc<ProvNode>> = Vec::with_capacity(parents.len());
    let mut depth = 0usize;
    for parent in parents {
        input_ids.push(parent.id.clone());
        depth = depth.max(parent.depth + 1);
        // History truncation: keep the id, release the subtree.
        if parent.depth < cfg.max_history_depth {
            kept.push(parent);
        }
    }
    let meta_json = match canonical_meta(&meta) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(op, error = %e, "provenance meta serialization failed");
            if cfg.fail_on_error {
                // Surfacing is the caller's concern; here we still degrade
                // to absent provenance but keep the failure loud.
                tracing::error!(op, "fail_on_error set; dropping provenance node");
            }
            return None;
        }
    };
    let id = hash_id(op, &input_ids, &meta_json, &policy.signature());
    Some(Arc::new(ProvNode {
        id: intern(id),
        op: op.to_string(),
        input_ids,
        parents: kept,
        meta,
        depth,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Policy;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn literal_ids_are_content_addressed() {
        let p = Policy::default();
        let a = literal_node(Some(&dec("100")), &p).unwrap();
        let b = literal_node(Some(&dec("100.00")), &p).unwrap();
        assert_eq!(a.id(), b.id());

        let c = literal_node(Some(&dec("100.50")), &p).unwrap();
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn policy_signature_feeds_the_id() {
        let a = literal_node(Some(&dec("1")), &Policy::default()).unwrap();
        let six_dp = Policy {
            decimal_places: 6,
            ..Policy::default()
        };
        let b = literal_node(Some(&dec("1")), &six_dp).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn none_literal_hashes_distinctly() {
        let p = Policy::default();
        let none = literal_node(None, &p).unwrap();
        let zero = literal_node(Some(&dec("0")), &p).unwrap();
        assert_ne!(none.id(), zero.id());
    }

    #[test]
    fn op_node_orders_inputs() {
        let p = Policy::default();
        let a = literal_node(Some(&dec("1")), &p).unwrap();
        let b = literal_node(Some(&dec("2")), &p).unwrap();
        let ab = node_from_parents(
            "+",
            vec![a.clone(), b.clone()],
            BTreeMap::new(),
            &p,
            &active_config(),
        )
        .unwrap();
        let ba = node_from_parents("+", vec![b, a], BTreeMap::new(), &p, &active_config()).unwrap();
        assert_ne!(ab.id(), ba.id());
        assert_eq!(ab.input_ids().count(), 2);
        assert_eq!(ab.parents().len(), 2);
    }

    #[test]
    fn interning_shares_storage() {
        let p = Policy::default();
        let a = literal_node(Some(&dec("42")), &p).unwrap();
        let b = literal_node(Some(&dec("42")), &p).unwrap();
        // Same content, same interned allocation.
        assert!(Arc::ptr_eq(&a.id, &b.id));
    }

    #[test]
    fn tracking_off_yields_no_nodes() {
        let _cfg = use_provenance_config(disabled());
        assert!(literal_node(Some(&dec("1")), &Policy::default()).is_none());
    }

    #[test]
    fn history_truncation_releases_deep_parents() {
        let cfg = ProvenanceConfig {
            max_history_depth: 2,
            ..ProvenanceConfig::default()
        };
        let _scope = use_provenance_config(cfg.clone());
        let p = Policy::default();
        let mut node = literal_node(Some(&dec("1")), &p).unwrap();
        for _ in 0..4 {
            node = node_from_parents("abs", vec![node], BTreeMap::new(), &p, &cfg).unwrap();
        }
        // The id chain is intact, but parents were cut at the depth cap.
        assert_eq!(node.input_ids().count(), 1);
        assert!(node.parents().is_empty());
    }
}

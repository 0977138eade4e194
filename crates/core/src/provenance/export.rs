//! Provenance graph export: JSON trace, node map, and text explanation.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::config::active_config;
use super::ProvNode;
use crate::error::ValueError;
use crate::value::Value;

/// Collect the transitive closure reachable from a value's provenance,
/// keyed by node id. Values without provenance yield an empty map.
pub fn graph(value: &Value) -> BTreeMap<String, Arc<ProvNode>> {
    let mut nodes = BTreeMap::new();
    if let Some(root) = value.provenance() {
        collect(root, &mut nodes, usize::MAX);
    }
    nodes
}

fn collect(
    node: &Arc<ProvNode>,
    out: &mut BTreeMap<String, Arc<ProvNode>>,
    limit: usize,
) -> bool {
    if out.contains_key(node.id()) {
        return true;
    }
    if out.len() >= limit {
        return false;
    }
    out.insert(node.id().to_string(), Arc::clone(node));
    for parent in node.parents() {
        if !collect(parent, out, limit) {
            return false;
        }
    }
    true
}

/// Export the full lineage of a value as canonical JSON:
/// `{"root": <id>, "nodes": {<id>: {"id", "op", "inputs", "meta"}}}`.
///
/// Key order is canonical (`serde_json::Map` sorts), so equal graphs
/// serialize byte-identically. Exceeding the configured node budget fails
/// with [`ValueError::GraphTooLarge`].
pub fn to_trace_json(value: &Value) -> Result<serde_json::Value, ValueError> {
    let Some(root) = value.provenance() else {
        return Ok(serde_json::json!({ "root": null, "nodes": {} }));
    };
    let limit = active_config().max_graph_size;
    let mut nodes = BTreeMap::new();
    if !collect(root, &mut nodes, limit) {
        return Err(ValueError::GraphTooLarge {
            nodes: nodes.len() + 1,
            limit,
        });
    }
    let mut node_map = serde_json::Map::new();
    for (id, node) in &nodes {
        let inputs: Vec<serde_json::Value> = node
            .input_ids()
            .map(|i| serde_json::Value::String(i.to_string()))
            .collect();
        let meta: serde_json::Map<String, serde_json::Value> = node
            .meta()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        node_map.insert(
            id.clone(),
            serde_json::json!({
                "id": id,
                "op": node.op(),
                "inputs": inputs,
                "meta": meta,
            }),
        );
    }
    Ok(serde_json::json!({
        "root": root.id(),
        "nodes": node_map,
    }))
}

/// Render a deterministic text tree describing how a value was computed.
/// Recursion stops at literals, truncated parents, or `max_depth`.
pub fn explain(value: &Value, max_depth: usize) -> String {
    let mut out = format!("Value: {}\n", value);
    match value.provenance() {
        Some(root) => explain_node(root, 0, max_depth, &mut out),
        None => out.push_str("(no provenance)\n"),
    }
    out
}

fn explain_node(node: &Arc<ProvNode>, depth: usize, max_depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    if depth > max_depth {
        out.push_str(&indent);
        out.push_str("... (max depth reached)\n");
        return;
    }
    if node.op() == "literal" {
        let shown = match node.meta().get("value") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Null) | None => "none".to_string(),
            Some(other) => other.to_string(),
        };
        out.push_str(&format!("{}literal {}\n", indent, shown));
        return;
    }
    let mut line = format!("{}{}", indent, node.op());
    let mut hints = Vec::new();
    for key in ["calculation", "input_name", "span", "from", "to"] {
        if let Some(serde_json::Value::String(s)) = node.meta().get(key) {
            hints.push(format!("{}: {}", key, s));
        }
    }
    if !hints.is_empty() {
        line.push_str(&format!(" ({})", hints.join(", ")));
    }
    line.push('\n');
    out.push_str(&line);
    let materialized = node.parents().len();
    for parent in node.parents() {
        explain_node(parent, depth + 1, max_depth, out);
    }
    // Truncated parents are listed by id so the record stays complete.
    for id in node.input_ids().skip(materialized) {
        out.push_str(&format!("{}  [truncated] {}\n", indent, &id[..16.min(id.len())]));
    }
}

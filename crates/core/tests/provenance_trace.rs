//! Provenance integration: content-address stability, span annotation,
//! export shape, and determinism across independent constructions.

use std::collections::BTreeMap;

use tally_core::{
    explain, graph, money_in, span, span_with, to_trace_json, use_provenance_config,
    ProvenanceConfig, Unit, Value,
};

fn build_profit() -> Value {
    money_in("USD", "100")
        .sub(&money_in("USD", "60"))
        .unwrap()
}

#[test]
fn independent_runs_share_root_ids() {
    let a = build_profit();
    let b = build_profit();
    assert_eq!(a.provenance_id(), b.provenance_id());

    let ja = serde_json::to_string(&to_trace_json(&a).unwrap()).unwrap();
    let jb = serde_json::to_string(&to_trace_json(&b).unwrap()).unwrap();
    assert_eq!(ja, jb);
}

#[test]
fn different_inputs_different_ids() {
    let a = build_profit();
    let b = money_in("USD", "100")
        .sub(&money_in("USD", "61"))
        .unwrap();
    assert_ne!(a.provenance_id(), b.provenance_id());
}

#[test]
fn trace_shape_matches_wire_format() {
    let profit = build_profit();
    let trace = to_trace_json(&profit).unwrap();

    let root = trace["root"].as_str().unwrap();
    let nodes = trace["nodes"].as_object().unwrap();
    assert_eq!(nodes.len(), 3);

    let root_node = &nodes[root];
    assert_eq!(root_node["id"], root);
    assert_eq!(root_node["op"], "-");
    let inputs = root_node["inputs"].as_array().unwrap();
    assert_eq!(inputs.len(), 2);
    for input in inputs {
        let id = input.as_str().unwrap();
        assert_eq!(nodes[id]["op"], "literal");
    }
    // Literal meta records the normalized value.
    let first = inputs[0].as_str().unwrap();
    assert_eq!(nodes[first]["meta"]["value"], "100");
}

#[test]
fn graph_returns_the_node_map() {
    let profit = build_profit();
    let map = graph(&profit);
    assert_eq!(map.len(), 3);
    let root_id = profit.provenance_id().unwrap();
    assert_eq!(map[root_id].op(), "-");
}

#[test]
fn span_annotates_nodes_created_inside() {
    let mut attrs = BTreeMap::new();
    attrs.insert("quarter".to_string(), serde_json::json!("Q1"));
    let profit = {
        let _span = span_with("quarterly_analysis", attrs);
        build_profit()
    };
    let node = profit.provenance().unwrap();
    assert_eq!(node.meta()["span"], serde_json::json!("quarterly_analysis"));
    assert_eq!(
        node.meta()["span_attrs"]["quarter"],
        serde_json::json!("Q1")
    );

    // Outside the span, no annotation.
    let plain = build_profit();
    assert!(!plain.provenance().unwrap().meta().contains_key("span"));
    assert_ne!(profit.provenance_id(), plain.provenance_id());
}

#[test]
fn nested_spans_record_hierarchy() {
    let profit = {
        let _outer = span("report");
        let _inner = span("margin_section");
        build_profit()
    };
    let meta = profit.provenance().unwrap().meta();
    assert_eq!(
        meta["span_hierarchy"],
        serde_json::json!(["report", "margin_section"])
    );
    assert_eq!(meta["span_depth"], serde_json::json!(2));
}

#[test]
fn explain_text_tree() {
    let profit = build_profit();
    let text = explain(&profit, 5);
    assert!(text.starts_with("Value: 40.00"));
    assert!(text.contains("literal 100"));
    assert!(text.contains("literal 60"));
    assert_eq!(text, explain(&profit, 5));
}

#[test]
fn conversion_and_percent_ops_appear_in_lineage() {
    let margin = money_in("USD", "40")
        .div(&money_in("USD", "100"))
        .unwrap();
    let pct = margin.as_percentage();
    let node = pct.provenance().unwrap();
    assert_eq!(node.op(), "as_percentage");
    assert_eq!(node.parents()[0].op(), "/");
}

#[test]
fn disabling_operations_still_tracks_literals() {
    let cfg = ProvenanceConfig {
        track_operations: false,
        ..ProvenanceConfig::default()
    };
    let _scope = use_provenance_config(cfg);
    let lit = money_in("USD", "5");
    assert!(lit.provenance().is_some());
    let sum = lit.add(&money_in("USD", "5")).unwrap();
    assert!(sum.provenance().is_none());
}

#[test]
fn calc_like_meta_survives_export_roundtrip() {
    let profit = {
        let _span = span("export_roundtrip_span");
        build_profit()
    };
    let trace = to_trace_json(&profit).unwrap();
    let reparsed: serde_json::Value =
        serde_json::from_str(&serde_json::to_string(&trace).unwrap()).unwrap();
    assert_eq!(reparsed, trace);
    let root = reparsed["root"].as_str().unwrap();
    assert_eq!(
        reparsed["nodes"][root]["meta"]["span"],
        serde_json::json!("export_roundtrip_span")
    );
}

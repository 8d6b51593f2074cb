//! Result merger for rewritten (kindless-expanded) queries (spec §4.10).
//!
//! Undoes what `rewrite.rs` did: strips `__exp__<i>` suffixes back to the
//! user-visible variable name, unions per-branch data, and re-merges
//! aggregate entries and graph identifiers. Runs unconditionally after
//! execution — a query that was never rewritten has no `__exp__` keys, so
//! every step here is a no-op for it.

use crate::graph::Graph;
use serde_json::Value;
use std::collections::HashMap;

pub fn merge_data(data: HashMap<String, Vec<Value>>) -> HashMap<String, Vec<Value>> {
    let mut merged: HashMap<String, Vec<Value>> = HashMap::new();
    for (key, values) in data {
        let base = strip_exp_suffix(&key);
        let entry = merged.entry(base).or_default();
        for v in values {
            if !entry.contains(&v) {
                entry.push(v);
            }
        }
    }
    merged
}

fn strip_exp_suffix(key: &str) -> String {
    match key.find("__exp__") {
        Some(idx) => key[..idx].to_string(),
        None => key.to_string(),
    }
}

/// An aggregate key the rewriter stamped, of the form
/// `__exp__<agg>__<variable.path>__<branch index>`.
struct ParsedAggKey {
    agg: String,
    name: String,
}

fn parse_exp_agg_key(key: &str) -> Option<ParsedAggKey> {
    let rest = key.strip_prefix("__exp__")?;
    let mut parts = rest.splitn(3, "__");
    let agg = parts.next()?.to_string();
    let name = parts.next()?.to_string();
    Some(ParsedAggKey { agg, name })
}

pub fn merge_aggregate(aggregate: HashMap<String, Value>) -> HashMap<String, Value> {
    let mut merged: HashMap<String, Value> = HashMap::new();
    for (key, value) in aggregate {
        let Some(parsed) = parse_exp_agg_key(&key) else {
            merged.insert(key, value);
            continue;
        };
        let out_key = format!("{}:{}", parsed.agg, parsed.name);
        merged
            .entry(out_key)
            .and_modify(|existing| *existing = combine_aggregate(&parsed.agg, existing, &value))
            .or_insert(value);
    }
    merged
}

fn combine_aggregate(agg: &str, existing: &Value, incoming: &Value) -> Value {
    match agg {
        "sum" => {
            let a = existing.as_f64().unwrap_or(0.0);
            let b = incoming.as_f64().unwrap_or(0.0);
            serde_json::Number::from_f64(a + b).map(Value::Number).unwrap_or(Value::Null)
        }
        "count" => {
            let a = existing.as_i64().unwrap_or(0);
            let b = incoming.as_i64().unwrap_or(0);
            Value::Number((a + b).into())
        }
        _ => {
            let mut list = match existing {
                Value::Array(a) => a.clone(),
                other => vec![other.clone()],
            };
            list.push(incoming.clone());
            Value::Array(list)
        }
    }
}

pub fn merge_graph(mut graph: Graph) -> Graph {
    for node in &mut graph.nodes {
        node.id = strip_exp_suffix(&node.id);
    }
    let mut merged = Graph::new();
    for node in graph.nodes {
        merged.add_node(node);
    }
    for edge in graph.edges {
        let from = strip_exp_suffix(&edge.from);
        let to = strip_exp_suffix(&edge.to);
        merged.add_edge(&from, &to, &edge.edge_type);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_data_unions_and_dedupes_by_branch() {
        let mut data = HashMap::new();
        data.insert("x__exp__0".to_string(), vec![json!({"name": "pod-a"})]);
        data.insert("x__exp__1".to_string(), vec![json!({"name": "pod-b"}), json!({"name": "pod-a"})]);
        let merged = merge_data(data);
        assert_eq!(merged["x"].len(), 2);
    }

    #[test]
    fn merge_aggregate_sums_across_branches() {
        let mut agg = HashMap::new();
        agg.insert("__exp__sum__p.spec.replicas__0".to_string(), json!(2.0));
        agg.insert("__exp__sum__p.spec.replicas__1".to_string(), json!(3.0));
        let merged = merge_aggregate(agg);
        assert_eq!(merged["sum:p.spec.replicas"], json!(5.0));
    }
}

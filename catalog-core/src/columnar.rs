//! Columnar Intermediate (spec §4.8): the ORDER BY / SKIP / LIMIT layer.
//!
//! RETURN's nested-document projection is lifted into rows here, sorted and
//! sliced, then lowered back to nested documents. One row models one
//! "pattern-match group" (spec §3 invariant: "within a single pattern-match
//! group, each variable corresponds to at most one row") — the executor
//! builds row-aligned per-variable result vectors during MATCH, so a row
//! index already *is* a group index; this module doesn't need its own
//! grouping pass.

use crate::graph::Graph;
use catalog_ql::ast::{JsonPath, OrderByItem, SortDirection};
use catalog_ql::printer::print_json_path;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;

/// One column per projected `(variable, path)` pair, named via the same
/// `print_json_path` rendering used for DSL round-tripping — e.g. `p.metadata.name`.
pub fn column_name(path: &JsonPath) -> String {
    print_json_path(path)
}

#[derive(Debug, Clone, Default)]
pub struct TabularResult {
    pub columns: Vec<String>,
    pub rows: Vec<HashMap<String, Value>>,
    pub node_map: HashMap<String, Vec<usize>>,
    pub graph: Graph,
}

impl TabularResult {
    pub fn new(columns: Vec<String>, rows: Vec<HashMap<String, Value>>, node_map: HashMap<String, Vec<usize>>, graph: Graph) -> Self {
        TabularResult {
            columns,
            rows,
            node_map,
            graph,
        }
    }

    /// Stable sort by each `OrderByItem` in sequence; earlier items are
    /// primary, later ones break ties (spec §4.8 Sort).
    pub fn sort(&mut self, order_by: &[OrderByItem]) {
        if order_by.is_empty() {
            return;
        }
        let keys: Vec<(String, SortDirection)> = order_by
            .iter()
            .map(|item| (column_name(&item.path), item.direction))
            .collect();
        let mut indexed: Vec<usize> = (0..self.rows.len()).collect();
        indexed.sort_by(|&a, &b| {
            for (col, dir) in &keys {
                let va = self.rows[a].get(col);
                let vb = self.rows[b].get(col);
                let ord = compare_optional(va, vb);
                let ord = match dir {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
        self.reorder(&indexed);
    }

    fn reorder(&mut self, order: &[usize]) {
        let old_rows = std::mem::take(&mut self.rows);
        let new_rows: Vec<_> = order.iter().map(|&i| old_rows[i].clone()).collect();
        let position_of: HashMap<usize, usize> = order.iter().enumerate().map(|(new, &old)| (old, new)).collect();
        let mut new_node_map = HashMap::new();
        for (var, indices) in &self.node_map {
            let remapped: Vec<usize> = indices.iter().filter_map(|i| position_of.get(i).copied()).collect();
            new_node_map.insert(var.clone(), remapped);
        }
        self.rows = new_rows;
        self.node_map = new_node_map;
    }

    /// Discards leading rows, then rebuilds `node_map` and filters
    /// `graph.nodes`/`graph.edges` to the surviving `(kind, name)` pairs.
    pub fn skip(&mut self, n: u64) {
        if n == 0 {
            return;
        }
        let n = (n as usize).min(self.rows.len());
        let keep: Vec<usize> = (n..self.rows.len()).collect();
        self.reorder(&keep);
        self.prune_graph();
    }

    pub fn limit(&mut self, n: u64) {
        let n = (n as usize).min(self.rows.len());
        let keep: Vec<usize> = (0..n).collect();
        self.reorder(&keep);
        self.prune_graph();
    }

    fn prune_graph(&mut self) {
        let surviving_names: std::collections::HashSet<String> = self
            .rows
            .iter()
            .flat_map(|row| row.values())
            .filter_map(|v| v.as_str())
            .map(str::to_string)
            .collect();
        self.graph.retain_nodes(|node| surviving_names.contains(&node.name));
    }

    /// Lowers rows back into nested document fields keyed by variable,
    /// reversing [`column_name`]'s dotted-path flattening. The `__name`
    /// carrier column (if present) is promoted to `metadata.name`.
    pub fn into_documents(self) -> HashMap<String, Vec<Value>> {
        let mut out: HashMap<String, Vec<Value>> = HashMap::new();
        for row in &self.rows {
            let mut per_variable: HashMap<String, Value> = HashMap::new();
            for (col, value) in row {
                let Some((var, rest)) = col.split_once('.') else {
                    continue;
                };
                let doc = per_variable.entry(var.to_string()).or_insert_with(|| Value::Object(Default::default()));
                set_nested(doc, rest, value.clone());
            }
            for (var, doc) in per_variable {
                out.entry(var).or_default().push(doc);
            }
        }
        out
    }
}

fn set_nested(doc: &mut Value, dotted_path: &str, value: Value) {
    let segments: Vec<&str> = dotted_path.split('.').collect();
    let Some((last, prefix)) = segments.split_last() else {
        return;
    };
    let mut cursor = doc;
    for seg in prefix {
        if !cursor.is_object() {
            *cursor = Value::Object(Default::default());
        }
        cursor = cursor
            .as_object_mut()
            .expect("just ensured object")
            .entry(seg.to_string())
            .or_insert_with(|| Value::Object(Default::default()));
    }
    if !cursor.is_object() {
        *cursor = Value::Object(Default::default());
    }
    cursor.as_object_mut().expect("just ensured object").insert(last.to_string(), value);
}

fn compare_optional(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a.filter(|v| !v.is_null()), b.filter(|v| !v.is_null())) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare_values(a, b),
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_ql::ast::PathStep;
    use serde_json::json;

    fn path(var: &str, field: &str) -> JsonPath {
        JsonPath {
            variable: var.to_string(),
            steps: vec![PathStep::Key(field.to_string())],
        }
    }

    fn row(name: &str) -> HashMap<String, Value> {
        let mut r = HashMap::new();
        r.insert("p.name".to_string(), json!(name));
        r
    }

    #[test]
    fn sort_then_skip_then_limit_matches_scenario_six() {
        let mut table = TabularResult::new(
            vec!["p.name".to_string()],
            vec![row("z"), row("a"), row("m")],
            HashMap::new(),
            Graph::new(),
        );
        table.sort(&[OrderByItem {
            path: path("p", "name"),
            direction: SortDirection::Asc,
        }]);
        table.skip(1);
        table.limit(1);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0]["p.name"], json!("m"));
    }

    #[test]
    fn into_documents_reconstructs_nested_field() {
        let mut rows = Vec::new();
        let mut r = HashMap::new();
        r.insert("d.metadata.name".to_string(), json!("nginx"));
        rows.push(r);
        let table = TabularResult::new(vec!["d.metadata.name".to_string()], rows, HashMap::new(), Graph::new());
        let docs = table.into_documents();
        assert_eq!(docs["d"][0]["metadata"]["name"], json!("nginx"));
    }
}

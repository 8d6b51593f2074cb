//! RETURN clause execution (spec §4.5 RETURN, §4.6 arithmetic, §4.8 columnar).
//!
//! Row identity for ORDER BY/SKIP/LIMIT spans every MATCH variable, not just
//! the ones actually projected — two resources joined by a relationship but
//! never mentioned in RETURN still belong to the same pattern-match group,
//! and SKIP/LIMIT must drop or keep whole groups. [`build_rows`] folds
//! [`super::match_exec::JoinEdge`]s into one `{variable -> index}` map per
//! group; [`build_table`] lifts the ORDER BY columns (plus a bookkeeping
//! `__row__<var>` index column) into a [`TabularResult`] so the existing
//! sort/skip/limit machinery in `columnar.rs` does the actual group-level
//! work, and [`recover_rows`] reads the bookkeeping columns back out once
//! that's done. The final per-variable document is then built directly from
//! the surviving resources rather than through `TabularResult::into_documents`
//! — that reversal is designed for flat `<var>.<path>` columns, but this
//! engine's aliasing rule (alias, or the path's last segment, or `"$"` for a
//! bare variable) doesn't always produce a column name that round-trips
//! through a dotted-path split, so RETURN projects directly off the
//! resources the rows point to.

use super::match_exec::MatchOutcome;
use super::QueryResult;
use crate::columnar::{self, TabularResult};
use crate::errors::{EngineError, Result};
use crate::graph::Graph;
use crate::quantity::{Cpu, Memory};
use crate::resource::{self, Resource};
use catalog_ql::ast::{AggKind, JsonPath, PathStep, ReturnClause, ReturnItem, ReturnTarget};
use catalog_ql::printer::print_json_path;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

pub fn execute(ret: &ReturnClause, outcome: &MatchOutcome, result: &mut QueryResult) -> Result<()> {
    let return_vars = collect_variables(ret);
    let mut group_vars: Vec<String> = outcome.filtered.keys().cloned().collect();
    group_vars.sort();

    let rows = build_rows(&group_vars, &outcome.filtered, &outcome.join_edges);
    let mut table = build_table(&rows, &group_vars, ret, &outcome.filtered);
    table.sort(&ret.order_by);
    if let Some(skip) = ret.skip {
        table.skip(skip);
    }
    if let Some(limit) = ret.limit {
        table.limit(limit);
    }
    let surviving_rows = recover_rows(&table, &group_vars);

    let mut data: HashMap<String, Vec<Value>> = HashMap::new();
    for var in &return_vars {
        let implicit_name = !has_own_name_item(ret, var);
        let mut docs = Vec::with_capacity(surviving_rows.len());
        for row in &surviving_rows {
            let Some(&idx) = row.get(var) else { continue };
            let Some(resource) = outcome.filtered.get(var).and_then(|list| list.get(idx)) else {
                continue;
            };
            docs.push(project_document(ret, var, resource, implicit_name));
        }
        data.insert(var.clone(), docs);
    }

    let mut aggregate = Map::new();
    for item in &ret.items {
        let ReturnTarget::Aggregate { agg, path } = &item.target else {
            continue;
        };
        let resources: Vec<&Resource> = surviving_rows
            .iter()
            .filter_map(|row| {
                let idx = *row.get(&path.variable)?;
                outcome.filtered.get(&path.variable)?.get(idx)
            })
            .collect();
        let key = item.alias.clone().unwrap_or_else(|| aggregate_key(*agg, path));
        let value = compute_aggregate(*agg, path, &resources)?;
        aggregate.insert(key, value);
    }

    for (var, docs) in data {
        result.data.insert(var, Value::Array(docs));
    }
    if !aggregate.is_empty() {
        result.data.insert("aggregate".to_string(), Value::Object(aggregate));
    }

    result.graph = prune_graph(outcome.graph.clone(), &surviving_rows, &group_vars, &outcome.filtered);
    Ok(())
}

fn collect_variables(ret: &ReturnClause) -> Vec<String> {
    let mut vars = Vec::new();
    for item in &ret.items {
        let v = match &item.target {
            ReturnTarget::Path(p) => p.variable.clone(),
            ReturnTarget::Aggregate { path, .. } => path.variable.clone(),
        };
        if !vars.contains(&v) {
            vars.push(v);
        }
    }
    vars
}

/// One `{variable -> index into filtered[variable]}` map per pattern-match
/// group. Edges are folded left to right, rejecting a candidate pair whose
/// variable already has a (different) index bound earlier in the fold
/// (spec §4.8: "emit one row per edge ... cross-joined"). Variables never
/// touched by a relationship (an isolated MATCH node, or the whole pattern
/// when there are no relationships at all) are cross-joined in afterward.
fn build_rows(
    vars: &[String],
    filtered: &HashMap<String, Vec<Resource>>,
    join_edges: &[super::match_exec::JoinEdge],
) -> Vec<HashMap<String, usize>> {
    let mut rows: Vec<HashMap<String, usize>> = Vec::new();
    let mut covered: HashSet<String> = HashSet::new();

    for (i, edge) in join_edges.iter().enumerate() {
        covered.insert(edge.left_var.clone());
        covered.insert(edge.right_var.clone());
        if i == 0 {
            rows = edge
                .pairs
                .iter()
                .map(|&(l, r)| {
                    let mut row = HashMap::new();
                    row.insert(edge.left_var.clone(), l);
                    row.insert(edge.right_var.clone(), r);
                    row
                })
                .collect();
            continue;
        }
        let mut next = Vec::new();
        for row in &rows {
            for &(l, r) in &edge.pairs {
                let left_ok = row.get(&edge.left_var).is_none_or(|&v| v == l);
                let right_ok = row.get(&edge.right_var).is_none_or(|&v| v == r);
                if left_ok && right_ok {
                    let mut merged = row.clone();
                    merged.insert(edge.left_var.clone(), l);
                    merged.insert(edge.right_var.clone(), r);
                    next.push(merged);
                }
            }
        }
        rows = next;
    }

    for var in vars {
        if covered.contains(var) {
            continue;
        }
        let list = filtered.get(var).map(Vec::len).unwrap_or(0);
        if rows.is_empty() && covered.is_empty() {
            rows = (0..list)
                .map(|idx| {
                    let mut row = HashMap::new();
                    row.insert(var.clone(), idx);
                    row
                })
                .collect();
        } else if rows.is_empty() {
            // Every covered variable's edges produced zero surviving pairs;
            // an isolated variable can't resurrect the group.
        } else {
            let mut next = Vec::with_capacity(rows.len() * list.max(1));
            for row in &rows {
                for idx in 0..list {
                    let mut merged = row.clone();
                    merged.insert(var.clone(), idx);
                    next.push(merged);
                }
            }
            rows = next;
        }
        covered.insert(var.clone());
    }

    rows
}

/// Lifts ORDER BY columns plus a `__row__<var>` bookkeeping column (the
/// group's index into `filtered[var]`, so the group can be recovered after
/// sort/skip/limit) into a [`TabularResult`]. `graph` is left empty —
/// `TabularResult::{skip,limit}`'s own graph-pruning is redundant with
/// [`prune_graph`] below, which works from resource identity instead of the
/// node-name string matching `columnar.rs` uses.
fn build_table(
    rows: &[HashMap<String, usize>],
    vars: &[String],
    ret: &ReturnClause,
    filtered: &HashMap<String, Vec<Resource>>,
) -> TabularResult {
    let mut columns: Vec<String> = ret.order_by.iter().map(|item| columnar::column_name(&item.path)).collect();
    columns.extend(vars.iter().map(|v| format!("__row__{v}")));

    let mut table_rows = Vec::with_capacity(rows.len());
    let mut node_map: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, row) in rows.iter().enumerate() {
        let mut table_row: HashMap<String, Value> = HashMap::new();
        for item in &ret.order_by {
            let Some(&idx) = row.get(&item.path.variable) else { continue };
            let Some(resource) = filtered.get(&item.path.variable).and_then(|list| list.get(idx)) else {
                continue;
            };
            let value = resource::get_one(resource, &item.path.steps).unwrap_or(Value::Null);
            table_row.insert(columnar::column_name(&item.path), value);
        }
        for (var, idx) in row {
            table_row.insert(format!("__row__{var}"), Value::Number((*idx as u64).into()));
            node_map.entry(var.clone()).or_default().push(i);
        }
        table_rows.push(table_row);
    }

    TabularResult::new(columns, table_rows, node_map, Graph::new())
}

fn recover_rows(table: &TabularResult, vars: &[String]) -> Vec<HashMap<String, usize>> {
    table
        .rows
        .iter()
        .map(|row| {
            let mut out = HashMap::new();
            for var in vars {
                if let Some(idx) = row.get(&format!("__row__{var}")).and_then(Value::as_u64) {
                    out.insert(var.clone(), idx as usize);
                }
            }
            out
        })
        .collect()
}

fn prune_graph(
    mut graph: Graph,
    surviving_rows: &[HashMap<String, usize>],
    vars: &[String],
    filtered: &HashMap<String, Vec<Resource>>,
) -> Graph {
    let mut live: HashSet<(String, String)> = HashSet::new();
    for row in surviving_rows {
        for var in vars {
            let Some(&idx) = row.get(var) else { continue };
            let Some(resource) = filtered.get(var).and_then(|list| list.get(idx)) else { continue };
            live.insert((
                resource::kind(resource).unwrap_or_default().to_string(),
                resource::name(resource).unwrap_or_default().to_string(),
            ));
        }
    }
    graph.retain_nodes(|node| live.contains(&(node.kind.clone(), node.name.clone())));
    graph
}

/// The default output key for an unaliased item: `"$"` for a bare variable
/// (spec §4.5: "a bare variable uses `$` as the key"), otherwise the path's
/// final segment.
fn default_key(path: &JsonPath) -> String {
    match path.steps.last() {
        None => "$".to_string(),
        Some(PathStep::Key(k)) => k.clone(),
        Some(PathStep::Index(i)) => i.to_string(),
        Some(PathStep::Wildcard) => "*".to_string(),
    }
}

fn item_key(item: &ReturnItem, path: &JsonPath) -> String {
    item.alias.clone().unwrap_or_else(|| default_key(path))
}

fn has_own_name_item(ret: &ReturnClause, var: &str) -> bool {
    ret.items.iter().any(|item| match &item.target {
        ReturnTarget::Path(p) if p.variable == var => item_key(item, p) == "name",
        _ => false,
    })
}

/// A bare-variable path (`RETURN d`) yields the whole resource under `"$"`;
/// every other path yields the value(s) at that path under its key, plus
/// (spec: "append an implicit metadata.name ... per variable") a `"name"`
/// field mirroring `metadata.name`, unless the query already produced a
/// `"name"` key of its own for this variable.
fn project_document(ret: &ReturnClause, var: &str, resource: &Resource, implicit_name: bool) -> Value {
    let mut doc = Map::new();
    for item in &ret.items {
        let ReturnTarget::Path(path) = &item.target else { continue };
        if path.variable != var {
            continue;
        }
        let key = item_key(item, path);
        let value = project_path(resource, path);
        doc.insert(key, value);
    }
    if implicit_name {
        if let Some(name) = resource::name(resource) {
            doc.entry("name".to_string()).or_insert_with(|| Value::String(name.to_string()));
        }
    }
    Value::Object(doc)
}

fn project_path(resource: &Resource, path: &JsonPath) -> Value {
    if path.steps.is_empty() {
        return resource.clone();
    }
    let has_wildcard = path.steps.iter().any(|s| matches!(s, PathStep::Wildcard));
    let values = resource::get_all(resource, &path.steps);
    if has_wildcard {
        Value::Array(values)
    } else {
        values.into_iter().next().unwrap_or(Value::Null)
    }
}

fn aggregate_key(agg: AggKind, path: &JsonPath) -> String {
    let agg_name = match agg {
        AggKind::Count => "count",
        AggKind::Sum => "sum",
    };
    format!("{agg_name}:{}", print_json_path(path))
}

fn compute_aggregate(agg: AggKind, path: &JsonPath, resources: &[&Resource]) -> Result<Value> {
    match agg {
        AggKind::Count => Ok(Value::Number(resources.len().into())),
        AggKind::Sum => sum_path(path, resources),
    }
}

enum QuantityKind {
    Cpu,
    Memory,
}

/// CPU/memory paths are recognized by their final two segments (spec §4.5:
/// "For paths inside resources.limits.cpu|resources.requests.cpu ... for
/// ...memory paths"), not by a hardcoded full path, so the rule still
/// applies however deep the wildcard prefix in front of them is.
fn quantity_kind(path: &JsonPath) -> Option<QuantityKind> {
    let mut rev = path.steps.iter().rev();
    let Some(PathStep::Key(last)) = rev.next() else {
        return None;
    };
    let is_container_field = matches!(rev.next(), Some(PathStep::Key(k)) if k == "requests" || k == "limits");
    if !is_container_field {
        return None;
    }
    match last.as_str() {
        "cpu" => Some(QuantityKind::Cpu),
        "memory" => Some(QuantityKind::Memory),
        _ => None,
    }
}

fn as_quantity_string(value: &Value) -> Result<&str> {
    value
        .as_str()
        .ok_or_else(|| EngineError::arithmetic(format!("expected a quantity string, found {value}")))
}

/// Sums a path across every surviving resource for its variable. CPU and
/// memory paths get domain-aware addition (milli-CPU / bytes, §4.6); every
/// other numeric path is summed as a plain float. A wildcard in the path is
/// expected to multiply out inside a container list — a non-wildcard path
/// that still yields more than one value per resource is the "mixed scalar
/// and wildcard-slice result outside container context" case spec §9's open
/// questions flags, resolved here (see SPEC_FULL.md §11) as a hard error.
fn sum_path(path: &JsonPath, resources: &[&Resource]) -> Result<Value> {
    let has_wildcard = path.steps.iter().any(|s| matches!(s, PathStep::Wildcard));
    let kind = quantity_kind(path);

    match kind {
        Some(QuantityKind::Cpu) => {
            let mut total = 0i64;
            for resource in resources {
                let values = resource::get_all(resource, &path.steps);
                check_arity(&values, has_wildcard, path)?;
                for value in &values {
                    total += Cpu::parse(as_quantity_string(value)?)?.0;
                }
            }
            Ok(Value::String(Cpu(total).format()))
        }
        Some(QuantityKind::Memory) => {
            let mut total = 0i64;
            for resource in resources {
                let values = resource::get_all(resource, &path.steps);
                check_arity(&values, has_wildcard, path)?;
                for value in &values {
                    total += Memory::parse(as_quantity_string(value)?)?.0;
                }
            }
            Ok(Value::String(Memory(total).format()))
        }
        None => {
            let mut total = 0.0;
            for resource in resources {
                let values = resource::get_all(resource, &path.steps);
                check_arity(&values, has_wildcard, path)?;
                for value in &values {
                    total += value
                        .as_f64()
                        .or_else(|| value.as_str().and_then(|s| s.parse::<f64>().ok()))
                        .ok_or_else(|| EngineError::arithmetic(format!("SUM requires a numeric value, found {value}")))?;
                }
            }
            Ok(serde_json::Number::from_f64(total).map(Value::Number).unwrap_or(Value::Null))
        }
    }
}

fn check_arity(values: &[Value], has_wildcard: bool, path: &JsonPath) -> Result<()> {
    if !has_wildcard && values.len() > 1 {
        return Err(EngineError::arithmetic(format!(
            "SUM over {} produced multiple values outside container-quantity context",
            print_json_path(path)
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_catalog;
    use crate::config::EngineConfig;
    use crate::executor::Executor;
    use crate::provider::InMemoryProvider;
    use serde_json::json;

    async fn run(provider: &InMemoryProvider, src: &str) -> QueryResult {
        let catalog = default_catalog();
        let config = EngineConfig::default();
        let executor = Executor::new(provider, &catalog, &config);
        let query = catalog_ql::parse(src).unwrap();
        executor.execute(&query).await.unwrap()
    }

    #[tokio::test]
    async fn simple_match_return_projects_metadata_name() {
        let provider = InMemoryProvider::new();
        provider.seed(
            "Deployment",
            vec![
                json!({"kind": "Deployment", "metadata": {"name": "nginx"}}),
                json!({"kind": "Deployment", "metadata": {"name": "api"}}),
            ],
        );
        let result = run(&provider, "MATCH (d:Deployment) RETURN d.metadata.name").await;
        let mut names: Vec<String> = result.data["d"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["name"].as_str().unwrap().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["api", "nginx"]);
        assert_eq!(result.graph.nodes.len(), 2);
    }

    #[tokio::test]
    async fn sum_cpu_across_containers() {
        let provider = InMemoryProvider::new();
        let pod = |name: &str| {
            json!({
                "kind": "Pod",
                "metadata": {"name": name},
                "spec": {"containers": [
                    {"resources": {"requests": {"cpu": "500m"}}},
                    {"resources": {"requests": {"cpu": "1"}}},
                ]},
            })
        };
        provider.seed("Pod", vec![pod("a"), pod("b")]);
        let result = run(
            &provider,
            "MATCH (p:Pod) RETURN SUM { p.spec.containers[*].resources.requests.cpu }",
        )
        .await;
        assert_eq!(result.data["aggregate"]["sum:p.spec.containers[*].resources.requests.cpu"], json!("3"));
    }

    #[tokio::test]
    async fn order_by_skip_limit_matches_scenario_six() {
        let provider = InMemoryProvider::new();
        provider.seed(
            "Pod",
            vec![
                json!({"kind": "Pod", "metadata": {"name": "z"}}),
                json!({"kind": "Pod", "metadata": {"name": "a"}}),
                json!({"kind": "Pod", "metadata": {"name": "m"}}),
            ],
        );
        let result = run(
            &provider,
            "MATCH (p:Pod) RETURN p.metadata.name ORDER BY p.metadata.name SKIP 1 LIMIT 1",
        )
        .await;
        let names: Vec<&str> = result.data["p"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["m"]);
    }

    #[tokio::test]
    async fn bare_variable_returns_whole_resource_under_dollar_key() {
        let provider = InMemoryProvider::new();
        provider.seed("Pod", vec![json!({"kind": "Pod", "metadata": {"name": "p1"}})]);
        let result = run(&provider, "MATCH (p:Pod) RETURN p").await;
        let docs = result.data["p"].as_array().unwrap();
        assert_eq!(docs[0]["$"]["metadata"]["name"], json!("p1"));
        assert_eq!(docs[0]["name"], json!("p1"));
    }
}

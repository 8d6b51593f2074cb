//! Shared MATCH execution core (spec §4.5 MATCH, §4.3 fixpoint).
//!
//! [`run`] backs both the top-level MATCH clause and, seeded with a
//! `preset`/`kind_overrides` pair, the sub-match reference pattern (spec §3:
//! "kind is inherited" — a sub-match reference node carries no kind of its
//! own). [`execute`] is the unseeded entry point `executor/mod.rs` calls.

use super::submatch;
use super::Executor;
use crate::catalog::RelationshipRule;
use crate::errors::{EngineError, Result};
use crate::graph::{Graph, Node};
use crate::provider::ListQuery;
use crate::resource::Resource;
use catalog_ql::ast::{
    Direction, Filter, MatchClause, NodePattern, PatternChain, Value as AstValue,
};
use std::collections::HashMap;

/// One resolved join between two MATCH variables, surviving the fixpoint's
/// final pass — the row basis for RETURN's columnar projection (spec §4.8:
/// "one row per edge ... cross-joined").
#[derive(Debug, Clone)]
pub struct JoinEdge {
    pub left_var: String,
    pub right_var: String,
    pub pairs: Vec<(usize, usize)>,
}

#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    pub filtered: HashMap<String, Vec<Resource>>,
    pub graph: Graph,
    pub join_edges: Vec<JoinEdge>,
}

struct RelEdge {
    left_var: String,
    left_kind: String,
    right_var: String,
    right_kind: String,
    direction: Direction,
}

pub async fn execute(executor: &Executor<'_>, match_clause: &MatchClause) -> Result<MatchOutcome> {
    run(executor, match_clause, &HashMap::new(), &HashMap::new()).await
}

/// `preset` seeds a variable's resources instead of fetching them from the
/// provider; `kind_overrides` supplies a kind for a node that would
/// otherwise be kindless. Both are empty for the top-level MATCH and
/// populated by `submatch.rs` for the reference variable.
pub(crate) async fn run(
    executor: &Executor<'_>,
    match_clause: &MatchClause,
    preset: &HashMap<String, Vec<Resource>>,
    kind_overrides: &HashMap<String, String>,
) -> Result<MatchOutcome> {
    let mut filtered: HashMap<String, Vec<Resource>> = HashMap::new();
    let mut node_kinds: HashMap<String, String> = HashMap::new();

    for chain in &match_clause.chains {
        let mut nodes = vec![&chain.start];
        nodes.extend(chain.segments.iter().map(|s| &s.node));
        for node in nodes {
            if filtered.contains_key(&node.name) {
                continue;
            }
            if let Some(seeded) = preset.get(&node.name) {
                filtered.insert(node.name.clone(), seeded.clone());
                if let Some(k) = kind_overrides.get(&node.name) {
                    node_kinds.insert(node.name.clone(), k.clone());
                }
                continue;
            }
            let kind = kind_overrides
                .get(&node.name)
                .or(node.kind.as_ref())
                .ok_or_else(|| EngineError::semantic(format!("node {} has no kind", node.name)))?
                .clone();
            node_kinds.insert(node.name.clone(), kind.clone());
            let resources = fetch_node(executor, node, &kind).await?;
            filtered.insert(node.name.clone(), resources);
        }
    }

    for filter in &match_clause.filters {
        if let Filter::KeyValue(kv) = filter {
            let Some(list) = filtered.get_mut(&kv.path.variable) else {
                continue;
            };
            let mut kept = Vec::with_capacity(list.len());
            for resource in list.drain(..) {
                let ok = crate::filter::evaluate(
                    &resource,
                    &kv.path,
                    kv.operator,
                    &kv.value,
                    kv.negated,
                    &executor.regex_cache,
                )?;
                if ok {
                    kept.push(resource);
                }
            }
            *list = kept;
        }
    }

    let rel_edges = flatten_relationships(&match_clause.chains, &node_kinds);
    let mut graph = Graph::new();
    let join_edges = fixpoint(executor, &rel_edges, &mut filtered, &mut graph)?;

    let mut outcome = MatchOutcome {
        filtered,
        graph,
        join_edges,
    };

    for filter in &match_clause.filters {
        if let Filter::SubMatch(sm) = filter {
            submatch::apply(executor, sm, &node_kinds, &mut outcome).await?;
        }
    }

    for (var, resources) in &outcome.filtered {
        for resource in resources {
            outcome.graph.add_node(Node::from_resource(var, resource));
        }
    }

    Ok(outcome)
}

async fn fetch_node(executor: &Executor<'_>, node: &NodePattern, kind: &str) -> Result<Vec<Resource>> {
    let mut field_selector = None;
    let mut label_selector_parts = Vec::new();
    let mut namespace = executor.config.default_namespace.clone();

    for (key, value) in &node.properties {
        let rendered = property_value_string(value)?;
        match key.as_str() {
            "name" => field_selector = Some(format!("metadata.name={rendered}")),
            "namespace" => namespace = Some(rendered),
            _ => label_selector_parts.push(format!("{key}={rendered}")),
        }
    }

    if field_selector.is_some() && !label_selector_parts.is_empty() {
        return Err(EngineError::semantic(format!(
            "node {} combines a name selector with a label selector",
            node.name
        )));
    }

    let label_selector = if label_selector_parts.is_empty() {
        None
    } else {
        Some(label_selector_parts.join(","))
    };

    let query = ListQuery {
        field_selector,
        label_selector,
        namespace,
    };
    executor.list_cached(kind, &query).await
}

fn property_value_string(value: &AstValue) -> Result<String> {
    match value {
        AstValue::String(s) => Ok(s.clone()),
        AstValue::Int(i) => Ok(i.to_string()),
        AstValue::Number(n) => Ok(n.to_string()),
        AstValue::Bool(b) => Ok(b.to_string()),
        AstValue::Null => Ok("null".to_string()),
        other => Err(EngineError::semantic(format!(
            "unsupported property literal {other:?}"
        ))),
    }
}

fn flatten_relationships(chains: &[PatternChain], node_kinds: &HashMap<String, String>) -> Vec<RelEdge> {
    let mut edges = Vec::new();
    for chain in chains {
        let mut prev_name = chain.start.name.clone();
        for seg in &chain.segments {
            edges.push(RelEdge {
                left_var: prev_name.clone(),
                left_kind: node_kinds.get(&prev_name).cloned().unwrap_or_default(),
                right_var: seg.node.name.clone(),
                right_kind: node_kinds.get(&seg.node.name).cloned().unwrap_or_default(),
                direction: seg.relationship.direction,
            });
            prev_name = seg.node.name.clone();
        }
    }
    edges
}

fn find_rule<'a>(catalog: &'a [RelationshipRule], kind_a: &str, kind_b: &str) -> Option<&'a RelationshipRule> {
    catalog.iter().find(|r| r.links(kind_a, kind_b))
}

/// Up to `config.max_fixpoint_multiplier * |relationships|` passes (spec
/// §4.5 step 4), shrinking both sides of every relationship to the subset
/// with at least one partner, until a pass shrinks nothing. The last pass's
/// pairs become both the emitted graph edges and the `JoinEdge`s RETURN
/// cross-joins against.
fn fixpoint(
    executor: &Executor<'_>,
    edges: &[RelEdge],
    filtered: &mut HashMap<String, Vec<Resource>>,
    graph: &mut Graph,
) -> Result<Vec<JoinEdge>> {
    if edges.is_empty() {
        return Ok(Vec::new());
    }
    let max_passes = (executor.config.max_fixpoint_multiplier * edges.len()).max(1);

    let mut last_pass: Vec<(usize, Vec<(usize, usize)>)> = Vec::new();
    for pass_num in 0..max_passes {
        let sizes_before: Vec<usize> = filtered.values().map(Vec::len).collect();
        let (shrunk, pass) = shrink_pass(executor.catalog, edges, filtered)?;
        let sizes_after: Vec<usize> = filtered.values().map(Vec::len).collect();
        tracing::trace!(pass = pass_num, ?sizes_before, ?sizes_after, shrunk, "fixpoint pass");
        last_pass = pass;
        if !shrunk {
            tracing::debug!(pass = pass_num, "fixpoint converged");
            break;
        }
    }

    let mut join_edges = Vec::new();
    for (edge_idx, pairs) in last_pass {
        let edge = &edges[edge_idx];
        if pairs.is_empty() {
            continue;
        }
        let rule = find_rule(executor.catalog, &edge.left_kind, &edge.right_kind)
            .expect("rule existed during shrink_pass for this edge");
        let left_list = &filtered[&edge.left_var];
        let right_list = &filtered[&edge.right_var];
        for &(li, ri) in &pairs {
            if let (Some(l), Some(r)) = (left_list.get(li), right_list.get(ri)) {
                emit_edge(graph, edge, rule, l, r);
            }
        }
        join_edges.push(JoinEdge {
            left_var: edge.left_var.clone(),
            right_var: edge.right_var.clone(),
            pairs,
        });
    }
    Ok(join_edges)
}

fn shrink_pass(
    catalog: &[RelationshipRule],
    edges: &[RelEdge],
    filtered: &mut HashMap<String, Vec<Resource>>,
) -> Result<(bool, Vec<(usize, Vec<(usize, usize)>)>)> {
    let mut shrunk = false;
    let mut pass = Vec::with_capacity(edges.len());

    for (idx, edge) in edges.iter().enumerate() {
        let rule = find_rule(catalog, &edge.left_kind, &edge.right_kind).ok_or_else(|| {
            EngineError::resolution(format!(
                "no relationship rule links {} and {}",
                edge.left_kind, edge.right_kind
            ))
        })?;
        let left_is_a = rule.kind_a == edge.left_kind;

        let left_list = filtered.get(&edge.left_var).cloned().unwrap_or_default();
        let right_list = filtered.get(&edge.right_var).cloned().unwrap_or_default();
        let (left_len_before, right_len_before) = (left_list.len(), right_list.len());

        let mut left_keep = vec![false; left_list.len()];
        let mut right_keep = vec![false; right_list.len()];
        let mut pairs = Vec::new();
        for (li, l) in left_list.iter().enumerate() {
            for (ri, r) in right_list.iter().enumerate() {
                let joined = if left_is_a { rule.matches(l, r) } else { rule.matches(r, l) };
                if joined {
                    left_keep[li] = true;
                    right_keep[ri] = true;
                    pairs.push((li, ri));
                }
            }
        }

        let new_left: Vec<Resource> = left_list
            .into_iter()
            .zip(left_keep)
            .filter(|(_, keep)| *keep)
            .map(|(r, _)| r)
            .collect();
        let new_right: Vec<Resource> = right_list
            .into_iter()
            .zip(right_keep)
            .filter(|(_, keep)| *keep)
            .map(|(r, _)| r)
            .collect();

        if new_left.len() != left_len_before || new_right.len() != right_len_before {
            shrunk = true;
        }

        filtered.insert(edge.left_var.clone(), new_left);
        filtered.insert(edge.right_var.clone(), new_right);
        pass.push((idx, pairs));
    }

    Ok((shrunk, pass))
}

fn emit_edge(graph: &mut Graph, edge: &RelEdge, rule: &RelationshipRule, left: &Resource, right: &Resource) {
    let left_id = crate::resource::kind_name_id(left);
    let right_id = crate::resource::kind_name_id(right);
    let (from, to) = match edge.direction {
        Direction::Left => (right_id, left_id),
        _ => (left_id, right_id),
    };
    graph.add_edge(&from, &to, rule.relationship_label);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_catalog;
    use crate::config::EngineConfig;
    use crate::provider::InMemoryProvider;
    use serde_json::json;

    #[tokio::test]
    async fn fixpoint_prunes_orphan_pod() {
        let provider = InMemoryProvider::new();
        provider.seed(
            "Deployment",
            vec![
                json!({"kind": "Deployment", "metadata": {"name": "A"}}),
                json!({"kind": "Deployment", "metadata": {"name": "B"}}),
            ],
        );
        provider.seed(
            "Pod",
            vec![
                json!({"kind": "Pod", "metadata": {"name": "p1", "ownerReferences": [{"kind": "Deployment", "name": "A"}]}}),
                json!({"kind": "Pod", "metadata": {"name": "p2"}}),
            ],
        );
        let catalog = default_catalog();
        let config = EngineConfig::default();
        let executor = Executor::new(&provider, &catalog, &config);
        let query = catalog_ql::parse("MATCH (d:Deployment)->(p:Pod) RETURN d.metadata.name, p.metadata.name").unwrap();
        let match_clause = query
            .clauses
            .iter()
            .find_map(|c| match c {
                catalog_ql::ast::Clause::Match(m) => Some(m),
                _ => None,
            })
            .unwrap();
        let outcome = execute(&executor, match_clause).await.unwrap();
        assert_eq!(outcome.filtered["d"].len(), 1);
        assert_eq!(outcome.filtered["p"].len(), 1);
        assert_eq!(outcome.graph.edges.len(), 1);
    }
}

//! Result graph types: the node/edge shape a query result is rendered into.
//!
//! A node is identified by the *variable* it came from (not a cluster-wide
//! UID — there is no persistent identity here), and an edge is a literal
//! `"<kind>/<name>"` pair.

use serde::Serialize;
use std::collections::BTreeSet;

/// One graph node. `id` is the MATCH variable name, after kindless-rewrite
/// un-expansion (§4.10). `namespace` is omitted for `kind == "Namespace"`
/// resources (§3 invariant, §10.5: implemented as a materialization rule).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Kind")]
    pub kind: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Namespace", skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl Node {
    pub fn from_resource(variable: &str, resource: &crate::resource::Resource) -> Self {
        let kind = crate::resource::kind(resource).unwrap_or_default().to_string();
        let namespace = if kind == "Namespace" {
            None
        } else {
            crate::resource::namespace(resource).map(str::to_string)
        };
        Node {
            id: variable.to_string(),
            kind,
            name: crate::resource::name(resource).unwrap_or_default().to_string(),
            namespace,
        }
    }
}

/// An edge between two resources, labeled with the relationship rule's
/// `relationshipLabel`. `from`/`to` are `"<kind>/<name>"` literals (§6.4).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Edge {
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "To")]
    pub to: String,
    #[serde(rename = "Type")]
    pub edge_type: String,
}

/// The accumulated graph for one query execution. Edges are deduplicated
/// undirected (spec §4.5 step 4: "de-duplicated undirected") by storing a
/// canonical `(min, max, type)` key alongside the display-order edge.
///
/// Node `id` is the MATCH variable name, not a unique key — §3 is explicit
/// that `id` equals the variable name, so every resource bound to `d` gets
/// its own `Node` sharing `id == "d"`, distinguished by `kind`/`name`.
/// Dedup keys on the full tuple, not `id` alone.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    seen_edges: BTreeSet<(String, String, String)>,
    seen_nodes: BTreeSet<(String, String, String, Option<String>)>,
}

impl Graph {
    pub fn new() -> Self {
        Graph::default()
    }

    pub fn add_node(&mut self, node: Node) {
        let key = (node.id.clone(), node.kind.clone(), node.name.clone(), node.namespace.clone());
        if self.seen_nodes.insert(key) {
            self.nodes.push(node);
        }
    }

    pub fn add_edge(&mut self, from: &str, to: &str, edge_type: &str) {
        let canonical = if from <= to {
            (from.to_string(), to.to_string(), edge_type.to_string())
        } else {
            (to.to_string(), from.to_string(), edge_type.to_string())
        };
        if self.seen_edges.insert(canonical) {
            self.edges.push(Edge {
                from: from.to_string(),
                to: to.to_string(),
                edge_type: edge_type.to_string(),
            });
        }
    }

    pub fn retain_nodes<F>(&mut self, mut keep: F)
    where
        F: FnMut(&Node) -> bool,
    {
        self.nodes.retain(|n| keep(n));
        let live: BTreeSet<String> = self.nodes.iter().map(|n| format!("{}/{}", n.kind, n.name)).collect();
        self.edges.retain(|e| live.contains(&e.from) && live.contains(&e.to));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_edge_deduplicates_undirected() {
        let mut g = Graph::new();
        g.add_edge("Deployment/a", "Pod/p1", "manages");
        g.add_edge("Pod/p1", "Deployment/a", "manages");
        assert_eq!(g.edges.len(), 1);
    }

    #[test]
    fn namespace_resource_omits_namespace_field() {
        let ns = serde_json::json!({"kind": "Namespace", "metadata": {"name": "default", "namespace": "ignored"}});
        let node = Node::from_resource("n", &ns);
        assert_eq!(node.namespace, None);
    }
}

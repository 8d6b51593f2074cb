//! Relationship-rule resolver for kindless nodes (spec §4.3).
//!
//! Computes, for every kindless node in a pattern, the intersection over its
//! known-kind neighbors of the set of kinds that share a catalog rule with
//! each neighbor. The kindless rewriter (`rewrite.rs`) turns this candidate
//! set into one specialized query branch per candidate kind.

use crate::catalog::RelationshipRule;
use crate::errors::{EngineError, Result};
use catalog_ql::ast::PatternChain;
use std::collections::{BTreeSet, HashMap};

/// One `(node name) -> neighbor kind` edge, derived by walking a chain's
/// consecutive node pairs.
struct Adjacency {
    /// node name -> kinds of its known-kind neighbors.
    known_neighbor_kinds: HashMap<String, Vec<String>>,
    /// node name -> true if it appears with an explicit kind anywhere.
    kinded: HashMap<String, String>,
}

fn build_adjacency(chains: &[PatternChain], overrides: &HashMap<String, String>) -> Adjacency {
    let mut known_neighbor_kinds: HashMap<String, Vec<String>> = HashMap::new();
    let mut kinded: HashMap<String, String> = HashMap::new();

    for chain in chains {
        let mut nodes = vec![&chain.start];
        nodes.extend(chain.segments.iter().map(|s| &s.node));
        for node in &nodes {
            if let Some(k) = overrides.get(&node.name).or(node.kind.as_ref()) {
                kinded.insert(node.name.clone(), k.clone());
            }
        }
        for window in nodes.windows(2) {
            let (a, b) = (window[0], window[1]);
            let kind_a = overrides.get(&a.name).or(a.kind.as_ref());
            let kind_b = overrides.get(&b.name).or(b.kind.as_ref());
            if let Some(kb) = kind_b {
                known_neighbor_kinds.entry(a.name.clone()).or_default().push(kb.clone());
            }
            if let Some(ka) = kind_a {
                known_neighbor_kinds.entry(b.name.clone()).or_default().push(ka.clone());
            }
        }
    }

    Adjacency {
        known_neighbor_kinds,
        kinded,
    }
}

fn candidate_kinds_for_neighbor(catalog: &[RelationshipRule], neighbor_kind: &str) -> BTreeSet<&'static str> {
    catalog.iter().filter_map(|r| r.other_kind(neighbor_kind)).collect()
}

/// Resolves candidate kind sets for every kindless node reachable in
/// `chains`. `overrides` supplies kinds inherited from outside the chain set
/// (used by sub-match nodes that reference an outer MATCH variable, §3:
/// "kind is inherited").
pub fn resolve(
    chains: &[PatternChain],
    catalog: &[RelationshipRule],
    overrides: &HashMap<String, String>,
) -> Result<HashMap<String, BTreeSet<&'static str>>> {
    let adjacency = build_adjacency(chains, overrides);
    let mut result = HashMap::new();

    for (name, neighbor_kinds) in &adjacency.known_neighbor_kinds {
        if adjacency.kinded.contains_key(name) {
            continue;
        }
        if neighbor_kinds.is_empty() {
            return Err(EngineError::semantic(format!(
                "kindless node {name} has no kinded neighbor to resolve against"
            )));
        }
        let mut sets = neighbor_kinds
            .iter()
            .map(|k| candidate_kinds_for_neighbor(catalog, k));
        let mut intersection = sets.next().unwrap_or_default();
        for s in sets {
            intersection = intersection.intersection(&s).copied().collect();
        }
        if intersection.is_empty() {
            return Err(EngineError::resolution(format!(
                "no relationship rule links a candidate kind to node {name}'s neighbors"
            )));
        }
        result
            .entry(name.clone())
            .and_modify(|existing: &mut BTreeSet<&'static str>| {
                *existing = existing.intersection(&intersection).copied().collect();
            })
            .or_insert(intersection);
    }

    for chain in chains {
        let mut nodes = vec![&chain.start];
        nodes.extend(chain.segments.iter().map(|s| &s.node));
        for node in nodes {
            if node.is_kindless() && !overrides.contains_key(&node.name) && !result.contains_key(&node.name) {
                return Err(EngineError::semantic(format!(
                    "kindless node {} has no kinded neighbor",
                    node.name
                )));
            }
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_catalog;
    use catalog_ql::parse;

    fn first_match_chains(src: &str) -> Vec<PatternChain> {
        let query = parse(src).unwrap();
        for clause in &query.clauses {
            if let catalog_ql::ast::Clause::Match(m) = clause {
                return m.chains.clone();
            }
        }
        panic!("no MATCH clause");
    }

    #[test]
    fn resolves_kindless_neighbor_of_service() {
        let chains = first_match_chains("MATCH (s:Service)->(x) RETURN s, x");
        let catalog = default_catalog();
        let candidates = resolve(&chains, &catalog, &HashMap::new()).unwrap();
        let xs = &candidates["x"];
        assert!(xs.contains("Pod"));
    }

    #[test]
    fn fully_kinded_pattern_resolves_nothing() {
        let chains = first_match_chains("MATCH (d:Deployment)->(p:Pod) RETURN d, p");
        let catalog = default_catalog();
        let candidates = resolve(&chains, &catalog, &HashMap::new()).unwrap();
        assert!(candidates.is_empty());
    }
}

//! Multi-context dispatcher (spec §4.9).
//!
//! `IN ctxA, ctxB MATCH …` runs the single-context executor once per
//! context, against a provider clone obtained through
//! [`crate::provider::ClusterProvider::clone_for_context`], with every
//! variable name in that context's AST copy prefixed `ctxA_`/`ctxB_` so the
//! per-context results land under distinct keys without the result merger's
//! involvement (they're already disjoint once prefixed).

use catalog_ql::ast::{
    Clause, DeleteClause, Filter, JsonPath, KeyValueFilter, MatchClause, NodePattern, PatternChain,
    PathSegment, Query, Relationship, ReturnClause, ReturnItem, ReturnTarget, SetAssignment, SetClause,
    SubMatchFilter,
};

fn prefix(name: &str, ctx: &str) -> String {
    format!("{ctx}_{name}")
}

fn prefix_node(node: &NodePattern, ctx: &str) -> NodePattern {
    let mut out = node.clone();
    out.name = prefix(&node.name, ctx);
    out
}

fn prefix_relationship(rel: &Relationship, ctx: &str) -> Relationship {
    let mut out = rel.clone();
    out.variable = out.variable.map(|v| prefix(&v, ctx));
    out
}

fn prefix_chain(chain: &PatternChain, ctx: &str) -> PatternChain {
    PatternChain {
        start: prefix_node(&chain.start, ctx),
        segments: chain
            .segments
            .iter()
            .map(|seg| PathSegment {
                relationship: prefix_relationship(&seg.relationship, ctx),
                node: prefix_node(&seg.node, ctx),
            })
            .collect(),
    }
}

fn prefix_path(path: &JsonPath, ctx: &str) -> JsonPath {
    JsonPath {
        variable: prefix(&path.variable, ctx),
        steps: path.steps.clone(),
    }
}

fn prefix_filter(filter: &Filter, ctx: &str) -> Filter {
    match filter {
        Filter::KeyValue(kv) => Filter::KeyValue(KeyValueFilter {
            path: prefix_path(&kv.path, ctx),
            ..kv.clone()
        }),
        Filter::SubMatch(sm) => Filter::SubMatch(SubMatchFilter {
            reference_name: prefix(&sm.reference_name, ctx),
            chains: sm.chains.iter().map(|c| prefix_chain(c, ctx)).collect(),
            ..sm.clone()
        }),
    }
}

/// Produces one single-context copy of `query` per declared context, with
/// every variable prefixed and `contexts` cleared (so the copy runs as an
/// ordinary single-context query).
pub fn split_per_context(query: &Query) -> Vec<(String, Query)> {
    query
        .contexts
        .iter()
        .map(|ctx| {
            let clauses = query
                .clauses
                .iter()
                .map(|clause| match clause {
                    Clause::Match(m) => Clause::Match(MatchClause {
                        chains: m.chains.iter().map(|c| prefix_chain(c, ctx)).collect(),
                        filters: m.filters.iter().map(|f| prefix_filter(f, ctx)).collect(),
                        span: m.span,
                    }),
                    Clause::Create(c) => Clause::Create(catalog_ql::ast::CreateClause {
                        chains: c.chains.iter().map(|c| prefix_chain(c, ctx)).collect(),
                        span: c.span,
                    }),
                    Clause::Set(s) => Clause::Set(SetClause {
                        assignments: s
                            .assignments
                            .iter()
                            .map(|a| SetAssignment {
                                path: prefix_path(&a.path, ctx),
                                value: a.value.clone(),
                                span: a.span,
                            })
                            .collect(),
                        span: s.span,
                    }),
                    Clause::Delete(d) => Clause::Delete(DeleteClause {
                        variables: d.variables.iter().map(|v| prefix(v, ctx)).collect(),
                        span: d.span,
                    }),
                    Clause::Return(r) => Clause::Return(ReturnClause {
                        items: r
                            .items
                            .iter()
                            .map(|item| prefix_return_item(item, ctx))
                            .collect(),
                        order_by: r
                            .order_by
                            .iter()
                            .map(|o| catalog_ql::ast::OrderByItem {
                                path: prefix_path(&o.path, ctx),
                                direction: o.direction,
                            })
                            .collect(),
                        skip: r.skip,
                        limit: r.limit,
                        span: r.span,
                    }),
                })
                .collect();
            (
                ctx.clone(),
                Query {
                    contexts: Vec::new(),
                    clauses,
                    span: query.span,
                },
            )
        })
        .collect()
}

fn prefix_return_item(item: &ReturnItem, ctx: &str) -> ReturnItem {
    let target = match &item.target {
        ReturnTarget::Path(p) => ReturnTarget::Path(prefix_path(p, ctx)),
        ReturnTarget::Aggregate { agg, path } => ReturnTarget::Aggregate {
            agg: *agg,
            path: prefix_path(path, ctx),
        },
    };
    ReturnItem {
        target,
        alias: item.alias.clone(),
        span: item.span,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_per_context_prefixes_every_variable() {
        let query = catalog_ql::parse("IN prod, stg MATCH (d:Deployment) RETURN d.metadata.name").unwrap();
        let copies = split_per_context(&query);
        assert_eq!(copies.len(), 2);
        assert_eq!(copies[0].0, "prod");
        let printed = catalog_ql::print(&copies[0].1);
        assert!(printed.contains("prod_d"));
        assert!(!printed.contains("IN "));
    }
}

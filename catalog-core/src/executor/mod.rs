//! The planner/executor (spec §4.5 — "the hard part").
//!
//! One [`Executor`] is constructed per query (spec §5: "each holds its own
//! executor and caches"); it borrows the provider, the rule catalog, and the
//! engine config, all of which outlive any single query.

mod create_exec;
mod delete_exec;
mod match_exec;
mod return_exec;
mod set_exec;
mod submatch;

use crate::catalog::RelationshipRule;
use crate::config::EngineConfig;
use crate::dispatch;
use crate::errors::Result;
use crate::filter::RegexCache;
use crate::graph::Graph;
use crate::merge;
use crate::provider::ClusterProvider;
use crate::resource::Resource;
use crate::rewrite;
use catalog_ql::ast::{Clause, Query};
use serde_json::Value;
use std::collections::HashMap;

pub(crate) use match_exec::MatchOutcome;

/// `{data: {<var>: [...]}, "aggregate"?: {...}, graph: {...}}` (spec §6.4).
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub data: HashMap<String, Value>,
    pub graph: Graph,
}

pub struct Executor<'a> {
    provider: &'a dyn ClusterProvider,
    catalog: &'a [RelationshipRule],
    config: &'a EngineConfig,
    regex_cache: RegexCache,
    /// `(namespace, kind, field-selector, label-selector)` -> already-fetched
    /// resources, for the "Results are cached" clause of §4.5 MATCH step 2.
    /// The selectors are part of the key (not just namespace+kind) because
    /// two MATCH nodes of the same kind/namespace can carry different
    /// name/label predicates and must not collide on the same cache entry.
    list_cache:
        std::cell::RefCell<HashMap<(Option<String>, String, Option<String>, Option<String>), Vec<Resource>>>,
}

impl<'a> Executor<'a> {
    pub fn new(provider: &'a dyn ClusterProvider, catalog: &'a [RelationshipRule], config: &'a EngineConfig) -> Self {
        Executor {
            provider,
            catalog,
            config,
            regex_cache: RegexCache::with_capacity(config.regex_cache_capacity),
            list_cache: std::cell::RefCell::new(HashMap::new()),
        }
    }

    pub async fn execute(&self, query: &Query) -> Result<QueryResult> {
        if !query.contexts.is_empty() {
            return self.execute_multi_context(query).await;
        }

        if let Some(rewritten) = rewrite::rewrite(query, self.catalog)? {
            let result = Box::pin(self.execute(&rewritten)).await?;
            let data: HashMap<String, Vec<Value>> = result
                .data
                .iter()
                .filter(|(k, _)| k.as_str() != "aggregate")
                .map(|(k, v)| (k.clone(), v.as_array().cloned().unwrap_or_default()))
                .collect();
            let merged_data = merge::merge_data(data);
            let mut out_data: HashMap<String, Value> = merged_data
                .into_iter()
                .map(|(k, v)| (k, Value::Array(v)))
                .collect();
            if let Some(Value::Object(agg)) = result.data.get("aggregate") {
                let agg_map: HashMap<String, Value> = agg.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                let merged_agg = merge::merge_aggregate(agg_map);
                if !merged_agg.is_empty() {
                    out_data.insert("aggregate".to_string(), Value::Object(merged_agg.into_iter().collect()));
                }
            }
            return Ok(QueryResult {
                data: out_data,
                graph: merge::merge_graph(result.graph),
            });
        }

        self.execute_single(query).await
    }

    async fn execute_multi_context(&self, query: &Query) -> Result<QueryResult> {
        let copies = dispatch::split_per_context(query);
        let mut data = HashMap::new();
        let mut graph = Graph::new();
        for (ctx, sub_query) in copies {
            let provider = self.provider.clone_for_context(&ctx)?;
            let sub_executor = Executor::new(provider.as_ref(), self.catalog, self.config);
            let sub_result = Box::pin(sub_executor.execute(&sub_query)).await?;
            for (k, v) in sub_result.data {
                data.insert(k, v);
            }
            for node in sub_result.graph.nodes {
                graph.add_node(node);
            }
            for edge in sub_result.graph.edges {
                graph.add_edge(&edge.from, &edge.to, &edge.edge_type);
            }
        }
        Ok(QueryResult { data, graph })
    }

    async fn execute_single(&self, query: &Query) -> Result<QueryResult> {
        let match_clause = query.clauses.iter().find_map(|c| match c {
            Clause::Match(m) => Some(m),
            _ => None,
        });

        let mut outcome = match match_clause {
            Some(m) => self.run_match(m).await?,
            None => MatchOutcome::default(),
        };

        for clause in &query.clauses {
            match clause {
                Clause::Create(create) => {
                    create_exec::execute(self, create, &mut outcome).await?;
                }
                Clause::Set(set) => {
                    set_exec::execute(self, set, &mut outcome).await?;
                }
                Clause::Delete(delete) => {
                    delete_exec::execute(self, delete, &mut outcome).await?;
                }
                _ => {}
            }
        }

        let mut result = QueryResult {
            data: HashMap::new(),
            graph: outcome.graph.clone(),
        };

        if let Some(Clause::Return(ret)) = query.clauses.iter().find(|c| matches!(c, Clause::Return(_))) {
            return_exec::execute(ret, &outcome, &mut result)?;
        } else {
            for (var, resources) in &outcome.filtered {
                result.data.insert(var.clone(), Value::Array(resources.clone()));
            }
        }

        Ok(result)
    }

    async fn run_match(&self, match_clause: &catalog_ql::ast::MatchClause) -> Result<MatchOutcome> {
        match_exec::execute(self, match_clause).await
    }

    async fn list_cached(&self, kind: &str, query: &crate::provider::ListQuery) -> Result<Vec<Resource>> {
        let cache_key = (
            query.namespace.clone(),
            kind.to_string(),
            query.field_selector.clone(),
            query.label_selector.clone(),
        );
        if let Some(hit) = self.list_cache.borrow().get(&cache_key) {
            return Ok(hit.clone());
        }
        let resources = self.provider.list(kind, query).await?;
        self.list_cache.borrow_mut().insert(cache_key, resources.clone());
        Ok(resources)
    }
}

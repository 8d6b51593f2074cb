//! End-to-end scenarios, run through [`Executor::execute`] against
//! [`InMemoryProvider`] rather than any single module's internals, kept in
//! their own `tests/` file separate from the inline `#[cfg(test)]` unit
//! tests elsewhere in the crate.

use catalog_core::provider::{ClusterProvider, InMemoryProvider, ListQuery};
use catalog_core::{default_catalog, EngineConfig, Executor};
use serde_json::json;

async fn run(provider: &InMemoryProvider, src: &str) -> catalog_core::QueryResult {
    let catalog = default_catalog();
    let config = EngineConfig::default();
    let executor = Executor::new(provider, &catalog, &config);
    let query = catalog_ql::parse(src).unwrap();
    executor.execute(&query).await.unwrap()
}

fn names_of(result: &catalog_core::QueryResult, var: &str) -> Vec<String> {
    let mut names: Vec<String> = result.data[var]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["name"].as_str().unwrap().to_string())
        .collect();
    names.sort();
    names
}

/// Scenario 3: kindless expansion. `(s:Service)->(x)` has no stated kind for
/// `x`; the candidate set is every kind with a catalog rule to `Service`
/// (here just `Pod`, via the `selects` rule), so the union collapses to
/// exactly the matching pods, deduplicated back under the user-visible `x`.
#[tokio::test]
async fn kindless_expansion_merges_candidate_kinds_under_original_name() {
    let provider = InMemoryProvider::new();
    provider.seed(
        "Service",
        vec![json!({"kind": "Service", "metadata": {"name": "web"}, "spec": {"selector": {"app": "nginx"}}})],
    );
    provider.seed(
        "Pod",
        vec![
            json!({"kind": "Pod", "metadata": {"name": "p1", "labels": {"app": "nginx"}}}),
            json!({"kind": "Pod", "metadata": {"name": "p2", "labels": {"app": "other"}}}),
        ],
    );

    let result = run(&provider, "MATCH (s:Service)->(x) RETURN s, x").await;

    assert_eq!(names_of(&result, "s"), vec!["web"]);
    assert_eq!(names_of(&result, "x"), vec!["p1"]);
    assert!(!result.data.contains_key("aggregate"));
    // Merged graph node/edge ids are un-suffixed back to the user's names.
    assert!(result.graph.nodes.iter().all(|n| !n.id.contains("__exp__")));
    assert!(result.graph.edges.iter().all(|e| !e.from.contains("__exp__") && !e.to.contains("__exp__")));
}

/// Scenario 4: SET on a label whose key itself contains dots. The escaped
/// `app\.kubernetes\.io/name` segment must land as one literal map key, and
/// the in-memory resource (reachable through the provider, same as a real
/// re-GET) must reflect the write.
#[tokio::test]
async fn set_on_dotted_label_key_patches_resource() {
    let provider = InMemoryProvider::new();
    provider.seed(
        "Deployment",
        vec![json!({"kind": "Deployment", "metadata": {"name": "nginx", "labels": {}}})],
    );

    let result = run(
        &provider,
        r#"MATCH (d:Deployment {name:"nginx"}) SET d.metadata.labels.app\.kubernetes\.io/name = "nginx" RETURN d"#,
    )
    .await;
    assert_eq!(names_of(&result, "d"), vec!["nginx"]);

    let stored = provider
        .list("Deployment", &ListQuery::default())
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(
        stored[0]["metadata"]["labels"]["app.kubernetes.io/name"],
        json!("nginx")
    );
}

/// Scenario 7: sub-match negation. Deployments with zero owned pods survive
/// `WHERE NOT (d)->(:Pod)`; deployments with at least one owned pod are
/// dropped.
#[tokio::test]
async fn submatch_negation_keeps_deployments_without_pods() {
    let provider = InMemoryProvider::new();
    provider.seed(
        "Deployment",
        vec![
            json!({"kind": "Deployment", "metadata": {"name": "has-pods"}}),
            json!({"kind": "Deployment", "metadata": {"name": "childless"}}),
        ],
    );
    provider.seed(
        "Pod",
        vec![json!({
            "kind": "Pod",
            "metadata": {"name": "p1", "ownerReferences": [{"kind": "Deployment", "name": "has-pods"}]}
        })],
    );

    let result = run(
        &provider,
        "MATCH (d:Deployment) WHERE NOT (d)->(:Pod) RETURN d.metadata.name",
    )
    .await;

    assert_eq!(names_of(&result, "d"), vec!["childless"]);
}

/// Scenario 8: `IN ctxA, ctxB` dispatches the same query against a provider
/// clone per context and merges results under `<ctx>_<var>` keys, each
/// context's data staying disjoint (prod's deployment never leaks into
/// stg's key and vice versa).
#[tokio::test]
async fn multi_context_dispatch_keys_data_by_context_prefix() {
    let provider = InMemoryProvider::new();
    provider.seed_context(
        "prod",
        "Deployment",
        vec![json!({"kind": "Deployment", "metadata": {"name": "prod-api"}})],
    );
    provider.seed_context(
        "stg",
        "Deployment",
        vec![json!({"kind": "Deployment", "metadata": {"name": "stg-api"}})],
    );

    let result = run(&provider, "IN prod, stg MATCH (d:Deployment) RETURN d.metadata.name").await;

    assert_eq!(names_of(&result, "prod_d"), vec!["prod-api"]);
    assert_eq!(names_of(&result, "stg_d"), vec!["stg-api"]);
}

/// CREATE synthesizes the unmatched endpoint of a relationship, propagating
/// the owner reference the catalog's `OwnerReferenceMatch` criterion
/// declares and overlaying the user's JSON template on top (spec §4.5
/// CREATE).
#[tokio::test]
async fn create_from_relationship_propagates_owner_reference() {
    let provider = InMemoryProvider::new();
    provider.seed(
        "Deployment",
        vec![json!({"kind": "Deployment", "metadata": {"name": "nginx"}})],
    );

    let result = run(
        &provider,
        r#"MATCH (d:Deployment {name:"nginx"}) CREATE (d:Deployment)->(p:Pod {"metadata":{"name":"nginx-extra"}}) RETURN p"#,
    )
    .await;

    assert_eq!(names_of(&result, "p"), vec!["nginx-extra"]);
    let pods = provider.list("Pod", &ListQuery::default()).await.unwrap();
    assert_eq!(pods.len(), 1);
    assert_eq!(
        pods[0]["metadata"]["ownerReferences"][0],
        json!({"kind": "Deployment", "name": "nginx"})
    );
}

/// DELETE removes the listed variable's resources from the provider and
/// from the returned result map.
#[tokio::test]
async fn delete_removes_resource_from_provider_and_result() {
    let provider = InMemoryProvider::new();
    provider.seed(
        "Pod",
        vec![json!({"kind": "Pod", "metadata": {"name": "doomed"}})],
    );

    let result = run(&provider, r#"MATCH (p:Pod {name:"doomed"}) DELETE p"#).await;
    assert!(!result.data.contains_key("p"));

    let remaining = provider.list("Pod", &ListQuery::default()).await.unwrap();
    assert!(remaining.is_empty());
}

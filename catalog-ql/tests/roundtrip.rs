use catalog_ql::{parse, print};

fn assert_roundtrips(src: &str) {
    let first = parse(src).unwrap_or_else(|e| panic!("parsing {:?} failed: {}", src, e));
    let printed = print(&first);
    let second = parse(&printed).unwrap_or_else(|e| {
        panic!("re-parsing printed query {:?} (from {:?}) failed: {}", printed, src, e)
    });
    assert_eq!(first, second, "round-trip mismatch for {:?} -> {:?}", src, printed);
}

#[test]
fn simple_match_return_roundtrips() {
    assert_roundtrips("MATCH (d:Deployment) RETURN d.metadata.name");
}

#[test]
fn relationship_chain_roundtrips() {
    assert_roundtrips("MATCH (d:Deployment)->(p:Pod) RETURN d.metadata.name, p.metadata.name");
}

#[test]
fn labeled_relationship_roundtrips() {
    assert_roundtrips("MATCH (a:Service)-[r:ROUTES]->(b:Pod) RETURN a.metadata.name");
}

#[test]
fn where_filters_roundtrip() {
    assert_roundtrips(r#"MATCH (d:Deployment) WHERE d.metadata.name = "nginx" RETURN d.metadata.name"#);
}

#[test]
fn sub_match_negation_roundtrips() {
    assert_roundtrips("MATCH (d:Deployment) WHERE NOT (d)->(:Pod) RETURN d.metadata.name");
}

#[test]
fn set_with_escaped_dot_roundtrips() {
    assert_roundtrips(
        r#"MATCH (d:Deployment {name: "nginx"}) SET d.metadata.labels.app\.kubernetes\.io/name = "nginx""#,
    );
}

#[test]
fn order_by_skip_limit_roundtrips() {
    assert_roundtrips("MATCH (p:Pod) RETURN p.metadata.name ORDER BY p.metadata.name DESC SKIP 1 LIMIT 1");
}

#[test]
fn aggregate_return_roundtrips() {
    assert_roundtrips("MATCH (p:Pod) RETURN SUM {p.spec.containers[*].resources.requests.cpu} AS total");
}

#[test]
fn multi_context_roundtrips() {
    assert_roundtrips("IN prod, stg MATCH (d:Deployment) RETURN d.metadata.name");
}

#[test]
fn anonymous_node_renumbers_but_structure_matches() {
    let first = parse("MATCH (s:Service)->(x) RETURN s, x").unwrap();
    let printed = print(&first);
    let second = parse(&printed).unwrap();
    assert_eq!(first.clauses.len(), second.clauses.len());
}

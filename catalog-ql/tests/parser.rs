use catalog_ql::ast::*;
use catalog_ql::parse;

#[test]
fn parses_simple_match_return() {
    let query = parse("MATCH (d:Deployment) RETURN d.metadata.name").unwrap();
    assert!(query.contexts.is_empty());
    assert_eq!(query.clauses.len(), 2);
    match &query.clauses[0] {
        Clause::Match(m) => {
            assert_eq!(m.chains.len(), 1);
            assert_eq!(m.chains[0].start.name, "d");
            assert_eq!(m.chains[0].start.kind.as_deref(), Some("Deployment"));
        }
        other => panic!("expected Match, got {:?}", other),
    }
    match &query.clauses[1] {
        Clause::Return(r) => {
            assert_eq!(r.items.len(), 1);
            match &r.items[0].target {
                ReturnTarget::Path(p) => {
                    assert_eq!(p.variable, "d");
                    assert_eq!(p.steps, vec![PathStep::Key("metadata".into()), PathStep::Key("name".into())]);
                }
                other => panic!("expected Path, got {:?}", other),
            }
        }
        other => panic!("expected Return, got {:?}", other),
    }
}

#[test]
fn parses_directed_relationship_chain() {
    let query = parse("MATCH (d:Deployment)->(p:Pod) RETURN d.metadata.name, p.metadata.name").unwrap();
    match &query.clauses[0] {
        Clause::Match(m) => {
            let chain = &m.chains[0];
            assert_eq!(chain.segments.len(), 1);
            assert_eq!(chain.segments[0].relationship.direction, Direction::Right);
            assert_eq!(chain.segments[0].node.kind.as_deref(), Some("Pod"));
        }
        other => panic!("expected Match, got {:?}", other),
    }
}

#[test]
fn parses_labeled_relationship_with_variable() {
    let query = parse("MATCH (a:Service)-[r:ROUTES]->(b:Pod) RETURN a").unwrap();
    match &query.clauses[0] {
        Clause::Match(m) => {
            let rel = &m.chains[0].segments[0].relationship;
            assert_eq!(rel.variable.as_deref(), Some("r"));
            assert_eq!(rel.kind.as_deref(), Some("ROUTES"));
            assert_eq!(rel.direction, Direction::Right);
        }
        other => panic!("expected Match, got {:?}", other),
    }
}

#[test]
fn rejects_standalone_anonymous_node() {
    let err = parse("MATCH () RETURN d").unwrap_err();
    assert!(matches!(err, catalog_ql::ParseError::AnonymousStandalone { .. }));
}

#[test]
fn rejects_kindless_to_kindless_chain() {
    let err = parse("MATCH (a)->(b) RETURN a").unwrap_err();
    assert!(matches!(
        err,
        catalog_ql::ParseError::KindlessWithoutKindedNeighbor { .. }
    ));
}

#[test]
fn accepts_kindless_node_with_kinded_neighbor() {
    let query = parse("MATCH (s:Service)->(x) RETURN s, x").unwrap();
    match &query.clauses[0] {
        Clause::Match(m) => {
            assert!(m.chains[0].segments[0].node.is_kindless());
        }
        other => panic!("expected Match, got {:?}", other),
    }
}

#[test]
fn parses_where_with_filters_and_negation() {
    let query = parse(
        r#"MATCH (d:Deployment) WHERE d.metadata.name = "nginx" AND NOT d.spec.paused = true RETURN d"#,
    )
    .unwrap();
    match &query.clauses[0] {
        Clause::Match(m) => {
            assert_eq!(m.filters.len(), 2);
            match &m.filters[1] {
                Filter::KeyValue(kv) => assert!(kv.negated),
                other => panic!("expected KeyValue, got {:?}", other),
            }
        }
        other => panic!("expected Match, got {:?}", other),
    }
}

#[test]
fn parses_sub_match_negation() {
    let query = parse("MATCH (d:Deployment) WHERE NOT (d)->(:Pod) RETURN d.metadata.name").unwrap();
    match &query.clauses[0] {
        Clause::Match(m) => match &m.filters[0] {
            Filter::SubMatch(sm) => {
                assert!(sm.negated);
                assert_eq!(sm.reference_name, "d");
            }
            other => panic!("expected SubMatch, got {:?}", other),
        },
        other => panic!("expected Match, got {:?}", other),
    }
}

#[test]
fn rejects_sub_match_when_outer_match_is_kindless() {
    let err = parse("MATCH (s:Service)->(x) WHERE NOT (x)->(:Pod) RETURN x").unwrap_err();
    assert!(matches!(
        err,
        catalog_ql::ParseError::SubMatchWithKindlessOuter { .. }
    ));
}

#[test]
fn parses_set_with_escaped_label_key() {
    let query = parse(
        r#"MATCH (d:Deployment {name: "nginx"}) SET d.metadata.labels.app\.kubernetes\.io/name = "nginx""#,
    )
    .unwrap();
    match &query.clauses[1] {
        Clause::Set(s) => {
            let assignment = &s.assignments[0];
            assert_eq!(
                assignment.path.steps,
                vec![
                    PathStep::Key("metadata".into()),
                    PathStep::Key("labels".into()),
                    PathStep::Key("app.kubernetes.io/name".into()),
                ]
            );
        }
        other => panic!("expected Set, got {:?}", other),
    }
}

#[test]
fn parses_create_with_json_template() {
    let query = parse(r#"CREATE (d:Deployment {"metadata": {"name": "nginx"}})"#).unwrap();
    match &query.clauses[0] {
        Clause::Create(c) => {
            let template = c.chains[0].start.json_template.as_ref().unwrap();
            assert_eq!(template["metadata"]["name"], "nginx");
        }
        other => panic!("expected Create, got {:?}", other),
    }
}

#[test]
fn parses_aggregate_return_with_alias() {
    let query = parse("MATCH (p:Pod) RETURN SUM {p.spec.containers[*].resources.requests.cpu} AS total").unwrap();
    match &query.clauses[1] {
        Clause::Return(r) => {
            assert_eq!(r.items[0].alias.as_deref(), Some("total"));
            match &r.items[0].target {
                ReturnTarget::Aggregate { agg, path } => {
                    assert_eq!(*agg, AggKind::Sum);
                    assert!(path.steps.contains(&PathStep::Wildcard));
                }
                other => panic!("expected Aggregate, got {:?}", other),
            }
        }
        other => panic!("expected Return, got {:?}", other),
    }
}

#[test]
fn parses_order_by_skip_limit() {
    let query = parse("MATCH (p:Pod) RETURN p.metadata.name ORDER BY p.metadata.name DESC SKIP 1 LIMIT 1").unwrap();
    match &query.clauses[1] {
        Clause::Return(r) => {
            assert_eq!(r.order_by[0].direction, SortDirection::Desc);
            assert_eq!(r.skip, Some(1));
            assert_eq!(r.limit, Some(1));
        }
        other => panic!("expected Return, got {:?}", other),
    }
}

#[test]
fn rejects_order_by_on_undefined_variable() {
    let err = parse("MATCH (p:Pod) RETURN p.metadata.name ORDER BY q.metadata.name").unwrap_err();
    assert!(matches!(
        err,
        catalog_ql::ParseError::UndefinedOrderByVariable { .. }
    ));
}

#[test]
fn rejects_negative_limit() {
    let mut query_text = String::from("MATCH (p:Pod) RETURN p LIMIT ");
    query_text.push_str("-1");
    let err = parse(&query_text).unwrap_err();
    assert!(matches!(err, catalog_ql::ParseError::InvalidLimitOrSkip { .. }));
}

#[test]
fn parses_temporal_arithmetic() {
    let query = parse(
        r#"MATCH (p:Pod) WHERE p.metadata.creationTimestamp < datetime("2024-01-01T00:00:00Z") - duration("P1D") RETURN p"#,
    )
    .unwrap();
    match &query.clauses[0] {
        Clause::Match(m) => match &m.filters[0] {
            Filter::KeyValue(kv) => {
                assert!(matches!(kv.value, Value::Temporal(TemporalExpr::BinOp { .. })));
            }
            other => panic!("expected KeyValue, got {:?}", other),
        },
        other => panic!("expected Match, got {:?}", other),
    }
}

#[test]
fn parses_multi_context_prefix() {
    let query = parse("IN prod, stg MATCH (d:Deployment) RETURN d.metadata.name").unwrap();
    assert_eq!(query.contexts, vec!["prod".to_string(), "stg".to_string()]);
}

#[test]
fn parses_standalone_create_with_return() {
    let query = parse(r#"CREATE (d:Deployment {"metadata": {"name": "nginx"}}) RETURN d"#).unwrap();
    assert_eq!(query.clauses.len(), 2);
}

#[test]
fn parses_delete_clause() {
    let query = parse("MATCH (p:Pod) DELETE p").unwrap();
    match &query.clauses[1] {
        Clause::Delete(d) => assert_eq!(d.variables, vec!["p".to_string()]),
        other => panic!("expected Delete, got {:?}", other),
    }
}

//! CREATE clause execution (spec §4.5 CREATE).
//!
//! Each relationship in a CREATE chain must have exactly one endpoint
//! already bound by the outer MATCH; the other is synthesized by copying
//! the matched [`RelationshipRule`]'s linked fields across (and applying
//! its `defaultProps`) before the user's JSON template is merged on top.
//! A path step with a `Wildcard` component is skipped during propagation —
//! `resource::set_path` cannot resolve a wildcard without element context,
//! and CREATE has none to offer, so such fields are left to the template.

use super::match_exec::MatchOutcome;
use super::Executor;
use crate::catalog::{Comparison, RelationshipRule};
use crate::errors::{EngineError, Result};
use crate::resource::{self, Resource};
use catalog_ql::ast::{CreateClause, NodePattern, PathStep};
use serde_json::Value;

pub async fn execute(executor: &Executor<'_>, create: &CreateClause, outcome: &mut MatchOutcome) -> Result<()> {
    for chain in &create.chains {
        if chain.segments.is_empty() {
            create_standalone(executor, &chain.start, outcome).await?;
            continue;
        }

        let mut prev = &chain.start;
        for seg in &chain.segments {
            let node = &seg.node;
            let left_known = outcome.filtered.get(&prev.name).map(|r| !r.is_empty()).unwrap_or(false);
            let right_known = outcome.filtered.get(&node.name).map(|r| !r.is_empty()).unwrap_or(false);

            match (left_known, right_known) {
                (true, false) => create_from_relationship(executor, prev, node, outcome).await?,
                (false, true) => create_from_relationship(executor, node, prev, outcome).await?,
                (true, true) => {}
                (false, false) => {
                    return Err(EngineError::semantic(format!(
                        "CREATE relationship between {} and {} has no existing endpoint",
                        prev.name, node.name
                    )));
                }
            }
            prev = node;
        }
    }
    Ok(())
}

async fn create_from_relationship(
    executor: &Executor<'_>,
    known_node: &NodePattern,
    new_node: &NodePattern,
    outcome: &mut MatchOutcome,
) -> Result<()> {
    let known_kind = known_node
        .kind
        .as_deref()
        .ok_or_else(|| EngineError::semantic(format!("CREATE node {} has no kind", known_node.name)))?;
    let new_kind = new_node
        .kind
        .as_deref()
        .ok_or_else(|| EngineError::semantic(format!("CREATE node {} has no kind", new_node.name)))?;
    let rule = executor
        .catalog
        .iter()
        .find(|r| r.links(known_kind, new_kind))
        .ok_or_else(|| EngineError::resolution(format!("no relationship rule links {known_kind} and {new_kind}")))?;
    let known_is_a = rule.kind_a == known_kind;

    let known_resources = outcome.filtered.get(&known_node.name).cloned().unwrap_or_default();
    let mut created = Vec::with_capacity(known_resources.len());

    for known in &known_resources {
        let mut doc = Value::Object(Default::default());
        propagate_fields(rule, known_is_a, known_kind, known, &mut doc);
        if let Some(template) = &new_node.json_template {
            merge_json(&mut doc, template);
        }
        doc.as_object_mut()
            .expect("object")
            .entry("kind".to_string())
            .or_insert_with(|| Value::String(new_kind.to_string()));

        let name = doc_string(&doc, &["metadata", "name"])
            .or_else(|| resource::name(known).map(str::to_string))
            .unwrap_or_else(|| new_node.name.clone());
        let namespace = doc_string(&doc, &["metadata", "namespace"])
            .or_else(|| resource::namespace(known).map(str::to_string))
            .or_else(|| executor.config.default_namespace.clone());

        let created_resource = executor
            .provider
            .create(new_kind, &name, namespace.as_deref(), doc)
            .await
            .map_err(|e| EngineError::provider("CREATE", new_node.name.clone(), "create", e.to_string()))?;
        created.push(created_resource);
    }

    outcome.filtered.entry(new_node.name.clone()).or_default().extend(created);
    Ok(())
}

async fn create_standalone(executor: &Executor<'_>, node: &NodePattern, outcome: &mut MatchOutcome) -> Result<()> {
    let kind = node
        .kind
        .as_deref()
        .ok_or_else(|| EngineError::semantic(format!("CREATE node {} has no kind", node.name)))?;
    let mut doc = node.json_template.clone().unwrap_or_else(|| Value::Object(Default::default()));
    if !doc.is_object() {
        doc = Value::Object(Default::default());
    }
    doc.as_object_mut()
        .expect("object")
        .entry("kind".to_string())
        .or_insert_with(|| Value::String(kind.to_string()));

    let name = doc_string(&doc, &["metadata", "name"]).unwrap_or_else(|| node.name.clone());
    let namespace = doc_string(&doc, &["metadata", "namespace"]).or_else(|| executor.config.default_namespace.clone());

    let resource = executor
        .provider
        .create(kind, &name, namespace.as_deref(), doc)
        .await
        .map_err(|e| EngineError::provider("CREATE", node.name.clone(), "create", e.to_string()))?;
    outcome.filtered.entry(node.name.clone()).or_default().push(resource);
    Ok(())
}

fn doc_string(doc: &Value, path: &[&str]) -> Option<String> {
    let mut cursor = doc;
    for segment in path {
        cursor = cursor.get(segment)?;
    }
    cursor.as_str().map(str::to_string)
}

fn propagate_fields(rule: &RelationshipRule, known_is_a: bool, known_kind: &str, known: &Resource, new_doc: &mut Value) {
    for criterion in &rule.match_criteria {
        if matches!(criterion.comparison, Comparison::OwnerReferenceMatch) {
            if known_is_a {
                if let Some(owner_name) = resource::get_one(known, &criterion.field_a).and_then(|v| v.as_str().map(str::to_string)) {
                    add_owner_reference(new_doc, known_kind, &owner_name);
                }
            }
        } else {
            let (known_field, new_field) = if known_is_a {
                (&criterion.field_a, &criterion.field_b)
            } else {
                (&criterion.field_b, &criterion.field_a)
            };
            if new_field.iter().any(|s| matches!(s, PathStep::Wildcard)) {
                continue;
            }
            if let Some(value) = resource::get_one(known, known_field) {
                resource::set_path(new_doc, new_field, value);
            }
        }

        for default in &criterion.default_props {
            let target_field = if known_is_a { &default.field_b } else { &default.field_a };
            if target_field.iter().any(|s| matches!(s, PathStep::Wildcard)) {
                continue;
            }
            if resource::get_one(new_doc, target_field).is_none() {
                resource::set_path(new_doc, target_field, default.default.clone());
            }
        }
    }
}

fn add_owner_reference(doc: &mut Value, owner_kind: &str, owner_name: &str) {
    if !doc.is_object() {
        *doc = Value::Object(Default::default());
    }
    let obj = doc.as_object_mut().expect("just ensured object");
    let metadata = obj.entry("metadata".to_string()).or_insert_with(|| Value::Object(Default::default()));
    if !metadata.is_object() {
        *metadata = Value::Object(Default::default());
    }
    let metadata_obj = metadata.as_object_mut().expect("just ensured object");
    let owner_refs = metadata_obj
        .entry("ownerReferences".to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if !owner_refs.is_array() {
        *owner_refs = Value::Array(Vec::new());
    }
    owner_refs.as_array_mut().expect("just ensured array").push(serde_json::json!({
        "kind": owner_kind,
        "name": owner_name,
    }));
}

fn merge_json(base: &mut Value, overlay: &Value) {
    if let (Value::Object(base_map), Value::Object(overlay_map)) = (&mut *base, overlay) {
        for (k, v) in overlay_map {
            let entry = base_map.entry(k.clone()).or_insert(Value::Null);
            merge_json(entry, v);
        }
    } else {
        *base = overlay.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_json_overlays_nested_objects() {
        let mut base = serde_json::json!({"metadata": {"name": "x"}, "spec": {"replicas": 1}});
        let overlay = serde_json::json!({"metadata": {"labels": {"app": "y"}}});
        merge_json(&mut base, &overlay);
        assert_eq!(base["metadata"]["name"], serde_json::json!("x"));
        assert_eq!(base["metadata"]["labels"]["app"], serde_json::json!("y"));
        assert_eq!(base["spec"]["replicas"], serde_json::json!(1));
    }
}

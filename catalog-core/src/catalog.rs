//! The relationship rule catalog: a static table of known kind-pair
//! relationships (Pod owned by ReplicaSet, Service selecting Pod, ...), each
//! carrying the field paths and comparison used to decide whether two
//! concrete resources are actually related at query time.

use crate::resource::{self, Resource};
use catalog_ql::ast::{PathStep, Value as AstValue};
use serde_json::Value;

/// How a `matchCriterion`'s extracted `fieldA`/`fieldB` values decide a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// The extracted values are equal.
    Equality,
    /// A's labels map (at `field_a`) is a superset of B's selector map (at
    /// `field_b`): every key in the selector is present in labels with the
    /// same value.
    LabelSelectorSupersetOf,
    /// The array at `field_a` contains the string at `field_b`.
    ArrayContainsString,
    /// B's owner-reference array (at `field_b`) contains an entry whose
    /// `kind`/`name` match A's kind and the value at `field_a`.
    OwnerReferenceMatch,
}

#[derive(Debug, Clone)]
pub struct DefaultProp {
    pub field_a: Vec<PathStep>,
    pub field_b: Vec<PathStep>,
    pub default: Value,
}

#[derive(Debug, Clone)]
pub struct MatchCriterion {
    pub field_a: Vec<PathStep>,
    pub field_b: Vec<PathStep>,
    pub comparison: Comparison,
    pub default_props: Vec<DefaultProp>,
}

#[derive(Debug, Clone)]
pub struct RelationshipRule {
    pub kind_a: &'static str,
    pub kind_b: &'static str,
    pub relationship_label: &'static str,
    pub match_criteria: Vec<MatchCriterion>,
}

impl RelationshipRule {
    /// Does this rule link the two kinds, in either position? Rules are
    /// symmetric for matching purposes (spec §3: "Direction is informational
    /// only for pattern matching").
    pub fn links(&self, kind_a: &str, kind_b: &str) -> bool {
        (self.kind_a == kind_a && self.kind_b == kind_b)
            || (self.kind_a == kind_b && self.kind_b == kind_a)
    }

    pub fn other_kind(&self, known_kind: &str) -> Option<&'static str> {
        if self.kind_a == known_kind {
            Some(self.kind_b)
        } else if self.kind_b == known_kind {
            Some(self.kind_a)
        } else {
            None
        }
    }

    /// Evaluates every criterion against a concrete (a, b) pair, oriented
    /// to match this rule's declared kindA/kindB order. At least one
    /// criterion satisfied is enough to join (spec §4.5: "a criterion holds
    /// when ... the prescribed comparison is true" — the join itself fires
    /// when any declared criterion holds).
    pub fn matches(&self, a: &Resource, b: &Resource) -> bool {
        self.match_criteria
            .iter()
            .any(|criterion| evaluate(self, criterion, a, b))
    }
}

fn evaluate(rule: &RelationshipRule, criterion: &MatchCriterion, a: &Resource, b: &Resource) -> bool {
    match criterion.comparison {
        Comparison::Equality => {
            let vals_a = resource::get_all(a, &criterion.field_a);
            let vals_b = resource::get_all(b, &criterion.field_b);
            vals_a.iter().any(|va| vals_b.iter().any(|vb| va == vb))
        }
        Comparison::LabelSelectorSupersetOf => {
            let labels = resource::get_one(a, &criterion.field_a);
            let selector = resource::get_one(b, &criterion.field_b);
            match (labels.and_then(|v| v.as_object().cloned()), selector.and_then(|v| v.as_object().cloned())) {
                (Some(labels), Some(selector)) if !selector.is_empty() => selector
                    .iter()
                    .all(|(k, v)| labels.get(k) == Some(v)),
                _ => false,
            }
        }
        Comparison::ArrayContainsString => {
            let haystack = resource::get_one(a, &criterion.field_a);
            let needle = resource::get_one(b, &criterion.field_b);
            match (haystack.and_then(|v| v.as_array().cloned()), needle.and_then(|v| v.as_str().map(str::to_string))) {
                (Some(arr), Some(needle)) => arr.iter().any(|v| v.as_str() == Some(needle.as_str())),
                _ => false,
            }
        }
        Comparison::OwnerReferenceMatch => {
            let name_a = resource::get_one(a, &criterion.field_a);
            let Some(name_a) = name_a.as_ref().and_then(Value::as_str) else {
                return false;
            };
            let owners = resource::get_one(b, &criterion.field_b);
            match owners.and_then(|v| v.as_array().cloned()) {
                Some(owners) => owners.iter().any(|owner| {
                    owner.get("kind").and_then(Value::as_str) == Some(rule.kind_a)
                        && owner.get("name").and_then(Value::as_str) == Some(name_a)
                }),
                None => false,
            }
        }
    }
}

fn key(segments: &[&str]) -> Vec<PathStep> {
    segments.iter().map(|s| PathStep::Key(s.to_string())).collect()
}

fn owner_refs_path() -> Vec<PathStep> {
    let mut steps = key(&["metadata", "ownerReferences"]);
    steps.push(PathStep::Wildcard);
    steps
}

fn owner_ref_rule(kind_child: &'static str, kind_owner: &'static str, label: &'static str) -> RelationshipRule {
    RelationshipRule {
        kind_a: kind_owner,
        kind_b: kind_child,
        relationship_label: label,
        match_criteria: vec![MatchCriterion {
            field_a: key(&["metadata", "name"]),
            field_b: owner_refs_path(),
            comparison: Comparison::OwnerReferenceMatch,
            default_props: Vec::new(),
        }],
    }
}

/// The built-in, read-only rule catalog, initialized once (spec §5: "the
/// global rule catalog ... is read-only after init and safe for concurrent
/// reads").
pub fn default_catalog() -> Vec<RelationshipRule> {
    vec![
        owner_ref_rule("Pod", "ReplicaSet", "manages"),
        owner_ref_rule("ReplicaSet", "Deployment", "manages"),
        owner_ref_rule("Pod", "Deployment", "manages"),
        owner_ref_rule("Pod", "DaemonSet", "manages"),
        owner_ref_rule("Pod", "StatefulSet", "manages"),
        owner_ref_rule("Pod", "Job", "manages"),
        RelationshipRule {
            kind_a: "PersistentVolumeClaim",
            kind_b: "Pod",
            relationship_label: "claimedBy",
            match_criteria: vec![MatchCriterion {
                field_a: key(&["metadata", "name"]),
                field_b: {
                    let mut steps = key(&["spec", "volumes"]);
                    steps.push(PathStep::Wildcard);
                    steps.push(PathStep::Key("persistentVolumeClaim".to_string()));
                    steps.push(PathStep::Key("claimName".to_string()));
                    steps
                },
                comparison: Comparison::Equality,
                default_props: Vec::new(),
            }],
        },
        RelationshipRule {
            kind_a: "Service",
            kind_b: "Pod",
            relationship_label: "selects",
            match_criteria: vec![MatchCriterion {
                field_a: key(&["spec", "selector"]),
                field_b: key(&["metadata", "labels"]),
                comparison: Comparison::LabelSelectorSupersetOf,
                default_props: Vec::new(),
            }],
        },
    ]
}

/// Converts an AST property literal to a JSON value, for comparisons that
/// need to compare an extracted document value against a rule-declared
/// default (CREATE's defaultProps application).
pub fn ast_value_to_json(value: &AstValue) -> Value {
    match value {
        AstValue::String(s) => Value::String(s.clone()),
        AstValue::Number(n) => serde_json::Number::from_f64(*n).map(Value::Number).unwrap_or(Value::Null),
        AstValue::Int(i) => Value::Number((*i).into()),
        AstValue::Bool(b) => Value::Bool(*b),
        AstValue::Null => Value::Null,
        AstValue::Json(j) => j.clone(),
        AstValue::Temporal(_) => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn owner_reference_rule_matches_owning_kind_and_name() {
        let rule = owner_ref_rule("Pod", "ReplicaSet", "manages");
        let rs = json!({"kind": "ReplicaSet", "metadata": {"name": "nginx-abc"}});
        let pod_owned = json!({
            "kind": "Pod",
            "metadata": {
                "name": "nginx-abc-123",
                "ownerReferences": [{"kind": "ReplicaSet", "name": "nginx-abc"}]
            }
        });
        let pod_orphan = json!({"kind": "Pod", "metadata": {"name": "standalone"}});
        assert!(rule.matches(&rs, &pod_owned));
        assert!(!rule.matches(&rs, &pod_orphan));
    }

    #[test]
    fn service_selector_rule_requires_superset() {
        let rule = default_catalog().into_iter().find(|r| r.relationship_label == "selects").unwrap();
        let svc = json!({"kind": "Service", "spec": {"selector": {"app": "nginx"}}});
        let matching_pod = json!({"kind": "Pod", "metadata": {"labels": {"app": "nginx", "tier": "web"}}});
        let other_pod = json!({"kind": "Pod", "metadata": {"labels": {"app": "other"}}});
        assert!(rule.matches(&svc, &matching_pod));
        assert!(!rule.matches(&svc, &other_pod));
    }
}

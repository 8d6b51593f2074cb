//! JSON-Patch synthesis for SET.
//!
//! `Add`/`Test` mirror RFC 6902 for the general and map-key cases.
//! [`PatchOp::MergeContainer`] is an explicit "strategic merge" operation
//! for container-subtree writes, chosen by the synthesizer rather than
//! inferred by the provider from a magic `test` op it would otherwise have
//! to pattern-match.

use crate::resource::Resource;
use catalog_ql::ast::PathStep;
use serde_json::Value;

/// One operation in a synthesized patch. `Add`/`Test` mirror RFC 6902 for
/// the general and map-key cases: never output a `remove` op; `nil` values
/// produce `add` with `null`. `MergeContainer` carries enough addressing
/// info for the provider to apply a single field write inside a named
/// container element without clobbering its siblings.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOp {
    Add { path: String, value: Value },
    Test { path: String, value: Value },
    #[serde(rename = "mergeContainer")]
    MergeContainer {
        /// JSON pointer to the `containers` array itself.
        containers_path: String,
        index: usize,
        /// JSON pointer, rooted at the container element, to the field
        /// being set (empty string means "replace the whole element").
        field_path: String,
        value: Value,
    },
}

pub type PatchDocument = Vec<PatchOp>;

/// Builds the RFC-6902 pointer for a step sequence. `~` and `/` are escaped
/// in every key segment (JSON Pointer's own escaping rule); literal `.` is
/// left alone — it was never special in JSON Pointer, only in this DSL's
/// own path syntax.
pub fn pointer(steps: &[PathStep]) -> String {
    let mut out = String::new();
    for step in steps {
        out.push('/');
        match step {
            PathStep::Key(k) => out.push_str(&escape_pointer_segment(k)),
            PathStep::Index(i) => out.push_str(&i.to_string()),
            PathStep::Wildcard => {
                debug_assert!(false, "wildcard must be resolved before pointer building");
            }
        }
    }
    out
}

fn escape_pointer_segment(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

/// Index of a `Key("containers")` step immediately followed by an `Index`
/// step, if the path is a container-subtree assignment (spec §4.5:
/// `spec.template.spec.containers[i]....`).
fn container_subtree_split(steps: &[PathStep]) -> Option<(usize, usize)> {
    for (i, step) in steps.iter().enumerate() {
        if let PathStep::Key(k) = step {
            if k == "containers" {
                if let Some(PathStep::Index(idx)) = steps.get(i + 1) {
                    return Some((i, *idx as usize));
                }
            }
        }
    }
    None
}

/// Does the final step name a map key — one that contains `.` or `/` —
/// making it a label/annotation-style assignment rather than a plain field?
fn is_map_key_assignment(steps: &[PathStep]) -> bool {
    matches!(steps.last(), Some(PathStep::Key(k)) if k.contains('.') || k.contains('/'))
}

/// Synthesizes the patch for one concrete (wildcard-free) assignment path.
/// The executor resolves any `[*]` in the SET target to a concrete index
/// per surviving array element before calling this once per element.
pub fn synthesize(steps: &[PathStep], value: Value) -> PatchDocument {
    if let Some((containers_idx, element_idx)) = container_subtree_split(steps) {
        let containers_path = pointer(&steps[..=containers_idx]);
        let field_path = pointer(&steps[containers_idx + 2..]);
        return vec![PatchOp::MergeContainer {
            containers_path,
            index: element_idx,
            field_path,
            value,
        }];
    }

    if is_map_key_assignment(steps) && steps.len() >= 2 {
        let (last, prefix) = steps.split_last().expect("checked len >= 2 above");
        let PathStep::Key(key) = last else {
            unreachable!("is_map_key_assignment only matches a trailing Key step");
        };
        let map_path = pointer(prefix);
        let mut full_path = map_path.clone();
        full_path.push('/');
        full_path.push_str(&escape_pointer_segment(key));
        return vec![
            PatchOp::Test {
                path: map_path,
                value: Value::Object(Default::default()),
            },
            PatchOp::Add {
                path: full_path,
                value,
            },
        ];
    }

    vec![PatchOp::Add {
        path: pointer(steps),
        value,
    }]
}

#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error("patch test failed at {path}")]
    TestFailed { path: String },
    #[error("invalid JSON pointer {path}")]
    InvalidPointer { path: String },
}

/// Applies a synthesized patch to an in-memory document, so the caller's
/// local copy matches what sending the patch to the provider is expected to
/// produce (spec testable property: "applying the patch then re-reading the
/// resource reflects the assignment").
pub fn apply_patch(doc: &mut Resource, ops: &[PatchOp]) -> Result<(), ApplyError> {
    for op in ops {
        match op {
            PatchOp::Test { path, value } => {
                let existing = resolve_pointer(doc, path);
                let ok = match existing {
                    Some(v) => v == value,
                    None => value.is_object() && value.as_object().is_some_and(|m| m.is_empty())
                        || value.is_array() && value.as_array().is_some_and(|a| a.is_empty()),
                };
                if !ok {
                    return Err(ApplyError::TestFailed { path: path.clone() });
                }
                if existing.is_none() {
                    set_pointer(doc, path, value.clone())?;
                }
            }
            PatchOp::Add { path, value } => {
                set_pointer(doc, path, value.clone())?;
            }
            PatchOp::MergeContainer {
                containers_path,
                index,
                field_path,
                value,
            } => {
                let containers = ensure_array_at(doc, containers_path)?;
                while containers.len() <= *index {
                    containers.push(Value::Object(Default::default()));
                }
                if field_path.is_empty() {
                    containers[*index] = value.clone();
                } else {
                    set_pointer(&mut containers[*index], field_path, value.clone())?;
                }
            }
        }
    }
    Ok(())
}

fn split_pointer(path: &str) -> Vec<String> {
    if path.is_empty() {
        return Vec::new();
    }
    path.trim_start_matches('/')
        .split('/')
        .map(|s| s.replace("~1", "/").replace("~0", "~"))
        .collect()
}

fn resolve_pointer<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let mut cursor = doc;
    for segment in split_pointer(path) {
        cursor = if let Ok(idx) = segment.parse::<usize>() {
            cursor.as_array()?.get(idx)?
        } else {
            cursor.as_object()?.get(&segment)?
        };
    }
    Some(cursor)
}

fn ensure_array_at<'a>(doc: &'a mut Value, path: &str) -> Result<&'a mut Vec<Value>, ApplyError> {
    let segments = split_pointer(path);
    let mut cursor = doc;
    for segment in &segments {
        cursor = navigate_or_create(cursor, segment);
    }
    if !cursor.is_array() {
        *cursor = Value::Array(Vec::new());
    }
    Ok(cursor.as_array_mut().expect("just ensured array"))
}

fn set_pointer(doc: &mut Value, path: &str, value: Value) -> Result<(), ApplyError> {
    let segments = split_pointer(path);
    let Some((last, prefix)) = segments.split_last() else {
        *doc = value;
        return Ok(());
    };
    let mut cursor = doc;
    for segment in prefix {
        cursor = navigate_or_create(cursor, segment);
    }
    if let Ok(idx) = last.parse::<usize>() {
        if !cursor.is_array() {
            *cursor = Value::Array(Vec::new());
        }
        let arr = cursor.as_array_mut().expect("just ensured array");
        while arr.len() <= idx {
            arr.push(Value::Null);
        }
        arr[idx] = value;
    } else {
        if !cursor.is_object() {
            *cursor = Value::Object(Default::default());
        }
        cursor
            .as_object_mut()
            .expect("just ensured object")
            .insert(last.clone(), value);
    }
    Ok(())
}

fn navigate_or_create<'a>(cursor: &'a mut Value, segment: &str) -> &'a mut Value {
    if let Ok(idx) = segment.parse::<usize>() {
        if !cursor.is_array() {
            *cursor = Value::Array(Vec::new());
        }
        let arr = cursor.as_array_mut().expect("just ensured array");
        while arr.len() <= idx {
            arr.push(Value::Object(Default::default()));
        }
        &mut arr[idx]
    } else {
        if !cursor.is_object() {
            *cursor = Value::Object(Default::default());
        }
        cursor
            .as_object_mut()
            .expect("just ensured object")
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Default::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn synthesizes_map_key_assignment_with_escaped_slash() {
        let steps = vec![
            PathStep::Key("metadata".into()),
            PathStep::Key("labels".into()),
            PathStep::Key("app.kubernetes.io/name".into()),
        ];
        let ops = synthesize(&steps, json!("nginx"));
        assert_eq!(
            ops,
            vec![
                PatchOp::Test {
                    path: "/metadata/labels".into(),
                    value: json!({}),
                },
                PatchOp::Add {
                    path: "/metadata/labels/app.kubernetes.io~1name".into(),
                    value: json!("nginx"),
                },
            ]
        );
    }

    #[test]
    fn synthesizes_plain_path_assignment() {
        let steps = vec![PathStep::Key("spec".into()), PathStep::Key("replicas".into())];
        let ops = synthesize(&steps, json!(3));
        assert_eq!(
            ops,
            vec![PatchOp::Add {
                path: "/spec/replicas".into(),
                value: json!(3),
            }]
        );
    }

    #[test]
    fn synthesizes_container_subtree_merge() {
        let steps = vec![
            PathStep::Key("spec".into()),
            PathStep::Key("containers".into()),
            PathStep::Index(0),
            PathStep::Key("image".into()),
        ];
        let ops = synthesize(&steps, json!("nginx:1.27"));
        assert_eq!(
            ops,
            vec![PatchOp::MergeContainer {
                containers_path: "/spec/containers".into(),
                index: 0,
                field_path: "/image".into(),
                value: json!("nginx:1.27"),
            }]
        );
    }

    #[test]
    fn apply_patch_reflects_map_key_assignment() {
        let steps = vec![
            PathStep::Key("metadata".into()),
            PathStep::Key("labels".into()),
            PathStep::Key("app.kubernetes.io/name".into()),
        ];
        let ops = synthesize(&steps, json!("nginx"));
        let mut doc = json!({"metadata": {"labels": {"tier": "web"}}});
        apply_patch(&mut doc, &ops).unwrap();
        assert_eq!(doc["metadata"]["labels"]["app.kubernetes.io/name"], json!("nginx"));
        assert_eq!(doc["metadata"]["labels"]["tier"], json!("web"));
    }

    #[test]
    fn apply_patch_merges_container_field() {
        let mut doc = json!({"spec": {"containers": [{"name": "a", "image": "old"}]}});
        let ops = vec![PatchOp::MergeContainer {
            containers_path: "/spec/containers".into(),
            index: 0,
            field_path: "/image".into(),
            value: json!("new"),
        }];
        apply_patch(&mut doc, &ops).unwrap();
        assert_eq!(doc["spec"]["containers"][0]["image"], json!("new"));
        assert_eq!(doc["spec"]["containers"][0]["name"], json!("a"));
    }
}

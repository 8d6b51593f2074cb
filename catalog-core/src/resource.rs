//! The resource document model and path-indexed access.
//!
//! Resources are opaque documents from a provider, not a closed set of known
//! Kubernetes kinds, so they're modeled as a recursive sum type (object |
//! array | string | number | bool | null). `serde_json::Value` already *is*
//! that sum type, so `Resource` is a thin alias over it rather than a
//! hand-rolled reimplementation.
//!
//! Path compilation happens once, in `catalog-ql`'s parser — `JsonPath` is
//! already a `Vec<PathStep>`, not a string re-parsed on every lookup.

use catalog_ql::ast::PathStep;
use serde_json::Value;

pub type Resource = Value;

pub fn kind(res: &Resource) -> Option<&str> {
    res.get("kind").and_then(Value::as_str)
}

pub fn name(res: &Resource) -> Option<&str> {
    res.get("metadata")
        .and_then(|m| m.get("name"))
        .and_then(Value::as_str)
}

pub fn namespace(res: &Resource) -> Option<&str> {
    res.get("metadata")
        .and_then(|m| m.get("namespace"))
        .and_then(Value::as_str)
}

/// `"<kind>/<name>"`, per spec §3/§6.4 edge endpoint format.
pub fn kind_name_id(res: &Resource) -> String {
    format!(
        "{}/{}",
        kind(res).unwrap_or(""),
        name(res).unwrap_or("")
    )
}

/// Resolves a compiled path against a document, returning every value that
/// matches. A `Wildcard` step fans out over every element of the array at
/// that position, so "at least one array element satisfies" and
/// concatenated-slice semantics both build on this; a `Key`/`Index` step
/// narrows to (at most) one value. Missing keys/out-of-range indices simply
/// yield no matches rather than erroring — callers decide whether an empty
/// result is meaningful.
pub fn get_all(value: &Value, steps: &[PathStep]) -> Vec<Value> {
    let mut frontier = vec![value.clone()];
    for step in steps {
        let mut next = Vec::new();
        for v in frontier {
            match step {
                PathStep::Key(k) => {
                    if let Some(found) = v.get(k) {
                        next.push(found.clone());
                    }
                }
                PathStep::Index(i) => {
                    if let Some(arr) = v.as_array() {
                        let idx = normalize_index(*i, arr.len());
                        if let Some(found) = idx.and_then(|idx| arr.get(idx)) {
                            next.push(found.clone());
                        }
                    }
                }
                PathStep::Wildcard => {
                    if let Some(arr) = v.as_array() {
                        next.extend(arr.iter().cloned());
                    }
                }
            }
        }
        frontier = next;
    }
    frontier
}

/// First match of [`get_all`], for positions that expect a scalar (ORDER BY
/// keys, single-node WHERE predicates outside a wildcard).
pub fn get_one(value: &Value, steps: &[PathStep]) -> Option<Value> {
    get_all(value, steps).into_iter().next()
}

fn normalize_index(i: i64, len: usize) -> Option<usize> {
    if i >= 0 {
        Some(i as usize)
    } else {
        len.checked_sub(i.unsigned_abs() as usize)
    }
}

/// Resolves every concrete array index a `Wildcard` step would expand to at
/// the given prefix, in document order. Used by SET to turn a wildcard
/// assignment into one concrete assignment per surviving element (spec
/// §4.5: "traverse the referenced array and apply the assignment to each
/// element").
pub fn wildcard_indices(value: &Value, prefix: &[PathStep]) -> Vec<usize> {
    match get_one(value, prefix) {
        Some(Value::Array(arr)) => (0..arr.len()).collect(),
        _ => Vec::new(),
    }
}

/// Sets a value at a path, creating intermediate objects (never arrays — the
/// executor resolves any wildcard in the path to a concrete index before
/// calling this) as needed. Mirrors the mutation the patch synthesizer's
/// `add` ops perform so the in-memory document matches what would result
/// from applying the emitted patch against the provider.
pub fn set_path(root: &mut Value, steps: &[PathStep], new_value: Value) {
    let Some((last, prefix)) = steps.split_last() else {
        *root = new_value;
        return;
    };
    let mut cursor = root;
    for step in prefix {
        cursor = match step {
            PathStep::Key(k) => {
                if !cursor.is_object() {
                    *cursor = Value::Object(Default::default());
                }
                cursor
                    .as_object_mut()
                    .expect("just ensured object")
                    .entry(k.clone())
                    .or_insert_with(|| Value::Object(Default::default()))
            }
            PathStep::Index(i) => {
                if !cursor.is_array() {
                    *cursor = Value::Array(Vec::new());
                }
                let arr = cursor.as_array_mut().expect("just ensured array");
                let idx = normalize_index(*i, arr.len()).unwrap_or(arr.len());
                while arr.len() <= idx {
                    arr.push(Value::Null);
                }
                &mut arr[idx]
            }
            PathStep::Wildcard => {
                // Resolved to concrete indices before this is called.
                return;
            }
        };
    }
    match last {
        PathStep::Key(k) => {
            if !cursor.is_object() {
                *cursor = Value::Object(Default::default());
            }
            cursor
                .as_object_mut()
                .expect("just ensured object")
                .insert(k.clone(), new_value);
        }
        PathStep::Index(i) => {
            if !cursor.is_array() {
                *cursor = Value::Array(Vec::new());
            }
            let arr = cursor.as_array_mut().expect("just ensured array");
            let idx = normalize_index(*i, arr.len()).unwrap_or(arr.len());
            while arr.len() <= idx {
                arr.push(Value::Null);
            }
            arr[idx] = new_value;
        }
        PathStep::Wildcard => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn get_all_follows_wildcard_into_array() {
        let doc = json!({"spec": {"containers": [{"name": "a"}, {"name": "b"}]}});
        let steps = vec![
            PathStep::Key("spec".into()),
            PathStep::Key("containers".into()),
            PathStep::Wildcard,
            PathStep::Key("name".into()),
        ];
        let got = get_all(&doc, &steps);
        assert_eq!(got, vec![json!("a"), json!("b")]);
    }

    #[test]
    fn set_path_creates_intermediate_objects() {
        let mut doc = json!({});
        set_path(
            &mut doc,
            &[
                PathStep::Key("metadata".into()),
                PathStep::Key("labels".into()),
                PathStep::Key("app.kubernetes.io/name".into()),
            ],
            json!("nginx"),
        );
        assert_eq!(doc["metadata"]["labels"]["app.kubernetes.io/name"], json!("nginx"));
    }

    #[test]
    fn wildcard_indices_counts_array_elements() {
        let doc = json!({"spec": {"containers": [{}, {}, {}]}});
        let idx = wildcard_indices(
            &doc,
            &[PathStep::Key("spec".into()), PathStep::Key("containers".into())],
        );
        assert_eq!(idx, vec![0, 1, 2]);
    }
}

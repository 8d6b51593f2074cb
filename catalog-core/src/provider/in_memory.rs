//! Reference `ClusterProvider`: an in-memory resource store.
//!
//! A `Mutex`-guarded store, organized as one `Vec<Resource>` per kind per
//! context, since the provider interface this implements is kind+selector
//! based rather than a single queryable graph. Used by tests and as a
//! drop-in stand-in for a real cluster backend.

use crate::errors::{EngineError, Result};
use crate::patch::apply_patch;
use crate::provider::{ClusterProvider, Gvr, ListQuery, PatchDocument};
use crate::resource::Resource;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

type Store = HashMap<String, Vec<Resource>>;

#[derive(Default)]
struct ContextRegistry {
    stores: Mutex<HashMap<String, Arc<Mutex<Store>>>>,
}

impl ContextRegistry {
    fn store_for(&self, context: &str) -> Arc<Mutex<Store>> {
        self.stores
            .lock()
            .expect("context registry lock poisoned")
            .entry(context.to_string())
            .or_default()
            .clone()
    }
}

/// An in-memory `ClusterProvider`. The default context is `""`; named
/// contexts (spec §4.9) are independent stores reachable only through
/// [`ClusterProvider::clone_for_context`], mirroring how the real provider's
/// per-context clones are isolated kubeconfig contexts.
pub struct InMemoryProvider {
    registry: Arc<ContextRegistry>,
    context: String,
    store: Arc<Mutex<Store>>,
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryProvider {
    pub fn new() -> Self {
        let registry = Arc::new(ContextRegistry::default());
        let store = registry.store_for("");
        InMemoryProvider {
            registry,
            context: String::new(),
            store,
        }
    }

    /// Seeds a kind's resource list for this provider's context. Test setup
    /// helper — not part of the `ClusterProvider` interface.
    pub fn seed(&self, kind: &str, resources: Vec<Resource>) {
        self.store
            .lock()
            .expect("store lock poisoned")
            .insert(kind.to_string(), resources);
    }

    /// Same as [`Self::seed`] but targets a named context directly, without
    /// going through `clone_for_context` first.
    pub fn seed_context(&self, context: &str, kind: &str, resources: Vec<Resource>) {
        self.registry
            .store_for(context)
            .lock()
            .expect("store lock poisoned")
            .insert(kind.to_string(), resources);
    }

    fn matches_field_selector(resource: &Resource, selector: &str) -> bool {
        for clause in selector.split(',') {
            let Some((key, value)) = clause.split_once('=') else {
                continue;
            };
            if key.trim() == "metadata.name" {
                if crate::resource::name(resource) != Some(value.trim()) {
                    return false;
                }
            }
        }
        true
    }

    fn matches_label_selector(resource: &Resource, selector: &str) -> bool {
        let labels = resource
            .get("metadata")
            .and_then(|m| m.get("labels"))
            .and_then(Value::as_object);
        for clause in selector.split(',') {
            let Some((key, value)) = clause.split_once('=') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());
            let actual = labels.and_then(|l| l.get(key)).and_then(Value::as_str);
            if actual != Some(value) {
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl ClusterProvider for InMemoryProvider {
    async fn list(&self, kind: &str, query: &ListQuery) -> Result<Vec<Resource>> {
        if query.field_selector.is_some() && query.label_selector.is_some() {
            return Err(EngineError::semantic(
                "name and label selectors are mutually exclusive",
            ));
        }
        let store = self.store.lock().expect("store lock poisoned");
        let Some(resources) = store.get(kind) else {
            return Ok(Vec::new());
        };
        let filtered = resources
            .iter()
            .filter(|r| {
                if let Some(ns) = &query.namespace {
                    if crate::resource::namespace(r) != Some(ns.as_str()) {
                        return false;
                    }
                }
                if let Some(fs) = &query.field_selector {
                    if !Self::matches_field_selector(r, fs) {
                        return false;
                    }
                }
                if let Some(ls) = &query.label_selector {
                    if !Self::matches_label_selector(r, ls) {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();
        Ok(filtered)
    }

    async fn delete(&self, kind: &str, name: &str, namespace: Option<&str>) -> Result<()> {
        let mut store = self.store.lock().expect("store lock poisoned");
        if let Some(resources) = store.get_mut(kind) {
            resources.retain(|r| {
                !(crate::resource::name(r) == Some(name)
                    && crate::resource::namespace(r) == namespace)
            });
        }
        Ok(())
    }

    async fn create(
        &self,
        kind: &str,
        name: &str,
        namespace: Option<&str>,
        mut template: Value,
    ) -> Result<Resource> {
        if !template.is_object() {
            template = Value::Object(Default::default());
        }
        let obj = template.as_object_mut().expect("just ensured object");
        obj.entry("kind")
            .or_insert_with(|| Value::String(kind.to_string()));
        let metadata = obj
            .entry("metadata")
            .or_insert_with(|| Value::Object(Default::default()));
        if !metadata.is_object() {
            *metadata = Value::Object(Default::default());
        }
        let metadata_obj = metadata.as_object_mut().expect("just ensured object");
        metadata_obj.insert("name".to_string(), Value::String(name.to_string()));
        if let Some(ns) = namespace {
            metadata_obj.insert("namespace".to_string(), Value::String(ns.to_string()));
        }
        let mut store = self.store.lock().expect("store lock poisoned");
        store
            .entry(kind.to_string())
            .or_default()
            .push(template.clone());
        Ok(template)
    }

    async fn patch(
        &self,
        kind: &str,
        name: &str,
        namespace: Option<&str>,
        patch: &PatchDocument,
    ) -> Result<Resource> {
        let mut store = self.store.lock().expect("store lock poisoned");
        let resources = store
            .get_mut(kind)
            .ok_or_else(|| EngineError::provider("SET", name, "patch", "no such kind"))?;
        let resource = resources
            .iter_mut()
            .find(|r| {
                crate::resource::name(r) == Some(name) && crate::resource::namespace(r) == namespace
            })
            .ok_or_else(|| EngineError::provider("SET", name, "patch", "resource not found"))?;
        apply_patch(resource, patch)
            .map_err(|e| EngineError::provider("SET", name, "patch", e.to_string()))?;
        Ok(resource.clone())
    }

    async fn find_gvr(&self, kind: &str) -> Result<Gvr> {
        Ok(well_known_gvr(kind).unwrap_or_else(|| Gvr {
            group: String::new(),
            version: "v1".to_string(),
            resource: format!("{}s", kind.to_lowercase()),
        }))
    }

    async fn resource_specs(&self) -> Result<HashMap<String, Vec<String>>> {
        Ok(HashMap::new())
    }

    fn clone_for_context(&self, context: &str) -> Result<Box<dyn ClusterProvider>> {
        Ok(Box::new(InMemoryProvider {
            registry: self.registry.clone(),
            context: context.to_string(),
            store: self.registry.store_for(context),
        }))
    }
}

fn well_known_gvr(kind: &str) -> Option<Gvr> {
    let (group, version, resource) = match kind {
        "Pod" => ("", "v1", "pods"),
        "Service" => ("", "v1", "services"),
        "Namespace" => ("", "v1", "namespaces"),
        "ConfigMap" => ("", "v1", "configmaps"),
        "Node" => ("", "v1", "nodes"),
        "ServiceAccount" => ("", "v1", "serviceaccounts"),
        "PersistentVolume" => ("", "v1", "persistentvolumes"),
        "PersistentVolumeClaim" => ("", "v1", "persistentvolumeclaims"),
        "Deployment" => ("apps", "v1", "deployments"),
        "ReplicaSet" => ("apps", "v1", "replicasets"),
        "StatefulSet" => ("apps", "v1", "statefulsets"),
        "DaemonSet" => ("apps", "v1", "daemonsets"),
        "Job" => ("batch", "v1", "jobs"),
        "Ingress" => ("networking.k8s.io", "v1", "ingresses"),
        "NetworkPolicy" => ("networking.k8s.io", "v1", "networkpolicies"),
        "EndpointSlice" => ("discovery.k8s.io", "v1", "endpointslices"),
        "StorageClass" => ("storage.k8s.io", "v1", "storageclasses"),
        _ => return None,
    };
    Some(Gvr {
        group: group.to_string(),
        version: version.to_string(),
        resource: resource.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pod(name: &str, ns: &str, labels: Value) -> Resource {
        json!({
            "kind": "Pod",
            "metadata": {"name": name, "namespace": ns, "labels": labels}
        })
    }

    #[tokio::test]
    async fn list_filters_by_namespace_and_label() {
        let provider = InMemoryProvider::new();
        provider.seed(
            "Pod",
            vec![
                pod("a", "default", json!({"app": "x"})),
                pod("b", "default", json!({"app": "y"})),
                pod("c", "other", json!({"app": "x"})),
            ],
        );
        let results = provider
            .list(
                "Pod",
                &ListQuery {
                    label_selector: Some("app=x".to_string()),
                    namespace: Some("default".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(crate::resource::name(&results[0]), Some("a"));
    }

    #[tokio::test]
    async fn contexts_are_isolated() {
        let provider = InMemoryProvider::new();
        provider.seed("Pod", vec![pod("a", "default", json!({}))]);
        let cloned = provider.clone_for_context("prod").unwrap();
        let in_prod = cloned
            .list("Pod", &ListQuery::default())
            .await
            .unwrap();
        assert!(in_prod.is_empty());
    }
}

//! The `ClusterProvider` trait: the external collaborator that actually
//! knows how to list, patch, and delete cluster resources.
//!
//! A real Kubernetes client implementation is out of scope; this module
//! only defines the interface, expressed with `async_trait::async_trait`
//! over a shared `Result<T>`, plus an in-memory reference implementation
//! used by tests.

use crate::errors::Result;
use crate::resource::Resource;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

pub use crate::patch::{PatchDocument, PatchOp};

/// Group/Version/Resource, as returned by `findGVR` (spec §6.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gvr {
    pub group: String,
    pub version: String,
    pub resource: String,
}

/// `list(kind, fieldSelector, labelSelector, namespace)`. Name and label
/// selectors are mutually exclusive at the call site (spec §4.5 step 2);
/// the provider is handed whichever the executor determined applies.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub field_selector: Option<String>,
    pub label_selector: Option<String>,
    pub namespace: Option<String>,
}

/// The external collaborator spec §6.3 describes. `cloneForContext`
/// supports the multi-context dispatcher (§4.9); everything else is used
/// directly by the executor (§4.5).
#[async_trait]
pub trait ClusterProvider: Send + Sync {
    async fn list(&self, kind: &str, query: &ListQuery) -> Result<Vec<Resource>>;
    async fn delete(&self, kind: &str, name: &str, namespace: Option<&str>) -> Result<()>;
    async fn create(
        &self,
        kind: &str,
        name: &str,
        namespace: Option<&str>,
        template: Value,
    ) -> Result<Resource>;
    async fn patch(
        &self,
        kind: &str,
        name: &str,
        namespace: Option<&str>,
        patch: &PatchDocument,
    ) -> Result<Resource>;
    async fn find_gvr(&self, kind: &str) -> Result<Gvr>;
    async fn resource_specs(&self) -> Result<HashMap<String, Vec<String>>>;
    /// Returns a provider bound to the named context, for the multi-context
    /// dispatcher (§4.9). Each context is otherwise an independent provider
    /// instance — no shared mutable state crosses the boundary.
    fn clone_for_context(&self, context: &str) -> Result<Box<dyn ClusterProvider>>;
}

pub mod in_memory;
pub use in_memory::InMemoryProvider;

//! SET clause execution (spec §4.5 SET, §4.7 Patch Synthesizer).
//!
//! One JSON-Patch document per concrete assignment. A wildcard step in the
//! target path fans out into one patch per surviving array element —
//! `resource::wildcard_indices` only resolves the array length at the
//! wildcard's position, so each index is substituted into the path's
//! `Wildcard` slot before [`patch::synthesize`] ever sees it (`synthesize`
//! panics on an unresolved wildcard).

use super::match_exec::MatchOutcome;
use super::Executor;
use crate::catalog::ast_value_to_json;
use crate::errors::{EngineError, Result};
use crate::patch;
use crate::resource::{self, Resource};
use catalog_ql::ast::{PathStep, SetClause};

pub async fn execute(executor: &Executor<'_>, set: &SetClause, outcome: &mut MatchOutcome) -> Result<()> {
    for assignment in &set.assignments {
        let variable = assignment.path.variable.clone();
        let Some(resources) = outcome.filtered.get(&variable).cloned() else {
            continue;
        };
        let value = ast_value_to_json(&assignment.value);

        let mut updated = Vec::with_capacity(resources.len());
        for resource in resources {
            let kind = resource::kind(&resource).unwrap_or_default().to_string();
            let name = resource::name(&resource).unwrap_or_default().to_string();
            let namespace = resource::namespace(&resource).map(str::to_string);

            let mut current = resource;
            for steps in expand_wildcard(&current, &assignment.path.steps) {
                let doc = patch::synthesize(&steps, value.clone());
                current = executor
                    .provider
                    .patch(&kind, &name, namespace.as_deref(), &doc)
                    .await
                    .map_err(|e| EngineError::provider("SET", variable.clone(), "patch", e.to_string()))?;
            }
            updated.push(current);
        }
        outcome.filtered.insert(variable, updated);
    }
    Ok(())
}

/// Expands a single `Wildcard` step (if any) into one concrete `Index` step
/// per element currently in that array. Paths without a wildcard pass
/// through unchanged as their one-element result.
fn expand_wildcard(resource: &Resource, steps: &[PathStep]) -> Vec<Vec<PathStep>> {
    let Some(pos) = steps.iter().position(|s| matches!(s, PathStep::Wildcard)) else {
        return vec![steps.to_vec()];
    };
    let indices = resource::wildcard_indices(resource, &steps[..pos]);
    indices
        .into_iter()
        .map(|i| {
            let mut concrete = steps.to_vec();
            concrete[pos] = PathStep::Index(i as i64);
            concrete
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_ql::ast::JsonPath;

    #[test]
    fn expand_wildcard_passes_through_concrete_paths() {
        let resource = serde_json::json!({"spec": {"replicas": 3}});
        let steps = vec![PathStep::Key("spec".into()), PathStep::Key("replicas".into())];
        assert_eq!(expand_wildcard(&resource, &steps), vec![steps]);
    }

    #[test]
    fn expand_wildcard_fans_out_over_array_length() {
        let resource = serde_json::json!({"spec": {"containers": [{"image": "a"}, {"image": "b"}]}});
        let steps = vec![
            PathStep::Key("spec".into()),
            PathStep::Key("containers".into()),
            PathStep::Wildcard,
            PathStep::Key("image".into()),
        ];
        let expanded = expand_wildcard(&resource, &steps);
        assert_eq!(expanded.len(), 2);
        assert_eq!(expanded[0][2], PathStep::Index(0));
        assert_eq!(expanded[1][2], PathStep::Index(1));
        let _ = JsonPath {
            variable: "p".to_string(),
            steps: steps.clone(),
        };
    }
}

//! DELETE clause execution (spec §4.5 DELETE).
//!
//! A listed variable absent from the MATCH result (e.g. a kindless-rewrite
//! branch variable that never survived) is silently skipped rather than
//! treated as an error.

use super::match_exec::MatchOutcome;
use super::Executor;
use crate::errors::{EngineError, Result};
use crate::resource;
use catalog_ql::ast::DeleteClause;

pub async fn execute(executor: &Executor<'_>, delete: &DeleteClause, outcome: &mut MatchOutcome) -> Result<()> {
    for variable in &delete.variables {
        let Some(resources) = outcome.filtered.get(variable).cloned() else {
            continue;
        };
        for resource in resources {
            let kind = resource::kind(&resource).unwrap_or_default().to_string();
            let name = resource::name(&resource).unwrap_or_default().to_string();
            let namespace = resource::namespace(&resource).map(str::to_string);
            executor
                .provider
                .delete(&kind, &name, namespace.as_deref())
                .await
                .map_err(|e| EngineError::provider("DELETE", variable.clone(), "delete", e.to_string()))?;
        }
        outcome.filtered.remove(variable);
    }
    Ok(())
}

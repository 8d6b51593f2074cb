//! Sub-match filter: a WHERE-embedded existence/absence pattern that reuses
//! a variable already bound by the outer MATCH.
//!
//! The reference variable's kind comes from the outer MATCH, not from the
//! sub-pattern itself — every other node in the sub-pattern must carry an
//! explicit kind, since kindless inference only resolves the top-level
//! MATCH. The reference variable's resources are threaded through as a
//! typed `preset`/`kind_overrides` pair into the shared
//! [`super::match_exec::run`] core, rather than reinterpreted from a
//! sentinel-string variable name.

use super::match_exec::{self, MatchOutcome};
use super::Executor;
use crate::errors::{EngineError, Result};
use crate::resource::Resource;
use catalog_ql::ast::{MatchClause, SubMatchFilter};
use std::collections::HashMap;

pub async fn apply(
    executor: &Executor<'_>,
    sm: &SubMatchFilter,
    outer_kinds: &HashMap<String, String>,
    outcome: &mut MatchOutcome,
) -> Result<()> {
    for chain in &sm.chains {
        let mut nodes = vec![&chain.start];
        nodes.extend(chain.segments.iter().map(|s| &s.node));
        for node in nodes {
            if node.name == sm.reference_name {
                continue;
            }
            if node.kind.is_none() {
                return Err(EngineError::semantic(format!(
                    "sub-match node {} must have an explicit kind",
                    node.name
                )));
            }
        }
    }

    let reference_kind = outer_kinds.get(&sm.reference_name).cloned().ok_or_else(|| {
        EngineError::semantic(format!(
            "sub-match reference variable {} is not bound by the outer MATCH",
            sm.reference_name
        ))
    })?;
    let Some(candidates) = outcome.filtered.get(&sm.reference_name).cloned() else {
        return Ok(());
    };

    let mut kept = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let mut preset: HashMap<String, Vec<Resource>> = HashMap::new();
        preset.insert(sm.reference_name.clone(), vec![candidate.clone()]);
        let mut overrides: HashMap<String, String> = HashMap::new();
        overrides.insert(sm.reference_name.clone(), reference_kind.clone());

        let scratch = MatchClause {
            chains: sm.chains.clone(),
            filters: Vec::new(),
            span: sm.span,
        };
        let sub_outcome = match_exec::run(executor, &scratch, &preset, &overrides).await?;
        let present = sub_outcome
            .filtered
            .get(&sm.reference_name)
            .map(|list| !list.is_empty())
            .unwrap_or(false);

        if present != sm.negated {
            kept.push(candidate);
        }
    }

    outcome.filtered.insert(sm.reference_name.clone(), kept);
    Ok(())
}

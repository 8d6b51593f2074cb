//! WHERE key-value filter evaluation.
//!
//! Comparison dispatches on value *kind*, not reflection: numeric operands
//! compare numerically, falling back to stringly comparison only when both
//! sides fail numeric coercion. Regexes are compiled once per query and
//! cached by pattern string.

use crate::errors::{EngineError, Result};
use crate::resource::{self, Resource};
use crate::temporal;
use catalog_ql::ast::{JsonPath, Operator, Value as AstValue};
use regex::Regex;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;

/// Per-query regex cache for `=~` filters (§10.5: "avoiding recompilation
/// across fixpoint passes").
#[derive(Default)]
pub struct RegexCache {
    compiled: RefCell<HashMap<String, Regex>>,
}

impl RegexCache {
    pub fn with_capacity(capacity: usize) -> Self {
        RegexCache {
            compiled: RefCell::new(HashMap::with_capacity(capacity)),
        }
    }

    fn get_or_compile(&self, pattern: &str) -> Result<Regex> {
        if let Some(re) = self.compiled.borrow().get(pattern) {
            return Ok(re.clone());
        }
        let re = Regex::new(pattern)
            .map_err(|e| EngineError::semantic(format!("invalid regex {pattern:?}: {e}")))?;
        self.compiled.borrow_mut().insert(pattern.to_string(), re.clone());
        Ok(re)
    }
}

/// Evaluates one key-value filter against a resource. Wildcards in the path
/// mean "at least one array element satisfies the predicate" (spec §4.5).
pub fn evaluate(
    resource: &Resource,
    path: &JsonPath,
    operator: Operator,
    rhs: &AstValue,
    negated: bool,
    regex_cache: &RegexCache,
) -> Result<bool> {
    let values = resource::get_all(resource, &path.steps);
    let outcome = if values.is_empty() {
        false
    } else {
        values
            .iter()
            .map(|v| compare_one(v, operator, rhs, regex_cache))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .any(|ok| ok)
    };
    Ok(outcome != negated)
}

fn compare_one(lhs: &Value, operator: Operator, rhs: &AstValue, regex_cache: &RegexCache) -> Result<bool> {
    if let AstValue::Temporal(expr) = rhs {
        let Value::String(s) = lhs else {
            return Ok(false);
        };
        let lhs_dt = temporal::parse_rfc3339(s)?;
        let rhs_value = temporal::eval(expr)?;
        let temporal::TemporalValue::DateTime(rhs_dt) = rhs_value else {
            return Err(EngineError::arithmetic("temporal comparison right side must be a datetime"));
        };
        return Ok(match operator {
            Operator::Eq => lhs_dt == rhs_dt,
            Operator::Neq => lhs_dt != rhs_dt,
            Operator::Lt => lhs_dt < rhs_dt,
            Operator::Gt => lhs_dt > rhs_dt,
            Operator::Lte => lhs_dt <= rhs_dt,
            Operator::Gte => lhs_dt >= rhs_dt,
            Operator::Contains | Operator::RegexMatch => {
                return Err(EngineError::semantic("CONTAINS/regex is not defined for temporal values"));
            }
        });
    }

    match operator {
        Operator::RegexMatch => {
            let AstValue::String(pattern) = rhs else {
                return Err(EngineError::semantic("=~ requires a string pattern"));
            };
            let haystack = stringify(lhs);
            let re = regex_cache.get_or_compile(pattern)?;
            Ok(re.is_match(&haystack))
        }
        Operator::Contains => {
            let haystack = stringify(lhs);
            let needle = stringify(&crate::catalog::ast_value_to_json(rhs));
            Ok(haystack.contains(&needle))
        }
        Operator::Eq | Operator::Neq | Operator::Lt | Operator::Gt | Operator::Lte | Operator::Gte => {
            compare_ordered(lhs, operator, rhs)
        }
    }
}

fn compare_ordered(lhs: &Value, operator: Operator, rhs: &AstValue) -> Result<bool> {
    let rhs_json = crate::catalog::ast_value_to_json(rhs);

    if let (Some(a), Some(b)) = (as_f64(lhs), as_f64(&rhs_json)) {
        return Ok(apply_ordering(operator, a.partial_cmp(&b)));
    }

    if let (Value::Bool(a), Value::Bool(b)) = (lhs, &rhs_json) {
        return Ok(match operator {
            Operator::Eq => a == b,
            Operator::Neq => a != b,
            _ => return Err(EngineError::semantic("ordering operator not defined for booleans")),
        });
    }

    let a = stringify(lhs);
    let b = stringify(&rhs_json);
    Ok(apply_ordering(operator, a.partial_cmp(&b)))
}

fn apply_ordering(operator: Operator, ordering: Option<std::cmp::Ordering>) -> bool {
    use std::cmp::Ordering::*;
    match (operator, ordering) {
        (Operator::Eq, Some(Equal)) => true,
        (Operator::Neq, Some(o)) => o != Equal,
        (Operator::Lt, Some(Less)) => true,
        (Operator::Gt, Some(Greater)) => true,
        (Operator::Lte, Some(Less | Equal)) => true,
        (Operator::Gte, Some(Greater | Equal)) => true,
        _ => false,
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    }
}

fn stringify(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_ql::ast::PathStep;
    use serde_json::json;

    fn path(var: &str, steps: Vec<PathStep>) -> JsonPath {
        JsonPath {
            variable: var.to_string(),
            steps,
        }
    }

    #[test]
    fn wildcard_path_matches_if_any_element_satisfies() {
        let cache = RegexCache::default();
        let doc = json!({"spec": {"containers": [{"name": "a"}, {"name": "sidecar"}]}});
        let p = path(
            "p",
            vec![
                PathStep::Key("spec".into()),
                PathStep::Key("containers".into()),
                PathStep::Wildcard,
                PathStep::Key("name".into()),
            ],
        );
        let ok = evaluate(&doc, &p, Operator::Eq, &AstValue::String("sidecar".into()), false, &cache).unwrap();
        assert!(ok);
    }

    #[test]
    fn numeric_coercion_applies_to_string_encoded_numbers() {
        let cache = RegexCache::default();
        let doc = json!({"spec": {"replicas": "3"}});
        let p = path("d", vec![PathStep::Key("spec".into()), PathStep::Key("replicas".into())]);
        let ok = evaluate(&doc, &p, Operator::Gt, &AstValue::Int(2), false, &cache).unwrap();
        assert!(ok);
    }

    #[test]
    fn negated_filter_inverts_result() {
        let cache = RegexCache::default();
        let doc = json!({"kind": "Pod"});
        let p = path("p", vec![PathStep::Key("kind".into())]);
        let ok = evaluate(&doc, &p, Operator::Eq, &AstValue::String("Pod".into()), true, &cache).unwrap();
        assert!(!ok);
    }
}

//! Temporal expression evaluation (spec §4.6).
//!
//! `catalog-ql`'s parser already validates the surface syntax structurally
//! (`looks_like_rfc3339`/`looks_like_iso8601_duration` in `parser.rs`); this
//! module owns the arithmetic chrono itself doesn't provide — `P[nY][nM][nD]`
//! duration parsing with the documented year=365d/month=30d approximation —
//! and evaluates the `TemporalExpr` tree the AST carries for a `SET`/`WHERE`
//! right-hand side.

use crate::errors::{EngineError, Result};
use catalog_ql::ast::{TemporalExpr, TemporalOp};
use chrono::{DateTime, Duration, FixedOffset, Utc};

/// The evaluated form of a `TemporalExpr`: either a point in time or a span.
#[derive(Debug, Clone, PartialEq)]
pub enum TemporalValue {
    DateTime(DateTime<FixedOffset>),
    Duration(Duration),
}

pub fn parse_rfc3339(s: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s)
        .map_err(|e| EngineError::arithmetic(format!("invalid RFC-3339 datetime {s:?}: {e}")))
}

/// Parses `P[nY][nM][nD](T[nH][nM][nS])?` using the documented calendrical
/// approximation: a year is 365 days, a month is 30 days.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let rest = s
        .strip_prefix('P')
        .ok_or_else(|| EngineError::arithmetic(format!("duration {s:?} must start with 'P'")))?;

    let (date_part, time_part) = match rest.split_once('T') {
        Some((d, t)) => (d, Some(t)),
        None => (rest, None),
    };

    let mut total = Duration::zero();
    let mut cursor = date_part;
    for (unit_days, suffix) in [(365i64, 'Y'), (30, 'M'), (1, 'D')] {
        if let Some((n, remainder)) = take_designated_field(cursor, suffix)? {
            total += Duration::days(n * unit_days);
            cursor = remainder;
        }
    }
    if !cursor.is_empty() {
        return Err(EngineError::arithmetic(format!(
            "unrecognized duration fields in {s:?}"
        )));
    }

    if let Some(time_part) = time_part {
        let mut cursor = time_part;
        for (unit_seconds, suffix) in [(3600i64, 'H'), (60, 'M'), (1, 'S')] {
            if let Some((n, remainder)) = take_designated_field(cursor, suffix)? {
                total += Duration::seconds(n * unit_seconds);
                cursor = remainder;
            }
        }
        if !cursor.is_empty() {
            return Err(EngineError::arithmetic(format!(
                "unrecognized duration fields in {s:?}"
            )));
        }
    }

    Ok(total)
}

/// Consumes a leading `<digits><suffix>` field, if present, returning the
/// parsed count and the unconsumed remainder.
fn take_designated_field(s: &str, suffix: char) -> Result<Option<(i64, &str)>> {
    let Some(end) = s.find(suffix) else {
        return Ok(None);
    };
    let digits = &s[..end];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(None);
    }
    let n: i64 = digits
        .parse()
        .map_err(|_| EngineError::arithmetic(format!("duration field {digits:?} out of range")))?;
    Ok(Some((n, &s[end + suffix.len_utf8()..])))
}

pub fn eval(expr: &TemporalExpr) -> Result<TemporalValue> {
    match expr {
        TemporalExpr::DateTime(None) => Ok(TemporalValue::DateTime(Utc::now().into())),
        TemporalExpr::DateTime(Some(literal)) => Ok(TemporalValue::DateTime(parse_rfc3339(literal)?)),
        TemporalExpr::Duration(Some(literal)) => Ok(TemporalValue::Duration(parse_duration(literal)?)),
        TemporalExpr::Duration(None) => {
            Err(EngineError::arithmetic("duration() requires an argument"))
        }
        TemporalExpr::BinOp { op, left, right } => {
            let left = eval(left)?;
            let right = eval(right)?;
            combine(*op, left, right)
        }
    }
}

fn combine(op: TemporalOp, left: TemporalValue, right: TemporalValue) -> Result<TemporalValue> {
    use TemporalValue::*;
    match (op, left, right) {
        (TemporalOp::Add, DateTime(d), Duration(du)) => Ok(DateTime(d + du)),
        (TemporalOp::Sub, DateTime(d), Duration(du)) => Ok(DateTime(d - du)),
        (TemporalOp::Sub, DateTime(a), DateTime(b)) => Ok(Duration(a - b)),
        (TemporalOp::Add, Duration(a), Duration(b)) => Ok(Duration(a + b)),
        (TemporalOp::Sub, Duration(a), Duration(b)) => Ok(Duration(a - b)),
        (TemporalOp::Add, DateTime(_), DateTime(_)) => {
            Err(EngineError::arithmetic("datetime + datetime is not defined"))
        }
        (_, Duration(_), DateTime(_)) => {
            Err(EngineError::arithmetic("duration +/- datetime is not defined"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_combined_duration_fields() {
        let d = parse_duration("P1Y2M3DT4H5M6S").unwrap();
        let expected = Duration::days(365) + Duration::days(60) + Duration::days(3)
            + Duration::hours(4)
            + Duration::minutes(5)
            + Duration::seconds(6);
        assert_eq!(d, expected);
    }

    #[test]
    fn datetime_minus_duration_is_datetime() {
        let base = parse_rfc3339("2024-01-10T00:00:00Z").unwrap();
        let result = combine(
            TemporalOp::Sub,
            TemporalValue::DateTime(base),
            TemporalValue::Duration(Duration::days(10)),
        )
        .unwrap();
        assert_eq!(
            result,
            TemporalValue::DateTime(parse_rfc3339("2023-12-31T00:00:00Z").unwrap())
        );
    }

    #[test]
    fn duration_minus_datetime_is_an_error() {
        let base = parse_rfc3339("2024-01-10T00:00:00Z").unwrap();
        let result = combine(
            TemporalOp::Sub,
            TemporalValue::Duration(Duration::days(1)),
            TemporalValue::DateTime(base),
        );
        assert!(result.is_err());
    }
}

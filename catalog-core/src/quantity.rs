//! CPU and memory quantity parsing/formatting/summation (spec §4.6).
//!
//! Kubernetes spells CPU and memory quantities differently (`500m` vs `128Mi`)
//! and this engine sums them differently too (§4.5 RETURN: CPU sums land in
//! milli-CPU, memory sums land in bytes) — hence two small value types rather
//! than one generic "quantity" the way `k8s-openapi`'s `Quantity` newtype
//! papers over the difference. Both round-trip through `format(parse(q))`
//! per the §8 testable property.

use crate::errors::{EngineError, Result};

/// A CPU quantity, stored in milli-CPU (`1` CPU == `1000m`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cpu(pub i64);

impl Cpu {
    pub fn parse(s: &str) -> Result<Self> {
        if let Some(digits) = s.strip_suffix('m') {
            let milli: i64 = digits
                .parse()
                .map_err(|_| EngineError::arithmetic(format!("invalid CPU quantity {s:?}")))?;
            return Ok(Cpu(milli));
        }
        let cores: f64 = s
            .parse()
            .map_err(|_| EngineError::arithmetic(format!("invalid CPU quantity {s:?}")))?;
        Ok(Cpu((cores * 1000.0).round() as i64))
    }

    /// `≥1000m` pretty-prints as cores with up to three trailing decimals
    /// trimmed; otherwise the raw milli form.
    pub fn format(self) -> String {
        if self.0 >= 1000 || self.0 <= -1000 {
            let cores = self.0 as f64 / 1000.0;
            let mut formatted = format!("{cores:.3}");
            while formatted.ends_with('0') {
                formatted.pop();
            }
            if formatted.ends_with('.') {
                formatted.pop();
            }
            formatted
        } else {
            format!("{}m", self.0)
        }
    }
}

const BINARY_UNITS: [(&str, i64); 5] = [
    ("Ki", 1024),
    ("Mi", 1024i64.pow(2)),
    ("Gi", 1024i64.pow(3)),
    ("Ti", 1024i64.pow(4)),
    ("Pi", 1024i64.pow(5)),
];

const DECIMAL_UNITS: [(&str, i64); 5] = [
    ("k", 1_000),
    ("M", 1_000_000),
    ("G", 1_000_000_000),
    ("T", 1_000_000_000_000),
    ("P", 1_000_000_000_000_000),
];

/// A memory quantity, stored in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Memory(pub i64);

impl Memory {
    pub fn parse(s: &str) -> Result<Self> {
        for (suffix, multiplier) in BINARY_UNITS.iter().chain(DECIMAL_UNITS.iter()) {
            if let Some(digits) = s.strip_suffix(suffix) {
                let n: f64 = digits
                    .parse()
                    .map_err(|_| EngineError::arithmetic(format!("invalid memory quantity {s:?}")))?;
                return Ok(Memory((n * *multiplier as f64).round() as i64));
            }
        }
        // "E"/"Ei" are valid exponents too, but collide with scientific
        // notation's own trailing "e" only when case-sensitive matching
        // is applied first, which the suffix loop above already does.
        if let Some(digits) = s.strip_suffix("Ei") {
            let n: f64 = digits
                .parse()
                .map_err(|_| EngineError::arithmetic(format!("invalid memory quantity {s:?}")))?;
            return Ok(Memory((n * 1024f64.powi(6)).round() as i64));
        }
        if let Some(digits) = s.strip_suffix('E') {
            let n: f64 = digits
                .parse()
                .map_err(|_| EngineError::arithmetic(format!("invalid memory quantity {s:?}")))?;
            return Ok(Memory((n * 1_000_000_000_000_000_000f64).round() as i64));
        }
        let bytes: f64 = s
            .parse()
            .map_err(|_| EngineError::arithmetic(format!("invalid memory quantity {s:?}")))?;
        Ok(Memory(bytes.round() as i64))
    }

    /// Picks the largest unit that yields `≥1`, preferring binary; when the
    /// value is exactly representable in a decimal unit, that suffix wins.
    pub fn format(self) -> String {
        let bytes = self.0 as f64;
        for (suffix, multiplier) in DECIMAL_UNITS.iter().rev() {
            let exact = bytes / *multiplier as f64;
            if exact.fract() == 0.0 && exact.abs() >= 1.0 {
                return format!("{}{suffix}", exact as i64);
            }
        }
        for (suffix, multiplier) in BINARY_UNITS.iter().rev() {
            let scaled = bytes / *multiplier as f64;
            if scaled.abs() >= 1.0 {
                return format_trimmed(scaled, suffix);
            }
        }
        format!("{}", self.0)
    }
}

fn format_trimmed(value: f64, suffix: &str) -> String {
    if value.fract() == 0.0 {
        format!("{}{suffix}", value as i64)
    } else {
        let mut s = format!("{value:.3}");
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
        format!("{s}{suffix}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_round_trips_milli_form() {
        let c = Cpu::parse("500m").unwrap();
        assert_eq!(c.0, 500);
        assert_eq!(c.format(), "500m");
    }

    #[test]
    fn cpu_round_trips_core_form() {
        let c = Cpu::parse("1.5").unwrap();
        assert_eq!(c.0, 1500);
        assert_eq!(c.format(), "1.5");
    }

    #[test]
    fn cpu_sums_to_whole_cores() {
        let sum = Cpu::parse("500m").unwrap().0 + Cpu::parse("1").unwrap().0 + Cpu::parse("1.5").unwrap().0;
        assert_eq!(Cpu(sum).format(), "3");
    }

    #[test]
    fn memory_parses_binary_and_decimal_units() {
        assert_eq!(Memory::parse("128Mi").unwrap().0, 128 * 1024 * 1024);
        assert_eq!(Memory::parse("1G").unwrap().0, 1_000_000_000);
    }

    #[test]
    fn memory_prefers_decimal_suffix_on_exact_match() {
        assert_eq!(Memory(1_000_000_000).format(), "1G");
    }

    #[test]
    fn memory_prefers_binary_otherwise() {
        assert_eq!(Memory(128 * 1024 * 1024).format(), "128Mi");
    }
}

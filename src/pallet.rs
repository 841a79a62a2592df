//! Pallet inference: how many units fit on a pallet for a given line.
//!
//! The ladder is, first match wins:
//! 1. an explicit product attribute,
//! 2. a product-family rule from [`PACK_RULES`],
//! 3. divisibility of the quantity by [`CANDIDATE_PACK_SIZES`],
//! 4. unknown.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Common pack sizes, in preference order.
pub const CANDIDATE_PACK_SIZES: [u32; 6] = [36, 37, 35, 33, 31, 30];

/// Preferred size when several candidates divide the quantity.
pub const PREFERRED_PACK_SIZE: u32 = 36;

/// A product-family rule: if `pattern` matches the line/product text, the
/// family ships `units_per_pallet` units per pallet.
#[derive(Debug, Clone, Copy)]
pub struct PackRule {
    pub tag: &'static str,
    pub pattern: &'static str,
    pub units_per_pallet: u32,
}

pub static PACK_RULES: &[PackRule] = &[
    PackRule {
        tag: "aiko-mah72m",
        pattern: r"(?i)AIKO.*MAH72M",
        units_per_pallet: 36,
    },
    PackRule {
        tag: "aiko-605",
        pattern: r"(?i)AIKO.*\b605\b",
        units_per_pallet: 36,
    },
];

static COMPILED_PACK_RULES: LazyLock<Vec<(&'static PackRule, Regex)>> = LazyLock::new(|| {
    PACK_RULES
        .iter()
        .map(|rule| (rule, Regex::new(rule.pattern).expect("valid pack rule")))
        .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackConfidence {
    Attribute,
    PatternMatch,
    ExactDivisor,
    AmbiguousDivisor,
    ClosestFit,
    Unknown,
}

impl fmt::Display for PackConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackConfidence::Attribute => write!(f, "attribute"),
            PackConfidence::PatternMatch => write!(f, "pattern-match"),
            PackConfidence::ExactDivisor => write!(f, "exact-divisor"),
            PackConfidence::AmbiguousDivisor => write!(f, "ambiguous-divisor"),
            PackConfidence::ClosestFit => write!(f, "closest-fit"),
            PackConfidence::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackInference {
    pub units_per_pallet: u32,
    pub confidence: PackConfidence,
    /// Other candidate sizes that also divide the quantity exactly.
    pub alternatives: Vec<u32>,
    pub leftover: u64,
}

impl PackInference {
    pub fn unknown() -> Self {
        Self {
            units_per_pallet: 0,
            confidence: PackConfidence::Unknown,
            alternatives: Vec::new(),
            leftover: 0,
        }
    }

    fn fixed(units_per_pallet: u32, confidence: PackConfidence, quantity: u64) -> Self {
        Self {
            units_per_pallet,
            confidence,
            alternatives: Vec::new(),
            leftover: quantity % u64::from(units_per_pallet),
        }
    }

    /// Pallets needed for `quantity`, rounding up. `None` when either is zero.
    pub fn pallet_count(&self, quantity: u64) -> Option<u64> {
        if quantity == 0 || self.units_per_pallet == 0 {
            return None;
        }
        Some(quantity.div_ceil(u64::from(self.units_per_pallet)))
    }
}

/// The first family rule whose pattern matches `text`.
pub fn pattern_units_per_pallet(text: &str) -> Option<&'static PackRule> {
    COMPILED_PACK_RULES
        .iter()
        .find(|(_, pattern)| pattern.is_match(text))
        .map(|(rule, _)| *rule)
}

/// Divisor ladder over [`CANDIDATE_PACK_SIZES`] for a nonzero quantity.
pub fn infer_from_divisors(quantity: u64) -> PackInference {
    if quantity == 0 {
        return PackInference::unknown();
    }

    let exact: Vec<u32> = CANDIDATE_PACK_SIZES
        .iter()
        .copied()
        .filter(|size| quantity % u64::from(*size) == 0)
        .collect();

    match exact.as_slice() {
        [only] => PackInference {
            units_per_pallet: *only,
            confidence: PackConfidence::ExactDivisor,
            alternatives: Vec::new(),
            leftover: 0,
        },
        [_, _, ..] => {
            let chosen = if exact.contains(&PREFERRED_PACK_SIZE) {
                PREFERRED_PACK_SIZE
            } else {
                exact.iter().copied().max().unwrap_or(PREFERRED_PACK_SIZE)
            };
            PackInference {
                units_per_pallet: chosen,
                confidence: PackConfidence::AmbiguousDivisor,
                alternatives: exact.into_iter().filter(|size| *size != chosen).collect(),
                leftover: 0,
            }
        }
        [] => {
            // Smallest leftover; the larger pack breaks ties.
            let (size, leftover) = CANDIDATE_PACK_SIZES
                .iter()
                .map(|size| (*size, quantity % u64::from(*size)))
                .min_by(|(a_size, a_rem), (b_size, b_rem)| {
                    a_rem.cmp(b_rem).then(b_size.cmp(a_size))
                })
                .unwrap_or((PREFERRED_PACK_SIZE, 0));
            PackInference {
                units_per_pallet: size,
                confidence: PackConfidence::ClosestFit,
                alternatives: Vec::new(),
                leftover,
            }
        }
    }
}

/// Runs the full ladder. `attribute_units` is the product attribute (0 when
/// absent) and `family_text` the joined line/product names and SKUs.
pub fn infer_pack(quantity: u64, attribute_units: u32, family_text: &str) -> PackInference {
    if attribute_units > 0 {
        return PackInference::fixed(attribute_units, PackConfidence::Attribute, quantity);
    }
    if let Some(rule) = pattern_units_per_pallet(family_text) {
        return PackInference::fixed(rule.units_per_pallet, PackConfidence::PatternMatch, quantity);
    }
    infer_from_divisors(quantity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_wins_over_everything() {
        let inference = infer_pack(80, 30, "AIKO A605 MAH72M");
        assert_eq!(inference.units_per_pallet, 30);
        assert_eq!(inference.confidence, PackConfidence::Attribute);
        assert_eq!(inference.leftover, 20);
        assert_eq!(inference.pallet_count(80), Some(3));
    }

    #[test]
    fn family_pattern_when_no_attribute() {
        let inference = infer_pack(40, 0, "Panel aiko neostar 605 w");
        assert_eq!(inference.units_per_pallet, 36);
        assert_eq!(inference.confidence, PackConfidence::PatternMatch);
        assert_eq!(inference.leftover, 4);
        assert_eq!(inference.pallet_count(40), Some(2));

        let inference = infer_pack(36, 0, "AIKO-A-MAH72Mw");
        assert_eq!(inference.confidence, PackConfidence::PatternMatch);
        assert_eq!(inference.leftover, 0);
    }

    #[test]
    fn pattern_requires_whole_605() {
        assert!(pattern_units_per_pallet("AIKO 6050").is_none());
        assert!(pattern_units_per_pallet("Jinko 605").is_none());
        assert_eq!(pattern_units_per_pallet("AIKO 605").map(|r| r.tag), Some("aiko-605"));
    }

    #[test]
    fn matched_rule_is_the_table_entry() {
        let rule = pattern_units_per_pallet("AIKO-A605-MAH72Mw").unwrap();
        assert!(std::ptr::eq(rule, &PACK_RULES[0]));
        let rule = pattern_units_per_pallet("aiko 605 bifacial").unwrap();
        assert!(std::ptr::eq(rule, &PACK_RULES[1]));
    }

    #[test]
    fn quantity_72_has_single_divisor() {
        let inference = infer_pack(72, 0, "Panel 605W");
        assert_eq!(inference.units_per_pallet, 36);
        assert_eq!(inference.confidence, PackConfidence::ExactDivisor);
        assert_eq!(inference.leftover, 0);
        assert_eq!(inference.pallet_count(72), Some(2));
    }

    #[test]
    fn single_divisor_is_exact_for_every_candidate() {
        for size in CANDIDATE_PACK_SIZES {
            let quantity = u64::from(size);
            let dividing = CANDIDATE_PACK_SIZES
                .iter()
                .filter(|s| quantity % u64::from(**s) == 0)
                .count();
            if dividing == 1 {
                let inference = infer_from_divisors(quantity);
                assert_eq!(inference.confidence, PackConfidence::ExactDivisor);
                assert_eq!(inference.leftover, 0);
                assert_eq!(inference.units_per_pallet, size);
            }
        }
    }

    #[test]
    fn ambiguous_prefers_36() {
        // 36 * 35 = 1260, also divisible by 30.
        let inference = infer_from_divisors(1260);
        assert_eq!(inference.units_per_pallet, 36);
        assert_eq!(inference.confidence, PackConfidence::AmbiguousDivisor);
        assert_eq!(inference.alternatives, vec![35, 30]);
        assert_eq!(inference.leftover, 0);

        let again = infer_from_divisors(1260);
        assert_eq!(again, inference);
    }

    #[test]
    fn ambiguous_without_36_takes_largest() {
        // 35 * 33 = 1155, not divisible by 36, 37, 31 or 30.
        let inference = infer_from_divisors(1155);
        assert_eq!(inference.units_per_pallet, 35);
        assert_eq!(inference.confidence, PackConfidence::AmbiguousDivisor);
        assert_eq!(inference.alternatives, vec![33]);
    }

    #[test]
    fn closest_fit_minimizes_leftover() {
        // 38: remainders 36→2, 37→1, 35→3, 33→5, 31→7, 30→8.
        let inference = infer_from_divisors(38);
        assert_eq!(inference.units_per_pallet, 37);
        assert_eq!(inference.confidence, PackConfidence::ClosestFit);
        assert_eq!(inference.leftover, 1);
        assert_eq!(inference.pallet_count(38), Some(2));
    }

    #[test]
    fn closest_fit_tie_prefers_larger_pack() {
        // 10 is below every candidate: remainder 10 for all, largest pack wins.
        let inference = infer_from_divisors(10);
        assert_eq!(inference.units_per_pallet, 37);
        assert_eq!(inference.leftover, 10);
        assert_eq!(inference.pallet_count(10), Some(1));
    }

    #[test]
    fn zero_quantity_is_unknown() {
        let inference = infer_pack(0, 0, "Panel 605W");
        assert_eq!(inference, PackInference::unknown());
        assert_eq!(inference.pallet_count(0), None);
        assert_eq!(inference.confidence.to_string(), "unknown");
    }

    #[test]
    fn confidence_labels() {
        assert_eq!(PackConfidence::PatternMatch.to_string(), "pattern-match");
        assert_eq!(PackConfidence::AmbiguousDivisor.to_string(), "ambiguous-divisor");
        assert_eq!(PackConfidence::ClosestFit.to_string(), "closest-fit");
    }
}

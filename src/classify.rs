//! Line classification by name and tags.
//!
//! Both tables are data: a transport rule is `(tag, pattern)` and only matches
//! the whole trimmed name, so "Transporte especial" stays a material line.

use std::sync::LazyLock;

use regex::Regex;

/// Whole-line patterns for shipping/transport charges, matched against the
/// trimmed, lower-cased line name.
pub const TRANSPORT_RULES: &[(&str, &str)] = &[
    ("transporte", r"^\s*transporte\s*$"),
    ("shipping-costs", r"^\s*shipping\s*costs?\s*$"),
    ("shipping", r"^\s*shipping\s*$"),
    ("shipment", r"^\s*shipment\s*$"),
    ("transport", r"^\s*transport\s*$"),
    ("freight", r"^\s*freight\s*$"),
    ("flete", r"^\s*flete\s*$"),
    ("portes", r"^\s*portes?\s*$"),
    ("envio", r"^\s*env[ií]o\s*$"),
];

static TRANSPORT_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    TRANSPORT_RULES
        .iter()
        .map(|(tag, pattern)| (*tag, Regex::new(pattern).expect("valid transport pattern")))
        .collect()
});

/// Tag → salesperson. Line tags are checked before document tags.
pub const SALESPERSON_TAGS: &[(&str, &str)] = &[
    ("tomi", "Tomás"),
    ("canet", "Jorge"),
    ("supa", "Susana"),
    ("juanv", "Juan"),
];

pub const DEFAULT_SALESPERSON: &str = "Juan";

/// The transport rule matching `name`, if any.
pub fn transport_rule(name: &str) -> Option<&'static str> {
    let normalized = name.trim().to_lowercase();
    TRANSPORT_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(&normalized))
        .map(|(tag, _)| *tag)
}

pub fn is_transport_line(name: &str) -> bool {
    transport_rule(name).is_some()
}

fn salesperson_for_tag(tag: &str) -> Option<&'static str> {
    let tag = tag.trim().to_lowercase();
    SALESPERSON_TAGS
        .iter()
        .find(|(known, _)| *known == tag)
        .map(|(_, name)| *name)
}

/// First matching line tag wins, then the first matching document tag,
/// then [`DEFAULT_SALESPERSON`].
pub fn infer_salesperson(line_tags: &[String], doc_tags: &[String]) -> &'static str {
    line_tags
        .iter()
        .chain(doc_tags)
        .find_map(|tag| salesperson_for_tag(tag))
        .unwrap_or(DEFAULT_SALESPERSON)
}

//! Attribute lookup over heterogeneous product records.
//!
//! A logical attribute may live at the top level, under `attributes`, in a
//! `customFields` object or in a `customFields` list of `{field, value}`
//! entries. [`LOCATIONS`] lists those accessors in lookup order.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::holded::RawProduct;
use crate::holded::types::{coerce_number, coerce_text, is_blank};

type Accessor = for<'a> fn(&'a Map<String, Value>, &str) -> Option<&'a Value>;

fn top_level<'a>(container: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    container.get(key)
}

fn nested_attributes<'a>(container: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    container.get("attributes")?.as_object()?.get(key)
}

fn custom_field_map<'a>(container: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    container.get("customFields")?.as_object()?.get(key)
}

fn custom_field_list<'a>(container: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    container
        .get("customFields")?
        .as_array()?
        .iter()
        .filter_map(Value::as_object)
        .filter(|entry| entry.get("field").and_then(Value::as_str) == Some(key))
        .filter_map(|entry| entry.get("value"))
        .find(|value| !is_blank(value))
}

/// Where an attribute may live, in lookup order.
pub const LOCATIONS: &[(&str, Accessor)] = &[
    ("top-level", top_level),
    ("attributes", nested_attributes),
    ("customFields", custom_field_map),
    ("customFields[]", custom_field_list),
];

pub const POWER_KEYS: &[&str] = &["power_w", "Potencia", "potencia_w", "power", "watt", "W"];

pub const PALLET_KEYS: &[&str] = &[
    "units_per_pallet",
    "unitsPerPallet",
    "pallet_units",
    "ud_pallet",
    "uds_pallet",
    "unitsPallet",
];

pub const MIN_WATTS: u32 = 300;
pub const MAX_WATTS: u32 = 1000;

static WATT_MARKED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+)\s*[Ww]").expect("valid watt pattern"));

static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+").expect("valid digit pattern"));

/// First present, non-blank value for the candidate keys.
///
/// Keys are tried in order, and every location is tried for a key before
/// moving on to the next key.
pub fn extract_field<'a>(container: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| {
        LOCATIONS
            .iter()
            .filter_map(|(_, accessor)| accessor(container, key))
            .find(|value| !is_blank(value))
    })
}

// A 3-4 digit run in the plausible panel range; longer runs never qualify.
fn watt_candidate(digits: &str) -> Option<u32> {
    if !(3..=4).contains(&digits.len()) {
        return None;
    }
    let watts: u32 = digits.parse().ok()?;
    (MIN_WATTS..=MAX_WATTS).contains(&watts).then_some(watts)
}

fn marked_watts(text: &str) -> Option<u32> {
    WATT_MARKED
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .filter(|digits| {
            !text[..digits.start()]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_ascii_digit())
        })
        .filter_map(|digits| watt_candidate(digits.as_str()))
        .max()
}

fn bare_watts(text: &str) -> Option<u32> {
    DIGIT_RUN
        .find_iter(text)
        .filter_map(|digits| watt_candidate(digits.as_str()))
        .max()
}

/// Power rating in watts, or 0 when unknown.
///
/// A direct attribute wins whenever it parses, even as 0. Otherwise the line name, line SKU, product name
/// and product SKU are scanned: numbers followed by a `W` marker first, then
/// any bare 3-4 digit number, keeping the largest in 300..=1000.
pub fn extract_power_rating(product: &RawProduct, line_name: &str, line_sku: &str) -> f64 {
    if let Some(watts) = extract_field(product.fields(), POWER_KEYS).and_then(coerce_number) {
        return watts.max(0.0);
    }

    let product_text = |key: &str| {
        extract_field(product.fields(), &[key])
            .and_then(coerce_text)
            .unwrap_or_default()
    };
    let text = [
        line_name.to_string(),
        line_sku.to_string(),
        product_text("name"),
        product_text("sku"),
    ]
    .join(" ");

    marked_watts(&text)
        .or_else(|| bare_watts(&text))
        .map(f64::from)
        .unwrap_or(0.0)
}

/// Units per pallet from product attributes only; 0 when absent or unusable.
pub fn extract_units_per_pallet(product: &RawProduct) -> u32 {
    extract_field(product.fields(), PALLET_KEYS)
        .and_then(coerce_number)
        .filter(|units| *units >= 1.0)
        .map(|units| units.round() as u32)
        .unwrap_or(0)
}

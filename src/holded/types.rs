//! Lenient views over the order API's JSON documents.
//!
//! The API does not guarantee field names or types: numbers arrive as strings,
//! tags as a list or a single string, and lines under `products`, `lines` or
//! `items`. Every accessor here coerces instead of failing, so one odd field
//! never rejects a whole document.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Coerces a JSON value to a finite number. Numeric strings are accepted.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|v| v.is_finite())
}

/// Coerces a scalar JSON value to text.
pub fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// `null`, `""` and `[]` count as "not provided" for attribute lookups.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}

// Header fields fall through on any empty-ish value, zero included.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Object(o) => o.is_empty(),
        other => is_blank(other),
    }
}

fn first_truthy<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find(|value| !is_falsy(value))
}

/// Lower-cased, trimmed tags. A bare string counts as a single tag.
pub fn normalize_tags(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(coerce_text)
            .map(|t| t.trim().to_lowercase())
            .collect(),
        Some(Value::String(s)) => vec![s.trim().to_lowercase()],
        _ => Vec::new(),
    }
}

/// One line of an order as delivered by the API.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLine {
    pub name: String,
    pub description: Option<String>,
    pub units: f64,
    pub price: f64,
    pub product_id: Option<String>,
    pub sku: Option<String>,
    pub tags: Vec<String>,
}

impl RawLine {
    pub fn from_value(value: &Value) -> Self {
        let empty = Map::new();
        let obj = value.as_object().unwrap_or(&empty);
        let number = |key: &str| obj.get(key).and_then(coerce_number).unwrap_or(0.0);
        let text = |key: &str| {
            obj.get(key)
                .filter(|v| !is_falsy(v))
                .and_then(coerce_text)
        };

        Self {
            name: text("name").map(|n| n.trim().to_string()).unwrap_or_default(),
            description: text("desc"),
            units: number("units"),
            price: number("price"),
            product_id: text("productId"),
            sku: obj.get("sku").and_then(coerce_text),
            tags: normalize_tags(obj.get("tags")),
        }
    }

    /// Line amount: unit price times units.
    pub fn amount(&self) -> f64 {
        self.price * self.units
    }

    pub fn sku_text(&self) -> &str {
        self.sku.as_deref().unwrap_or("")
    }
}

/// A sales-order document. The original JSON is kept for dumps and inspection.
#[derive(Debug, Clone)]
pub struct RawOrderDocument {
    pub id: Option<String>,
    pub number: Option<String>,
    pub customer: Option<String>,
    pub status: Value,
    pub date: Option<Value>,
    pub tags: Vec<String>,
    pub lines: Vec<RawLine>,
    /// Which field the lines were read from.
    pub lines_field: &'static str,
    raw: Value,
}

impl From<Value> for RawOrderDocument {
    fn from(raw: Value) -> Self {
        let empty = Map::new();
        let obj = raw.as_object().unwrap_or(&empty);
        let text_of = |keys: &[&str]| first_truthy(obj, keys).and_then(coerce_text);

        let (lines_field, lines) = ["products", "lines", "items"]
            .into_iter()
            .find_map(|field| match obj.get(field) {
                Some(Value::Array(items)) => {
                    let lines = items.iter().map(RawLine::from_value).collect::<Vec<_>>();
                    Some((field, lines))
                }
                _ => None,
            })
            .unwrap_or(("products", Vec::new()));

        Self {
            id: text_of(&["_id", "id", "docNumber", "number"]),
            number: text_of(&["docNumber", "number", "code"]),
            customer: text_of(&["contactName"]),
            status: obj.get("status").cloned().unwrap_or(Value::Null),
            date: first_truthy(obj, &["date", "createdAt", "issuedOn", "updatedAt"]).cloned(),
            tags: normalize_tags(obj.get("tags")),
            lines,
            lines_field,
            raw,
        }
    }
}

impl<'de> Deserialize<'de> for RawOrderDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from)
    }
}

impl RawOrderDocument {
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn id_label(&self) -> &str {
        self.id.as_deref().unwrap_or("-")
    }

    /// Human-facing order number, falling back to the id.
    pub fn display_number(&self) -> &str {
        self.number
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or("-")
    }

    pub fn customer_label(&self) -> &str {
        self.customer.as_deref().unwrap_or("-")
    }

    /// Numeric date used for ordering a batch; anything unparsable sorts as 0.
    pub fn sort_key(&self) -> i64 {
        self.date
            .as_ref()
            .and_then(coerce_number)
            .map(|d| d as i64)
            .unwrap_or(0)
    }
}

/// Product record: an untyped attribute bag.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub struct RawProduct {
    fields: Map<String, Value>,
}

impl From<Value> for RawProduct {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self { fields },
            _ => Self::default(),
        }
    }
}

impl RawProduct {
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Top-level scalar field as text, or empty.
    pub fn text(&self, key: &str) -> String {
        self.fields
            .get(key)
            .and_then(coerce_text)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_as_strings_are_coerced() {
        assert_eq!(coerce_number(&json!("12.5")), Some(12.5));
        assert_eq!(coerce_number(&json!(" 40 ")), Some(40.0));
        assert_eq!(coerce_number(&json!(7)), Some(7.0));
        assert_eq!(coerce_number(&json!("abc")), None);
        assert_eq!(coerce_number(&json!(null)), None);
        assert_eq!(coerce_number(&json!("NaN")), None);
    }

    #[test]
    fn line_with_bad_numbers_defaults_to_zero() {
        let line = RawLine::from_value(&json!({
            "name": "  Panel 605W ",
            "units": "many",
            "price": null,
            "tags": "TOMI"
        }));
        assert_eq!(line.name, "Panel 605W");
        assert_eq!(line.units, 0.0);
        assert_eq!(line.price, 0.0);
        assert_eq!(line.tags, vec!["tomi"]);
        assert_eq!(line.amount(), 0.0);
    }

    #[test]
    fn line_reads_product_reference_and_sku() {
        let line = RawLine::from_value(&json!({
            "name": "Inverter",
            "units": "2",
            "price": "350.5",
            "productId": "p-1",
            "sku": 12345,
            "tags": ["Canet", 7]
        }));
        assert_eq!(line.units, 2.0);
        assert_eq!(line.amount(), 701.0);
        assert_eq!(line.product_id.as_deref(), Some("p-1"));
        assert_eq!(line.sku_text(), "12345");
        assert_eq!(line.tags, vec!["canet", "7"]);
    }

    fn decode_owned<T: serde::de::DeserializeOwned>(value: Value) -> T {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn documents_decode_from_owned_pages() {
        let page: Vec<RawOrderDocument> = decode_owned(json!([
            {"id": "A1", "lines": [{"name": "Panel", "units": 2}]},
            {"id": "B2"}
        ]));
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].lines_field, "lines");
        assert_eq!(page[1].id_label(), "B2");
    }

    #[test]
    fn document_field_fallbacks() {
        let doc: RawOrderDocument = serde_json::from_value(json!({
            "id": "A1",
            "number": "SO-0042",
            "contactName": "Solar SL",
            "status": 1,
            "date": 0,
            "createdAt": 1700000000,
            "tags": ["juanv"],
            "items": [{"name": "Panel", "units": 10, "price": 1}]
        }))
        .unwrap();

        assert_eq!(doc.id.as_deref(), Some("A1"));
        assert_eq!(doc.display_number(), "SO-0042");
        assert_eq!(doc.customer_label(), "Solar SL");
        assert_eq!(doc.date, Some(json!(1700000000)));
        assert_eq!(doc.sort_key(), 1700000000);
        assert_eq!(doc.lines_field, "items");
        assert_eq!(doc.lines.len(), 1);
        assert_eq!(doc.tags, vec!["juanv"]);
    }

    #[test]
    fn document_prefers_underscore_id_and_tolerates_missing_fields() {
        let doc = RawOrderDocument::from(json!({"_id": "x9", "id": "other"}));
        assert_eq!(doc.id.as_deref(), Some("x9"));
        assert_eq!(doc.display_number(), "x9");
        assert_eq!(doc.customer_label(), "-");
        assert!(doc.lines.is_empty());
        assert_eq!(doc.status, Value::Null);
        assert_eq!(doc.sort_key(), 0);
    }

    #[test]
    fn non_object_product_is_empty() {
        let product: RawProduct = serde_json::from_value(json!([1, 2])).unwrap();
        assert!(product.fields().is_empty());

        let product = RawProduct::from(json!({"name": "AIKO 605", "sku": 99}));
        assert_eq!(product.text("name"), "AIKO 605");
        assert_eq!(product.text("sku"), "99");
        assert_eq!(product.text("missing"), "");
    }
}

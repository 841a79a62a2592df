//! Turns one raw order document into priced, palletised rows.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, TimeZone};
use serde::Serialize;
use serde_json::Value;

use crate::attributes::{extract_power_rating, extract_units_per_pallet};
use crate::classify::{infer_salesperson, is_transport_line};
use crate::holded::{RawLine, RawOrderDocument, RawProduct};
use crate::pallet::{PackConfidence, infer_pack};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriceUnit {
    PerWatt,
    PerUnit,
}

impl PriceUnit {
    /// Decimal places the price is shown with.
    pub fn precision(self) -> usize {
        match self {
            PriceUnit::PerWatt => 4,
            PriceUnit::PerUnit => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PriceUnit::PerWatt => "€/W",
            PriceUnit::PerUnit => "€/ud",
        }
    }
}

impl fmt::Display for PriceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceUnit::PerWatt => write!(f, "per-watt"),
            PriceUnit::PerUnit => write!(f, "per-unit"),
        }
    }
}

/// One material line, ready to render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRow {
    pub date_label: String,
    pub material_name: String,
    /// 0 when unknown.
    pub power_watts: u32,
    pub quantity: i64,
    /// `None` when the line is not palletised.
    pub pallet_count: Option<u64>,
    pub pallet_leftover: u64,
    pub pallet_confidence: PackConfidence,
    pub customer: String,
    pub unit_price_value: f64,
    pub unit_price_kind: PriceUnit,
    /// Order transport total, only on the first row.
    pub transport_amount: Option<f64>,
    pub salesperson: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedOrder {
    pub order_id: String,
    pub number: String,
    pub customer: String,
    pub date_label: String,
    /// Sum of the transport lines; `None` when the order has none.
    pub transport_total: Option<f64>,
    pub rows: Vec<NormalizedRow>,
}

impl NormalizedOrder {
    pub fn has_transport(&self) -> bool {
        self.transport_total.is_some()
    }

    pub fn total_pallets(&self) -> u64 {
        self.rows.iter().filter_map(|row| row.pallet_count).sum()
    }

    pub fn total_units(&self) -> i64 {
        self.rows.iter().map(|row| row.quantity).sum()
    }

    /// Material names in first-seen order, without repeats.
    pub fn distinct_materials(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for row in &self.rows {
            if !seen.contains(&row.material_name.as_str()) {
                seen.push(&row.material_name);
            }
        }
        seen
    }
}

/// Renders a document date. Epoch seconds (number or digit string) become a
/// local timestamp in `tz`; other values are shown as-is; absent is `-`.
pub fn date_label<Tz>(value: Option<&Value>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let Some(value) = value else {
        return "-".to_string();
    };
    let epoch = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
            s.parse::<i64>().ok()
        }
        _ => None,
    };
    match epoch.and_then(|secs| DateTime::from_timestamp(secs, 0)) {
        Some(utc) => utc.with_timezone(tz).format(DATE_FORMAT).to_string(),
        None => match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    }
}

/// Sum of price × units over transport lines, or `None` without any.
pub fn transport_total(doc: &RawOrderDocument) -> Option<f64> {
    let mut transport = doc
        .lines
        .iter()
        .filter(|line| is_transport_line(&line.name))
        .peekable();
    transport.peek()?;
    Some(transport.map(RawLine::amount).sum())
}

fn price_per_watt(amount: f64, quantity: f64, watts: f64) -> f64 {
    let divisor = quantity * watts;
    if divisor == 0.0 || !divisor.is_finite() {
        return 0.0;
    }
    amount / divisor
}

fn normalize_line(
    doc: &RawOrderDocument,
    line: &RawLine,
    product: &RawProduct,
    date_label: &str,
) -> NormalizedRow {
    let name = if line.name.is_empty() { "-" } else { line.name.as_str() };
    let sku = line.sku_text();
    let watts = extract_power_rating(product, name, sku);
    let quantity = line.units.max(0.0) as u64;

    let (pallet_count, pallet_leftover, pallet_confidence) = if watts > 0.0 {
        let (product_name, product_sku) = (product.text("name"), product.text("sku"));
        let family = [name, sku, product_name.as_str(), product_sku.as_str()].join(" ");
        let inference = infer_pack(quantity, extract_units_per_pallet(product), &family);
        (
            inference.pallet_count(quantity),
            inference.leftover,
            inference.confidence,
        )
    } else {
        (None, 0, PackConfidence::Unknown)
    };

    let (unit_price_value, unit_price_kind) = if watts > 0.0 {
        (
            price_per_watt(line.amount(), line.units, watts),
            PriceUnit::PerWatt,
        )
    } else {
        (line.price, PriceUnit::PerUnit)
    };

    NormalizedRow {
        date_label: date_label.to_string(),
        material_name: name.to_string(),
        power_watts: watts.round() as u32,
        quantity: line.units as i64,
        pallet_count,
        pallet_leftover,
        pallet_confidence,
        customer: doc.customer_label().to_string(),
        unit_price_value,
        unit_price_kind,
        transport_amount: None,
        salesperson: infer_salesperson(&line.tags, &doc.tags).to_string(),
    }
}

/// Builds one row per material line, in document order. Products missing
/// from `products` are treated as empty attribute bags.
pub fn normalize_order<Tz>(
    doc: &RawOrderDocument,
    products: &HashMap<String, RawProduct>,
    tz: &Tz,
) -> NormalizedOrder
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let date = date_label(doc.date.as_ref(), tz);
    let empty = RawProduct::default();
    let transport = transport_total(doc);

    let mut rows: Vec<NormalizedRow> = doc
        .lines
        .iter()
        .filter(|line| !is_transport_line(&line.name))
        .map(|line| {
            let product = line
                .product_id
                .as_ref()
                .and_then(|id| products.get(id))
                .unwrap_or(&empty);
            normalize_line(doc, line, product, &date)
        })
        .collect();

    if let Some(first) = rows.first_mut() {
        first.transport_amount = Some(transport.unwrap_or(0.0));
    }

    NormalizedOrder {
        order_id: doc.id_label().to_string(),
        number: doc.display_number().to_string(),
        customer: doc.customer_label().to_string(),
        date_label: date,
        transport_total: transport,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};
    use serde_json::json;

    fn doc(value: Value) -> RawOrderDocument {
        RawOrderDocument::from(value)
    }

    #[test]
    fn panel_name_gives_price_per_watt() {
        let order = doc(json!({
            "id": "A1",
            "contactName": "Solar SL",
            "products": [{"name": "Panel 605W", "units": 40, "price": 100}]
        }));
        let normalized = normalize_order(&order, &HashMap::new(), &Utc);
        let row = &normalized.rows[0];

        assert_eq!(row.power_watts, 605);
        assert_eq!(row.unit_price_kind, PriceUnit::PerWatt);
        assert!((row.unit_price_value - 100.0 * 40.0 / (40.0 * 605.0)).abs() < 1e-12);
        assert_eq!(row.quantity, 40);
        // 40 has no exact divisor: closest fit is 37 with 3 left over.
        assert_eq!(row.pallet_count, Some(2));
        assert_eq!(row.pallet_leftover, 3);
        assert_eq!(row.pallet_confidence, PackConfidence::ClosestFit);
        assert_eq!(row.customer, "Solar SL");
        assert_eq!(row.salesperson, "Juan");
    }

    #[test]
    fn unknown_power_is_priced_per_unit_and_not_palletised() {
        let order = doc(json!({
            "products": [{"name": "Mounting rail", "units": 72, "price": 12.5}]
        }));
        let row = &normalize_order(&order, &HashMap::new(), &Utc).rows[0];

        assert_eq!(row.power_watts, 0);
        assert_eq!(row.unit_price_kind, PriceUnit::PerUnit);
        assert_eq!(row.unit_price_value, 12.5);
        assert_eq!(row.pallet_count, None);
        assert_eq!(row.pallet_confidence, PackConfidence::Unknown);
    }

    #[test]
    fn zero_quantity_never_divides() {
        let order = doc(json!({
            "products": [{"name": "Panel 605W", "units": 0, "price": 100}]
        }));
        let row = &normalize_order(&order, &HashMap::new(), &Utc).rows[0];
        assert_eq!(row.unit_price_kind, PriceUnit::PerWatt);
        assert_eq!(row.unit_price_value, 0.0);
        assert_eq!(row.pallet_count, None);
    }

    #[test]
    fn product_attributes_drive_power_and_pallets() {
        let order = doc(json!({
            "products": [{"name": "Modulo", "units": 72, "price": 50, "productId": "p1"}]
        }));
        let mut products = HashMap::new();
        products.insert(
            "p1".to_string(),
            RawProduct::from(json!({"attributes": {"power_w": 450, "units_per_pallet": 31}})),
        );
        let row = &normalize_order(&order, &products, &Utc).rows[0];

        assert_eq!(row.power_watts, 450);
        assert_eq!(row.pallet_confidence, PackConfidence::Attribute);
        assert_eq!(row.pallet_count, Some(3));
        assert_eq!(row.pallet_leftover, 10);
    }

    #[test]
    fn family_pattern_uses_product_text() {
        let order = doc(json!({
            "products": [{"name": "Panel 605W", "units": 40, "price": 1, "productId": "p2"}]
        }));
        let mut products = HashMap::new();
        products.insert("p2".to_string(), RawProduct::from(json!({"sku": "AIKO-A-MAH72Mw"})));
        let row = &normalize_order(&order, &products, &Utc).rows[0];
        assert_eq!(row.pallet_confidence, PackConfidence::PatternMatch);
        assert_eq!(row.pallet_count, Some(2));
        assert_eq!(row.pallet_leftover, 4);
    }

    #[test]
    fn transport_goes_to_first_material_row_only() {
        let order = doc(json!({
            "products": [
                {"name": "Transporte", "units": 1, "price": 150},
                {"name": "Panel 605W", "units": 36, "price": 100},
                {"name": "Portes", "units": 2, "price": 25},
                {"name": "Inverter", "units": 1, "price": 900}
            ]
        }));
        let normalized = normalize_order(&order, &HashMap::new(), &Utc);

        assert_eq!(normalized.rows.len(), 2);
        assert_eq!(normalized.rows[0].material_name, "Panel 605W");
        assert_eq!(normalized.rows[1].material_name, "Inverter");
        assert_eq!(normalized.rows[0].transport_amount, Some(200.0));
        assert_eq!(normalized.rows[1].transport_amount, None);
        assert_eq!(normalized.transport_total, Some(200.0));
    }

    #[test]
    fn no_transport_line_still_marks_first_row() {
        let order = doc(json!({
            "products": [{"name": "Inverter", "units": 1, "price": 900}]
        }));
        let normalized = normalize_order(&order, &HashMap::new(), &Utc);
        assert_eq!(normalized.rows[0].transport_amount, Some(0.0));
        assert!(!normalized.has_transport());
    }

    #[test]
    fn transport_only_order_has_no_rows() {
        let order = doc(json!({"products": [{"name": "Shipping", "units": 1, "price": 30}]}));
        let normalized = normalize_order(&order, &HashMap::new(), &Utc);
        assert!(normalized.rows.is_empty());
        assert_eq!(normalized.transport_total, Some(30.0));
    }

    #[test]
    fn rows_keep_input_order_and_duplicates() {
        let order = doc(json!({
            "products": [
                {"name": "B", "units": 1, "price": 1},
                {"name": "A", "units": 1, "price": 1},
                {"name": "B", "units": 2, "price": 1}
            ]
        }));
        let normalized = normalize_order(&order, &HashMap::new(), &Utc);
        let names: Vec<_> = normalized.rows.iter().map(|r| r.material_name.as_str()).collect();
        assert_eq!(names, vec!["B", "A", "B"]);
        assert_eq!(normalized.distinct_materials(), vec!["B", "A"]);
        assert_eq!(normalized.total_units(), 4);
    }

    #[test]
    fn salesperson_from_line_then_document_tags() {
        let order = doc(json!({
            "tags": ["supa"],
            "products": [
                {"name": "A", "units": 1, "price": 1, "tags": ["canet"]},
                {"name": "B", "units": 1, "price": 1}
            ]
        }));
        let normalized = normalize_order(&order, &HashMap::new(), &Utc);
        assert_eq!(normalized.rows[0].salesperson, "Jorge");
        assert_eq!(normalized.rows[1].salesperson, "Susana");
    }

    #[test]
    fn date_labels() {
        let madrid = FixedOffset::east_opt(3600).unwrap();
        assert_eq!(date_label(Some(&json!(0)), &Utc), "1970-01-01 00:00:00");
        assert_eq!(date_label(Some(&json!("3600")), &madrid), "1970-01-01 02:00:00");
        assert_eq!(date_label(Some(&json!("2024-05-01")), &Utc), "2024-05-01");
        assert_eq!(date_label(None, &Utc), "-");
    }

    #[test]
    fn pallet_totals_sum_palletised_rows() {
        let order = doc(json!({
            "products": [
                {"name": "Panel 605W", "units": 72, "price": 1},
                {"name": "Panel 450W", "units": 35, "price": 1},
                {"name": "Cable", "units": 100, "price": 1}
            ]
        }));
        let normalized = normalize_order(&order, &HashMap::new(), &Utc);
        assert_eq!(normalized.total_pallets(), 3);
    }
}

//! Text and HTML rendering of normalized orders.

use crate::normalize::{NormalizedOrder, NormalizedRow};

pub const COLUMNS: [&str; 9] = [
    "Fecha reserva",
    "Material",
    "Potencia (W)",
    "Cantidad uds",
    "Nº Pallets",
    "Cliente",
    "Precio",
    "Transporte",
    "Comercial",
];

// Columns rendered right-aligned in the HTML table.
const NUMERIC_COLUMNS: [usize; 5] = [2, 3, 4, 6, 7];

/// `1234.5` with 2 decimals → `1.234,50`.
pub fn format_number(value: f64, decimals: usize) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    let negative = value < 0.0 && fixed.bytes().any(|b| matches!(b, b'1'..=b'9'));
    let sign = if negative { "-" } else { "" };
    match frac_part {
        Some(frac) => format!("{sign}{grouped},{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Euro amount, `1.234,50 €`.
pub fn format_eur(value: f64, decimals: usize) -> String {
    format!("{} €", format_number(value, decimals))
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn optional_eur(amount: Option<f64>) -> String {
    amount
        .map(|v| format_eur(v, 2))
        .unwrap_or_else(|| "-".to_string())
}

/// Display cells for one row, in [`COLUMNS`] order.
pub fn row_cells(row: &NormalizedRow) -> [String; 9] {
    let power = if row.power_watts > 0 {
        row.power_watts.to_string()
    } else {
        "-".to_string()
    };
    let pallets = match row.pallet_count {
        Some(count) if row.pallet_leftover > 0 => format!("{count} (+{})", row.pallet_leftover),
        Some(count) => count.to_string(),
        None => "-".to_string(),
    };
    let price = format!(
        "{} {}",
        format_number(row.unit_price_value, row.unit_price_kind.precision()),
        row.unit_price_kind.label()
    );

    [
        row.date_label.clone(),
        row.material_name.clone(),
        power,
        row.quantity.to_string(),
        pallets,
        row.customer.clone(),
        price,
        optional_eur(row.transport_amount),
        row.salesperson.clone(),
    ]
}

/// `VENDIDO 2 pallets Panel 605W (+1 más) a Solar SL`.
pub fn sold_subject(order: &NormalizedOrder) -> String {
    let materials = order.distinct_materials();
    let material = match materials.as_slice() {
        [] if order.has_transport() => "Transporte".to_string(),
        [] => "Sin líneas".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (+{} más)", rest.len()),
    };

    let pallets = order.total_pallets();
    let (quantity, word) = if pallets > 0 {
        (pallets as i64, if pallets == 1 { "pallet" } else { "pallets" })
    } else {
        let units = order.total_units();
        (units, if units == 1 { "ud" } else { "uds" })
    };

    format!("VENDIDO {quantity} {word} {material} a {}", order.customer)
}

pub fn cancelled_subject(order: &NormalizedOrder) -> String {
    format!("CANCELADO pedido {} de {}", order.number, order.customer)
}

const WRAPPER_OPEN: &str = "<div style='font-family:system-ui,Segoe UI,Roboto,Arial,sans-serif'>";
const TABLE_OPEN: &str =
    "<table border='1' cellspacing='0' cellpadding='6' style='border-collapse:collapse'>";

pub fn sold_html(order: &NormalizedOrder) -> String {
    let mut html = String::from(WRAPPER_OPEN);
    html.push_str(&format!(
        "<h3 style='margin:0 0 8px'>Reserva de material - Pedido {}</h3>",
        escape_html(&order.number)
    ));
    html.push_str(&format!(
        "<p style='margin:0 0 10px'>Cliente: <b>{}</b> &nbsp;|&nbsp; Fecha: <b>{}</b> \
         &nbsp;|&nbsp; Transporte: <b>{}</b></p>",
        escape_html(&order.customer),
        escape_html(&order.date_label),
        escape_html(&optional_eur(order.transport_total)),
    ));

    html.push_str(TABLE_OPEN);
    html.push_str("<thead><tr>");
    for column in COLUMNS {
        html.push_str(&format!("<th>{}</th>", escape_html(column)));
    }
    html.push_str("</tr></thead><tbody>");

    if order.rows.is_empty() {
        html.push_str("<tr><td colspan=9>Sin líneas</td></tr>");
    }
    for row in &order.rows {
        html.push_str("<tr>");
        for (index, cell) in row_cells(row).iter().enumerate() {
            if NUMERIC_COLUMNS.contains(&index) {
                html.push_str(&format!(
                    "<td style='text-align:right'>{}</td>",
                    escape_html(cell)
                ));
            } else {
                html.push_str(&format!("<td>{}</td>", escape_html(cell)));
            }
        }
        html.push_str("</tr>");
    }

    html.push_str("</tbody></table></div>");
    html
}

/// Material names and quantities only; no prices.
pub fn cancelled_html(order: &NormalizedOrder) -> String {
    let mut html = String::from(WRAPPER_OPEN);
    html.push_str(&format!(
        "<h3 style='margin:0 0 8px'>Pedido {} CANCELADO</h3>",
        escape_html(&order.number)
    ));
    html.push_str(&format!(
        "<p style='margin:0 0 10px'>Cliente: <b>{}</b> &nbsp;|&nbsp; Fecha: <b>{}</b></p>",
        escape_html(&order.customer),
        escape_html(&order.date_label),
    ));

    html.push_str(TABLE_OPEN);
    html.push_str("<thead><tr><th>Material</th><th>Cantidad uds</th></tr></thead><tbody>");
    if order.rows.is_empty() {
        html.push_str("<tr><td colspan=2>Sin líneas</td></tr>");
    }
    for row in &order.rows {
        html.push_str(&format!(
            "<tr><td>{}</td><td style='text-align:right'>{}</td></tr>",
            escape_html(&row.material_name),
            row.quantity
        ));
    }
    html.push_str("</tbody></table></div>");
    html
}

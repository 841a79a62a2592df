//! Diagnostic report for a single order: where it came from, what the header
//! looks like and how each line is classified.

use std::fmt::{self, Write};

use chrono::TimeZone;

use crate::classify::is_transport_line;
use crate::holded::client::FetchedOrder;
use crate::normalize::date_label;

const RULE_WIDTH: usize = 80;
const NAME_WIDTH: usize = 36;

fn truncate(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

pub fn report<Tz>(fetched: &FetchedOrder, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let doc = &fetched.document;
    let rule = "-".repeat(RULE_WIDTH);
    let mut out = String::new();

    let endpoint = if fetched.url.contains("/documents/salesorder/") {
        "typed"
    } else {
        "generic"
    };
    let _ = writeln!(out, "== Detalle obtenido desde: {} ({endpoint})", fetched.url);
    let _ = writeln!(
        out,
        "ID: {} | Nº: {} | Cliente: {} | Status: {} | Fecha: {}",
        doc.id_label(),
        doc.display_number(),
        doc.customer_label(),
        doc.status,
        date_label(doc.date.as_ref(), tz)
    );
    let _ = writeln!(out, "{rule}");

    let mut keys: Vec<&str> = doc
        .raw()
        .as_object()
        .map(|obj| obj.keys().map(String::as_str).collect())
        .unwrap_or_default();
    keys.sort_unstable();
    let _ = writeln!(
        out,
        "Claves de nivel raíz presentes ({}): {}",
        keys.len(),
        keys.join(", ")
    );
    let _ = writeln!(out, "{rule}");

    if doc.lines_field != "products" {
        let _ = writeln!(
            out,
            "ATENCIÓN: no hay 'products'; las líneas se leen de '{}'.",
            doc.lines_field
        );
    }
    let _ = writeln!(
        out,
        "Líneas encontradas en '{}': {}",
        doc.lines_field,
        doc.lines.len()
    );

    if doc.lines.is_empty() {
        let _ = writeln!(
            out,
            "=> Posibles causas: pedido vacío, solo cabecera o estructura distinta."
        );
        return out;
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "idx | transporte | {:<NAME_WIDTH$} | units | price     | tags",
        "name"
    );
    let _ = writeln!(
        out,
        "----+------------+-{}-+-------+-----------+-----------------",
        "-".repeat(NAME_WIDTH)
    );
    for (index, line) in doc.lines.iter().enumerate() {
        let flag = if is_transport_line(&line.name) { "YES" } else { "no" };
        let name = if line.name.is_empty() { "-" } else { line.name.as_str() };
        let _ = writeln!(
            out,
            "{:>3} | {flag:<10} | {:<NAME_WIDTH$} | {:>5} | {:>9} | {}",
            index + 1,
            truncate(name, NAME_WIDTH),
            line.units,
            line.price,
            line.tags.join(",")
        );
    }

    let materials = doc
        .lines
        .iter()
        .filter(|line| !is_transport_line(&line.name))
        .count();
    let _ = writeln!(out);
    if materials == 0 {
        let _ = writeln!(
            out,
            "Conclusión probable: TODAS las líneas son de transporte, no habrá filas de material."
        );
    } else {
        let _ = writeln!(
            out,
            "Se han encontrado {materials} líneas de material no-transporte (de {} totales).",
            doc.lines.len()
        );
    }
    out
}

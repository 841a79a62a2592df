//! Interface de terminal do sowatch: spinner de busca e tabelas coloridas.
//!
//! Usa `indicatif` para o spinner enquanto as janelas de pedidos são
//! baixadas e `console` para estilizar cabeçalhos e banners. Toda a saída
//! vai para stdout; os logs ficam em stderr.

use std::path::Path;
use std::time::Duration;

use console::{Alignment, Style, measure_text_width, pad_str};
use indicatif::{ProgressBar, ProgressStyle};

use crate::normalize::NormalizedOrder;
use crate::notify::render::{COLUMNS, format_eur, row_cells};
use crate::orchestrator::RunSummary;
use crate::status::LifecycleEvent;

/// Spinner exibido enquanto os pedidos são buscados na API.
pub struct FetchProgress {
    // Spinner do indicatif.
    pb: ProgressBar,
    green: Style,
    red: Style,
}

impl FetchProgress {
    /// Inicia o spinner com a descrição da janela consultada.
    pub fn start(label: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .expect("invalid template"),
        );
        pb.set_message(format!("Buscando pedidos: {label}"));
        pb.enable_steady_tick(Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
        }
    }

    /// Finaliza o spinner com o total de documentos recebidos.
    pub fn finish(&self, fetched: usize, kept: usize) {
        self.pb.finish_and_clear();
        println!(
            "  {} {fetched} pedidos recibidos, {kept} a procesar",
            self.green.apply_to("✓")
        );
    }

    /// Finaliza o spinner indicando falha.
    pub fn fail(&self) {
        self.pb.finish_and_clear();
        println!("  {} Error al buscar pedidos", self.red.apply_to("✗"));
    }
}

fn event_style(event: LifecycleEvent) -> Style {
    match event {
        LifecycleEvent::New => Style::new().green().bold(),
        LifecycleEvent::Reopened => Style::new().cyan().bold(),
        LifecycleEvent::Cancelled => Style::new().red().bold(),
        LifecycleEvent::NoChange => Style::new().dim(),
    }
}

/// Banner de um pedido: número, id, evento e transporte.
pub fn print_banner(order: &NormalizedOrder, event: LifecycleEvent) {
    let transport = order
        .transport_total
        .map(|amount| format_eur(amount, 2))
        .unwrap_or_else(|| "-".to_string());
    println!();
    println!(
        "{} {} (id: {}) [{}]",
        Style::new().bold().apply_to("=== Sales Order:"),
        order.number,
        order.order_id,
        event_style(event).apply_to(event)
    );
    println!(
        "    Cliente: {}  |  Fecha: {}  |  Transporte: {}",
        order.customer, order.date_label, transport
    );
}

fn join_cells<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(text, width)| pad_str(text, *width, Alignment::Left, None).into_owned())
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Formata as linhas como tabela alinhada. Larguras medidas em colunas de
/// terminal, não em bytes.
pub fn render_table(order: &NormalizedOrder) -> Vec<String> {
    let cells: Vec<[String; 9]> = order.rows.iter().map(row_cells).collect();
    let widths: Vec<usize> = COLUMNS
        .iter()
        .enumerate()
        .map(|(i, header)| {
            cells
                .iter()
                .map(|row| measure_text_width(&row[i]))
                .chain(std::iter::once(measure_text_width(header)))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut lines = Vec::with_capacity(cells.len() + 2);
    lines.push(join_cells(COLUMNS.iter().copied(), &widths));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for row in &cells {
        lines.push(join_cells(row.iter().map(String::as_str), &widths));
    }
    lines
}

/// Imprime a tabela de linhas do pedido.
pub fn print_table(order: &NormalizedOrder) {
    if order.rows.is_empty() {
        println!("No hay líneas que mostrar.");
        return;
    }
    let header = Style::new().bold();
    for (i, line) in render_table(order).iter().enumerate() {
        if i == 0 {
            println!("{}", header.apply_to(line));
        } else {
            println!("{line}");
        }
    }
}

pub fn print_order(order: &NormalizedOrder, event: LifecycleEvent) {
    print_banner(order, event);
    print_table(order);
}

/// Resumo final de uma execução de polling.
pub fn print_summary(summary: &RunSummary, state_file: Option<&Path>) {
    let bold = Style::new().bold();
    println!();
    println!("{}", bold.apply_to("─── Resumen ───"));
    println!(
        "  procesados: {}  nuevos: {}  reabiertos: {}  cancelados: {}  sin cambios: {}",
        summary.processed, summary.new, summary.reopened, summary.cancelled, summary.unchanged
    );
    println!(
        "  emails enviados: {}  retenidos (sin --send-email): {}",
        summary.sent, summary.held
    );
    if let Some(path) = state_file {
        println!("  estado: {}", path.display());
    }
}

pub fn print_empty_window() {
    println!("No se han encontrado documentos en la ventana solicitada.");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::holded::RawOrderDocument;
    use crate::normalize::normalize_order;
    use chrono::Utc;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn table_columns_line_up() {
        let doc = RawOrderDocument::from(json!({
            "contactName": "Solar SL",
            "products": [
                {"name": "Panel 605W", "units": 72, "price": 100},
                {"name": "Inversor híbrido", "units": 1, "price": 1250}
            ]
        }));
        let order = normalize_order(&doc, &HashMap::new(), &Utc);
        let lines = render_table(&order);

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Fecha reserva"));
        let width = measure_text_width(&lines[0]);
        for line in &lines[1..] {
            assert_eq!(measure_text_width(line), width);
        }
        assert!(lines[2].contains("0,1653 €/W"));
        assert!(lines[3].contains("1.250,00 €/ud"));
    }
}

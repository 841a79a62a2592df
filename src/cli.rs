//! Interface de linha de comando do sowatch baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (poll, order, inspect)
//! e flags globais (--config, --verbose).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::orchestrator::Window;

/// sowatch: acompanha pedidos de venda e avisa quando são vendidos ou cancelados.
#[derive(Debug, Parser)]
#[command(name = "sowatch", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do arquivo de configuração (padrão: `sowatch.toml`).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Janela de busca: exatamente uma das duas opções.
#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct WindowArgs {
    /// Pedidos dos últimos N minutos.
    #[arg(long)]
    pub minutes: Option<u32>,

    /// Hoje mais os N dias anteriores, um dia por janela.
    #[arg(long)]
    pub days: Option<u32>,
}

impl WindowArgs {
    pub fn window(&self) -> Window {
        match (self.minutes, self.days) {
            (Some(minutes), _) => Window::Minutes(minutes),
            (None, Some(days)) => Window::Days(days),
            (None, None) => Window::Days(0),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Busca pedidos numa janela, classifica mudanças de estado e notifica.
    Poll {
        #[command(flatten)]
        window: WindowArgs,

        /// Máximo de documentos a processar.
        #[arg(long, default_value_t = 200)]
        limit: usize,

        /// Envia os e-mails decididos (sem a flag, apenas registra no log).
        #[arg(long, default_value_t = false)]
        send_email: bool,

        /// Caminho do mapa de estados; sobrescreve a configuração.
        #[arg(long)]
        state_file: Option<PathBuf>,

        /// Caminho base para salvar o JSON cru de cada pedido (`BASE_<id>.json`).
        #[arg(long)]
        dump_json: Option<PathBuf>,
    },

    /// Mostra um pedido pelo id, sem tocar no mapa de estados.
    Order {
        /// Id do documento.
        id: String,

        /// Envia o e-mail de venda para este pedido.
        #[arg(long, default_value_t = false)]
        send_email: bool,

        /// Caminho base para salvar o JSON cru do pedido.
        #[arg(long)]
        dump_json: Option<PathBuf>,
    },

    /// Diagnóstico de um pedido: origem, cabeçalho, chaves e linhas.
    Inspect {
        /// Id do documento.
        id: String,
    },
}

mod attributes;
mod classify;
mod cli;
mod config;
mod error;
mod holded;
mod inspect;
mod normalize;
mod notify;
mod orchestrator;
mod pallet;
mod status;
mod ui;

use std::process::ExitCode;

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use config::WatchConfig;
use holded::HoldedError;
use notify::SmtpMailer;
use orchestrator::{Poller, Window};
use status::{LifecycleEvent, StatusStore, StatusTracker};

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn window_label(window: Window) -> String {
    match window {
        Window::Minutes(minutes) => format!("últimos {minutes} minutos"),
        Window::Days(0) => "hoy".to_string(),
        Window::Days(days) => format!("hoy y {days} días anteriores"),
    }
}

// Rejected credentials get a pointer to the settings that hold them.
fn auth_hint(err: &anyhow::Error) -> Option<&'static str> {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<HoldedError>())
        .any(HoldedError::is_auth)
        .then_some("check HOLDED_API_KEY and HOLDED_USE_BEARER")
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = WatchConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let client = config.holded.client()?;
    let recipients = config.mail.recipients();

    match cli.command {
        Command::Poll {
            window,
            limit,
            send_email,
            state_file,
            dump_json,
        } => {
            let window = window.window();
            let bounds = window.bounds(&Local::now());

            let progress = ui::FetchProgress::start(&window_label(window));
            let documents = match orchestrator::fetch_windows(&client, &bounds).await {
                Ok(documents) => documents,
                Err(err) => {
                    progress.fail();
                    return Err(err).context("fetching sales orders");
                }
            };
            let fetched = documents.len();
            let batch = orchestrator::prepare_batch(documents, limit);
            progress.finish(fetched, batch.len());

            if batch.is_empty() {
                ui::print_empty_window();
                return Ok(());
            }

            let state_path = state_file.unwrap_or(config.state_file.0);
            let store = StatusStore::open(&state_path);
            info!(path = %state_path.display(), known = store.len(), "status map loaded");

            let mailer = if send_email {
                Some(SmtpMailer::new(config.mail.smtp_settings()?)?)
            } else {
                None
            };

            let mut poller = Poller::new(&client, mailer, recipients, StatusTracker::new(store))
                .with_dump_json(dump_json);
            let summary = poller.run(&batch).await?;
            ui::print_summary(&summary, poller.tracker().store().path());
        }
        Command::Order {
            id,
            send_email,
            dump_json,
        } => {
            let mailer = if send_email {
                Some(SmtpMailer::new(config.mail.smtp_settings()?)?)
            } else {
                None
            };
            let order = orchestrator::report_order(
                &client,
                mailer.as_ref(),
                &recipients,
                &id,
                dump_json.as_deref(),
            )
            .await
            .with_context(|| format!("reporting order {id}"))?;
            ui::print_order(&order, LifecycleEvent::NoChange);
        }
        Command::Inspect { id } => {
            let fetched = client
                .fetch_order_with_source(&id)
                .await
                .with_context(|| format!("fetching order {id}"))?;
            print!("{}", inspect::report(&fetched, &Local));
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            if let Some(hint) = auth_hint(&err) {
                eprintln!("hint: {hint}");
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use error::WatchError;

    #[test]
    fn auth_failures_get_a_hint() {
        let err = anyhow::Error::from(WatchError::Holded(HoldedError::Unauthorized(
            "401".into(),
        )))
        .context("fetching sales orders");
        assert!(auth_hint(&err).is_some());

        let err = anyhow::Error::from(WatchError::Holded(HoldedError::NotFound("A1".into())))
            .context("reporting order A1");
        assert!(auth_hint(&err).is_none());
    }
}

use std::time::Duration;

use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use super::policy::Notification;
use crate::error::MailError;

/// Port that speaks implicit TLS; every other port upgrades with STARTTLS.
pub const IMPLICIT_TLS_PORT: u16 = 465;

/// Delivers notifications. Implemented by [`SmtpMailer`] and by recording
/// fakes in tests.
pub trait Mailer {
    async fn send(&self, notification: &Notification) -> Result<(), MailError>;
}

/// Everything needed to talk to the SMTP relay.
#[derive(Debug, Clone, PartialEq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
    pub timeout: Duration,
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: SmtpSettings) -> Result<Self, MailError> {
        let builder = if settings.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?
        };
        let transport = builder
            .port(settings.port)
            .credentials(Credentials::new(settings.user, settings.pass))
            .timeout(Some(settings.timeout))
            .build();
        Ok(Self {
            transport,
            from: settings.from.parse()?,
        })
    }
}

/// Builds the HTML message with every recipient in `To`.
pub fn build_message(from: &Mailbox, notification: &Notification) -> Result<Message, MailError> {
    if notification.recipients.is_empty() {
        return Err(MailError::Message("no recipients".to_string()));
    }
    let mut builder = Message::builder()
        .from(from.clone())
        .subject(notification.subject.as_str());
    for recipient in &notification.recipients {
        builder = builder.to(recipient.parse::<Mailbox>()?);
    }
    Ok(builder
        .header(ContentType::TEXT_HTML)
        .body(notification.html.clone())?)
}

impl Mailer for SmtpMailer {
    async fn send(&self, notification: &Notification) -> Result<(), MailError> {
        let message = build_message(&self.from, notification)?;
        self.transport.send(message).await?;
        info!(
            subject = %notification.subject,
            recipients = notification.recipients.len(),
            "notification sent"
        );
        Ok(())
    }
}

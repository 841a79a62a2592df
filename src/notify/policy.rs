use serde::Serialize;

use super::render::{cancelled_html, cancelled_subject, sold_html, sold_subject};
use crate::normalize::NormalizedOrder;
use crate::status::LifecycleEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NotificationKind {
    Sold,
    Cancelled,
}

/// A rendered notification, ready for a [`Mailer`](super::Mailer).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub subject: String,
    pub html: String,
    /// De-duplicated, in first-seen order.
    pub recipients: Vec<String>,
}

/// Address lists from the mail configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recipients {
    pub to: Vec<String>,
    /// Extra addresses for cancellations only.
    pub cancel_to: Vec<String>,
}

/// Trims, drops empties and removes case-insensitive duplicates, keeping the
/// first spelling.
pub fn dedup_recipients<'a>(addresses: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for address in addresses {
        let address = address.trim();
        if address.is_empty() {
            continue;
        }
        if !unique.iter().any(|seen| seen.eq_ignore_ascii_case(address)) {
            unique.push(address.to_string());
        }
    }
    unique
}

/// Maps a lifecycle event to the notification it calls for, if any.
pub fn decide(
    event: LifecycleEvent,
    order: &NormalizedOrder,
    recipients: &Recipients,
) -> Option<Notification> {
    match event {
        LifecycleEvent::New | LifecycleEvent::Reopened => Some(Notification {
            kind: NotificationKind::Sold,
            subject: sold_subject(order),
            html: sold_html(order),
            recipients: dedup_recipients(&recipients.to),
        }),
        LifecycleEvent::Cancelled => Some(Notification {
            kind: NotificationKind::Cancelled,
            subject: cancelled_subject(order),
            html: cancelled_html(order),
            recipients: dedup_recipients(recipients.to.iter().chain(&recipients.cancel_to)),
        }),
        LifecycleEvent::NoChange => None,
    }
}

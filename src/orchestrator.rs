use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Days, Duration, Local, NaiveDateTime, TimeZone};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::WatchError;
use crate::holded::{OrderSource, ProductCatalog, RawOrderDocument};
use crate::normalize::{NormalizedOrder, normalize_order};
use crate::notify::{Mailer, Notification, Recipients, decide};
use crate::status::{LifecycleEvent, StatusTracker};
use crate::ui;

/// Which slice of time to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// The last N minutes up to now.
    Minutes(u32),
    /// Today plus the N previous calendar days, one window per day.
    Days(u32),
}

impl Window {
    /// Epoch-second `(start, end)` pairs, newest first.
    pub fn bounds<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Vec<(i64, i64)> {
        match *self {
            Window::Minutes(minutes) => {
                let start = now.clone() - Duration::minutes(i64::from(minutes));
                vec![(start.timestamp(), now.timestamp())]
            }
            Window::Days(days) => {
                let tz = now.timezone();
                let today = now.date_naive();
                (0..=u64::from(days))
                    .filter_map(|offset| today.checked_sub_days(Days::new(offset)))
                    .filter_map(|day| {
                        let start = resolve_local(&tz, day.and_hms_opt(0, 0, 0)?, true)?;
                        let end = resolve_local(&tz, day.and_hms_opt(23, 59, 59)?, false)?;
                        Some((start.timestamp(), end.timestamp()))
                    })
                    .collect()
            }
        }
    }
}

/// Maps a wall-clock time to an instant. A time inside a DST gap moves to the
/// next valid instant (`forward`) or the previous one, in 15 minute steps.
fn resolve_local<Tz: TimeZone>(
    tz: &Tz,
    naive: NaiveDateTime,
    forward: bool,
) -> Option<DateTime<Tz>> {
    let step = if forward {
        Duration::minutes(15)
    } else {
        Duration::minutes(-15)
    };
    (0..=96).find_map(|i| {
        let candidate = naive.checked_add_signed(step * i)?;
        let resolved = tz.from_local_datetime(&candidate);
        if forward {
            resolved.earliest()
        } else {
            resolved.latest()
        }
    })
}

/// Fetches every window in turn; any failure aborts.
pub async fn fetch_windows<S: OrderSource>(
    source: &S,
    bounds: &[(i64, i64)],
) -> Result<Vec<RawOrderDocument>, WatchError> {
    let mut documents = Vec::new();
    for &(start, end) in bounds {
        documents.extend(source.fetch_orders_in_window(start, end).await?);
    }
    Ok(documents)
}

/// De-duplicates by id (first wins, id-less documents dropped), sorts newest
/// first and keeps at most `limit`.
pub fn prepare_batch(documents: Vec<RawOrderDocument>, limit: usize) -> Vec<RawOrderDocument> {
    let mut seen = HashSet::new();
    let mut batch: Vec<RawOrderDocument> = documents
        .into_iter()
        .filter(|doc| match &doc.id {
            Some(id) => seen.insert(id.clone()),
            None => {
                warn!("dropping order without id");
                false
            }
        })
        .collect();
    batch.sort_by_key(|doc| std::cmp::Reverse(doc.sort_key()));
    batch.truncate(limit);
    batch
}

/// `out/orders.json` + `A1` → `out/orders_A1.json`.
pub fn dump_path(base: &Path, order_id: &str) -> PathBuf {
    let stem = if base.extension().is_some_and(|ext| ext == "json") {
        base.with_extension("")
    } else {
        base.to_path_buf()
    };
    let mut name = OsString::from(stem);
    name.push(format!("_{order_id}.json"));
    PathBuf::from(name)
}

fn dump_document(base: &Path, doc: &RawOrderDocument) {
    let path = dump_path(base, doc.id_label());
    let written = serde_json::to_string_pretty(doc.raw())
        .map_err(WatchError::from)
        .and_then(|body| std::fs::write(&path, body).map_err(WatchError::from));
    match written {
        Ok(()) => info!(path = %path.display(), "raw document dumped"),
        Err(err) => warn!(path = %path.display(), error = %err, "could not dump raw document"),
    }
}

/// What happened during a poll run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub processed: usize,
    pub new: usize,
    pub reopened: usize,
    pub cancelled: usize,
    pub unchanged: usize,
    pub sent: usize,
    /// Notifications decided but not sent because mail was off.
    pub held: usize,
}

impl RunSummary {
    fn record(&mut self, event: LifecycleEvent) {
        self.processed += 1;
        match event {
            LifecycleEvent::New => self.new += 1,
            LifecycleEvent::Reopened => self.reopened += 1,
            LifecycleEvent::Cancelled => self.cancelled += 1,
            LifecycleEvent::NoChange => self.unchanged += 1,
        }
    }
}

/// Delivers or holds a notification. `true` when it was actually sent.
async fn deliver<M: Mailer>(
    mailer: Option<&M>,
    order_id: &str,
    notification: &Notification,
) -> Result<bool, WatchError> {
    match mailer {
        Some(mailer) => {
            mailer.send(notification).await?;
            Ok(true)
        }
        None => {
            info!(
                order_id,
                kind = ?notification.kind,
                subject = %notification.subject,
                recipients = ?notification.recipients,
                "mail disabled, notification not sent"
            );
            Ok(false)
        }
    }
}

/// The tracked polling run.
///
/// Each document is processed fully (classify, normalize, notify, commit)
/// before the next one. A mail or state failure aborts the run; documents
/// already committed stay committed.
pub struct Poller<'a, S, M> {
    source: &'a S,
    mailer: Option<M>,
    recipients: Recipients,
    tracker: StatusTracker,
    catalog: ProductCatalog,
    dump_json: Option<PathBuf>,
}

impl<'a, S: OrderSource, M: Mailer> Poller<'a, S, M> {
    /// `mailer: None` runs dry: notifications are logged and state still
    /// advances.
    pub fn new(
        source: &'a S,
        mailer: Option<M>,
        recipients: Recipients,
        tracker: StatusTracker,
    ) -> Self {
        Self {
            source,
            mailer,
            recipients,
            tracker,
            catalog: ProductCatalog::new(),
            dump_json: None,
        }
    }

    pub fn with_dump_json(mut self, base: Option<PathBuf>) -> Self {
        self.dump_json = base;
        self
    }

    pub fn tracker(&self) -> &StatusTracker {
        &self.tracker
    }

    /// Processes one document and returns its event and rows.
    pub async fn process(
        &mut self,
        doc: &RawOrderDocument,
    ) -> Result<(LifecycleEvent, NormalizedOrder), WatchError> {
        let order_id = doc.id_label();
        let observation = self.tracker.observe(order_id, &doc.status);
        if observation.first_seen() {
            debug!(order_id, "first sighting");
        }

        if let Some(base) = &self.dump_json {
            dump_document(base, doc);
        }

        self.catalog.load_for(self.source, doc).await;
        let order = normalize_order(doc, self.catalog.products(), &Local);
        debug!(order_id, rows = order.rows.len(), "order normalized");

        if let Some(notification) = decide(observation.event, &order, &self.recipients) {
            let sent = deliver(self.mailer.as_ref(), order_id, &notification).await?;
            if sent {
                info!(order_id, event = %observation.event, "notification delivered");
            }
        }

        self.tracker.commit(&observation)?;
        Ok((observation.event, order))
    }

    pub async fn run(&mut self, batch: &[RawOrderDocument]) -> Result<RunSummary, WatchError> {
        let mut summary = RunSummary::default();
        for doc in batch {
            let (event, order) = self.process(doc).await?;
            ui::print_order(&order, event);

            summary.record(event);
            if event != LifecycleEvent::NoChange {
                if self.mailer.is_some() {
                    summary.sent += 1;
                } else {
                    summary.held += 1;
                }
            }
        }
        info!(
            processed = summary.processed,
            new = summary.new,
            reopened = summary.reopened,
            cancelled = summary.cancelled,
            sent = summary.sent,
            products = self.catalog.len(),
            "poll run finished"
        );
        Ok(summary)
    }
}

/// Fetches a single order and optionally sends its "sold" notification.
/// Never touches the status map.
pub async fn report_order<S: OrderSource, M: Mailer>(
    source: &S,
    mailer: Option<&M>,
    recipients: &Recipients,
    order_id: &str,
    dump_json: Option<&Path>,
) -> Result<NormalizedOrder, WatchError> {
    let doc = source.fetch_order(order_id).await?;
    if let Some(base) = dump_json {
        dump_document(base, &doc);
    }

    let mut catalog = ProductCatalog::new();
    catalog.load_for(source, &doc).await;
    let order = normalize_order(&doc, catalog.products(), &Local);

    if let Some(notification) = decide(LifecycleEvent::New, &order, recipients) {
        deliver(mailer, order_id, &notification).await?;
    }
    Ok(order)
}

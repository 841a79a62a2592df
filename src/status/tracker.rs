use serde_json::Value;
use tracing::{debug, info};

use super::state::{LifecycleEvent, OrderStatus, StoredStatus, classify, next_stored};
use super::store::StatusStore;
use crate::error::WatchError;

/// One classified observation of an order, not yet committed.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub order_id: String,
    pub previous: Option<StoredStatus>,
    pub current: Option<OrderStatus>,
    pub event: LifecycleEvent,
}

impl Observation {
    pub fn first_seen(&self) -> bool {
        self.previous.is_none()
    }
}

/// Sole owner of the [`StatusStore`] during a run.
///
/// [`observe`](Self::observe) classifies without touching the store;
/// [`commit`](Self::commit) records the observation and flushes, once the
/// notification for it has been dealt with.
#[derive(Debug)]
pub struct StatusTracker {
    store: StatusStore,
}

impl StatusTracker {
    pub fn new(store: StatusStore) -> Self {
        Self { store }
    }

    pub fn observe(&self, order_id: &str, raw_status: &Value) -> Observation {
        let previous = self.store.get(order_id);
        let current = OrderStatus::from_raw(raw_status);
        let event = classify(previous, current);
        debug!(
            order_id,
            ?previous,
            ?current,
            raw_status = %raw_status,
            event = %event,
            "status classified"
        );
        Observation {
            order_id: order_id.to_string(),
            previous,
            current,
            event,
        }
    }

    pub fn commit(&mut self, observation: &Observation) -> Result<(), WatchError> {
        let Some(next) = next_stored(observation.previous, observation.current) else {
            return Ok(());
        };
        if observation.previous == Some(next) {
            return Ok(());
        }
        self.store.set(&observation.order_id, next);
        self.store.flush()?;
        let stored = Value::from(next);
        info!(order_id = %observation.order_id, %stored, "status stored");
        Ok(())
    }

    pub fn store(&self) -> &StatusStore {
        &self.store
    }
}

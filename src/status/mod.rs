mod state;
mod store;
mod tracker;

pub use state::LifecycleEvent;
pub use store::StatusStore;
pub use tracker::StatusTracker;

#[cfg(test)]
pub use state::{OrderStatus, StoredStatus};

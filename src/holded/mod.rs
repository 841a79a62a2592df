pub mod catalog;
pub mod client;
pub mod error;
pub mod types;

pub use catalog::ProductCatalog;
pub use client::{HoldedClient, OrderSource};
pub use error::HoldedError;
pub use types::{RawLine, RawOrderDocument, RawProduct};

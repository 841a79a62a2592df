use std::collections::HashMap;

use tracing::{debug, warn};

use super::client::OrderSource;
use super::types::{RawOrderDocument, RawProduct};

/// Products fetched during one run, keyed by product id.
///
/// Lives for a single invocation only; a failed fetch is logged and cached as
/// an empty product, so the id is not requested again during the run.
#[derive(Debug, Default)]
pub struct ProductCatalog {
    products: HashMap<String, RawProduct>,
}

impl ProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches every product referenced by `doc` that is not cached yet.
    pub async fn load_for<S: OrderSource>(&mut self, source: &S, doc: &RawOrderDocument) {
        for product_id in doc.lines.iter().filter_map(|l| l.product_id.as_deref()) {
            if self.products.contains_key(product_id) {
                continue;
            }
            let product = match source.fetch_product(product_id).await {
                Ok(product) => {
                    debug!(product_id, "product cached");
                    product
                }
                Err(err) => {
                    warn!(product_id, error = %err, "product fetch failed, using empty record");
                    RawProduct::default()
                }
            };
            self.products.insert(product_id.to_string(), product);
        }
    }

    pub fn products(&self) -> &HashMap<String, RawProduct> {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }
}

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::error::HoldedError;
use super::types::{RawOrderDocument, RawProduct};

pub const API_URL: &str = "https://api.holded.com/api/invoicing/v1";
pub const DEFAULT_PAGE_LIMIT: usize = 200;

/// Read access to orders and products. Implemented by [`HoldedClient`] and by
/// in-memory fakes in tests.
pub trait OrderSource {
    /// Fetches one order by id: typed endpoint first, generic endpoint on 404.
    async fn fetch_order(&self, id: &str) -> Result<RawOrderDocument, HoldedError>;

    /// Fetches every order in `[start, end]` (epoch seconds), following pages
    /// until a short or empty page comes back.
    async fn fetch_orders_in_window(
        &self,
        start: i64,
        end: i64,
    ) -> Result<Vec<RawOrderDocument>, HoldedError>;

    async fn fetch_product(&self, id: &str) -> Result<RawProduct, HoldedError>;
}

/// An order together with the URL that answered.
#[derive(Debug)]
pub struct FetchedOrder {
    pub document: RawOrderDocument,
    pub url: String,
}

#[derive(Debug)]
enum ApiAuth {
    KeyHeader(String),
    Bearer(String),
}

#[derive(Debug)]
pub struct HoldedClient {
    client: Client,
    base_url: String,
    auth: ApiAuth,
    page_limit: usize,
}

impl HoldedClient {
    /// Create a client pointing at a custom base URL (useful for testing).
    pub fn with_base_url(
        api_key: String,
        use_bearer: bool,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, HoldedError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()?;
        let auth = if use_bearer {
            ApiAuth::Bearer(api_key)
        } else {
            ApiAuth::KeyHeader(api_key)
        };
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            page_limit: DEFAULT_PAGE_LIMIT,
        })
    }

    pub fn with_page_limit(mut self, page_limit: usize) -> Self {
        self.page_limit = page_limit.max(1);
        self
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            ApiAuth::KeyHeader(key) => request.header("key", key),
            ApiAuth::Bearer(key) => request.bearer_auth(key),
        }
    }

    /// GET a JSON body. `Ok(None)` means 404.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, HoldedError> {
        let request = self
            .authorize(self.client.get(url))
            .header("accept", "application/json")
            .query(query);
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| status.to_string());
            return Err(HoldedError::Unauthorized(message));
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(HoldedError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        Ok(Some(response.json::<T>().await?))
    }

    /// Like [`OrderSource::fetch_order`], but also reports which endpoint answered.
    pub async fn fetch_order_with_source(&self, id: &str) -> Result<FetchedOrder, HoldedError> {
        let urls = [
            format!("{}/documents/salesorder/{id}", self.base_url),
            format!("{}/documents/{id}", self.base_url),
        ];
        for url in urls {
            match self.get_json::<RawOrderDocument>(&url, &[]).await? {
                Some(document) => return Ok(FetchedOrder { document, url }),
                None => debug!(url = %url, "order not found at endpoint"),
            }
        }
        Err(HoldedError::NotFound(id.to_string()))
    }
}

impl OrderSource for HoldedClient {
    async fn fetch_order(&self, id: &str) -> Result<RawOrderDocument, HoldedError> {
        Ok(self.fetch_order_with_source(id).await?.document)
    }

    async fn fetch_orders_in_window(
        &self,
        start: i64,
        end: i64,
    ) -> Result<Vec<RawOrderDocument>, HoldedError> {
        let url = format!("{}/documents/salesorder", self.base_url);
        let mut documents = Vec::new();

        for page in 1u32.. {
            let query = [
                ("page", page.to_string()),
                ("limit", self.page_limit.to_string()),
                ("starttmp", start.to_string()),
                ("endtmp", end.to_string()),
            ];
            let batch: Vec<RawOrderDocument> =
                self.get_json(&url, &query).await?.unwrap_or_default();
            let fetched = batch.len();
            debug!(page, fetched, "order page fetched");
            documents.extend(batch);
            if fetched < self.page_limit {
                break;
            }
        }

        info!(start, end, total = documents.len(), "order window fetched");
        Ok(documents)
    }

    async fn fetch_product(&self, id: &str) -> Result<RawProduct, HoldedError> {
        let url = format!("{}/products/{id}", self.base_url);
        self.get_json::<RawProduct>(&url, &[])
            .await?
            .ok_or_else(|| HoldedError::NotFound(id.to_string()))
    }
}

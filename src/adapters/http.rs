use crate::domain::model::{BreweryRecord, Page};
use crate::utils::error::{BronzeError, Result};
use crate::utils::validation::validate_range;
use reqwest::Client;
use std::time::Duration;

pub const DEFAULT_SOURCE_URL: &str = "https://api.openbrewerydb.org/v1/breweries";
pub const DEFAULT_PAGE_SIZE: u32 = 50;
/// Open Brewery DB rejects `per_page` above this.
pub const MAX_PAGE_SIZE: u32 = 200;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Paginated client for the brewery API. Holds no state between calls and
/// never retries; a failed page fails the whole fetch.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    timeout: Duration,
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiClient {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Requests `page = 1, 2, ...` until a page comes back empty and returns
    /// the records of all pages in order. `page_size` must be within
    /// `1..=MAX_PAGE_SIZE`.
    pub async fn fetch_data(&self, endpoint: &str, page_size: u32) -> Result<Vec<BreweryRecord>> {
        validate_range("page_size", page_size, 1, MAX_PAGE_SIZE)?;

        let mut all_data = Vec::new();
        let mut page = 1u32;

        tracing::info!("Start request for {}", endpoint);

        loop {
            let data = self.fetch_page(endpoint, page_size, page).await?;

            if data.is_empty() {
                tracing::info!(
                    "Requests concluded after {} page(s), {} records",
                    page - 1,
                    all_data.len()
                );
                break;
            }

            all_data.extend(data);
            tracing::info!("Page '{}' loaded. Total: {}", page, all_data.len());
            page += 1;
        }

        Ok(all_data)
    }

    pub async fn fetch_page(&self, endpoint: &str, page_size: u32, page: u32) -> Result<Page> {
        tracing::debug!("GET {} (per_page={}, page={})", endpoint, page_size, page);

        let response = self
            .client
            .get(endpoint)
            .query(&[("per_page", page_size), ("page", page)])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| request_error(endpoint, page, e))?;

        tracing::debug!("API response status: {}", response.status());

        // 4xx / 5xx
        let response = response
            .error_for_status()
            .map_err(|e| request_error(endpoint, page, e))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| request_error(endpoint, page, e))?;

        serde_json::from_slice::<Page>(&body).map_err(|e| {
            tracing::error!("Page '{}' of {} is not a JSON array of objects: {}", page, endpoint, e);
            BronzeError::SerializationFailure {
                context: format!("page {} of {}", page, endpoint),
                source: e,
            }
        })
    }
}

fn request_error(endpoint: &str, page: u32, err: reqwest::Error) -> BronzeError {
    if err.is_timeout() {
        tracing::error!("Timeout: {}", endpoint);
        BronzeError::Timeout {
            endpoint: endpoint.to_string(),
        }
    } else {
        tracing::error!("Error on request, page '{}': {}", page, err);
        BronzeError::RequestFailure {
            endpoint: endpoint.to_string(),
            page: Some(page),
            source: err,
        }
    }
}

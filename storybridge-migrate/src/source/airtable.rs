//! Airtable REST source adapter
//!
//! Lists every record of a table through the Web API, following the
//! `offset` cursor until the last page.
//!
//! # API Reference
//! - Endpoint: `GET {api_url}/{base_id}/{table}?pageSize=100&offset=...`
//! - Auth: `Authorization: Bearer {api_key}`
//! - Rate Limit: 5 requests/second per base; HTTP 429 when exceeded

use super::{SourceAdapter, SourceError};
use crate::models::SourceRecord;
use governor::{Quota, RateLimiter};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use std::num::NonZeroU32;
use std::time::Duration;

/// Records per page (API maximum)
const PAGE_SIZE: u32 = 100;

/// Requests per second per base
const REQUESTS_PER_SECOND: u32 = 5;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Attempts per page before a throttled request is given up
const MAX_ATTEMPTS: u32 = 5;

/// First backoff after HTTP 429/503, doubled per attempt
const INITIAL_BACKOFF_MS: u64 = 250;

const USER_AGENT: &str = concat!("storybridge-migrate/", env!("CARGO_PKG_VERSION"));

/// Steady [`REQUESTS_PER_SECOND`] without an initial burst
fn request_quota() -> Quota {
    let rate = NonZeroU32::new(REQUESTS_PER_SECOND).unwrap_or(NonZeroU32::MIN);
    Quota::per_second(rate).allow_burst(NonZeroU32::MIN)
}

/// One page of the list-records response
#[derive(Debug, Deserialize)]
struct ListRecordsPage {
    records: Vec<ApiRecord>,
    #[serde(default)]
    offset: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiRecord {
    id: String,
    #[serde(default)]
    fields: serde_json::Map<String, Value>,
}

/// Airtable source adapter
pub struct AirtableSource {
    http_client: reqwest::Client,
    api_url: String,
    base_id: String,
    api_key: String,
    /// One request per 200ms, no burst
    rate_limiter: RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl AirtableSource {
    pub fn new(api_url: impl Into<String>, base_id: impl Into<String>, api_key: impl Into<String>) -> Result<Self, SourceError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_url: api_url.into(),
            base_id: base_id.into(),
            api_key: api_key.into(),
            rate_limiter: RateLimiter::direct(request_quota()),
        })
    }

    /// `{api_url}/{base_id}/{table}` with path segments percent-encoded
    fn table_url(&self, table: &str) -> Result<Url, SourceError> {
        let mut url = Url::parse(&self.api_url)
            .map_err(|e| SourceError::InvalidUrl(format!("{}: {}", self.api_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| SourceError::InvalidUrl(format!("{} cannot be a base URL", self.api_url)))?
            .pop_if_empty()
            .push(&self.base_id)
            .push(table);
        Ok(url)
    }

    fn page_query(fields: Option<&[&str]>, offset: Option<&str>) -> Vec<(String, String)> {
        let mut query = vec![("pageSize".to_string(), PAGE_SIZE.to_string())];
        if let Some(offset) = offset {
            query.push(("offset".to_string(), offset.to_string()));
        }
        for field in fields.unwrap_or_default() {
            query.push(("fields[]".to_string(), field.to_string()));
        }
        query
    }

    /// Fetch one page, retrying throttled requests with exponential backoff
    async fn fetch_page(
        &self,
        table: &str,
        url: &Url,
        query: &[(String, String)],
    ) -> Result<ListRecordsPage, SourceError> {
        let mut backoff_ms = INITIAL_BACKOFF_MS;
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.rate_limiter.until_ready().await;

            let response = self
                .http_client
                .get(url.clone())
                .bearer_auth(&self.api_key)
                .query(query)
                .send()
                .await
                .map_err(|e| SourceError::Network(e.to_string()))?;

            let status = response.status();

            if is_throttled(status) && attempt < MAX_ATTEMPTS {
                tracing::warn!(
                    table = %table,
                    attempt,
                    backoff_ms,
                    status = status.as_u16(),
                    "Source throttled request, will retry after backoff"
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms *= 2;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(status_error(table, status, body));
            }

            return response
                .json::<ListRecordsPage>()
                .await
                .map_err(|e| SourceError::Parse(format!("table {}: {}", table, e)));
        }
    }
}

fn is_throttled(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE
}

/// Map a non-success HTTP status to a source error
fn status_error(table: &str, status: StatusCode, body: String) -> SourceError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SourceError::Unauthorized {
            table: table.to_string(),
            status: status.as_u16(),
        },
        StatusCode::NOT_FOUND => SourceError::UnknownTable(table.to_string()),
        _ => SourceError::Api {
            table: table.to_string(),
            status: status.as_u16(),
            body,
        },
    }
}

#[async_trait::async_trait]
impl SourceAdapter for AirtableSource {
    fn name(&self) -> &'static str {
        "airtable"
    }

    async fn fetch_all(
        &self,
        table: &str,
        fields: Option<&[&str]>,
    ) -> Result<Vec<SourceRecord>, SourceError> {
        let url = self.table_url(table)?;
        let mut records = Vec::new();
        let mut offset: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let query = Self::page_query(fields, offset.as_deref());
            let page = self.fetch_page(table, &url, &query).await?;
            pages += 1;

            records.extend(
                page.records
                    .into_iter()
                    .map(|r| SourceRecord::from_json_fields(r.id, r.fields)),
            );

            match page.offset {
                Some(next) if !next.is_empty() => offset = Some(next),
                _ => break,
            }
        }

        tracing::debug!(table = %table, pages, records = records.len(), "Fetched source table");
        Ok(records)
    }
}

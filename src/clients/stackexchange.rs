use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::StackExchangeConfig;
use crate::domain::{ProviderName, Query, ResultItem};
use crate::services::provider::{ProviderError, SearchProvider};

const PROVIDER: ProviderName = ProviderName::StackOverflow;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Question>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Question {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    creation_date: Option<i64>,
    #[serde(default)]
    owner: Option<Owner>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    answer_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct Owner {
    #[serde(default)]
    display_name: Option<String>,
}

impl From<Question> for ResultItem {
    fn from(q: Question) -> Self {
        Self {
            title: html_escape::decode_html_entities(&q.title).to_string(),
            link: q.link,
            score: q.score,
            body: q.body,
            created_at: q
                .creation_date
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
            author: q.owner.and_then(|o| o.display_name),
            tags: q.tags,
            responses: q.answer_count,
        }
    }
}

/// Decodes a `search/advanced` response body, keeping the upstream order.
pub fn parse_response(body: &[u8]) -> Result<Vec<ResultItem>, ProviderError> {
    let response: SearchResponse = serde_json::from_slice(body)
        .map_err(|e| ProviderError::payload(PROVIDER, e.to_string()))?;

    if let Some(message) = response.error_message {
        return Err(ProviderError::payload(PROVIDER, message));
    }

    Ok(response
        .items
        .into_iter()
        .filter(|q| !q.link.is_empty())
        .map(ResultItem::from)
        .collect())
}

/// Client for the Stack Exchange question search API.
#[derive(Clone)]
pub struct StackExchangeClient {
    client: Client,
    config: StackExchangeConfig,
}

impl StackExchangeClient {
    pub fn new(config: StackExchangeConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build Stack Exchange HTTP client: {e}"))?;

        Ok(Self { client, config })
    }

    fn search_url(&self, query: &Query) -> Result<url::Url, ProviderError> {
        let base = format!(
            "{}/2.3/search/advanced",
            self.config.base_url.trim_end_matches('/')
        );
        let mut url = url::Url::parse(&base)
            .map_err(|e| ProviderError::transport(PROVIDER, format!("invalid base url: {e}")))?;

        url.query_pairs_mut()
            .append_pair("q", query.as_str())
            .append_pair("site", &self.config.site)
            .append_pair("order", &self.config.order)
            .append_pair("sort", &self.config.sort)
            .append_pair("filter", &self.config.filter);

        Ok(url)
    }
}

#[async_trait::async_trait]
impl SearchProvider for StackExchangeClient {
    fn name(&self) -> ProviderName {
        PROVIDER
    }

    async fn fetch(&self, query: &Query) -> Result<Vec<ResultItem>, ProviderError> {
        let url = self.search_url(query)?;
        let start = Instant::now();

        debug!(provider = %PROVIDER, query = %query, "Fetching Stack Exchange results");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::status(PROVIDER, status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER, e.to_string()))?;

        let items = parse_response(&body)?;

        debug!(
            provider = %PROVIDER,
            count = items.len(),
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Stack Exchange returned results"
        );

        Ok(items)
    }
}

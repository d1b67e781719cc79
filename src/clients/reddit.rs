use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::RedditConfig;
use crate::domain::{ProviderName, Query, ResultItem};
use crate::services::provider::{ProviderError, SearchProvider};

const PROVIDER: ProviderName = ProviderName::Reddit;
const REDDIT_WEB: &str = "https://reddit.com";

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    #[serde(default)]
    title: String,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    selftext: Option<String>,
    #[serde(default)]
    created_utc: Option<f64>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    subreddit: Option<String>,
    #[serde(default)]
    num_comments: Option<u32>,
}

impl From<Post> for ResultItem {
    fn from(p: Post) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let created_at = p
            .created_utc
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs as i64, 0));

        Self {
            title: html_escape::decode_html_entities(&p.title).to_string(),
            link: permalink_url(&p.permalink),
            score: p.score,
            body: p.selftext.filter(|s| !s.is_empty()),
            created_at,
            author: p.author,
            tags: p.subreddit.into_iter().collect(),
            responses: p.num_comments,
        }
    }
}

/// Resolves a site-relative permalink into an absolute URL.
fn permalink_url(permalink: &str) -> String {
    if permalink.starts_with("http://") || permalink.starts_with("https://") {
        permalink.to_string()
    } else {
        format!("{REDDIT_WEB}{permalink}")
    }
}

/// Decodes a `search.json` listing, keeping the upstream order.
pub fn parse_response(body: &[u8]) -> Result<Vec<ResultItem>, ProviderError> {
    let listing: Listing = serde_json::from_slice(body)
        .map_err(|e| ProviderError::payload(PROVIDER, e.to_string()))?;

    Ok(listing
        .data
        .children
        .into_iter()
        .map(|c| c.data)
        .filter(|p| !p.permalink.is_empty())
        .map(ResultItem::from)
        .collect())
}

/// Client for Reddit's public search listing.
#[derive(Clone)]
pub struct RedditClient {
    client: Client,
    config: RedditConfig,
}

impl RedditClient {
    /// Builds a client that identifies itself with the configured user agent
    /// on every request. Reddit rejects anonymous default agents.
    pub fn new(config: RedditConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build Reddit HTTP client: {e}"))?;

        Ok(Self { client, config })
    }

    fn search_url(&self, query: &Query) -> Result<url::Url, ProviderError> {
        let base = format!("{}/search.json", self.config.base_url.trim_end_matches('/'));
        let mut url = url::Url::parse(&base)
            .map_err(|e| ProviderError::transport(PROVIDER, format!("invalid base url: {e}")))?;

        url.query_pairs_mut()
            .append_pair("q", query.as_str())
            .append_pair("sort", &self.config.sort)
            .append_pair("limit", &self.config.limit.to_string());

        Ok(url)
    }
}

#[async_trait::async_trait]
impl SearchProvider for RedditClient {
    fn name(&self) -> ProviderName {
        PROVIDER
    }

    async fn fetch(&self, query: &Query) -> Result<Vec<ResultItem>, ProviderError> {
        let url = self.search_url(query)?;
        let start = Instant::now();

        debug!(provider = %PROVIDER, query = %query, "Fetching Reddit results");

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
            "Reddit returned results"
        );

        Ok(items)
    }
}

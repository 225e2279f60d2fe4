//! Elasticsearch-compatible document store.
//!
//! Implements `DocumentStore` from `netwatch-core` over the document REST
//! API: `/{collection}/{category}/{id}` for single documents and
//! `/{collection}/{category}/_search` for queries. Every request carries the
//! client-wide timeout from [`StoreSettings`].

use serde::Deserialize;
use tracing::debug;

use netwatch_core::store::{DocumentStore, SearchHit, SearchQuery};
use netwatch_types::config::StoreSettings;
use netwatch_types::error::StoreError;

/// Upper bound on hits returned by one search. Matches the store's default
/// result window. A search matching more fails with
/// [`StoreError::Truncated`] instead of returning a partial result.
const MAX_SEARCH_HITS: usize = 10_000;

/// HTTP client for an Elasticsearch-compatible document store.
pub struct ElasticStore {
    base_url: String,
    http: reqwest::Client,
}

impl ElasticStore {
    pub fn new(settings: &StoreSettings) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("netwatch/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.timeout())
            .build()
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self {
            base_url: settings.base_url(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn document_url(&self, collection: &str, category: &str, id: Option<&str>) -> String {
        match id {
            Some(id) => format!("{}/{collection}/{category}/{id}", self.base_url),
            None => format!("{}/{collection}/{category}/", self.base_url),
        }
    }

    fn search_url(&self, collection: &str, category: &str) -> String {
        format!("{}/{collection}/{category}/_search", self.base_url)
    }
}

fn connection_error(err: reqwest::Error) -> StoreError {
    StoreError::Connection(err.to_string())
}

/// Turn a non-success response into [`StoreError::Status`].
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        body,
    })
}

fn search_body(query: &SearchQuery) -> serde_json::Value {
    let query = match query {
        SearchQuery::MatchAll => serde_json::json!({ "match_all": {} }),
        SearchQuery::Term { field, value } => serde_json::json!({ "term": { field: value } }),
    };
    serde_json::json!({
        "size": MAX_SEARCH_HITS,
        "track_total_hits": true,
        "query": query,
    })
}

// ---------------------------------------------------------------------------
// Search response shape
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    total: Option<TotalHits>,
    #[serde(default)]
    hits: Vec<RawHit>,
}

/// `hits.total`: a bare count on older servers, an object on newer ones.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TotalHits {
    Count(u64),
    Object { value: u64 },
}

impl TotalHits {
    fn value(&self) -> u64 {
        match self {
            TotalHits::Count(n) | TotalHits::Object { value: n } => *n,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_source", default)]
    source: serde_json::Value,
}

fn parse_search_hits(body: &[u8]) -> Result<Vec<SearchHit>, StoreError> {
    let response: SearchResponse =
        serde_json::from_slice(body).map_err(|e| StoreError::Decode(e.to_string()))?;
    let returned = response.hits.hits.len();
    let total = response
        .hits
        .total
        .as_ref()
        .map_or(returned as u64, TotalHits::value);
    if total > returned as u64 {
        return Err(StoreError::Truncated { total, returned });
    }
    Ok(response
        .hits
        .hits
        .into_iter()
        .map(|hit| SearchHit {
            id: hit.id,
            source: hit.source,
        })
        .collect())
}

impl DocumentStore for ElasticStore {
    async fn index(
        &self,
        collection: &str,
        category: &str,
        id: Option<&str>,
        document: &serde_json::Value,
    ) -> Result<(), StoreError> {
        let url = self.document_url(collection, category, id);
        let request = match id {
            Some(_) => self.http.put(&url),
            None => self.http.post(&url),
        };
        let response = request.json(document).send().await.map_err(connection_error)?;
        ensure_success(response).await?;
        debug!(%url, "indexed document");
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        category: &str,
        query: &SearchQuery,
    ) -> Result<Vec<SearchHit>, StoreError> {
        let response = self
            .http
            .post(self.search_url(collection, category))
            .json(&search_body(query))
            .send()
            .await
            .map_err(connection_error)?;

        // A collection nobody has written to yet has no documents.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        let body = ensure_success(response)
            .await?
            .bytes()
            .await
            .map_err(connection_error)?;
        parse_search_hits(&body)
    }

    async fn delete(&self, collection: &str, category: &str, id: &str) -> Result<bool, StoreError> {
        let response = self
            .http
            .delete(self.document_url(collection, category, Some(id)))
            .send()
            .await
            .map_err(connection_error)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        ensure_success(response).await?;
        Ok(true)
    }

    async fn exists(&self, collection: &str, category: &str, id: &str) -> Result<bool, StoreError> {
        let response = self
            .http
            .head(self.document_url(collection, category, Some(id)))
            .send()
            .await
            .map_err(connection_error)?;

        let status = response.status();
        if status.is_success() {
            Ok(true)
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Ok(false)
        } else {
            Err(StoreError::Status {
                status: status.as_u16(),
                body: String::new(),
            })
        }
    }
}

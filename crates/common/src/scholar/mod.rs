//! Semantic Scholar Graph API client
//!
//! API Details:
//! - Bulk search: GET /paper/search/bulk, paginated by a continuation `token`
//! - References: GET /paper/{id}/references, paginated by `offset`/`next`
//! - Optional `x-api-key` header
//! - Rate limit: 1 req/s unauthenticated, 429 when exceeded

use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff};
use governor::{
    clock::QuantaClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::cache::DiskCache;
use crate::config::ScholarConfig;
use crate::errors::{AppError, Result};
use crate::models::{
    Paper, Papers, Reference, References, ReferencesByPaper, PAPER_FIELDS, REFERENCE_FIELDS,
};

/// Source of papers and their outgoing references
#[async_trait]
pub trait BibliographicSource: Send + Sync {
    /// Search papers matching `query`, stopping after `limit` papers when set
    async fn search_papers(&self, query: &str, limit: Option<usize>) -> Result<Papers>;

    /// Every outgoing reference of a paper, fetched `page_size` at a time
    async fn fetch_references(&self, paper_id: &str, page_size: usize) -> Result<References>;
}

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, QuantaClock>;

/// Semantic Scholar client
pub struct SemanticScholarClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    limiter: DirectLimiter,
    max_retry: Duration,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    data: Vec<Paper>,
}

#[derive(Debug, Deserialize)]
struct ReferencePage {
    #[serde(default)]
    next: Option<usize>,
    #[serde(default)]
    data: Vec<Reference>,
}

impl SemanticScholarClient {
    pub fn new(config: &ScholarConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            limiter: RateLimiter::direct(Quota::per_second(per_second)),
            max_retry: Duration::from_secs(config.max_retry_secs),
        })
    }

    /// GET with rate limiting and retry of transient failures
    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let url = url.as_str();
        let policy = ExponentialBackoff {
            max_elapsed_time: Some(self.max_retry),
            ..ExponentialBackoff::default()
        };

        retry(policy, move || self.attempt(url, query)).await
    }

    async fn attempt<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> std::result::Result<T, backoff::Error<AppError>> {
        self.limiter.until_ready().await;

        let mut request = self.client.get(url).query(query);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request.send().await.map_err(|e| {
            warn!(url, error = %e, "Request failed, retrying");
            backoff::Error::transient(AppError::from(e))
        })?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| backoff::Error::permanent(AppError::from(e)));
        }

        let body = response.text().await.unwrap_or_default();
        let err = AppError::UpstreamStatus {
            service: "semantic-scholar".to_string(),
            status: status.as_u16(),
            message: body,
        };
        if is_transient(status) {
            warn!(url, status = status.as_u16(), "Transient API error, retrying");
            Err(backoff::Error::transient(err))
        } else {
            Err(backoff::Error::permanent(err))
        }
    }
}

/// Rate limiting and server-side failures are worth retrying
fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[async_trait]
impl BibliographicSource for SemanticScholarClient {
    #[instrument(skip(self))]
    async fn search_papers(&self, query: &str, limit: Option<usize>) -> Result<Papers> {
        let fields = PAPER_FIELDS.join(",");
        let mut papers = Papers::default();
        let mut token: Option<String> = None;

        loop {
            let mut params = vec![("query", query.to_string()), ("fields", fields.clone())];
            if let Some(token) = &token {
                params.push(("token", token.clone()));
            }

            let page: SearchPage = self.get_json("/paper/search/bulk", &params).await?;
            let received = page.data.len();

            for paper in page.data {
                if limit.is_some_and(|limit| papers.len() >= limit) {
                    break;
                }
                papers.papers.entry(paper.paper_id.clone()).or_insert(paper);
            }

            info!(done = papers.len(), total = page.total, received, "Fetched search page");

            if limit.is_some_and(|limit| papers.len() >= limit) {
                break;
            }
            match page.token {
                Some(next) if received > 0 => token = Some(next),
                _ => break,
            }
        }

        Ok(papers)
    }

    #[instrument(skip(self))]
    async fn fetch_references(&self, paper_id: &str, page_size: usize) -> Result<References> {
        let fields = REFERENCE_FIELDS.join(",");
        let page_size = page_size.max(1);
        let path = format!("/paper/{}/references", paper_id);
        let mut references = Vec::new();
        let mut offset = 0usize;

        loop {
            let params = [
                ("fields", fields.clone()),
                ("offset", offset.to_string()),
                ("limit", page_size.to_string()),
            ];
            let page: ReferencePage = self.get_json(&path, &params).await?;
            let received = page.data.len();
            references.extend(page.data);

            match page.next {
                Some(next) if received > 0 && next > offset => offset = next,
                _ => break,
            }
        }

        debug!(paper_id, references = references.len(), "Fetched references");
        Ok(References { references })
    }
}

/// Fetch the references of every paper in the snapshot
///
/// Starts from whatever `cache` holds, skips papers already fetched and
/// rewrites the cache after each new paper so an interrupted run can resume.
#[instrument(skip_all, fields(papers = papers.len(), cache = %cache.path().display()))]
pub async fn fetch_all_references(
    source: &dyn BibliographicSource,
    papers: &Papers,
    cache: &DiskCache,
    page_size: usize,
) -> Result<ReferencesByPaper> {
    let mut references = cache.load().await?;
    let total = papers.len();
    let mut fetched = 0usize;

    for (position, paper_id) in papers.papers.keys().enumerate() {
        if references.contains(paper_id) {
            continue;
        }

        let paper_references = source.fetch_references(paper_id, page_size).await?;
        references.insert(paper_id.clone(), paper_references);
        cache.store(&references).await?;
        fetched += 1;

        let done = position + 1;
        if done % 25 == 0 || done == total {
            info!(done, total, "Fetching references");
        }
    }

    info!(fetched, cached = total - fetched, "References ready");
    Ok(references)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(is_transient(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient(StatusCode::BAD_GATEWAY));
        assert!(!is_transient(StatusCode::NOT_FOUND));
        assert!(!is_transient(StatusCode::FORBIDDEN));
    }

    #[test]
    fn test_search_page_parsing() {
        let json = r#"{
            "total": 2,
            "token": "abc",
            "data": [{
                "paperId": "p1",
                "title": "Anthrax detection",
                "abstract": null,
                "referenceCount": 12,
                "citationCount": 3,
                "influentialCitationCount": 0,
                "fieldsOfStudy": null,
                "s2FieldsOfStudy": [{"category": "Medicine", "source": "s2-fos-model"}],
                "publicationTypes": ["JournalArticle"],
                "journal": {"name": "Biosecurity"}
            }]
        }"#;
        let page: SearchPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.token.as_deref(), Some("abc"));
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].reference_count, 12);
        assert!(page.data[0].abstract_text.is_none());
        assert_eq!(
            page.data[0].journal.as_ref().and_then(|j| j.name.as_deref()),
            Some("Biosecurity")
        );
    }

    #[test]
    fn test_last_reference_page_has_no_next() {
        let json = r#"{
            "offset": 100,
            "data": [
                {"intents": ["background"], "isInfluential": false, "citedPaper": {"paperId": "p9"}},
                {"intents": null, "isInfluential": true, "citedPaper": {"paperId": null}}
            ]
        }"#;
        let page: ReferencePage = serde_json::from_str(json).unwrap();
        assert!(page.next.is_none());
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.data[0].cited_id(), Some("p9"));
        assert!(page.data[1].cited_id().is_none());
    }

    #[test]
    fn test_client_construction() {
        let config = ScholarConfig {
            requests_per_second: 0,
            base_url: "http://localhost:9/graph/v1/".into(),
            ..ScholarConfig::default()
        };
        let client = SemanticScholarClient::new(&config).unwrap();
        assert_eq!(client.base_url, "http://localhost:9/graph/v1");
    }

    /// Serves one reference per paper, pointing at "cited-<id>"
    #[derive(Default)]
    struct FakeSource {
        calls: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl BibliographicSource for FakeSource {
        async fn search_papers(&self, _query: &str, _limit: Option<usize>) -> Result<Papers> {
            Ok(Papers::default())
        }

        async fn fetch_references(&self, paper_id: &str, _page_size: usize) -> Result<References> {
            self.calls.lock().unwrap().push(paper_id.to_string());
            let reference: Reference = serde_json::from_value(serde_json::json!({
                "isInfluential": false,
                "citedPaper": {"paperId": format!("cited-{paper_id}")}
            }))?;
            Ok(References {
                references: vec![reference],
            })
        }
    }

    #[tokio::test]
    async fn test_fetch_all_resumes_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let papers: Papers = vec![Paper::new("a", "A"), Paper::new("b", "B"), Paper::new("c", "C")]
            .into_iter()
            .collect();
        let cache = DiskCache::for_papers(dir.path(), &papers, true).unwrap();

        let mut partial = ReferencesByPaper::default();
        partial.insert("b".to_string(), References::default());
        cache.store(&partial).await.unwrap();

        let source = FakeSource::default();
        let references = fetch_all_references(&source, &papers, &cache, 100).await.unwrap();

        assert_eq!(*source.calls.lock().unwrap(), vec!["a", "c"]);
        assert_eq!(references.len(), 3);
        assert!(references.papers["b"].references.is_empty());
        assert_eq!(references.papers["c"].references[0].cited_id(), Some("cited-c"));

        let persisted = cache.load().await.unwrap();
        assert_eq!(persisted, references);
    }

    #[tokio::test]
    async fn test_disabled_cache_fetches_everything() {
        let dir = tempfile::tempdir().unwrap();
        let papers: Papers = vec![Paper::new("a", "A")].into_iter().collect();

        let enabled = DiskCache::for_papers(dir.path(), &papers, true).unwrap();
        let mut cached = ReferencesByPaper::default();
        cached.insert("a".to_string(), References::default());
        enabled.store(&cached).await.unwrap();

        let disabled = DiskCache::for_papers(dir.path(), &papers, false).unwrap();
        let source = FakeSource::default();
        let references = fetch_all_references(&source, &papers, &disabled, 100).await.unwrap();

        assert_eq!(source.calls.lock().unwrap().len(), 1);
        assert_eq!(references.papers["a"].references.len(), 1);
    }
}

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use citewatch_core::EndpointConfig;
use reqwest::Url;
use serde_json::Value;

use crate::error::{Result, ScienceError};
use crate::http::HttpClient;
use crate::identifiers::arxiv::ArxivId;
use crate::sources::PaperSource;
use crate::types::{PaperRecord, Resolution, UNKNOWN};

const PAPER_FIELDS: &str = "title,authors,year,venue,citationCount,externalIds,publicationVenue";
const CITATION_FIELDS: &str = "citationCount";
const DEFAULT_VENUE: &str = "arXiv";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct S2PaperId(String);

impl S2PaperId {
    pub fn from_arxiv(arxiv_id: &str) -> Self {
        Self(format!("arXiv:{arxiv_id}"))
    }

    pub fn from_doi(doi: &str) -> Self {
        Self(format!("DOI:{doi}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for S2PaperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Citation-graph metadata service. Primary source for title, authors,
/// venue, year and citation count.
#[derive(Clone)]
pub struct SemanticScholarSource {
    client: Arc<HttpClient>,
    base_url: String,
    pdf_base_url: String,
}

impl SemanticScholarSource {
    pub fn new(client: Arc<HttpClient>, endpoints: &EndpointConfig) -> Self {
        Self {
            client,
            base_url: endpoints.semantic_scholar.trim_end_matches('/').to_string(),
            pdf_base_url: endpoints.arxiv_pdf.clone(),
        }
    }

    fn paper_url(&self, id: &S2PaperId, fields: &str) -> Result<Url> {
        Url::parse_with_params(
            &format!("{}/paper/{}", self.base_url, id.as_str()),
            &[("fields", fields)],
        )
        .map_err(|e| ScienceError::Parse(format!("invalid Semantic Scholar URL: {e}")))
    }

    pub async fn fetch_paper(&self, arxiv_id: &ArxivId) -> Result<PaperRecord> {
        let url = self.paper_url(&S2PaperId::from_arxiv(&arxiv_id.id), PAPER_FIELDS)?;
        let json = self.client.get_json(&url).await?;
        record_from_json(&json, arxiv_id, &self.pdf_base_url)
    }

    /// Dedicated citation-count lookup. `Ok(None)` when the paper exists but
    /// the service has no count for it.
    pub async fn citation_count(&self, id: &S2PaperId) -> Result<Option<u32>> {
        let url = self.paper_url(id, CITATION_FIELDS)?;
        let json = self.client.get_json(&url).await?;
        Ok(as_u32(json.get("citationCount")))
    }
}

#[async_trait]
impl PaperSource for SemanticScholarSource {
    fn name(&self) -> &str {
        "Semantic Scholar"
    }

    async fn resolve(&self, id: &ArxivId) -> Resolution {
        match self.fetch_paper(id).await {
            Ok(record) => Resolution::Found(record),
            Err(e) => e.into(),
        }
    }
}

fn record_from_json(v: &Value, arxiv_id: &ArxivId, pdf_base_url: &str) -> Result<PaperRecord> {
    let obj = v
        .as_object()
        .ok_or_else(|| ScienceError::Parse("paper response is not an object".to_string()))?;
    if obj.is_empty() {
        return Err(ScienceError::NotFound(format!("arXiv:{}", arxiv_id.id)));
    }

    let title = non_empty_str(v.get("title")).unwrap_or(UNKNOWN).to_string();

    let authors = v
        .get("authors")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|author| non_empty_str(author.get("name")).unwrap_or(UNKNOWN).to_string())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let venue = v
        .get("publicationVenue")
        .and_then(|pv| non_empty_str(pv.get("name")))
        .or_else(|| non_empty_str(v.get("venue")))
        .unwrap_or(DEFAULT_VENUE)
        .to_string();

    let year = v
        .get("year")
        .and_then(Value::as_i64)
        .map(|y| y.to_string())
        .unwrap_or_else(|| UNKNOWN.to_string());

    let doi = v
        .get("externalIds")
        .and_then(|ids| non_empty_str(ids.get("DOI")))
        .map(ToOwned::to_owned);

    Ok(PaperRecord {
        title,
        authors,
        venue,
        year,
        arxiv_id: Some(arxiv_id.id.clone()),
        doi,
        pdf_url: Some(arxiv_id.pdf_url(pdf_base_url)),
        citation_count: as_u32(v.get("citationCount")),
    })
}

fn non_empty_str(v: Option<&Value>) -> Option<&str> {
    v.and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
}

fn as_u32(v: Option<&Value>) -> Option<u32> {
    v.and_then(Value::as_u64).and_then(|n| u32::try_from(n).ok())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mockito::{Matcher, Server};
    use serde_json::json;

    use super::*;
    use crate::http::testing::{RecordingPause, test_client};

    fn source_for(server: &Server, pause: Arc<RecordingPause>) -> SemanticScholarSource {
        let endpoints = EndpointConfig {
            semantic_scholar: format!("{}/graph/v1", server.url()),
            arxiv_api: format!("{}/api/query", server.url()),
            arxiv_pdf: format!("{}/pdf", server.url()),
        };
        SemanticScholarSource::new(Arc::new(test_client(pause)), &endpoints)
    }

    fn id(raw: &str) -> ArxivId {
        ArxivId::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn fetch_paper_maps_fields() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/graph/v1/paper/arXiv:1706.03762")
            .match_query(Matcher::UrlEncoded("fields".into(), PAPER_FIELDS.into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "paperId": "204e3073870fae3d05bcbc2f6a8e263d9b72e776",
                    "externalIds": {"ArXiv": "1706.03762", "DOI": "10.5555/3295222.3295349"},
                    "title": "Attention Is All You Need",
                    "year": 2017,
                    "venue": "Neural Information Processing Systems",
                    "publicationVenue": {"name": "Neural Information Processing Systems (NeurIPS)"},
                    "authors": [{"authorId": "1", "name": "Ashish Vaswani"}, {"authorId": "2", "name": "Noam Shazeer"}],
                    "citationCount": 120000
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let source = source_for(&server, Arc::new(RecordingPause::default()));
        let record = source.fetch_paper(&id("1706.03762v7")).await.unwrap();

        mock.assert_async().await;
        assert_eq!(record.title, "Attention Is All You Need");
        assert_eq!(record.authors, vec!["Ashish Vaswani", "Noam Shazeer"]);
        assert_eq!(record.venue, "Neural Information Processing Systems (NeurIPS)");
        assert_eq!(record.year, "2017");
        assert_eq!(record.arxiv_id.as_deref(), Some("1706.03762"));
        assert_eq!(record.doi.as_deref(), Some("10.5555/3295222.3295349"));
        assert_eq!(record.citation_count, Some(120000));
        assert_eq!(
            record.pdf_url,
            Some(format!("{}/pdf/1706.03762.pdf", server.url()))
        );
    }

    #[tokio::test]
    async fn missing_fields_are_unknown_not_errors() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/graph/v1/paper/arXiv:2301.00001")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({"paperId": "abc", "venue": "", "publicationVenue": null}).to_string())
            .create_async()
            .await;

        let source = source_for(&server, Arc::new(RecordingPause::default()));
        let record = source.fetch_paper(&id("2301.00001")).await.unwrap();

        assert_eq!(record.title, "Unknown");
        assert!(record.authors.is_empty());
        assert_eq!(record.venue, "arXiv");
        assert_eq!(record.year, "Unknown");
        assert_eq!(record.doi, None);
        assert_eq!(record.citation_count, None);
    }

    #[tokio::test]
    async fn unknown_paper_resolves_not_found() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/graph/v1/paper/arXiv:2301.99999")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"error":"Paper with id arXiv:2301.99999 not found"}"#)
            .create_async()
            .await;

        let source = source_for(&server, Arc::new(RecordingPause::default()));
        assert!(matches!(
            source.resolve(&id("2301.99999")).await,
            Resolution::NotFound
        ));
    }

    #[tokio::test]
    async fn persistent_rate_limit_is_transient_failure() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/graph/v1/paper/arXiv:2301.00001")
            .match_query(Matcher::Any)
            .with_status(429)
            .expect(4)
            .create_async()
            .await;

        let pause = Arc::new(RecordingPause::default());
        let source = source_for(&server, pause.clone());
        assert!(matches!(
            source.resolve(&id("2301.00001")).await,
            Resolution::TransientFailure(_)
        ));
        mock.assert_async().await;
        assert_eq!(
            pause.recorded(),
            vec![Duration::from_secs(3), Duration::from_secs(6), Duration::from_secs(9)]
        );
    }

    #[tokio::test]
    async fn citation_count_by_doi() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/graph/v1/paper/DOI:10.1000/xyz")
            .match_query(Matcher::UrlEncoded("fields".into(), "citationCount".into()))
            .with_status(200)
            .with_body(r#"{"paperId":"abc","citationCount":0}"#)
            .create_async()
            .await;

        let source = source_for(&server, Arc::new(RecordingPause::default()));
        let count = source
            .citation_count(&S2PaperId::from_doi("10.1000/xyz"))
            .await
            .unwrap();
        assert_eq!(count, Some(0));
    }
}

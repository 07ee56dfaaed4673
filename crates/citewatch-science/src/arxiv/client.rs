use std::sync::Arc;

use async_trait::async_trait;
use citewatch_core::EndpointConfig;
use reqwest::Url;

use crate::arxiv::parser::{ArxivEntry, parse_atom_response};
use crate::error::{Result, ScienceError};
use crate::http::HttpClient;
use crate::identifiers::arxiv::ArxivId;
use crate::sources::PaperSource;
use crate::types::{PaperRecord, Resolution, UNKNOWN};

/// Preprint server query API. Used as the fallback source: it knows titles,
/// authors and dates but never citation counts.
pub struct ArxivClient {
    client: Arc<HttpClient>,
    api_url: String,
    pdf_base_url: String,
}

impl ArxivClient {
    pub fn new(client: Arc<HttpClient>, endpoints: &EndpointConfig) -> Self {
        Self {
            client,
            api_url: endpoints.arxiv_api.clone(),
            pdf_base_url: endpoints.arxiv_pdf.clone(),
        }
    }

    fn query_url(&self, id: &ArxivId) -> Result<Url> {
        Url::parse_with_params(&self.api_url, &[("id_list", id.id.as_str())])
            .map_err(|e| ScienceError::Parse(format!("invalid arXiv API URL: {e}")))
    }

    pub async fn fetch_entry(&self, id: &ArxivId) -> Result<ArxivEntry> {
        let url = self.query_url(id)?;
        let xml = self.client.get_text(&url).await?;
        parse_atom_response(&xml)?
            .into_iter()
            .next()
            .ok_or_else(|| ScienceError::NotFound(format!("arXiv:{id}")))
    }

    pub async fn fetch_record(&self, id: &ArxivId) -> Result<PaperRecord> {
        let entry = self.fetch_entry(id).await?;
        Ok(record_from_entry(entry, id, &self.pdf_base_url))
    }
}

#[async_trait]
impl PaperSource for ArxivClient {
    fn name(&self) -> &str {
        "arXiv"
    }

    async fn resolve(&self, id: &ArxivId) -> Resolution {
        match self.fetch_record(id).await {
            Ok(record) => Resolution::Found(record),
            Err(e) => e.into(),
        }
    }
}

fn record_from_entry(entry: ArxivEntry, id: &ArxivId, pdf_base_url: &str) -> PaperRecord {
    let venue = entry
        .category()
        .map_or_else(|| "arXiv".to_string(), |category| format!("arXiv:{category}"));
    let year = entry.year().unwrap_or(UNKNOWN).to_string();

    PaperRecord {
        title: entry.title.unwrap_or_else(|| UNKNOWN.to_string()),
        authors: entry.authors,
        venue,
        year,
        arxiv_id: Some(id.id.clone()),
        doi: entry.doi,
        pdf_url: Some(id.pdf_url(pdf_base_url)),
        citation_count: None,
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};

    use super::*;
    use crate::arxiv::parser::tests::{ATTENTION_XML, EMPTY_XML, ERROR_XML};
    use crate::http::testing::{RecordingPause, test_client};

    fn client_for(server: &Server) -> ArxivClient {
        let endpoints = EndpointConfig {
            semantic_scholar: format!("{}/graph/v1", server.url()),
            arxiv_api: format!("{}/api/query", server.url()),
            arxiv_pdf: "https://arxiv.org/pdf".to_string(),
        };
        ArxivClient::new(
            Arc::new(test_client(Arc::new(RecordingPause::default()))),
            &endpoints,
        )
    }

    async fn feed_mock(server: &mut Server, id: &str, body: &str) -> mockito::Mock {
        server
            .mock("GET", "/api/query")
            .match_query(Matcher::UrlEncoded("id_list".into(), id.into()))
            .with_status(200)
            .with_header("content-type", "application/atom+xml")
            .with_body(body)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn resolves_record_from_feed() {
        let mut server = Server::new_async().await;
        let mock = feed_mock(&mut server, "1706.03762", ATTENTION_XML).await;

        let client = client_for(&server);
        let id = ArxivId::parse("1706.03762v7").unwrap();
        let record = client.resolve(&id).await.into_record().unwrap();

        mock.assert_async().await;
        assert_eq!(record.title, "Attention Is All You Need");
        assert_eq!(record.authors, vec!["Ashish Vaswani", "Noam Shazeer"]);
        assert_eq!(record.venue, "arXiv:cs.CL");
        assert_eq!(record.year, "2017");
        assert_eq!(record.arxiv_id.as_deref(), Some("1706.03762"));
        assert_eq!(record.pdf_url.as_deref(), Some("https://arxiv.org/pdf/1706.03762.pdf"));
        assert_eq!(record.citation_count, None);
    }

    #[tokio::test]
    async fn empty_feed_is_not_found() {
        let mut server = Server::new_async().await;
        let _mock = feed_mock(&mut server, "2301.99999", EMPTY_XML).await;

        let client = client_for(&server);
        let id = ArxivId::parse("2301.99999").unwrap();
        assert!(matches!(client.resolve(&id).await, Resolution::NotFound));
    }

    #[tokio::test]
    async fn error_entry_is_not_found() {
        let mut server = Server::new_async().await;
        let _mock = feed_mock(&mut server, "2301.00002", ERROR_XML).await;

        let client = client_for(&server);
        let id = ArxivId::parse("2301.00002").unwrap();
        assert!(matches!(client.resolve(&id).await, Resolution::NotFound));
    }

    #[tokio::test]
    async fn server_error_is_permanent_failure() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/query")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let client = client_for(&server);
        let id = ArxivId::parse("2301.00001").unwrap();
        assert!(matches!(
            client.resolve(&id).await,
            Resolution::PermanentFailure(_)
        ));
    }
}

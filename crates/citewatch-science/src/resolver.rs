use std::sync::Arc;
use std::time::Duration;

use citewatch_core::{EndpointConfig, ThrottleConfig};
use tracing::{debug, info, warn};

use crate::arxiv::ArxivClient;
use crate::http::{HttpClient, Pause};
use crate::identifiers::arxiv::ArxivId;
use crate::sources::{PaperSource, S2PaperId, SemanticScholarSource};
use crate::types::{PaperRecord, Resolution};

/// Resolves an arXiv identifier to a [`PaperRecord`] by asking each source in
/// turn, then fills in a missing citation count from the citation service.
pub struct MetadataResolver {
    sources: Vec<Box<dyn PaperSource>>,
    citations: SemanticScholarSource,
    pause: Arc<dyn Pause>,
    citation_pause: Duration,
}

impl MetadataResolver {
    pub fn new(
        sources: Vec<Box<dyn PaperSource>>,
        citations: SemanticScholarSource,
        pause: Arc<dyn Pause>,
        citation_pause: Duration,
    ) -> Self {
        Self {
            sources,
            citations,
            pause,
            citation_pause,
        }
    }

    /// Semantic Scholar first, arXiv as the fallback.
    pub fn standard(client: Arc<HttpClient>, endpoints: &EndpointConfig, throttle: &ThrottleConfig) -> Self {
        let s2 = SemanticScholarSource::new(client.clone(), endpoints);
        let arxiv = ArxivClient::new(client.clone(), endpoints);
        Self::new(
            vec![Box::new(s2.clone()), Box::new(arxiv)],
            s2,
            client.pause().clone(),
            Duration::from_secs(throttle.citation_pause_secs),
        )
    }

    pub async fn resolve(&self, id: &ArxivId) -> Resolution {
        let mut outcome = Resolution::NotFound;
        for source in &self.sources {
            match source.resolve(id).await {
                Resolution::Found(record) => {
                    info!(source = source.name(), %id, title = %record.title, "resolved paper");
                    return Resolution::Found(self.backfill_citations(record).await);
                }
                Resolution::NotFound => {
                    debug!(source = source.name(), %id, "paper not known to source");
                }
                failure => {
                    warn!(source = source.name(), %id, ?failure, "metadata lookup failed");
                    outcome = failure;
                }
            }
        }
        outcome
    }

    async fn backfill_citations(&self, record: PaperRecord) -> PaperRecord {
        if record.citation_count.is_some() {
            return record;
        }
        let key = match (&record.arxiv_id, &record.doi) {
            (Some(arxiv), _) => S2PaperId::from_arxiv(arxiv),
            (None, Some(doi)) => S2PaperId::from_doi(doi),
            (None, None) => return record,
        };

        self.pause.pause(self.citation_pause).await;
        match self.citations.citation_count(&key).await {
            Ok(count) => {
                debug!(%key, ?count, "citation count lookup");
                record.with_citation_count(count)
            }
            Err(e) => {
                warn!(%key, error = %e, "citation count lookup failed");
                record
            }
        }
    }
}

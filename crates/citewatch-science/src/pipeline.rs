use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use citewatch_core::sync::NoteProcessor;
use citewatch_core::{AppConfig, ProcessedInfo, ProcessedStateStore};
use tracing::{debug, info, warn};

use crate::download::PdfDownloader;
use crate::error::Result;
use crate::http::{HttpClient, Pause, RetryPolicy, TokioPause};
use crate::identifiers::{PaperLink, extract_doi, find_unique_urls};
use crate::notes::{self, CitationInsert};
use crate::resolver::MetadataResolver;
use crate::types::{PaperRecord, Resolution};

/// What one pass over a note did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteReport {
    pub links: usize,
    pub already_processed: usize,
    pub cited: usize,
    pub pdfs: usize,
    pub dois: usize,
    pub unresolved: usize,
}

impl NoteReport {
    pub fn rewrote_note(&self) -> bool {
        self.cited > 0
    }
}

/// Finds new paper links in a note, resolves and downloads them, appends
/// citations and records everything in the state store.
pub struct NotePipeline {
    resolver: MetadataResolver,
    downloader: PdfDownloader,
    state: ProcessedStateStore,
    pdf_dir: PathBuf,
    pause: Arc<dyn Pause>,
    link_pause: Duration,
}

impl NotePipeline {
    pub fn new(
        resolver: MetadataResolver,
        downloader: PdfDownloader,
        state: ProcessedStateStore,
        pdf_dir: PathBuf,
        pause: Arc<dyn Pause>,
        link_pause: Duration,
    ) -> Self {
        Self {
            resolver,
            downloader,
            state,
            pdf_dir,
            pause,
            link_pause,
        }
    }

    /// Metadata requests use the API timeout and retry policy; PDF downloads
    /// get the longer download timeout and no retries.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let pause: Arc<dyn Pause> = Arc::new(TokioPause);
        let api = Arc::new(HttpClient::new(
            &config.network,
            config.network.timeout(),
            RetryPolicy::from_throttle(&config.throttle),
            pause.clone(),
        )?);
        let downloads = Arc::new(HttpClient::new(
            &config.network,
            config.network.download_timeout(),
            RetryPolicy::none(),
            pause.clone(),
        )?);

        Ok(Self::new(
            MetadataResolver::standard(api, &config.endpoints, &config.throttle),
            PdfDownloader::new(downloads),
            ProcessedStateStore::open(config.resolved_state_file()),
            config.resolved_pdf_dir(),
            pause,
            Duration::from_secs(config.throttle.link_pause_secs),
        ))
    }

    pub fn state(&self) -> &ProcessedStateStore {
        &self.state
    }

    pub fn pdf_dir(&self) -> &Path {
        &self.pdf_dir
    }

    /// Handle every link in `note` that is not yet in the state store. A link
    /// whose metadata cannot be resolved stays unprocessed so a later change
    /// to the note retries it.
    pub async fn process_note(&mut self, note: &Path) -> Result<NoteReport> {
        let text = tokio::fs::read_to_string(note).await?;
        let mut report = NoteReport::default();
        let mut inserts = Vec::new();
        let mut resolved_before = false;

        for url in find_unique_urls(&text) {
            report.links += 1;
            if self.state.is_processed(&url) {
                report.already_processed += 1;
                continue;
            }

            match PaperLink::classify(&url) {
                PaperLink::Arxiv(id) => {
                    if resolved_before {
                        self.pause.pause(self.link_pause).await;
                    }
                    resolved_before = true;

                    info!(%url, %id, "new paper link");
                    match self.resolver.resolve(&id).await {
                        Resolution::Found(paper) => {
                            let pdf_path = self.fetch_pdf(&paper, note).await;
                            if pdf_path.is_some() {
                                report.pdfs += 1;
                            }
                            self.state.mark_processed(
                                &url,
                                ProcessedInfo {
                                    title: Some(paper.title.clone()),
                                    arxiv_id: Some(id.id.clone()),
                                    doi: None,
                                },
                            )?;
                            report.cited += 1;
                            inserts.push(CitationInsert {
                                url,
                                paper,
                                pdf_path,
                            });
                        }
                        outcome => {
                            warn!(%url, ?outcome, "could not resolve paper, leaving link for a later pass");
                            report.unresolved += 1;
                        }
                    }
                }
                PaperLink::Doi(_) => {
                    let doi = extract_doi(&url);
                    info!(%url, doi = doi.as_deref().unwrap_or_default(), "DOI link recorded without citation");
                    self.state.mark_processed(
                        &url,
                        ProcessedInfo {
                            doi,
                            ..ProcessedInfo::default()
                        },
                    )?;
                    report.dois += 1;
                }
                PaperLink::Unknown => {
                    debug!(%url, "ignoring link");
                }
            }
        }

        if !inserts.is_empty() {
            if let Err(e) = notes::apply_to_file(note, &inserts).await {
                let urls: Vec<&str> = inserts.iter().map(|i| i.url.as_str()).collect();
                warn!(
                    note = %note.display(),
                    ?urls,
                    error = %e,
                    "links marked processed but citations not written"
                );
                return Err(e);
            }
            info!(note = %note.display(), citations = inserts.len(), "note updated");
        }
        self.state.update_hash(note)?;
        Ok(report)
    }

    /// Download the paper's PDF and return its path relative to the note's
    /// directory. Failures are logged and yield `None`.
    async fn fetch_pdf(&self, paper: &PaperRecord, note: &Path) -> Option<String> {
        match self.downloader.download(paper, &self.pdf_dir).await {
            Ok(path) => {
                let note_dir = note.parent().unwrap_or_else(|| Path::new("."));
                Some(relative_link(&path, note_dir))
            }
            Err(e) => {
                warn!(title = %paper.title, error = %e, "PDF download failed");
                None
            }
        }
    }
}

#[async_trait]
impl NoteProcessor for NotePipeline {
    async fn note_changed(&mut self, path: &Path) -> anyhow::Result<()> {
        if !self.state.has_changed(path)? {
            debug!(note = %path.display(), "content unchanged, rechecking unprocessed links");
        }
        let report = self.process_note(path).await?;
        if report.rewrote_note() || report.unresolved > 0 {
            info!(note = %path.display(), ?report, "note processed");
        } else {
            debug!(note = %path.display(), "no new paper links");
        }
        Ok(())
    }
}

/// `target` relative to the directory `base`, `/`-separated for use in a
/// Markdown link. Falls back to the absolute path when no relative form
/// exists.
pub fn relative_link(target: &Path, base: &Path) -> String {
    let (Ok(target), Ok(base)) = (std::path::absolute(target), std::path::absolute(base)) else {
        return target.display().to_string();
    };
    let target: Vec<Component> = target.components().collect();
    let base: Vec<Component> = base.components().collect();

    if target.first() != base.first() {
        return target.iter().collect::<PathBuf>().display().to_string();
    }

    let common = target
        .iter()
        .zip(&base)
        .take_while(|(a, b)| a == b)
        .count();

    let parts: Vec<String> = std::iter::repeat_n("..".to_string(), base.len() - common)
        .chain(
            target[common..]
                .iter()
                .map(|c| c.as_os_str().to_string_lossy().into_owned()),
        )
        .collect();

    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{Result, ScienceError};
use crate::http::HttpClient;
use crate::types::{PaperRecord, UNKNOWN};

const MAX_TITLE_CHARS: usize = 80;

/// `<first author's family name>_<year>_<title>.pdf`, with characters that
/// are illegal in file names removed and the title capped at 80 characters.
pub fn pdf_file_name(paper: &PaperRecord) -> String {
    let family_name = paper
        .first_author()
        .and_then(|name| name.split_whitespace().last())
        .unwrap_or(UNKNOWN);
    let title: String = sanitize(&paper.title).chars().take(MAX_TITLE_CHARS).collect();
    format!("{}_{}_{}.pdf", sanitize(family_name), sanitize(&paper.year), title)
}

fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .filter(|c| !c.is_control())
        .collect()
}

pub struct PdfDownloader {
    client: Arc<HttpClient>,
}

impl PdfDownloader {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self { client }
    }

    /// Fetch the paper's PDF into `pdf_dir`, returning the written path.
    pub async fn download(&self, paper: &PaperRecord, pdf_dir: &Path) -> Result<PathBuf> {
        let url = paper
            .pdf_url
            .as_deref()
            .ok_or_else(|| ScienceError::NotFound(format!("no PDF source for \"{}\"", paper.title)))?;
        let dest = pdf_dir.join(pdf_file_name(paper));

        debug!(%url, dest = %dest.display(), "downloading PDF");
        let bytes = self.client.download_to(url, &dest).await?;
        info!(file = %dest.display(), bytes, "PDF saved");
        Ok(dest)
    }
}

use std::path::Path;

use crate::error::Result;
use crate::formats::format_citation;
use crate::types::PaperRecord;

/// A citation to place under every line that consists solely of `url`.
#[derive(Debug, Clone)]
pub struct CitationInsert {
    pub url: String,
    pub paper: PaperRecord,
    /// PDF location relative to the note's directory, if it was downloaded.
    pub pdf_path: Option<String>,
}

/// Insert a blank line and the formatted citation after each line whose
/// trimmed content equals an insert's URL. Inserts apply in order; other
/// lines are copied unchanged. Inserted lines reuse the matched line's `\r`
/// so CRLF notes stay CRLF.
pub fn rewrite_note(text: &str, inserts: &[CitationInsert]) -> String {
    let mut lines: Vec<String> = text.split('\n').map(ToOwned::to_owned).collect();

    for insert in inserts {
        let citation = format_citation(&insert.paper, insert.pdf_path.as_deref());
        let mut rewritten = Vec::with_capacity(lines.len() + 2);
        for line in lines {
            let matches = line.trim() == insert.url;
            let eol = if line.ends_with('\r') { "\r" } else { "" };
            rewritten.push(line);
            if matches {
                rewritten.push(eol.to_string());
                rewritten.push(format!("{citation}{eol}"));
            }
        }
        lines = rewritten;
    }

    lines.join("\n")
}

/// Read the note, apply all inserts in memory and write it back once.
pub async fn apply_to_file(path: &Path, inserts: &[CitationInsert]) -> Result<()> {
    if inserts.is_empty() {
        return Ok(());
    }
    let text = tokio::fs::read_to_string(path).await?;
    tokio::fs::write(path, rewrite_note(&text, inserts)).await?;
    Ok(())
}

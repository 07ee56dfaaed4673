use crate::types::PaperRecord;

pub const MAX_AUTHORS: usize = 3;

/// Up to `max` names joined by `", "`; a longer list is cut and gets
/// `" et al."`.
pub fn format_authors(authors: &[String], max: usize) -> String {
    if authors.len() <= max {
        return authors.join(", ");
    }
    format!("{} et al.", authors[..max].join(", "))
}

/// One citation line:
/// `**Title**. Authors. Venue, Year ([PDF](..)) ([arXiv](..)) ([DOI](..)) (Citations: N)`.
/// Link fragments appear only when their datum exists.
pub fn format_citation(paper: &PaperRecord, pdf_path: Option<&str>) -> String {
    let mut line = format!(
        "**{}**. {}. {}, {}",
        paper.title,
        format_authors(&paper.authors, MAX_AUTHORS),
        paper.venue,
        paper.year
    );

    let links = [
        pdf_path.map(|path| format!("[PDF]({path})")),
        paper
            .arxiv_id
            .as_deref()
            .map(|id| format!("[arXiv](https://arxiv.org/abs/{id})")),
        paper
            .doi
            .as_deref()
            .map(|doi| format!("[DOI](https://doi.org/{doi})")),
    ];
    for link in links.into_iter().flatten() {
        line.push_str(&format!(" ({link})"));
    }

    match paper.citation_count {
        Some(count) => line.push_str(&format!(" (Citations: {count})")),
        None => line.push_str(" (Citations: N/A)"),
    }
    line
}

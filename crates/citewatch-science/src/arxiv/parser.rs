use quick_xml::de::from_str;
use serde::Deserialize;

use crate::error::{Result, ScienceError};

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    id: Option<String>,
    title: Option<String>,
    published: Option<String>,
    #[serde(rename = "author", default)]
    authors: Vec<AtomAuthor>,
    #[serde(rename = "arxiv:doi", alias = "doi")]
    doi: Option<String>,
    #[serde(rename = "arxiv:primary_category", alias = "primary_category")]
    primary_category: Option<AtomCategory>,
    #[serde(rename = "category", default)]
    categories: Vec<AtomCategory>,
}

#[derive(Debug, Deserialize)]
struct AtomAuthor {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomCategory {
    #[serde(rename = "@term")]
    term: Option<String>,
}

/// One `<entry>` of an arXiv Atom response, with whitespace collapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArxivEntry {
    pub id: String,
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub published: Option<String>,
    pub primary_category: Option<String>,
    pub categories: Vec<String>,
    pub doi: Option<String>,
}

impl ArxivEntry {
    /// The API reports bad queries as a feed with a single error entry.
    pub fn is_error(&self) -> bool {
        self.id.contains("/api/errors")
    }

    /// Leading four digits of the publication date.
    pub fn year(&self) -> Option<&str> {
        self.published
            .as_deref()
            .and_then(|p| p.get(..4))
            .filter(|y| y.bytes().all(|b| b.is_ascii_digit()))
    }

    /// Primary category, else the first listed one.
    pub fn category(&self) -> Option<&str> {
        self.primary_category
            .as_deref()
            .or_else(|| self.categories.first().map(String::as_str))
    }
}

/// Paper entries in `xml`. Error entries are dropped.
pub fn parse_atom_response(xml: &str) -> Result<Vec<ArxivEntry>> {
    let feed: AtomFeed =
        from_str(xml).map_err(|e| ScienceError::Parse(format!("invalid atom xml: {e}")))?;

    Ok(feed
        .entries
        .into_iter()
        .map(parse_entry)
        .filter(|entry| !entry.is_error())
        .collect())
}

fn parse_entry(entry: AtomEntry) -> ArxivEntry {
    let categories = entry
        .categories
        .into_iter()
        .filter_map(|category| clean_optional(category.term))
        .collect();

    ArxivEntry {
        id: entry.id.map(|id| clean_text(&id)).unwrap_or_default(),
        title: clean_optional(entry.title),
        authors: entry
            .authors
            .into_iter()
            .filter_map(|author| clean_optional(author.name))
            .collect(),
        published: clean_optional(entry.published),
        primary_category: entry
            .primary_category
            .and_then(|category| clean_optional(category.term)),
        categories,
        doi: clean_optional(entry.doi),
    }
}

fn clean_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value.map(|v| clean_text(&v)).filter(|v| !v.is_empty())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const ATTENTION_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom"
      xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/"
      xmlns:arxiv="http://arxiv.org/schemas/atom">
  <id>http://arxiv.org/api/query?id_list=1706.03762</id>
  <updated>2024-01-01T00:00:00Z</updated>
  <opensearch:totalResults>1</opensearch:totalResults>
  <entry>
    <id>http://arxiv.org/abs/1706.03762v7</id>
    <updated>2023-08-02T17:54:37Z</updated>
    <published>2017-06-12T17:57:40Z</published>
    <title>
      Attention Is All
      You Need
    </title>
    <summary>
      The dominant sequence transduction models are based on recurrent or convolutional neural networks.
    </summary>
    <author>
      <name>Ashish Vaswani</name>
    </author>
    <author>
      <name>  Noam
        Shazeer </name>
    </author>
    <link rel="alternate" type="text/html" href="http://arxiv.org/abs/1706.03762v7" />
    <link title="pdf" rel="related" type="application/pdf" href="http://arxiv.org/pdf/1706.03762v7" />
    <arxiv:primary_category term="cs.CL" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.CL" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.LG" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
</feed>
"#;

    pub(crate) const EMPTY_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <id>http://arxiv.org/api/query?id_list=2301.99999</id>
  <updated>2024-01-01T00:00:00Z</updated>
</feed>
"#;

    pub(crate) const ERROR_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <id>http://arxiv.org/api/query?id_list=bogus</id>
  <entry>
    <id>http://arxiv.org/api/errors#incorrect_id_format_for_bogus</id>
    <title>Error</title>
    <summary>incorrect id format for bogus</summary>
    <author><name>arXiv api core</name></author>
  </entry>
</feed>
"#;

    #[test]
    fn parses_attention_fixture() {
        let entries = parse_atom_response(ATTENTION_XML).unwrap();
        assert_eq!(entries.len(), 1);

        let entry = &entries[0];
        assert_eq!(entry.id, "http://arxiv.org/abs/1706.03762v7");
        assert_eq!(entry.title.as_deref(), Some("Attention Is All You Need"));
        assert_eq!(entry.authors, vec!["Ashish Vaswani", "Noam Shazeer"]);
        assert_eq!(entry.year(), Some("2017"));
        assert_eq!(entry.category(), Some("cs.CL"));
        assert_eq!(entry.categories, vec!["cs.CL", "cs.LG"]);
        assert_eq!(entry.doi, None);
    }

    #[test]
    fn category_falls_back_to_first_listed() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>http://arxiv.org/abs/2301.00001v1</id>
    <published>not-a-date</published>
    <title>Foo</title>
    <category term="math.AG"/>
    <category term="math.NT"/>
  </entry>
</feed>"#;
        let entries = parse_atom_response(xml).unwrap();
        assert_eq!(entries[0].category(), Some("math.AG"));
        assert_eq!(entries[0].year(), None);
        assert!(entries[0].authors.is_empty());
    }

    #[test]
    fn empty_feed_has_no_entries() {
        assert!(parse_atom_response(EMPTY_XML).unwrap().is_empty());
    }

    #[test]
    fn error_entries_are_dropped() {
        assert!(parse_atom_response(ERROR_XML).unwrap().is_empty());
    }
}

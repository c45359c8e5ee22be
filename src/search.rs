//! Catalog search view.
//!
//! Free text is matched against the `contents` field with `<em>` highlight
//! markers; empty input lists everything. Hits are decoded into
//! [`CatalogHit`] regardless of whether they came from a file or a
//! bibliographic record.

use serde::Deserialize;
use tracing::debug;

use crate::client::{Query, SearchIndex};
use crate::error::ClientError;

pub const CONTENTS_FIELD: &str = "contents";
pub const HIGHLIGHT_PRE: &str = "<em>";
pub const HIGHLIGHT_POST: &str = "</em>";

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CatalogHit {
    pub id: String,
    #[serde(rename = "materialid", default)]
    pub material_id: String,
    #[serde(rename = "objecttype", default)]
    pub object_type: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(rename = "sheetname", default)]
    pub sheet: Option<String>,
    #[serde(rename = "mediatype", default)]
    pub media_type: Option<String>,
    /// Highlighted fragments of `contents`.
    #[serde(skip)]
    pub snippets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogPage {
    pub total: u64,
    pub start: u64,
    pub hits: Vec<CatalogHit>,
}

pub async fn search_catalog(
    index: &dyn SearchIndex,
    text: &str,
    start: usize,
    rows: usize,
) -> Result<CatalogPage, ClientError> {
    let query = Query::free_text(CONTENTS_FIELD, text)
        .start(start)
        .rows(rows)
        .highlight(CONTENTS_FIELD, HIGHLIGHT_PRE, HIGHLIGHT_POST);
    debug!(q = %query.q_value(), start, rows, "catalog search");

    let resp = index.search(&query).await?;
    let mut hits: Vec<CatalogHit> = resp.results.documents().map_err(|e| ClientError::Decode {
        url: index.name().to_string(),
        reason: e.to_string(),
    })?;

    if let Some(hl) = &resp.highlighting {
        for hit in &mut hits {
            if let Some(frags) = hl.get(&hit.id).and_then(|f| f.get(CONTENTS_FIELD)) {
                hit.snippets = frags.clone();
            }
        }
    }

    Ok(CatalogPage {
        total: resp.results.num_found,
        start: resp.results.start,
        hits,
    })
}

/// Renders a page the way the CLI prints it.
pub fn render_page(page: &CatalogPage) -> String {
    if page.hits.is_empty() {
        return "No results.".to_string();
    }
    let mut out = format!(
        "{} hit(s), showing {}-{}\n",
        page.total,
        page.start + 1,
        page.start + page.hits.len() as u64
    );
    for (i, hit) in page.hits.iter().enumerate() {
        let title = hit
            .title
            .as_deref()
            .or(hit.filename.as_deref())
            .unwrap_or("(untitled)");
        out.push_str(&format!(
            "\n{}. {}  [{}]\n   id: {}\n",
            page.start as usize + i + 1,
            title,
            hit.object_type,
            hit.id
        ));
        if let Some(sheet) = &hit.sheet {
            out.push_str(&format!("   sheet: {}\n", sheet));
        }
        for s in &hit.snippets {
            out.push_str(&format!("   > {}\n", s));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::WriteOptions;
    use crate::memory::MemoryIndex;
    use crate::models::{ContentUnit, ContentUnitDocument, Document};

    fn unit(ordinal: usize, values: &[&str]) -> Document {
        let u = ContentUnit {
            ordinal,
            source: "data/rivers.xlsx".to_string(),
            filename: "rivers.xlsx".to_string(),
            folder: "data".to_string(),
            sheet: Some("Sheet1".to_string()),
            media_type: crate::extract::MIME_XLSX.to_string(),
            title: "Rivers".to_string(),
            values: values.iter().map(|s| s.to_string()).collect(),
        };
        ContentUnitDocument::from(&u).into()
    }

    async fn seeded() -> MemoryIndex {
        let index = MemoryIndex::new("catalog");
        index
            .bulk_create(
                &[unit(0, &["Shinano", "367km"]), unit(1, &["Tone", "322km"])],
                &WriteOptions::committed(),
            )
            .await
            .unwrap();
        index
    }

    #[tokio::test]
    async fn keyword_hits_carry_snippets() {
        let index = seeded().await;
        let page = search_catalog(&index, " Tone ", 0, 10).await.unwrap();
        assert_eq!(page.total, 1);
        let hit = &page.hits[0];
        assert_eq!(hit.id, "data/rivers.xlsxSheet11");
        assert_eq!(hit.sheet.as_deref(), Some("Sheet1"));
        assert!(hit.snippets.iter().any(|s| s.contains("<em>Tone</em>")));
    }

    #[tokio::test]
    async fn blank_text_lists_everything() {
        let index = seeded().await;
        let page = search_catalog(&index, "  ", 0, 10).await.unwrap();
        assert_eq!(page.total, 2);
        assert!(render_page(&page).starts_with("2 hit(s), showing 1-2"));
    }

    #[test]
    fn empty_page_renders_no_results() {
        let page = CatalogPage {
            total: 0,
            start: 0,
            hits: Vec::new(),
        };
        assert_eq!(render_page(&page), "No results.");
    }
}

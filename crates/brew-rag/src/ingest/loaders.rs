//! Per-type source loaders (pdf, web, youtube)

use scraper::{Html, Selector};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use brew_core::{Document, Error, Result};

use super::manifest::ManifestRow;
use super::transcript::{canonical_youtube, video_id, TranscriptSource};

pub const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) BrewPortal/1.0 Safari/537.36";

pub const TYPE_YOUTUBE: &str = "youtube";
pub const TYPE_YOUTUBE_FALLBACK: &str = "youtube_fallback";

// Elements whose text is never shown to a reader
const HIDDEN_ELEMENTS: &[&str] = &["head", "script", "style", "noscript", "template", "title"];

/// Turns manifest rows into documents
pub struct SourceLoader {
    http: reqwest::Client,
    transcripts: Arc<dyn TranscriptSource>,
    raw_dir: PathBuf,
}

impl SourceLoader {
    pub fn new(transcripts: Arc<dyn TranscriptSource>, raw_dir: impl Into<PathBuf>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;
        Ok(Self {
            http,
            transcripts,
            raw_dir: raw_dir.into(),
        })
    }

    /// Load one row and stamp the row's columns onto every document
    pub async fn load(&self, row: &ManifestRow) -> Result<Vec<Document>> {
        let documents = match row.kind.as_str() {
            "pdf" => self.load_pdf(&row.location).await?,
            "web" => self.load_web(&row.location).await?,
            "youtube" => self.load_youtube(&row.location).await?,
            other => {
                return Err(Error::Ingestion(format!(
                    "unsupported type: {} for {}",
                    other, row.location
                )));
            }
        };
        Ok(documents.into_iter().map(|d| apply_row_metadata(d, row)).collect())
    }

    async fn load_pdf(&self, location: &str) -> Result<Vec<Document>> {
        let path = PathBuf::from(location);
        if !path.exists() {
            return Err(Error::Ingestion(format!("pdf missing: {}", location)));
        }

        let pages = tokio::task::spawn_blocking(move || pdf_extract::extract_text_by_pages(&path))
            .await
            .map_err(|e| Error::Ingestion(format!("pdf worker failed: {}", e)))?
            .map_err(|e| Error::Ingestion(format!("pdf unreadable {}: {}", location, e)))?;

        Ok(pages
            .into_iter()
            .enumerate()
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(page, text)| {
                Document::new(text)
                    .with_meta("source", location)
                    .with_meta("page", page.to_string())
            })
            .collect())
    }

    async fn load_web(&self, url: &str) -> Result<Vec<Document>> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Network(e.to_string()))?;
        let html = response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let (title, text) = html_to_text(&html);
        let mut document = Document::new(text).with_meta("source", url);
        if let Some(title) = title {
            document = document.with_meta("title", title);
        }
        Ok(vec![document])
    }

    async fn load_youtube(&self, location: &str) -> Result<Vec<Document>> {
        let local = Path::new(location);
        let is_txt = local
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));
        if is_txt && local.exists() {
            let text = tokio::fs::read_to_string(local).await?;
            return Ok(vec![
                Document::new(text)
                    .with_meta("source", location)
                    .with_meta("type", TYPE_YOUTUBE_FALLBACK),
            ]);
        }

        let id = video_id(location);
        let clean = canonical_youtube(location);

        match self.transcripts.fetch(&id).await {
            Ok(Some(text)) if !text.trim().is_empty() => {
                return Ok(vec![
                    Document::new(text)
                        .with_meta("source", clean)
                        .with_meta("type", TYPE_YOUTUBE),
                ]);
            }
            Ok(_) => {}
            Err(e) => warn!(url = %clean, error = %e, "Transcript lookup failed"),
        }

        let candidate = self.raw_dir.join(format!("{}.txt", id));
        if candidate.exists() {
            let text = tokio::fs::read_to_string(&candidate).await?;
            info!(path = %candidate.display(), "Using local transcript fallback");
            return Ok(vec![
                Document::new(text)
                    .with_meta("source", clean)
                    .with_meta("type", TYPE_YOUTUBE_FALLBACK)
                    .with_meta("video_id", id),
            ]);
        }

        warn!(url = %clean, fallback = %candidate.display(), "No captions and no local transcript");
        Ok(Vec::new())
    }
}

/// Copy the row's non-empty columns over the loader's metadata and fill in a
/// default `id`. The `type` column is not copied so fallback provenance set
/// by the loader survives.
pub fn apply_row_metadata(mut document: Document, row: &ManifestRow) -> Document {
    for (key, value) in &row.columns {
        if key == "type" || value.trim().is_empty() {
            continue;
        }
        document.metadata.insert(key.clone(), value.clone());
    }

    if document.meta("id").is_none() {
        let title = document.meta("title").unwrap_or("?");
        let anchor = document
            .meta("page")
            .or_else(|| document.meta("source"))
            .unwrap_or("?");
        let id = format!("{}@{}", title, anchor);
        document.metadata.insert("id".to_string(), id);
    }
    document
}

/// Page title and visible text of an HTML document
pub fn html_to_text(html: &str) -> (Option<String>, String) {
    let document = Html::parse_document(html);

    let title = Selector::parse("title").ok().and_then(|selector| {
        document
            .select(&selector)
            .next()
            .map(|t| t.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    });

    let mut lines = Vec::new();
    for node in document.tree.root().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| HIDDEN_ELEMENTS.contains(&e.name()))
        });
        if hidden {
            continue;
        }
        let line = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if !line.is_empty() {
            lines.push(line);
        }
    }

    (title, lines.join("\n"))
}

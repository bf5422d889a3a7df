//! Video transcript lookup

use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::debug;
use url::Url;

use brew_core::{Error, Result};

/// Anything that can fetch English captions for a video id
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// `Ok(None)` when the video has no usable captions
    async fn fetch(&self, video_id: &str) -> Result<Option<String>>;
}

/// Video id from a watch URL, a short link, or a bare id
pub fn video_id(source: &str) -> String {
    if let Ok(parsed) = Url::parse(source) {
        if let Some((_, v)) = parsed.query_pairs().find(|(k, _)| k == "v") {
            return v.into_owned();
        }
        if let Some(last) = parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        {
            return last.to_string();
        }
    }

    if let Some((_, rest)) = source.split_once("watch?v=") {
        return rest.split('&').next().unwrap_or(rest).to_string();
    }
    let tail = source.rsplit('/').next().unwrap_or(source);
    tail.split(['?', '&']).next().unwrap_or(tail).to_string()
}

/// `https://youtu.be/<id>`
pub fn canonical_youtube(source: &str) -> String {
    format!("https://youtu.be/{}", video_id(source))
}

const LANGUAGES: [&str; 2] = ["en", "en-US"];

/// Captions from the public timed-text endpoint
pub struct TimedTextTranscripts {
    client: reqwest::Client,
    base_url: String,
}

impl TimedTextTranscripts {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: "https://video.google.com/timedtext".to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Join the `<text>` cues of a timed-text document
pub fn parse_timed_text(xml: &str) -> String {
    let fragment = Html::parse_fragment(xml);
    let Ok(selector) = Selector::parse("text") else {
        return String::new();
    };
    fragment
        .select(&selector)
        .map(|cue| cue.text().collect::<String>())
        .map(|cue| cue.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|cue| !cue.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl TranscriptSource for TimedTextTranscripts {
    async fn fetch(&self, video_id: &str) -> Result<Option<String>> {
        for lang in LANGUAGES {
            let response = self
                .client
                .get(&self.base_url)
                .query(&[("lang", lang), ("v", video_id)])
                .send()
                .await
                .map_err(|e| Error::Network(e.to_string()))?;

            if !response.status().is_success() {
                debug!(video_id, lang, status = %response.status(), "No captions");
                continue;
            }

            let body = response
                .text()
                .await
                .map_err(|e| Error::Network(e.to_string()))?;
            let text = parse_timed_text(&body);
            if !text.is_empty() {
                return Ok(Some(text));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_id_forms() {
        assert_eq!(video_id("https://www.youtube.com/watch?v=abc123&t=30s"), "abc123");
        assert_eq!(video_id("https://youtu.be/abc123?si=xyz"), "abc123");
        assert_eq!(video_id("https://www.youtube.com/embed/abc123/"), "abc123");
        assert_eq!(video_id("abc123"), "abc123");
        assert_eq!(video_id("youtube.com/watch?v=abc123&list=x"), "abc123");
    }

    #[test]
    fn test_canonical_url() {
        assert_eq!(
            canonical_youtube("https://www.youtube.com/watch?v=J4Q1wuy8Z5k"),
            "https://youtu.be/J4Q1wuy8Z5k"
        );
    }

    #[test]
    fn test_parse_timed_text_decodes_entities() {
        let xml = r#"<?xml version="1.0"?><transcript><text start="0" dur="2">Dial in   your</text><text start="2" dur="1">grind &amp; dose</text></transcript>"#;
        assert_eq!(parse_timed_text(xml), "Dial in your grind & dose");
    }
}

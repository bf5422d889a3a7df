//! Offline check that every manifest row can be loaded

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use brew_core::{Error, Result};

use super::loaders::USER_AGENT;
use super::manifest::{read_manifest, ManifestRow};
use super::transcript::{video_id, TranscriptSource};

const WEB_TIMEOUT: Duration = Duration::from_secs(12);

/// Outcome for one row
#[derive(Debug, Clone, PartialEq)]
pub struct RowCheck {
    pub kind: String,
    pub title: String,
    pub location: String,
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub manifest: PathBuf,
    pub checks: Vec<RowCheck>,
}

impl ValidationReport {
    pub fn failures(&self) -> impl Iterator<Item = &RowCheck> {
        self.checks.iter().filter(|c| !c.ok)
    }

    /// `(type, ok, total)` with pdf, web, youtube first, then other types in
    /// the order they appear
    pub fn summary(&self) -> Vec<(String, usize, usize)> {
        let mut totals: Vec<(String, usize, usize)> = ["pdf", "web", "youtube"]
            .iter()
            .map(|t| (t.to_string(), 0, 0))
            .collect();
        for check in &self.checks {
            let index = match totals.iter().position(|(t, _, _)| *t == check.kind) {
                Some(i) => i,
                None => {
                    totals.push((check.kind.clone(), 0, 0));
                    totals.len() - 1
                }
            };
            totals[index].2 += 1;
            if check.ok {
                totals[index].1 += 1;
            }
        }
        totals.retain(|(_, _, total)| *total > 0);
        totals
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Validating {} rows from {} ...\n",
            self.checks.len(),
            self.manifest.display()
        );
        for c in &self.checks {
            let _ = writeln!(
                out,
                "[{}] {:7} | {} -> {}",
                if c.ok { "OK" } else { "FAIL" },
                c.kind,
                c.title,
                c.message
            );
        }

        let _ = writeln!(out, "\nSummary:");
        for (kind, ok, total) in self.summary() {
            let _ = writeln!(out, "  {:7}: {}/{} OK", kind, ok, total);
        }

        let failures: Vec<_> = self.failures().collect();
        if !failures.is_empty() {
            let _ = writeln!(out, "\nFailures to review:");
            for c in failures {
                let _ = writeln!(
                    out,
                    "  - {:7} | {} | {} | {}",
                    c.kind, c.title, c.location, c.message
                );
            }
        }
        out
    }
}

pub struct SourceValidator {
    http: reqwest::Client,
    transcripts: Arc<dyn TranscriptSource>,
    raw_dir: PathBuf,
}

impl SourceValidator {
    pub fn new(transcripts: Arc<dyn TranscriptSource>, raw_dir: impl Into<PathBuf>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(WEB_TIMEOUT)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;
        Ok(Self {
            http,
            transcripts,
            raw_dir: raw_dir.into(),
        })
    }

    /// Check every row of the manifest. A missing manifest is an error.
    pub async fn run(&self, manifest: &Path) -> Result<ValidationReport> {
        let rows = read_manifest(manifest)?;
        let mut checks = Vec::with_capacity(rows.len());
        for row in &rows {
            checks.push(self.check_row(row).await);
        }
        Ok(ValidationReport {
            manifest: manifest.to_path_buf(),
            checks,
        })
    }

    pub async fn check_row(&self, row: &ManifestRow) -> RowCheck {
        let (ok, message) = match row.kind.as_str() {
            "pdf" => check_pdf(&row.location).await,
            "web" => self.check_web(&row.location).await,
            "youtube" => self.check_youtube(&row.location).await,
            other => (false, format!("unsupported-type: {}", other)),
        };
        debug!(kind = %row.kind, location = %row.location, ok, "Checked source");
        RowCheck {
            kind: row.kind.clone(),
            title: row.title().unwrap_or("(untitled)").to_string(),
            location: row.location.clone(),
            ok,
            message,
        }
    }

    async fn check_web(&self, url: &str) -> (bool, String) {
        let response = match self.http.get(url).send().await {
            Ok(r) => r,
            Err(e) => return (false, format!("req-failed: {}", e)),
        };
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let ok = status.is_success() && !body.trim().is_empty();
        (ok, format!("HTTP {}", status.as_u16()))
    }

    async fn check_youtube(&self, location: &str) -> (bool, String) {
        let local = Path::new(location);
        if local
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
        {
            return if non_empty_file(local) {
                (true, format!("local-transcript {}", file_name(local)))
            } else {
                (false, "local-transcript-missing-or-empty".to_string())
            };
        }

        let id = video_id(location);
        let lookup_error = match self.transcripts.fetch(&id).await {
            Ok(Some(text)) if !text.trim().is_empty() => {
                return (true, "transcript-available".to_string());
            }
            Ok(_) => None,
            Err(e) => Some(e),
        };

        let fallback = self.raw_dir.join(format!("{}.txt", id));
        if non_empty_file(&fallback) {
            return (true, format!("fallback {}", file_name(&fallback)));
        }
        match lookup_error {
            Some(e) => (false, format!("yt-error: {}", e)),
            None => (false, "no-transcript-no-fallback".to_string()),
        }
    }
}

async fn check_pdf(location: &str) -> (bool, String) {
    let path = PathBuf::from(location);
    if !path.exists() {
        return (false, "missing".to_string());
    }
    let is_pdf = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        return (false, "not a .pdf".to_string());
    }
    match tokio::task::spawn_blocking(move || pdf_extract::extract_text_by_pages(&path)).await {
        Ok(Ok(_)) => (true, "ok".to_string()),
        Ok(Err(e)) => (false, format!("read-failed: {}", e)),
        Err(e) => (false, format!("read-failed: {}", e)),
    }
}

fn non_empty_file(path: &Path) -> bool {
    std::fs::metadata(path).is_ok_and(|m| m.is_file() && m.len() > 0)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

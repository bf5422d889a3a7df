//! Source manifest (`sources.csv`)

use std::path::Path;

use brew_core::{Error, Metadata, Result};

/// One manifest row. `kind` is the trimmed, lowercased `type` column and
/// `location` the trimmed `url_or_path` column; `columns` keeps every cell.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestRow {
    pub kind: String,
    pub location: String,
    pub columns: Metadata,
}

impl ManifestRow {
    pub fn title(&self) -> Option<&str> {
        self.columns
            .get("title")
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
    }
}

const REQUIRED_COLUMNS: [&str; 2] = ["type", "url_or_path"];

/// Read every row of the manifest at `path`
pub fn read_manifest(path: &Path) -> Result<Vec<ManifestRow>> {
    if !path.exists() {
        return Err(Error::Manifest(format!("CSV not found: {}", path.display())));
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_path(path)
        .map_err(|e| Error::Manifest(format!("{}: {}", path.display(), e)))?;

    let headers = reader
        .headers()
        .map_err(|e| Error::Manifest(e.to_string()))?
        .clone();

    for required in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == required) {
            return Err(Error::Manifest(format!(
                "{} is missing the `{}` column",
                path.display(),
                required
            )));
        }
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| Error::Manifest(e.to_string()))?;
        let columns: Metadata = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.to_string(), v.to_string()))
            .collect();

        let cell = |name: &str| columns.get(name).map(|v| v.trim().to_string()).unwrap_or_default();
        let kind = cell("type").to_lowercase();
        let location = cell("url_or_path");
        rows.push(ManifestRow {
            kind,
            location,
            columns,
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn manifest(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_reads_rows_and_normalizes_type() {
        let file = manifest(
            "type,url_or_path,title,pillar\n PDF , docs/sca.pdf ,SCA Handbook,espresso\nweb,https://example.com,,\n",
        );
        let rows = read_manifest(file.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].kind, "pdf");
        assert_eq!(rows[0].location, "docs/sca.pdf");
        assert_eq!(rows[0].title(), Some("SCA Handbook"));
        assert_eq!(rows[0].columns.get("pillar").map(String::as_str), Some("espresso"));
        assert_eq!(rows[1].title(), None);
    }

    #[test]
    fn test_missing_file_is_manifest_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_manifest(&dir.path().join("sources.csv")).unwrap_err();
        assert!(matches!(err, Error::Manifest(_)));
        assert!(err.to_string().contains("CSV not found"));
    }

    #[test]
    fn test_missing_required_column() {
        let file = manifest("kind,url_or_path\npdf,a.pdf\n");
        let err = read_manifest(file.path()).unwrap_err();
        assert!(err.to_string().contains("`type`"));
    }
}

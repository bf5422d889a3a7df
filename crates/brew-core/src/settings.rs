//! Settings file (`config.yaml`) with built-in defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::Result;

/// Default location of the settings file
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Runtime settings. Every key is optional in the file; missing keys keep
/// their default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub llm_model: String,
    pub embedding_model: String,
    pub persist_directory: PathBuf,
    pub retrieval_k: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub sources_csv: PathBuf,
    pub raw_transcript_dir: PathBuf,
    pub temperature: f32,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm_model: "gpt-4o-mini".to_string(),
            embedding_model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            persist_directory: PathBuf::from("./chroma_db"),
            retrieval_k: 3,
            chunk_size: 1000,
            chunk_overlap: 200,
            sources_csv: PathBuf::from("data/sources.csv"),
            raw_transcript_dir: PathBuf::from("data/raw"),
            temperature: 0.2,
            request_timeout_secs: 60,
            max_retries: 2,
        }
    }
}

impl Settings {
    /// Load settings from a YAML file, falling back to defaults when the
    /// file does not exist. An empty file also yields defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "settings file not found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        Self::from_yaml(&raw)
    }

    /// Parse settings from YAML text
    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Location of the persisted index file inside `persist_directory`
    pub fn index_path(&self) -> PathBuf {
        self.persist_directory.join("index.json")
    }

    /// Whether the offline hashed embedder is selected
    pub fn uses_hash_embedder(&self) -> bool {
        self.embedding_model.starts_with("hash")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(dir.path().join("absent.yaml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.retrieval_k, 3);
        assert_eq!(settings.llm_model, "gpt-4o-mini");
    }

    #[test]
    fn test_partial_file_overrides_only_present_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "retrieval_k: 5\nllm_model: gpt-4o").unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.retrieval_k, 5);
        assert_eq!(settings.llm_model, "gpt-4o");
        assert_eq!(settings.chunk_size, 1000);
        assert_eq!(settings.chunk_overlap, 200);
        assert_eq!(settings.persist_directory, PathBuf::from("./chroma_db"));
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        assert_eq!(Settings::from_yaml("  \n").unwrap(), Settings::default());
    }

    #[test]
    fn test_wrong_type_is_a_configuration_error() {
        let err = Settings::from_yaml("retrieval_k: many").unwrap_err();
        assert!(matches!(err, crate::Error::Configuration(_)));
    }

    #[test]
    fn test_index_path_and_embedder_selection() {
        let settings = Settings {
            persist_directory: PathBuf::from("/tmp/db"),
            embedding_model: "hash-384".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.index_path(), PathBuf::from("/tmp/db/index.json"));
        assert!(settings.uses_hash_embedder());
        assert!(!Settings::default().uses_hash_embedder());
    }
}

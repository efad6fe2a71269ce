use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::model::dish::DedupKey;
use crate::model::language::LanguageCode;

fn default_base_url() -> String {
    "https://www.studierendenwerk-muenchen-oberbayern.de/mensa/speiseplan".to_string()
}

fn default_openmensa_url() -> String {
    "https://openmensa.org/api/v2".to_string()
}

fn default_stwno_url() -> String {
    "https://www.stwno.de/infomax/daten-extern/csv".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_days_ahead() -> u32 {
    14
}

fn default_workers() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_source_language() -> LanguageCode {
    LanguageCode::De
}

fn default_batch_size() -> usize {
    50
}

fn default_translation_concurrency() -> usize {
    2
}

fn default_retention_days() -> u32 {
    1
}

/// Settings of a pipeline run, read from `eat.json`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PipelineConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_openmensa_url")]
    pub openmensa_url: String,

    #[serde(default = "default_stwno_url")]
    pub stwno_url: String,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_days_ahead")]
    pub days_ahead: u32,

    #[serde(default)]
    pub include_weekends: bool,

    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub languages: Vec<LanguageCode>,

    #[serde(default = "default_source_language")]
    pub source_language: LanguageCode,

    #[serde(default = "default_batch_size")]
    pub translation_batch_size: usize,

    #[serde(default = "default_translation_concurrency")]
    pub translation_concurrency: usize,

    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    #[serde(default)]
    pub dedup_key: DedupKey,

    /// Defaults to `<output_dir>/translations.json`.
    #[serde(default)]
    pub cache_path: Option<PathBuf>,

    #[serde(default)]
    pub deepl_api_key: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            openmensa_url: default_openmensa_url(),
            stwno_url: default_stwno_url(),
            output_dir: default_output_dir(),
            days_ahead: default_days_ahead(),
            include_weekends: false,
            workers: default_workers(),
            timeout_secs: default_timeout_secs(),
            languages: Vec::new(),
            source_language: default_source_language(),
            translation_batch_size: default_batch_size(),
            translation_concurrency: default_translation_concurrency(),
            retention_days: default_retention_days(),
            dedup_key: DedupKey::default(),
            cache_path: None,
            deepl_api_key: None,
        }
    }
}

impl PipelineConfig {
    pub fn cache_path(&self) -> PathBuf {
        self.cache_path
            .clone()
            .unwrap_or_else(|| self.output_dir.join("translations.json"))
    }
}

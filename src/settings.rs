use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::words::ProvenanceMode;

/// Runtime configuration, passed explicitly to the client and pipeline.
#[derive(Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_classifier_model")]
    pub classifier_model: String,
    #[serde(default = "default_gpt4o")]
    pub normalizer_model: String,
    #[serde(default = "default_gpt4o")]
    pub generator_model: String,
    #[serde(default = "default_similar_model")]
    pub similar_model: String,
    #[serde(default = "default_classifier_max_tokens")]
    pub classifier_max_tokens: u32,
    #[serde(default = "default_generator_max_tokens")]
    pub generator_max_tokens: u32,
    #[serde(default = "default_similar_max_tokens")]
    pub similar_max_tokens: u32,
    #[serde(default = "default_generator_temperature")]
    pub generator_temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub normalizer_timeout_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub generator_timeout_secs: u64,
    #[serde(default = "default_difficulty_ceiling")]
    pub difficulty_ceiling: f64,
    #[serde(default = "default_ceiling_step")]
    pub ceiling_step: f64,
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    #[serde(default = "default_keyword_budget")]
    pub keyword_budget: usize,
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,
    /// How category tags are carried onto word-frequency rows.
    #[serde(default)]
    pub frequency_provenance: ProvenanceMode,
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_classifier_model() -> String {
    "gpt-4".to_string()
}

fn default_gpt4o() -> String {
    "gpt-4o".to_string()
}

fn default_similar_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_classifier_max_tokens() -> u32 {
    150
}

fn default_generator_max_tokens() -> u32 {
    539
}

fn default_similar_max_tokens() -> u32 {
    2000
}

fn default_generator_temperature() -> f32 {
    0.7
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_difficulty_ceiling() -> f64 {
    30.0
}

fn default_ceiling_step() -> f64 {
    10.0
}

fn default_max_retries() -> usize {
    3
}

fn default_keyword_budget() -> usize {
    100
}

fn default_export_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            api_key: None,
            api_base: default_api_base(),
            classifier_model: default_classifier_model(),
            normalizer_model: default_gpt4o(),
            generator_model: default_gpt4o(),
            similar_model: default_similar_model(),
            classifier_max_tokens: default_classifier_max_tokens(),
            generator_max_tokens: default_generator_max_tokens(),
            similar_max_tokens: default_similar_max_tokens(),
            generator_temperature: default_generator_temperature(),
            normalizer_timeout_secs: default_timeout_secs(),
            generator_timeout_secs: default_timeout_secs(),
            difficulty_ceiling: default_difficulty_ceiling(),
            ceiling_step: default_ceiling_step(),
            max_retries: default_max_retries(),
            keyword_budget: default_keyword_budget(),
            export_dir: default_export_dir(),
            frequency_provenance: ProvenanceMode::default(),
        }
    }
}

impl Settings {
    /// Layer `aso.toml` (or `file`) under `ASO_*` environment variables.
    /// `OPENAI_API_KEY` fills in a missing key.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let file_source = match file {
            Some(p) => File::from(p).required(true),
            None => File::with_name("aso").required(false),
        };
        let mut settings: Settings = Config::builder()
            .add_source(file_source)
            .add_source(Environment::with_prefix("ASO").try_parsing(true))
            .build()?
            .try_deserialize()?;

        if settings.api_key.as_deref().map_or(true, str::is_empty) {
            settings.api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());
        }
        Ok(settings)
    }

    pub fn normalizer_timeout(&self) -> Duration {
        Duration::from_secs(self.normalizer_timeout_secs)
    }

    pub fn generator_timeout(&self) -> Duration {
        Duration::from_secs(self.generator_timeout_secs)
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .field("classifier_model", &self.classifier_model)
            .field("normalizer_model", &self.normalizer_model)
            .field("generator_model", &self.generator_model)
            .field("similar_model", &self.similar_model)
            .field("difficulty_ceiling", &self.difficulty_ceiling)
            .field("ceiling_step", &self.ceiling_step)
            .field("max_retries", &self.max_retries)
            .field("keyword_budget", &self.keyword_budget)
            .field("export_dir", &self.export_dir)
            .field("frequency_provenance", &self.frequency_provenance)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_overrides_defaults() {
        let mut f = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(f, "generator_model = \"gpt-4o-mini\"\nmax_retries = 5\nkeyword_budget = 80\nfrequency_provenance = \"table-wide\"").unwrap();
        let s = Settings::load(Some(f.path())).unwrap();
        assert_eq!(s.generator_model, "gpt-4o-mini");
        assert_eq!(s.max_retries, 5);
        assert_eq!(s.keyword_budget, 80);
        assert_eq!(s.classifier_model, "gpt-4");
        assert_eq!(s.difficulty_ceiling, 30.0);
        assert_eq!(s.frequency_provenance, ProvenanceMode::TableWide);
        assert_eq!(s.similar_model, "gpt-4o-mini");
        assert_eq!(s.similar_max_tokens, 2000);
    }

    #[test]
    fn debug_redacts_key() {
        let s = Settings { api_key: Some("sk-secret".into()), ..Settings::default() };
        let shown = format!("{:?}", s);
        assert!(!shown.contains("sk-secret"));
        assert!(shown.contains("<redacted>"));
    }
}

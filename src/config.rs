//! Layered configuration
//!
//! Defaults, then the global config file (`<config dir>/iprep/config.toml`)
//! or an explicit `--config` path, then `IPREP_*` environment overrides,
//! merged in that order.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{IprepError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
}

impl Config {
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("IPREP_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = explicit {
            if let Some(patch) = Self::load_patch(&path)? {
                config.merge_patch(patch);
            } else {
                return Err(IprepError::MissingConfig(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
        } else if let Some(global) = Self::load_global()? {
            config.merge_patch(global);
        }

        config.apply_env_overrides()?;
        Ok(config)
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        let Some(dir) = dirs::config_dir() else {
            return Ok(None);
        };
        Self::load_patch(&dir.join("iprep/config.toml"))
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|err| IprepError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| IprepError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.corpus {
            self.corpus.merge(patch);
        }
        if let Some(patch) = patch.index {
            self.index.merge(patch);
        }
        if let Some(patch) = patch.sampling {
            self.sampling.merge(patch);
        }
        if let Some(patch) = patch.generator {
            self.generator.merge(patch);
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(value) = env_string("IPREP_CORPUS_DATA_DIR") {
            self.corpus.data_dir = PathBuf::from(value);
        }
        if let Some(value) = env_string("IPREP_INDEX_DB_PATH") {
            self.index.db_path = PathBuf::from(value);
        }
        if let Some(value) = env_string("IPREP_INDEX_COLLECTION") {
            self.index.collection = value;
        }
        if let Some(value) = env_usize("IPREP_INDEX_DIMS")? {
            self.index.dims = value;
        }
        if let Some(value) = env_usize("IPREP_INDEX_TOP_K")? {
            self.index.top_k = value;
        }
        if let Some(value) = env_usize("IPREP_SAMPLING_QUESTIONS")? {
            self.sampling.sample_questions = value;
        }
        if let Some(values) = env_list("IPREP_SAMPLING_SKILLS") {
            self.sampling.skills = values;
        }
        if let Some(value) = env_string("IPREP_GENERATOR_API_BASE") {
            self.generator.api_base = value;
        }
        if let Some(value) = env_string("IPREP_GENERATOR_MODEL") {
            self.generator.model = value;
        }
        if let Some(value) = env_string("IPREP_GENERATOR_API_KEY_ENV") {
            self.generator.api_key_env = value;
        }
        if let Some(value) = env_u64("IPREP_GENERATOR_TIMEOUT_SECONDS")? {
            self.generator.timeout_seconds = value;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Directory holding the `*.csv` corpus files.
    #[serde(default)]
    pub data_dir: PathBuf,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

impl CorpusConfig {
    fn merge(&mut self, patch: CorpusPatch) {
        if let Some(value) = patch.data_dir {
            self.data_dir = value;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default)]
    pub db_path: PathBuf,
    #[serde(default)]
    pub collection: String,
    #[serde(default)]
    pub dims: usize,
    #[serde(default)]
    pub top_k: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("index.db"),
            collection: "question_embeddings_v2".to_string(),
            dims: 384,
            top_k: 10,
        }
    }
}

impl IndexConfig {
    fn merge(&mut self, patch: IndexPatch) {
        if let Some(value) = patch.db_path {
            self.db_path = value;
        }
        if let Some(value) = patch.collection {
            self.collection = value;
        }
        if let Some(value) = patch.dims {
            self.dims = value;
        }
        if let Some(value) = patch.top_k {
            self.top_k = value;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Sample question texts shown to the generator per skill.
    #[serde(default)]
    pub sample_questions: usize,
    /// Skill categories a questionnaire covers, one entry each.
    #[serde(default)]
    pub skills: Vec<String>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            sample_questions: 5,
            skills: vec![
                "social".to_string(),
                "speaking".to_string(),
                "management".to_string(),
                "technical".to_string(),
            ],
        }
    }
}

impl SamplingConfig {
    fn merge(&mut self, patch: SamplingPatch) {
        if let Some(value) = patch.sample_questions {
            self.sample_questions = value;
        }
        if let Some(values) = patch.skills {
            self.skills = values;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub api_base: String,
    #[serde(default)]
    pub model: String,
    /// Name of the environment variable holding the API key.
    #[serde(default)]
    pub api_key_env: String,
    #[serde(default)]
    pub timeout_seconds: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_base: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-pro".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_seconds: 60,
        }
    }
}

impl GeneratorConfig {
    fn merge(&mut self, patch: GeneratorPatch) {
        if let Some(value) = patch.api_base {
            self.api_base = value;
        }
        if let Some(value) = patch.model {
            self.model = value;
        }
        if let Some(value) = patch.api_key_env {
            self.api_key_env = value;
        }
        if let Some(value) = patch.timeout_seconds {
            self.timeout_seconds = value;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    pub corpus: Option<CorpusPatch>,
    pub index: Option<IndexPatch>,
    pub sampling: Option<SamplingPatch>,
    pub generator: Option<GeneratorPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CorpusPatch {
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct IndexPatch {
    pub db_path: Option<PathBuf>,
    pub collection: Option<String>,
    pub dims: Option<usize>,
    pub top_k: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SamplingPatch {
    pub sample_questions: Option<usize>,
    pub skills: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct GeneratorPatch {
    pub api_base: Option<String>,
    pub model: Option<String>,
    pub api_key_env: Option<String>,
    pub timeout_seconds: Option<u64>,
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn env_usize(key: &str) -> Result<Option<usize>> {
    match env_string(key) {
        Some(value) => value
            .parse::<usize>()
            .map(Some)
            .map_err(|err| IprepError::Config(format!("invalid {key} value {value}: {err}"))),
        None => Ok(None),
    }
}

fn env_u64(key: &str) -> Result<Option<u64>> {
    match env_string(key) {
        Some(value) => value
            .parse::<u64>()
            .map(Some)
            .map_err(|err| IprepError::Config(format!("invalid {key} value {value}: {err}"))),
        None => Ok(None),
    }
}

fn env_list(key: &str) -> Option<Vec<String>> {
    env_string(key).map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_are_sensible() {
        let config = Config::default();
        assert_eq!(config.index.collection, "question_embeddings_v2");
        assert_eq!(config.index.dims, 384);
        assert_eq!(config.index.top_k, 10);
        assert_eq!(config.sampling.sample_questions, 5);
        assert_eq!(config.sampling.skills.len(), 4);
        assert_eq!(config.generator.api_key_env, "GEMINI_API_KEY");
    }

    #[test]
    fn serialization_roundtrip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.index.collection, config.index.collection);
        assert_eq!(back.sampling.skills, config.sampling.skills);
    }

    #[test]
    fn merge_patch_updates_only_present_fields() {
        let mut config = Config::default();
        config.merge_patch(ConfigPatch {
            index: Some(IndexPatch {
                dims: Some(64),
                ..Default::default()
            }),
            ..Default::default()
        });
        assert_eq!(config.index.dims, 64);
        assert_eq!(config.index.top_k, 10);
        assert_eq!(config.index.collection, "question_embeddings_v2");
    }

    #[test]
    fn load_patch_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[corpus]
data_dir = "/srv/corpus"

[sampling]
sample_questions = 3
skills = ["technical"]
"#,
        )
        .unwrap();

        let patch = Config::load_patch(&path).unwrap().unwrap();
        let mut config = Config::default();
        config.merge_patch(patch);
        assert_eq!(config.corpus.data_dir, PathBuf::from("/srv/corpus"));
        assert_eq!(config.sampling.sample_questions, 3);
        assert_eq!(config.sampling.skills, vec!["technical"]);
    }

    #[test]
    fn load_patch_missing_file_is_none() {
        assert!(
            Config::load_patch(Path::new("/nonexistent/iprep.toml"))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn load_patch_invalid_toml_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "not valid [[[").unwrap();
        assert!(Config::load_patch(&path).is_err());
    }

    #[test]
    fn explicit_missing_config_path_is_an_error() {
        let err = Config::load(Some(Path::new("/nonexistent/iprep.toml"))).unwrap_err();
        assert!(matches!(err, IprepError::MissingConfig(_)));
    }
}

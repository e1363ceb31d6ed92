//! Configuration management for docqa.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config file (.docqa/config.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! Later sources win. Every tunable of the retrieval and generation pipeline
//! lives here so nothing downstream hard-codes a constant.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::logging::LogFormat;

/// Text-generation providers the factory can build.
pub const KNOWN_LLM_PROVIDERS: [&str; 1] = ["ollama"];

/// Embedding providers the factory can build.
pub const KNOWN_EMBEDDING_PROVIDERS: [&str; 2] = ["ollama", "trigram"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .docqa/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Corpus file, relative paths resolve against the workspace
    pub corpus_path: PathBuf,

    /// Text-generation backend
    pub llm: LlmSettings,

    /// Embedding backend
    pub embedding: EmbeddingSettings,

    /// Chunking, ranking and gating parameters
    pub retrieval: RetrievalSettings,

    /// Prompt budget and sampling parameters
    pub generation: GenerationSettings,

    /// Output sanitizing limits
    pub cleaner: CleanerSettings,

    /// Prompt template selection
    pub prompt: PromptSettings,

    /// Interactive session settings
    pub session: SessionSettings,

    /// Log level override
    pub log_level: Option<String>,

    /// Log line format
    pub log_format: LogFormat,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Text-generation backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LlmSettings {
    pub provider: String,
    pub model: String,
    pub endpoint: Option<String>,
    /// HTTP request timeout in seconds
    pub timeout: Option<u64>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            endpoint: None,
            timeout: None,
        }
    }
}

/// Embedding backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbeddingSettings {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    pub endpoint: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            endpoint: None,
        }
    }
}

/// How the chunker cuts text into atomic units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Segmentation {
    /// Unicode sentence boundaries
    #[default]
    Sentence,
    /// Fixed-width character slices
    FixedWidth,
}

/// Retrieval parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetrievalSettings {
    pub top_k: usize,
    /// Passage size target in characters
    pub target_chunk_size: usize,
    pub max_passages_per_document: usize,
    pub confidence_threshold: f32,
    pub segmentation: Segmentation,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 3,
            target_chunk_size: 1000,
            max_passages_per_document: 5,
            confidence_threshold: 0.25,
            segmentation: Segmentation::Sentence,
        }
    }
}

/// Generation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerationSettings {
    /// Prompt cap in characters; longer prompts keep their tail
    pub max_prompt_length: usize,
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub repetition_penalty: f32,
    pub stop_sequences: Vec<String>,
    /// Return prompt + continuation instead of the continuation alone
    pub echo_prompt: bool,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_prompt_length: 16_000,
            max_new_tokens: 500,
            temperature: 0.7,
            top_p: 0.9,
            repetition_penalty: 1.1,
            stop_sequences: vec![
                "<|user|>".to_string(),
                "<|im_end|>".to_string(),
                "\nQuestion:".to_string(),
            ],
            echo_prompt: false,
        }
    }
}

/// Output sanitizing limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CleanerSettings {
    pub max_sentences: usize,
    pub max_chars: usize,
    /// Role/answer markers; text after the last one is kept
    pub markers: Vec<String>,
}

impl Default for CleanerSettings {
    fn default() -> Self {
        Self {
            max_sentences: 10,
            max_chars: 1000,
            markers: vec![
                "<|assistant|>".to_string(),
                "<|im_start|>assistant".to_string(),
                "### Response:".to_string(),
                "Assistant:".to_string(),
                "Answer:".to_string(),
            ],
        }
    }
}

/// Prompt template selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PromptSettings {
    /// Prompt definition id under .docqa/prompts/; built-in template when unset
    pub id: Option<String>,
}

/// Interactive session settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionSettings {
    pub max_display_chars: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_display_chars: 2000,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmSettings>,
    embedding: Option<EmbeddingSettings>,
    retrieval: Option<RetrievalSettings>,
    generation: Option<GenerationSettings>,
    cleaner: Option<CleanerSettings>,
    prompt: Option<PromptSettings>,
    session: Option<SessionSettings>,
    corpus: Option<CorpusConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CorpusConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    format: Option<LogFormat>,
}

/// Command-line overrides, applied last.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub corpus: Option<PathBuf>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub embedding_provider: Option<String>,
    pub embedding_model: Option<String>,
    pub top_k: Option<usize>,
    pub threshold: Option<f32>,
    pub chunk_size: Option<usize>,
    pub log_level: Option<String>,
    pub verbose: bool,
    pub no_color: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            corpus_path: PathBuf::from("data.json"),
            llm: LlmSettings::default(),
            embedding: EmbeddingSettings::default(),
            retrieval: RetrievalSettings::default(),
            generation: GenerationSettings::default(),
            cleaner: CleanerSettings::default(),
            prompt: PromptSettings::default(),
            session: SessionSettings::default(),
            log_level: None,
            log_format: LogFormat::Pretty,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML file and the environment.
    ///
    /// Environment variables:
    /// - `DOCQA_WORKSPACE`: Override workspace path
    /// - `DOCQA_CONFIG`: Path to config file
    /// - `DOCQA_CORPUS`: Corpus file
    /// - `DOCQA_PROVIDER` / `DOCQA_MODEL`: Text-generation backend
    /// - `DOCQA_EMBEDDING_PROVIDER` / `DOCQA_EMBEDDING_MODEL`: Embedding backend
    /// - `OLLAMA_URL`: Endpoint for Ollama backends without an explicit endpoint
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// `workspace` and `config_file` come from the command line and take
    /// precedence over the environment, since they decide which file is read.
    pub fn load(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace.or_else(|| env_path("DOCQA_WORKSPACE")) {
            config.workspace = workspace;
        }

        config.config_file = config_file.or_else(|| env_path("DOCQA_CONFIG"));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.docqa_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        config.apply_env();

        Ok(config)
    }

    /// Environment variables override YAML config.
    fn apply_env(&mut self) {
        if let Some(corpus) = env_path("DOCQA_CORPUS") {
            self.corpus_path = corpus;
        }

        if let Ok(provider) = std::env::var("DOCQA_PROVIDER") {
            self.llm.provider = provider;
        }

        if let Ok(model) = std::env::var("DOCQA_MODEL") {
            self.llm.model = model;
        }

        if let Ok(provider) = std::env::var("DOCQA_EMBEDDING_PROVIDER") {
            self.embedding.provider = provider;
        }

        if let Ok(model) = std::env::var("DOCQA_EMBEDDING_MODEL") {
            self.embedding.model = model;
        }

        if let Ok(url) = std::env::var("OLLAMA_URL") {
            if self.llm.endpoint.is_none() {
                self.llm.endpoint = Some(url.clone());
            }
            if self.embedding.endpoint.is_none() {
                self.embedding.endpoint = Some(url);
            }
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            self.no_color = true;
        }
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    fn merge_yaml_str(&self, contents: &str) -> Result<Self, serde_yaml::Error> {
        let config_file: ConfigFile = if contents.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(contents)?
        };

        let mut result = self.clone();

        if let Some(llm) = config_file.llm {
            result.llm = llm;
        }
        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }
        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }
        if let Some(generation) = config_file.generation {
            result.generation = generation;
        }
        if let Some(cleaner) = config_file.cleaner {
            result.cleaner = cleaner;
        }
        if let Some(prompt) = config_file.prompt {
            result.prompt = prompt;
        }
        if let Some(session) = config_file.session {
            result.session = session;
        }

        if let Some(path) = config_file.corpus.and_then(|c| c.path) {
            result.corpus_path = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(format) = logging.format {
                result.log_format = format;
            }
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables and
    /// the config file.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(corpus) = overrides.corpus {
            self.corpus_path = corpus;
        }
        if let Some(provider) = overrides.provider {
            self.llm.provider = provider;
        }
        if let Some(model) = overrides.model {
            self.llm.model = model;
        }
        if let Some(provider) = overrides.embedding_provider {
            self.embedding.provider = provider;
        }
        if let Some(model) = overrides.embedding_model {
            self.embedding.model = model;
        }
        if let Some(top_k) = overrides.top_k {
            self.retrieval.top_k = top_k;
        }
        if let Some(threshold) = overrides.threshold {
            self.retrieval.confidence_threshold = threshold;
        }
        if let Some(chunk_size) = overrides.chunk_size {
            self.retrieval.target_chunk_size = chunk_size;
        }
        if let Some(log_level) = overrides.log_level {
            self.log_level = Some(log_level);
        }

        if overrides.verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if overrides.no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .docqa directory.
    pub fn docqa_dir(&self) -> PathBuf {
        self.workspace.join(".docqa")
    }

    /// Resolved corpus file path.
    pub fn corpus_file(&self) -> PathBuf {
        if self.corpus_path.is_absolute() {
            self.corpus_path.clone()
        } else {
            self.workspace.join(&self.corpus_path)
        }
    }

    /// Validate providers and numeric ranges before any backend is built.
    pub fn validate(&self) -> AppResult<()> {
        check_known("LLM provider", &self.llm.provider, &KNOWN_LLM_PROVIDERS)?;
        check_known(
            "embedding provider",
            &self.embedding.provider,
            &KNOWN_EMBEDDING_PROVIDERS,
        )?;

        if self.llm.model.trim().is_empty() {
            return Err(AppError::Config("LLM model name cannot be empty".to_string()));
        }
        if self.embedding.model.trim().is_empty() {
            return Err(AppError::Config(
                "Embedding model name cannot be empty".to_string(),
            ));
        }
        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "embedding.dimensions must be at least 1".to_string(),
            ));
        }

        let r = &self.retrieval;
        check_positive("retrieval.topK", r.top_k)?;
        check_positive("retrieval.targetChunkSize", r.target_chunk_size)?;
        check_positive("retrieval.maxPassagesPerDocument", r.max_passages_per_document)?;
        if !r.confidence_threshold.is_finite() || !(-1.0..=1.0).contains(&r.confidence_threshold)
        {
            return Err(AppError::Config(format!(
                "retrieval.confidenceThreshold must be within [-1, 1], got {}",
                r.confidence_threshold
            )));
        }

        let g = &self.generation;
        check_positive("generation.maxPromptLength", g.max_prompt_length)?;
        check_positive("generation.maxNewTokens", g.max_new_tokens as usize)?;
        if !(g.temperature.is_finite() && g.temperature > 0.0) {
            return Err(AppError::Config(format!(
                "generation.temperature must be positive, got {}",
                g.temperature
            )));
        }
        if !(g.top_p > 0.0 && g.top_p <= 1.0) {
            return Err(AppError::Config(format!(
                "generation.topP must be within (0, 1], got {}",
                g.top_p
            )));
        }
        if !(g.repetition_penalty.is_finite() && g.repetition_penalty > 0.0) {
            return Err(AppError::Config(format!(
                "generation.repetitionPenalty must be positive, got {}",
                g.repetition_penalty
            )));
        }

        check_positive("cleaner.maxSentences", self.cleaner.max_sentences)?;
        check_positive("cleaner.maxChars", self.cleaner.max_chars)?;
        check_positive("session.maxDisplayChars", self.session.max_display_chars)?;

        Ok(())
    }
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var(var).ok().map(PathBuf::from)
}

fn check_known(what: &str, value: &str, known: &[&str]) -> AppResult<()> {
    if known.contains(&value.to_lowercase().as_str()) {
        Ok(())
    } else {
        Err(AppError::Config(format!(
            "Unknown {}: {}. Supported: {}",
            what,
            value,
            known.join(", ")
        )))
    }
}

fn check_positive(name: &str, value: usize) -> AppResult<()> {
    if value == 0 {
        return Err(AppError::Config(format!("{} must be at least 1", name)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.retrieval.max_passages_per_document, 5);
        assert_eq!(config.retrieval.confidence_threshold, 0.25);
        assert_eq!(config.cleaner.max_sentences, 10);
        assert_eq!(config.session.max_display_chars, 2000);
        assert!(!config.verbose);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge_partial_sections() {
        let yaml = r#"
retrieval:
  topK: 5
  confidenceThreshold: 0.4
generation:
  temperature: 0.2
corpus:
  path: corpus/docs.json
logging:
  level: debug
  color: false
  format: json
"#;
        let merged = AppConfig::default().merge_yaml_str(yaml).unwrap();

        assert_eq!(merged.retrieval.top_k, 5);
        assert_eq!(merged.retrieval.confidence_threshold, 0.4);
        // Unspecified fields fall back to defaults
        assert_eq!(merged.retrieval.target_chunk_size, 1000);
        assert_eq!(merged.generation.temperature, 0.2);
        assert_eq!(merged.generation.top_p, 0.9);
        assert_eq!(merged.corpus_path, PathBuf::from("corpus/docs.json"));
        assert_eq!(merged.log_level.as_deref(), Some("debug"));
        assert!(merged.no_color);
        assert_eq!(merged.log_format, LogFormat::Json);
    }

    #[test]
    fn test_merge_rejects_bad_yaml() {
        let result = AppConfig::default().merge_yaml_str("retrieval: [1, 2");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_reads_workspace_config() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(".docqa")).unwrap();
        std::fs::write(
            temp.path().join(".docqa/config.yaml"),
            "embedding:\n  provider: trigram\n  dimensions: 256\n",
        )
        .unwrap();

        let config = AppConfig::load(Some(temp.path().to_path_buf()), None).unwrap();
        assert_eq!(config.embedding.provider, "trigram");
        assert_eq!(config.embedding.dimensions, 256);
        assert_eq!(config.corpus_file(), temp.path().join("data.json"));
    }

    #[test]
    fn test_load_missing_explicit_config_file() {
        let temp = TempDir::new().unwrap();
        let result = AppConfig::load(
            Some(temp.path().to_path_buf()),
            Some(temp.path().join("nope.yaml")),
        );
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_with_overrides() {
        let overridden = AppConfig::default().with_overrides(ConfigOverrides {
            model: Some("qwen2.5".to_string()),
            top_k: Some(7),
            threshold: Some(0.5),
            verbose: true,
            ..Default::default()
        });

        assert_eq!(overridden.llm.model, "qwen2.5");
        assert_eq!(overridden.retrieval.top_k, 7);
        assert_eq!(overridden.retrieval.confidence_threshold, 0.5);
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_corpus_file_absolute_path_kept() {
        let mut config = AppConfig::default();
        config.corpus_path = PathBuf::from("/srv/corpus.json");
        assert_eq!(config.corpus_file(), PathBuf::from("/srv/corpus.json"));
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.llm.provider = "unknown".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.embedding.provider = "word2vec".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_ranges() {
        let mut config = AppConfig::default();
        config.retrieval.top_k = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.generation.top_p = 1.5;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.generation.temperature = 0.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.retrieval.confidence_threshold = f32::NAN;
        assert!(config.validate().is_err());
    }
}

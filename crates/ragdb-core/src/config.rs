//! Layered configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`__` separates nested keys, e.g. `APP_INDEX__USE_NATIVE`).
//! `expand_path` expands `~` and `${VAR}` in configured paths.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with an inline TOML document. Used by tests and tools
    /// that carry their configuration in memory.
    pub fn from_toml_str(toml: &str) -> anyhow::Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::string(toml));
        let config = Self { figment };
        config.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// The full typed settings tree, with API keys resolved from
    /// `OPENAI_API_KEY` when not set explicitly.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let mut settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract settings: {}", e))?;
        let shared_key = env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty());
        if settings.embedding.api_key.is_none() {
            settings.embedding.api_key.clone_from(&shared_key);
        }
        if settings.generation.api_key.is_none() {
            settings.generation.api_key = shared_key;
        }
        Ok(settings)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let top_k: usize = self.get("retrieval.top_k")?;
        if top_k == 0 {
            return Err(crate::error::Error::InvalidConfig("retrieval.top_k must be at least 1".into()).into());
        }
        let batch_size: usize = self.get("index.batch_size")?;
        if batch_size == 0 {
            return Err(crate::error::Error::InvalidConfig("index.batch_size must be at least 1".into()).into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub index: IndexSettings,
    pub retrieval: RetrievalSettings,
    pub embedding: EmbeddingSettings,
    pub generation: GenerationSettings,
    pub grounding: GroundingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub persist_dir: String,
    pub raw_dir: String,
    pub processed_file: String,
    pub max_chunk_len: usize,
}

impl DataSettings {
    pub fn persist_path(&self) -> PathBuf {
        expand_path(&self.persist_dir)
    }

    pub fn raw_path(&self) -> PathBuf {
        expand_path(&self.raw_dir)
    }

    pub fn processed_path(&self) -> PathBuf {
        expand_path(&self.processed_file)
    }
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            persist_dir: "models/vector_store".to_string(),
            raw_dir: "data/raw".to_string(),
            processed_file: "data/processed/processed.json".to_string(),
            max_chunk_len: 280,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub use_native: NativeMode,
    pub batch_size: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self { use_native: NativeMode::Auto, batch_size: 64 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub rerank: bool,
    pub keyword_fallback: bool,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 3, rerank: false, keyword_fallback: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "text-embedding-3-small".to_string(),
            endpoint: "https://api.openai.com/v1".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            endpoint: "https://api.openai.com/v1".to_string(),
            temperature: 0.2,
            max_tokens: 300,
            timeout_secs: 60,
        }
    }
}

/// Phrase lists used by the grounding verifier's short-circuit checks.
/// Matching is a case-insensitive substring test.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundingSettings {
    pub generation_failed_phrases: Vec<String>,
    pub no_information_phrases: Vec<String>,
}

impl Default for GroundingSettings {
    fn default() -> Self {
        let owned = |xs: &[&str]| xs.iter().map(|s| (*s).to_string()).collect();
        Self {
            generation_failed_phrases: owned(&[
                "i couldn't generate a response",
                "couldn't generate a response",
                "i apologize, but",
                "no response generated",
                "error occurred",
                "failed to generate",
                "please try again",
                "api error",
            ]),
            no_information_phrases: owned(&[
                "no information",
                "not found",
                "doesn't exist",
                "not available",
                "no data",
                "not in the provided",
                "not in the citations",
            ]),
        }
    }
}

/// Backend selection policy for the vector index.
///
/// `Off` forces the pure backend, `On` requests the native backend (falling
/// back to pure when it is not compiled in), `Auto` uses native when available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawNativeMode", into = "String")]
pub enum NativeMode {
    #[default]
    Auto,
    On,
    Off,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNativeMode {
    Flag(bool),
    Text(String),
}

impl TryFrom<RawNativeMode> for NativeMode {
    type Error = String;

    fn try_from(raw: RawNativeMode) -> Result<Self, Self::Error> {
        match raw {
            RawNativeMode::Flag(true) => Ok(Self::On),
            RawNativeMode::Flag(false) => Ok(Self::Off),
            RawNativeMode::Text(s) => s.parse(),
        }
    }
}

impl FromStr for NativeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "" => Ok(Self::Auto),
            "true" | "1" | "on" | "yes" => Ok(Self::On),
            "false" | "0" | "off" | "no" => Ok(Self::Off),
            other => Err(format!("expected auto, true or false, got '{other}'")),
        }
    }
}

impl fmt::Display for NativeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::On => "true",
            Self::Off => "false",
        })
    }
}

impl From<NativeMode> for String {
    fn from(mode: NativeMode) -> Self {
        mode.to_string()
    }
}

/// Expand `${VAR}`/`$VAR` references, then a leading `~`. Unset variables
/// leave the input untouched. The result is not canonicalized.
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let raw = input.as_ref();
    let with_vars = shellexpand::env(raw).unwrap_or(std::borrow::Cow::Borrowed(raw));
    PathBuf::from(shellexpand::tilde(&with_vars).as_ref())
}

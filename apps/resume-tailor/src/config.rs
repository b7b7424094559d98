use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

use crate::tailoring::keywords::KeywordSource;

const ENV_PREFIX: &str = "RESUME_TAILOR_";

/// Which completion backend to construct at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Ollama,
    Gemini,
    Mock,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::Ollama => "ollama",
            LlmProvider::Gemini => "gemini",
            LlmProvider::Mock => "mock",
        }
    }
}

impl FromStr for LlmProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(LlmProvider::Ollama),
            "gemini" => Ok(LlmProvider::Gemini),
            "mock" => Ok(LlmProvider::Mock),
            other => bail!("Unsupported LLM provider '{other}' (expected ollama, gemini or mock)"),
        }
    }
}

/// Application configuration loaded from `RESUME_TAILOR_*` environment variables.
/// Built once in `main` and passed by reference; core components never read the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm_provider: LlmProvider,
    pub llm_model: String,
    pub llm_base_url: Option<String>,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
    pub gemini_api_key: Option<String>,
    pub base_resume_path: PathBuf,
    pub static_sections_path: PathBuf,
    pub output_dir: PathBuf,
    pub rendercv_theme: String,
    pub max_retries: u32,
    pub keyword_source: KeywordSource,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source. Keys are unprefixed.
    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(&format!("{ENV_PREFIX}{key}")).filter(|v| !v.trim().is_empty())
        };

        let llm_provider = match var("LLM_PROVIDER") {
            Some(v) => v.parse()?,
            None => LlmProvider::Ollama,
        };

        let config = Config {
            llm_provider,
            llm_model: var("LLM_MODEL").unwrap_or_else(|| "llama3.1:8b".to_string()),
            llm_base_url: var("LLM_BASE_URL"),
            llm_temperature: parse_or(var("LLM_TEMPERATURE"), 0.3, "LLM_TEMPERATURE")?,
            llm_max_tokens: parse_or(var("LLM_MAX_TOKENS"), 4000, "LLM_MAX_TOKENS")?,
            gemini_api_key: var("GEMINI_API_KEY")
                .or_else(|| lookup("GEMINI_API_KEY").filter(|v| !v.trim().is_empty())),
            base_resume_path: var("BASE_RESUME_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("source/base_resume.yaml")),
            static_sections_path: var("STATIC_SECTIONS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("source/static_sections.yaml")),
            output_dir: var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./output")),
            rendercv_theme: var("RENDERCV_THEME")
                .unwrap_or_else(|| "engineeringresumes".to_string()),
            max_retries: parse_or(var("MAX_RETRIES"), 2, "MAX_RETRIES")?,
            keyword_source: match var("KEYWORD_SOURCE") {
                Some(v) => v.parse()?,
                None => KeywordSource::Catalog,
            },
            log_level: var("LOG_LEVEL")
                .unwrap_or_else(|| "info".to_string())
                .to_ascii_lowercase(),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        match self.llm_provider {
            LlmProvider::Gemini if self.gemini_api_key.is_none() => {
                bail!("GEMINI_API_KEY must be set when using the Gemini LLM provider.")
            }
            LlmProvider::Ollama if self.llm_base_url.is_none() => bail!(
                "{ENV_PREFIX}LLM_BASE_URL must be set when using the Ollama LLM provider."
            ),
            _ => Ok(()),
        }
    }
}

fn parse_or<T>(raw: Option<String>, default: T, key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(v) => v
            .trim()
            .parse::<T>()
            .with_context(|| format!("{ENV_PREFIX}{key} has an invalid value '{v}'")),
        None => Ok(default),
    }
}

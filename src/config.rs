use std::env;
use std::str::FromStr;

use crate::errors::AppError;

const DEFAULT_PERPLEXITY_URL: &str = "https://api.perplexity.ai/chat/completions";
const DEFAULT_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";

/// Which backend answers chat, extraction and plot prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Perplexity,
    Ollama,
}

impl FromStr for LlmProvider {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "perplexity" => Ok(LlmProvider::Perplexity),
            "ollama" => Ok(LlmProvider::Ollama),
            other => Err(AppError::Config(format!("unknown LLM_PROVIDER '{other}'"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub users: Vec<(String, String)>,
    pub llm_provider: LlmProvider,
    pub perplexity_api_key: Option<String>,
    pub perplexity_api_url: String,
    pub perplexity_model: String,
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub plot_generation: bool,
    pub allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
    pub log_level: String,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            host: get_var_or("HOST", "0.0.0.0"),
            port: parse_var("PORT", "5000")?,
            database_url: get_opt("DATABASE_URL"),
            jwt_secret: get_var("JWT_SECRET")?,
            users: parse_users(&get_var_or("AUTH_USERS", "demo:demo123"))?,
            llm_provider: get_var_or("LLM_PROVIDER", "perplexity").parse()?,
            perplexity_api_key: get_opt("PERPLEXITY_API_KEY"),
            perplexity_api_url: get_var_or("PERPLEXITY_API_URL", DEFAULT_PERPLEXITY_URL),
            perplexity_model: get_var_or("PERPLEXITY_MODEL", "sonar"),
            ollama_base_url: get_var_or("OLLAMA_API_BASE_URL", "http://localhost:11434"),
            ollama_model: get_var_or("OLLAMA_MODEL", "llama3.2"),
            plot_generation: parse_var("PLOT_GENERATION", "true")?,
            allowed_origins: split_list(&get_var_or("ALLOWED_ORIGINS", DEFAULT_ORIGINS)),
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", "26214400")?,
            log_level: get_var_or("LOG_LEVEL", "info"),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parses `user:pass,user2:pass2`. The password may itself contain `:`.
pub fn parse_users(raw: &str) -> Result<Vec<(String, String)>, AppError> {
    split_list(raw)
        .into_iter()
        .map(|entry| match entry.split_once(':') {
            Some((user, pass)) if !user.is_empty() && !pass.is_empty() => {
                Ok((user.to_string(), pass.to_string()))
            }
            _ => Err(AppError::Config(format!(
                "AUTH_USERS entries must look like user:password (got '{entry}')"
            ))),
        })
        .collect()
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn get_var(key: &str) -> Result<String, AppError> {
    get_opt(key).ok_or_else(|| AppError::Config(format!("{key} is required but not set")))
}

fn get_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_var_or(key: &str, default: &str) -> String {
    get_opt(key).unwrap_or_else(|| default.to_owned())
}

fn parse_var<T>(key: &str, default: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_var_or(key, default)
        .parse()
        .map_err(|e| AppError::Config(format!("invalid {key}: {e}")))
}

use std::env;
use std::fmt;

use eyre::{Result, WrapErr, eyre};
use url::Url;

pub const DEFAULT_API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";
pub const DEFAULT_MAX_TOKENS: u32 = 100;
pub const DEFAULT_TEMPERATURE: f64 = 0.5;
pub const DEFAULT_SYSTEM_PROMPT: &str = "Your name is AI Mentor. You are an AI Technical Expert for Artificial \
Intelligence, here to guide and assist students with their AI-related questions and concerns. Please provide \
accurate and helpful information, and always maintain a polite and professional tone.";

const API_KEY_VAR: &str = "MENTOR_API_KEY";
const API_URL_VAR: &str = "MENTOR_API_URL";
const MAX_TOKENS_VAR: &str = "MENTOR_MAX_TOKENS";
const TEMPERATURE_VAR: &str = "MENTOR_TEMPERATURE";
const SYSTEM_PROMPT_VAR: &str = "MENTOR_SYSTEM_PROMPT";

/// Values given on the command line. Each one wins over its environment
/// variable.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_url: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub system_prompt: Option<String>,
}

#[derive(Clone)]
pub struct ChatConfig {
    pub api_url: Url,
    api_key: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub system_prompt: String,
}

impl fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatConfig")
            .field("api_url", &self.api_url.as_str())
            .field("api_key", &"<redacted>")
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("system_prompt", &self.system_prompt)
            .finish()
    }
}

impl ChatConfig {
    pub fn load(overrides: ConfigOverrides) -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok(), overrides)
    }

    /// Resolves every setting through `lookup` (normally the process
    /// environment), then applies `overrides` on top.
    pub fn from_lookup<F>(lookup: F, overrides: ConfigOverrides) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_key = lookup(API_KEY_VAR).ok_or_else(|| eyre!("{} environment variable not set", API_KEY_VAR))?;

        let raw_url = overrides
            .api_url
            .or_else(|| lookup(API_URL_VAR))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = Url::parse(raw_url.trim()).wrap_err_with(|| format!("invalid {}: {}", API_URL_VAR, raw_url))?;

        let max_tokens = match overrides.max_tokens {
            Some(value) => value,
            None => match lookup(MAX_TOKENS_VAR) {
                Some(raw) => raw
                    .trim()
                    .parse::<u32>()
                    .wrap_err_with(|| format!("invalid {}: {}", MAX_TOKENS_VAR, raw))?,
                None => DEFAULT_MAX_TOKENS,
            },
        };
        if max_tokens == 0 {
            return Err(eyre!("{} must be greater than zero", MAX_TOKENS_VAR));
        }

        let temperature = match overrides.temperature {
            Some(value) => value,
            None => match lookup(TEMPERATURE_VAR) {
                Some(raw) => raw
                    .trim()
                    .parse::<f64>()
                    .wrap_err_with(|| format!("invalid {}: {}", TEMPERATURE_VAR, raw))?,
                None => DEFAULT_TEMPERATURE,
            },
        };
        if !temperature.is_finite() || !(0.0..=2.0).contains(&temperature) {
            return Err(eyre!("{} must be between 0 and 2, got {}", TEMPERATURE_VAR, temperature));
        }

        let system_prompt = overrides
            .system_prompt
            .or_else(|| lookup(SYSTEM_PROMPT_VAR))
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

        Ok(Self {
            api_url,
            api_key,
            max_tokens,
            temperature,
            system_prompt,
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

//! Application settings.
//!
//! `AppSettings` holds every runtime knob with a default, overridable from
//! the environment. Loading goes through `EnvProvider` so tests never touch
//! the real process environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::domain::GenerationOptions;
use crate::domain::generation::{DEFAULT_NUM_CTX, DEFAULT_TEMPERATURE};
use crate::env::EnvProvider;

/// Default HTTP port for the management/refactor server.
pub const DEFAULT_APP_PORT: u16 = 8000;

/// Default generation endpoint.
pub const DEFAULT_OLLAMA_URL: &str = "http://ollama:11434/api/generate";

/// Default model name.
pub const DEFAULT_MODEL_NAME: &str = "qwen2.5-coder:1.5b-base";

/// Default turn budget for the agentic loop.
pub const DEFAULT_MAX_TURNS: u32 = 5;

/// Settings errors.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// An environment variable held a value that could not be parsed.
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },

    /// A setting is outside its allowed range.
    #[error("Invalid setting {key}: {reason}")]
    OutOfRange { key: &'static str, reason: String },
}

/// Runtime settings for codeport.
#[derive(Debug, Clone, PartialEq)]
pub struct AppSettings {
    /// Bind address for the HTTP server.
    pub host: String,
    pub port: u16,

    /// Generation endpoint (full `/api/generate` URL or base URL).
    pub ollama_url: String,
    pub model_name: String,

    /// Path to the `mcp-servers.json` file.
    pub mcp_config_path: PathBuf,

    /// Use the agentic tool-calling loop instead of single-shot generation.
    pub agentic: bool,
    pub max_turns: u32,
    pub temperature: f32,
    pub num_ctx: u32,

    pub generation_timeout: Duration,
    pub tool_timeout: Duration,
    pub handshake_timeout: Duration,

    /// At most this many files are transformed concurrently.
    pub max_files_in_flight: usize,

    /// How long management endpoints wait for a new connection to become ready.
    pub connect_wait: Duration,

    /// Name of the retrieval tool consulted for background context.
    pub rag_tool: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_APP_PORT,
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            mcp_config_path: PathBuf::from("mcp-servers.json"),
            agentic: false,
            max_turns: DEFAULT_MAX_TURNS,
            temperature: DEFAULT_TEMPERATURE,
            num_ctx: DEFAULT_NUM_CTX,
            generation_timeout: Duration::from_secs(600),
            tool_timeout: Duration::from_secs(120),
            handshake_timeout: Duration::from_secs(30),
            max_files_in_flight: 1,
            connect_wait: Duration::from_secs(5),
            rag_tool: "query".to_string(),
        }
    }
}

impl AppSettings {
    /// Resolve settings from the environment, falling back to defaults.
    pub fn from_env(env: &dyn EnvProvider) -> Result<Self, SettingsError> {
        let defaults = Self::default();

        let settings = Self {
            host: env.var("APP_HOST").unwrap_or(defaults.host),
            port: parse_or(env, "APP_PORT", defaults.port)?,
            ollama_url: env.var("OLLAMA_URL").unwrap_or(defaults.ollama_url),
            model_name: env.var("MODEL_NAME").unwrap_or(defaults.model_name),
            mcp_config_path: env
                .get("MCP_CONFIG_PATH")
                .map_or(defaults.mcp_config_path, PathBuf::from),
            agentic: parse_bool_or(env, "CODEPORT_AGENTIC", defaults.agentic)?,
            max_turns: parse_or(env, "CODEPORT_MAX_TURNS", defaults.max_turns)?,
            temperature: parse_or(env, "CODEPORT_TEMPERATURE", defaults.temperature)?,
            num_ctx: parse_or(env, "CODEPORT_NUM_CTX", defaults.num_ctx)?,
            generation_timeout: secs_or(
                env,
                "CODEPORT_GENERATION_TIMEOUT_SECS",
                defaults.generation_timeout,
            )?,
            tool_timeout: secs_or(env, "CODEPORT_TOOL_TIMEOUT_SECS", defaults.tool_timeout)?,
            handshake_timeout: secs_or(
                env,
                "CODEPORT_HANDSHAKE_TIMEOUT_SECS",
                defaults.handshake_timeout,
            )?,
            max_files_in_flight: parse_or(
                env,
                "CODEPORT_MAX_FILES_IN_FLIGHT",
                defaults.max_files_in_flight,
            )?,
            connect_wait: secs_or(env, "CODEPORT_CONNECT_WAIT_SECS", defaults.connect_wait)?,
            rag_tool: env.var("CODEPORT_RAG_TOOL").unwrap_or(defaults.rag_tool),
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Check ranges that parsing alone cannot enforce.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.max_turns == 0 {
            return Err(out_of_range("CODEPORT_MAX_TURNS", "must be at least 1"));
        }
        if self.max_files_in_flight == 0 {
            return Err(out_of_range(
                "CODEPORT_MAX_FILES_IN_FLIGHT",
                "must be at least 1",
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(out_of_range(
                "CODEPORT_TEMPERATURE",
                "must be between 0.0 and 2.0",
            ));
        }
        if self.num_ctx == 0 {
            return Err(out_of_range("CODEPORT_NUM_CTX", "must be positive"));
        }
        for (key, value) in [
            ("CODEPORT_GENERATION_TIMEOUT_SECS", self.generation_timeout),
            ("CODEPORT_TOOL_TIMEOUT_SECS", self.tool_timeout),
            ("CODEPORT_HANDSHAKE_TIMEOUT_SECS", self.handshake_timeout),
        ] {
            if value.is_zero() {
                return Err(out_of_range(key, "must be positive"));
            }
        }
        Ok(())
    }

    /// Generation options derived from these settings.
    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            temperature: self.temperature,
            num_ctx: self.num_ctx,
            model: None,
        }
    }

    /// Socket address string for the HTTP listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn out_of_range(key: &'static str, reason: &str) -> SettingsError {
    SettingsError::OutOfRange {
        key,
        reason: reason.to_string(),
    }
}

fn parse_or<T: FromStr>(
    env: &dyn EnvProvider,
    key: &'static str,
    default: T,
) -> Result<T, SettingsError> {
    match env.var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| SettingsError::InvalidValue { key, value: raw }),
        None => Ok(default),
    }
}

fn parse_bool_or(
    env: &dyn EnvProvider,
    key: &'static str,
    default: bool,
) -> Result<bool, SettingsError> {
    match env.var(key) {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            _ => Err(SettingsError::InvalidValue { key, value: raw }),
        },
        None => Ok(default),
    }
}

fn secs_or(
    env: &dyn EnvProvider,
    key: &'static str,
    default: Duration,
) -> Result<Duration, SettingsError> {
    parse_or(env, key, default.as_secs()).map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MockEnv;

    #[test]
    fn test_defaults_without_env() {
        let settings = AppSettings::from_env(&MockEnv::new()).unwrap();
        assert_eq!(settings, AppSettings::default());
        assert_eq!(settings.max_turns, 5);
        assert_eq!(settings.max_files_in_flight, 1);
        assert_eq!(settings.bind_addr(), "0.0.0.0:8000");
    }

    #[test]
    fn test_env_overrides() {
        let env = MockEnv::new()
            .with_var("APP_PORT", "9100")
            .with_var("OLLAMA_URL", "http://localhost:11434")
            .with_var("MODEL_NAME", "qwen2.5-coder:14b")
            .with_var("MCP_CONFIG_PATH", "/etc/codeport/mcp.json")
            .with_var("CODEPORT_AGENTIC", "yes")
            .with_var("CODEPORT_MAX_TURNS", "8")
            .with_var("CODEPORT_TOOL_TIMEOUT_SECS", "15");

        let settings = AppSettings::from_env(&env).unwrap();
        assert_eq!(settings.port, 9100);
        assert_eq!(settings.ollama_url, "http://localhost:11434");
        assert_eq!(settings.model_name, "qwen2.5-coder:14b");
        assert_eq!(
            settings.mcp_config_path,
            PathBuf::from("/etc/codeport/mcp.json")
        );
        assert!(settings.agentic);
        assert_eq!(settings.max_turns, 8);
        assert_eq!(settings.tool_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let env = MockEnv::new().with_var("APP_PORT", "eighty");
        assert!(matches!(
            AppSettings::from_env(&env),
            Err(SettingsError::InvalidValue { key: "APP_PORT", .. })
        ));

        let env = MockEnv::new().with_var("CODEPORT_AGENTIC", "maybe");
        assert!(AppSettings::from_env(&env).is_err());
    }

    #[test]
    fn test_validate_ranges() {
        let env = MockEnv::new().with_var("CODEPORT_MAX_TURNS", "0");
        assert!(matches!(
            AppSettings::from_env(&env),
            Err(SettingsError::OutOfRange { .. })
        ));

        let env = MockEnv::new().with_var("CODEPORT_MAX_FILES_IN_FLIGHT", "0");
        assert!(AppSettings::from_env(&env).is_err());

        let env = MockEnv::new().with_var("CODEPORT_TEMPERATURE", "3.5");
        assert!(AppSettings::from_env(&env).is_err());

        let env = MockEnv::new().with_var("CODEPORT_TOOL_TIMEOUT_SECS", "0");
        assert!(AppSettings::from_env(&env).is_err());
    }

    #[test]
    fn test_generation_options_follow_settings() {
        let settings = AppSettings {
            temperature: 0.7,
            num_ctx: 8192,
            ..AppSettings::default()
        };
        let options = settings.generation_options();
        assert!((options.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(options.num_ctx, 8192);
        assert!(options.model.is_none());
    }
}

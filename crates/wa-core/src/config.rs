//! Configuration management
//!
//! 設定は以下の優先順位で読み込まれます:
//! 1. 環境変数
//! 2. wa-chatbot.toml 設定ファイル
//! 3. デフォルト値
//!
//! 設定ファイル内では `${VAR_NAME}` 形式で環境変数を展開できます。

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{ChatbotError, Result};

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "wa-chatbot.toml";

/// Main configuration for wa-chatbot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Outbound provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API key for HTTP API authentication
    pub key: Option<String>,

    /// Port for HTTP API server
    #[serde(default = "default_api_port")]
    pub port: u16,

    /// Allowed CORS origins. If unset, any origin is allowed
    #[serde(default)]
    pub allowed_origins: Option<Vec<String>>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key: None,
            port: default_api_port(),
            allowed_origins: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Upper bound for one outbound provider call, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_api_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    "data/wa-chatbot.db".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Config {
    /// 設定ファイルから環境変数を展開する
    ///
    /// `${VAR_NAME}` 形式の文字列を環境変数の値に置換します。
    /// 環境変数が存在しない場合は空文字列になります。
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::with_capacity(value.len());
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next(); // '{' を消費

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// TOML 設定ファイルから設定を読み込む
    ///
    /// 設定ファイル内の `${VAR_NAME}` は環境変数の値に置換され、
    /// その後で環境変数による上書きが適用されます。
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let toml_content = std::fs::read_to_string(path)
            .map_err(|e| ChatbotError::Configuration(format!("Failed to read config file: {}", e)))?;

        let mut cfg = Self::from_toml_str(&toml_content)?;
        cfg.apply_env_overrides();

        Ok(cfg)
    }

    /// TOML 文字列をパースする (環境変数の上書きなし)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let expanded = Self::expand_env_vars(content);
        let mut cfg: Config = toml::from_str(&expanded)
            .map_err(|e| ChatbotError::Configuration(format!("Failed to parse TOML: {}", e)))?;

        // 未設定の `${API_KEY}` は空文字列に展開されるため、認証なしとして扱う
        if cfg.api.key.as_deref().is_some_and(str::is_empty) {
            cfg.api.key = None;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// デフォルトパスから設定を読み込む
    ///
    /// `./wa-chatbot.toml` が存在すればそれを使い、
    /// 見つからない場合は環境変数のみから構築します。
    pub fn load() -> Result<Self> {
        if Path::new(DEFAULT_CONFIG_FILE).exists() {
            return Self::from_toml_file(DEFAULT_CONFIG_FILE);
        }

        Self::from_env()
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Result<Self> {
        let mut cfg = Config::default();
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    /// 環境変数で設定を上書きする
    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("API_KEY") {
            if !key.is_empty() {
                self.api.key = Some(key);
            }
        }
        if let Ok(port) = std::env::var("API_PORT") {
            if let Ok(p) = port.parse() {
                self.api.port = p;
            }
        }
        if let Ok(origins) = std::env::var("API_ALLOWED_ORIGINS") {
            self.api.allowed_origins = Some(
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            );
        }

        if let Ok(path) = std::env::var("DB_PATH") {
            if !path.is_empty() {
                self.database.path = path;
            }
        }

        if let Ok(timeout) = std::env::var("PROVIDER_TIMEOUT_SECS") {
            if let Ok(t) = timeout.parse() {
                self.provider.timeout_secs = t;
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.provider.timeout_secs == 0 {
            return Err(ChatbotError::Configuration(
                "provider.timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.api.port, 3000);
        assert!(config.api.key.is_none());
        assert_eq!(config.database.path, "data/wa-chatbot.db");
        assert_eq!(config.provider.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_from_toml_str() {
        let config = Config::from_toml_str(
            r#"
[api]
port = 8080
key = "secret"
allowed_origins = ["http://localhost:5173"]

[database]
path = "/tmp/chatbot.db"

[provider]
timeout_secs = 10
"#,
        )
        .unwrap();

        assert_eq!(config.api.port, 8080);
        assert_eq!(config.api.key.as_deref(), Some("secret"));
        assert_eq!(
            config.api.allowed_origins,
            Some(vec!["http://localhost:5173".to_string()])
        );
        assert_eq!(config.database.path, "/tmp/chatbot.db");
        assert_eq!(config.provider.timeout_secs, 10);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = Config::from_toml_str("[api]\nport = 4000\n").unwrap();
        assert_eq!(config.api.port, 4000);
        assert_eq!(config.provider.timeout_secs, 30);
    }

    #[test]
    fn test_empty_api_key_means_no_auth() {
        let config = Config::from_toml_str("[api]\nkey = \"${WA_CHATBOT_TEST_UNSET_KEY}\"\n").unwrap();
        assert!(config.api.key.is_none());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = Config::from_toml_str("[provider]\ntimeout_secs = 0\n").unwrap_err();
        assert!(matches!(err, ChatbotError::Configuration(_)));
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("WA_CHATBOT_TEST_DB", "/var/lib/chatbot.db") };

        let expanded = Config::expand_env_vars("path = \"${WA_CHATBOT_TEST_DB}\"");
        assert_eq!(expanded, "path = \"/var/lib/chatbot.db\"");

        let missing = Config::expand_env_vars("key = \"${WA_CHATBOT_TEST_MISSING}\"");
        assert_eq!(missing, "key = \"\"");
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[database]\npath = \"chatbot-test.db\"").unwrap();

        let config = Config::from_toml_file(file.path()).unwrap();
        assert!(!config.database.path.is_empty());
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let err = Config::from_toml_file("/nonexistent/wa-chatbot.toml").unwrap_err();
        assert!(matches!(err, ChatbotError::Configuration(_)));
    }
}

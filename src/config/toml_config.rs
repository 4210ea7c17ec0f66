use crate::config::Settings;
use crate::utils::error::{IngestError, Result};
use crate::utils::validation::{validate_required_field, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub store: StoreConfig,
    pub ingest: Option<IngestConfig>,
    pub capacity: Option<CapacityConfig>,
    pub server: Option<ServerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub connection: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub concurrency: Option<usize>,
    pub render_timeout_secs: Option<u64>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityConfig {
    pub threshold: Option<u64>,
    pub evict_batch_count: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub listen: Option<String>,
    pub result_limit: Option<usize>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| IngestError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${LISTING_STORE})，未設定的保留原字串
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn to_settings(&self) -> Result<Settings> {
        let defaults = Settings::default();
        let connection = validate_required_field("store.connection", &self.store.connection)?;
        if ENV_VAR.is_match(connection) {
            return Err(IngestError::MissingConfigError {
                field: format!("store.connection (unset variable in '{}')", connection),
            });
        }

        let ingest = self.ingest.as_ref();
        let capacity = self.capacity.as_ref();
        let server = self.server.as_ref();

        Ok(Settings {
            store: connection.clone(),
            capacity_threshold: capacity
                .and_then(|c| c.threshold)
                .unwrap_or(defaults.capacity_threshold),
            concurrency: ingest
                .and_then(|i| i.concurrency)
                .unwrap_or(defaults.concurrency),
            evict_batch_count: capacity
                .and_then(|c| c.evict_batch_count)
                .unwrap_or(defaults.evict_batch_count),
            render_timeout_secs: ingest
                .and_then(|i| i.render_timeout_secs)
                .unwrap_or(defaults.render_timeout_secs),
            result_limit: server
                .and_then(|s| s.result_limit)
                .unwrap_or(defaults.result_limit),
            base_url: ingest.and_then(|i| i.base_url.clone()),
            listen: server
                .and_then(|s| s.listen.clone())
                .unwrap_or(defaults.listen),
        })
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.to_settings()?.validate()
    }
}

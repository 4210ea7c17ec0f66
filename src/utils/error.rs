use std::time::Duration;
use thiserror::Error;

use crate::core::etl::Stage;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Render failed for {url}: {message}")]
    RenderError { url: String, message: String },

    #[error("Render timed out after {timeout:?} for {url}")]
    RenderTimeout { url: String, timeout: Duration },

    #[error("Persist failed: {message}")]
    PersistError { message: String },

    #[error("Capacity pass failed: {message}")]
    CapacityError { message: String },

    #[error("Store error: {message}")]
    StoreError { message: String },

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Ingestion failed at stage {stage:?}: {source}")]
    StageFailed {
        stage: Stage,
        #[source]
        source: Box<IngestError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Storage,
    Data,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl IngestError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            IngestError::RenderError { .. }
            | IngestError::RenderTimeout { .. }
            | IngestError::HttpError(_) => ErrorCategory::Network,
            IngestError::PersistError { .. }
            | IngestError::CapacityError { .. }
            | IngestError::StoreError { .. }
            | IngestError::IoError(_) => ErrorCategory::Storage,
            IngestError::SerializationError(_) => ErrorCategory::Data,
            IngestError::ConfigError { .. }
            | IngestError::ConfigValidationError { .. }
            | IngestError::InvalidConfigValueError { .. }
            | IngestError::MissingConfigError { .. } => ErrorCategory::Configuration,
            IngestError::StageFailed { source, .. } => source.category(),
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 容量清理失敗不影響已寫入的資料
            IngestError::CapacityError { .. } => ErrorSeverity::Low,
            IngestError::RenderError { .. }
            | IngestError::RenderTimeout { .. }
            | IngestError::HttpError(_) => ErrorSeverity::Medium,
            IngestError::PersistError { .. }
            | IngestError::SerializationError(_)
            | IngestError::StageFailed { .. } => ErrorSeverity::High,
            IngestError::StoreError { .. }
            | IngestError::IoError(_)
            | IngestError::ConfigError { .. }
            | IngestError::ConfigValidationError { .. }
            | IngestError::InvalidConfigValueError { .. }
            | IngestError::MissingConfigError { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => {
                "Check that the listings site is reachable and raise --render-timeout-secs if pages load slowly"
            }
            ErrorCategory::Storage => {
                "Check the store connection string and that the store directory is writable"
            }
            ErrorCategory::Data => "The stored documents may be corrupt; inspect the store file",
            ErrorCategory::Configuration => {
                "Review the command line flags or the TOML configuration file"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            IngestError::StageFailed { stage, source } => {
                format!("No data ingested: the {:?} stage failed ({})", stage, source)
            }
            IngestError::RenderTimeout { url, .. } => {
                format!("The page {} took too long to load", url)
            }
            IngestError::MissingConfigError { field } => {
                format!("Missing setting '{}'", field)
            }
            other => other.to_string(),
        }
    }

    /// 將錯誤標記為發生在某個管線階段
    pub fn at_stage(self, stage: Stage) -> Self {
        IngestError::StageFailed {
            stage,
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;

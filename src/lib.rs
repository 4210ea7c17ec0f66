pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use adapters::{http_renderer::HttpRenderer, open_store};
pub use app::{server::AppState, QueryService};
pub use config::Settings;
pub use core::etl::{IngestEngine, IngestReport, Stage};
pub use utils::error::{IngestError, Result};

use crate::config::toml_config::TomlConfig;
use crate::config::{Settings, DEFAULT_LISTEN, DEFAULT_RENDER_TIMEOUT_SECS, DEFAULT_STORE};
use crate::utils::error::Result;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "listing-ingest")]
#[command(about = "Ingests property search results, enriches them and serves them back")]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Load settings from a TOML file instead of flags
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit JSON logs")]
    pub json_logs: bool,

    #[arg(long, global = true, help = "Log CPU/memory per pipeline stage")]
    pub monitor: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Serve GET /api/properties
    Serve,
    /// Run one ingestion for a search results URL
    Ingest { query: String },
    /// Run a capacity pass over the store
    Evict,
}

#[derive(Debug, Clone, Args)]
pub struct SettingsArgs {
    #[arg(long, global = true, env = "LISTING_STORE", default_value = DEFAULT_STORE)]
    pub store: String,

    #[arg(long, global = true, env = "LISTING_CAPACITY_THRESHOLD", default_value_t = 1000)]
    pub capacity_threshold: u64,

    #[arg(long, global = true, env = "LISTING_CONCURRENCY", default_value_t = 5)]
    pub concurrency: usize,

    #[arg(long, global = true, env = "LISTING_EVICT_BATCH_COUNT", default_value_t = 2)]
    pub evict_batch_count: usize,

    #[arg(long, global = true, env = "LISTING_RENDER_TIMEOUT_SECS", default_value_t = DEFAULT_RENDER_TIMEOUT_SECS)]
    pub render_timeout_secs: u64,

    #[arg(long, global = true, default_value_t = 37)]
    pub result_limit: usize,

    /// Origin used to resolve relative listing links
    #[arg(long, global = true, env = "LISTING_BASE_URL")]
    pub base_url: Option<String>,

    #[arg(long, global = true, env = "LISTING_LISTEN", default_value = DEFAULT_LISTEN)]
    pub listen: String,
}

impl CliConfig {
    /// 有 `--config` 時以 TOML 檔為準，否則使用命令列參數
    pub fn resolve_settings(&self) -> Result<Settings> {
        if let Some(path) = &self.config {
            tracing::info!("📁 Loading configuration from: {}", path);
            return TomlConfig::from_file(path)?.to_settings();
        }

        let args = &self.settings;
        Ok(Settings {
            store: args.store.clone(),
            capacity_threshold: args.capacity_threshold,
            concurrency: args.concurrency,
            evict_batch_count: args.evict_batch_count,
            render_timeout_secs: args.render_timeout_secs,
            result_limit: args.result_limit,
            base_url: args.base_url.clone(),
            listen: args.listen.clone(),
        })
    }
}

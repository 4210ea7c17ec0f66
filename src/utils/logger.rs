use tracing::Subscriber;
use tracing_subscriber::fmt::Layer;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const CLI_FILTER: &str = "listing_ingest=info";
const VERBOSE_FILTER: &str = "listing_ingest=debug,tower_http=debug,info";
const JSON_FILTER: &str = "listing_ingest=info,tower_http=info";

/// `RUST_LOG` 優先，否則使用預設指令
fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

fn fmt_layer<S>() -> Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
}

pub fn init_cli_logger(verbose: bool) {
    let filter = env_filter(if verbose { VERBOSE_FILTER } else { CLI_FILTER });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer().compact())
        .init();
}

pub fn init_json_logger() {
    tracing_subscriber::registry()
        .with(env_filter(JSON_FILTER))
        .with(fmt_layer().json()) // 結構化輸出，方便日誌收集
        .init();
}

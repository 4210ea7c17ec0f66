use clap::Parser;
use listing_ingest::app::server::{router, AppState};
use listing_ingest::config::cli::Command;
use listing_ingest::adapters::open_configured_store;
use listing_ingest::core::{ListingStore, QueryId, Renderer};
use listing_ingest::utils::error::{ErrorSeverity, IngestError};
use listing_ingest::utils::{logger, validation::Validate};
use listing_ingest::{CliConfig, HttpRenderer, IngestEngine, QueryService, Settings};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting listing-ingest");

    // 驗證配置
    let settings = match cli.resolve_settings().and_then(|settings| {
        settings.validate()?;
        Ok(settings)
    }) {
        Ok(settings) => settings,
        Err(e) => exit_with(e),
    };
    if cli.verbose {
        tracing::debug!("Settings: {:?}", settings);
    }
    if cli.monitor {
        tracing::info!("🔍 Run monitoring enabled");
    }

    // 開啟儲存，結束前關閉
    let store = match open_configured_store(&settings).await {
        Ok(store) => store,
        Err(e) => exit_with(e),
    };
    let renderer: Arc<dyn Renderer> = Arc::new(HttpRenderer::new()?);
    let engine = Arc::new(
        IngestEngine::new(renderer, Arc::clone(&store), &settings)?.with_monitoring(cli.monitor),
    );

    let outcome = match cli.command {
        Command::Serve => serve(&settings, Arc::clone(&store), engine).await,
        Command::Ingest { query } => ingest(&engine, QueryId::new(query)).await,
        Command::Evict => engine.capacity().enforce_capacity().await.map(|deleted| {
            println!("🗑️ Removed {} listings", deleted);
        }),
    };

    if let Err(e) = store.close().await {
        tracing::error!("❌ Failed to close store cleanly: {}", e);
    }

    if let Err(e) = outcome {
        exit_with(e);
    }
    Ok(())
}

async fn serve(
    settings: &Settings,
    store: Arc<dyn ListingStore>,
    engine: Arc<IngestEngine>,
) -> Result<(), IngestError> {
    let queries = Arc::new(QueryService::from_config(store, engine, settings));
    let app = router(AppState { queries });

    let listener = tokio::net::TcpListener::bind(settings.listen.as_str()).await?;
    tracing::info!("Serving http://{}/api/properties", settings.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn ingest(engine: &IngestEngine, query: QueryId) -> Result<(), IngestError> {
    let report = engine.run(&query).await?;
    println!("✅ Ingestion completed");
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

fn exit_with(e: IngestError) -> ! {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ listing-ingest failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

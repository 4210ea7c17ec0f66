use crate::core::batch_enricher::BatchEnricher;
use crate::core::capacity::CapacityManager;
use crate::core::enrichment::{render_with_timeout, EnrichmentFetcher};
use crate::core::extractor::ListingExtractor;
use crate::core::persister::BatchPersister;
use crate::domain::model::{BatchId, QueryId};
use crate::domain::ports::{ConfigProvider, ListingStore, Renderer};
use crate::utils::error::{IngestError, Result};
use crate::utils::monitor::RunMonitor;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Pipeline states, in order. A failure is reported against the state the
/// run was trying to reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Stage {
    Start,
    Rendered,
    Extracted,
    Enriched,
    Persisted,
    CapacityChecked,
    Done,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub query: QueryId,
    pub listings: usize,
    pub with_floor_area: usize,
    pub batch: Option<BatchId>,
    pub evicted: u64,
    pub stage: Stage,
}

/// 單次擷取流程：render → extract → enrich → persist → capacity
pub struct IngestEngine {
    renderer: Arc<dyn Renderer>,
    extractor: ListingExtractor,
    enricher: BatchEnricher,
    persister: BatchPersister,
    capacity: CapacityManager,
    render_timeout: Duration,
    monitor: RunMonitor,
}

impl IngestEngine {
    pub fn new<C: ConfigProvider + ?Sized>(
        renderer: Arc<dyn Renderer>,
        store: Arc<dyn ListingStore>,
        config: &C,
    ) -> Result<Self> {
        let base_url = config
            .base_url()
            .map(|raw| {
                Url::parse(raw).map_err(|e| IngestError::InvalidConfigValueError {
                    field: "base_url".to_string(),
                    value: raw.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        let fetcher = EnrichmentFetcher::new(Arc::clone(&renderer), config.render_timeout());

        Ok(Self {
            extractor: ListingExtractor::new(base_url),
            enricher: BatchEnricher::new(fetcher, config.concurrency()),
            persister: BatchPersister::new(Arc::clone(&store)),
            capacity: CapacityManager::new(
                store,
                config.capacity_threshold(),
                config.evict_batch_count(),
            ),
            render_timeout: config.render_timeout(),
            renderer,
            monitor: RunMonitor::default(),
        })
    }

    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor = RunMonitor::new(enabled);
        self
    }

    pub fn capacity(&self) -> &CapacityManager {
        &self.capacity
    }

    pub async fn run(&self, query: &QueryId) -> Result<IngestReport> {
        tracing::info!("🚀 Starting ingestion for {}", query);
        self.monitor.log_stats("Start");

        let mut report = IngestReport {
            query: query.clone(),
            listings: 0,
            with_floor_area: 0,
            batch: None,
            evicted: 0,
            stage: Stage::Start,
        };

        // Render
        let first_page = first_page_url(query.as_str());
        let html = render_with_timeout(self.renderer.as_ref(), &first_page, self.render_timeout)
            .await
            .map_err(|e| e.at_stage(Stage::Rendered))?;
        advance(&mut report, Stage::Rendered);

        // Extract
        let partials = self.extractor.extract(&html, query);
        report.listings = partials.len();
        advance(&mut report, Stage::Extracted);
        self.monitor.log_stats("Extract");

        if partials.is_empty() {
            tracing::info!("No listings found for {}, nothing to persist", query);
            advance(&mut report, Stage::Done);
            return Ok(report);
        }

        // Enrich
        let enriched = self.enricher.enrich_batch(partials).await;
        report.with_floor_area = enriched.iter().filter(|l| l.floor_area.is_some()).count();
        advance(&mut report, Stage::Enriched);
        self.monitor.log_stats("Enrich");

        // Persist
        let batch = self
            .persister
            .persist(query, enriched)
            .await
            .map_err(|e| e.at_stage(Stage::Persisted))?;
        report.batch = Some(batch);
        advance(&mut report, Stage::Persisted);

        // Capacity：失敗只記錄，不回滾已寫入的批次
        match self.capacity.enforce_capacity().await {
            Ok(evicted) => report.evicted = evicted,
            Err(e) => tracing::warn!("⚠️ Capacity pass skipped: {}", e),
        }
        advance(&mut report, Stage::CapacityChecked);

        advance(&mut report, Stage::Done);
        self.monitor.log_final_stats();
        tracing::info!(
            "✅ Ingested {} listings for {} ({} with floor area, {} evicted)",
            report.listings,
            query,
            report.with_floor_area,
            report.evicted
        );
        Ok(report)
    }
}

fn advance(report: &mut IngestReport, next: Stage) {
    tracing::debug!("{:?} -> {:?}", report.stage, next);
    report.stage = next;
}

/// The search results page is always read from its first index.
pub fn first_page_url(query: &str) -> String {
    if query.contains('?') {
        format!("{}&index=0", query)
    } else {
        format!("{}?index=0", query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store::MemoryStore;
    use crate::config::Settings;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct PageRenderer {
        pages: HashMap<String, String>,
    }

    #[async_trait]
    impl Renderer for PageRenderer {
        async fn render(&self, url: &str, _timeout: Duration) -> Result<String> {
            self.pages.get(url).cloned().ok_or_else(|| IngestError::RenderError {
                url: url.to_string(),
                message: "no such page".to_string(),
            })
        }
    }

    const RESULTS: &str = r#"<html><body>
        <div class="propertyCard">
          <meta itemprop="streetAddress" content="1 High St">
          <span class="no-svg-bed-icon"></span><span>2</span>
          <div class="propertyCard-priceValue">£250,000</div>
          <a class="propertyCard-link" href="/properties/1"></a>
        </div>
        </body></html>"#;

    fn engine(pages: &[(&str, &str)], store: Arc<MemoryStore>) -> IngestEngine {
        let renderer = PageRenderer {
            pages: pages.iter().map(|(u, h)| (u.to_string(), h.to_string())).collect(),
        };
        let settings = Settings {
            base_url: Some("https://site.test".to_string()),
            render_timeout_secs: 1,
            ..Settings::default()
        };
        IngestEngine::new(Arc::new(renderer), store, &settings).unwrap()
    }

    #[test]
    fn test_first_page_url() {
        assert_eq!(
            first_page_url("https://site.test/find.html?locationIdentifier=X"),
            "https://site.test/find.html?locationIdentifier=X&index=0"
        );
        assert_eq!(first_page_url("https://site.test/find.html"), "https://site.test/find.html?index=0");
    }

    #[tokio::test]
    async fn test_run_reaches_done() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine(
            &[
                ("https://site.test/find.html?q=1&index=0", RESULTS),
                ("https://site.test/properties/1", "<p>640 sq ft</p>"),
            ],
            store.clone(),
        );

        let report = engine.run(&QueryId::new("https://site.test/find.html?q=1")).await.unwrap();

        assert_eq!(report.stage, Stage::Done);
        assert_eq!(report.listings, 1);
        assert_eq!(report.with_floor_area, 1);
        assert!(report.batch.is_some());
        assert_eq!(store.count_all().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_first_page_failure_fails_run_at_render() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine(&[], store.clone());

        let err = engine.run(&QueryId::new("https://site.test/find.html?q=1")).await.unwrap_err();

        assert!(matches!(err, IngestError::StageFailed { stage: Stage::Rendered, .. }));
        assert_eq!(store.count_all().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_results_persist_nothing() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine(&[("https://site.test/find.html?q=2&index=0", "<html></html>")], store.clone());

        let report = engine.run(&QueryId::new("https://site.test/find.html?q=2")).await.unwrap();

        assert_eq!(report.stage, Stage::Done);
        assert!(report.batch.is_none());
        assert_eq!(store.count_all().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_persist_failure_fails_run_at_persist() {
        let store = Arc::new(MemoryStore::new());
        store.set_unavailable(true);
        let engine = engine(&[("https://site.test/find.html?q=1&index=0", RESULTS)], store.clone());

        let err = engine.run(&QueryId::new("https://site.test/find.html?q=1")).await.unwrap_err();

        assert!(matches!(err, IngestError::StageFailed { stage: Stage::Persisted, .. }));
    }
}

use crate::core::enrichment::EnrichmentFetcher;
use crate::domain::model::{EnrichedListing, PartialListing};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

pub const DEFAULT_CONCURRENCY: usize = 5;

/// Runs [`EnrichmentFetcher`] over one page of listings with at most
/// `concurrency` detail pages in flight.
///
/// Workers pull `(index, url)` jobs off a shared queue and report
/// `(index, floor_area)` back, so output slot `i` always belongs to input `i`
/// whatever order the pages finish in.
#[derive(Clone)]
pub struct BatchEnricher {
    fetcher: EnrichmentFetcher,
    concurrency: usize,
}

impl BatchEnricher {
    pub fn new(fetcher: EnrichmentFetcher, concurrency: usize) -> Self {
        Self {
            fetcher,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn enrich_batch(&self, partials: Vec<PartialListing>) -> Vec<EnrichedListing> {
        let jobs: VecDeque<(usize, String)> = partials
            .iter()
            .enumerate()
            .filter_map(|(index, listing)| listing.detail_url.clone().map(|url| (index, url)))
            .collect();

        let mut floor_areas: Vec<Option<u32>> = vec![None; partials.len()];
        if jobs.is_empty() {
            return zip_results(partials, floor_areas);
        }

        let dispatched = jobs.len();
        let worker_count = self.concurrency.min(dispatched);
        tracing::debug!(
            "Enriching {} of {} listings with {} workers",
            dispatched,
            partials.len(),
            worker_count
        );

        let queue = Arc::new(Mutex::new(jobs));
        let (tx, mut rx) = mpsc::unbounded_channel::<(usize, Option<u32>)>();

        for worker_id in 0..worker_count {
            let queue = Arc::clone(&queue);
            let fetcher = self.fetcher.clone();
            let tx = tx.clone();

            tokio::spawn(async move {
                loop {
                    let next = queue.lock().await.pop_front();
                    let Some((index, url)) = next else {
                        break;
                    };

                    let floor_area = fetcher.enrich(&url).await;
                    if tx.send((index, floor_area)).is_err() {
                        tracing::debug!("Worker {} stopping, collector gone", worker_id);
                        break;
                    }
                }
            });
        }
        // 所有 worker 結束後 channel 才會關閉
        drop(tx);

        let mut completed = 0;
        while let Some((index, floor_area)) = rx.recv().await {
            floor_areas[index] = floor_area;
            completed += 1;
        }

        if completed < dispatched {
            tracing::warn!(
                "⚠️ {} enrichment tasks ended without a result, floor area left unknown",
                dispatched - completed
            );
        }

        zip_results(partials, floor_areas)
    }
}

fn zip_results(partials: Vec<PartialListing>, floor_areas: Vec<Option<u32>>) -> Vec<EnrichedListing> {
    partials
        .into_iter()
        .zip(floor_areas)
        .map(|(listing, floor_area)| EnrichedListing::new(listing, floor_area))
        .collect()
}

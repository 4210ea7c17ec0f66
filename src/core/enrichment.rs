use crate::domain::ports::Renderer;
use crate::utils::error::{IngestError, Result};
use regex::Regex;
use scraper::Html;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

// 千分位整數後接面積單位，例如 "1,250 sq ft"
static FLOOR_AREA_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,3}(?:,\d{3})+|\d+)\s*(?:sq\.?\s*ft|sqft|square\s+feet)\b")
        .expect("floor area pattern is valid")
});

/// Renders `url` and fails once `timeout` elapses, whatever the renderer does.
pub async fn render_with_timeout(
    renderer: &dyn Renderer,
    url: &str,
    timeout: Duration,
) -> Result<String> {
    match tokio::time::timeout(timeout, renderer.render(url, timeout)).await {
        Ok(result) => result,
        Err(_) => Err(IngestError::RenderTimeout {
            url: url.to_string(),
            timeout,
        }),
    }
}

/// First floor-area figure in the page's visible text, separators removed.
pub fn extract_floor_area(html: &str) -> Option<u32> {
    let document = Html::parse_document(html);
    // 相鄰元素的文字以空白分隔，避免標籤與數字黏在一起
    let text = document.root_element().text().collect::<Vec<_>>().join(" ");

    let captures = FLOOR_AREA_PATTERN.captures(&text)?;
    captures.get(1)?.as_str().replace(',', "").parse().ok()
}

/// Fetches one detail page and pulls the floor area off it.
#[derive(Clone)]
pub struct EnrichmentFetcher {
    renderer: Arc<dyn Renderer>,
    timeout: Duration,
}

impl EnrichmentFetcher {
    pub fn new(renderer: Arc<dyn Renderer>, timeout: Duration) -> Self {
        Self { renderer, timeout }
    }

    /// 任何錯誤都轉成未知值，單一頁面失敗不影響整批
    pub async fn enrich(&self, detail_url: &str) -> Option<u32> {
        match render_with_timeout(self.renderer.as_ref(), detail_url, self.timeout).await {
            Ok(html) => {
                let floor_area = extract_floor_area(&html);
                if floor_area.is_none() {
                    tracing::debug!("No floor area found on {}", detail_url);
                }
                floor_area
            }
            Err(e) => {
                tracing::warn!("⚠️ Enrichment degraded to unknown for {}: {}", detail_url, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct StubRenderer {
        pages: HashMap<String, String>,
        hang_on: Option<String>,
    }

    #[async_trait]
    impl Renderer for StubRenderer {
        async fn render(&self, url: &str, _timeout: Duration) -> Result<String> {
            if self.hang_on.as_deref() == Some(url) {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            self.pages.get(url).cloned().ok_or_else(|| IngestError::RenderError {
                url: url.to_string(),
                message: "navigation failed".to_string(),
            })
        }
    }

    fn fetcher(pages: &[(&str, &str)], hang_on: Option<&str>) -> EnrichmentFetcher {
        let renderer = StubRenderer {
            pages: pages
                .iter()
                .map(|(url, html)| (url.to_string(), html.to_string()))
                .collect(),
            hang_on: hang_on.map(str::to_string),
        };
        EnrichmentFetcher::new(Arc::new(renderer), Duration::from_millis(200))
    }

    #[test]
    fn test_extract_floor_area_variants() {
        assert_eq!(extract_floor_area("<p>Size: 850 sq ft</p>"), Some(850));
        assert_eq!(extract_floor_area("<p>1,250 sq. ft. (116 sq m)</p>"), Some(1250));
        assert_eq!(extract_floor_area("<p>1850sqft</p>"), Some(1850));
        assert_eq!(extract_floor_area("<dl><dt>Size</dt><dd>850 sq ft</dd></dl>"), Some(850));
        assert_eq!(
            extract_floor_area("<table><tr><td>Bedrooms 3</td><td>850 sq ft</td></tr></table>"),
            Some(850)
        );
        assert_eq!(extract_floor_area("<div><b>2,100</b> sq ft</div>"), Some(2100));
        assert_eq!(extract_floor_area("<p>Ask agent</p>"), None);
        assert_eq!(extract_floor_area("<p>850 sq m</p>"), None);
    }

    #[test]
    fn test_extract_floor_area_takes_first_match() {
        let html = "<p>Ground floor 640 sq ft</p><p>Total 1,120 sq ft</p>";
        assert_eq!(extract_floor_area(html), Some(640));
    }

    #[tokio::test]
    async fn test_enrich_reads_floor_area() {
        let fetcher = fetcher(&[("https://site/1", "<body>Floor area 850 sq ft</body>")], None);
        assert_eq!(fetcher.enrich("https://site/1").await, Some(850));
    }

    #[tokio::test]
    async fn test_enrich_render_failure_is_unknown() {
        let fetcher = fetcher(&[], None);
        assert_eq!(fetcher.enrich("https://site/missing").await, None);
    }

    #[tokio::test]
    async fn test_enrich_timeout_is_unknown_and_bounded() {
        let fetcher = fetcher(&[("https://site/slow", "850 sq ft")], Some("https://site/slow"));

        let started = std::time::Instant::now();
        assert_eq!(fetcher.enrich("https://site/slow").await, None);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_render_with_timeout_reports_timeout() {
        let renderer = StubRenderer {
            pages: HashMap::new(),
            hang_on: Some("https://site/slow".to_string()),
        };
        let err = render_with_timeout(&renderer, "https://site/slow", Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::RenderTimeout { .. }));
    }
}

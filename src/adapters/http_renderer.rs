use crate::domain::ports::Renderer;
use crate::utils::error::{IngestError, Result};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use std::time::Duration;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

static CONSENT_OVERLAY: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        "#onetrust-consent-sdk, #onetrust-banner-sdk, [id*='cookie-consent'], [class*='cookie-consent'], [aria-label='Cookie banner']",
    )
    .expect("consent selector is valid CSS")
});

/// Renderer that fetches pages over plain HTTP.
///
/// There is no script execution, so the consent dialog cannot be clicked
/// away; its markup is removed from the returned document instead.
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn render(&self, url: &str, timeout: Duration) -> Result<String> {
        tracing::debug!("Fetching {}", url);
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    IngestError::RenderTimeout {
                        url: url.to_string(),
                        timeout,
                    }
                } else {
                    IngestError::RenderError {
                        url: url.to_string(),
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::RenderError {
                url: url.to_string(),
                message: format!("HTTP {}", status),
            });
        }

        let body = response.text().await?;
        Ok(dismiss_consent_overlay(&body))
    }
}

/// 移除 cookie 同意視窗；沒有時原樣回傳
pub fn dismiss_consent_overlay(html: &str) -> String {
    let mut document = Html::parse_document(html);
    let overlays: Vec<_> = document.select(&CONSENT_OVERLAY).map(|el| el.id()).collect();
    if overlays.is_empty() {
        return html.to_string();
    }

    for id in overlays {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
    tracing::debug!("Consent overlay dismissed");
    document.html()
}

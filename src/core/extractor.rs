//! Record extraction from a rendered search-results page.
//!
//! Every listing card becomes exactly one [`PartialListing`], in document
//! order. Missing or malformed sub-elements degrade to `None` for that field
//! and never drop the card.

use crate::domain::model::{PartialListing, QueryId};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

static CARD: LazyLock<Selector> = LazyLock::new(|| selector("div.propertyCard"));
static ADDRESS: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"meta[itemprop="streetAddress"]"#));
static BEDROOMS: LazyLock<Selector> = LazyLock::new(|| selector("span.no-svg-bed-icon + span"));
static BATHROOMS: LazyLock<Selector> =
    LazyLock::new(|| selector("span.no-svg-bathroom-icon + span"));
static PRICE: LazyLock<Selector> = LazyLock::new(|| selector("div.propertyCard-priceValue"));
static ADDED_OR_REDUCED: LazyLock<Selector> =
    LazyLock::new(|| selector("span.propertyCard-branchSummary-addedOrReduced"));
static DETAIL_LINK: LazyLock<Selector> = LazyLock::new(|| selector("a.propertyCard-link"));

static PRICE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[£$€]?\s*(\d{1,3}(?:,\d{3})+|\d+)\s*$").expect("price pattern is valid")
});

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("listing selectors are valid CSS")
}

const UNKNOWN_TEXT: &str = "N/A";

#[derive(Debug, Clone, Default)]
pub struct ListingExtractor {
    base_url: Option<Url>,
}

impl ListingExtractor {
    /// `base_url` 用來解析相對的物件連結；未設定時改用查詢 URL 的來源
    pub fn new(base_url: Option<Url>) -> Self {
        Self { base_url }
    }

    pub fn extract(&self, html: &str, query: &QueryId) -> Vec<PartialListing> {
        let document = Html::parse_document(html);
        let base = self
            .base_url
            .clone()
            .or_else(|| Url::parse(query.as_str()).ok());

        let listings: Vec<PartialListing> = document
            .select(&CARD)
            .map(|card| self.extract_card(card, query, base.as_ref()))
            .collect();

        if listings.is_empty() {
            tracing::debug!("No listing cards found for {}", query);
        }

        listings
    }

    fn extract_card(&self, card: ElementRef<'_>, query: &QueryId, base: Option<&Url>) -> PartialListing {
        let address = card
            .select(&ADDRESS)
            .next()
            .and_then(|meta| meta.value().attr("content"))
            .map(|content| content.trim().to_string());
        let bedrooms_text = first_text(card, &BEDROOMS);
        let bathrooms_text = first_text(card, &BATHROOMS);
        let price = first_text(card, &PRICE).as_deref().and_then(clean_price);
        let added_or_reduced = first_text(card, &ADDED_OR_REDUCED);
        let detail_url = card
            .select(&DETAIL_LINK)
            .next()
            .and_then(|link| link.value().attr("href"))
            .and_then(|href| resolve_detail_url(href, base));

        let title = format!(
            "{}, {} bedrooms, {} bathrooms",
            address.as_deref().unwrap_or(UNKNOWN_TEXT),
            bedrooms_text.as_deref().unwrap_or(UNKNOWN_TEXT),
            bathrooms_text.as_deref().unwrap_or(UNKNOWN_TEXT),
        );

        PartialListing {
            title,
            address,
            bedrooms: bedrooms_text.as_deref().and_then(parse_count),
            bathrooms: bathrooms_text.as_deref().and_then(parse_count),
            price,
            added_or_reduced,
            detail_url,
            query: query.clone(),
        }
    }
}

fn first_text(card: ElementRef<'_>, selector: &Selector) -> Option<String> {
    card.select(selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
}

fn resolve_detail_url(href: &str, base: Option<&Url>) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    match Url::parse(href) {
        Ok(absolute) => Some(absolute.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => match base {
            Some(base) => base.join(href).ok().map(|url| url.to_string()),
            None => {
                tracing::debug!("Cannot resolve relative detail link {} without a base URL", href);
                None
            }
        },
        Err(e) => {
            tracing::debug!("Ignoring malformed detail link {}: {}", href, e);
            None
        }
    }
}

/// 去除貨幣符號與千分位後轉成整數；格式不符則回傳 `None`
pub fn clean_price(text: &str) -> Option<u64> {
    let digits = PRICE_PATTERN.captures(text)?.get(1)?.as_str().replace(',', "");
    digits.parse().ok()
}

/// Bedroom/bathroom counts are only trusted when the text is purely numeric.
pub fn parse_count(text: &str) -> Option<u32> {
    let text = text.trim();
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

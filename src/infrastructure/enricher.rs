//! Description enrichment pass
//!
//! Revisits product detail pages over plain HTTP to replace title-quality
//! descriptions with real copy. Strictly best-effort: a failed fetch is a
//! counter, never an error, and the whole pass can be cancelled between
//! batches.

use std::sync::Arc;

use futures::future::join_all;
use scraper::{Html, Selector};
use tokio::time::{Duration, sleep};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::Product;
use crate::infrastructure::classifier::normalized_text;
use crate::infrastructure::config::EnrichmentPolicy;
use crate::infrastructure::extractor::meta_description;
use crate::infrastructure::http_client::{HttpFetcher, TextFetch};
use crate::infrastructure::selectors::{SelectorLibrary, parse_patterns};
use crate::infrastructure::{HarvestError, HarvestResult};

/// What the pass managed to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentReport {
    pub enriched: usize,
    pub failed: usize,
}

enum Outcome {
    Improved(String),
    Unchanged,
    Failed,
    Skipped,
}

pub struct DescriptionEnricher {
    fetcher: Arc<dyn TextFetch>,
    policy: EnrichmentPolicy,
    selectors: Vec<(String, Selector)>,
    list_item: Selector,
}

impl DescriptionEnricher {
    pub fn new(lib: &SelectorLibrary, policy: EnrichmentPolicy, user_agent: &str) -> HarvestResult<Self> {
        let fetcher: Arc<dyn TextFetch> = Arc::new(HttpFetcher::new(&policy, user_agent)?);
        Self::with_fetcher(lib, policy, fetcher)
    }

    /// Injection point for canned fetchers in tests.
    pub fn with_fetcher(
        lib: &SelectorLibrary,
        policy: EnrichmentPolicy,
        fetcher: Arc<dyn TextFetch>,
    ) -> HarvestResult<Self> {
        let list_item = Selector::parse("li")
            .map_err(|e| HarvestError::Selector(format!("li: {e:?}")))?;
        Ok(Self { fetcher, policy, selectors: parse_patterns(&lib.descriptions), list_item })
    }

    /// Improve descriptions in place, in bounded concurrent batches with a
    /// pause between batches to stay polite to the target site.
    pub async fn enrich(&self, products: &mut [Product], cancel: &CancellationToken) -> EnrichmentReport {
        let mut report = EnrichmentReport::default();
        let batch_size = self.policy.batch_size.max(1);
        let mut first_batch = true;

        for chunk in products.chunks_mut(batch_size) {
            if cancel.is_cancelled() {
                break;
            }
            if !first_batch {
                sleep(Duration::from_millis(self.policy.batch_pause_ms)).await;
            }
            first_batch = false;

            let fetches: Vec<_> = chunk
                .iter()
                .map(|p| self.enrich_one(p.product_url.clone(), p.model.clone(), cancel))
                .collect();
            let outcomes = join_all(fetches).await;

            for (product, outcome) in chunk.iter_mut().zip(outcomes) {
                match outcome {
                    Outcome::Improved(text) => {
                        product.description = text;
                        report.enriched += 1;
                    }
                    Outcome::Failed => report.failed += 1,
                    Outcome::Unchanged | Outcome::Skipped => {}
                }
            }
        }

        report
    }

    async fn enrich_one(&self, url: String, model: String, cancel: &CancellationToken) -> Outcome {
        if url.trim().is_empty() {
            return Outcome::Skipped;
        }

        match self.fetcher.get_text(&url, cancel).await {
            Ok(body) => {
                let improved = {
                    let doc = Html::parse_document(&body);
                    self.description_from(&doc, &model)
                };
                match improved {
                    Some(text) => Outcome::Improved(text),
                    None => Outcome::Unchanged,
                }
            }
            Err(HarvestError::Cancelled) => Outcome::Skipped,
            Err(e) => {
                debug!("Enrichment fetch failed for {}: {}", url, e);
                Outcome::Failed
            }
        }
    }

    /// Best description on a page, or none worth keeping.
    ///
    /// Selector cascade first; list-bearing matches are joined item by item
    /// with ". " instead of taking raw block text. Candidates must land in
    /// the accepted length window and differ from the bare model name. The
    /// meta description is the final fallback, with its own tighter bound.
    fn description_from(&self, doc: &Html, model: &str) -> Option<String> {
        for (_, sel) in &self.selectors {
            let Some(el) = doc.select(sel).next() else { continue };

            let name = el.value().name();
            let text = if name == "ul" || name == "ol" || el.select(&self.list_item).next().is_some() {
                el.select(&self.list_item)
                    .map(normalized_text)
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
                    .join(". ")
            } else {
                normalized_text(el)
            };

            let text = text.trim();
            if text.len() > self.policy.min_len
                && text.len() < self.policy.max_len
                && !text.eq_ignore_ascii_case(model)
            {
                return Some(text.to_string());
            }
        }

        meta_description(doc).and_then(|meta| {
            let meta = meta.trim().to_string();
            let fits = meta.len() > self.policy.min_len
                && meta.len() < self.policy.meta_max_len
                && !meta.eq_ignore_ascii_case(model);
            fits.then_some(meta)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;

    use super::*;

    struct CannedFetch {
        pages: HashMap<String, String>,
    }

    #[async_trait]
    impl TextFetch for CannedFetch {
        async fn get_text(&self, url: &str, _cancel: &CancellationToken) -> HarvestResult<String> {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| HarvestError::navigation(url, "HTTP status 404".to_string()))
        }
    }

    fn enricher_with(pages: HashMap<String, String>) -> DescriptionEnricher {
        DescriptionEnricher::with_fetcher(
            &SelectorLibrary::default(),
            EnrichmentPolicy { batch_pause_ms: 0, ..EnrichmentPolicy::default() },
            Arc::new(CannedFetch { pages }),
        )
        .unwrap()
    }

    fn product(model: &str, url: &str) -> Product {
        Product::new("F", "S", "B", model, "https://cdn/img.jpg", url)
    }

    #[test]
    fn selector_cascade_beats_meta() {
        let enricher = enricher_with(HashMap::new());
        let doc = Html::parse_document(
            r#"<html><head><meta name="description" content="Meta text that is long enough"></head>
               <body><div class="product-description">Molded plywood shell with a leather seat pad.</div></body></html>"#,
        );
        assert_eq!(
            enricher.description_from(&doc, "Aero Chair").as_deref(),
            Some("Molded plywood shell with a leather seat pad.")
        );
    }

    #[test]
    fn list_blocks_join_with_periods() {
        let enricher = enricher_with(HashMap::new());
        let doc = Html::parse_document(
            r#"<div class="product-details"><ul>
                 <li>Width 62 cm</li>
                 <li>Oak veneer</li>
                 <li>Stackable</li>
               </ul></div>"#,
        );
        assert_eq!(
            enricher.description_from(&doc, "Aero Chair").as_deref(),
            Some("Width 62 cm. Oak veneer. Stackable")
        );
    }

    #[test]
    fn meta_fallback_applies_when_selectors_miss() {
        let enricher = enricher_with(HashMap::new());
        let doc = Html::parse_document(
            r#"<html><head><meta name="description" content="A forty character meta description here."></head>
               <body><h1>Aero Chair</h1></body></html>"#,
        );
        assert_eq!(
            enricher.description_from(&doc, "Aero Chair").as_deref(),
            Some("A forty character meta description here.")
        );
    }

    #[test]
    fn model_echoes_and_out_of_bound_texts_are_rejected() {
        let enricher = enricher_with(HashMap::new());

        let echo = Html::parse_document(r#"<div class="description">Aero Chair</div>"#);
        assert_eq!(enricher.description_from(&echo, "Aero Chair"), None);

        let short = Html::parse_document(r#"<div class="description">Too short.</div>"#);
        assert_eq!(enricher.description_from(&short, "Aero Chair"), None);

        let long_body = "word ".repeat(200);
        let long = Html::parse_document(&format!(r#"<div class="description">{long_body}</div>"#));
        assert_eq!(enricher.description_from(&long, "Aero Chair"), None);
    }

    #[tokio::test]
    async fn batches_apply_results_and_count_failures() {
        let mut pages = HashMap::new();
        pages.insert(
            "https://x/p/1".to_string(),
            r#"<div class="product-description">Solid ash frame with a woven cane back.</div>"#.to_string(),
        );
        // p/2 missing: fetch fails. p/3 has nothing usable.
        pages.insert("https://x/p/3".to_string(), "<html><body><h1>Three</h1></body></html>".to_string());

        let enricher = enricher_with(pages);
        let mut products =
            vec![product("One", "https://x/p/1"), product("Two", "https://x/p/2"), product("Three", "https://x/p/3"), product("NoUrl", "")];

        let report = enricher.enrich(&mut products, &CancellationToken::new()).await;
        assert_eq!(report.enriched, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(products[0].description, "Solid ash frame with a woven cane back.");
        assert_eq!(products[1].description, "Two");
        assert_eq!(products[3].description, "NoUrl");
    }

    #[tokio::test]
    async fn cancellation_stops_between_batches() {
        let mut pages = HashMap::new();
        for i in 0..10 {
            pages.insert(
                format!("https://x/p/{i}"),
                r#"<div class="product-description">Long enough description body text.</div>"#.to_string(),
            );
        }
        let enricher = enricher_with(pages);
        let mut products: Vec<Product> =
            (0..10).map(|i| product(&format!("P{i}"), &format!("https://x/p/{i}"))).collect();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = enricher.enrich(&mut products, &cancel).await;
        assert_eq!(report.enriched, 0);
        assert!(products.iter().all(|p| p.description.starts_with('P')));
    }
}

//! Generic harvest pipeline
//!
//! Drives the DISCOVERY and CATEGORY phases on arbitrary vendor sites. One
//! page session is reused serially for the whole run; every page goes
//! through the classifier/extractor pair, and category fan-out comes from
//! the link discoverer plus per-page pagination scanning.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use scraper::{Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use crate::application::ProgressChannel;
use crate::domain::{BrandInfo, CrawlPhase, CrawlTask, HarvestOutcome, HarvestSummary, Product, stage_labels};
use crate::infrastructure::backend::{PageFetchBackend, PageSession, page_base};
use crate::infrastructure::classifier::StructureClassifier;
use crate::infrastructure::config::HarvesterConfig;
use crate::infrastructure::config::utils::resolve_absolute;
use crate::infrastructure::dedup::{VisitedUrls, dedup_by_image_key, dedup_by_url_key};
use crate::infrastructure::enricher::DescriptionEnricher;
use crate::infrastructure::extractor::{BrandDetector, FieldExtractor};
use crate::infrastructure::link_discovery::LinkDiscoverer;
use crate::infrastructure::selectors::{SelectorLibrary, parse_patterns};
use crate::infrastructure::{HarvestError, HarvestResult};

pub struct GenericEngine {
    backend: Arc<dyn PageFetchBackend>,
    config: HarvesterConfig,
    lib: SelectorLibrary,
    classifier: StructureClassifier,
    extractor: FieldExtractor,
    discoverer: LinkDiscoverer,
    brand_detector: BrandDetector,
    pagination: Vec<(String, Selector)>,
}

impl GenericEngine {
    pub fn new(
        backend: Arc<dyn PageFetchBackend>,
        config: &HarvesterConfig,
        lib: &SelectorLibrary,
    ) -> HarvestResult<Self> {
        Ok(Self {
            backend,
            config: config.clone(),
            lib: lib.clone(),
            classifier: StructureClassifier::new(lib)?,
            extractor: FieldExtractor::new(lib)?,
            discoverer: LinkDiscoverer::new(lib),
            brand_detector: BrandDetector::new(lib)?,
            pagination: parse_patterns(&lib.pagination),
        })
    }

    /// Run a full generic harvest from `seed_url`.
    ///
    /// Page-level failures are logged and dropped; only a backend that
    /// cannot produce a session at all aborts the run. Cancellation stops
    /// scheduling and returns whatever was harvested so far.
    pub async fn run(&self, seed_url: &str, progress: &ProgressChannel) -> HarvestResult<HarvestOutcome> {
        progress.emit(5, stage_labels::INITIALIZING);

        let seed = Url::parse(seed_url)
            .map_err(|e| HarvestError::invalid_url(seed_url, e.to_string()))?;

        let mut session = self.backend.open_session().await?;
        let visited = VisitedUrls::new();
        visited.first_visit(seed.as_str());

        let mut brand = BrandInfo::unknown();
        let mut raw_products: Vec<Product> = Vec::new();
        let mut queue: VecDeque<CrawlTask> = VecDeque::new();
        let mut pages_fetched: u32 = 0;

        progress.emit(10, stage_labels::LOADING_BRAND_PAGE);
        match session.navigate(seed.as_str()).await {
            Ok(()) => {
                pages_fetched += 1;
                match session.content().await {
                    Ok(html) => {
                        let base = page_base(&mut session, &seed).await;
                        let (homepage_products, category_links) = {
                            let doc = Html::parse_document(&html);
                            brand.refine_name(&self.brand_detector.generic_brand(&doc));
                            if let Some(logo) = self.brand_detector.detect_logo(&doc, &base) {
                                brand.logo = logo;
                            }

                            // Best-effort homepage extraction alongside discovery.
                            let homepage = self.extract_page(&doc, &base, &brand.name, "");
                            let links = self
                                .discoverer
                                .discover(&doc, &base, self.config.crawl.max_category_links);
                            (homepage, links)
                        };

                        progress.emit_with_brand(15, stage_labels::DISCOVERING, &brand.name);
                        info!(
                            "Discovery: {} category links, {} homepage products",
                            category_links.len(),
                            homepage_products.len()
                        );

                        raw_products.extend(homepage_products);
                        for link in category_links {
                            if !same_site(&seed, &link.url) {
                                continue;
                            }
                            queue.push_back(
                                CrawlTask::new(link.url, CrawlPhase::Category)
                                    .with_context(brand.name.clone(), link.label),
                            );
                        }
                    }
                    Err(e) => warn!("Seed snapshot failed: {}", e),
                }
            }
            Err(e) => warn!("Seed page load failed, nothing to harvest: {}", e),
        }

        progress.emit_with_brand(20, stage_labels::EXTRACTING, &brand.name);

        while let Some(task) = queue.pop_front() {
            if progress.is_cancelled() {
                info!("Cancellation observed, stopping the category crawl");
                break;
            }
            if pages_fetched >= self.config.crawl.max_total_pages {
                info!("Page budget of {} reached", self.config.crawl.max_total_pages);
                break;
            }
            if !visited.first_visit(&task.url) {
                continue;
            }

            session.wait(self.config.crawl.request_delay_ms).await;
            if let Err(e) = session.navigate(&task.url).await {
                warn!("Category page {} dropped: {}", task.url, e);
                continue;
            }
            pages_fetched += 1;

            let html = match session.content().await {
                Ok(html) => html,
                Err(e) => {
                    warn!("Category snapshot {} dropped: {}", task.url, e);
                    continue;
                }
            };

            let task_url = Url::parse(&task.url).unwrap_or_else(|_| seed.clone());
            let base = page_base(&mut session, &task_url).await;
            let (page_products, next_pages) = {
                let doc = Html::parse_document(&html);
                let products = self.extract_page(&doc, &base, &brand.name, &task.label);
                let pagination =
                    self.pagination_links(&doc, &base, self.config.crawl.pagination_per_page);
                (products, pagination)
            };

            debug!("{} products on {}", page_products.len(), task.url);
            raw_products.extend(page_products);
            for next in next_pages {
                if same_site(&seed, &next) {
                    queue.push_back(
                        CrawlTask::new(next, CrawlPhase::Category)
                            .with_context(brand.name.clone(), task.label.clone()),
                    );
                }
            }

            let percent = 20 + (pages_fetched * 60 / self.config.crawl.max_total_pages.max(1)).min(60);
            progress.emit(percent as u8, stage_labels::EXTRACTING);
        }

        if let Err(e) = session.close().await {
            debug!("Session close failed: {}", e);
        }

        let total_found = raw_products.len();
        let mut products = dedup_by_image_key(raw_products, Some(&self.lib));

        let report = if progress.is_cancelled() {
            Default::default()
        } else {
            progress.emit(85, stage_labels::ENRICHING);
            let enricher = DescriptionEnricher::new(
                &self.lib,
                self.config.enrichment.clone(),
                &self.config.backend.user_agent,
            )?;
            let report = enricher.enrich(&mut products, &progress.cancel_token()).await;
            progress.emit(95, stage_labels::ENRICHING);
            report
        };

        let products = dedup_by_url_key(products);

        if !progress.is_cancelled() {
            progress.emit(100, stage_labels::COMPLETE);
        }
        info!(
            "Generic harvest done: {} found, {} unique, {} enriched",
            total_found,
            products.len(),
            report.enriched
        );

        Ok(HarvestOutcome {
            summary: HarvestSummary {
                total_found,
                unique: products.len(),
                enriched: report.enriched,
                failed_enrichment: report.failed,
            },
            products,
            brand_info: brand,
        })
    }

    fn extract_page(&self, doc: &Html, base: &Url, brand: &str, category: &str) -> Vec<Product> {
        let Some(winner) = self.classifier.best(doc) else {
            return Vec::new();
        };
        debug!("Container '{}' scored {:.1} ({} cards)", winner.selector, winner.score, winner.matched);
        match self.extractor.extract_from(doc, &winner.selector, base, brand, category) {
            Ok(products) => products,
            Err(e) => {
                warn!("Extraction with '{}' failed: {}", winner.selector, e);
                Vec::new()
            }
        }
    }

    fn pagination_links(&self, doc: &Html, base: &Url, cap: usize) -> Vec<String> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut links = Vec::new();
        for (_, sel) in &self.pagination {
            for anchor in doc.select(sel) {
                let href = anchor.value().attr("href").unwrap_or("").trim();
                if href.is_empty() || href.starts_with('#') || href.starts_with("javascript") {
                    continue;
                }
                let Some(url) = resolve_absolute(base, href) else { continue };
                if url == base.as_str() || !seen.insert(url.clone()) {
                    continue;
                }
                links.push(url);
                if links.len() >= cap {
                    return links;
                }
            }
        }
        links
    }
}

/// Same-site check used to keep category fan-out on the vendor's domain.
/// Subdomains of the seed host qualify; foreign hosts never do.
fn same_site(seed: &Url, candidate: &str) -> bool {
    let Ok(parsed) = Url::parse(candidate) else {
        return false;
    };
    let seed_host = seed.host_str().unwrap_or("").trim_start_matches("www.");
    let host = parsed.host_str().unwrap_or("").trim_start_matches("www.");
    if seed_host.is_empty() || host.is_empty() {
        return false;
    }
    host == seed_host || host.ends_with(&format!(".{seed_host}"))
}

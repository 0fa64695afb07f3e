//! Aggregator harvest pipeline
//!
//! Specialized crawl for the Architonic-style catalog platform. The START
//! page is expanded with a scripted scroll/load-more loop, COLLECTION pages
//! are walked serially with their own scroll stabilization, and PRODUCT
//! pages are fetched by a small worker pool that shares one block-detection
//! guard. DOM heuristics stay out of this file: everything page-structural
//! lives in [`ProductScraper`] so the crawl loop reads as scheduling only.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::join_all;
use scraper::{Html, Selector};
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, info, warn};
use url::Url;

use crate::application::ProgressChannel;
use crate::domain::{BrandInfo, HarvestOutcome, HarvestSummary, Product, stage_labels};
use crate::infrastructure::backend::{PageFetchBackend, PageSession, page_base};
use crate::infrastructure::blocking::{BlockGuard, heading_matches};
use crate::infrastructure::classifier::normalized_text;
use crate::infrastructure::config::{AggregatorProfile, BlockingPolicy, HarvesterConfig, utils};
use crate::infrastructure::dedup::{VisitedUrls, dedup_by_image_key};
use crate::infrastructure::extractor::{BrandDetector, meta_description};
use crate::infrastructure::selectors::{SelectorLibrary, parse_patterns};
use crate::infrastructure::{HarvestError, HarvestResult};

/// Scroll to the bottom and click one visible load-more control, then
/// report the document height so the caller can detect when the page has
/// stopped growing.
const DISCOVERY_SCROLL_SCRIPT: &str = r#"(() => {
  window.scrollTo(0, document.body.scrollHeight);
  const labels = ['load more', 'show more', 'view more'];
  const controls = Array.from(document.querySelectorAll('button, a'));
  for (const el of controls) {
    const text = (el.textContent || '').trim().toLowerCase();
    if (el.offsetParent !== null && labels.some(l => text.includes(l))) { el.click(); break; }
  }
  return document.body.scrollHeight;
})()"#;

pub struct AggregatorEngine {
    backend: Arc<dyn PageFetchBackend>,
    config: HarvesterConfig,
    profile: AggregatorProfile,
    brand_detector: BrandDetector,
    scraper: Arc<ProductScraper>,
    h1: Selector,
    title_tag: Selector,
    anchor: Selector,
    consent_script: String,
    collection_probe_script: String,
}

impl AggregatorEngine {
    pub fn new(
        backend: Arc<dyn PageFetchBackend>,
        config: &HarvesterConfig,
        lib: &SelectorLibrary,
    ) -> HarvestResult<Self> {
        let profile = config.aggregator.clone();
        Ok(Self {
            backend,
            config: config.clone(),
            brand_detector: BrandDetector::new(lib)?,
            scraper: Arc::new(ProductScraper::new(lib, &profile, &config.blocking)?),
            h1: parse("h1")?,
            title_tag: parse("title")?,
            anchor: parse("a[href]")?,
            consent_script: consent_script(&profile.consent_phrases),
            collection_probe_script: collection_probe_script(&profile.product_markers),
            profile,
        })
    }

    /// Run a full aggregator harvest from `seed_url`.
    ///
    /// The seed is normalized (`/products` tails become `/collections`)
    /// before the first navigation. A seed page that cannot be loaded
    /// yields an empty outcome rather than an error; per-page failures
    /// further down are logged and dropped. Cancellation stops scheduling
    /// and returns whatever was harvested so far.
    pub async fn run(&self, seed_url: &str, progress: &ProgressChannel) -> HarvestResult<HarvestOutcome> {
        progress.emit(5, stage_labels::INITIALIZING);

        let normalized = utils::normalize_seed(seed_url);
        let seed = Url::parse(&normalized)
            .map_err(|e| HarvestError::invalid_url(&normalized, e.to_string()))?;

        let mut session = self.backend.open_session().await?;
        let visited = Arc::new(VisitedUrls::new());
        let mut brand = BrandInfo::unknown();

        progress.emit(10, stage_labels::LOADING_BRAND_PAGE);
        if let Err(e) = session.navigate(seed.as_str()).await {
            warn!("Brand page {} failed to load, nothing to harvest: {}", seed, e);
            let _ = session.close().await;
            return Ok(HarvestOutcome::empty());
        }
        visited.first_visit(seed.as_str());

        self.dismiss_consent(&mut session).await;
        self.expand_start_page(&mut session).await;

        let html = match session.content().await {
            Ok(html) => html,
            Err(e) => {
                warn!("Brand page snapshot failed: {}", e);
                let _ = session.close().await;
                return Ok(HarvestOutcome::empty());
            }
        };
        let base = page_base(&mut session, &seed).await;

        let (collections, direct_products) = {
            let doc = Html::parse_document(&html);
            brand.refine_name(&self.brand_detector.aggregator_brand(&doc, &self.profile));
            if let Some(logo) = self.brand_detector.detect_logo(&doc, &base) {
                brand.logo = logo;
            }
            (
                self.collection_links(&doc, &base, &seed),
                self.product_links(&doc, &base, self.profile.max_direct_products),
            )
        };

        progress.emit_with_brand(15, stage_labels::DISCOVERING, &brand.name);
        info!(
            "Discovery for '{}': {} collections, {} featured products",
            brand.name,
            collections.len(),
            direct_products.len()
        );

        // Direct START-page products carry a fixed label; collection pages
        // stamp their own heading on everything they contribute.
        let mut product_tasks: Vec<(String, String)> = direct_products
            .into_iter()
            .map(|url| (url, "Featured".to_string()))
            .collect();

        let mut queue: VecDeque<String> = collections.into();
        let mut processed = 0usize;

        while let Some(coll_url) = queue.pop_front() {
            if progress.is_cancelled() {
                info!("Cancellation observed, stopping the collection walk");
                break;
            }
            if processed >= self.profile.max_collections {
                debug!("Collection budget of {} reached", self.profile.max_collections);
                break;
            }
            if !visited.first_visit(&coll_url) {
                continue;
            }
            processed += 1;

            session.wait(self.config.crawl.request_delay_ms).await;
            if let Err(e) = session.navigate(&coll_url).await {
                warn!("Collection {} dropped: {}", coll_url, e);
                continue;
            }
            let html = match session.content().await {
                Ok(html) => html,
                Err(e) => {
                    warn!("Collection snapshot {} dropped: {}", coll_url, e);
                    continue;
                }
            };
            let coll_base = page_base(&mut session, &seed).await;

            let (is_index_page, coll_name, pre_subs) = {
                let doc = Html::parse_document(&html);
                let title = self.first_text(&doc, &self.title_tag);
                let name = self
                    .heading_text(&doc)
                    .or_else(|| utils::slug_label(&coll_url))
                    .unwrap_or_else(|| "Collection".to_string());
                let is_index = self.profile.is_generic_products_page(&title, &coll_url);
                let subs = if is_index {
                    self.collection_links(&doc, &coll_base, &seed)
                } else {
                    Vec::new()
                };
                (is_index, name, subs)
            };

            if is_index_page {
                debug!("{} is a brand index page, {} sub-collections queued", coll_url, pre_subs.len());
                queue.extend(pre_subs);
                continue;
            }

            let percent = 20 + (processed * 30 / self.profile.max_collections.max(1)).min(30) as u8;
            progress.emit(percent, &stage_labels::processing_collection(&coll_name));

            self.expand_collection(&mut session).await;
            let html = if session.supports_interaction() {
                session.content().await.unwrap_or(html)
            } else {
                html
            };

            let (links, subs) = {
                let doc = Html::parse_document(&html);
                (
                    self.product_links(&doc, &coll_base, self.profile.max_products_per_collection),
                    self.collection_links(&doc, &coll_base, &seed),
                )
            };
            debug!("Collection '{}': {} products, {} sub-collections", coll_name, links.len(), subs.len());

            product_tasks.extend(links.into_iter().map(|url| (url, coll_name.clone())));
            queue.extend(subs);
        }

        if let Err(e) = session.close().await {
            debug!("Discovery session close failed: {}", e);
        }

        let raw_products = self
            .run_product_phase(product_tasks, Arc::clone(&visited), &brand.name, progress)
            .await;

        let total_found = raw_products.len();
        let products = dedup_by_image_key(raw_products, None);

        if !progress.is_cancelled() {
            progress.emit(100, stage_labels::COMPLETE);
        }
        info!(
            "Aggregator harvest done: {} collections walked, {} found, {} unique",
            processed,
            total_found,
            products.len()
        );

        Ok(HarvestOutcome {
            summary: HarvestSummary {
                total_found,
                unique: products.len(),
                enriched: 0,
                failed_enrichment: 0,
            },
            products,
            brand_info: brand,
        })
    }

    /// Fetch PRODUCT pages concurrently on a pool of `worker_slots`
    /// sessions. The pool and the block guard are shared; each worker
    /// checks out a session, scrapes one page, and returns it.
    async fn run_product_phase(
        &self,
        tasks: Vec<(String, String)>,
        visited: Arc<VisitedUrls>,
        brand: &str,
        progress: &ProgressChannel,
    ) -> Vec<Product> {
        if tasks.is_empty() || progress.is_cancelled() {
            return Vec::new();
        }

        let slots = self.config.crawl.effective_worker_slots().min(tasks.len());
        let mut pool: Vec<Box<dyn PageSession>> = Vec::new();
        for _ in 0..slots {
            match self.backend.open_session().await {
                Ok(session) => pool.push(session),
                Err(e) => warn!("Worker session unavailable: {}", e),
            }
        }
        if pool.is_empty() {
            warn!("No worker sessions could be opened; skipping {} product pages", tasks.len());
            return Vec::new();
        }

        let permits = pool.len();
        let total = tasks.len();
        info!("Product phase: {} pages on {} sessions", total, permits);

        let ctx = Arc::new(WorkerContext {
            scraper: Arc::clone(&self.scraper),
            sessions: Mutex::new(pool),
            guard: Mutex::new(BlockGuard::new(self.config.blocking.clone())),
            visited,
            brand: brand.to_string(),
            progress: progress.clone(),
            done: AtomicUsize::new(0),
            total,
        });
        let semaphore = Arc::new(Semaphore::new(permits));

        let mut handles = Vec::with_capacity(total);
        for (url, label) in tasks {
            let ctx = Arc::clone(&ctx);
            let semaphore = Arc::clone(&semaphore);
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await.ok()?;
                harvest_product(ctx, url, label).await
            }));
        }

        let mut products = Vec::new();
        for joined in join_all(handles).await {
            match joined {
                Ok(Some(product)) => products.push(product),
                Ok(None) => {}
                Err(e) => warn!("Product worker panicked: {}", e),
            }
        }

        let mut pool = ctx.sessions.lock().await;
        while let Some(mut session) = pool.pop() {
            if let Err(e) = session.close().await {
                debug!("Worker session close failed: {}", e);
            }
        }

        products
    }

    /// Best-effort dismissal of cookie/consent overlays before the first
    /// scroll. Non-interactive backends skip this entirely.
    async fn dismiss_consent(&self, session: &mut Box<dyn PageSession>) {
        if !session.supports_interaction() || self.profile.consent_phrases.is_empty() {
            return;
        }
        match session.evaluate(&self.consent_script).await {
            Ok(value) if value.as_bool() == Some(true) => {
                debug!("Consent overlay dismissed");
                session.wait(self.profile.scroll_settle_ms).await;
            }
            Ok(_) => {}
            Err(e) => debug!("Consent dismissal skipped: {}", e),
        }
    }

    /// Expand the START page until its height stops changing for
    /// `discovery_stable_rounds` consecutive iterations.
    async fn expand_start_page(&self, session: &mut Box<dyn PageSession>) {
        if !session.supports_interaction() {
            return;
        }
        let mut last_height: i64 = -1;
        let mut stable = 0u32;
        for round in 0..self.profile.discovery_scroll_cap {
            let height = match session.evaluate(DISCOVERY_SCROLL_SCRIPT).await {
                Ok(value) => script_number(&value),
                Err(e) => {
                    debug!("Discovery scroll round {} failed: {}", round, e);
                    break;
                }
            };
            if height == last_height {
                stable += 1;
                if stable >= self.profile.discovery_stable_rounds {
                    break;
                }
            } else {
                stable = 0;
                last_height = height;
            }
            session.wait(self.profile.scroll_settle_ms).await;
        }
    }

    /// Scroll a COLLECTION page until the number of product links stops
    /// growing for `collection_stable_rounds` consecutive iterations.
    async fn expand_collection(&self, session: &mut Box<dyn PageSession>) {
        if !session.supports_interaction() {
            return;
        }
        let mut last_count: i64 = -1;
        let mut stable = 0u32;
        for round in 0..self.profile.collection_scroll_cap {
            let count = match session.evaluate(&self.collection_probe_script).await {
                Ok(value) => script_number(&value),
                Err(e) => {
                    debug!("Collection scroll round {} failed: {}", round, e);
                    break;
                }
            };
            if count == last_count {
                stable += 1;
                if stable >= self.profile.collection_stable_rounds {
                    break;
                }
            } else {
                stable = 0;
                last_count = count;
            }
            session.wait(self.profile.scroll_settle_ms).await;
        }
    }

    /// Collection links on the page, deduplicated in document order, kept
    /// on the aggregator host, never the seed itself.
    fn collection_links(&self, doc: &Html, base: &Url, seed: &Url) -> Vec<String> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut links = Vec::new();
        for anchor in doc.select(&self.anchor) {
            let href = anchor.value().attr("href").unwrap_or("").trim();
            if href.is_empty() || !self.profile.is_collection_link(href) {
                continue;
            }
            let Some(url) = utils::resolve_absolute(base, href) else { continue };
            if !self.profile.matches_host(&url) || url == seed.as_str() {
                continue;
            }
            if seen.insert(url.clone()) {
                links.push(url);
            }
            if links.len() >= self.profile.max_collections {
                break;
            }
        }
        links
    }

    /// Product-detail links on the page, deduplicated in document order and
    /// capped at `cap`.
    fn product_links(&self, doc: &Html, base: &Url, cap: usize) -> Vec<String> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut links = Vec::new();
        for anchor in doc.select(&self.anchor) {
            let href = anchor.value().attr("href").unwrap_or("").trim();
            if href.is_empty() || !self.profile.is_product_link(href) {
                continue;
            }
            let Some(url) = utils::resolve_absolute(base, href) else { continue };
            if !self.profile.matches_host(&url) {
                continue;
            }
            if seen.insert(url.clone()) {
                links.push(url);
            }
            if links.len() >= cap {
                break;
            }
        }
        links
    }

    fn first_text(&self, doc: &Html, selector: &Selector) -> String {
        doc.select(selector).next().map(normalized_text).unwrap_or_default()
    }

    fn heading_text(&self, doc: &Html) -> Option<String> {
        doc.select(&self.h1).next().map(normalized_text).filter(|t| !t.is_empty())
    }
}

struct WorkerContext {
    scraper: Arc<ProductScraper>,
    sessions: Mutex<Vec<Box<dyn PageSession>>>,
    guard: Mutex<BlockGuard>,
    visited: Arc<VisitedUrls>,
    brand: String,
    progress: ProgressChannel,
    done: AtomicUsize,
    total: usize,
}

/// One PRODUCT page, start to finish: dedup gate, adaptive delay, session
/// checkout, scrape. Every task ticks the progress counter, including the
/// ones the visited set skips.
async fn harvest_product(ctx: Arc<WorkerContext>, url: String, label: String) -> Option<Product> {
    let product = harvest_product_inner(&ctx, &url, &label).await;

    let completed = ctx.done.fetch_add(1, Ordering::Relaxed) + 1;
    let percent = 50 + (completed * 45 / ctx.total.max(1)).min(45) as u8;
    ctx.progress.emit(percent, stage_labels::EXTRACTING);

    product
}

async fn harvest_product_inner(ctx: &WorkerContext, url: &str, label: &str) -> Option<Product> {
    if ctx.progress.is_cancelled() {
        return None;
    }
    if !ctx.visited.first_visit(url) {
        return None;
    }

    let delay = ctx.guard.lock().await.current_delay_ms();
    tokio::time::sleep(Duration::from_millis(delay)).await;

    let mut session = ctx.sessions.lock().await.pop()?;
    let product = scrape_product(ctx, session.as_mut(), url, label).await;
    ctx.sessions.lock().await.push(session);
    product
}

async fn scrape_product(
    ctx: &WorkerContext,
    session: &mut dyn PageSession,
    url: &str,
    label: &str,
) -> Option<Product> {
    if let Err(e) = session.navigate(url).await {
        warn!("Product page {} dropped: {}", url, e);
        return None;
    }
    let mut html = match session.content().await {
        Ok(html) => html,
        Err(e) => {
            warn!("Product snapshot {} dropped: {}", url, e);
            return None;
        }
    };

    // Product headings render late on this platform; poll until one shows
    // up or the round budget runs out.
    if session.supports_interaction() {
        for _ in 0..ctx.scraper.profile.heading_wait_rounds {
            if ctx.scraper.has_heading(&html) {
                break;
            }
            session.wait(ctx.scraper.profile.heading_wait_ms).await;
            match session.content().await {
                Ok(next) => html = next,
                Err(_) => break,
            }
        }
    }

    let page_url = match session.current_url().await {
        Ok(Some(current)) => Url::parse(&current).ok(),
        _ => None,
    }
    .or_else(|| Url::parse(url).ok())?;

    match ctx.scraper.read_page(&html, &page_url, label, &ctx.brand) {
        PageRead::Extracted(product) => {
            ctx.guard.lock().await.record_success();
            Some(product)
        }
        PageRead::Blocked(heading) => {
            debug!("Block heading on {}: {}", url, heading);
            let cooldown = {
                let mut guard = ctx.guard.lock().await;
                guard.record_block();
                guard.take_cooldown()
            };
            if let Some(ms) = cooldown {
                warn!("Cooling down {} ms after repeated blocks", ms);
                tokio::time::sleep(Duration::from_millis(ms)).await;
            }
            None
        }
        PageRead::Missing => {
            debug!("No product heading on {}", url);
            None
        }
    }
}

/// Outcome of reading one PRODUCT page snapshot.
enum PageRead {
    /// A complete product was assembled.
    Extracted(Product),
    /// The heading matched a block marker; counts toward the back-off
    /// streak.
    Blocked(String),
    /// No usable heading; the page is skipped without touching the streak.
    Missing,
}

/// All DOM heuristics for aggregator PRODUCT pages. Pure and synchronous;
/// parsed documents never cross an await point.
struct ProductScraper {
    profile: AggregatorProfile,
    block_markers: Vec<String>,
    h1: Selector,
    h2: Selector,
    any_image: Selector,
    active_images: Vec<(String, Selector)>,
    main_images: Vec<(String, Selector)>,
    content_blocks: Vec<(String, Selector)>,
    attribute_blocks: Selector,
}

impl ProductScraper {
    fn new(
        lib: &SelectorLibrary,
        profile: &AggregatorProfile,
        blocking: &BlockingPolicy,
    ) -> HarvestResult<Self> {
        Ok(Self {
            profile: profile.clone(),
            block_markers: blocking.markers.clone(),
            h1: parse("h1")?,
            h2: parse("h2")?,
            any_image: parse("img")?,
            active_images: parse_patterns(&lib.active_images),
            main_images: parse_patterns(&lib.main_images),
            content_blocks: parse_patterns(&lib.content_blocks),
            attribute_blocks: parse(&lib.attribute_blocks)?,
        })
    }

    fn has_heading(&self, html: &str) -> bool {
        let doc = Html::parse_document(html);
        doc.select(&self.h1).next().map(|h| !normalized_text(h).is_empty()).unwrap_or(false)
    }

    /// Assemble a [`Product`] from one PRODUCT page snapshot.
    ///
    /// The H1 heading is mandatory; a missing image is replaced by the
    /// profile placeholder so the item survives (the generic denylist does
    /// not run on aggregator output). The URL's trailing variant id turns
    /// `name` into `name #id` so color/size variants stay distinct.
    fn read_page(&self, html: &str, page_url: &Url, collection: &str, brand: &str) -> PageRead {
        let doc = Html::parse_document(html);

        let name = match doc.select(&self.h1).next().map(normalized_text) {
            Some(text) if !text.is_empty() => text,
            _ => return PageRead::Missing,
        };
        if heading_matches(&self.block_markers, &name) {
            return PageRead::Blocked(name);
        }

        let image_url = self
            .product_image(&doc, page_url)
            .unwrap_or_else(|| self.profile.placeholder_image.clone());

        let mut description = self.describe(&doc, &name);
        if let Some(subtitle) = self.variant_subtitle(&doc, &name) {
            if !description.to_lowercase().contains(&subtitle.to_lowercase()) {
                description = format!("{subtitle} | {description}");
            }
        }

        let model = match utils::variant_id(page_url.as_str()) {
            Some(id) => format!("{name} #{id}"),
            None => name,
        };

        let mut product = Product::new(
            &self.profile.main_category,
            collection,
            brand,
            model,
            image_url,
            page_url.as_str(),
        );
        product.description = description;
        PageRead::Extracted(product)
    }

    /// Four-strategy image cascade: active carousel entries on the
    /// platform's own host, anything under the product imagery path, the
    /// fixed main-image selectors, and finally any host image that is not
    /// a logo. Family thumbnails never qualify.
    fn product_image(&self, doc: &Html, page_url: &Url) -> Option<String> {
        let domain = self.profile.domains.first().map(String::as_str).unwrap_or("");
        let on_host = |src: &str| !domain.is_empty() && src.contains(domain);

        for (_, sel) in &self.active_images {
            for img in doc.select(sel) {
                let src = img.value().attr("src").unwrap_or("").trim();
                if src.is_empty() {
                    continue;
                }
                if on_host(src) && !src.contains(&self.profile.family_thumb_marker) {
                    return utils::resolve_absolute(page_url, src);
                }
            }
        }

        for img in doc.select(&self.any_image) {
            let src = img.value().attr("src").unwrap_or("").trim();
            if src.is_empty() {
                continue;
            }
            if src.contains(&self.profile.product_image_path) && on_host(src) {
                return utils::resolve_absolute(page_url, src);
            }
        }

        for (_, sel) in &self.main_images {
            let Some(img) = doc.select(sel).next() else { continue };
            let src = img.value().attr("src").unwrap_or("").trim();
            if src.starts_with("http") && !src.contains(&self.profile.family_thumb_marker) {
                return utils::resolve_absolute(page_url, src);
            }
        }

        for img in doc.select(&self.any_image) {
            let src = img.value().attr("src").unwrap_or("").trim();
            if src.is_empty() {
                continue;
            }
            if on_host(src) && !src.to_lowercase().contains("logo") {
                return utils::resolve_absolute(page_url, src);
            }
        }

        None
    }

    /// Description cascade: meta description, else the joined attribute
    /// rows, else the first content block over 30 characters, else the
    /// product name. A stage only runs while the accumulated text is
    /// under 50 characters.
    fn describe(&self, doc: &Html, name: &str) -> String {
        let mut description = meta_description(doc).unwrap_or_default();

        if description.len() < 50 {
            let parts: Vec<String> = doc
                .select(&self.attribute_blocks)
                .map(normalized_text)
                .filter(|text| !text.is_empty())
                .collect();
            if !parts.is_empty() {
                description = parts.join(" | ");
            }
        }

        if description.len() < 50 {
            for (_, sel) in &self.content_blocks {
                let Some(el) = doc.select(sel).next() else { continue };
                let text = normalized_text(el);
                if text.len() > 30 {
                    description = text;
                    break;
                }
            }
        }

        if description.is_empty() { name.to_string() } else { description }
    }

    /// Variant sub-title under the main heading, prepended to the
    /// description when it adds information.
    fn variant_subtitle(&self, doc: &Html, name: &str) -> Option<String> {
        let subtitle = doc.select(&self.h2).next().map(normalized_text)?;
        let len = subtitle.chars().count();
        (len > 2 && len < 120 && !subtitle.eq_ignore_ascii_case(name)).then_some(subtitle)
    }
}

fn parse(pattern: &str) -> HarvestResult<Selector> {
    Selector::parse(pattern).map_err(|e| HarvestError::Selector(format!("{pattern}: {e:?}")))
}

fn script_number(value: &serde_json::Value) -> i64 {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
        .unwrap_or(-1)
}

fn consent_script(phrases: &[String]) -> String {
    let list = serde_json::to_string(phrases).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"(() => {{
  const phrases = {list};
  const controls = Array.from(document.querySelectorAll('button, a, [role="button"]'));
  for (const el of controls) {{
    const text = (el.textContent || '').trim().toLowerCase();
    if (el.offsetParent !== null && phrases.some(p => text.includes(p))) {{ el.click(); return true; }}
  }}
  return false;
}})()"#
    )
}

fn collection_probe_script(markers: &[String]) -> String {
    let list = serde_json::to_string(markers).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"(() => {{
  window.scrollTo(0, document.body.scrollHeight);
  const markers = {list};
  const anchors = Array.from(document.querySelectorAll('a[href]'));
  return anchors.filter(a => markers.some(m => (a.getAttribute('href') || '').includes(m))).length;
}})()"#
    )
}

//! Configuration infrastructure
//!
//! Contains configuration loading and management for harvest runs.
//!
//! Configuration is organized by concern:
//! 1. Backend selection and session settings
//! 2. Generic crawl limits
//! 3. Anti-blocking policy
//! 4. Description enrichment policy
//! 5. The aggregator site profile (pattern data, not code)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;

/// Complete harvester configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvesterConfig {
    /// Execution backend selection and session settings.
    pub backend: BackendConfig,

    /// Generic-pipeline crawl limits.
    pub crawl: CrawlLimits,

    /// Block detection and back-off policy.
    pub blocking: BlockingPolicy,

    /// Description enrichment policy.
    pub enrichment: EnrichmentPolicy,

    /// Aggregator site profile (URL patterns, phrase lists, loop bounds).
    pub aggregator: AggregatorProfile,

    /// Logging output settings.
    pub logging: LoggingConfig,
}

/// Which page-fetch backend executes the harvest.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Locally launched headless Chromium.
    #[default]
    LocalBrowser,
    /// Remote Chromium reached over a CDP websocket (cloud browser service).
    CloudBrowser,
    /// Plain HTML fetch through a rendering proxy; no page interaction.
    ProxyFetch,
}

/// Backend selection and per-session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,

    /// User agent presented by every backend.
    pub user_agent: String,

    /// Navigation timeout in milliseconds.
    pub nav_timeout_ms: u64,

    /// Script evaluation timeout in milliseconds.
    pub eval_timeout_ms: u64,

    /// Settle time after navigation before the first snapshot.
    pub settle_ms: u64,

    /// Extra Chromium arguments for the local browser.
    pub extra_chrome_args: Vec<String>,

    /// CDP websocket URL for the cloud browser (token included by the
    /// operator, e.g. `wss://chrome.example.com?token=...`).
    pub cloud_ws_url: Option<String>,

    /// Rendering-proxy endpoint for the proxy backend.
    pub proxy_endpoint: Option<String>,

    /// API key sent to the rendering proxy.
    pub proxy_api_key: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::LocalBrowser,
            user_agent: defaults::USER_AGENT.to_string(),
            nav_timeout_ms: defaults::NAV_TIMEOUT_MS,
            eval_timeout_ms: defaults::EVAL_TIMEOUT_MS,
            settle_ms: defaults::SETTLE_MS,
            extra_chrome_args: Vec::new(),
            cloud_ws_url: None,
            proxy_endpoint: None,
            proxy_api_key: None,
        }
    }
}

/// Limits for the generic pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlLimits {
    /// Hard cap on pages fetched in one run.
    pub max_total_pages: u32,

    /// Category links taken from DISCOVERY.
    pub max_category_links: usize,

    /// Pagination links enqueued per CATEGORY page.
    pub pagination_per_page: usize,

    /// Concurrent page sessions for the aggregator PRODUCT phase,
    /// clamped to 1..=3.
    pub worker_slots: usize,

    /// Delay between page fetches in milliseconds.
    pub request_delay_ms: u64,
}

impl Default for CrawlLimits {
    fn default() -> Self {
        Self {
            max_total_pages: defaults::MAX_TOTAL_PAGES,
            max_category_links: defaults::MAX_CATEGORY_LINKS,
            pagination_per_page: defaults::PAGINATION_PER_PAGE,
            worker_slots: defaults::WORKER_SLOTS,
            request_delay_ms: defaults::REQUEST_DELAY_MS,
        }
    }
}

impl CrawlLimits {
    /// Worker slots bounded to the range the target sites tolerate.
    pub fn effective_worker_slots(&self) -> usize {
        self.worker_slots.clamp(1, 3)
    }
}

/// Block detection and adaptive back-off.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockingPolicy {
    /// Base delay before each PRODUCT fetch in milliseconds.
    pub base_delay_ms: u64,

    /// Added delay per consecutive block.
    pub delay_increment_ms: u64,

    /// Consecutive blocks that trigger the cooldown.
    pub threshold: u32,

    /// Cooldown sleep in milliseconds once the threshold is hit.
    pub cooldown_ms: u64,

    /// Case-insensitive substrings that classify a heading as a block page.
    pub markers: Vec<String>,
}

impl Default for BlockingPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: defaults::BLOCK_BASE_DELAY_MS,
            delay_increment_ms: defaults::BLOCK_DELAY_INCREMENT_MS,
            threshold: defaults::BLOCK_THRESHOLD,
            cooldown_ms: defaults::BLOCK_COOLDOWN_MS,
            markers: defaults::BLOCK_MARKERS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Description enrichment policy (generic pipeline only).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentPolicy {
    /// Products fetched concurrently per batch.
    pub batch_size: usize,

    /// Pause between batches in milliseconds.
    pub batch_pause_ms: u64,

    /// Accepted description length bounds (exclusive).
    pub min_len: usize,
    pub max_len: usize,

    /// Meta-description fallback upper bound (exclusive).
    pub meta_max_len: usize,

    /// Plain-HTTP request timeout in milliseconds.
    pub request_timeout_ms: u64,

    /// Rate limit for enrichment fetches.
    pub requests_per_second: u32,

    /// Further attempts after a failed fetch.
    pub max_retries: u32,

    /// Back-off unit between attempts; attempt N sleeps N times this.
    pub retry_delay_ms: u64,
}

impl Default for EnrichmentPolicy {
    fn default() -> Self {
        Self {
            batch_size: defaults::ENRICH_BATCH_SIZE,
            batch_pause_ms: defaults::ENRICH_BATCH_PAUSE_MS,
            min_len: defaults::ENRICH_MIN_LEN,
            max_len: defaults::ENRICH_MAX_LEN,
            meta_max_len: defaults::ENRICH_META_MAX_LEN,
            request_timeout_ms: defaults::ENRICH_TIMEOUT_MS,
            requests_per_second: defaults::ENRICH_REQUESTS_PER_SECOND,
            max_retries: defaults::ENRICH_MAX_RETRIES,
            retry_delay_ms: defaults::ENRICH_RETRY_DELAY_MS,
        }
    }
}

/// Logging output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base log level: trace, debug, info, warn, error.
    pub level: String,

    /// Write human-readable output to the console.
    pub console_output: bool,

    /// Write rotating log files alongside the executable.
    pub file_output: bool,

    /// Override for the log directory; defaults to `<exe dir>/logs`.
    pub directory: Option<PathBuf>,

    /// File name prefix for the rolling appender.
    pub file_name_prefix: String,

    /// Extra per-module filter directives, e.g. `chromiumoxide=warn`.
    pub module_filters: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            console_output: true,
            file_output: true,
            directory: None,
            file_name_prefix: defaults::LOG_FILE_PREFIX.to_string(),
            module_filters: to_strings(defaults::LOG_MODULE_FILTERS),
        }
    }
}

/// Pattern data describing the known aggregator platform.
///
/// Everything here is empirically tuned site data, not an invariant: the
/// defaults come from the `architonic` constants module and every field can
/// be overridden from the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorProfile {
    /// Host substrings that route a seed URL to the specialized pipeline.
    pub domains: Vec<String>,

    /// Href substrings marking collection links.
    pub collection_markers: Vec<String>,

    /// Href substrings marking product-detail links.
    pub product_markers: Vec<String>,

    /// URL tails that identify low-signal "all products"/"all collections"
    /// index pages rather than a real collection.
    pub excluded_tails: Vec<String>,

    /// Phrases stripped from H1 text during brand detection.
    pub brand_boilerplate: Vec<String>,

    /// Breadcrumb entries too generic to be a brand name.
    pub generic_crumbs: Vec<String>,

    /// Title phrases identifying a generic "products by brand" page that
    /// must only be mined for sub-collection links.
    pub generic_page_titles: Vec<String>,

    /// Brand name used when every detection signal fails.
    pub fallback_brand: String,

    /// The aggregator's own name, stripped from page titles.
    pub site_name: String,

    /// Image substituted when a PRODUCT page has a valid title but no
    /// usable image.
    pub placeholder_image: String,

    /// Path marker of family/group thumbnails that must never be used as a
    /// product image.
    pub family_thumb_marker: String,

    /// Path marker of genuine product imagery.
    pub product_image_path: String,

    /// Main category stamped on every aggregator product.
    pub main_category: String,

    /// Expand-and-scroll loop bounds for the START phase.
    pub discovery_scroll_cap: u32,
    pub discovery_stable_rounds: u32,

    /// Scroll loop bounds for COLLECTION pages.
    pub collection_scroll_cap: u32,
    pub collection_stable_rounds: u32,

    /// Fan-out caps.
    pub max_collections: usize,
    pub max_products_per_collection: usize,
    pub max_direct_products: usize,

    /// Heading-wait polling on PRODUCT pages.
    pub heading_wait_rounds: u32,
    pub heading_wait_ms: u64,

    /// Pause between scroll iterations.
    pub scroll_settle_ms: u64,

    /// Phrases matched against visible controls when dismissing
    /// cookie/consent overlays.
    pub consent_phrases: Vec<String>,
}

impl Default for AggregatorProfile {
    fn default() -> Self {
        Self {
            domains: vec![architonic::DOMAIN.to_string()],
            collection_markers: to_strings(architonic::COLLECTION_MARKERS),
            product_markers: to_strings(architonic::PRODUCT_MARKERS),
            excluded_tails: to_strings(architonic::EXCLUDED_TAILS),
            brand_boilerplate: to_strings(architonic::BRAND_BOILERPLATE),
            generic_crumbs: to_strings(architonic::GENERIC_CRUMBS),
            generic_page_titles: to_strings(architonic::GENERIC_PAGE_TITLES),
            fallback_brand: architonic::FALLBACK_BRAND.to_string(),
            site_name: architonic::SITE_NAME.to_string(),
            placeholder_image: architonic::PLACEHOLDER_IMAGE.to_string(),
            family_thumb_marker: architonic::FAMILY_THUMB_MARKER.to_string(),
            product_image_path: architonic::PRODUCT_IMAGE_PATH.to_string(),
            main_category: architonic::MAIN_CATEGORY.to_string(),
            discovery_scroll_cap: defaults::DISCOVERY_SCROLL_CAP,
            discovery_stable_rounds: defaults::DISCOVERY_STABLE_ROUNDS,
            collection_scroll_cap: defaults::COLLECTION_SCROLL_CAP,
            collection_stable_rounds: defaults::COLLECTION_STABLE_ROUNDS,
            max_collections: defaults::MAX_COLLECTIONS,
            max_products_per_collection: defaults::MAX_PRODUCTS_PER_COLLECTION,
            max_direct_products: defaults::MAX_DIRECT_PRODUCTS,
            heading_wait_rounds: defaults::HEADING_WAIT_ROUNDS,
            heading_wait_ms: defaults::HEADING_WAIT_MS,
            scroll_settle_ms: defaults::SCROLL_SETTLE_MS,
            consent_phrases: to_strings(defaults::CONSENT_PHRASES),
        }
    }
}

impl AggregatorProfile {
    /// True when the seed URL belongs to the aggregator platform.
    pub fn matches_host(&self, url: &str) -> bool {
        let Ok(parsed) = url::Url::parse(url) else {
            return false;
        };
        let host = parsed.host_str().unwrap_or("");
        self.domains.iter().any(|d| host == d || host.ends_with(&format!(".{d}")))
    }

    pub fn is_collection_link(&self, href: &str) -> bool {
        self.collection_markers.iter().any(|m| href.contains(m.as_str()))
            && !self.excluded_tails.iter().any(|t| href.trim_end_matches('/').ends_with(t.as_str()))
    }

    pub fn is_product_link(&self, href: &str) -> bool {
        self.product_markers.iter().any(|m| href.contains(m.as_str()))
    }

    /// Generic "products by brand" pages merge every category and must only
    /// be mined for sub-collection links.
    pub fn is_generic_products_page(&self, title: &str, url: &str) -> bool {
        let title_hit = self
            .generic_page_titles
            .iter()
            .any(|p| title.to_lowercase().contains(&p.to_lowercase()));
        let url_hit = self
            .excluded_tails
            .iter()
            .any(|t| url.trim_end_matches('/').ends_with(t.as_str()));
        title_hit || url_hit
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Configuration manager for loading and saving settings.
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// Get the application configuration directory.
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join("catalog-harvester");

        Ok(config_dir)
    }

    pub fn new() -> Result<Self> {
        let config_path = Self::get_config_dir()?.join("harvester_config.json");
        Ok(Self { config_path })
    }

    pub fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// Load configuration, creating the default file on first run.
    pub async fn load(&self) -> Result<HarvesterConfig> {
        if !self.config_path.exists() {
            info!("Configuration file not found, creating default: {:?}", self.config_path);
            let default_config = HarvesterConfig::default();
            self.save(&default_config).await?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .context("Failed to read configuration file")?;
        let cfg = serde_json::from_str::<HarvesterConfig>(&content)
            .with_context(|| format!("Failed to parse configuration {:?}", self.config_path))?;
        info!("Loaded configuration from: {:?}", self.config_path);
        Ok(cfg)
    }

    pub async fn save(&self, cfg: &HarvesterConfig) -> Result<()> {
        if let Some(dir) = self.config_path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir).await.context("Failed to create config directory")?;
                info!("✅ Created configuration directory: {:?}", dir);
            }
        }
        let content = serde_json::to_string_pretty(cfg).context("Failed to serialize configuration")?;
        fs::write(&self.config_path, content)
            .await
            .context("Failed to write configuration file")?;
        Ok(())
    }
}

impl HarvesterConfig {
    /// Load with layered overrides: built-in defaults, then an optional
    /// file, then `HARVESTER_`-prefixed environment variables
    /// (e.g. `HARVESTER_CRAWL__MAX_TOTAL_PAGES=10`).
    pub fn load_layered(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder().add_source(
            config::Config::try_from(&Self::default()).context("Failed to seed default configuration")?,
        );

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(config::Environment::with_prefix("HARVESTER").separator("__"));

        let cfg = builder
            .build()
            .context("Failed to assemble configuration")?
            .try_deserialize::<Self>()
            .context("Configuration has invalid values")?;
        Ok(cfg)
    }
}

/// Constants for the Architonic aggregator platform.
///
/// These encode one platform's URL scheme and markup habits as observed in
/// production; they drift as the platform changes and are surfaced through
/// `AggregatorProfile` so deployments can override them without a rebuild.
pub mod architonic {
    /// Aggregator host.
    pub const DOMAIN: &str = "architonic.com";

    /// Base URL for building absolute links.
    pub const BASE_URL: &str = "https://www.architonic.com";

    /// Href substrings identifying collection pages.
    pub const COLLECTION_MARKERS: &[&str] =
        &["/collection/", "/collections/", "/category/", "/product-group/"];

    /// Href substrings identifying product-detail pages.
    pub const PRODUCT_MARKERS: &[&str] = &["/p/", "/product/"];

    /// Index-page tails that merge all categories (low-signal pages).
    pub const EXCLUDED_TAILS: &[&str] = &["/collections", "/products"];

    /// Boilerplate stripped from brand-page H1 text.
    pub const BRAND_BOILERPLATE: &[&str] =
        &["Collections by", "Products by", "Collections", "Products"];

    /// Breadcrumb entries that are never a brand name.
    pub const GENERIC_CRUMBS: &[&str] = &["home", "brands", "products", "collections"];

    /// Title phrases of generic "products by brand" pages.
    pub const GENERIC_PAGE_TITLES: &[&str] = &["Products by"];

    /// Brand name of last resort.
    pub const FALLBACK_BRAND: &str = "Architonic Brand";

    /// The site's own name as it appears in page titles.
    pub const SITE_NAME: &str = "Architonic";

    /// Substituted when a product page has a valid name but no image.
    pub const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/400x300?text=No+Image";

    /// Family/group thumbnail path, never a product image.
    pub const FAMILY_THUMB_MARKER: &str = "/family/";

    /// Path under which genuine product imagery is served.
    pub const PRODUCT_IMAGE_PATH: &str = "/product/";

    /// Category stamped on every aggregator product.
    pub const MAIN_CATEGORY: &str = "Furniture";
}

pub mod defaults {
    /// Default user agent for every backend.
    pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

    /// Default navigation timeout in milliseconds.
    pub const NAV_TIMEOUT_MS: u64 = 30_000;

    /// Default script evaluation timeout in milliseconds.
    pub const EVAL_TIMEOUT_MS: u64 = 10_000;

    /// Default settle time after navigation in milliseconds.
    pub const SETTLE_MS: u64 = 1_000;

    /// Default hard cap on pages per generic run.
    pub const MAX_TOTAL_PAGES: u32 = 30;

    /// Default category links taken from DISCOVERY.
    pub const MAX_CATEGORY_LINKS: usize = 20;

    /// Default pagination links enqueued per CATEGORY page.
    pub const PAGINATION_PER_PAGE: usize = 5;

    /// Default concurrent PRODUCT sessions.
    pub const WORKER_SLOTS: usize = 1;

    /// Default delay between page fetches in milliseconds.
    pub const REQUEST_DELAY_MS: u64 = 1_000;

    /// Default base delay before PRODUCT fetches in milliseconds.
    pub const BLOCK_BASE_DELAY_MS: u64 = 2_000;

    /// Default added delay per consecutive block.
    pub const BLOCK_DELAY_INCREMENT_MS: u64 = 3_000;

    /// Default consecutive-block threshold.
    pub const BLOCK_THRESHOLD: u32 = 3;

    /// Default cooldown once the threshold is hit.
    pub const BLOCK_COOLDOWN_MS: u64 = 15_000;

    /// Default heading substrings classifying a block page.
    pub const BLOCK_MARKERS: &[&str] = &["403", "error", "forbidden", "access denied", "blocked"];

    /// Default enrichment batch size.
    pub const ENRICH_BATCH_SIZE: usize = 5;

    /// Default pause between enrichment batches in milliseconds.
    pub const ENRICH_BATCH_PAUSE_MS: u64 = 200;

    /// Default accepted description length bounds (exclusive).
    pub const ENRICH_MIN_LEN: usize = 15;
    pub const ENRICH_MAX_LEN: usize = 800;

    /// Default meta-description upper bound (exclusive).
    pub const ENRICH_META_MAX_LEN: usize = 500;

    /// Default enrichment request timeout in milliseconds.
    pub const ENRICH_TIMEOUT_MS: u64 = 10_000;

    /// Default enrichment rate limit.
    pub const ENRICH_REQUESTS_PER_SECOND: u32 = 5;

    /// Default further attempts after a failed enrichment fetch.
    pub const ENRICH_MAX_RETRIES: u32 = 2;

    /// Default back-off unit between enrichment attempts.
    pub const ENRICH_RETRY_DELAY_MS: u64 = 500;

    /// Default START-phase scroll loop bounds.
    pub const DISCOVERY_SCROLL_CAP: u32 = 300;
    pub const DISCOVERY_STABLE_ROUNDS: u32 = 5;

    /// Default COLLECTION scroll loop bounds.
    pub const COLLECTION_SCROLL_CAP: u32 = 50;
    pub const COLLECTION_STABLE_ROUNDS: u32 = 3;

    /// Default fan-out caps.
    pub const MAX_COLLECTIONS: usize = 20;
    pub const MAX_PRODUCTS_PER_COLLECTION: usize = 50;
    pub const MAX_DIRECT_PRODUCTS: usize = 50;

    /// Default heading-wait polling on PRODUCT pages.
    pub const HEADING_WAIT_ROUNDS: u32 = 10;
    pub const HEADING_WAIT_MS: u64 = 500;

    /// Default pause between scroll iterations.
    pub const SCROLL_SETTLE_MS: u64 = 400;

    /// Default consent-dismissal phrases.
    pub const CONSENT_PHRASES: &[&str] =
        &["accept", "agree", "got it", "allow", "ok", "close", "continue"];

    /// Default base log level.
    pub const LOG_LEVEL: &str = "info";

    /// Default rolling log file prefix.
    pub const LOG_FILE_PREFIX: &str = "harvester";

    /// Default per-module filter directives for noisy dependencies.
    pub const LOG_MODULE_FILTERS: &[&str] = &[
        "chromiumoxide=warn",
        "chromiumoxide_cdp=warn",
        "hyper=warn",
        "hyper_util=warn",
        "reqwest=warn",
        "html5ever=error",
        "selectors=warn",
        "tungstenite=warn",
    ];
}

/// URL helpers shared by the engines.
pub mod utils {
    use once_cell::sync::Lazy;
    use regex::Regex;

    static VARIANT_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"-(\d+)$").expect("valid regex"));

    /// Rewrite a low-signal "all products" seed to the collections view.
    pub fn normalize_seed(url: &str) -> String {
        let trimmed = url.trim_end_matches('/');
        if trimmed.ends_with("/products") {
            format!("{}/collections", trimmed.trim_end_matches("/products"))
        } else {
            url.to_string()
        }
    }

    /// Numeric variant id embedded in the final path segment, e.g.
    /// `/p/lounge-chair-20156` → `20156`.
    pub fn variant_id(url: &str) -> Option<String> {
        let last = url.trim_end_matches('/').rsplit('/').next()?;
        VARIANT_ID
            .captures(last)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Human-readable label derived from a URL's final path segment.
    pub fn slug_label(url: &str) -> Option<String> {
        let last = url.trim_end_matches('/').rsplit('/').next()?;
        let without_id = VARIANT_ID.replace(last, "");
        let label = without_id.replace(['-', '_'], " ").trim().to_string();
        if label.is_empty() { None } else { Some(label) }
    }

    /// Resolve `href` against `base`, keeping only http(s) results.
    pub fn resolve_absolute(base: &url::Url, href: &str) -> Option<String> {
        let resolved = base.join(href).ok()?;
        matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_matches_aggregator_host() {
        let profile = AggregatorProfile::default();
        assert!(profile.matches_host("https://www.architonic.com/en/b/vitra/"));
        assert!(profile.matches_host("https://architonic.com/en/b/vitra/"));
        assert!(!profile.matches_host("https://example-furniture.com/"));
    }

    #[test]
    fn collection_marker_excludes_index_tails() {
        let profile = AggregatorProfile::default();
        assert!(profile.is_collection_link("https://www.architonic.com/en/collection/vitra-chairs/3"));
        assert!(!profile.is_collection_link("https://www.architonic.com/en/b/vitra/collections"));
        assert!(profile.is_product_link("https://www.architonic.com/en/p/vitra-chair-1001"));
    }

    #[test]
    fn generic_products_page_detected_by_title_or_url() {
        let profile = AggregatorProfile::default();
        assert!(profile.is_generic_products_page("Products by Acme", "https://x/collection/acme"));
        assert!(profile.is_generic_products_page("Acme", "https://x/b/acme/products"));
        assert!(!profile.is_generic_products_page("Aero Chair", "https://x/collection/aero/9"));
    }

    #[test]
    fn seed_normalization_rewrites_products_tail() {
        assert_eq!(
            utils::normalize_seed("https://www.architonic.com/en/b/vitra/products/"),
            "https://www.architonic.com/en/b/vitra/collections"
        );
        assert_eq!(
            utils::normalize_seed("https://www.architonic.com/en/b/vitra/collections"),
            "https://www.architonic.com/en/b/vitra/collections"
        );
    }

    #[test]
    fn variant_id_comes_from_last_segment() {
        assert_eq!(utils::variant_id("https://x/p/aero-chair-20156").as_deref(), Some("20156"));
        assert_eq!(utils::variant_id("https://x/p/aero-chair-20156/").as_deref(), Some("20156"));
        assert_eq!(utils::variant_id("https://x/p/aero-chair"), None);
    }

    #[test]
    fn slug_label_strips_id_and_separators() {
        assert_eq!(utils::slug_label("https://x/collection/office-seating-391").as_deref(), Some("office seating"));
        assert_eq!(utils::slug_label("https://x/collection/lounge_tables").as_deref(), Some("lounge tables"));
    }

    #[test]
    fn worker_slots_are_clamped() {
        let mut limits = CrawlLimits::default();
        limits.worker_slots = 9;
        assert_eq!(limits.effective_worker_slots(), 3);
        limits.worker_slots = 0;
        assert_eq!(limits.effective_worker_slots(), 1);
    }

    #[tokio::test]
    async fn config_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_path(dir.path().join("harvester_config.json"));

        let mut cfg = HarvesterConfig::default();
        cfg.crawl.max_total_pages = 7;
        manager.save(&cfg).await.unwrap();

        let loaded = manager.load().await.unwrap();
        assert_eq!(loaded.crawl.max_total_pages, 7);
        assert_eq!(loaded.blocking.threshold, defaults::BLOCK_THRESHOLD);
    }

    #[tokio::test]
    async fn first_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harvester_config.json");
        let manager = ConfigManager::with_path(path.clone());

        let cfg = manager.load().await.unwrap();
        assert!(path.exists());
        assert_eq!(cfg.enrichment.batch_size, defaults::ENRICH_BATCH_SIZE);
    }
}

//! Selector inventories for the DOM heuristics
//!
//! Every heuristic list lives here as ordered data rather than code
//! branches, so coverage can be extended or tuned per deployment without
//! touching control flow. Order matters: earlier entries win ties.

use scraper::Selector;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Ordered selector and keyword lists shared by the classifier, extractor,
/// link discoverer and enricher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorLibrary {
    /// Candidate product-card container patterns, scanned in order.
    /// WooCommerce first, then generic grid/card names, then
    /// data-attribute patterns.
    pub containers: Vec<String>,

    /// Title-bearing elements inside a container, tried in order.
    pub titles: Vec<String>,

    /// Pagination and "load more" anchors on category pages.
    pub pagination: Vec<String>,

    /// Navigation areas scanned by the link discoverer.
    pub nav_scopes: Vec<String>,

    /// Keywords qualifying a navigation link as catalog-bearing.
    pub category_keywords: Vec<String>,

    /// Path fragments qualifying a navigation link as catalog-bearing.
    pub category_paths: Vec<String>,

    /// Terms that disqualify a navigation link (non-catalog noise).
    pub nav_excludes: Vec<String>,

    /// Substrings that mark an image URL as decoration, not product imagery.
    pub image_denylist: Vec<String>,

    /// Description-bearing selectors for the enricher, most specific first.
    pub descriptions: Vec<String>,

    /// Logo candidates for brand detection.
    pub logos: Vec<String>,

    /// Breadcrumb items for brand detection.
    pub breadcrumbs: Vec<String>,

    /// Aggregator PRODUCT pages: carousel images flagged visually active.
    pub active_images: Vec<String>,

    /// Aggregator PRODUCT pages: fixed main-image fallbacks.
    pub main_images: Vec<String>,

    /// Aggregator PRODUCT pages: description content blocks.
    pub content_blocks: Vec<String>,

    /// Aggregator PRODUCT pages: specification/attribute rows whose texts
    /// are joined into a description of last resort.
    pub attribute_blocks: String,
}

impl Default for SelectorLibrary {
    fn default() -> Self {
        Self {
            containers: to_vec(&[
                "ul.products li.product",
                ".woocommerce ul.products li",
                ".product-card",
                ".product-item",
                ".product-tile",
                ".product",
                ".collection-item",
                ".catalog-item",
                ".grid-item",
                ".grid__item",
                ".card",
                ".item",
                "[data-product-id]",
                "[data-product]",
                "article",
            ]),
            titles: to_vec(&[
                ".woocommerce-loop-product__title",
                ".product-title",
                ".product-name",
                ".card-title",
                ".title",
                ".name",
                "h1",
                "h2",
                "h3",
                "h4",
                "a",
            ]),
            pagination: to_vec(&[
                "a[rel=\"next\"]",
                ".pagination a",
                ".page-numbers a",
                ".nav-links a",
                "a.next",
                ".load-more",
                "[class*=\"pagination\"] a",
            ]),
            nav_scopes: to_vec(&[
                "nav a",
                "header a",
                ".menu a",
                ".navbar a",
                ".nav a",
                ".main-navigation a",
                ".dropdown-menu a",
                "[class*=\"menu\"] a",
            ]),
            category_keywords: to_vec(&[
                "product", "collection", "catalog", "catalogue", "category", "shop", "furniture",
                "lighting", "seating", "chair", "table", "sofa", "storage", "outdoor", "accessor",
                "range",
            ]),
            category_paths: to_vec(&[
                "/product", "/collection", "/category", "/categories", "/shop", "/catalog",
            ]),
            nav_excludes: to_vec(&[
                "about", "contact", "blog", "news", "career", "privacy", "terms", "policy",
                "login", "signin", "register", "account", "cart", "checkout", "wishlist",
                "search", "faq", "support", "press", "media", "sustainability", "legal", "cookie",
            ]),
            image_denylist: to_vec(&[
                "logo", "icon", "placeholder", "blank", "banner", "hero", "social", "sprite",
                "favicon",
            ]),
            descriptions: to_vec(&[
                ".woocommerce-product-details__short-description",
                ".product-short-description",
                ".short-description",
                ".product-description",
                ".product-details",
                "#description",
                ".description",
                "[itemprop=\"description\"]",
                ".product-info p",
                ".entry-content p",
                "main p",
            ]),
            logos: to_vec(&[".logo img", ".brand-logo img", "img[alt*=\"logo\" i]", "header img"]),
            breadcrumbs: to_vec(&[
                ".breadcrumb-item",
                "[class*=\"breadcrumb\"] li",
                ".breadcrumbs a",
            ]),
            active_images: to_vec(&["img.opacity-100", "img.active"]),
            main_images: to_vec(&[
                ".product-gallery__main-image img",
                "img[itemprop=\"image\"]",
                ".product-image img",
                "main img[src*=\"/product/\"]",
            ]),
            content_blocks: to_vec(&[".product-description", "#description", ".details-content"]),
            attribute_blocks: "div[class*=\"Attribute\"]".to_string(),
        }
    }
}

impl SelectorLibrary {
    /// True when the URL looks like decoration rather than product imagery.
    pub fn is_denylisted_image(&self, url: &str) -> bool {
        let lowered = url.to_lowercase();
        self.image_denylist.iter().any(|term| lowered.contains(term.as_str()))
    }

    /// True when a navigation link's href or label carries a catalog signal.
    pub fn is_catalog_link(&self, href: &str, label: &str) -> bool {
        let href_l = href.to_lowercase();
        let label_l = label.to_lowercase();
        let excluded = self
            .nav_excludes
            .iter()
            .any(|t| href_l.contains(t.as_str()) || label_l.contains(t.as_str()));
        if excluded {
            return false;
        }
        self.category_paths.iter().any(|p| href_l.contains(p.as_str()))
            || self
                .category_keywords
                .iter()
                .any(|k| href_l.contains(k.as_str()) || label_l.contains(k.as_str()))
    }
}

/// Parse a pattern list, dropping entries the CSS engine rejects.
///
/// Inventories are deployment-editable, so a typo in one entry must not take
/// the whole heuristic down.
pub fn parse_patterns(patterns: &[String]) -> Vec<(String, Selector)> {
    patterns
        .iter()
        .filter_map(|raw| match Selector::parse(raw) {
            Ok(sel) => Some((raw.clone(), sel)),
            Err(e) => {
                warn!("Skipping unparsable selector '{}': {:?}", raw, e);
                None
            }
        })
        .collect()
}

fn to_vec(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_default_pattern_parses() {
        let lib = SelectorLibrary::default();
        for list in [
            &lib.containers,
            &lib.titles,
            &lib.pagination,
            &lib.nav_scopes,
            &lib.descriptions,
            &lib.logos,
            &lib.breadcrumbs,
            &lib.active_images,
            &lib.main_images,
            &lib.content_blocks,
        ] {
            assert_eq!(parse_patterns(list).len(), list.len(), "unparsable entry in {:?}", list);
        }
        assert!(Selector::parse(&lib.attribute_blocks).is_ok());
    }

    #[test]
    fn denylist_catches_decoration_urls() {
        let lib = SelectorLibrary::default();
        assert!(lib.is_denylisted_image("https://cdn.example.com/assets/Logo-header.png"));
        assert!(lib.is_denylisted_image("/img/social-share.jpg"));
        assert!(!lib.is_denylisted_image("https://cdn.example.com/products/chair-01.jpg"));
    }

    #[test]
    fn catalog_links_pass_and_noise_is_excluded() {
        let lib = SelectorLibrary::default();
        assert!(lib.is_catalog_link("/collections/chairs", "Chairs"));
        assert!(lib.is_catalog_link("/ranges/aria", "Seating range"));
        assert!(!lib.is_catalog_link("/about-us", "About"));
        assert!(!lib.is_catalog_link("/products/privacy", "Privacy"));
    }
}

//! Product field extraction
//!
//! Given a chosen container selector, pulls title, image and link per card
//! and normalizes every URL to absolute form before anything leaves this
//! module. Also hosts brand-identity detection, shared by both pipelines.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::domain::Product;
use crate::infrastructure::classifier::normalized_text;
use crate::infrastructure::config::AggregatorProfile;
use crate::infrastructure::config::utils::resolve_absolute;
use crate::infrastructure::selectors::{SelectorLibrary, parse_patterns};
use crate::infrastructure::{HarvestError, HarvestResult};

/// Lazy-loading image markup hides the real URL behind a rotating set of
/// attributes; this is the acceptance order.
const IMAGE_ATTRS: [&str; 4] = ["src", "data-src", "data-lazy-src", "data-original"];

/// First usable image URL on an `<img>` element: the attribute chain, then
/// the last (highest resolution) `srcset` entry. Inline `data:` shims are
/// skipped so the chain can reach the lazy-load attributes behind them.
pub fn image_candidate(img: ElementRef) -> Option<String> {
    let value = img.value();
    for attr in IMAGE_ATTRS {
        if let Some(raw) = value.attr(attr) {
            let raw = raw.trim();
            if !raw.is_empty() && !raw.starts_with("data:") {
                return Some(raw.to_string());
            }
        }
    }
    value.attr("srcset").and_then(last_srcset_entry)
}

fn last_srcset_entry(srcset: &str) -> Option<String> {
    srcset
        .split(',')
        .filter_map(|entry| entry.split_whitespace().next())
        .filter(|u| !u.is_empty() && !u.starts_with("data:"))
        .last()
        .map(String::from)
}

/// First meta description on a page, `name` form before OpenGraph.
pub fn meta_description(doc: &Html) -> Option<String> {
    for raw in ["meta[name=\"description\"]", "meta[property=\"og:description\"]"] {
        let Ok(sel) = Selector::parse(raw) else { continue };
        if let Some(content) = doc.select(&sel).next().and_then(|m| m.value().attr("content")) {
            let content = content.trim();
            if !content.is_empty() {
                return Some(content.to_string());
            }
        }
    }
    None
}

pub struct FieldExtractor {
    lib: SelectorLibrary,
    titles: Vec<(String, Selector)>,
    anchor: Selector,
    image: Selector,
    picture_source: Selector,
}

impl FieldExtractor {
    pub fn new(lib: &SelectorLibrary) -> HarvestResult<Self> {
        Ok(Self {
            lib: lib.clone(),
            titles: parse_patterns(&lib.titles),
            anchor: parse("a[href]")?,
            image: parse("img")?,
            picture_source: parse("picture source")?,
        })
    }

    /// Extract products from every element matching `container` on the page.
    ///
    /// An item is emitted only with a valid title and an image that is
    /// non-empty and not denylisted; duplicate titles within the page are
    /// rejected case-insensitively. Both URLs come out absolute.
    pub fn extract_from(
        &self,
        doc: &Html,
        container: &str,
        base: &Url,
        brand: &str,
        category: &str,
    ) -> HarvestResult<Vec<Product>> {
        let container_sel = parse(container)?;

        let main_category = if category.trim().is_empty() { "Products" } else { category };
        let sub_category = if category.trim().is_empty() { "General" } else { category };

        let mut seen_titles: HashSet<String> = HashSet::new();
        let mut products = Vec::new();

        for el in doc.select(&container_sel) {
            let Some(title) = self.title_of(el) else { continue };
            if seen_titles.contains(&title.to_lowercase()) {
                continue;
            }

            let Some(raw_image) = self.image_of(el) else { continue };
            let Some(image_url) = resolve_absolute(base, &raw_image) else { continue };
            if self.lib.is_denylisted_image(&image_url) {
                continue;
            }

            let product_url = self
                .link_of(el)
                .and_then(|href| resolve_absolute(base, &href))
                .unwrap_or_default();

            seen_titles.insert(title.to_lowercase());
            products.push(Product::new(main_category, sub_category, brand, title, image_url, product_url));
        }

        Ok(products)
    }

    fn title_of(&self, el: ElementRef) -> Option<String> {
        for (_, sel) in &self.titles {
            if let Some(hit) = el.select(sel).next() {
                let text = normalized_text(hit);
                if text.len() > 2 && text.len() < 200 {
                    return Some(text);
                }
            }
        }
        None
    }

    fn image_of(&self, el: ElementRef) -> Option<String> {
        for img in el.select(&self.image) {
            if let Some(url) = image_candidate(img) {
                return Some(url);
            }
        }
        for source in el.select(&self.picture_source) {
            if let Some(url) = source.value().attr("srcset").and_then(last_srcset_entry) {
                return Some(url);
            }
        }
        None
    }

    fn link_of(&self, el: ElementRef) -> Option<String> {
        for anchor in el.select(&self.anchor) {
            let href = anchor.value().attr("href").unwrap_or("").trim();
            if href.is_empty() || href.starts_with('#') || href.starts_with("javascript") {
                continue;
            }
            return Some(href.to_string());
        }
        None
    }
}

/// Brand identity detection.
///
/// Works through a fallback chain per pipeline. The result is fed to
/// [`crate::domain::BrandInfo::refine_name`], which never regresses a good
/// name, so running detection on multiple pages is safe.
pub struct BrandDetector {
    h1: Selector,
    title_tag: Selector,
    logos: Vec<(String, Selector)>,
    breadcrumbs: Vec<(String, Selector)>,
}

impl BrandDetector {
    pub fn new(lib: &SelectorLibrary) -> HarvestResult<Self> {
        Ok(Self {
            h1: parse("h1")?,
            title_tag: parse("title")?,
            logos: parse_patterns(&lib.logos),
            breadcrumbs: parse_patterns(&lib.breadcrumbs),
        })
    }

    /// Aggregator chain: H1 stripped of boilerplate, then last non-generic
    /// breadcrumb, then page title first segment without the site name.
    /// A candidate that is itself a generic chrome word (a bare "Brands"
    /// heading on an index page) falls through to the next source. Falls
    /// back to the profile's brand of last resort.
    pub fn aggregator_brand(&self, doc: &Html, profile: &AggregatorProfile) -> String {
        if let Some(h1) = doc.select(&self.h1).next() {
            let mut text = normalized_text(h1);
            for phrase in &profile.brand_boilerplate {
                text = text.replace(phrase.as_str(), "");
            }
            let text = text.trim();
            if text.len() > 1 && !is_generic_name(profile, text) {
                return text.to_string();
            }
        }

        for (_, sel) in &self.breadcrumbs {
            let crumbs: Vec<String> = doc.select(sel).map(normalized_text).collect();
            for crumb in crumbs.iter().rev() {
                let crumb = crumb.trim();
                if crumb.len() > 1 && !is_generic_name(profile, crumb) {
                    return crumb.to_string();
                }
            }
        }

        if let Some(title) = doc.select(&self.title_tag).next() {
            let text = normalized_text(title);
            let first = text.split('|').next().unwrap_or("").replace(profile.site_name.as_str(), "");
            let first = first.trim();
            if first.len() > 1 && !is_generic_name(profile, first) {
                return first.to_string();
            }
        }

        profile.fallback_brand.clone()
    }

    /// Generic chain: page title up to the first `|` or `-` separator.
    pub fn generic_brand(&self, doc: &Html) -> String {
        if let Some(title) = doc.select(&self.title_tag).next() {
            let text = normalized_text(title);
            let first = text
                .split('|')
                .next()
                .unwrap_or("")
                .split('-')
                .next()
                .unwrap_or("")
                .trim()
                .to_string();
            if first.len() > 1 {
                return first;
            }
        }
        "Unknown Brand".to_string()
    }

    /// First logo candidate that is neither icon-sized nor a placeholder,
    /// resolved to absolute form.
    pub fn detect_logo(&self, doc: &Html, base: &Url) -> Option<String> {
        for (_, sel) in &self.logos {
            for img in doc.select(sel) {
                let Some(raw) = image_candidate(img) else { continue };
                if looks_like_placeholder(&raw) || icon_sized(img) {
                    continue;
                }
                if let Some(abs) = resolve_absolute(base, &raw) {
                    return Some(abs);
                }
            }
        }
        None
    }
}

/// Site chrome rather than a brand name.
fn is_generic_name(profile: &AggregatorProfile, name: &str) -> bool {
    profile.generic_crumbs.iter().any(|g| name.eq_ignore_ascii_case(g))
}

fn looks_like_placeholder(url: &str) -> bool {
    let lowered = url.to_lowercase();
    lowered.contains("placeholder") || lowered.contains("blank")
}

fn icon_sized(img: ElementRef) -> bool {
    for attr in ["width", "height"] {
        if let Some(px) = img.value().attr(attr).and_then(|v| v.trim().parse::<u32>().ok()) {
            if px < 32 {
                return true;
            }
        }
    }
    false
}

fn parse(raw: &str) -> HarvestResult<Selector> {
    Selector::parse(raw).map_err(|e| HarvestError::Selector(format!("{raw}: {e:?}")))
}

//! Category and collection link discovery
//!
//! Scans navigation-area anchors for links that look like catalog entry
//! points. Matching is keyword- and path-driven and deliberately loose; the
//! excludelist and the fan-out cap keep the noise bounded.

use std::collections::HashSet;

use scraper::{Html, Selector};
use url::Url;

use crate::infrastructure::classifier::normalized_text;
use crate::infrastructure::config::utils::resolve_absolute;
use crate::infrastructure::selectors::{SelectorLibrary, parse_patterns};

/// One candidate category link. `label` keeps the first-seen anchor text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredLink {
    pub url: String,
    pub label: String,
}

pub struct LinkDiscoverer {
    scopes: Vec<(String, Selector)>,
    lib: SelectorLibrary,
}

impl LinkDiscoverer {
    pub fn new(lib: &SelectorLibrary) -> Self {
        Self { scopes: parse_patterns(&lib.nav_scopes), lib: lib.clone() }
    }

    /// Collect up to `cap` catalog-looking links from the page's navigation
    /// areas, deduplicated by resolved URL, document order preserved.
    pub fn discover(&self, doc: &Html, base: &Url, cap: usize) -> Vec<DiscoveredLink> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut links = Vec::new();

        for (_, scope) in &self.scopes {
            for anchor in doc.select(scope) {
                let href = anchor.value().attr("href").unwrap_or("").trim();
                if href.is_empty()
                    || href.starts_with('#')
                    || href.starts_with("javascript")
                    || href.starts_with("mailto:")
                {
                    continue;
                }

                let label = normalized_text(anchor);
                if !self.lib.is_catalog_link(href, &label) {
                    continue;
                }

                let Some(url) = resolve_absolute(base, href) else { continue };
                if url == base.as_str() {
                    continue;
                }
                if !seen.insert(url.clone()) {
                    continue;
                }

                links.push(DiscoveredLink { url, label });
                if links.len() >= cap {
                    return links;
                }
            }
        }

        links
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn discoverer() -> LinkDiscoverer {
        LinkDiscoverer::new(&SelectorLibrary::default())
    }

    fn base() -> Url {
        Url::parse("https://vendor.example.com/").unwrap()
    }

    #[test]
    fn keyword_and_path_links_qualify_and_noise_is_dropped() {
        let html = r##"<html><body><nav>
            <a href="/collections/chairs">Chairs</a>
            <a href="/seating-range">Seating</a>
            <a href="/about-us">About</a>
            <a href="/contact">Contact</a>
            <a href="#">Top</a>
        </nav></body></html>"##;
        let doc = Html::parse_document(html);

        let links = discoverer().discover(&doc, &base(), 20);
        let urls: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://vendor.example.com/collections/chairs",
                "https://vendor.example.com/seating-range",
            ]
        );
    }

    #[test]
    fn duplicates_keep_the_first_seen_label() {
        let html = r#"<html><body>
            <nav><a href="/products">Catalog</a></nav>
            <header><a href="/products">All products</a></header>
        </body></html>"#;
        let doc = Html::parse_document(html);

        let links = discoverer().discover(&doc, &base(), 20);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].label, "Catalog");
    }

    #[test]
    fn links_outside_navigation_areas_are_ignored() {
        let html = r#"<html><body>
            <footer><a href="/collections/outdoor">Outdoor</a></footer>
            <div class="content"><a href="/products/x">X</a></div>
        </body></html>"#;
        let doc = Html::parse_document(html);

        assert!(discoverer().discover(&doc, &base(), 20).is_empty());
    }

    #[test]
    fn fan_out_is_capped() {
        let anchors: String = (0..40)
            .map(|i| format!(r#"<a href="/collections/c{i}">Collection {i}</a>"#))
            .collect();
        let html = format!("<html><body><nav>{anchors}</nav></body></html>");
        let doc = Html::parse_document(&html);

        assert_eq!(discoverer().discover(&doc, &base(), 20).len(), 20);
    }

    #[test]
    fn seed_page_self_link_is_skipped() {
        let html = r#"<html><body><nav>
            <a href="/">Shop home</a>
            <a href="/catalog">Catalog</a>
        </nav></body></html>"#;
        let doc = Html::parse_document(html);

        let links = discoverer().discover(&doc, &base(), 20);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://vendor.example.com/catalog");
    }
}

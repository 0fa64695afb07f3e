//! Visited-URL tracking and result deduplication
//!
//! Two concerns share this module because both are set-membership filters:
//! the visited-URL set that makes page visits idempotent across workers,
//! and the two product dedup passes that run over harvest output.

use std::collections::HashSet;
use std::sync::Mutex;

use crate::domain::Product;
use crate::infrastructure::selectors::SelectorLibrary;

/// Shared visited-URL set. The check-and-insert is atomic under one lock,
/// so two workers racing on the same URL cannot both win.
#[derive(Debug, Default)]
pub struct VisitedUrls {
    inner: Mutex<HashSet<String>>,
}

impl VisitedUrls {
    pub fn new() -> Self {
        Self::default()
    }

    /// True exactly once per normalized URL.
    pub fn first_visit(&self, url: &str) -> bool {
        let key = normalize_url(url);
        match self.inner.lock() {
            Ok(mut set) => set.insert(key),
            // A poisoned lock means another worker panicked; treat the URL
            // as already visited rather than refetching blind.
            Err(_) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|set| set.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Canonical form used for visit keys: fragments dropped, trailing slash
/// trimmed, scheme/host lowercased by the URL parser.
fn normalize_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.as_str().trim_end_matches('/').to_string()
        }
        Err(_) => url.trim_end_matches('/').to_string(),
    }
}

/// Pass 1: drop repeats of the lowercased `model|imageUrl` key, first
/// occurrence wins. When a selector library is supplied, items whose image
/// fails the product-image denylist are dropped in the same sweep; the
/// aggregator pipeline passes `None` because it substitutes placeholder
/// images that must survive.
pub fn dedup_by_image_key(products: Vec<Product>, deny: Option<&SelectorLibrary>) -> Vec<Product> {
    let mut seen: HashSet<String> = HashSet::new();
    products
        .into_iter()
        .filter(|p| {
            if let Some(lib) = deny {
                if lib.is_denylisted_image(&p.image_url) {
                    return false;
                }
            }
            seen.insert(p.image_key())
        })
        .collect()
}

/// Pass 2 (generic pipeline, after enrichment): drop repeats of the
/// lowercased `model|productUrl` key. Two collection-attributed entries can
/// resolve to the same canonical product page; this pass collapses them.
pub fn dedup_by_url_key(products: Vec<Product>) -> Vec<Product> {
    let mut seen: HashSet<String> = HashSet::new();
    products.into_iter().filter(|p| seen.insert(p.url_key())).collect()
}

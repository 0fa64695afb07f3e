//! Page structure classifier
//!
//! Scores candidate container selectors on a loaded page to find the one
//! most likely to enumerate product cards. No single selector generalizes
//! across vendor markups, so heterogeneous guesses are turned into a ranked
//! decision with a quality floor that suppresses false positives such as a
//! lone footer list item.

use scraper::{ElementRef, Html, Selector};

use crate::infrastructure::extractor::image_candidate;
use crate::infrastructure::selectors::{SelectorLibrary, parse_patterns};
use crate::infrastructure::{HarvestError, HarvestResult};

/// One ranked candidate. `selector` is the raw pattern as written in the
/// library, reusable directly by the extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerScore {
    pub selector: String,
    pub score: f64,
    pub matched: usize,
}

pub struct StructureClassifier {
    containers: Vec<(String, Selector)>,
    titles: Vec<(String, Selector)>,
    anchor: Selector,
    image: Selector,
}

impl StructureClassifier {
    pub fn new(lib: &SelectorLibrary) -> HarvestResult<Self> {
        Ok(Self {
            containers: parse_patterns(&lib.containers),
            titles: parse_patterns(&lib.titles),
            anchor: parse(r#"a[href]"#)?,
            image: parse("img")?,
        })
    }

    /// Rank container candidates on a page, best first, at most three.
    ///
    /// A candidate needs at least two matches to count at all. Score is
    /// `30·titleRatio + 40·imageRatio + 30·linkRatio`, plus 10 when the
    /// shared parent looks grid- or flex-laid-out. Candidates at or below
    /// 50 are discarded. Ties keep library declaration order.
    pub fn rank(&self, doc: &Html) -> Vec<ContainerScore> {
        let mut ranked: Vec<ContainerScore> = Vec::new();

        for (raw, sel) in &self.containers {
            let elements: Vec<ElementRef> = doc.select(sel).collect();
            if elements.len() < 2 {
                continue;
            }

            let total = elements.len() as f64;
            let mut title_hits = 0usize;
            let mut image_hits = 0usize;
            let mut link_hits = 0usize;
            for el in &elements {
                if self.has_plausible_title(*el) {
                    title_hits += 1;
                }
                if el.select(&self.image).any(|img| image_candidate(img).is_some()) {
                    image_hits += 1;
                }
                if el.select(&self.anchor).next().is_some() {
                    link_hits += 1;
                }
            }

            let mut score = 30.0 * (title_hits as f64 / total)
                + 40.0 * (image_hits as f64 / total)
                + 30.0 * (link_hits as f64 / total);
            if parent_uses_grid_layout(&elements) {
                score += 10.0;
            }

            if score <= 50.0 {
                continue;
            }
            ranked.push(ContainerScore { selector: raw.clone(), score, matched: elements.len() });
        }

        // Stable sort keeps declaration order for equal scores.
        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(3);
        ranked
    }

    /// Winning candidate, if any scored above the floor.
    pub fn best(&self, doc: &Html) -> Option<ContainerScore> {
        self.rank(doc).into_iter().next()
    }

    fn has_plausible_title(&self, el: ElementRef) -> bool {
        for (_, sel) in &self.titles {
            if let Some(hit) = el.select(sel).next() {
                let text = normalized_text(hit);
                if text.len() > 2 && text.len() < 200 {
                    return true;
                }
            }
        }
        false
    }
}

/// Collapse an element's text to single-spaced trimmed form.
pub fn normalized_text(el: ElementRef) -> String {
    el.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parent_uses_grid_layout(elements: &[ElementRef]) -> bool {
    let Some(first) = elements.first() else {
        return false;
    };
    let Some(parent) = first.parent().and_then(ElementRef::wrap) else {
        return false;
    };

    let class = parent.value().attr("class").unwrap_or("").to_lowercase();
    let style = parent.value().attr("style").unwrap_or("").to_lowercase();
    class.contains("grid")
        || class.contains("flex")
        || style.contains("display:grid")
        || style.contains("display: grid")
        || style.contains("display:flex")
        || style.contains("display: flex")
}

fn parse(raw: &str) -> HarvestResult<Selector> {
    Selector::parse(raw).map_err(|e| HarvestError::Selector(format!("{raw}: {e:?}")))
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One harvested catalog entry.
///
/// Field names serialize in camelCase to match the consuming procurement
/// application. `price` is carried for schema compatibility and is always
/// 0.0; the engine does not extract prices.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub main_category: String,
    pub sub_category: String,
    /// Brand name the item belongs to.
    pub family: String,
    /// Product title, possibly suffixed with a `#<id>` variant marker.
    pub model: String,
    pub description: String,
    /// Absolute image URL (or a placeholder substituted by the aggregator
    /// PRODUCT phase).
    pub image_url: String,
    /// Absolute product detail URL, empty when none was found.
    pub product_url: String,
    pub price: f64,
}

impl Product {
    pub fn new(
        main_category: impl Into<String>,
        sub_category: impl Into<String>,
        family: impl Into<String>,
        model: impl Into<String>,
        image_url: impl Into<String>,
        product_url: impl Into<String>,
    ) -> Self {
        let model = model.into();
        Self {
            main_category: main_category.into(),
            sub_category: sub_category.into(),
            family: family.into(),
            description: model.clone(),
            model,
            image_url: image_url.into(),
            product_url: product_url.into(),
            price: 0.0,
        }
    }

    /// A product is emittable when both identity fields are present.
    pub fn is_emittable(&self) -> bool {
        !self.model.trim().is_empty() && !self.image_url.trim().is_empty()
    }

    /// Dedup key for the post-harvest pass: `model|imageUrl`, lowercased.
    pub fn image_key(&self) -> String {
        format!("{}|{}", self.model, self.image_url).to_lowercase()
    }

    /// Dedup key for the post-enrichment pass: `model|productUrl`, lowercased.
    pub fn url_key(&self) -> String {
        format!("{}|{}", self.model, self.product_url).to_lowercase()
    }
}

/// Brand identity detected during a harvest.
///
/// Refined through the H1 → breadcrumb → page-title chain and never
/// regressed once a non-generic name is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BrandInfo {
    pub name: String,
    /// Absolute logo URL, empty when none survived the icon/placeholder
    /// checks.
    pub logo: String,
}

impl BrandInfo {
    pub fn unknown() -> Self {
        Self {
            name: String::new(),
            logo: String::new(),
        }
    }

    /// True when no usable name has been detected yet.
    pub fn is_generic(&self) -> bool {
        let name = self.name.trim();
        name.len() < 2 || name.eq_ignore_ascii_case("brands")
    }

    /// Adopt `candidate` only if it improves on the current name.
    pub fn refine_name(&mut self, candidate: &str) {
        let candidate = candidate.trim();
        if !self.is_generic() {
            return;
        }
        if candidate.len() >= 2 && !candidate.eq_ignore_ascii_case("brands") {
            self.name = candidate.to_string();
        }
    }
}

/// Counters describing how much of a harvest was recovered.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HarvestSummary {
    /// Items emitted by extractors before deduplication.
    pub total_found: usize,
    /// Items surviving deduplication.
    pub unique: usize,
    /// Items whose description was improved by the enricher.
    pub enriched: usize,
    /// Items the enricher gave up on (network/parse failures).
    pub failed_enrichment: usize,
}

/// Complete result of one harvest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestOutcome {
    pub products: Vec<Product>,
    pub brand_info: BrandInfo,
    pub summary: HarvestSummary,
}

impl HarvestOutcome {
    pub fn empty() -> Self {
        Self {
            products: Vec::new(),
            brand_info: BrandInfo::unknown(),
            summary: HarvestSummary::default(),
        }
    }

    /// Serialize into the persisted-artifact document shape. The engine never
    /// writes this anywhere itself; callers decide where it lands.
    pub fn to_document(&self, id: &str, source_url: &str, completed_at: DateTime<Utc>) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "brandInfo": self.brand_info,
            "products": self.products,
            "productCount": self.products.len(),
            "completedAt": completed_at.to_rfc3339(),
            "sourceUrl": source_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_keys_are_lowercased() {
        let product = Product::new(
            "Furniture",
            "Chairs",
            "Acme",
            "Lounge Chair",
            "https://cdn.example.com/IMG.jpg",
            "https://example.com/p/lounge-chair-42",
        );
        assert_eq!(product.image_key(), "lounge chair|https://cdn.example.com/img.jpg");
        assert_eq!(product.url_key(), "lounge chair|https://example.com/p/lounge-chair-42");
    }

    #[test]
    fn brand_refinement_never_regresses() {
        let mut brand = BrandInfo::unknown();
        assert!(brand.is_generic());

        brand.refine_name("Brands");
        assert!(brand.is_generic());

        brand.refine_name("Vitra");
        assert_eq!(brand.name, "Vitra");

        brand.refine_name("Some Other Name");
        assert_eq!(brand.name, "Vitra");
    }

    #[test]
    fn description_defaults_to_model() {
        let product = Product::new("F", "S", "B", "Table 12", "http://img", "http://p");
        assert_eq!(product.description, "Table 12");
        assert!((product.price - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn document_shape_carries_count() {
        let outcome = HarvestOutcome {
            products: vec![Product::new("F", "S", "B", "M", "http://i", "http://p")],
            brand_info: BrandInfo {
                name: "Acme".into(),
                logo: String::new(),
            },
            summary: HarvestSummary::default(),
        };
        let doc = outcome.to_document("abc", "https://acme.example.com", Utc::now());
        assert_eq!(doc["productCount"], 1);
        assert_eq!(doc["brandInfo"]["name"], "Acme");
        assert_eq!(doc["sourceUrl"], "https://acme.example.com");
    }
}

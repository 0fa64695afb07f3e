//! End-to-end tests for the aggregator harvest pipeline on a canned brand
//! page: seed normalization, collection walking, brand-index detection, the
//! product worker phase, and progress/cancellation behavior.

mod support;

use std::sync::{Arc, Mutex};

use catalog_harvester::application::ProgressChannel;
use catalog_harvester::domain::ProgressUpdate;
use catalog_harvester::infrastructure::aggregator_engine::AggregatorEngine;
use catalog_harvester::infrastructure::config::HarvesterConfig;
use catalog_harvester::infrastructure::selectors::SelectorLibrary;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use support::FixtureBackend;

const SEED: &str = "https://www.architonic.com/en/b/acme-studio/products";
const BRAND_PAGE: &str = "https://www.architonic.com/en/b/acme-studio/collections";
const COLL_SEATING: &str = "https://www.architonic.com/en/collection/studio-seating-1001";
const COLL_INDEX: &str = "https://www.architonic.com/en/collection/acme-studio-products-1002";
const COLL_TABLES: &str = "https://www.architonic.com/en/collection/studio-tables-1003";
const P_FEATURED: &str = "https://www.architonic.com/en/p/acme-featured-chair-9001";
const P_LOUNGE: &str = "https://www.architonic.com/en/p/acme-lounge-chair-7001";
const P_ARMCHAIR: &str = "https://www.architonic.com/en/p/acme-armchair-7002";
const P_BLOCKED: &str = "https://www.architonic.com/en/p/acme-side-table-7003";
const P_DESK: &str = "https://www.architonic.com/en/p/acme-desk-7004";
const P_HIDDEN: &str = "https://www.architonic.com/en/p/acme-hidden-shelf-7999";

fn test_config() -> HarvesterConfig {
    let mut config = HarvesterConfig::default();
    // No real waiting between product fetches.
    config.blocking.base_delay_ms = 0;
    config.blocking.delay_increment_ms = 0;
    config.blocking.cooldown_ms = 0;
    config
}

/// A brand with two real collections, a generic "all products" index page
/// that must only be mined for sub-collections, one featured product on the
/// START page, one product listed in both collections, and one block page.
fn brand_site() -> FixtureBackend {
    let brand_page = r#"<html><head><title>Acme Studio | Architonic</title></head>
        <body>
        <header><div class="logo"><img src="/img/brands/acme-studio.png" alt="Acme Studio"></div></header>
        <h1>Collections by Acme Studio</h1>
        <a href="/en/collection/studio-seating-1001">Studio Seating</a>
        <a href="/en/collection/acme-studio-products-1002">All products</a>
        <a href="https://rival-catalog.example/collection/knockoffs">Partner collections</a>
        <a href="/en/p/acme-featured-chair-9001">Featured: Chair</a>
        <a href="/en/b/acme-studio/collections">All collections</a>
        </body></html>"#;

    let seating = r#"<html><head><title>Studio Seating by Acme Studio | Architonic</title></head>
        <body>
        <h1>Studio Seating</h1>
        <a href="/en/p/acme-lounge-chair-7001">Lounge Chair</a>
        <a href="/en/p/acme-armchair-7002">Armchair</a>
        <a href="/en/p/acme-side-table-7003">Side Table</a>
        </body></html>"#;

    // Generic "Products by" index: its product links must be ignored, its
    // collection links queued.
    let index = r#"<html><head><title>Products by Acme Studio | Architonic</title></head>
        <body>
        <h1>Acme Studio</h1>
        <a href="/en/collection/studio-tables-1003">Studio Tables</a>
        <a href="/en/p/acme-hidden-shelf-7999">Hidden Shelf</a>
        </body></html>"#;

    let tables = r#"<html><head><title>Studio Tables by Acme Studio | Architonic</title></head>
        <body>
        <h1>Studio Tables</h1>
        <a href="/en/p/acme-lounge-chair-7001">Lounge Chair</a>
        <a href="/en/p/acme-desk-7004">Desk</a>
        </body></html>"#;

    let featured = r#"<html><head>
        <meta name="description" content="A cantilevered chair with a woven seat, shown at the entrance of every Acme Studio exhibition.">
        </head><body>
        <h1>Featured Chair</h1>
        <img src="https://image.architonic.com/img/product/featured-chair.jpg">
        </body></html>"#;

    // An active family thumbnail ahead of the active product shot; the
    // carousel strategy must pick the product shot.
    let lounge = r#"<html><head>
        <meta name="description" content="A sculptural lounge chair in steam-bent oak with a hand-stitched leather seat and a matching ottoman.">
        </head><body>
        <h1>Lounge Chair</h1>
        <img class="active" src="https://image.architonic.com/img/family/lounge-family.jpg">
        <img class="active" src="https://image.architonic.com/img/product/lounge-chair-front.jpg">
        <img src="https://image.architonic.com/img/product/lounge-chair-side.jpg">
        </body></html>"#;

    // No image and no meta description: placeholder image, attribute-row
    // description, variant sub-title prepended.
    let armchair = r#"<html><body>
        <h1>Armchair</h1>
        <h2>Anniversary Edition</h2>
        <div class="ProductAttribute">W 60 cm</div>
        <div class="ProductAttribute">Beech</div>
        </body></html>"#;

    let blocked = r#"<html><body><h1>403 Forbidden</h1></body></html>"#;

    let desk = r#"<html><body>
        <h1>Desk</h1>
        <img src="https://image.architonic.com/img/product/desk.jpg">
        <div class="product-description">A compact writing desk with two oak drawers and a hidden cable tray.</div>
        </body></html>"#;

    let hidden = r#"<html><body>
        <h1>Hidden Shelf</h1>
        <img src="https://image.architonic.com/img/product/hidden-shelf.jpg">
        </body></html>"#;

    FixtureBackend::new(false)
        .page(BRAND_PAGE, brand_page)
        .page(COLL_SEATING, seating)
        .page(COLL_INDEX, index)
        .page(COLL_TABLES, tables)
        .page(P_FEATURED, featured)
        .page(P_LOUNGE, lounge)
        .page(P_ARMCHAIR, armchair)
        .page(P_BLOCKED, blocked)
        .page(P_DESK, desk)
        .page(P_HIDDEN, hidden)
}

#[tokio::test]
async fn full_brand_harvest_walks_collections_and_labels_products() {
    let backend = Arc::new(brand_site());
    let engine =
        AggregatorEngine::new(backend.clone(), &test_config(), &SelectorLibrary::default()).unwrap();

    let outcome = engine.run(SEED, &ProgressChannel::detached()).await.unwrap();

    // Featured chair, lounge chair, armchair, desk. The block page yields
    // nothing, the duplicate lounge-chair listing collapses, and the index
    // page's hidden product is never harvested.
    assert_eq!(outcome.summary.total_found, 4);
    assert_eq!(outcome.summary.unique, 4);
    assert_eq!(outcome.products.len(), 4);
    assert_eq!(outcome.summary.enriched, 0);
    assert_eq!(outcome.summary.failed_enrichment, 0);

    let models: Vec<&str> = outcome.products.iter().map(|p| p.model.as_str()).collect();
    assert!(models.contains(&"Featured Chair #9001"), "models were {models:?}");
    assert!(models.contains(&"Lounge Chair #7001"));
    assert!(models.contains(&"Armchair #7002"));
    assert!(models.contains(&"Desk #7004"));
    assert!(!models.iter().any(|m| m.contains("Side Table")));
    assert!(!models.iter().any(|m| m.contains("Hidden Shelf")));

    let featured = outcome.products.iter().find(|p| p.model == "Featured Chair #9001").unwrap();
    assert_eq!(featured.sub_category, "Featured");
    assert_eq!(featured.image_url, "https://image.architonic.com/img/product/featured-chair.jpg");

    // The seating copy of the lounge chair arrives first and keeps its label.
    let lounge = outcome.products.iter().find(|p| p.model == "Lounge Chair #7001").unwrap();
    assert_eq!(lounge.sub_category, "Studio Seating");
    assert_eq!(lounge.image_url, "https://image.architonic.com/img/product/lounge-chair-front.jpg");

    let armchair = outcome.products.iter().find(|p| p.model == "Armchair #7002").unwrap();
    assert!(armchair.image_url.contains("placeholder"), "{}", armchair.image_url);
    assert_eq!(armchair.description, "Anniversary Edition | W 60 cm | Beech");

    let desk = outcome.products.iter().find(|p| p.model == "Desk #7004").unwrap();
    assert_eq!(desk.sub_category, "Studio Tables");
    assert_eq!(desk.description, "A compact writing desk with two oak drawers and a hidden cable tray.");

    for product in &outcome.products {
        assert_eq!(product.main_category, "Furniture");
        assert_eq!(product.family, "Acme Studio");
        assert!(product.product_url.starts_with("https://www.architonic.com/en/p/"));
        assert!(product.is_emittable());
    }

    assert_eq!(outcome.brand_info.name, "Acme Studio");
    assert_eq!(outcome.brand_info.logo, "https://www.architonic.com/img/brands/acme-studio.png");
}

#[tokio::test]
async fn seed_is_normalized_and_pages_fetch_exactly_once() {
    let backend = Arc::new(brand_site());
    let engine =
        AggregatorEngine::new(backend.clone(), &test_config(), &SelectorLibrary::default()).unwrap();

    engine.run(SEED, &ProgressChannel::detached()).await.unwrap();

    let log = backend.fetch_log();
    assert_eq!(log.len(), 9, "log was {log:?}");

    // The "/products" seed is rewritten to the collections view before the
    // first navigation; the collection walk is serial and in link order.
    assert_eq!(log[0], BRAND_PAGE);
    assert_eq!(log[1], COLL_SEATING);
    assert_eq!(log[2], COLL_INDEX);
    assert_eq!(log[3], COLL_TABLES);

    // The lounge chair is listed in both collections but fetched once.
    assert_eq!(backend.fetches_of(P_LOUNGE), 1);
    assert_eq!(backend.fetches_of(P_FEATURED), 1);
    assert_eq!(backend.fetches_of(P_ARMCHAIR), 1);
    assert_eq!(backend.fetches_of(P_BLOCKED), 1);
    assert_eq!(backend.fetches_of(P_DESK), 1);

    // Nothing on the index page's product list, nothing off-platform.
    assert_eq!(backend.fetches_of(P_HIDDEN), 0);
    assert_eq!(backend.fetches_of("https://rival-catalog.example/collection/knockoffs"), 0);
}

#[tokio::test]
async fn progress_reaches_full_and_reports_the_brand() {
    let backend = Arc::new(brand_site());
    let engine =
        AggregatorEngine::new(backend.clone(), &test_config(), &SelectorLibrary::default()).unwrap();

    let updates: Arc<Mutex<Vec<ProgressUpdate>>> = Arc::new(Mutex::new(Vec::new()));
    let sink_updates = Arc::clone(&updates);
    let channel = ProgressChannel::from_fn(move |u| sink_updates.lock().unwrap().push(u));

    engine.run(SEED, &channel).await.unwrap();

    let updates = updates.lock().unwrap();
    assert_eq!(updates.first().unwrap().percent, 5);
    assert_eq!(updates.last().unwrap().percent, 100);
    assert_eq!(updates.last().unwrap().stage, "Complete!");
    for pair in updates.windows(2) {
        assert!(pair[1].percent >= pair[0].percent, "progress went backwards: {pair:?}");
    }

    // Six product tasks (five pages plus the duplicate listing) all tick
    // the extraction counter, so the phase ends at 95 before completion.
    assert!(updates.iter().any(|u| u.percent == 95), "updates were {updates:?}");
    assert!(updates.iter().any(|u| u.detected_brand.as_deref() == Some("Acme Studio")));
}

#[tokio::test]
async fn cancellation_keeps_the_brand_but_harvests_nothing() {
    let backend = Arc::new(brand_site());
    let engine =
        AggregatorEngine::new(backend.clone(), &test_config(), &SelectorLibrary::default()).unwrap();

    let token = CancellationToken::new();
    token.cancel();
    let channel = ProgressChannel::new(None, token);

    let outcome = engine.run(SEED, &channel).await.unwrap();

    // The brand page itself is read, then the collection walk and the
    // product phase bail out immediately.
    assert_eq!(backend.fetch_log().len(), 1);
    assert!(outcome.products.is_empty());
    assert_eq!(outcome.summary.total_found, 0);
    assert_eq!(outcome.brand_info.name, "Acme Studio");
}

#[tokio::test]
async fn unreachable_brand_page_yields_an_empty_outcome() {
    let backend = Arc::new(FixtureBackend::new(false));
    let engine =
        AggregatorEngine::new(backend.clone(), &test_config(), &SelectorLibrary::default()).unwrap();

    let outcome = engine.run(SEED, &ProgressChannel::detached()).await.unwrap();

    assert!(outcome.products.is_empty());
    assert_eq!(outcome.summary.total_found, 0);
    assert_eq!(backend.fetch_log().len(), 1);
}

#[tokio::test]
async fn interactive_discovery_scrolls_until_height_stabilizes() {
    let brand_page = r#"<html><head><title>Acme Studio | Architonic</title></head>
        <body><h1>Collections by Acme Studio</h1></body></html>"#;

    // First value feeds the consent probe, the rest are document heights:
    // two growth rounds, then stable for the configured two rounds.
    let backend = Arc::new(
        FixtureBackend::new(true)
            .page(BRAND_PAGE, brand_page)
            .script_values(vec![json!(false), json!(500), json!(800), json!(800), json!(800)]),
    );

    let mut config = test_config();
    config.aggregator.discovery_scroll_cap = 6;
    config.aggregator.discovery_stable_rounds = 2;
    config.aggregator.scroll_settle_ms = 0;

    let engine = AggregatorEngine::new(backend.clone(), &config, &SelectorLibrary::default()).unwrap();
    let outcome = engine.run(SEED, &ProgressChannel::detached()).await.unwrap();

    assert_eq!(backend.evaluate_calls(), 5, "consent probe plus four scroll rounds");
    assert!(outcome.products.is_empty());
    assert_eq!(outcome.brand_info.name, "Acme Studio");
}

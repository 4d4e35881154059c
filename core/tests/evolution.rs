use portfolio_core::{
    config::AnalyticsConfig,
    engine::PortfolioEngine,
    error::AnalyticsError,
    filter::{Facet, FilterSet},
    record::{AdvisorRecord, PolicyRecord, RegistryLink},
    store::MemoryStore,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn policy(number: &str, entity: &str, product: &str, year: &str, month: &str, premium: &str) -> PolicyRecord {
    PolicyRecord {
        policy_number:    number.into(),
        entity_text:      entity.into(),
        product_name:     product.into(),
        premium:          premium.into(),
        status:           "En Vigor".into(),
        production_year:  year.into(),
        production_month: month.into(),
        ..Default::default()
    }
}

fn engine() -> PortfolioEngine<MemoryStore> {
    let mut cancelled = policy("P4", "Alfa - A1", "HOGAR", "2023", "11", "40");
    cancelled.status = "Anulada".into();

    let policies = vec![
        policy("P1", "Alfa - A1", "AUTO", "2024", "2", "100"),
        policy("P2", "Alfa - A1", "AUTO", "2024", "1", "60"),
        policy("P3", "Alfa - A1", "HOGAR", "2024", "1", "20"),
        cancelled,
        policy("P5", "Alfa - A1", "VIDA", "", "", "30"),
        policy("P6", "Beta - B1", "AUTO", "2024", "1", "500"),
        policy("P7", "Ghost - Z9", "AUTO", "2024", "1", "700"),
    ];
    let links = vec![
        RegistryLink { advisor_name: "Ana".into(), entity_identifier: "Alfa - A1".into() },
        RegistryLink { advisor_name: "Ana".into(), entity_identifier: "Beta - B1".into() },
    ];
    let advisors = vec![AdvisorRecord { name: "Ana".into() }, AdvisorRecord { name: "Luis".into() }];
    PortfolioEngine::new(MemoryStore::new(policies, links, advisors), AnalyticsConfig::default())
}

// ── Entity evolution ─────────────────────────────────────────────────────────

#[test]
fn entity_series_is_chronological() {
    let evolution = engine().compute_entity_evolution("A1", &FilterSet::default()).unwrap();

    assert_eq!(evolution.entity.name, "Alfa");
    assert_eq!(evolution.entity.advisor, "Ana");
    let periods: Vec<&str> = evolution.series.iter().map(|p| p.period.as_str()).collect();
    assert_eq!(periods, vec!["2023-11", "2024-01", "2024-02"]);
    assert_eq!(evolution.series[0].cancelled, 1);
    assert!((evolution.series[1].premium - 80.0).abs() < 1e-9);

    assert_eq!(evolution.totals.policies, 5);
    assert_eq!(evolution.totals.cancelled, 1);
    assert_eq!(evolution.totals.undated, 1, "Undated policy counts in totals but not the series");
}

#[test]
fn entity_mix_shares_add_up() {
    let evolution = engine().compute_entity_evolution("A1", &FilterSet::default()).unwrap();
    let mix = &evolution.product_mix;

    assert_eq!(mix[0].category, "AUTOS", "Largest premium first");
    let total: f64 = mix.iter().map(|m| m.share_pct).sum();
    assert!((total - 100.0).abs() < 1e-9, "shares sum to {total}");
}

/// Time and entity restrictions do not apply to an entity's own history;
/// the remaining facets do.
#[test]
fn entity_evolution_ignores_time_facets() {
    let filters = FilterSet::default()
        .with(Facet::Year, ["2024"])
        .with(Facet::Month, ["2"])
        .with(Facet::Entity, ["B1"])
        .with(Facet::Category, ["AUTOS"]);
    let evolution = engine().compute_entity_evolution("A1", &filters).unwrap();

    assert_eq!(evolution.totals.policies, 2, "Both autos, any month");
    assert_eq!(evolution.product_mix.len(), 1);
}

#[test]
fn unknown_entity_is_an_error() {
    let result = engine().compute_entity_evolution("Z9", &FilterSet::default());
    assert!(
        matches!(result, Err(AnalyticsError::EntityNotFound { ref code }) if code == "Z9"),
        "Unregistered code must fail, got {result:?}"
    );
}

// ── Advisor evolution ────────────────────────────────────────────────────────

#[test]
fn advisor_evolution_spans_their_entities() {
    let evolution = engine().compute_advisor_evolution("Ana").unwrap();

    assert_eq!(evolution.entities, 2);
    assert_eq!(evolution.totals.policies, 6, "Unresolved P7 is excluded");
    let january = evolution.series.iter().find(|p| p.period == "2024-01").unwrap();
    assert!((january.premium - 580.0).abs() < 1e-9);
}

#[test]
fn idle_advisor_has_empty_evolution() {
    let evolution = engine().compute_advisor_evolution("Luis").unwrap();
    assert_eq!(evolution.entities, 0);
    assert_eq!(evolution.totals.policies, 0);
    assert!(evolution.series.is_empty());
}

#[test]
fn unknown_advisor_is_an_error() {
    let result = engine().compute_advisor_evolution("Nadie");
    assert!(matches!(result, Err(AnalyticsError::AdvisorNotFound { .. })));
}

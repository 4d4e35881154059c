use portfolio_core::{
    config::AnalyticsConfig,
    dedup::deduplicate,
    engine::PortfolioEngine,
    filter::FilterSet,
    record::{AdvisorRecord, PolicyRecord, RegistryLink},
    resolver::{extract_code, EntityResolver},
    store::MemoryStore,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn link(advisor: &str, identifier: &str) -> RegistryLink {
    RegistryLink { advisor_name: advisor.into(), entity_identifier: identifier.into() }
}

fn policy(number: &str, entity_text: &str, status: &str, premium: &str) -> PolicyRecord {
    PolicyRecord {
        policy_number:  number.into(),
        entity_text:    entity_text.into(),
        product_name:   "AUTO TODO RIESGO".into(),
        company:        "MAP".into(),
        premium:        premium.into(),
        effective_date: "2023-01-10".into(),
        status:         status.into(),
        ..Default::default()
    }
}

fn engine(policies: Vec<PolicyRecord>, links: Vec<RegistryLink>) -> PortfolioEngine<MemoryStore> {
    let advisors = vec![AdvisorRecord { name: "Ana".into() }];
    PortfolioEngine::new(MemoryStore::new(policies, links, advisors), AnalyticsConfig::default())
}

// ── Resolution ───────────────────────────────────────────────────────────────

#[test]
fn code_is_text_after_last_separator() {
    assert_eq!(extract_code("Acme Corp - 00231"), "00231");
    assert_eq!(extract_code("00231"), "00231");
    assert_eq!(extract_code("Smith - Jones - 00231"), "00231", "Only the last separator counts");
}

/// A registry written as "Name - Code" and a policy written as a bare code
/// column must meet on the same canonical entity.
#[test]
fn mixed_encodings_resolve_to_one_entity() {
    let resolver = EntityResolver::from_links(&[link("Ana", "Acme Corp - 00231")]);

    let by_text = resolver.resolve(policy("P1", "Acme Corp - 00231", "En Vigor", "10"));
    let by_code = resolver.resolve(PolicyRecord {
        entity_text: "Acme Corp".into(),
        entity_code: " 00231 ".into(),
        ..policy("P2", "", "En Vigor", "10")
    });

    assert_eq!(by_text.entity_code(), Some("00231"));
    assert_eq!(by_code.entity_code(), Some("00231"), "Direct code column is the fallback");
    assert_eq!(by_text.advisor, "Ana");
    assert_eq!(by_code.entity.as_ref().map(|e| e.name.as_str()), Some("Acme Corp"));
}

#[test]
fn later_registry_link_overrides_advisor() {
    let resolver = EntityResolver::from_links(&[link("Ana", "00231"), link("Luis", "Acme - 00231")]);
    assert_eq!(resolver.advisor_for("00231"), Some("Luis"));
    assert_eq!(resolver.len(), 1);
}

/// Unresolved policies count in totals but never appear in entity or
/// advisor breakdowns.
#[test]
fn unresolved_policies_stay_out_of_entity_views() {
    let engine = engine(
        vec![
            policy("P1", "Acme - 001", "En Vigor", "100,00"),
            policy("P2", "Ghost - 999", "En Vigor", "50,00"),
        ],
        vec![link("Ana", "Acme - 001")],
    );
    let metrics = engine.compute_metrics(&FilterSet::default()).unwrap();

    assert_eq!(metrics.totals.policies, 2);
    assert!((metrics.totals.premium - 150.0).abs() < 1e-9);
    assert_eq!(metrics.breakdowns.by_entity.len(), 1);
    assert_eq!(metrics.breakdowns.by_entity[0].key, "001");
    let ana = metrics.breakdowns.by_advisor.iter().find(|b| b.key == "Ana").unwrap();
    assert!((ana.premium - 100.0).abs() < 1e-9, "Unresolved premium must not reach the advisor");
    assert!(
        metrics.breakdowns.by_advisor.iter().all(|b| b.key != "Sin Asesor"),
        "No bucket for unassigned policies"
    );
}

// ── Deduplication ────────────────────────────────────────────────────────────

/// Movement rows collapse; the number of distinct policy numbers survives.
#[test]
fn dedup_preserves_distinct_policy_count() {
    let resolver = EntityResolver::default();
    let rows = ["A", "B", "A", "C", "B", "A"]
        .iter()
        .map(|n| resolver.resolve(policy(n, "", "En Vigor", "1")))
        .collect();
    let kept = deduplicate(rows);
    let numbers: Vec<&str> = kept.iter().map(|p| p.record.policy_number.as_str()).collect();
    assert_eq!(numbers, vec!["A", "B", "C"], "First-appearance order of keys");
}

#[test]
fn last_cancelled_row_wins() {
    let resolver = EntityResolver::default();
    let mut first_cancel = policy("P1", "", "Anulada", "1");
    first_cancel.cancellation_reason = "Impago".into();
    let mut second_cancel = policy("P1", "", "Baja", "1");
    second_cancel.cancellation_reason = "Precio".into();

    let rows = vec![
        resolver.resolve(policy("P1", "", "En Vigor", "1")),
        resolver.resolve(first_cancel),
        resolver.resolve(policy("P1", "", "En Vigor", "1")),
        resolver.resolve(second_cancel),
    ];
    let kept = deduplicate(rows);

    assert_eq!(kept.len(), 1);
    assert!(kept[0].is_cancelled());
    assert_eq!(kept[0].record.cancellation_reason, "Precio");
}

#[test]
fn active_duplicates_keep_first_row() {
    let resolver = EntityResolver::default();
    let rows = vec![
        resolver.resolve(policy("P1", "", "En Vigor", "100")),
        resolver.resolve(policy("P1", "", "Cartera", "999")),
    ];
    let kept = deduplicate(rows);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].record.premium, "100");
}

/// Rows without a policy number share the empty key and collapse into one.
#[test]
fn blank_policy_numbers_share_a_key() {
    let _ = env_logger::builder().is_test(true).try_init();
    let resolver = EntityResolver::default();
    let rows = vec![
        resolver.resolve(policy("", "", "En Vigor", "10")),
        resolver.resolve(policy("", "", "En Vigor", "20")),
        resolver.resolve(policy("P9", "", "En Vigor", "30")),
    ];
    let kept = deduplicate(rows);
    assert_eq!(kept.len(), 2);
    assert_eq!(kept[0].record.premium, "10");
}

use chrono::NaiveDate;
use portfolio_core::{
    config::AnalyticsConfig,
    engine::PortfolioEngine,
    filter::FilterSet,
    record::{AdvisorRecord, PolicyRecord, RegistryLink},
    store::{MemoryStore, RecordStore, SqliteStore},
    synthetic::{self, SyntheticParams},
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn sqlite_store() -> SqliteStore {
    let store = SqliteStore::in_memory().unwrap();
    store.migrate().unwrap();
    store
}

fn policy(number: &str, status: &str) -> PolicyRecord {
    PolicyRecord {
        policy_number:       number.into(),
        entity_text:         "Acme Corp - 00231".into(),
        product_name:        "HOGAR CONFORT".into(),
        company:             "AXA".into(),
        premium:             "1.234,56".into(),
        effective_date:      "15/03/2021".into(),
        status:              status.into(),
        payment_method:      "Mensual".into(),
        production_year:     "2021".into(),
        production_month:    "03".into(),
        ..Default::default()
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Rows come back exactly as written and in insertion order.
#[test]
fn import_round_trips_in_source_order() {
    let store = sqlite_store();
    let mut cancelled = policy("P1", "Anulada");
    cancelled.cancellation_date = "2022-01-01".into();
    cancelled.cancellation_reason = "Precio".into();
    let policies = vec![policy("P2", "En Vigor"), policy("P1", "En Vigor"), cancelled];
    let links = vec![RegistryLink { advisor_name: "Ana".into(), entity_identifier: "Acme Corp - 00231".into() }];
    let advisors = vec![AdvisorRecord { name: "Ana".into() }];

    store.import(&policies, &links, &advisors).unwrap();

    assert_eq!(store.policy_count().unwrap(), 3);
    assert_eq!(store.fetch_policies().unwrap(), policies);
    assert_eq!(store.fetch_registry_links().unwrap(), links);
    assert_eq!(store.fetch_advisors().unwrap(), advisors);
}

/// A file-backed store opens in WAL mode and keeps its rows across reopen.
#[test]
fn file_store_persists_across_reopen() {
    let path = std::env::temp_dir().join(format!("portfolio-store-{}.db", std::process::id()));
    let path_str = path.to_str().unwrap();
    let _ = std::fs::remove_file(&path);

    {
        let store = SqliteStore::open(path_str).unwrap();
        store.migrate().unwrap();
        store.import(&[policy("P1", "En Vigor")], &[], &[]).unwrap();
    }
    let reopened = SqliteStore::open(path_str).unwrap();
    reopened.migrate().unwrap();
    assert_eq!(reopened.fetch_policies().unwrap(), vec![policy("P1", "En Vigor")]);
    drop(reopened);

    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{path_str}{suffix}"));
    }
}

/// The runner's default database is in-memory and goes through `open`.
#[test]
fn open_accepts_in_memory_path() {
    let store = SqliteStore::open(":memory:").unwrap();
    store.migrate().unwrap();
    assert_eq!(store.policy_count().unwrap(), 0);
}

#[test]
fn migrate_is_repeatable() {
    let store = sqlite_store();
    store.migrate().unwrap();
    assert_eq!(store.policy_count().unwrap(), 0);
}

/// The same records give the same metrics whether they live in SQLite or
/// in memory.
#[test]
fn sqlite_and_memory_stores_agree() {
    let reference = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
    let data = synthetic::generate(&SyntheticParams::new(2024, 60, reference));

    let sqlite = sqlite_store();
    sqlite.import(&data.policies, &data.links, &data.advisors).unwrap();
    let memory = MemoryStore::new(data.policies, data.links, data.advisors);

    let from_sqlite = PortfolioEngine::new(sqlite, AnalyticsConfig::default())
        .compute_metrics(&FilterSet::default())
        .unwrap();
    let from_memory = PortfolioEngine::new(memory, AnalyticsConfig::default())
        .compute_metrics(&FilterSet::default())
        .unwrap();

    assert_eq!(
        serde_json::to_value(&from_sqlite).unwrap(),
        serde_json::to_value(&from_memory).unwrap(),
    );
}

#[test]
fn sqlite_backed_engine_deduplicates() {
    let store = sqlite_store();
    let mut cancelled = policy("P1", "Baja");
    cancelled.cancellation_reason = "Impago".into();
    store
        .import(
            &[policy("P1", "En Vigor"), cancelled],
            &[RegistryLink { advisor_name: "Ana".into(), entity_identifier: "00231".into() }],
            &[],
        )
        .unwrap();

    let metrics = PortfolioEngine::new(store, AnalyticsConfig::default())
        .compute_metrics(&FilterSet::default())
        .unwrap();
    assert_eq!(metrics.totals.policies, 1);
    assert_eq!(metrics.totals.cancelled, 1);
    assert!((metrics.totals.premium - 1234.56).abs() < 1e-9);
    assert_eq!(metrics.breakdowns.cancellation_reasons[0].reason, "Impago");
}

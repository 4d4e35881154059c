use portfolio_core::{
    config::AnalyticsConfig,
    engine::PortfolioEngine,
    record::{AdvisorRecord, PolicyRecord, RegistryLink},
    store::MemoryStore,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

struct Portfolio {
    policies: Vec<PolicyRecord>,
    links:    Vec<RegistryLink>,
    next_id:  usize,
}

impl Portfolio {
    fn new() -> Self {
        Self { policies: Vec::new(), links: Vec::new(), next_id: 0 }
    }

    /// Register a new entity under `advisor` holding `(product, date)` policies.
    fn entity(&mut self, advisor: &str, purchases: &[(&str, &str)]) -> String {
        self.next_id += 1;
        let code = format!("{:03}", self.next_id);
        let identifier = format!("Entity {} - {code}", self.next_id);
        self.links.push(RegistryLink {
            advisor_name:      advisor.into(),
            entity_identifier: identifier.clone(),
        });
        for (i, (product, date)) in purchases.iter().enumerate() {
            self.policies.push(PolicyRecord {
                policy_number:  format!("P{code}-{i}"),
                entity_text:    identifier.clone(),
                product_name:   product.to_string(),
                premium:        "100,00".into(),
                effective_date: date.to_string(),
                status:         "En Vigor".into(),
                ..Default::default()
            });
        }
        code
    }

    fn engine(self) -> PortfolioEngine<MemoryStore> {
        let advisors = vec![AdvisorRecord { name: "Ana".into() }, AdvisorRecord { name: "Luis".into() }];
        PortfolioEngine::new(
            MemoryStore::new(self.policies, self.links, advisors),
            AnalyticsConfig::default(),
        )
    }
}

const AUTO_THEN_HOME: &[(&str, &str)] = &[("AUTO", "2020-01-01"), ("HOGAR", "2021-01-01")];
const HEALTH_ONLY: &[(&str, &str)] = &[("SALUD", "2020-05-05")];
const AUTO_ONLY: &[(&str, &str)] = &[("AUTO", "2020-02-02")];

// ── Tests ────────────────────────────────────────────────────────────────────

/// 6 entities buy auto then home, 4 only hold health.
/// N=10, |AUTOS|=6, |HOGAR|=6, pair=6 → confidence 1, lift 10/6, χ²=10.
#[test]
fn strong_sequence_becomes_a_rule() {
    let mut p = Portfolio::new();
    for _ in 0..6 {
        p.entity("Ana", AUTO_THEN_HOME);
    }
    for _ in 0..4 {
        p.entity("Ana", HEALTH_ONLY);
    }
    let rules = p.engine().mine_cross_sell_rules(None).unwrap();

    assert_eq!(rules.len(), 1, "rules={rules:?}");
    let rule = &rules[0];
    assert_eq!((rule.antecedent.as_str(), rule.consequent.as_str()), ("AUTOS", "HOGAR"));
    assert_eq!(rule.population, 10);
    assert_eq!(rule.pair_entities, 6);
    assert!((rule.confidence - 1.0).abs() < 1e-12);
    assert!((rule.support - 0.6).abs() < 1e-12);
    assert!((rule.lift - 10.0 / 6.0).abs() < 1e-12, "lift={}", rule.lift);
    assert!((rule.chi_square - 10.0).abs() < 1e-9, "chi={}", rule.chi_square);
    assert_eq!(rule.target_count, 0);
}

/// Entities holding the antecedent but not the consequent are targets.
/// N=12, |AUTOS|=8, |HOGAR|=6, pair=6 → confidence .75, lift 1.5, χ²=6.
#[test]
fn targets_are_antecedent_holders_without_consequent() {
    let mut p = Portfolio::new();
    for _ in 0..6 {
        p.entity("Ana", AUTO_THEN_HOME);
    }
    let t1 = p.entity("Ana", AUTO_ONLY);
    let t2 = p.entity("Luis", AUTO_ONLY);
    for _ in 0..4 {
        p.entity("Luis", HEALTH_ONLY);
    }
    let rules = p.engine().mine_cross_sell_rules(None).unwrap();

    assert_eq!(rules.len(), 1);
    let rule = &rules[0];
    assert!((rule.confidence - 0.75).abs() < 1e-12);
    assert!((rule.lift - 1.5).abs() < 1e-12);
    assert!((rule.chi_square - 6.0).abs() < 1e-9);
    assert_eq!(rule.target_count, 2);
    let sampled: Vec<&str> = rule.target_sample.iter().map(|s| s.code.as_str()).collect();
    assert_eq!(sampled, vec![t1.as_str(), t2.as_str()]);
}

#[test]
fn thin_antecedent_is_not_mined() {
    let mut p = Portfolio::new();
    for _ in 0..4 {
        p.entity("Ana", AUTO_THEN_HOME);
    }
    for _ in 0..4 {
        p.entity("Ana", HEALTH_ONLY);
    }
    let rules = p.engine().mine_cross_sell_rules(None).unwrap();
    assert!(rules.is_empty(), "4 antecedent entities is below the minimum of 5");
}

/// Purchases on the same day carry no order, so no sequence exists.
#[test]
fn same_day_purchases_produce_no_rules() {
    let mut p = Portfolio::new();
    for _ in 0..8 {
        p.entity("Ana", &[("AUTO", "2020-01-01"), ("HOGAR", "2020-01-01")]);
    }
    for _ in 0..4 {
        p.entity("Ana", HEALTH_ONLY);
    }
    assert!(p.engine().mine_cross_sell_rules(None).unwrap().is_empty());
}

#[test]
fn advisor_filter_restricts_the_population() {
    let mut p = Portfolio::new();
    for _ in 0..6 {
        p.entity("Ana", AUTO_THEN_HOME);
    }
    for _ in 0..4 {
        p.entity("Ana", HEALTH_ONLY);
    }
    let engine = p.engine();

    let luis = vec!["Luis".to_string()];
    assert!(engine.mine_cross_sell_rules(Some(luis.as_slice())).unwrap().is_empty());

    let ana = vec!["Ana".to_string()];
    assert_eq!(engine.mine_cross_sell_rules(Some(ana.as_slice())).unwrap().len(), 1);
}

/// Policies without a usable effective date take no part in sequences.
#[test]
fn undated_policies_are_ignored() {
    let mut p = Portfolio::new();
    for _ in 0..6 {
        p.entity("Ana", &[("AUTO", "2020-01-01"), ("HOGAR", "not a date")]);
    }
    for _ in 0..4 {
        p.entity("Ana", HEALTH_ONLY);
    }
    assert!(p.engine().mine_cross_sell_rules(None).unwrap().is_empty());
}

//! Sequential cross-sell rule mining.
//!
//! For every entity we build a dated category history and record which
//! categories were bought strictly before which others. A rule "A → B"
//! says entities that bought A tend to buy B later. Rules are kept when
//! they beat independence (lift), are not negligible (confidence) and pass
//! a 2×2 chi-square test.
//!
//! Counting unit is the entity, not the policy: an entity contributes at
//! most once to each category frequency and each ordered pair.

use crate::{config::AssociationConfig, resolver::ResolvedPolicy, types::ratio_or};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySample {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationRule {
    pub antecedent:          String,
    pub consequent:          String,
    pub support:             f64,
    pub confidence:          f64,
    pub lift:                f64,
    pub chi_square:          f64,
    pub antecedent_entities: usize,
    pub consequent_entities: usize,
    pub pair_entities:       usize,
    pub population:          usize,
    /// Entities holding the antecedent but not yet the consequent.
    pub target_count:        usize,
    pub target_sample:       Vec<EntitySample>,
}

/// Dated category history of one entity, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityHistory {
    pub name:   String,
    pub events: Vec<(NaiveDate, String)>,
}

impl EntityHistory {
    /// Ordered (earlier, later) category pairs, each at most once.
    pub fn ordered_pairs(&self) -> BTreeSet<(&str, &str)> {
        let mut pairs = BTreeSet::new();
        for (i, (date_a, cat_a)) in self.events.iter().enumerate() {
            for (date_b, cat_b) in &self.events[i + 1..] {
                if date_a < date_b && cat_a != cat_b {
                    pairs.insert((cat_a.as_str(), cat_b.as_str()));
                }
            }
        }
        pairs
    }

    pub fn categories(&self) -> BTreeSet<&str> {
        self.events.iter().map(|(_, c)| c.as_str()).collect()
    }
}

/// Population-level counts over entity histories.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SequenceStats {
    pub population:         usize,
    pub category_frequency: BTreeMap<String, usize>,
    pub pair_frequency:     BTreeMap<(String, String), usize>,
}

// ── Building blocks ──────────────────────────────────────────────────────────

/// Dated histories keyed by entity code. Only resolved policies with a
/// parseable effective date take part. `advisors`, when given, restricts
/// to policies of those advisors.
pub fn build_histories(
    policies: &[ResolvedPolicy],
    advisors: Option<&[String]>,
) -> BTreeMap<String, EntityHistory> {
    let allowed: Option<BTreeSet<&str>> =
        advisors.map(|list| list.iter().map(|a| a.trim()).collect());

    let mut histories: BTreeMap<String, EntityHistory> = BTreeMap::new();
    for policy in policies {
        let (Some(entity), Some(date)) = (policy.entity.as_ref(), policy.effective) else {
            continue;
        };
        if let Some(allowed) = &allowed {
            if !allowed.contains(policy.advisor.as_str()) {
                continue;
            }
        }
        histories
            .entry(entity.code.clone())
            .or_insert_with(|| EntityHistory { name: entity.name.clone(), events: Vec::new() })
            .events
            .push((date, policy.category.clone()));
    }

    for history in histories.values_mut() {
        history.events.sort();
    }
    histories
}

pub fn sequence_stats(histories: &BTreeMap<String, EntityHistory>) -> SequenceStats {
    let mut stats = SequenceStats::default();
    for history in histories.values() {
        if history.events.is_empty() {
            continue;
        }
        stats.population += 1;
        for category in history.categories() {
            *stats.category_frequency.entry(category.to_string()).or_insert(0) += 1;
        }
        for (a, b) in history.ordered_pairs() {
            *stats.pair_frequency.entry((a.to_string(), b.to_string())).or_insert(0) += 1;
        }
    }
    stats
}

/// Pearson chi-square of a 2×2 table, no continuity correction.
/// A degenerate table (any zero margin) scores 0.
pub fn chi_square(a: f64, b: f64, c: f64, d: f64) -> f64 {
    let n = a + b + c + d;
    let denominator = (a + b) * (c + d) * (a + c) * (b + d);
    if denominator == 0.0 {
        return 0.0;
    }
    let cross = a * d - b * c;
    n * cross * cross / denominator
}

// ── Miner ────────────────────────────────────────────────────────────────────

/// Mine ranked sequential rules from resolved, deduplicated policies.
pub fn mine_rules(
    policies: &[ResolvedPolicy],
    advisors: Option<&[String]>,
    config:   &AssociationConfig,
) -> Vec<AssociationRule> {
    let histories = build_histories(policies, advisors);
    let stats = sequence_stats(&histories);
    let n = stats.population as f64;

    let mut rules = Vec::new();
    for ((antecedent, consequent), &pair_count) in &stats.pair_frequency {
        let count_a = stats.category_frequency.get(antecedent).copied().unwrap_or(0);
        if count_a < config.min_antecedent_entities {
            continue;
        }
        let count_b = stats.category_frequency.get(consequent).copied().unwrap_or(0);

        let a = pair_count as f64;
        let confidence = ratio_or(a, count_a as f64, 0.0);
        let support = ratio_or(a, n, 0.0);
        let expected = ratio_or(count_a as f64 * count_b as f64, n, 0.0);
        let lift = ratio_or(a, expected, 0.0);

        let b = count_a as f64 - a;
        let c = count_b as f64 - a;
        let d = n - a - b - c;
        let chi = chi_square(a, b, c, d);
        let significant = chi > config.chi_square_critical;

        if !(lift > config.min_lift && confidence > config.min_confidence && significant) {
            continue;
        }

        // Full scan for the count, capped sample for the payload.
        let mut target_count = 0;
        let mut target_sample = Vec::new();
        for (code, history) in &histories {
            let held = history.categories();
            if held.contains(antecedent.as_str()) && !held.contains(consequent.as_str()) {
                target_count += 1;
                if target_sample.len() < config.max_target_samples {
                    target_sample.push(EntitySample { code: code.clone(), name: history.name.clone() });
                }
            }
        }

        rules.push(AssociationRule {
            antecedent:          antecedent.clone(),
            consequent:          consequent.clone(),
            support,
            confidence,
            lift,
            chi_square:          chi,
            antecedent_entities: count_a,
            consequent_entities: count_b,
            pair_entities:       pair_count,
            population:          stats.population,
            target_count,
            target_sample,
        });
    }

    rules.sort_by(|x, y| {
        y.lift
            .total_cmp(&x.lift)
            .then_with(|| y.confidence.total_cmp(&x.confidence))
            .then_with(|| x.antecedent.cmp(&y.antecedent))
            .then_with(|| x.consequent.cmp(&y.consequent))
    });
    rules.truncate(config.max_rules);

    log::debug!(
        "cross-sell: {} entities, {} ordered pairs, {} rules emitted",
        stats.population, stats.pair_frequency.len(), rules.len(),
    );
    rules
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn repeated_pattern_counts_once_per_entity() {
        let history = EntityHistory {
            name: "E".into(),
            events: vec![
                (date(2020, 1, 1), "AUTOS".into()),
                (date(2021, 1, 1), "AUTOS".into()),
                (date(2022, 1, 1), "HOGAR".into()),
                (date(2023, 1, 1), "HOGAR".into()),
            ],
        };
        let pairs = history.ordered_pairs();
        assert_eq!(pairs.len(), 1);
        assert!(pairs.contains(&("AUTOS", "HOGAR")));
    }

    #[test]
    fn same_day_purchases_have_no_order() {
        let history = EntityHistory {
            name: "E".into(),
            events: vec![(date(2020, 1, 1), "AUTOS".into()), (date(2020, 1, 1), "HOGAR".into())],
        };
        assert!(history.ordered_pairs().is_empty());
    }

    #[test]
    fn chi_square_matches_hand_computation() {
        // a=6 b=0 c=0 d=4 → 10 × 24² / (6·4·6·4) = 10
        assert!((chi_square(6.0, 0.0, 0.0, 4.0) - 10.0).abs() < 1e-12);
        assert_eq!(chi_square(5.0, 0.0, 5.0, 0.0), 0.0);
    }
}

//! Churn risk scoring: multiplicative per-policy cancellation risk.
//!
//! This module:
//!   1. Computes the baseline cancellation rate of the filtered population
//!   2. Derives per-dimension risk factors (category, company, tenure,
//!      payment method) as dimension rate / baseline
//!   3. Applies entity and policy pressure multipliers to active policies
//!      (contagion, renewal window, loyalty, premium pressure)
//!   4. Attributes each score to its strongest factors
//!
//! score = min(max_score, baseline × Π factors). Every factor is ≥ 0, so the
//! score is monotone in each of them.

use crate::{
    config::ChurnModelConfig,
    filter::{FilterMatcher, FilterSet},
    resolver::ResolvedPolicy,
    types::ratio_or,
};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

const UNKNOWN_PAYMENT: &str = "unknown";

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TenureBucket {
    #[serde(rename = "<1y")]
    UnderOneYear,
    #[serde(rename = "1-2y")]
    OneToTwoYears,
    #[serde(rename = "2-5y")]
    TwoToFiveYears,
    #[serde(rename = "5y+")]
    FivePlusYears,
    #[serde(rename = "unknown")]
    Unknown,
}

impl TenureBucket {
    pub fn from_months(months: i64) -> Self {
        match months {
            m if m < 12 => TenureBucket::UnderOneYear,
            m if m < 24 => TenureBucket::OneToTwoYears,
            m if m < 60 => TenureBucket::TwoToFiveYears,
            _ => TenureBucket::FivePlusYears,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TenureBucket::UnderOneYear   => "<1y",
            TenureBucket::OneToTwoYears  => "1-2y",
            TenureBucket::TwoToFiveYears => "2-5y",
            TenureBucket::FivePlusYears  => "5y+",
            TenureBucket::Unknown        => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorKind {
    Category,
    Company,
    Tenure,
    PaymentMethod,
    Contagion,
    Renewal,
    Loyalty,
    PremiumPressure,
}

impl FactorKind {
    /// Wire name; also the attribution tie-break.
    pub fn name(self) -> &'static str {
        match self {
            FactorKind::Category        => "category",
            FactorKind::Company         => "company",
            FactorKind::Tenure          => "tenure",
            FactorKind::PaymentMethod   => "payment_method",
            FactorKind::Contagion       => "contagion",
            FactorKind::Renewal         => "renewal",
            FactorKind::Loyalty         => "loyalty",
            FactorKind::PremiumPressure => "premium_pressure",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub kind:   FactorKind,
    pub detail: String,
    pub impact: f64,
}

/// The eight multipliers applied on top of the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskMultipliers {
    pub category:         f64,
    pub company:          f64,
    pub tenure:           f64,
    pub payment:          f64,
    pub contagion:        f64,
    pub renewal:          f64,
    pub loyalty:          f64,
    pub premium_pressure: f64,
}

impl Default for RiskMultipliers {
    fn default() -> Self {
        Self {
            category:         1.0,
            company:          1.0,
            tenure:           1.0,
            payment:          1.0,
            contagion:        1.0,
            renewal:          1.0,
            loyalty:          1.0,
            premium_pressure: 1.0,
        }
    }
}

impl RiskMultipliers {
    pub fn product(&self) -> f64 {
        self.category
            * self.company
            * self.tenure
            * self.payment
            * self.contagion
            * self.renewal
            * self.loyalty
            * self.premium_pressure
    }

    fn by_kind(&self) -> [(FactorKind, f64); 8] {
        [
            (FactorKind::Category,        self.category),
            (FactorKind::Company,         self.company),
            (FactorKind::Tenure,          self.tenure),
            (FactorKind::PaymentMethod,   self.payment),
            (FactorKind::Contagion,       self.contagion),
            (FactorKind::Renewal,         self.renewal),
            (FactorKind::Loyalty,         self.loyalty),
            (FactorKind::PremiumPressure, self.premium_pressure),
        ]
    }
}

/// Combine baseline and multipliers into a clamped score.
pub fn combine_score(baseline: f64, multipliers: &RiskMultipliers, max_score: f64) -> f64 {
    (baseline * multipliers.product()).min(max_score)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionRate {
    pub value:     String,
    pub decided:   u64,
    pub cancelled: u64,
    pub rate:      f64,
    pub factor:    f64,
    pub trusted:   bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnRiskEntry {
    pub policy_number:  String,
    pub entity_code:    String,
    pub entity_name:    String,
    pub advisor:        String,
    pub category:       String,
    pub company:        String,
    pub tenure:         TenureBucket,
    pub payment_method: String,
    pub premium:        f64,
    pub score:          f64,
    pub high_risk:      bool,
    pub factors:        Vec<RiskFactor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnRiskReport {
    pub as_of:           NaiveDate,
    pub population:      u64,
    pub cancelled:       u64,
    pub active:          u64,
    pub baseline_rate:   f64,
    pub high_risk_count: u64,
    pub category_rates:  Vec<DimensionRate>,
    pub entries:         Vec<ChurnRiskEntry>,
}

// ── Date helpers ─────────────────────────────────────────────────────────────

/// Complete months between two dates. Negative spans clamp to 0.
pub fn tenure_months(start: NaiveDate, end: NaiveDate) -> i64 {
    let mut months = (end.year() as i64 - start.year() as i64) * 12
        + (end.month() as i64 - start.month() as i64);
    if end.day() < start.day() {
        months -= 1;
    }
    months.max(0)
}

pub fn tenure_bucket(policy: &ResolvedPolicy, as_of: NaiveDate) -> TenureBucket {
    let end = if policy.is_cancelled() { policy.cancelled_on } else { Some(as_of) };
    match (policy.effective, end) {
        (Some(start), Some(end)) => TenureBucket::from_months(tenure_months(start, end)),
        _ => TenureBucket::Unknown,
    }
}

fn anniversary(effective: NaiveDate, year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, effective.month(), effective.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, effective.month(), 28))
}

/// Days from `as_of` to the next anniversary of `effective` (on or after
/// `as_of`). A 29 February start renews on 28 February in common years.
pub fn days_to_anniversary(effective: NaiveDate, as_of: NaiveDate) -> Option<i64> {
    let first_year = as_of.year().max(effective.year() + 1);
    (first_year..=first_year + 1)
        .filter_map(|year| anniversary(effective, year))
        .find(|date| *date >= as_of)
        .map(|date| (date - as_of).num_days())
}

// ── Rate tables ──────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct RateTable {
    counts: HashMap<String, (u64, u64)>,
}

impl RateTable {
    fn add(&mut self, key: &str, cancelled: bool) {
        let slot = self.counts.entry(key.to_string()).or_insert((0, 0));
        slot.0 += 1;
        slot.1 += cancelled as u64;
    }

    /// (rate, factor, trusted). Thin samples are neutral.
    fn factor(&self, key: &str, baseline: f64, cfg: &ChurnModelConfig) -> (f64, f64, bool) {
        match self.counts.get(key) {
            Some(&(decided, cancelled)) if decided as usize >= cfg.min_dimension_sample => {
                let rate = cancelled as f64 / decided as f64;
                (rate, rate / baseline.max(cfg.baseline_epsilon), true)
            }
            _ => (baseline, 1.0, false),
        }
    }

    fn rates(&self, baseline: f64, cfg: &ChurnModelConfig) -> Vec<DimensionRate> {
        let ordered: BTreeMap<&String, &(u64, u64)> = self.counts.iter().collect();
        ordered
            .into_iter()
            .map(|(value, &(decided, cancelled))| {
                let (rate, factor, trusted) = self.factor(value, baseline, cfg);
                DimensionRate { value: value.clone(), decided, cancelled, rate, factor, trusted }
            })
            .collect()
    }
}

fn payment_key(policy: &ResolvedPolicy) -> &str {
    let method = policy.record.payment_method.trim();
    if method.is_empty() { UNKNOWN_PAYMENT } else { method }
}

// ── Scorer ───────────────────────────────────────────────────────────────────

/// Score every active policy in scope.
pub fn score_policies(
    policies: &[ResolvedPolicy],
    filters:  &FilterSet,
    as_of:    NaiveDate,
    cfg:      &ChurnModelConfig,
) -> ChurnRiskReport {
    let matcher = FilterMatcher::new(filters);
    let scope: Vec<(&ResolvedPolicy, TenureBucket)> = policies
        .iter()
        .filter(|p| p.is_resolved() && matcher.matches(p))
        .map(|p| (p, tenure_bucket(p, as_of)))
        .collect();

    let population = scope.len() as u64;
    let cancelled = scope.iter().filter(|(p, _)| p.is_cancelled()).count() as u64;
    let active = scope.iter().filter(|(p, _)| p.state.is_active()).count() as u64;
    let baseline = ratio_or(cancelled as f64, population as f64, 0.0);

    let mut by_category = RateTable::default();
    let mut by_company = RateTable::default();
    let mut by_tenure = RateTable::default();
    let mut by_payment = RateTable::default();
    let mut entities_with_cancellation: HashSet<&str> = HashSet::new();
    let mut active_per_entity: HashMap<&str, u64> = HashMap::new();
    let mut active_premium: HashMap<&str, (f64, u64)> = HashMap::new();

    for (policy, tenure) in &scope {
        let code = policy.entity_code().unwrap_or_default();
        if policy.is_cancelled() {
            entities_with_cancellation.insert(code);
        } else if policy.state.is_active() {
            *active_per_entity.entry(code).or_insert(0) += 1;
            let slot = active_premium.entry(policy.category.as_str()).or_insert((0.0, 0));
            slot.0 += policy.premium;
            slot.1 += 1;
        } else {
            continue;
        }
        let is_cancelled = policy.is_cancelled();
        by_category.add(&policy.category, is_cancelled);
        by_company.add(policy.record.company.trim(), is_cancelled);
        by_tenure.add(tenure.label(), is_cancelled);
        by_payment.add(payment_key(policy), is_cancelled);
    }

    let mut entries = Vec::new();
    if population > 0 {
        for (policy, tenure) in scope.iter().filter(|(p, _)| p.state.is_active()) {
            let code = policy.entity_code().unwrap_or_default();
            let company = policy.record.company.trim();
            let payment = payment_key(policy);

            let renewal_due = policy
                .effective
                .and_then(|eff| days_to_anniversary(eff, as_of))
                .is_some_and(|days| days <= cfg.renewal_window_days);
            let loyalty = match active_per_entity.get(code).copied().unwrap_or(0) {
                n if n > 3 => cfg.loyalty_many_multiplier,
                n if n >= 2 => cfg.loyalty_some_multiplier,
                _ => cfg.loyalty_single_multiplier,
            };
            let premium_pressure = match active_premium.get(policy.category.as_str()) {
                Some(&(sum, count)) if count > 0 && sum > 0.0
                    && policy.premium > cfg.premium_pressure_ratio * (sum / count as f64) =>
                {
                    cfg.premium_pressure_multiplier
                }
                _ => 1.0,
            };

            let multipliers = RiskMultipliers {
                category: by_category.factor(&policy.category, baseline, cfg).1,
                company:  by_company.factor(company, baseline, cfg).1,
                tenure:   by_tenure.factor(tenure.label(), baseline, cfg).1,
                payment:  by_payment.factor(payment, baseline, cfg).1,
                contagion: if entities_with_cancellation.contains(code) {
                    cfg.contagion_multiplier
                } else {
                    cfg.no_contagion_multiplier
                },
                renewal: if renewal_due { cfg.renewal_multiplier } else { 1.0 },
                loyalty,
                premium_pressure,
            };

            let score = combine_score(baseline, &multipliers, cfg.max_score);
            if score <= cfg.min_reported_score {
                continue;
            }

            let details = [
                policy.category.as_str(),
                company,
                tenure.label(),
                payment,
                code,
                policy.record.effective_date.trim(),
                code,
                policy.category.as_str(),
            ];
            let mut factors: Vec<RiskFactor> = multipliers
                .by_kind()
                .into_iter()
                .zip(details)
                .filter(|((_, impact), _)| *impact > cfg.attribution_threshold)
                .map(|((kind, impact), detail)| RiskFactor { kind, detail: detail.to_string(), impact })
                .collect();
            factors.sort_by(|a, b| {
                b.impact
                    .total_cmp(&a.impact)
                    .then_with(|| a.kind.name().cmp(b.kind.name()))
            });
            factors.truncate(cfg.max_attributed_factors);

            let entity = policy.entity.as_ref();
            entries.push(ChurnRiskEntry {
                policy_number:  policy.record.policy_number.clone(),
                entity_code:    code.to_string(),
                entity_name:    entity.map(|e| e.name.clone()).unwrap_or_default(),
                advisor:        policy.advisor.clone(),
                category:       policy.category.clone(),
                company:        company.to_string(),
                tenure:         *tenure,
                payment_method: payment.to_string(),
                premium:        policy.premium,
                score,
                high_risk:      score > cfg.high_risk_ratio * baseline,
                factors,
            });
        }
    }

    entries.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.policy_number.cmp(&b.policy_number))
    });
    let high_risk_count = entries.iter().filter(|e| e.high_risk).count() as u64;

    log::debug!(
        "churn: population={population} cancelled={cancelled} baseline={baseline:.4} scored={} high_risk={high_risk_count}",
        entries.len(),
    );

    ChurnRiskReport {
        as_of,
        population,
        cancelled,
        active,
        baseline_rate: baseline,
        high_risk_count,
        category_rates: by_category.rates(baseline, cfg),
        entries,
    }
}

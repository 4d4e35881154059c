//! Aggregation engine: filtered portfolio breakdowns.
//!
//! One pass over the resolved, deduplicated policies produces:
//!   1. Totals and per-dimension buckets for the records matching all facets
//!   2. Self-excluding filter options (see filter.rs)
//!   3. Cross-sell coverage, survival, Pareto and month-over-month trend
//!
//! All maps live for one call only. Output order never depends on hash
//! iteration: every list is sorted with an explicit tie-break.

use crate::{
    config::AnalyticsConfig,
    filter::{Facet, FilterMatcher, FilterOptions, FilterSet, OptionCollector},
    insights::{self, StrategicInsight},
    record::AdvisorRecord,
    resolver::ResolvedPolicy,
    types::{months_between, previous_period, ratio_or, Period},
};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

const NO_STATUS: &str = "Sin estado";
const NO_REASON: &str = "Sin motivo";

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioTotals {
    pub premium:            f64,
    pub policies:           u64,
    pub cancelled:          u64,
    pub active:             u64,
    pub entities:           usize,
    pub avg_ticket:         f64,
    pub churn_rate_pct:     f64,
    pub retention_rate_pct: f64,
}

/// One row of a breakdown. Cardinality fields are only present for the
/// dimensions that track them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub key:       String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label:     Option<String>,
    pub premium:   f64,
    pub policies:  u64,
    pub cancelled: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distinct_entities: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distinct_advisors: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonCount {
    pub reason: String,
    pub count:  u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Breakdowns {
    pub by_entity:            Vec<Bucket>,
    pub by_advisor:           Vec<Bucket>,
    pub by_product:           Vec<Bucket>,
    pub by_category:          Vec<Bucket>,
    pub by_company:           Vec<Bucket>,
    pub by_status:            Vec<Bucket>,
    pub cancellation_reasons: Vec<ReasonCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPair {
    pub first:    String,
    pub second:   String,
    pub entities: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextBestAction {
    pub entity_code:        String,
    pub entity_name:        String,
    pub current_category:   String,
    pub suggested_category: String,
    /// Entities already holding both categories.
    pub co_occurrences:     usize,
}

/// Unordered category coverage per entity. Sequential patterns live in
/// association.rs; this view only counts co-occurrence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrossSellCoverage {
    pub entities:               usize,
    pub single_category:        usize,
    pub two_categories:         usize,
    pub three_plus_categories:  usize,
    pub mono_product_share_pct: f64,
    pub pairs:                  Vec<CategoryPair>,
    pub suggestions:            Vec<NextBestAction>,
}

impl CrossSellCoverage {
    /// The category most often held together with `category`.
    /// Ties go to the alphabetically first partner.
    pub fn best_partner(&self, category: &str) -> Option<(&str, usize)> {
        self.pairs
            .iter()
            .filter_map(|p| {
                if p.first == category {
                    Some((p.second.as_str(), p.entities))
                } else if p.second == category {
                    Some((p.first.as_str(), p.entities))
                } else {
                    None
                }
            })
            .min_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySurvival {
    pub category:   String,
    pub avg_months: f64,
    pub samples:    u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTrend {
    pub period:              String,
    pub previous_period:     String,
    pub premium:             f64,
    pub previous_premium:    f64,
    pub premium_change_pct:  f64,
    pub policies:            u64,
    pub previous_policies:   u64,
    pub policies_change_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParetoPoint {
    pub entity_code:    String,
    pub entity_name:    String,
    pub premium:        f64,
    pub share_pct:      f64,
    pub cumulative_pct: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParetoSummary {
    pub points:         Vec<ParetoPoint>,
    pub head_entities:  usize,
    pub head_share_pct: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdvancedInsights {
    pub cross_sell: CrossSellCoverage,
    pub survival:   Vec<CategorySurvival>,
    pub trend:      Option<MonthlyTrend>,
    pub pareto:     ParetoSummary,
    pub strategic:  Vec<StrategicInsight>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioMetrics {
    pub totals:         PortfolioTotals,
    pub breakdowns:     Breakdowns,
    pub filter_options: FilterOptions,
    pub insights:       AdvancedInsights,
}

// ── Accumulators ─────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct TotalsAccumulator {
    premium:   f64,
    policies:  u64,
    cancelled: u64,
    active:    u64,
    entities:  HashSet<String>,
}

impl TotalsAccumulator {
    fn add(&mut self, policy: &ResolvedPolicy) {
        self.premium += policy.premium;
        self.policies += 1;
        if policy.is_cancelled() {
            self.cancelled += 1;
        } else if policy.state.is_active() {
            self.active += 1;
        }
        if let Some(code) = policy.entity_code() {
            self.entities.insert(code.to_string());
        }
    }

    fn finish(self) -> PortfolioTotals {
        let n = self.policies as f64;
        let churn_rate_pct = ratio_or(self.cancelled as f64, n, 0.0) * 100.0;
        PortfolioTotals {
            premium:            self.premium,
            policies:           self.policies,
            cancelled:          self.cancelled,
            active:             self.active,
            entities:           self.entities.len(),
            avg_ticket:         ratio_or(self.premium, n, 0.0),
            churn_rate_pct,
            retention_rate_pct: ratio_or(self.active as f64, n, 0.0) * 100.0,
        }
    }
}

#[derive(Debug, Default)]
struct BucketAccumulator {
    label:     Option<String>,
    premium:   f64,
    policies:  u64,
    cancelled: u64,
    entities:  HashSet<String>,
    advisors:  HashSet<String>,
}

/// Keyed buckets for one dimension.
#[derive(Debug, Default)]
pub(crate) struct BucketMap {
    buckets:        HashMap<String, BucketAccumulator>,
    track_entities: bool,
    track_advisors: bool,
}

impl BucketMap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn tracking_entities(mut self) -> Self {
        self.track_entities = true;
        self
    }

    pub(crate) fn tracking_advisors(mut self) -> Self {
        self.track_advisors = true;
        self
    }

    /// Ensure a zero bucket exists for `key`.
    pub(crate) fn seed(&mut self, key: &str) {
        self.buckets.entry(key.to_string()).or_default();
    }

    pub(crate) fn add(&mut self, key: &str, label: Option<&str>, policy: &ResolvedPolicy) {
        let bucket = self.buckets.entry(key.to_string()).or_default();
        if bucket.label.is_none() {
            bucket.label = label.map(str::to_string);
        }
        bucket.premium += policy.premium;
        bucket.policies += 1;
        if policy.is_cancelled() {
            bucket.cancelled += 1;
        }
        if let Some(entity) = policy.entity.as_ref() {
            if self.track_entities {
                bucket.entities.insert(entity.code.clone());
            }
            if self.track_advisors {
                bucket.advisors.insert(entity.advisor.clone());
            }
        }
    }

    /// Buckets by premium descending, key ascending on ties.
    pub(crate) fn finish(self) -> Vec<Bucket> {
        let (track_entities, track_advisors) = (self.track_entities, self.track_advisors);
        let mut out: Vec<Bucket> = self
            .buckets
            .into_iter()
            .map(|(key, acc)| Bucket {
                key,
                label:     acc.label,
                premium:   acc.premium,
                policies:  acc.policies,
                cancelled: acc.cancelled,
                distinct_entities: track_entities.then_some(acc.entities.len()),
                distinct_advisors: track_advisors.then_some(acc.advisors.len()),
            })
            .collect();
        sort_buckets(&mut out);
        out
    }
}

pub(crate) fn sort_buckets(buckets: &mut [Bucket]) {
    buckets.sort_by(|a, b| b.premium.total_cmp(&a.premium).then_with(|| a.key.cmp(&b.key)));
}

pub(crate) fn format_period((year, month): Period) -> String {
    format!("{year:04}-{month:02}")
}

pub(crate) fn pct_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        if current > 0.0 { 100.0 } else { 0.0 }
    } else {
        (current - previous) / previous * 100.0
    }
}

// ── Engine ───────────────────────────────────────────────────────────────────

/// Compute totals, breakdowns, options and advanced insights for one query.
pub fn compute_metrics(
    policies: &[ResolvedPolicy],
    advisors: &[AdvisorRecord],
    filters:  &FilterSet,
    config:   &AnalyticsConfig,
) -> PortfolioMetrics {
    let matcher = FilterMatcher::new(filters);
    let trend_period = filters.single_period();

    let mut options = OptionCollector::default();
    let mut totals = TotalsAccumulator::default();
    let mut previous = TotalsAccumulator::default();

    let mut by_entity = BucketMap::new();
    let mut by_advisor = BucketMap::new();
    let mut by_product = BucketMap::new().tracking_entities();
    let mut by_category = BucketMap::new().tracking_entities();
    let mut by_company = BucketMap::new().tracking_entities().tracking_advisors();
    let mut by_status = BucketMap::new();
    let mut reasons: HashMap<String, u64> = HashMap::new();

    let mut entity_categories: BTreeMap<String, (String, BTreeSet<String>)> = BTreeMap::new();
    let mut survival: BTreeMap<String, (i64, u64)> = BTreeMap::new();

    // Known advisors show up even without policies, unless filtered out.
    for advisor in advisors {
        let name = advisor.name.trim();
        if name.is_empty() {
            continue;
        }
        if filters.advisor.is_empty() || filters.advisor.iter().any(|a| a.trim() == name) {
            by_advisor.seed(name);
        }
    }

    for policy in policies {
        let flags = matcher.flags(policy);
        options.observe(policy, &flags);

        if let Some(current) = trend_period {
            if flags.all_except(&[Facet::Year, Facet::Month])
                && policy.period == Some(previous_period(current))
            {
                previous.add(policy);
            }
        }

        if !flags.all() {
            continue;
        }

        totals.add(policy);
        by_product.add(policy.record.product_name.trim(), None, policy);
        by_category.add(&policy.category, None, policy);
        by_company.add(policy.record.company.trim(), None, policy);
        let status = policy.record.status.trim();
        by_status.add(if status.is_empty() { NO_STATUS } else { status }, None, policy);

        if policy.is_cancelled() {
            let reason = policy.record.cancellation_reason.trim();
            let reason = if reason.is_empty() { NO_REASON } else { reason };
            *reasons.entry(reason.to_string()).or_insert(0) += 1;

            if let (Some(period), Some(cancelled_on)) = (policy.period, policy.cancelled_on) {
                let months = months_between(period, (cancelled_on.year(), cancelled_on.month()));
                if months >= 0 {
                    let slot = survival.entry(policy.category.clone()).or_insert((0, 0));
                    slot.0 += months;
                    slot.1 += 1;
                }
            }
        }

        if let Some(entity) = policy.entity.as_ref() {
            by_entity.add(&entity.code, Some(&entity.name), policy);
            by_advisor.add(&entity.advisor, None, policy);
            entity_categories
                .entry(entity.code.clone())
                .or_insert_with(|| (entity.name.clone(), BTreeSet::new()))
                .1
                .insert(policy.category.clone());
        }
    }

    let totals = totals.finish();
    let by_entity = by_entity.finish();

    let mut cancellation_reasons: Vec<ReasonCount> = reasons
        .into_iter()
        .map(|(reason, count)| ReasonCount { reason, count })
        .collect();
    cancellation_reasons.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.reason.cmp(&b.reason)));

    let cross_sell = cross_sell_coverage(&entity_categories, config.aggregation.max_suggestions);
    let pareto = pareto(&by_entity, config.aggregation.pareto_head_share);
    let survival = survival
        .into_iter()
        .map(|(category, (months, samples))| CategorySurvival {
            category,
            avg_months: months as f64 / samples as f64,
            samples,
        })
        .collect();
    let trend = trend_period.map(|current| {
        let previous = previous.finish();
        MonthlyTrend {
            period:              format_period(current),
            previous_period:     format_period(previous_period(current)),
            premium:             totals.premium,
            previous_premium:    previous.premium,
            premium_change_pct:  pct_change(totals.premium, previous.premium),
            policies:            totals.policies,
            previous_policies:   previous.policies,
            policies_change_pct: pct_change(totals.policies as f64, previous.policies as f64),
        }
    });

    let strategic = insights::generate(
        totals.churn_rate_pct,
        cross_sell.mono_product_share_pct,
        pareto.head_share_pct,
        cross_sell.entities,
        &config.insights,
    );

    log::debug!(
        "metrics: {} policies in scope, {} entities, premium={:.2}",
        totals.policies, totals.entities, totals.premium,
    );

    PortfolioMetrics {
        totals,
        breakdowns: Breakdowns {
            by_entity,
            by_advisor:  by_advisor.finish(),
            by_product:  by_product.finish(),
            by_category: by_category.finish(),
            by_company:  by_company.finish(),
            by_status:   by_status.finish(),
            cancellation_reasons,
        },
        filter_options: options.finish(),
        insights: AdvancedInsights { cross_sell, survival, trend, pareto, strategic },
    }
}

fn cross_sell_coverage(
    entity_categories: &BTreeMap<String, (String, BTreeSet<String>)>,
    max_suggestions:   usize,
) -> CrossSellCoverage {
    let mut coverage = CrossSellCoverage {
        entities: entity_categories.len(),
        ..Default::default()
    };
    let mut pair_counts: BTreeMap<(String, String), usize> = BTreeMap::new();

    for (_, categories) in entity_categories.values() {
        match categories.len() {
            0 => {}
            1 => coverage.single_category += 1,
            2 => coverage.two_categories += 1,
            _ => coverage.three_plus_categories += 1,
        }
        let ordered: Vec<&String> = categories.iter().collect();
        for (i, first) in ordered.iter().enumerate() {
            for second in &ordered[i + 1..] {
                *pair_counts.entry(((*first).clone(), (*second).clone())).or_insert(0) += 1;
            }
        }
    }

    coverage.mono_product_share_pct =
        ratio_or(coverage.single_category as f64, coverage.entities as f64, 0.0) * 100.0;

    coverage.pairs = pair_counts
        .into_iter()
        .map(|((first, second), entities)| CategoryPair { first, second, entities })
        .collect();
    coverage.pairs.sort_by(|a, b| {
        b.entities
            .cmp(&a.entities)
            .then_with(|| a.first.cmp(&b.first))
            .then_with(|| a.second.cmp(&b.second))
    });

    let mut suggestions = Vec::new();
    for (code, (name, categories)) in entity_categories {
        if suggestions.len() >= max_suggestions {
            break;
        }
        if categories.len() != 1 {
            continue;
        }
        let Some(current) = categories.iter().next() else { continue };
        if let Some((partner, co_occurrences)) = coverage.best_partner(current) {
            suggestions.push(NextBestAction {
                entity_code:        code.clone(),
                entity_name:        name.clone(),
                current_category:   current.clone(),
                suggested_category: partner.to_string(),
                co_occurrences,
            });
        }
    }
    coverage.suggestions = suggestions;
    coverage
}

/// Cumulative premium concentration over entities, biggest first.
/// `by_entity` must already be sorted by premium descending.
fn pareto(by_entity: &[Bucket], head_share: f64) -> ParetoSummary {
    let total: f64 = by_entity.iter().map(|b| b.premium).sum();
    let mut cumulative = 0.0;
    let points: Vec<ParetoPoint> = by_entity
        .iter()
        .map(|bucket| {
            cumulative += bucket.premium;
            ParetoPoint {
                entity_code:    bucket.key.clone(),
                entity_name:    bucket.label.clone().unwrap_or_default(),
                premium:        bucket.premium,
                share_pct:      ratio_or(bucket.premium, total, 0.0) * 100.0,
                cumulative_pct: ratio_or(cumulative, total, 0.0) * 100.0,
            }
        })
        .collect();

    let head_entities = if points.is_empty() {
        0
    } else {
        ((points.len() as f64 * head_share).ceil() as usize).clamp(1, points.len())
    };
    let head_share_pct = head_entities
        .checked_sub(1)
        .and_then(|idx| points.get(idx))
        .map(|p| p.cumulative_pct)
        .unwrap_or(0.0);

    ParetoSummary { points, head_entities, head_share_pct }
}

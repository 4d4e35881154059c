//! Per-entity and per-advisor evolution: monthly production series plus
//! category mix.

use crate::{
    aggregation::format_period,
    error::{AnalyticsError, AnalyticsResult},
    filter::{Facet, FilterMatcher, FilterSet},
    record::AdvisorRecord,
    resolver::{CanonicalEntity, EntityResolver, ResolvedPolicy},
    types::{ratio_or, Period},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub period:    String,
    pub premium:   f64,
    pub policies:  u64,
    pub cancelled: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryMix {
    pub category:  String,
    pub premium:   f64,
    pub policies:  u64,
    pub share_pct: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvolutionTotals {
    pub premium:   f64,
    pub policies:  u64,
    pub cancelled: u64,
    pub active:    u64,
    /// Policies without a usable production period; counted in totals and
    /// mix but absent from the series.
    pub undated:   u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityEvolution {
    pub entity:      CanonicalEntity,
    pub totals:      EvolutionTotals,
    pub series:      Vec<SeriesPoint>,
    pub product_mix: Vec<CategoryMix>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisorEvolution {
    pub advisor:     String,
    pub entities:    usize,
    pub totals:      EvolutionTotals,
    pub series:      Vec<SeriesPoint>,
    pub product_mix: Vec<CategoryMix>,
}

#[derive(Debug, Default)]
struct EvolutionBuilder {
    totals:   EvolutionTotals,
    series:   BTreeMap<Period, (f64, u64, u64)>,
    mix:      BTreeMap<String, (f64, u64)>,
    entities: BTreeSet<String>,
}

impl EvolutionBuilder {
    fn add(&mut self, policy: &ResolvedPolicy) {
        let cancelled = policy.is_cancelled() as u64;
        self.totals.premium += policy.premium;
        self.totals.policies += 1;
        self.totals.cancelled += cancelled;
        self.totals.active += policy.state.is_active() as u64;

        match policy.period {
            Some(period) => {
                let slot = self.series.entry(period).or_insert((0.0, 0, 0));
                slot.0 += policy.premium;
                slot.1 += 1;
                slot.2 += cancelled;
            }
            None => self.totals.undated += 1,
        }

        let mix = self.mix.entry(policy.category.clone()).or_insert((0.0, 0));
        mix.0 += policy.premium;
        mix.1 += 1;

        if let Some(code) = policy.entity_code() {
            self.entities.insert(code.to_string());
        }
    }

    fn finish(self) -> (EvolutionTotals, Vec<SeriesPoint>, Vec<CategoryMix>, usize) {
        let series = self
            .series
            .into_iter()
            .map(|(period, (premium, policies, cancelled))| SeriesPoint {
                period: format_period(period),
                premium,
                policies,
                cancelled,
            })
            .collect();

        let total_premium = self.totals.premium;
        let mut mix: Vec<CategoryMix> = self
            .mix
            .into_iter()
            .map(|(category, (premium, policies))| CategoryMix {
                category,
                premium,
                policies,
                share_pct: ratio_or(premium, total_premium, 0.0) * 100.0,
            })
            .collect();
        mix.sort_by(|a, b| b.premium.total_cmp(&a.premium).then_with(|| a.category.cmp(&b.category)));

        (self.totals, series, mix, self.entities.len())
    }
}

/// Evolution of one entity. Year, month and entity restrictions are ignored
/// because the series spans time and the entity is fixed.
pub fn entity_evolution(
    policies:  &[ResolvedPolicy],
    resolver:  &EntityResolver,
    entity_id: &str,
    filters:   &FilterSet,
) -> AnalyticsResult<EntityEvolution> {
    let code = entity_id.trim();
    let entity = resolver
        .entity(code)
        .cloned()
        .ok_or_else(|| AnalyticsError::EntityNotFound { code: code.to_string() })?;

    let matcher = FilterMatcher::new(filters);
    let mut builder = EvolutionBuilder::default();
    for policy in policies.iter().filter(|p| p.entity_code() == Some(code)) {
        if matcher.flags(policy).all_except(&[Facet::Year, Facet::Month, Facet::Entity]) {
            builder.add(policy);
        }
    }

    let (totals, series, product_mix, _) = builder.finish();
    log::debug!("entity evolution {code}: {} policies, {} periods", totals.policies, series.len());
    Ok(EntityEvolution { entity, totals, series, product_mix })
}

/// Evolution of one advisor across every entity assigned to them.
pub fn advisor_evolution(
    policies:   &[ResolvedPolicy],
    resolver:   &EntityResolver,
    advisors:   &[AdvisorRecord],
    advisor_id: &str,
) -> AnalyticsResult<AdvisorEvolution> {
    let name = advisor_id.trim();
    let known = advisors.iter().any(|a| a.name.trim() == name)
        || resolver.entities().iter().any(|e| e.advisor == name);
    if !known {
        return Err(AnalyticsError::AdvisorNotFound { name: name.to_string() });
    }

    let mut builder = EvolutionBuilder::default();
    for policy in policies.iter().filter(|p| p.is_resolved() && p.advisor == name) {
        builder.add(policy);
    }

    let (totals, series, product_mix, entities) = builder.finish();
    log::debug!("advisor evolution {name}: {} policies over {entities} entities", totals.policies);
    Ok(AdvisorEvolution { advisor: name.to_string(), entities, totals, series, product_mix })
}

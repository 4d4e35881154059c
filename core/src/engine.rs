//! The analytics engine: the single entry point for every query.
//!
//! PIPELINE (fixed, every query):
//!   1. Fetch policies, registry links and advisors from the store
//!   2. Build the entity resolver from the registry links
//!   3. Resolve every policy (entity, category, premium, dates, state)
//!   4. Deduplicate by policy number
//!   5. Run the requested component over the resolved set
//!
//! RULES:
//!   - Each query re-reads the store. Nothing is cached between queries.
//!   - Identical store contents and filters produce identical output.
//!   - A failure anywhere fails the whole query.

use crate::{
    aggregation::{self, PortfolioMetrics},
    association::{self, AssociationRule},
    churn::{self, ChurnRiskReport},
    config::AnalyticsConfig,
    dedup::deduplicate,
    error::AnalyticsResult,
    evolution::{self, AdvisorEvolution, EntityEvolution},
    filter::FilterSet,
    record::AdvisorRecord,
    resolver::{EntityResolver, ResolvedPolicy},
    store::RecordStore,
};
use chrono::NaiveDate;

/// One consistent read of the store, resolved and deduplicated.
pub struct PortfolioSnapshot {
    pub resolver: EntityResolver,
    pub policies: Vec<ResolvedPolicy>,
    pub advisors: Vec<AdvisorRecord>,
}

pub struct PortfolioEngine<S: RecordStore> {
    store:      S,
    pub config: AnalyticsConfig,
    /// Reference date for tenure and renewal proximity.
    pub as_of:  NaiveDate,
}

impl<S: RecordStore> PortfolioEngine<S> {
    pub fn new(store: S, config: AnalyticsConfig) -> Self {
        Self {
            store,
            config,
            as_of: chrono::Local::now().date_naive(),
        }
    }

    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = as_of;
        self
    }

    pub fn snapshot(&self) -> AnalyticsResult<PortfolioSnapshot> {
        let records = self.store.fetch_policies()?;
        let links = self.store.fetch_registry_links()?;
        let advisors = self.store.fetch_advisors()?;

        let resolver = EntityResolver::from_links(&links);
        let policies = deduplicate(resolver.resolve_all(records));
        log::debug!(
            "snapshot: {} policies, {} registry entities, {} advisors",
            policies.len(), resolver.len(), advisors.len(),
        );
        Ok(PortfolioSnapshot { resolver, policies, advisors })
    }

    pub fn compute_metrics(&self, filters: &FilterSet) -> AnalyticsResult<PortfolioMetrics> {
        let snap = self.snapshot()?;
        Ok(aggregation::compute_metrics(&snap.policies, &snap.advisors, filters, &self.config))
    }

    pub fn compute_entity_evolution(
        &self,
        entity_id: &str,
        filters:   &FilterSet,
    ) -> AnalyticsResult<EntityEvolution> {
        let snap = self.snapshot()?;
        evolution::entity_evolution(&snap.policies, &snap.resolver, entity_id, filters)
    }

    pub fn compute_advisor_evolution(&self, advisor_id: &str) -> AnalyticsResult<AdvisorEvolution> {
        let snap = self.snapshot()?;
        evolution::advisor_evolution(&snap.policies, &snap.resolver, &snap.advisors, advisor_id)
    }

    /// Sequential cross-sell rules, optionally restricted to some advisors.
    pub fn mine_cross_sell_rules(
        &self,
        advisor_filter: Option<&[String]>,
    ) -> AnalyticsResult<Vec<AssociationRule>> {
        let snap = self.snapshot()?;
        Ok(association::mine_rules(&snap.policies, advisor_filter, &self.config.association))
    }

    pub fn score_churn_risk(&self, filters: &FilterSet) -> AnalyticsResult<ChurnRiskReport> {
        let snap = self.snapshot()?;
        Ok(churn::score_policies(&snap.policies, filters, self.as_of, &self.config.churn))
    }
}

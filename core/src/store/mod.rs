//! Record store seam.
//!
//! RULE: the analytics core never knows where records live. It asks a
//! `RecordStore` for the three ordered sequences once per query and treats
//! the answer as a consistent snapshot.

mod sqlite;

pub use sqlite::SqliteStore;

use crate::{
    error::AnalyticsResult,
    record::{AdvisorRecord, PolicyRecord, RegistryLink},
};

pub trait RecordStore {
    /// Policies in source order. Order matters: deduplication keeps the
    /// first row of a policy unless a later one is cancelled.
    fn fetch_policies(&self) -> AnalyticsResult<Vec<PolicyRecord>>;

    /// Registry links in source order. Later links override earlier ones.
    fn fetch_registry_links(&self) -> AnalyticsResult<Vec<RegistryLink>>;

    fn fetch_advisors(&self) -> AnalyticsResult<Vec<AdvisorRecord>>;
}

/// Vectors held in memory (tests, synthetic runs).
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub policies: Vec<PolicyRecord>,
    pub links:    Vec<RegistryLink>,
    pub advisors: Vec<AdvisorRecord>,
}

impl MemoryStore {
    pub fn new(
        policies: Vec<PolicyRecord>,
        links:    Vec<RegistryLink>,
        advisors: Vec<AdvisorRecord>,
    ) -> Self {
        Self { policies, links, advisors }
    }
}

impl RecordStore for MemoryStore {
    fn fetch_policies(&self) -> AnalyticsResult<Vec<PolicyRecord>> {
        Ok(self.policies.clone())
    }

    fn fetch_registry_links(&self) -> AnalyticsResult<Vec<RegistryLink>> {
        Ok(self.links.clone())
    }

    fn fetch_advisors(&self) -> AnalyticsResult<Vec<AdvisorRecord>> {
        Ok(self.advisors.clone())
    }
}

//! Faceted filtering.
//!
//! Every query carries one allowed-value set per facet. An empty set means
//! the facet is unrestricted. Match flags are evaluated per facet so that a
//! single pass can answer both "does this record match everything?" and
//! "does it match everything except facet F?". The latter drives the
//! self-excluding option lists: the visible choices for F ignore F's own
//! selection, otherwise picking one value would hide all its alternatives.

use crate::{resolver::ResolvedPolicy, types::Period};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    Year,
    Month,
    Status,
    Advisor,
    Entity,
    Category,
    Product,
}

pub const FACET_COUNT: usize = 7;

impl Facet {
    pub const ALL: [Facet; FACET_COUNT] = [
        Facet::Year,
        Facet::Month,
        Facet::Status,
        Facet::Advisor,
        Facet::Entity,
        Facet::Category,
        Facet::Product,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Year and month compare as integers so "03" selects "3".
    pub fn is_numeric(self) -> bool {
        matches!(self, Facet::Year | Facet::Month)
    }

    /// The record's normalized value for this facet, if it has one.
    pub fn value(self, policy: &ResolvedPolicy) -> Option<String> {
        let raw = match self {
            Facet::Year     => policy.record.production_year.as_str(),
            Facet::Month    => policy.record.production_month.as_str(),
            Facet::Status   => policy.record.status.as_str(),
            Facet::Advisor  => policy.advisor.as_str(),
            Facet::Entity   => policy.entity_code()?,
            Facet::Category => policy.category.as_str(),
            Facet::Product  => policy.record.product_name.as_str(),
        };
        let normalized = normalize(self, raw);
        (!normalized.is_empty()).then_some(normalized)
    }
}

fn normalize(facet: Facet, raw: &str) -> String {
    let trimmed = raw.trim();
    if facet.is_numeric() {
        if let Ok(n) = trimmed.parse::<i64>() {
            return n.to_string();
        }
    }
    trimmed.to_string()
}

/// Allowed values per facet, as received from the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSet {
    #[serde(alias = "anio")]
    pub year:     Vec<String>,
    #[serde(alias = "mes")]
    pub month:    Vec<String>,
    #[serde(alias = "estado")]
    pub status:   Vec<String>,
    #[serde(alias = "asesor")]
    pub advisor:  Vec<String>,
    #[serde(alias = "ente")]
    pub entity:   Vec<String>,
    #[serde(alias = "ramo")]
    pub category: Vec<String>,
    #[serde(alias = "producto")]
    pub product:  Vec<String>,
}

impl FilterSet {
    pub fn values(&self, facet: Facet) -> &[String] {
        match facet {
            Facet::Year     => &self.year,
            Facet::Month    => &self.month,
            Facet::Status   => &self.status,
            Facet::Advisor  => &self.advisor,
            Facet::Entity   => &self.entity,
            Facet::Category => &self.category,
            Facet::Product  => &self.product,
        }
    }

    fn values_mut(&mut self, facet: Facet) -> &mut Vec<String> {
        match facet {
            Facet::Year     => &mut self.year,
            Facet::Month    => &mut self.month,
            Facet::Status   => &mut self.status,
            Facet::Advisor  => &mut self.advisor,
            Facet::Entity   => &mut self.entity,
            Facet::Category => &mut self.category,
            Facet::Product  => &mut self.product,
        }
    }

    /// Builder-style setter, mostly for tests and tooling.
    pub fn with<I, S>(mut self, facet: Facet, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.values_mut(facet) = values.into_iter().map(Into::into).collect();
        self
    }

    /// The selected (year, month) when exactly one of each is selected.
    pub fn single_period(&self) -> Option<Period> {
        match (self.year.as_slice(), self.month.as_slice()) {
            ([year], [month]) => crate::record::parse_period(year, month),
            _ => None,
        }
    }
}

/// Per-facet flags for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchFlags([bool; FACET_COUNT]);

impl MatchFlags {
    pub fn all(&self) -> bool {
        self.0.iter().all(|m| *m)
    }

    /// Matches every facet except those listed.
    pub fn all_except(&self, skip: &[Facet]) -> bool {
        Facet::ALL
            .iter()
            .filter(|f| !skip.contains(f))
            .all(|f| self.0[f.index()])
    }
}

/// A `FilterSet` compiled into normalized lookup sets.
#[derive(Debug, Clone)]
pub struct FilterMatcher {
    allowed: [Option<HashSet<String>>; FACET_COUNT],
}

impl FilterMatcher {
    pub fn new(filters: &FilterSet) -> Self {
        let allowed = Facet::ALL.map(|facet| {
            let values = filters.values(facet);
            if values.is_empty() {
                None
            } else {
                Some(values.iter().map(|v| normalize(facet, v)).collect())
            }
        });
        Self { allowed }
    }

    pub fn flags(&self, policy: &ResolvedPolicy) -> MatchFlags {
        MatchFlags(Facet::ALL.map(|facet| match &self.allowed[facet.index()] {
            None => true,
            Some(set) => facet.value(policy).is_some_and(|v| set.contains(&v)),
        }))
    }

    pub fn matches(&self, policy: &ResolvedPolicy) -> bool {
        self.flags(policy).all()
    }
}

/// Visible choices per facet, each computed with its own facet ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub year:     Vec<String>,
    pub month:    Vec<String>,
    pub status:   Vec<String>,
    pub advisor:  Vec<String>,
    pub entity:   Vec<String>,
    pub category: Vec<String>,
    pub product:  Vec<String>,
}

/// Accumulates self-excluding option lists during the aggregation pass.
#[derive(Debug, Default)]
pub struct OptionCollector {
    seen: [BTreeSet<String>; FACET_COUNT],
}

impl OptionCollector {
    pub fn observe(&mut self, policy: &ResolvedPolicy, flags: &MatchFlags) {
        for facet in Facet::ALL {
            if !flags.all_except(&[facet]) {
                continue;
            }
            if let Some(value) = facet.value(policy) {
                self.seen[facet.index()].insert(value);
            }
        }
    }

    pub fn finish(self) -> FilterOptions {
        let mut options = FilterOptions::default();

        for (facet, values) in Facet::ALL.into_iter().zip(self.seen) {
            let mut list: Vec<String> = values.into_iter().collect();
            if facet.is_numeric() {
                list.sort_by_key(|v| (v.parse::<i64>().unwrap_or(i64::MAX), v.clone()));
            }
            match facet {
                Facet::Year     => options.year = list,
                Facet::Month    => options.month = list,
                Facet::Status   => options.status = list,
                Facet::Advisor  => options.advisor = list,
                Facet::Entity   => options.entity = list,
                Facet::Category => options.category = list,
                Facet::Product  => options.product = list,
            }
        }
        options
    }
}

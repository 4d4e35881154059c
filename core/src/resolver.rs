//! Entity resolution: maps free-text entity fields to canonical registry
//! entries.
//!
//! The registry links advisors to entities through identifiers that are
//! either "Name - Code" or a bare code. A policy resolves when either its
//! free-text field or its direct code column yields a code the registry
//! knows. Everything else falls back to the unassigned advisor and is
//! invisible to entity-scoped views.

use crate::{
    category,
    record::{parse_date, parse_period, parse_premium, PolicyRecord, PolicyState, RegistryLink},
    types::{Category, EntityCode, Period, UNASSIGNED_ADVISOR},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

const CODE_SEPARATOR: &str = " - ";

/// Extract the code part of a registry identifier.
///
/// "Acme Corp - 00231" → "00231"; a bare "00231" is returned trimmed.
pub fn extract_code(identifier: &str) -> &str {
    match identifier.rfind(CODE_SEPARATOR) {
        Some(idx) => identifier[idx + CODE_SEPARATOR.len()..].trim(),
        None => identifier.trim(),
    }
}

/// Extract the display name part of a registry identifier. Bare codes are
/// their own name.
pub fn extract_name(identifier: &str) -> &str {
    match identifier.rfind(CODE_SEPARATOR) {
        Some(idx) => identifier[..idx].trim(),
        None => identifier.trim(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalEntity {
    pub code:    EntityCode,
    pub name:    String,
    pub advisor: String,
}

/// Registry indices built once per query.
#[derive(Debug, Clone, Default)]
pub struct EntityResolver {
    entities: HashMap<EntityCode, CanonicalEntity>,
}

impl EntityResolver {
    /// Build from registry links. When several links carry the same code the
    /// last one processed wins.
    pub fn from_links(links: &[RegistryLink]) -> Self {
        let mut entities = HashMap::with_capacity(links.len());
        for link in links {
            let code = extract_code(&link.entity_identifier);
            if code.is_empty() {
                continue;
            }
            entities.insert(
                code.to_string(),
                CanonicalEntity {
                    code:    code.to_string(),
                    name:    extract_name(&link.entity_identifier).to_string(),
                    advisor: link.advisor_name.trim().to_string(),
                },
            );
        }
        Self { entities }
    }

    pub fn is_valid(&self, code: &str) -> bool {
        self.entities.contains_key(code)
    }

    pub fn entity(&self, code: &str) -> Option<&CanonicalEntity> {
        self.entities.get(code)
    }

    pub fn advisor_for(&self, code: &str) -> Option<&str> {
        self.entities.get(code).map(|e| e.advisor.as_str())
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Registry entities in code order.
    pub fn entities(&self) -> Vec<&CanonicalEntity> {
        let ordered: BTreeMap<&str, &CanonicalEntity> =
            self.entities.iter().map(|(k, v)| (k.as_str(), v)).collect();
        ordered.into_values().collect()
    }

    /// Find the canonical entity for a policy: free text first, then the
    /// direct code column.
    pub fn resolve_code(&self, record: &PolicyRecord) -> Option<&CanonicalEntity> {
        let from_text = extract_code(&record.entity_text);
        if let Some(entity) = self.entities.get(from_text) {
            return Some(entity);
        }
        self.entities.get(record.entity_code.trim())
    }

    /// Attach every derived field the downstream components need.
    pub fn resolve(&self, record: PolicyRecord) -> ResolvedPolicy {
        let entity = self.resolve_code(&record).cloned();
        let advisor = entity
            .as_ref()
            .map(|e| e.advisor.clone())
            .unwrap_or_else(|| UNASSIGNED_ADVISOR.to_string());

        ResolvedPolicy {
            category:     category::classify(&record.product_name).to_string(),
            premium:      parse_premium(&record.premium),
            state:        PolicyState::from_status(&record.status),
            effective:    parse_date(&record.effective_date),
            cancelled_on: parse_date(&record.cancellation_date),
            period:       parse_period(&record.production_year, &record.production_month),
            entity,
            advisor,
            record,
        }
    }

    pub fn resolve_all(&self, records: Vec<PolicyRecord>) -> Vec<ResolvedPolicy> {
        let resolved: Vec<ResolvedPolicy> = records.into_iter().map(|r| self.resolve(r)).collect();
        let unresolved = resolved.iter().filter(|p| p.entity.is_none()).count();
        if unresolved > 0 {
            log::warn!(
                "resolver: {unresolved} of {} policies did not resolve to a registry entity",
                resolved.len(),
            );
        }
        resolved
    }
}

/// A policy with its derived fields. The raw record is kept for the
/// free-text fields (status, product, company, reason).
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPolicy {
    pub record:       PolicyRecord,
    pub category:     Category,
    pub premium:      f64,
    pub state:        PolicyState,
    pub effective:    Option<NaiveDate>,
    pub cancelled_on: Option<NaiveDate>,
    pub period:       Option<Period>,
    pub entity:       Option<CanonicalEntity>,
    pub advisor:      String,
}

impl ResolvedPolicy {
    pub fn entity_code(&self) -> Option<&str> {
        self.entity.as_ref().map(|e| e.code.as_str())
    }

    pub fn is_resolved(&self) -> bool {
        self.entity.is_some()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }
}

//! Policy deduplication.
//!
//! The source system emits one row per policy movement, so a policy number
//! can appear many times. We keep exactly one row per number:
//!   - the first row seen, unless
//!   - a later row is cancelled, which overwrites it (last cancelled wins).
//!
//! A missing policy number is the empty string and is treated as a real key.
//! Unrelated rows without a number therefore collapse into one. That is a
//! known data-quality issue; it is reported, not corrected.

use crate::resolver::ResolvedPolicy;
use std::collections::HashMap;

/// Collapse rows sharing a policy number. Output keeps first-appearance
/// order of the keys.
pub fn deduplicate(policies: Vec<ResolvedPolicy>) -> Vec<ResolvedPolicy> {
    let input_len = policies.len();
    let mut slots: HashMap<String, usize> = HashMap::with_capacity(input_len);
    let mut kept: Vec<ResolvedPolicy> = Vec::with_capacity(input_len);
    let mut blank_key_rows = 0usize;

    for policy in policies {
        if policy.record.policy_number.is_empty() {
            blank_key_rows += 1;
        }
        match slots.get(&policy.record.policy_number) {
            Some(&idx) => {
                if policy.is_cancelled() {
                    kept[idx] = policy;
                }
            }
            None => {
                slots.insert(policy.record.policy_number.clone(), kept.len());
                kept.push(policy);
            }
        }
    }

    if blank_key_rows > 1 {
        log::warn!(
            "dedup: {blank_key_rows} rows without a policy number merged into one; review source data",
        );
    }
    log::debug!("dedup: {input_len} rows -> {} policies", kept.len());
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{record::PolicyRecord, resolver::EntityResolver};

    fn row(number: &str, status: &str, product: &str) -> ResolvedPolicy {
        EntityResolver::default().resolve(PolicyRecord {
            policy_number: number.into(),
            status:        status.into(),
            product_name:  product.into(),
            ..Default::default()
        })
    }

    #[test]
    fn first_row_kept_without_cancellation() {
        let out = deduplicate(vec![row("P1", "Vigor", "AUTO"), row("P1", "Vigor", "HOGAR")]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].record.product_name, "AUTO");
    }

    #[test]
    fn last_cancelled_row_wins() {
        let out = deduplicate(vec![
            row("P1", "Vigor", "AUTO"),
            row("P1", "Anulada", "A"),
            row("P1", "Vigor", "B"),
            row("P1", "Baja", "C"),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].record.product_name, "C");
        assert!(out[0].is_cancelled());
    }

    #[test]
    fn blank_numbers_share_a_key() {
        let out = deduplicate(vec![row("", "Vigor", "AUTO"), row("", "Vigor", "HOGAR"), row("P2", "Vigor", "VIDA")]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].record.policy_number, "");
        assert_eq!(out[1].record.policy_number, "P2");
    }
}

//! Strategic insights: threshold rules over the aggregate metrics.

use crate::config::InsightThresholds;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightTopic {
    Churn,
    Attachment,
    Concentration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightLevel {
    Critical,
    Moderate,
    Healthy,
    ExpansionOpportunity,
    Balanced,
    WellAttached,
    Concentrated,
    Diversified,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategicInsight {
    pub topic:   InsightTopic,
    pub level:   InsightLevel,
    pub value:   f64,
    pub message: String,
}

pub fn churn_level(churn_rate_pct: f64, t: &InsightThresholds) -> InsightLevel {
    if churn_rate_pct > t.churn_critical_pct {
        InsightLevel::Critical
    } else if churn_rate_pct > t.churn_moderate_pct {
        InsightLevel::Moderate
    } else {
        InsightLevel::Healthy
    }
}

pub fn attachment_level(mono_product_share_pct: f64, t: &InsightThresholds) -> InsightLevel {
    if mono_product_share_pct > t.mono_product_expansion_pct {
        InsightLevel::ExpansionOpportunity
    } else if mono_product_share_pct < t.mono_product_attached_pct {
        InsightLevel::WellAttached
    } else {
        InsightLevel::Balanced
    }
}

pub fn concentration_level(head_share_pct: f64, t: &InsightThresholds) -> InsightLevel {
    if head_share_pct > t.pareto_concentrated_pct {
        InsightLevel::Concentrated
    } else {
        InsightLevel::Diversified
    }
}

/// Build the recommendation list. Attachment and concentration need at
/// least one resolved entity.
pub fn generate(
    churn_rate_pct:         f64,
    mono_product_share_pct: f64,
    head_share_pct:         f64,
    entity_count:           usize,
    thresholds:             &InsightThresholds,
) -> Vec<StrategicInsight> {
    let mut out = Vec::with_capacity(3);

    let level = churn_level(churn_rate_pct, thresholds);
    let message = match level {
        InsightLevel::Critical => format!(
            "Cancellation rate of {churn_rate_pct:.1}% is critical: launch a retention campaign on the highest-risk policies."
        ),
        InsightLevel::Moderate => format!(
            "Cancellation rate of {churn_rate_pct:.1}% is moderate: review renewals due in the next 45 days."
        ),
        _ => format!("Cancellation rate of {churn_rate_pct:.1}% is within healthy limits."),
    };
    out.push(StrategicInsight { topic: InsightTopic::Churn, level, value: churn_rate_pct, message });

    if entity_count == 0 {
        return out;
    }

    let level = attachment_level(mono_product_share_pct, thresholds);
    let message = match level {
        InsightLevel::ExpansionOpportunity => format!(
            "{mono_product_share_pct:.1}% of entities hold a single category: strong cross-sell expansion opportunity."
        ),
        InsightLevel::WellAttached => format!(
            "Only {mono_product_share_pct:.1}% of entities are mono-product: the portfolio is well attached."
        ),
        _ => format!(
            "{mono_product_share_pct:.1}% of entities are mono-product: target them with the most frequent category pairings."
        ),
    };
    out.push(StrategicInsight {
        topic: InsightTopic::Attachment,
        level,
        value: mono_product_share_pct,
        message,
    });

    let level = concentration_level(head_share_pct, thresholds);
    let message = match level {
        InsightLevel::Concentrated => format!(
            "The top 20% of entities write {head_share_pct:.1}% of premium: revenue is concentrated, protect key accounts."
        ),
        _ => format!("The top 20% of entities write {head_share_pct:.1}% of premium: revenue is diversified."),
    };
    out.push(StrategicInsight {
        topic: InsightTopic::Concentration,
        level,
        value: head_share_pct,
        message,
    });

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_strict() {
        let t = InsightThresholds::default();
        assert_eq!(churn_level(15.0, &t), InsightLevel::Moderate);
        assert_eq!(churn_level(15.01, &t), InsightLevel::Critical);
        assert_eq!(churn_level(5.0, &t), InsightLevel::Healthy);
        assert_eq!(attachment_level(60.0, &t), InsightLevel::Balanced);
        assert_eq!(attachment_level(60.5, &t), InsightLevel::ExpansionOpportunity);
        assert_eq!(attachment_level(39.9, &t), InsightLevel::WellAttached);
        assert_eq!(concentration_level(75.0, &t), InsightLevel::Diversified);
        assert_eq!(concentration_level(80.0, &t), InsightLevel::Concentrated);
    }

    #[test]
    fn no_entities_only_reports_churn() {
        let out = generate(3.0, 0.0, 0.0, 0, &InsightThresholds::default());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].topic, InsightTopic::Churn);
    }
}

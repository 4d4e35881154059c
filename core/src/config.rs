use serde::{Deserialize, Serialize};

// ── Aggregation ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Share of entities (by count) that defines the Pareto head.
    pub pareto_head_share: f64,
    /// Upper bound on next-best-action suggestions per query.
    pub max_suggestions: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            pareto_head_share: 0.20,
            max_suggestions:   25,
        }
    }
}

// ── Sequential cross-sell rules ────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociationConfig {
    pub min_antecedent_entities: usize,
    pub min_lift: f64,
    pub min_confidence: f64,
    /// Chi-square critical value: 1 d.o.f., p = 0.05, no continuity correction.
    pub chi_square_critical: f64,
    pub max_target_samples: usize,
    pub max_rules: usize,
}

impl Default for AssociationConfig {
    fn default() -> Self {
        Self {
            min_antecedent_entities: 5,
            min_lift:                1.2,
            min_confidence:          0.05,
            chi_square_critical:     3.84,
            max_target_samples:      5,
            max_rules:               50,
        }
    }
}

// ── Churn risk ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChurnModelConfig {
    /// Below this many decided policies a dimension value is neutral.
    pub min_dimension_sample: usize,
    pub baseline_epsilon: f64,
    pub contagion_multiplier: f64,
    pub no_contagion_multiplier: f64,
    pub renewal_window_days: i64,
    pub renewal_multiplier: f64,
    pub loyalty_many_multiplier: f64,
    pub loyalty_some_multiplier: f64,
    pub loyalty_single_multiplier: f64,
    pub premium_pressure_ratio: f64,
    pub premium_pressure_multiplier: f64,
    pub max_score: f64,
    pub min_reported_score: f64,
    /// Factors at or below this impact are not attributed.
    pub attribution_threshold: f64,
    pub max_attributed_factors: usize,
    /// Score above `baseline × high_risk_ratio` is flagged.
    pub high_risk_ratio: f64,
}

impl Default for ChurnModelConfig {
    fn default() -> Self {
        Self {
            min_dimension_sample:        3,
            baseline_epsilon:            1e-9,
            contagion_multiplier:        1.45,
            no_contagion_multiplier:     0.9,
            renewal_window_days:         45,
            renewal_multiplier:          1.4,
            loyalty_many_multiplier:     0.6,
            loyalty_some_multiplier:     0.8,
            loyalty_single_multiplier:   1.35,
            premium_pressure_ratio:      1.6,
            premium_pressure_multiplier: 1.4,
            max_score:                   0.99,
            min_reported_score:          0.005,
            attribution_threshold:       1.05,
            max_attributed_factors:      3,
            high_risk_ratio:             1.5,
        }
    }
}

// ── Strategic insights ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightThresholds {
    /// Churn rates are percentages (0–100).
    pub churn_critical_pct: f64,
    pub churn_moderate_pct: f64,
    pub mono_product_expansion_pct: f64,
    pub mono_product_attached_pct: f64,
    pub pareto_concentrated_pct: f64,
}

impl Default for InsightThresholds {
    fn default() -> Self {
        Self {
            churn_critical_pct:         15.0,
            churn_moderate_pct:         5.0,
            mono_product_expansion_pct: 60.0,
            mono_product_attached_pct:  40.0,
            pareto_concentrated_pct:    75.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub aggregation: AggregationConfig,
    pub association: AssociationConfig,
    pub churn:       ChurnModelConfig,
    pub insights:    InsightThresholds,
}

impl AnalyticsConfig {
    /// Load from a JSON file. Missing sections and fields keep their defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: AnalyticsConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid analytics config {path}: {e}"))?;
        Ok(config)
    }
}

use crate::breakdown::Breakdown;
use crate::params::Parameters;
use crate::tiers::PriceTier;

/// Optimization target determining what the pyramid fit converges on
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, PartialEq)]
pub enum OptimizeTarget {
    /// Target expected item value on the cost basis (Σ probability * avg_value).
    /// Note this is the cost-basis expectation, not the customer-facing fair
    /// value shown on the breakdown.
    AVG_ITEM_VALUE { target_avg_value: f64 },
    /// Target net revenue as a percentage of pack sales revenue
    NET_REVENUE_MARGIN { target_margin_percent: f64 },
}

/// Trait for pyramid optimization objectives
///
/// A candidate's score is the weighted absolute miss summed over the active
/// objectives: `score = Σ weight * |actual - target|`. New objectives plug in
/// here without touching the search loop.
pub trait ObjectiveTrait {
    /// Metric value for a candidate probability vector
    ///
    /// # Arguments
    /// * `probabilities` - Candidate distribution, one entry per sorted tier
    /// * `tiers_sorted` - Tiers in ascending cost-basis order
    /// * `params` - The simulation parameters in effect
    ///
    /// # Returns
    /// The metric this objective compares against its target
    fn actual(&self, probabilities: &[f64], tiers_sorted: &[PriceTier], params: &Parameters)
        -> f64;

    /// The target value this objective is trying to hit
    fn target_value(&self) -> f64;

    /// Relative weight of this objective in the combined score
    fn weight(&self) -> f64;

    /// Get a string representation of the objective
    fn objective_string(&self) -> String;
}

/// Objective for a target expected item value (cost basis)
pub struct ObjectiveAverageItemValue {
    pub target_avg_value: f64,
}

impl ObjectiveTrait for ObjectiveAverageItemValue {
    fn actual(
        &self,
        probabilities: &[f64],
        tiers_sorted: &[PriceTier],
        _params: &Parameters,
    ) -> f64 {
        probabilities
            .iter()
            .zip(tiers_sorted.iter())
            .map(|(p, tier)| p * tier.avg_value)
            .sum()
    }

    fn target_value(&self) -> f64 {
        self.target_avg_value
    }

    fn weight(&self) -> f64 {
        1.0
    }

    fn objective_string(&self) -> String {
        format!("Average item value target: {:.2}", self.target_avg_value)
    }
}

/// Objective for a target net revenue margin percent
///
/// The metric runs through the breakdown's aggregate path, parameterized only
/// by the candidate probabilities, so the optimizer converges to the same
/// numbers the display shows. The higher weight biases a combined search
/// toward revenue accuracy.
pub struct ObjectiveNetRevenueMargin {
    pub target_margin_percent: f64,
}

impl ObjectiveTrait for ObjectiveNetRevenueMargin {
    fn actual(&self, probabilities: &[f64], tiers_sorted: &[PriceTier], params: &Parameters) -> f64 {
        Breakdown::with_probabilities(params, tiers_sorted, probabilities)
            .net_revenue_margin_percent
    }

    fn target_value(&self) -> f64 {
        self.target_margin_percent
    }

    fn weight(&self) -> f64 {
        10.0
    }

    fn objective_string(&self) -> String {
        format!("Net revenue margin target: {:.2}%", self.target_margin_percent)
    }
}

/// Convert an OptimizeTarget into a boxed objective
pub fn convert_optimize_target(target: OptimizeTarget) -> Box<dyn ObjectiveTrait> {
    match target {
        OptimizeTarget::AVG_ITEM_VALUE { target_avg_value } => {
            Box::new(ObjectiveAverageItemValue { target_avg_value })
        }
        OptimizeTarget::NET_REVENUE_MARGIN {
            target_margin_percent,
        } => Box::new(ObjectiveNetRevenueMargin {
            target_margin_percent,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiers::TierSet;

    #[test]
    fn test_average_item_value_metric() {
        let mut tier_set = TierSet::new();
        tier_set.add("Low", 0.0, 15.0, 0.8, 0.0, 10.0);
        tier_set.add("High", 15.0, 25.0, 0.2, 0.0, 20.0);
        let sorted = tier_set.sorted_by_value();

        let objective = ObjectiveAverageItemValue {
            target_avg_value: 12.0,
        };
        let actual = objective.actual(&[0.8, 0.2], &sorted, &Parameters::default());
        assert!((actual - 12.0).abs() < 1e-12);
        assert_eq!(objective.weight(), 1.0);
    }

    #[test]
    fn test_margin_metric_matches_breakdown() {
        let params = Parameters::default();
        let tier_set = TierSet::default_catalog();
        let sorted = tier_set.sorted_by_value();
        let probabilities: Vec<f64> = sorted.iter().map(|t| t.probability).collect();

        let objective = ObjectiveNetRevenueMargin {
            target_margin_percent: 5.0,
        };
        let via_objective = objective.actual(&probabilities, &sorted, &params);
        let via_breakdown =
            Breakdown::with_probabilities(&params, &sorted, &probabilities).net_revenue_margin_percent;
        // Identical code path, identical number
        assert_eq!(via_objective, via_breakdown);
        assert_eq!(objective.weight(), 10.0);
    }

    #[test]
    fn test_convert_optimize_target() {
        let objective = convert_optimize_target(OptimizeTarget::AVG_ITEM_VALUE {
            target_avg_value: 80.0,
        });
        assert_eq!(objective.target_value(), 80.0);
        assert_eq!(objective.weight(), 1.0);

        let objective = convert_optimize_target(OptimizeTarget::NET_REVENUE_MARGIN {
            target_margin_percent: 5.0,
        });
        assert_eq!(objective.target_value(), 5.0);
        assert_eq!(objective.weight(), 10.0);
    }
}

use std::error::Error;

/// Tolerated deviation of the probability sum from 1.0 before a warning is raised
pub const PROBABILITY_SUM_TOLERANCE: f64 = 0.001;

/// One value bracket of possible pack contents.
///
/// `avg_value` is the operator's cost basis for items in this bracket, not
/// their market value; the customer-facing figure is recovered by dividing by
/// the product-cost fraction. `min`/`max` describe the bracket's market-value
/// bounds for display purposes and feed no formula.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTier {
    /// Unique handle, stable across reordering and removal of other tiers
    pub id: usize,
    /// Display name, free-form
    pub name: String,
    pub min: f64,
    pub max: f64,
    /// Chance a pack yields an item from this tier
    pub probability: f64,
    /// Fraction of recipients in this tier who sell the item back
    pub buyback_rate: f64,
    /// Average acquisition cost of items in this tier (cost basis)
    pub avg_value: f64,
}

impl PriceTier {
    /// Customer-facing market value implied by the cost basis
    pub fn fair_value(&self, product_cost_percent: f64) -> f64 {
        self.avg_value / (product_cost_percent / 100.0)
    }
}

/// Container for the tier list with methods to add and remove tiers
///
/// Tiers are mutated only by explicit edits or by the optimizer writing back
/// probabilities; the container never reorders entries on its own.
pub struct TierSet {
    pub tiers: Vec<PriceTier>,
}

impl TierSet {
    pub fn new() -> Self {
        Self { tiers: Vec::new() }
    }

    /// The six-bracket catalog the simulator starts from
    pub fn default_catalog() -> Self {
        let mut tier_set = Self::new();
        tier_set.add("Range 1", 40.0, 59.99, 0.57, 0.8179, 45.72);
        tier_set.add("Range 2", 60.0, 89.99, 0.26, 0.7738, 65.59);
        tier_set.add("Range 3", 90.0, 149.99, 0.104, 0.6358, 93.00);
        tier_set.add("Range 4", 150.0, 299.99, 0.03995, 0.3478, 176.59);
        tier_set.add("Range 5", 300.0, 599.99, 0.01649, 0.0, 306.25);
        tier_set.add("Range 6", 600.0, 4000.0, 0.00956, 0.0, 1732.65);
        tier_set
    }

    /// Add a tier to the collection
    ///
    /// # Returns
    /// The id of the just added tier (one above the highest existing id, so
    /// ids stay stable when earlier tiers are removed)
    pub fn add(
        &mut self,
        name: &str,
        min: f64,
        max: f64,
        probability: f64,
        buyback_rate: f64,
        avg_value: f64,
    ) -> usize {
        let id = self.tiers.iter().map(|t| t.id).max().map_or(1, |m| m + 1);
        self.tiers.push(PriceTier {
            id,
            name: name.to_string(),
            min,
            max,
            probability,
            buyback_rate,
            avg_value,
        });
        id
    }

    /// Add a tier derived from the last one: the new bracket starts just above
    /// the previous maximum, with placeholder probability and buyback rate
    ///
    /// # Returns
    /// The id of the just added tier
    pub fn add_derived(&mut self) -> usize {
        let (min, max, avg_value) = match self.tiers.last() {
            Some(last) => (last.max + 0.01, last.max + 100.0, last.max + 50.0),
            None => (0.0, 100.0, 50.0),
        };
        let next_id = self.tiers.iter().map(|t| t.id).max().map_or(1, |m| m + 1);
        let name = format!("Range {}", next_id);
        self.add(&name, min, max, 0.01, 0.5, avg_value)
    }

    /// Remove a tier by id
    ///
    /// Removing the last remaining tier is rejected: the list is left
    /// unchanged and the caller is informed
    pub fn remove(&mut self, id: usize) -> Result<PriceTier, Box<dyn Error>> {
        if self.tiers.len() <= 1 {
            return Err("cannot remove the last price tier; at least one is required".into());
        }
        match self.tiers.iter().position(|t| t.id == id) {
            Some(index) => Ok(self.tiers.remove(index)),
            None => Err(format!("no price tier with id {}", id).into()),
        }
    }

    pub fn get(&self, id: usize) -> Option<&PriceTier> {
        self.tiers.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut PriceTier> {
        self.tiers.iter_mut().find(|t| t.id == id)
    }

    /// Overwrite the probability of the tier with the given id
    ///
    /// # Returns
    /// `true` if a tier with that id existed
    pub fn set_probability(&mut self, id: usize, probability: f64) -> bool {
        match self.get_mut(id) {
            Some(tier) => {
                tier.probability = probability;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn probability_sum(&self) -> f64 {
        self.tiers.iter().map(|t| t.probability).sum()
    }

    /// Non-blocking check that the probabilities cover the whole distribution.
    /// Calculations proceed on the as-given values either way.
    pub fn probability_warning(&self) -> Option<String> {
        let sum = self.probability_sum();
        if (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
            Some(format!(
                "probabilities sum to {:.2}% (should equal 100%)",
                sum * 100.0
            ))
        } else {
            None
        }
    }

    /// Tiers cloned in ascending cost-basis order. The sort is stable, so
    /// tiers with equal `avg_value` keep their list order.
    pub fn sorted_by_value(&self) -> Vec<PriceTier> {
        let mut sorted = self.tiers.clone();
        sorted.sort_by(|a, b| {
            a.avg_value
                .partial_cmp(&b.avg_value)
                .expect("tier avg_value must not be NaN")
        });
        sorted
    }
}

impl Default for TierSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_probability_sum() {
        let tier_set = TierSet::default_catalog();
        assert_eq!(tier_set.len(), 6);
        // The stock catalog is fully specified, so no warning
        assert!(tier_set.probability_warning().is_none());
        assert!((tier_set.probability_sum() - 1.0).abs() < PROBABILITY_SUM_TOLERANCE);
    }

    #[test]
    fn test_probability_warning_triggers() {
        let mut tier_set = TierSet::default_catalog();
        tier_set.tiers[0].probability = 0.40;
        let warning = tier_set.probability_warning().expect("sum is off by 0.17");
        assert!(warning.contains("should equal 100%"));
    }

    #[test]
    fn test_remove_last_tier_rejected() {
        let mut tier_set = TierSet::new();
        let id = tier_set.add("Only", 0.0, 10.0, 1.0, 0.5, 5.0);
        let result = tier_set.remove(id);
        assert!(result.is_err());
        // The list is untouched after the rejected removal
        assert_eq!(tier_set.len(), 1);
        assert_eq!(tier_set.tiers[0].id, id);
    }

    #[test]
    fn test_remove_unknown_id() {
        let mut tier_set = TierSet::default_catalog();
        assert!(tier_set.remove(999).is_err());
        assert_eq!(tier_set.len(), 6);
    }

    #[test]
    fn test_ids_stable_across_removal() {
        let mut tier_set = TierSet::default_catalog();
        let removed = tier_set.remove(1).unwrap();
        assert_eq!(removed.name, "Range 1");
        // New ids continue above the highest surviving id
        let new_id = tier_set.add_derived();
        assert_eq!(new_id, 7);
        assert!(tier_set.get(1).is_none());
        assert!(tier_set.get(7).is_some());
    }

    #[test]
    fn test_add_derived_extends_last_bracket() {
        let mut tier_set = TierSet::default_catalog();
        let id = tier_set.add_derived();
        let tier = tier_set.get(id).unwrap();
        assert_eq!(tier.min, 4000.01);
        assert_eq!(tier.max, 4100.0);
        assert_eq!(tier.avg_value, 4050.0);
        assert_eq!(tier.probability, 0.01);
        assert_eq!(tier.buyback_rate, 0.5);
    }

    #[test]
    fn test_sorted_by_value_is_stable_for_ties() {
        let mut tier_set = TierSet::new();
        tier_set.add("A", 0.0, 10.0, 0.5, 0.1, 20.0);
        tier_set.add("B", 10.0, 20.0, 0.3, 0.2, 20.0);
        tier_set.add("C", 20.0, 30.0, 0.2, 0.3, 10.0);
        let sorted = tier_set.sorted_by_value();
        let names: Vec<&str> = sorted.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_fair_value_recovers_market_value() {
        let tier_set = TierSet::default_catalog();
        let tier = tier_set.get(1).unwrap();
        // 45.72 cost basis at 95% product cost is a ~48.13 market value
        assert!((tier.fair_value(95.0) - 45.72 / 0.95).abs() < 1e-12);
    }
}

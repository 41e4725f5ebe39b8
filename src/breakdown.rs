/// This file contains the Breakdown struct: the full financial picture for one
/// parameter set and tier list, produced fresh on every call.
///
/// The calculation is a pure function of its inputs. It never mutates the
/// parameters or the tier list, performs no I/O, and is total over all numeric
/// inputs: degenerate divisions (zero packs, zero pack price) produce NaN or
/// infinity in the affected derived metrics and are passed through unmasked.
use crate::logger::{LogEvent, Logger};
use crate::logln;
use crate::params::Parameters;
use crate::tiers::{PriceTier, TierSet, PROBABILITY_SUM_TOLERANCE};

/// Per-tier quantities. Every intermediate is retained: detail views, export
/// and the optimizer all read from here rather than recomputing.
#[derive(Debug, Clone)]
pub struct TierBreakdown {
    pub tier_id: usize,
    pub tier_name: String,
    /// Packs expected to yield an item from this tier
    pub packs_in_tier: f64,
    /// Cost-basis value of everything pulled from this tier
    pub gmv_for_tier: f64,
    pub items_kept: f64,
    /// Inventory spend; only kept items consume fresh inventory
    pub cost_for_kept: f64,
    pub items_bought_back: f64,
    /// Payout basis per item, same for every item in the tier
    pub buyback_value: f64,
    /// Commission retained per buyback
    pub commission_earned: f64,
    /// What the customer actually receives per buyback
    pub net_payout_to_user: f64,
    pub total_buyback_value: f64,
    pub total_payout_for_buybacks: f64,
    pub total_commission_earned: f64,
}

/// Complete financial breakdown: per-tier records plus aggregates
#[derive(Debug, Clone)]
pub struct Breakdown {
    pub tier_breakdowns: Vec<TierBreakdown>,
    /// Sum of the probabilities actually used (surfaced for the coverage warning)
    pub probability_sum: f64,
    pub total_revenue: f64,
    pub total_gmv: f64,
    pub total_items_kept: f64,
    pub total_buybacks: f64,
    pub total_cost_for_kept_items: f64,
    pub total_buyback_value: f64,
    pub total_payout_for_buybacks: f64,
    pub total_commission_earned: f64,
    pub total_platform_fees: f64,
    pub total_payment_processing_fees: f64,
    pub net_revenue: f64,
    pub profit_per_pack: f64,
    pub net_revenue_margin_percent: f64,
    pub per_pack_margin_percent: f64,
    /// Customer-facing expected item value (fair market value, not cost basis)
    pub average_item_value: f64,
}

/// Inventory to stock for one tier, with conservative (-10%) and liberal
/// (+10%) levels around the target
#[derive(Debug, Clone)]
pub struct InventoryLine {
    pub tier_id: usize,
    pub tier_name: String,
    pub target: f64,
    pub conservative: f64,
    pub liberal: f64,
}

/// Items needed for inventory across all tiers. Buyback items return to
/// circulation, so only kept items are counted.
#[derive(Debug, Clone)]
pub struct InventoryPlan {
    pub lines: Vec<InventoryLine>,
    pub total_target: f64,
    pub total_conservative: f64,
    pub total_liberal: f64,
}

impl Breakdown {
    /// Compute the breakdown for the tiers as configured
    pub fn new(params: &Parameters, tier_set: &TierSet) -> Self {
        let probabilities: Vec<f64> = tier_set.tiers.iter().map(|t| t.probability).collect();
        Self::with_probabilities(params, &tier_set.tiers, &probabilities)
    }

    /// Compute the breakdown with a replacement probability vector, one entry
    /// per tier by position.
    ///
    /// This is the single implementation of the formula chain. The optimizer
    /// scores candidate distributions through this same path, so the search
    /// and the displayed numbers can never disagree.
    pub fn with_probabilities(
        params: &Parameters,
        tiers: &[PriceTier],
        probabilities: &[f64],
    ) -> Self {
        assert_eq!(
            tiers.len(),
            probabilities.len(),
            "probability vector must match the tier list"
        );

        let num_packs = params.num_packs as f64;
        let buyback_fraction = params.buyback_percent / 100.0;
        let commission_fraction = params.commission_percent / 100.0;

        let mut tier_breakdowns = Vec::with_capacity(tiers.len());
        let mut probability_sum = 0.0;
        let mut total_gmv = 0.0;
        let mut total_items_kept = 0.0;
        let mut total_buybacks = 0.0;
        let mut total_cost_for_kept_items = 0.0;
        let mut total_buyback_value = 0.0;
        let mut total_payout_for_buybacks = 0.0;
        let mut total_commission_earned = 0.0;

        for (tier, &probability) in tiers.iter().zip(probabilities.iter()) {
            let packs_in_tier = num_packs * probability;
            let gmv_for_tier = packs_in_tier * tier.avg_value;

            // Keep flow: avg_value already is the cost basis
            let items_kept = packs_in_tier * (1.0 - tier.buyback_rate);
            let cost_for_kept = items_kept * tier.avg_value;

            // Buyback flow: payout basis is the cost basis, not market value
            let items_bought_back = packs_in_tier * tier.buyback_rate;
            let buyback_value = tier.avg_value * buyback_fraction;
            let commission_earned = buyback_value * commission_fraction;
            let net_payout_to_user = buyback_value - commission_earned;

            let tier_buyback_value = items_bought_back * buyback_value;
            let tier_payout = items_bought_back * net_payout_to_user;
            let tier_commission = items_bought_back * commission_earned;

            probability_sum += probability;
            total_gmv += gmv_for_tier;
            total_items_kept += items_kept;
            total_buybacks += items_bought_back;
            total_cost_for_kept_items += cost_for_kept;
            total_buyback_value += tier_buyback_value;
            total_payout_for_buybacks += tier_payout;
            total_commission_earned += tier_commission;

            tier_breakdowns.push(TierBreakdown {
                tier_id: tier.id,
                tier_name: tier.name.clone(),
                packs_in_tier,
                gmv_for_tier,
                items_kept,
                cost_for_kept,
                items_bought_back,
                buyback_value,
                commission_earned,
                net_payout_to_user,
                total_buyback_value: tier_buyback_value,
                total_payout_for_buybacks: tier_payout,
                total_commission_earned: tier_commission,
            });
        }

        let total_revenue = num_packs * params.cost_per_pack;

        // Payment processing fees apply to pack sales only
        let total_payment_processing_fees = total_revenue
            * (params.payment_processing_percent / 100.0)
            + num_packs * params.payment_processing_flat;

        // When the operator IS the platform there is nobody to pay the fee to
        let total_platform_fees = if params.include_platform_fees {
            0.0
        } else {
            total_revenue * (params.platform_fee_percent / 100.0)
        };

        // Subtract the full buyback value, then add the commission back.
        // Bought-back items return to circulation, so inventory spend covers
        // kept items only; that assumption is load-bearing for the whole model.
        let net_revenue = total_revenue - total_buyback_value + total_commission_earned
            - total_platform_fees
            - total_cost_for_kept_items
            - total_payment_processing_fees;

        let profit_per_pack = net_revenue / num_packs;
        let net_revenue_margin_percent = net_revenue / total_revenue * 100.0;
        let per_pack_margin_percent = profit_per_pack / params.cost_per_pack * 100.0;
        let average_item_value = (total_gmv / num_packs) / (params.product_cost_percent / 100.0);

        Self {
            tier_breakdowns,
            probability_sum,
            total_revenue,
            total_gmv,
            total_items_kept,
            total_buybacks,
            total_cost_for_kept_items,
            total_buyback_value,
            total_payout_for_buybacks,
            total_commission_earned,
            total_platform_fees,
            total_payment_processing_fees,
            net_revenue,
            profit_per_pack,
            net_revenue_margin_percent,
            per_pack_margin_percent,
            average_item_value,
        }
    }

    /// Coverage warning carried over from the tier list actually computed on
    pub fn probability_warning(&self) -> Option<String> {
        if (self.probability_sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
            Some(format!(
                "probabilities sum to {:.2}% (should equal 100%)",
                self.probability_sum * 100.0
            ))
        } else {
            None
        }
    }

    /// Items to stock per tier, rounded up, with the ±10% planning band
    pub fn inventory_plan(&self) -> InventoryPlan {
        let lines: Vec<InventoryLine> = self
            .tier_breakdowns
            .iter()
            .map(|t| InventoryLine {
                tier_id: t.tier_id,
                tier_name: t.tier_name.clone(),
                target: t.items_kept.ceil(),
                conservative: (t.items_kept * 0.9).ceil(),
                liberal: (t.items_kept * 1.1).ceil(),
            })
            .collect();
        InventoryPlan {
            lines,
            total_target: self.total_items_kept.ceil(),
            total_conservative: (self.total_items_kept * 0.9).ceil(),
            total_liberal: (self.total_items_kept * 1.1).ceil(),
        }
    }

    /// Output the per-tier keep/buyback flows (without header, for compact output)
    pub fn printout_tiers(&self, logger: &mut Logger, event: LogEvent) {
        for tier in &self.tier_breakdowns {
            logln!(
                logger,
                event,
                "\nTier {} ({}) - {:.2} packs, GMV {:.2}",
                tier.tier_id,
                tier.tier_name,
                tier.packs_in_tier,
                tier.gmv_for_tier
            );
            logln!(
                logger,
                event,
                "  Kept: {:.2} items, inventory cost {:.2}",
                tier.items_kept,
                tier.cost_for_kept
            );
            logln!(
                logger,
                event,
                "  Bought back: {:.2} items at {:.2} each (commission {:.2}, payout {:.2})",
                tier.items_bought_back,
                tier.buyback_value,
                tier.commission_earned,
                tier.net_payout_to_user
            );
            logln!(
                logger,
                event,
                "  Totals (buyback value/payout/commission): {:.2} / {:.2} / {:.2}",
                tier.total_buyback_value,
                tier.total_payout_for_buybacks,
                tier.total_commission_earned
            );
        }
    }

    /// Output the aggregate revenue picture
    pub fn printout_overall(&self, logger: &mut Logger) {
        logln!(logger, LogEvent::Variant, "\n=== Revenue Breakdown ===");
        logln!(
            logger,
            LogEvent::Variant,
            "Pack Sales Revenue: {:.2}",
            self.total_revenue
        );
        if self.total_platform_fees > 0.0 {
            logln!(
                logger,
                LogEvent::Variant,
                "- Platform Fees: {:.2}",
                self.total_platform_fees
            );
        }
        logln!(
            logger,
            LogEvent::Variant,
            "- Buyback Value (full): {:.2}",
            self.total_buyback_value
        );
        logln!(
            logger,
            LogEvent::Variant,
            "+ Commission from Buybacks: {:.2}",
            self.total_commission_earned
        );
        logln!(
            logger,
            LogEvent::Variant,
            "- Inventory Cost (kept items only): {:.2}",
            self.total_cost_for_kept_items
        );
        logln!(
            logger,
            LogEvent::Variant,
            "- Payment Processing Fees: {:.2}",
            self.total_payment_processing_fees
        );
        logln!(
            logger,
            LogEvent::Variant,
            "Net Revenue: {:.2} (margin {:.2}%)",
            self.net_revenue,
            self.net_revenue_margin_percent
        );
        logln!(
            logger,
            LogEvent::Variant,
            "Profit per Pack: {:.2} (per-pack margin {:.2}%)",
            self.profit_per_pack,
            self.per_pack_margin_percent
        );
        logln!(
            logger,
            LogEvent::Variant,
            "Avg Item Value (customer EV): {:.2} (GMV {:.2})",
            self.average_item_value,
            self.total_gmv
        );
        let buyback_share = self.total_buybacks / (self.total_items_kept + self.total_buybacks);
        logln!(
            logger,
            LogEvent::Variant,
            "Total Buybacks: {:.2} ({:.2}% of items)",
            self.total_buybacks,
            buyback_share * 100.0
        );
    }

    /// Output complete statistics: coverage warning, per-tier flows, inventory
    /// plan and the aggregate picture
    pub fn printout(&self, logger: &mut Logger) {
        if let Some(warning) = self.probability_warning() {
            let _ = logger.warnln(LogEvent::Variant, &warning);
        }
        self.printout_tiers(logger, LogEvent::Compute);

        let plan = self.inventory_plan();
        logln!(logger, LogEvent::Variant, "\n=== Items Needed for Inventory ===");
        for line in &plan.lines {
            logln!(
                logger,
                LogEvent::Variant,
                "Tier {} ({}): {:.0} ({:.0}-{:.0})",
                line.tier_id,
                line.tier_name,
                line.target,
                line.conservative,
                line.liberal
            );
        }
        logln!(
            logger,
            LogEvent::Variant,
            "Total: {:.0} ({:.0}-{:.0})",
            plan.total_target,
            plan.total_conservative,
            plan.total_liberal
        );

        self.printout_overall(logger);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_tier_setup() -> (Parameters, TierSet) {
        let params = Parameters {
            num_packs: 100,
            cost_per_pack: 10.0,
            product_cost_percent: 95.0,
            buyback_percent: 100.0,
            commission_percent: 10.0,
            platform_fee_percent: 0.0,
            include_platform_fees: true,
            payment_processing_percent: 0.0,
            payment_processing_flat: 0.0,
        };
        let mut tier_set = TierSet::new();
        tier_set.add("Only", 0.0, 10.0, 1.0, 0.5, 5.0);
        (params, tier_set)
    }

    #[test]
    fn test_single_tier_full_chain() {
        let (params, tier_set) = single_tier_setup();
        let breakdown = Breakdown::new(&params, &tier_set);

        let tier = &breakdown.tier_breakdowns[0];
        assert_eq!(tier.packs_in_tier, 100.0);
        assert_eq!(tier.items_kept, 50.0);
        assert_eq!(tier.cost_for_kept, 250.0);
        assert_eq!(tier.items_bought_back, 50.0);
        assert_eq!(tier.buyback_value, 5.0);
        assert_eq!(tier.commission_earned, 0.5);
        assert_eq!(tier.net_payout_to_user, 4.5);
        assert_eq!(tier.total_buyback_value, 250.0);
        assert_eq!(tier.total_commission_earned, 25.0);
        assert_eq!(tier.total_payout_for_buybacks, 225.0);

        assert_eq!(breakdown.total_revenue, 1000.0);
        assert_eq!(breakdown.total_platform_fees, 0.0);
        assert_eq!(breakdown.total_payment_processing_fees, 0.0);
        assert_eq!(breakdown.net_revenue, 525.0);
        assert_eq!(breakdown.net_revenue_margin_percent, 52.5);
        assert_eq!(breakdown.profit_per_pack, 5.25);
    }

    #[test]
    fn test_single_tier_with_platform_fees() {
        let (mut params, tier_set) = single_tier_setup();
        params.include_platform_fees = false;
        params.platform_fee_percent = 10.0;
        let breakdown = Breakdown::new(&params, &tier_set);

        assert_eq!(breakdown.total_platform_fees, 100.0);
        assert_eq!(breakdown.net_revenue, 425.0);
        assert_eq!(breakdown.net_revenue_margin_percent, 42.5);
    }

    #[test]
    fn test_platform_fee_zeroed_when_operator_is_platform() {
        let (mut params, tier_set) = single_tier_setup();
        params.include_platform_fees = true;
        params.platform_fee_percent = 50.0;
        let breakdown = Breakdown::new(&params, &tier_set);
        assert_eq!(breakdown.total_platform_fees, 0.0);
        assert_eq!(breakdown.net_revenue, 525.0);
    }

    #[test]
    fn test_conservation_identities_on_default_catalog() {
        let params = Parameters::default();
        let tier_set = TierSet::default_catalog();
        let breakdown = Breakdown::new(&params, &tier_set);

        for tier in &breakdown.tier_breakdowns {
            // Items either stay with the customer or come back; nothing leaks
            assert!((tier.items_kept + tier.items_bought_back - tier.packs_in_tier).abs() < 1e-9);
            // The buyback value splits exactly into payout and commission
            assert!((tier.net_payout_to_user + tier.commission_earned - tier.buyback_value).abs() < 1e-12);
        }

        // Money conservation across the buyback split
        assert!(
            (breakdown.total_commission_earned + breakdown.total_payout_for_buybacks
                - breakdown.total_buyback_value)
                .abs()
                < 1e-6
        );
    }

    #[test]
    fn test_degenerate_divisions_propagate() {
        let params = Parameters {
            num_packs: 0,
            ..Parameters::default()
        };
        let tier_set = TierSet::default_catalog();
        let breakdown = Breakdown::new(&params, &tier_set);

        // 0/0 divisions surface as NaN, not as a masked default
        assert!(breakdown.profit_per_pack.is_nan());
        assert!(breakdown.net_revenue_margin_percent.is_nan());
        assert!(breakdown.average_item_value.is_nan());
        // The non-divided aggregates stay finite
        assert_eq!(breakdown.total_revenue, 0.0);
        assert_eq!(breakdown.net_revenue, 0.0);
    }

    #[test]
    fn test_zero_pack_price_propagates_infinity() {
        let params = Parameters {
            cost_per_pack: 0.0,
            ..Parameters::default()
        };
        let tier_set = TierSet::default_catalog();
        let breakdown = Breakdown::new(&params, &tier_set);

        // Net revenue is negative (all costs, no sales), so margin is -inf
        assert!(breakdown.net_revenue < 0.0);
        assert!(breakdown.net_revenue_margin_percent.is_infinite());
        assert!(breakdown.per_pack_margin_percent.is_infinite());
    }

    #[test]
    fn test_inputs_not_mutated() {
        let params = Parameters::default();
        let tier_set = TierSet::default_catalog();
        let before: Vec<PriceTier> = tier_set.tiers.clone();
        let _ = Breakdown::new(&params, &tier_set);
        assert_eq!(tier_set.tiers, before);
    }

    #[test]
    fn test_inventory_plan_band() {
        let params = Parameters::default();
        let tier_set = TierSet::default_catalog();
        let plan = Breakdown::new(&params, &tier_set).inventory_plan();

        assert_eq!(plan.lines.len(), 6);
        for line in &plan.lines {
            assert!(line.conservative <= line.target);
            assert!(line.target <= line.liberal);
        }
        assert!(plan.total_conservative <= plan.total_target);
        assert!(plan.total_target <= plan.total_liberal);
    }

    #[test]
    fn test_average_item_value_is_fair_value() {
        // One tier, cost basis 95, product cost 95% -> customers see 100
        let params = Parameters {
            num_packs: 10,
            cost_per_pack: 100.0,
            product_cost_percent: 95.0,
            ..Parameters::without_transaction_fees()
        };
        let mut tier_set = TierSet::new();
        tier_set.add("Only", 90.0, 110.0, 1.0, 0.0, 95.0);
        let breakdown = Breakdown::new(&params, &tier_set);
        assert!((breakdown.average_item_value - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_probability_warning_surfaced_not_fatal() {
        let params = Parameters::default();
        let mut tier_set = TierSet::default_catalog();
        tier_set.tiers[0].probability = 0.40;
        let breakdown = Breakdown::new(&params, &tier_set);
        assert!(breakdown.probability_warning().is_some());
        // The computation still ran on the as-given values
        assert!(breakdown.net_revenue.is_finite());
    }
}

/// Baseline breakdown of the stock configuration.
///
/// Runs the revenue engine on the default parameters and the default six-tier
/// catalog, prints the full breakdown, and validates the accounting
/// identities that must hold for any input:
///
/// - every pack in a tier is either kept or bought back
/// - the buyback value splits exactly into payout and commission
/// - the inventory plan's conservative/target/liberal levels are ordered
use crate::breakdown::Breakdown;
use crate::errln;
use crate::logger::{LogEvent, Logger};
use crate::logln;
use crate::params::Parameters;
use crate::tiers::TierSet;

// Register this scenario in the catalog
inventory::submit!(crate::scenarios::ScenarioEntry {
    short_name: "baseline_breakdown",
    run,
});

pub fn run(scenario_name: &str, logger: &mut Logger) -> Result<(), Box<dyn std::error::Error>> {
    let params = Parameters::default();
    let tier_set = TierSet::default_catalog();

    let breakdown = Breakdown::new(&params, &tier_set);
    breakdown.printout(logger);

    logln!(logger, LogEvent::Scenario, "");

    let mut errors: Vec<String> = Vec::new();

    // Check: the stock catalog covers the whole distribution
    let msg = format!(
        "Probabilities cover the distribution: sum = {:.5}",
        breakdown.probability_sum
    );
    if breakdown.probability_warning().is_none() {
        logln!(logger, LogEvent::Scenario, "✓ {}", msg);
    } else {
        errors.push(msg.clone());
        errln!(logger, LogEvent::Scenario, "✗ {}", msg);
    }

    // Check: per tier, kept plus bought back accounts for every pack
    let mut conservation_ok = true;
    for tier in &breakdown.tier_breakdowns {
        if (tier.items_kept + tier.items_bought_back - tier.packs_in_tier).abs() > 1e-9 {
            conservation_ok = false;
        }
        if (tier.net_payout_to_user + tier.commission_earned - tier.buyback_value).abs() > 1e-9 {
            conservation_ok = false;
        }
    }
    let msg = "Per-tier conservation: kept + bought back = packs, payout + commission = buyback value".to_string();
    if conservation_ok {
        logln!(logger, LogEvent::Scenario, "✓ {}", msg);
    } else {
        errors.push(msg.clone());
        errln!(logger, LogEvent::Scenario, "✗ {}", msg);
    }

    // Check: money conservation across the buyback split
    let split_gap = (breakdown.total_commission_earned + breakdown.total_payout_for_buybacks
        - breakdown.total_buyback_value)
        .abs();
    let msg = format!(
        "Buyback money conservation: commission + payouts = buyback value (gap {:.2e})",
        split_gap
    );
    if split_gap < 1e-6 {
        logln!(logger, LogEvent::Scenario, "✓ {}", msg);
    } else {
        errors.push(msg.clone());
        errln!(logger, LogEvent::Scenario, "✗ {}", msg);
    }

    // Check: the inventory planning band is ordered per tier and overall
    let plan = breakdown.inventory_plan();
    let band_ok = plan
        .lines
        .iter()
        .all(|line| line.conservative <= line.target && line.target <= line.liberal)
        && plan.total_conservative <= plan.total_target
        && plan.total_target <= plan.total_liberal;
    let msg = format!(
        "Inventory plan band ordered: total {:.0} ({:.0}-{:.0})",
        plan.total_target, plan.total_conservative, plan.total_liberal
    );
    if band_ok {
        logln!(logger, LogEvent::Scenario, "✓ {}", msg);
    } else {
        errors.push(msg.clone());
        errln!(logger, LogEvent::Scenario, "✗ {}", msg);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(format!(
            "Scenario '{}' validation failed:\n{}",
            scenario_name,
            errors.join("\n")
        )
        .into())
    }
}

/// Cross-checks the analytic breakdown against a simulated batch of pack
/// openings.
///
/// Opens a large seeded batch against the default configuration and validates
/// that the realized tier frequencies and the realized margin converge on the
/// analytic numbers. The seed comes from the shared RAND_SEED so reruns with
/// a different iteration index exercise different draws.
use crate::breakdown::Breakdown;
use crate::errln;
use crate::logger::{LogEvent, Logger};
use crate::logln;
use crate::montecarlo::simulate_pack_openings;
use crate::params::Parameters;
use crate::tiers::TierSet;
use crate::utils::RAND_SEED;
use std::sync::atomic::Ordering;

// Register this scenario in the catalog
inventory::submit!(crate::scenarios::ScenarioEntry {
    short_name: "monte_carlo_check",
    run,
});

const PACKS_TO_OPEN: u32 = 200_000;
const COST_SPREAD_FRACTION: f64 = 0.1;
const MARGIN_TOLERANCE_POINTS: f64 = 3.0;
const FREQUENCY_TOLERANCE: f64 = 0.01;

pub fn run(scenario_name: &str, logger: &mut Logger) -> Result<(), Box<dyn std::error::Error>> {
    let params = Parameters::default();
    let tier_set = TierSet::default_catalog();
    let seed = RAND_SEED.load(Ordering::Relaxed);

    let analytic = Breakdown::new(&params, &tier_set);
    let simulated = simulate_pack_openings(
        &params,
        &tier_set,
        PACKS_TO_OPEN,
        COST_SPREAD_FRACTION,
        seed,
    );

    logln!(
        logger,
        LogEvent::Variant,
        "\n=== Simulated {} packs (seed {}) ===",
        simulated.packs_opened,
        seed
    );
    logln!(
        logger,
        LogEvent::Variant,
        "Kept/bought back: {} / {}",
        simulated.items_kept,
        simulated.items_bought_back
    );
    logln!(
        logger,
        LogEvent::Variant,
        "Realized (revenue/inventory/buyback/commission): {:.2} / {:.2} / {:.2} / {:.2}",
        simulated.realized_revenue,
        simulated.realized_inventory_cost,
        simulated.realized_buyback_value,
        simulated.realized_commission
    );
    logln!(
        logger,
        LogEvent::Variant,
        "Realized fees (platform/payment processing): {:.2} / {:.2}",
        simulated.realized_platform_fees,
        simulated.realized_payment_processing_fees
    );
    logln!(
        logger,
        LogEvent::Variant,
        "Realized net revenue: {:.2} (margin {:.2}%, analytic {:.2}%)",
        simulated.net_revenue,
        simulated.net_revenue_margin_percent,
        analytic.net_revenue_margin_percent
    );

    logln!(logger, LogEvent::Scenario, "");

    let mut errors: Vec<String> = Vec::new();

    // Check: every simulated pack was either kept or bought back
    let msg = format!(
        "Every pack accounted for: {} kept + {} bought back = {}",
        simulated.items_kept, simulated.items_bought_back, simulated.packs_opened
    );
    if simulated.items_kept + simulated.items_bought_back == simulated.packs_opened {
        logln!(logger, LogEvent::Scenario, "✓ {}", msg);
    } else {
        errors.push(msg.clone());
        errln!(logger, LogEvent::Scenario, "✗ {}", msg);
    }

    // Check: realized tier frequencies match the configured probabilities
    let mut worst_gap = 0.0f64;
    for (tier, &draws) in tier_set.tiers.iter().zip(simulated.tier_draws.iter()) {
        let frequency = draws as f64 / simulated.packs_opened as f64;
        worst_gap = worst_gap.max((frequency - tier.probability).abs());
    }
    let msg = format!(
        "Tier frequencies within {:.3} of probabilities (worst gap {:.5})",
        FREQUENCY_TOLERANCE, worst_gap
    );
    if worst_gap < FREQUENCY_TOLERANCE {
        logln!(logger, LogEvent::Scenario, "✓ {}", msg);
    } else {
        errors.push(msg.clone());
        errln!(logger, LogEvent::Scenario, "✗ {}", msg);
    }

    // Check: the realized margin converges on the analytic margin
    let margin_gap =
        (simulated.net_revenue_margin_percent - analytic.net_revenue_margin_percent).abs();
    let msg = format!(
        "Realized margin within {:.1} points of analytic (gap {:.3})",
        MARGIN_TOLERANCE_POINTS, margin_gap
    );
    if margin_gap < MARGIN_TOLERANCE_POINTS {
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

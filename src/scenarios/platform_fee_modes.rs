/// Compares the two platform-fee modes on otherwise identical inputs.
///
/// Variant A: the operator IS the platform (no platform fee is paid out).
///
/// Variant B: the operator sells on a third-party platform and pays the
/// platform fee on every pack sale.
///
/// The gap between the two variants must be exactly the platform fee on pack
/// sales, both in absolute money and in margin points.
use crate::breakdown::Breakdown;
use crate::errln;
use crate::logger::{LogEvent, Logger};
use crate::logln;
use crate::params::Parameters;
use crate::tiers::TierSet;

// Register this scenario in the catalog
inventory::submit!(crate::scenarios::ScenarioEntry {
    short_name: "platform_fee_modes",
    run,
});

pub fn run(scenario_name: &str, logger: &mut Logger) -> Result<(), Box<dyn std::error::Error>> {
    let tier_set = TierSet::default_catalog();

    // Variant A: operator-owned platform
    let params_own = Parameters {
        include_platform_fees: true,
        ..Parameters::default()
    };
    logln!(logger, LogEvent::Variant, "\n=== Variant A: operator is the platform ===");
    let breakdown_own = Breakdown::new(&params_own, &tier_set);
    breakdown_own.printout_overall(logger);

    // Variant B: selling on a third-party platform
    let params_third_party = Parameters {
        include_platform_fees: false,
        ..Parameters::default()
    };
    logln!(logger, LogEvent::Variant, "\n=== Variant B: third-party platform ===");
    let breakdown_third_party = Breakdown::new(&params_third_party, &tier_set);
    breakdown_third_party.printout_overall(logger);

    logln!(logger, LogEvent::Scenario, "");

    let mut errors: Vec<String> = Vec::new();

    // Check: variant A pays no platform fee at all
    let msg = format!(
        "Variant A (own platform) pays no platform fee: {:.2}",
        breakdown_own.total_platform_fees
    );
    if breakdown_own.total_platform_fees == 0.0 {
        logln!(logger, LogEvent::Scenario, "✓ {}", msg);
    } else {
        errors.push(msg.clone());
        errln!(logger, LogEvent::Scenario, "✗ {}", msg);
    }

    // Check: the net revenue gap is exactly the platform fee on pack sales
    let expected_fee =
        breakdown_third_party.total_revenue * (params_third_party.platform_fee_percent / 100.0);
    let net_gap = breakdown_own.net_revenue - breakdown_third_party.net_revenue;
    let msg = format!(
        "Net revenue gap equals the platform fee: {:.2} vs {:.2}",
        net_gap, expected_fee
    );
    if (net_gap - expected_fee).abs() < 1e-6 {
        logln!(logger, LogEvent::Scenario, "✓ {}", msg);
    } else {
        errors.push(msg.clone());
        errln!(logger, LogEvent::Scenario, "✗ {}", msg);
    }

    // Check: the margin gap is exactly the platform fee percentage
    let margin_gap = breakdown_own.net_revenue_margin_percent
        - breakdown_third_party.net_revenue_margin_percent;
    let msg = format!(
        "Margin gap equals the platform fee percent: {:.4} vs {:.4}",
        margin_gap, params_third_party.platform_fee_percent
    );
    if (margin_gap - params_third_party.platform_fee_percent).abs() < 1e-9 {
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

/// Fits the stock catalog's probabilities to a target net revenue margin.
///
/// The scenario's core check is consistency: the margin the optimizer scored
/// the winning candidate with must be exactly the margin the breakdown
/// reports for the updated tier list, because both run through the same
/// aggregate path. A search that disagreed with the display would be worse
/// than no search.
use crate::breakdown::Breakdown;
use crate::errln;
use crate::logger::{LogEvent, Logger};
use crate::logln;
use crate::objectives::OptimizeTarget;
use crate::optimizer::{OptimizeOutcome, PyramidOptimizer};
use crate::params::Parameters;
use crate::tiers::TierSet;

// Register this scenario in the catalog
inventory::submit!(crate::scenarios::ScenarioEntry {
    short_name: "target_margin",
    run,
});

const TARGET_MARGIN_PERCENT: f64 = 5.0;

pub fn run(scenario_name: &str, logger: &mut Logger) -> Result<(), Box<dyn std::error::Error>> {
    let params = Parameters::default();
    let mut tier_set = TierSet::default_catalog();
    let optimizer = PyramidOptimizer::default();
    let targets = [OptimizeTarget::NET_REVENUE_MARGIN {
        target_margin_percent: TARGET_MARGIN_PERCENT,
    }];

    let outcome = optimizer.optimize(&mut tier_set, &params, &targets, logger);

    let breakdown = Breakdown::new(&params, &tier_set);
    breakdown.printout_overall(logger);

    logln!(logger, LogEvent::Scenario, "");

    let mut errors: Vec<String> = Vec::new();

    let (score, probabilities) = match &outcome {
        OptimizeOutcome::Fitted {
            score,
            probabilities,
            ..
        } => (*score, probabilities.clone()),
        OptimizeOutcome::NoValidPyramid => {
            return Err(format!(
                "Scenario '{}': no pyramid-consistent fit found for the default catalog",
                scenario_name
            )
            .into())
        }
    };

    // Check: pyramid invariants on the written-back distribution
    let pyramid_ok = probabilities.windows(2).all(|pair| pair[1] < pair[0]);
    let sum: f64 = probabilities.iter().sum();
    let msg = format!(
        "Pyramid invariants hold: strictly decreasing, sum {:.12}",
        sum
    );
    if pyramid_ok && (sum - 1.0).abs() < 1e-9 {
        logln!(logger, LogEvent::Scenario, "✓ {}", msg);
    } else {
        errors.push(msg.clone());
        errln!(logger, LogEvent::Scenario, "✗ {}", msg);
    }

    // Check: the optimizer's score is the weighted miss of the displayed margin
    let displayed_margin = breakdown.net_revenue_margin_percent;
    let recomputed_score = 10.0 * (displayed_margin - TARGET_MARGIN_PERCENT).abs();
    let msg = format!(
        "Optimizer and display agree: margin {:.4}%, score {:.6} vs recomputed {:.6}",
        displayed_margin, score, recomputed_score
    );
    if (score - recomputed_score).abs() < 1e-9 {
        logln!(logger, LogEvent::Scenario, "✓ {}", msg);
    } else {
        errors.push(msg.clone());
        errln!(logger, LogEvent::Scenario, "✗ {}", msg);
    }

    // Check: rerunning with identical inputs reproduces the vector exactly
    let mut rerun_tiers = TierSet::default_catalog();
    let rerun_outcome = optimizer.optimize(&mut rerun_tiers, &params, &targets, logger);
    let identical = match &rerun_outcome {
        OptimizeOutcome::Fitted {
            probabilities: rerun,
            ..
        } => rerun == &probabilities,
        OptimizeOutcome::NoValidPyramid => false,
    };
    let msg = "Deterministic sweep: rerun reproduces the exact probability vector".to_string();
    if identical {
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

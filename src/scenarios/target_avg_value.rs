/// Fits the stock catalog's probabilities to a target expected item value.
///
/// The target of 80 (cost basis) sits inside the band the sweep can reach for
/// the default catalog, so the fit must land close; the scenario also checks
/// the pyramid invariants and that a rerun reproduces the exact same vector.
use crate::errln;
use crate::logger::{LogEvent, Logger};
use crate::logln;
use crate::objectives::OptimizeTarget;
use crate::optimizer::{OptimizeOutcome, PyramidOptimizer};
use crate::params::Parameters;
use crate::tiers::TierSet;

// Register this scenario in the catalog
inventory::submit!(crate::scenarios::ScenarioEntry {
    short_name: "target_avg_value",
    run,
});

const TARGET_AVG_VALUE: f64 = 80.0;

pub fn run(scenario_name: &str, logger: &mut Logger) -> Result<(), Box<dyn std::error::Error>> {
    let params = Parameters::default();
    let mut tier_set = TierSet::default_catalog();
    let optimizer = PyramidOptimizer::default();
    let targets = [OptimizeTarget::AVG_ITEM_VALUE {
        target_avg_value: TARGET_AVG_VALUE,
    }];

    let outcome = optimizer.optimize(&mut tier_set, &params, &targets, logger);

    logln!(logger, LogEvent::Scenario, "");

    let mut errors: Vec<String> = Vec::new();

    let probabilities = match &outcome {
        OptimizeOutcome::Fitted { probabilities, .. } => probabilities.clone(),
        OptimizeOutcome::NoValidPyramid => {
            return Err(format!(
                "Scenario '{}': no pyramid-consistent fit found for the default catalog",
                scenario_name
            )
            .into())
        }
    };

    // Check: strictly decreasing pyramid over the value-sorted tiers
    let pyramid_ok = probabilities.windows(2).all(|pair| pair[1] < pair[0]);
    let msg = "Probabilities fall strictly from cheapest to priciest tier".to_string();
    if pyramid_ok {
        logln!(logger, LogEvent::Scenario, "✓ {}", msg);
    } else {
        errors.push(msg.clone());
        errln!(logger, LogEvent::Scenario, "✗ {}", msg);
    }

    // Check: the distribution is normalized
    let sum: f64 = probabilities.iter().sum();
    let msg = format!("Probabilities sum to 1: {:.12}", sum);
    if (sum - 1.0).abs() < 1e-9 {
        logln!(logger, LogEvent::Scenario, "✓ {}", msg);
    } else {
        errors.push(msg.clone());
        errln!(logger, LogEvent::Scenario, "✗ {}", msg);
    }

    // Check: the achieved expected value lands near the target. The sweep
    // crosses the target for this catalog, so the miss is bounded by one grid
    // step of expected-value movement.
    let achieved: f64 = tier_set
        .sorted_by_value()
        .iter()
        .map(|t| t.probability * t.avg_value)
        .sum();
    let msg = format!(
        "Achieved expected value {:.2} within 1.0 of target {:.2}",
        achieved, TARGET_AVG_VALUE
    );
    if (achieved - TARGET_AVG_VALUE).abs() <= 1.0 {
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

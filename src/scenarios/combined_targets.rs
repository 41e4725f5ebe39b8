/// Runs the optimizer with both objectives active at once.
///
/// The combined score is the expected-value miss plus ten times the margin
/// miss, so the search leans toward revenue accuracy. The scenario validates
/// the scoring arithmetic against the final tier list and the pyramid
/// invariants on the winner.
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
    short_name: "combined_targets",
    run,
});

const TARGET_AVG_VALUE: f64 = 80.0;
const TARGET_MARGIN_PERCENT: f64 = 5.0;

pub fn run(scenario_name: &str, logger: &mut Logger) -> Result<(), Box<dyn std::error::Error>> {
    let params = Parameters::default();
    let mut tier_set = TierSet::default_catalog();
    let optimizer = PyramidOptimizer::default();
    let targets = [
        OptimizeTarget::AVG_ITEM_VALUE {
            target_avg_value: TARGET_AVG_VALUE,
        },
        OptimizeTarget::NET_REVENUE_MARGIN {
            target_margin_percent: TARGET_MARGIN_PERCENT,
        },
    ];

    let outcome = optimizer.optimize(&mut tier_set, &params, &targets, logger);

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

    // Check: pyramid invariants on the winner
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

    // Check: the combined score decomposes into the two weighted misses,
    // both recomputed from the updated tier list
    let sorted = tier_set.sorted_by_value();
    let achieved_ev: f64 = sorted.iter().map(|t| t.probability * t.avg_value).sum();
    let achieved_margin = Breakdown::new(&params, &tier_set).net_revenue_margin_percent;
    let recomputed_score = (achieved_ev - TARGET_AVG_VALUE).abs()
        + 10.0 * (achieved_margin - TARGET_MARGIN_PERCENT).abs();
    let msg = format!(
        "Score decomposes: ev {:.2}, margin {:.2}%, score {:.6} vs recomputed {:.6}",
        achieved_ev, achieved_margin, score, recomputed_score
    );
    if (score - recomputed_score).abs() < 1e-9 {
        logln!(logger, LogEvent::Scenario, "✓ {}", msg);
    } else {
        errors.push(msg.clone());
        errln!(logger, LogEvent::Scenario, "✗ {}", msg);
    }

    // Check: the winner scores no worse than the first candidate the sweep
    // examined (the flattest pyramid). The driver only keeps improvements, so
    // this bound holds whether or not the sweep exited early.
    let flattest = crate::optimizer::PyramidSweep::new(
        &optimizer.seed_weights,
        sorted.len(),
        optimizer.steepness_start,
        optimizer.steepness_start,
        optimizer.steepness_step,
    )
    .next()
    .expect("single-step sweep yields one candidate");
    let flattest_ev: f64 = flattest
        .probabilities
        .iter()
        .zip(sorted.iter())
        .map(|(p, tier)| p * tier.avg_value)
        .sum();
    let flattest_margin = Breakdown::with_probabilities(&params, &sorted, &flattest.probabilities)
        .net_revenue_margin_percent;
    let flattest_score = (flattest_ev - TARGET_AVG_VALUE).abs()
        + 10.0 * (flattest_margin - TARGET_MARGIN_PERCENT).abs();
    let msg = format!(
        "Winner is no worse than the flattest pyramid: {:.6} <= {:.6}",
        score, flattest_score
    );
    if score <= flattest_score + 1e-9 {
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

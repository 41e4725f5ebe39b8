/// This file contains the pyramid probability optimizer: a bounded,
/// deterministic grid search that fits a strictly decreasing probability
/// distribution over the value-sorted tiers to one or two target metrics.
///
/// The search is a heuristic sweep over a steepness domain, not a general
/// solver; it accepts the first good-enough candidate and otherwise keeps the
/// best one seen.
use crate::logger::{LogEvent, Logger};
use crate::objectives::{convert_optimize_target, ObjectiveTrait, OptimizeTarget};
use crate::params::Parameters;
use crate::tiers::{PriceTier, TierSet};
use crate::utils::VERBOSE_SWEEP;
use crate::{logln, warnln};
use std::sync::atomic::Ordering;

/// Shape prior for pyramid distributions; extended by halving when there are
/// more tiers, truncated when there are fewer
pub const DEFAULT_SEED_WEIGHTS: [f64; 6] = [1.0, 0.5, 0.25, 0.12, 0.06, 0.03];

/// One candidate distribution from the steepness sweep
#[derive(Debug, Clone)]
pub struct PyramidCandidate {
    pub steepness: f64,
    /// Normalized probabilities over the tiers in ascending cost-basis order
    pub probabilities: Vec<f64>,
}

impl PyramidCandidate {
    /// The pyramid gate: probabilities must fall strictly from the cheapest
    /// tier to the priciest one. Vacuously true for a single tier.
    pub fn is_valid_pyramid(&self) -> bool {
        self.probabilities.windows(2).all(|pair| pair[1] < pair[0])
    }
}

/// Lazy iterator over the bounded steepness domain, yielding one normalized
/// candidate per step in ascending steepness order.
///
/// Generation is decoupled from the stopping policy: the driver consumes
/// candidates until a good-enough score or exhaustion, and a caller with very
/// large tier counts can abort between steps to keep latency bounded.
pub struct PyramidSweep {
    seed_weights: Vec<f64>,
    tier_count: usize,
    steepness_start: f64,
    steepness_end: f64,
    steepness_step: f64,
    next_step_index: usize,
}

impl PyramidSweep {
    /// Create a sweep for the given tier count
    ///
    /// # Arguments
    /// * `seed_weights` - Shape prior, adjusted to the tier count by halving
    ///   the last value or truncating
    /// * `tier_count` - Number of tiers being fitted
    /// * `steepness_start`, `steepness_end`, `steepness_step` - The sweep domain
    pub fn new(
        seed_weights: &[f64],
        tier_count: usize,
        steepness_start: f64,
        steepness_end: f64,
        steepness_step: f64,
    ) -> Self {
        let mut weights = seed_weights.to_vec();
        while weights.len() < tier_count {
            let last = *weights.last().expect("seed weights must not be empty");
            weights.push(last * 0.5);
        }
        weights.truncate(tier_count);
        Self {
            seed_weights: weights,
            tier_count,
            steepness_start,
            steepness_end,
            steepness_step,
            next_step_index: 0,
        }
    }
}

impl Iterator for PyramidSweep {
    type Item = PyramidCandidate;

    fn next(&mut self) -> Option<PyramidCandidate> {
        // Steepness is derived from the step index so accumulation error
        // cannot shift the grid between runs
        let steepness = self.steepness_start + self.next_step_index as f64 * self.steepness_step;
        if steepness > self.steepness_end + 1e-9 {
            return None;
        }
        self.next_step_index += 1;

        let n = self.tier_count as f64;
        let weights: Vec<f64> = self
            .seed_weights
            .iter()
            .enumerate()
            .map(|(i, w)| w * (-steepness * i as f64 / n).exp())
            .collect();
        let total_weight: f64 = weights.iter().sum();
        Some(PyramidCandidate {
            steepness,
            probabilities: weights.iter().map(|w| w / total_weight).collect(),
        })
    }
}

/// Outcome of a pyramid fit
#[derive(Debug, Clone)]
pub enum OptimizeOutcome {
    /// Best candidate found; its probabilities were written back to the tiers
    Fitted {
        steepness: f64,
        score: f64,
        /// Probabilities in ascending cost-basis order
        probabilities: Vec<f64>,
        candidates_examined: usize,
        early_exit: bool,
    },
    /// Every candidate failed the pyramid gate; the tier list was left untouched
    NoValidPyramid,
}

/// The pyramid optimizer: sweep configuration plus the fitting driver
pub struct PyramidOptimizer {
    pub seed_weights: Vec<f64>,
    pub steepness_start: f64,
    pub steepness_end: f64,
    pub steepness_step: f64,
    /// The sweep stops at the first candidate scoring below this
    pub early_exit_score: f64,
}

impl Default for PyramidOptimizer {
    fn default() -> Self {
        Self {
            seed_weights: DEFAULT_SEED_WEIGHTS.to_vec(),
            steepness_start: 0.1,
            steepness_end: 5.0,
            steepness_step: 0.05,
            early_exit_score: 0.1,
        }
    }
}

impl PyramidOptimizer {
    /// Fit a pyramid distribution to the given targets and write the winning
    /// probabilities back onto the tier list by id.
    ///
    /// The sweep is fully deterministic: identical inputs produce identical
    /// probability vectors. The tiers' current probabilities do not influence
    /// the search, so running twice with the same targets is idempotent.
    pub fn optimize(
        &self,
        tier_set: &mut TierSet,
        params: &Parameters,
        targets: &[OptimizeTarget],
        logger: &mut Logger,
    ) -> OptimizeOutcome {
        let sorted: Vec<PriceTier> = tier_set.sorted_by_value();
        let objectives: Vec<Box<dyn ObjectiveTrait>> = targets
            .iter()
            .cloned()
            .map(convert_optimize_target)
            .collect();

        for objective in &objectives {
            logln!(
                logger,
                LogEvent::Optimize,
                "Objective: {}",
                objective.objective_string()
            );
        }

        let verbose = VERBOSE_SWEEP.load(Ordering::Relaxed);
        let sweep = PyramidSweep::new(
            &self.seed_weights,
            sorted.len(),
            self.steepness_start,
            self.steepness_end,
            self.steepness_step,
        );

        let mut best: Option<(PyramidCandidate, f64)> = None;
        let mut candidates_examined = 0;
        let mut early_exit = false;

        for candidate in sweep {
            candidates_examined += 1;

            if !candidate.is_valid_pyramid() {
                if verbose {
                    logln!(
                        logger,
                        LogEvent::Candidate,
                        "steepness={:.2} rejected (not strictly decreasing)",
                        candidate.steepness
                    );
                }
                continue;
            }

            let score: f64 = objectives
                .iter()
                .map(|objective| {
                    let actual = objective.actual(&candidate.probabilities, &sorted, params);
                    objective.weight() * (actual - objective.target_value()).abs()
                })
                .sum();

            if verbose {
                logln!(
                    logger,
                    LogEvent::Candidate,
                    "steepness={:.2} score={:.4} probs={:?}",
                    candidate.steepness,
                    score,
                    candidate.probabilities
                );
            }

            // Strict comparison: on a tie the earlier (lower steepness) candidate wins
            let improved = match &best {
                Some((_, best_score)) => score < *best_score,
                None => true,
            };
            if improved {
                best = Some((candidate, score));
            }

            if score < self.early_exit_score {
                early_exit = true;
                break;
            }
        }

        match best {
            None => {
                warnln!(
                    logger,
                    LogEvent::Optimize,
                    "no pyramid-consistent fit found ({} candidates rejected); tiers unchanged",
                    candidates_examined
                );
                OptimizeOutcome::NoValidPyramid
            }
            Some((candidate, score)) => {
                for (tier, &probability) in sorted.iter().zip(candidate.probabilities.iter()) {
                    tier_set.set_probability(tier.id, probability);
                }
                logln!(
                    logger,
                    LogEvent::Optimize,
                    "Fitted pyramid: steepness={:.2} score={:.4} after {} candidates{}",
                    candidate.steepness,
                    score,
                    candidates_examined,
                    if early_exit { " (early exit)" } else { "" }
                );
                OptimizeOutcome::Fitted {
                    steepness: candidate.steepness,
                    score,
                    probabilities: candidate.probabilities,
                    candidates_examined,
                    early_exit,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_tier_setup() -> (Parameters, TierSet) {
        let mut tier_set = TierSet::new();
        tier_set.add("Low", 5.0, 15.0, 0.5, 0.0, 10.0);
        tier_set.add("High", 15.0, 25.0, 0.5, 0.0, 20.0);
        (Parameters::without_transaction_fees(), tier_set)
    }

    #[test]
    fn test_target_ev_two_tiers() {
        let (params, mut tier_set) = two_tier_setup();
        let mut logger = Logger::new();

        let outcome = PyramidOptimizer::default().optimize(
            &mut tier_set,
            &params,
            &[OptimizeTarget::AVG_ITEM_VALUE {
                target_avg_value: 12.0,
            }],
            &mut logger,
        );

        let low = tier_set.tiers[0].probability;
        let high = tier_set.tiers[1].probability;
        assert!(low > high, "cheaper tier must stay more likely");
        assert!((low + high - 1.0).abs() < 1e-9);

        // The sweep crosses EV 12, so the early-exit threshold bounds the miss
        let achieved = low * 10.0 + high * 20.0;
        assert!((achieved - 12.0).abs() < 0.1);
        match outcome {
            OptimizeOutcome::Fitted { early_exit, .. } => assert!(early_exit),
            OptimizeOutcome::NoValidPyramid => panic!("fit expected"),
        }
    }

    #[test]
    fn test_pyramid_invariants_on_default_catalog() {
        let params = Parameters::default();
        let mut tier_set = TierSet::default_catalog();
        let mut logger = Logger::new();

        let outcome = PyramidOptimizer::default().optimize(
            &mut tier_set,
            &params,
            &[OptimizeTarget::AVG_ITEM_VALUE {
                target_avg_value: 80.0,
            }],
            &mut logger,
        );

        let probabilities = match outcome {
            OptimizeOutcome::Fitted { probabilities, .. } => probabilities,
            OptimizeOutcome::NoValidPyramid => panic!("fit expected"),
        };

        assert_eq!(probabilities.len(), 6);
        for pair in probabilities.windows(2) {
            assert!(pair[1] < pair[0], "probabilities must fall strictly");
        }
        let sum: f64 = probabilities.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);

        // Written back by id: catalog order is already ascending by value
        for (tier, &p) in tier_set.tiers.iter().zip(probabilities.iter()) {
            assert_eq!(tier.probability, p);
        }
    }

    #[test]
    fn test_optimize_is_idempotent() {
        let params = Parameters::default();
        let targets = [
            OptimizeTarget::AVG_ITEM_VALUE {
                target_avg_value: 80.0,
            },
            OptimizeTarget::NET_REVENUE_MARGIN {
                target_margin_percent: 5.0,
            },
        ];
        let mut logger = Logger::new();
        let optimizer = PyramidOptimizer::default();

        let mut tier_set = TierSet::default_catalog();
        optimizer.optimize(&mut tier_set, &params, &targets, &mut logger);
        let first: Vec<f64> = tier_set.tiers.iter().map(|t| t.probability).collect();

        optimizer.optimize(&mut tier_set, &params, &targets, &mut logger);
        let second: Vec<f64> = tier_set.tiers.iter().map(|t| t.probability).collect();

        // Deterministic sweep: bitwise identical on a rerun
        assert_eq!(first, second);
    }

    #[test]
    fn test_no_valid_pyramid_leaves_tiers_untouched() {
        // An inverted seed that no steepness in the domain can straighten out:
        // the second weight stays above the first for all s <= 5
        let (params, mut tier_set) = two_tier_setup();
        let before: Vec<f64> = tier_set.tiers.iter().map(|t| t.probability).collect();
        let mut logger = Logger::new();

        let optimizer = PyramidOptimizer {
            seed_weights: vec![0.01, 1.0],
            ..Default::default()
        };
        let outcome = optimizer.optimize(
            &mut tier_set,
            &params,
            &[OptimizeTarget::AVG_ITEM_VALUE {
                target_avg_value: 12.0,
            }],
            &mut logger,
        );

        assert!(matches!(outcome, OptimizeOutcome::NoValidPyramid));
        let after: Vec<f64> = tier_set.tiers.iter().map(|t| t.probability).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_single_tier_is_vacuously_valid() {
        let params = Parameters::without_transaction_fees();
        let mut tier_set = TierSet::new();
        tier_set.add("Only", 0.0, 10.0, 0.7, 0.0, 5.0);
        let mut logger = Logger::new();

        let outcome = PyramidOptimizer::default().optimize(
            &mut tier_set,
            &params,
            &[OptimizeTarget::AVG_ITEM_VALUE {
                target_avg_value: 5.0,
            }],
            &mut logger,
        );

        // A lone tier always normalizes to certainty and hits the target exactly
        match outcome {
            OptimizeOutcome::Fitted { score, early_exit, .. } => {
                assert_eq!(score, 0.0);
                assert!(early_exit);
            }
            OptimizeOutcome::NoValidPyramid => panic!("single tier must fit"),
        }
        assert_eq!(tier_set.tiers[0].probability, 1.0);
    }

    #[test]
    fn test_seed_extension_beyond_six_tiers() {
        let sweep = PyramidSweep::new(&DEFAULT_SEED_WEIGHTS, 8, 0.1, 5.0, 0.05);
        let candidate = sweep.into_iter().next().unwrap();
        assert_eq!(candidate.probabilities.len(), 8);
        assert!(candidate.is_valid_pyramid());
        let sum: f64 = candidate.probabilities.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_sweep_domain_bounds() {
        let candidates: Vec<PyramidCandidate> =
            PyramidSweep::new(&DEFAULT_SEED_WEIGHTS, 6, 0.1, 5.0, 0.05).collect();
        // 0.1 through 5.0 inclusive in 0.05 steps
        assert_eq!(candidates.len(), 99);
        assert!((candidates[0].steepness - 0.1).abs() < 1e-12);
        assert!((candidates.last().unwrap().steepness - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_equal_value_tiers_keep_list_order() {
        let params = Parameters::without_transaction_fees();
        let mut tier_set = TierSet::new();
        tier_set.add("First", 0.0, 10.0, 0.5, 0.0, 10.0);
        tier_set.add("Second", 0.0, 10.0, 0.5, 0.0, 10.0);
        let mut logger = Logger::new();

        let outcome = PyramidOptimizer::default().optimize(
            &mut tier_set,
            &params,
            &[OptimizeTarget::AVG_ITEM_VALUE {
                target_avg_value: 10.0,
            }],
            &mut logger,
        );

        // Ties sort stably, so the first listed tier takes the larger share
        assert!(matches!(outcome, OptimizeOutcome::Fitted { .. }));
        assert!(tier_set.tiers[0].probability > tier_set.tiers[1].probability);
    }
}

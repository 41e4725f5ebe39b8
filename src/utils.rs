use rand_distr::LogNormal;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize};

/// Seed used by scenarios that sample (Monte-Carlo cross-checks).
/// Set per iteration by main so reruns are reproducible.
pub static RAND_SEED: AtomicU64 = AtomicU64::new(42);

/// Total number of scenario runs executed in this process.
pub static TOTAL_SCENARIO_RUNS: AtomicUsize = AtomicUsize::new(0);

/// When set, the optimizer logs every sweep candidate (Candidate event).
pub static VERBOSE_SWEEP: AtomicBool = AtomicBool::new(false);

/// Convert mean and standard deviation to log-normal distribution parameters
/// Returns (μ, σ) for LogNormal(μ, σ) that approximates the given mean and stddev
///
/// For LogNormal(μ, σ):
/// - E[X] = exp(μ + σ²/2)
/// - Var[X] = (exp(σ²) - 1) * exp(2μ + σ²)
///
/// To convert from mean (m) and stddev (s):
/// - σ = sqrt(ln(1 + s²/m²))
/// - μ = ln(m) - σ²/2
fn lognormal_from_mean_stddev(mean: f64, stddev: f64) -> (f64, f64) {
    let variance = stddev * stddev;
    let sigma_squared = (1.0 + variance / (mean * mean)).ln();
    let sigma = sigma_squared.sqrt();
    let mu = mean.ln() - sigma_squared / 2.0;
    (mu, sigma)
}

/// Create a log-normal distribution from mean and standard deviation
/// The mean must be positive
pub fn lognormal_dist(mean: f64, stddev: f64) -> LogNormal<f64> {
    let (mu, sigma) = lognormal_from_mean_stddev(mean, stddev);
    LogNormal::new(mu, sigma).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lognormal_params_degenerate_spread() {
        // Zero spread collapses to a point mass at the mean
        let (mu, sigma) = lognormal_from_mean_stddev(45.72, 0.0);
        assert_eq!(sigma, 0.0);
        assert!((mu - 45.72f64.ln()).abs() < 1e-12);
    }
}

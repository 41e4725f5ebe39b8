/// Chart generation for the pack economics model.
///
/// Writes PNG charts under charts/: the pyramid shape at a few steepness
/// values, and how the cost-basis expected value and the net revenue margin
/// move across the optimizer's steepness domain for the default catalog.
use crate::breakdown::Breakdown;
use crate::optimizer::{PyramidSweep, DEFAULT_SEED_WEIGHTS};
use crate::params::Parameters;
use crate::tiers::TierSet;
use plotters::prelude::*;
use std::fs;

const STEEPNESS_START: f64 = 0.1;
const STEEPNESS_END: f64 = 5.0;
const STEEPNESS_STEP: f64 = 0.05;

/// Main function to generate all charts
pub fn generate_all_charts() -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all("charts")?;

    let params = Parameters::default();
    let tier_set = TierSet::default_catalog();

    generate_pyramid_shape_chart(&tier_set)?;
    generate_sweep_metric_charts(&params, &tier_set)?;

    Ok(())
}

/// Draw the normalized pyramid for a few representative steepness values
fn generate_pyramid_shape_chart(tier_set: &TierSet) -> Result<(), Box<dyn std::error::Error>> {
    let tier_count = tier_set.len();
    let steepness_values = [0.5, 1.5, 3.0];
    let colors = [&BLUE, &RED, &GREEN];

    let root = BitMapBackend::new("charts/pyramid_shapes.png", (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Pyramid shape by steepness", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..(tier_count as f64 - 1.0), 0f64..1f64)?;

    chart
        .configure_mesh()
        .x_desc("tier (ascending cost basis)")
        .y_desc("probability")
        .draw()?;

    for (&steepness, &color) in steepness_values.iter().zip(colors.iter()) {
        // One candidate per chart line: run a single-step sweep at this steepness
        let candidate = PyramidSweep::new(
            &DEFAULT_SEED_WEIGHTS,
            tier_count,
            steepness,
            steepness,
            STEEPNESS_STEP,
        )
        .next()
        .expect("single-step sweep yields one candidate");

        chart
            .draw_series(LineSeries::new(
                candidate
                    .probabilities
                    .iter()
                    .enumerate()
                    .map(|(i, &p)| (i as f64, p)),
                color,
            ))?
            .label(format!("steepness {:.1}", steepness))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart
        .configure_series_labels()
        .border_style(&BLACK)
        .background_style(&WHITE.mix(0.8))
        .draw()?;

    root.present()?;
    println!("Generated charts/pyramid_shapes.png");
    Ok(())
}

/// Draw expected item value (cost basis) and net revenue margin across the
/// whole steepness domain
fn generate_sweep_metric_charts(
    params: &Parameters,
    tier_set: &TierSet,
) -> Result<(), Box<dyn std::error::Error>> {
    let sorted = tier_set.sorted_by_value();

    let mut ev_points = Vec::new();
    let mut margin_points = Vec::new();
    let sweep = PyramidSweep::new(
        &DEFAULT_SEED_WEIGHTS,
        sorted.len(),
        STEEPNESS_START,
        STEEPNESS_END,
        STEEPNESS_STEP,
    );
    for candidate in sweep {
        let ev: f64 = candidate
            .probabilities
            .iter()
            .zip(sorted.iter())
            .map(|(p, tier)| p * tier.avg_value)
            .sum();
        let margin = Breakdown::with_probabilities(params, &sorted, &candidate.probabilities)
            .net_revenue_margin_percent;
        ev_points.push((candidate.steepness, ev));
        margin_points.push((candidate.steepness, margin));
    }

    draw_metric_chart(
        "charts/ev_vs_steepness.png",
        "Expected item value (cost basis) vs steepness",
        "expected value",
        &ev_points,
        &BLUE,
    )?;
    draw_metric_chart(
        "charts/margin_vs_steepness.png",
        "Net revenue margin vs steepness",
        "margin (%)",
        &margin_points,
        &RED,
    )?;

    Ok(())
}

fn draw_metric_chart(
    path: &str,
    caption: &str,
    y_desc: &str,
    points: &[(f64, f64)],
    color: &RGBColor,
) -> Result<(), Box<dyn std::error::Error>> {
    let y_min = points.iter().map(|(_, y)| *y).fold(f64::INFINITY, f64::min);
    let y_max = points
        .iter()
        .map(|(_, y)| *y)
        .fold(f64::NEG_INFINITY, f64::max);
    let padding = ((y_max - y_min) * 0.1).max(1e-6);

    let root = BitMapBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(
            STEEPNESS_START..STEEPNESS_END,
            (y_min - padding)..(y_max + padding),
        )?;

    chart
        .configure_mesh()
        .x_desc("steepness")
        .y_desc(y_desc)
        .draw()?;

    chart.draw_series(LineSeries::new(points.iter().copied(), color))?;

    root.present()?;
    println!("Generated {}", path);
    Ok(())
}

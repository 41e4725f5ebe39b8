mod breakdown;
mod charts;
mod logger;
mod montecarlo;
mod objectives;
mod optimizer;
mod params;
mod scenarios;
mod tiers;
mod utils;

use breakdown::Breakdown;
use logger::{sanitize_filename, ConsoleReceiver, FileReceiver, LogEvent, Logger};
use params::Parameters;
use scenarios::get_scenario_catalog;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tiers::TierSet;
use utils::{RAND_SEED, TOTAL_SCENARIO_RUNS, VERBOSE_SWEEP};

fn main() {
    let raw_args: Vec<String> = std::env::args().collect();

    // Parse and filter out --verbose and --fastbreak arguments
    let mut args = Vec::new();
    let mut skip_next = false;
    let mut fastbreak = false;
    for (i, arg) in raw_args.iter().enumerate() {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg == "--verbose" {
            if i + 1 < raw_args.len() && raw_args[i + 1] == "sweep" {
                VERBOSE_SWEEP.store(true, Ordering::Relaxed);
                skip_next = true;
            }
            continue;
        }
        if arg == "--fastbreak" {
            fastbreak = true;
            continue;
        }
        args.push(arg.clone());
    }

    // Check if "charts" argument is provided
    if args.len() > 1 && args[1] == "charts" {
        match charts::generate_all_charts() {
            Ok(()) => {
                println!("All chart generation completed successfully.");
            }
            Err(e) => {
                eprintln!("Error generating charts: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    // Check if "breakdown" argument is provided: print the full breakdown of
    // the stock configuration to the console
    if args.len() > 1 && args[1] == "breakdown" {
        let params = Parameters::default();
        let tier_set = TierSet::default_catalog();

        let mut logger = Logger::new();
        logger.add_receiver(ConsoleReceiver::new(vec![
            LogEvent::Compute,
            LogEvent::Variant,
        ]));

        let result = Breakdown::new(&params, &tier_set);
        result.printout(&mut logger);
        return;
    }

    if args.len() > 1 {
        let scenario_arg = &args[1];

        // Parse iterations parameter if present
        let iterations = if args.len() > 2 {
            match args[2].parse::<u64>() {
                Ok(n) => n,
                Err(_) => {
                    eprintln!(
                        "Error: Invalid iterations parameter '{}'. Expected a number.",
                        args[2]
                    );
                    std::process::exit(1);
                }
            }
        } else {
            1
        };

        // Parse optional starting iteration index if present
        let start_iteration = if args.len() > 3 {
            match args[3].parse::<u64>() {
                Ok(n) => n,
                Err(_) => {
                    eprintln!(
                        "Error: Invalid start iteration parameter '{}'. Expected a number.",
                        args[3]
                    );
                    std::process::exit(1);
                }
            }
        } else {
            0
        };

        // Get all scenarios from the catalog
        let all_scenarios = get_scenario_catalog();

        // Filter scenarios: if "all", use all scenarios; otherwise filter to the named scenario
        let selected_scenarios: Vec<_> = if scenario_arg == "all" {
            all_scenarios.clone()
        } else {
            let found = all_scenarios.iter().find(|s| s.short_name == scenario_arg);
            match found {
                Some(scenario) => vec![scenario.clone()],
                None => {
                    eprintln!("Error: Scenario '{}' not found.", scenario_arg);
                    eprintln!("Available scenarios:");
                    for s in &all_scenarios {
                        eprintln!("  - {}", s.short_name);
                    }
                    std::process::exit(1);
                }
            }
        };

        // Set up logger with console and validation file receivers.
        // Scenario-level console output is only useful for single runs of a
        // single scenario; anything more drowns the validation summary.
        let mut logger = Logger::new();
        if scenario_arg != "all" && iterations == 1 {
            logger.add_receiver(ConsoleReceiver::new(vec![
                LogEvent::Validation,
                LogEvent::Scenario,
            ]));
        } else {
            logger.add_receiver(ConsoleReceiver::new(vec![LogEvent::Validation]));
        }

        // Add validation receiver (for validation events)
        let summary_receiver_id = logger.add_receiver(FileReceiver::new(
            &PathBuf::from("log/summary.log"),
            vec![LogEvent::Validation],
        ));

        TOTAL_SCENARIO_RUNS.store(0, Ordering::Relaxed);

        if iterations > 1 {
            logln!(
                &mut logger,
                LogEvent::Validation,
                "Running {} {} times...\n",
                if scenario_arg == "all" {
                    "all scenarios".to_string()
                } else {
                    format!("scenario '{}'", scenario_arg)
                },
                iterations
            );
        } else {
            logln!(
                &mut logger,
                LogEvent::Validation,
                "Running {}...\n",
                if scenario_arg == "all" {
                    "all scenarios".to_string()
                } else {
                    format!("scenario '{}'", scenario_arg)
                }
            );
        }

        // Outer loop for scenarios
        'scenarios: for scenario in &selected_scenarios {
            log!(&mut logger, LogEvent::Validation, "{}: ", scenario.short_name);

            // Add scenario-level receiver
            let scenario_receiver_id = logger.add_receiver(FileReceiver::new(
                &PathBuf::from(format!(
                    "log/{}/scenario.log",
                    sanitize_filename(scenario.short_name)
                )),
                vec![LogEvent::Scenario],
            ));

            // Inner loop for iterations
            for i in start_iteration..(start_iteration + iterations) {
                if iterations > 1 {
                    let iteration_num = i - start_iteration + 1;
                    log!(&mut logger, LogEvent::Validation, "[{}/{}] ", iteration_num, iterations);
                }

                // Seed the iteration so sampling scenarios are reproducible
                RAND_SEED.store(i.wrapping_add(42), Ordering::Relaxed);
                TOTAL_SCENARIO_RUNS.fetch_add(1, Ordering::Relaxed);

                match (scenario.run)(scenario.short_name, &mut logger) {
                    Ok(()) => {
                        if iterations > 1 {
                            logln!(&mut logger, LogEvent::Validation, "✓");
                        } else {
                            logln!(&mut logger, LogEvent::Validation, "✓ PASSED");
                        }
                    }
                    Err(e) => {
                        if iterations > 1 {
                            logln!(&mut logger, LogEvent::Validation, "✗");
                        } else {
                            logln!(&mut logger, LogEvent::Validation, "✗ FAILED: {}", e);
                        }

                        // If fastbreak is enabled, stop immediately on first failure
                        if fastbreak {
                            logger.remove_receiver(scenario_receiver_id);
                            logln!(
                                &mut logger,
                                LogEvent::Validation,
                                "\nStopping scenario execution due to failure (--fastbreak enabled)"
                            );
                            if iterations > 1 {
                                let iteration_num = i - start_iteration + 1;
                                logln!(
                                    &mut logger,
                                    LogEvent::Validation,
                                    "Error at iteration {}/{} (seed index {}): {}",
                                    iteration_num,
                                    iterations,
                                    i,
                                    e
                                );
                            } else {
                                logln!(&mut logger, LogEvent::Validation, "Error: {}", e);
                            }
                            break 'scenarios;
                        }
                    }
                }

                // Flush to ensure validation is written to summary.log
                let _ = logger.flush();
            }

            // Remove scenario-level receiver
            logger.remove_receiver(scenario_receiver_id);
        }

        let total_runs = TOTAL_SCENARIO_RUNS.load(Ordering::Relaxed);
        logln!(
            &mut logger,
            LogEvent::Validation,
            "\nTotal scenario runs completed: {}",
            total_runs
        );

        // Remove validation receiver
        logger.remove_receiver(summary_receiver_id);
    } else {
        // Default behavior: run the baseline breakdown scenario with full output
        let mut logger = Logger::new();
        logger.add_receiver(ConsoleReceiver::new(vec![
            LogEvent::Compute,
            LogEvent::Optimize,
            LogEvent::Variant,
            LogEvent::Scenario,
        ]));
        if let Err(e) = scenarios::baseline_breakdown::run("baseline_breakdown", &mut logger) {
            eprintln!("Error running scenario: {}", e);
            std::process::exit(1);
        }
    }
}

//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads observed case data (remote or local)
//! - runs the piecewise fit / grid sweep / forward simulation
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;

use crate::cli::{Command, FitArgs, PlotArgs, SimArgs, SweepArgs};
use crate::domain::{CompartmentState, FitConfig, RateParams};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `sirfit` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Sweep(args) => handle_sweep(args),
        Command::Simulate(args) => handle_simulate(args),
        Command::Plot(args) => handle_plot(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = args.to_config();
    let run = pipeline::run_fit(&config)?;

    println!(
        "{}",
        crate::report::format_fit_summary(&run.observed, &run.outcome, &run.annotations, &config)
    );

    if config.plot {
        let plot = crate::plot::render_fit_plot(
            &run.observed,
            &run.outcome.fitted,
            &run.annotations,
            config.plot_width,
            config.plot_height,
        );
        println!("{plot}");
    }

    // Optional exports.
    if let Some(path) = &config.export_results {
        crate::io::write_results_csv(path, &run.residuals)?;
    }
    if let Some(path) = &config.export_model {
        crate::io::write_model_json(path, &run.outcome, &config)?;
    }

    Ok(())
}

fn handle_sweep(args: SweepArgs) -> Result<(), AppError> {
    let config = args.fit.to_config();
    let sweep = args.to_sweep_config();

    let observed = pipeline::load_observed(&config)?;
    let outcome = crate::fit::run_sweep(&observed, &config, &sweep)?;

    println!("{}", crate::report::format_sweep_summary(&outcome, &sweep));

    // Refit with the winning cell so the usual fit report follows the sweep.
    let mut best_config = config.clone();
    best_config.post_regime = outcome.best.params;
    let run = pipeline::run_fit_with_observed(&best_config, observed)?;

    println!(
        "{}",
        crate::report::format_fit_summary(&run.observed, &run.outcome, &run.annotations, &best_config)
    );

    if best_config.plot {
        let plot = crate::plot::render_fit_plot(
            &run.observed,
            &run.outcome.fitted,
            &run.annotations,
            best_config.plot_width,
            best_config.plot_height,
        );
        println!("{plot}");
    }

    if let Some(path) = &best_config.export_results {
        crate::io::write_results_csv(path, &run.residuals)?;
    }
    if let Some(path) = &best_config.export_model {
        crate::io::write_model_json(path, &run.outcome, &best_config)?;
    }

    Ok(())
}

fn handle_simulate(args: SimArgs) -> Result<(), AppError> {
    let params = RateParams::new(args.k1, args.k2);
    let initial = CompartmentState::new(
        args.population - args.seed_infected,
        args.seed_infected,
        0.0,
    );
    let traj = crate::models::integrate(params, initial, args.horizon)?;

    let config = sim_config(&args);
    println!("{}", crate::report::format_simulation_summary(&traj, &config));

    if args.plot {
        let plot = crate::plot::render_curve_plot(&traj.infected(), args.width, args.height);
        println!("{plot}");
    }
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let model = crate::io::read_model_json(&args.model)?;
    let plot = crate::plot::render_model_plot(&model, args.width, args.height);
    println!("{plot}");
    Ok(())
}

/// A minimal run configuration for simulation-only reporting.
fn sim_config(args: &SimArgs) -> FitConfig {
    FitConfig {
        state: String::new(),
        population: args.population,
        data_url: String::new(),
        data_file: None,
        annotations: None,
        switch_day: 0,
        initial_regime: RateParams::new(args.k1, args.k2),
        post_regime: RateParams::new(args.k1, args.k2),
        seed_infected: args.seed_infected,
        horizon_days: args.horizon,
        plot: false,
        plot_width: 0,
        plot_height: 0,
        export_results: None,
        export_model: None,
    }
}

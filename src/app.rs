//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - sets up logging
//! - turns flags into a [`RunConfig`] and dispatches the subcommand

use std::path::PathBuf;

use clap::Parser;
use log::info;

use crate::cli::{Cli, Command, FitArgs, GenerateArgs, InputArgs, PlotArgs};
use crate::domain::{DiffusionParams, ResultTable, RunConfig};
use crate::error::{AppError, EXIT_PAIR_FAILED};
use crate::fit::LmOptions;
use crate::io::ingest::normalize_label;

pub mod pipeline;

/// Entry point for the `dfit` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env is fine; flags and the real environment still apply.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Plot(args) => handle_plot(args),
        Command::Generate(args) => handle_generate(args),
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    // Tests and embedders may have installed a logger already.
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .try_init();
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args)?;
    let run = pipeline::run_fit(&config)?;

    // Results are written even when some pairs failed.
    write_outputs(&config, &run)?;

    if !args.quiet {
        println!("{}", crate::report::format_run_summary(&run, &config));
    }

    strict_outcome(&config, &run.table)
}

/// Write the results CSV and, when configured, the run JSON.
pub fn write_outputs(config: &RunConfig, run: &pipeline::RunOutput) -> Result<(), AppError> {
    crate::io::export::write_results_csv(&config.output_path, &run.table)?;
    if let Some(path) = &config.export_json {
        crate::io::export::write_run_json(
            path,
            config,
            &run.table,
            &run.profiles.row_errors,
            &run.ranges.row_errors,
        )?;
    }
    Ok(())
}

/// Exit status of a finished run: under `--strict` any failed pair is exit 4.
pub fn strict_outcome(config: &RunConfig, table: &ResultTable) -> Result<(), AppError> {
    let failed = table.failed();
    if config.strict && failed > 0 {
        return Err(AppError::new(
            EXIT_PAIR_FAILED,
            format!("{failed} of {} pair(s) failed (--strict)", table.len()),
        ));
    }
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let mut config = config_from_input(&args.input, PathBuf::new(), None, false)?;
    let label = normalize_label(&args.expt);
    let oxide = args.oxide.trim().to_string();
    config.experiments = vec![label.clone()];
    config.oxides = vec![oxide.clone()];

    let view = pipeline::run_pair(&config, &label, &oxide)?;
    let params = view.result.outcome.as_ref().ok().map(|fit| fit.params);

    println!("Experiment {label}, {oxide}");
    match &view.result.outcome {
        Ok(fit) => println!(
            "slope = {:.6}  c0 = {:.4}  (n = {}, RMSE = {:.4})",
            fit.params.slope, fit.params.c0, fit.quality.n, fit.quality.rmse
        ),
        Err(e) => println!("no fit: {e}"),
    }
    println!(
        "{}",
        crate::plot::render_profile_plot(&view.series, params.as_ref(), args.width, args.height)
    );
    Ok(())
}

fn handle_generate(args: GenerateArgs) -> Result<(), AppError> {
    let spec = crate::data::SampleSpec {
        experiments: normalize_list(&args.experiments, true, "experiment")?,
        oxides: normalize_list(&args.oxides, false, "oxide")?,
        expt_prefix: args.expt_prefix.clone(),
        params: DiffusionParams {
            slope: args.slope,
            c0: args.c0,
        },
        x_min: args.x_min,
        x_max: args.x_max,
        points: args.points,
        noise: args.noise,
        seed: args.seed,
    };
    let sample = crate::data::generate_sample(&spec)?;

    crate::io::export::write_profiles_csv(&args.profiles, &sample.oxides, &sample.rows)?;
    crate::io::export::write_ranges_csv(&args.ranges, &sample.ranges)?;
    info!(
        "wrote {} profile row(s) to '{}' and {} range record(s) to '{}'",
        sample.rows.len(),
        args.profiles.display(),
        sample.ranges.len(),
        args.ranges.display()
    );
    Ok(())
}

/// Build the run configuration for `dfit fit`.
pub fn run_config_from_args(args: &FitArgs) -> Result<RunConfig, AppError> {
    config_from_input(&args.input, args.output.clone(), args.export_json.clone(), args.strict)
}

fn config_from_input(
    input: &InputArgs,
    output_path: PathBuf,
    export_json: Option<PathBuf>,
    strict: bool,
) -> Result<RunConfig, AppError> {
    if input.max_evaluations == Some(0) {
        return Err(AppError::input("--max-evaluations must be >= 1."));
    }

    Ok(RunConfig {
        profiles_path: input.profiles.clone(),
        ranges_path: input.ranges.clone(),
        output_path,
        export_json,
        experiments: normalize_list(&input.experiments, true, "experiment")?,
        oxides: normalize_list(&input.oxides, false, "oxide")?,
        expt_prefix: input.expt_prefix.trim().to_string(),
        fallback: !input.no_fallback,
        strict,
        lm: LmOptions {
            max_evaluations: input.max_evaluations,
            ..LmOptions::default()
        },
    })
}

/// Trim entries, drop blanks and duplicates, and optionally normalize labels.
fn normalize_list(items: &[String], labels: bool, what: &str) -> Result<Vec<String>, AppError> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let item = if labels { normalize_label(item) } else { item.trim().to_string() };
        if !item.is_empty() && !out.contains(&item) {
            out.push(item);
        }
    }
    if out.is_empty() {
        return Err(AppError::input(format!("At least one {what} must be configured.")));
    }
    Ok(out)
}

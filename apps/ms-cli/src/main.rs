use clap::{Parser, Subcommand};
use ms_app::{
    AppError, AppResult, RunProgressEvent, RunRequest, project_service, run_service,
    runtime_compile,
};
use ms_sizing::SizingOutcome;
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "sizing.yaml";

#[derive(Parser)]
#[command(name = "ms-cli")]
#[command(
    about = "Multistage vehicle sizing: propellant split for minimum lift-off mass",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct ConfigArgs {
    /// Path to the sizing configuration (YAML, or JSON by extension)
    #[arg(default_value = DEFAULT_CONFIG)]
    config: PathBuf,
    /// Override a setting, e.g. --set stages.2.isp_vac_s=330
    #[arg(long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate configuration syntax and ranges
    Validate {
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Find the propellant split minimizing lift-off mass
    Optimize {
        #[command(flatten)]
        config: ConfigArgs,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve the vehicle at a given propellant split
    Evaluate {
        #[command(flatten)]
        config: ConfigArgs,
        /// Propellant per stage in kg, bottom stage first
        #[arg(long, value_delimiter = ',', required = true)]
        propellant: Vec<f64>,
        #[arg(long)]
        json: bool,
    },
    /// Total delta-v over a payload range at a fixed propellant split
    SweepPayload {
        #[command(flatten)]
        config: ConfigArgs,
        #[arg(long, value_delimiter = ',', required = true)]
        propellant: Vec<f64>,
        /// Lightest payload in kg
        #[arg(long, default_value_t = 0.0)]
        from: f64,
        /// Heaviest payload in kg
        #[arg(long)]
        to: f64,
        #[arg(long, default_value_t = 11)]
        steps: usize,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config } => cmd_validate(&config),
        Commands::Optimize { config, json } => cmd_optimize(&config, json),
        Commands::Evaluate {
            config,
            propellant,
            json,
        } => cmd_evaluate(&config, &propellant, json),
        Commands::SweepPayload {
            config,
            propellant,
            from,
            to,
            steps,
            json,
        } => cmd_sweep_payload(&config, &propellant, from, to, steps, json),
    }
}

fn cmd_validate(args: &ConfigArgs) -> AppResult<()> {
    println!("Validating configuration: {}", args.config.display());
    let overrides = project_service::parse_overrides(&args.overrides)?;
    let project = project_service::load_project(&args.config, &overrides)?;
    let summary = project_service::summarize(&project);
    println!("✓ Configuration is valid");
    println!(
        "  {}: {} stages, payload {:.1} kg, target {:.3} km/s, {} constraints",
        summary.name,
        summary.stage_count,
        summary.payload_kg,
        summary.target_delta_v_km_s,
        summary.constraint_count
    );
    Ok(())
}

fn cmd_optimize(args: &ConfigArgs, json: bool) -> AppResult<()> {
    let request = RunRequest {
        config_path: &args.config,
        overrides: project_service::parse_overrides(&args.overrides)?,
    };

    let mut last_emit = Instant::now();
    let response = run_service::run_optimize_with_progress(
        &request,
        Some(&mut |event| {
            if json {
                return;
            }
            let stage_change = event.iteration.is_none();
            if stage_change || last_emit.elapsed().as_millis() >= 100 {
                render_cli_progress(&event);
                last_emit = Instant::now();
            }
        }),
    )?;
    if !json {
        clear_progress_line();
    }

    if json {
        return print_json(&response);
    }

    match &response.outcome {
        SizingOutcome::Converged(solution) => {
            println!(
                "✓ Converged in {} iterations: {}",
                solution.iterations, response.summary.name
            );
            println!("  Propellant: {}", format_kg(&solution.propellant_kg));
            println!(
                "  Lift-off mass: {:.1} kg",
                solution.snapshot.initial_mass_kg()
            );
            print_constraints(&solution.constraints);
        }
        SizingOutcome::Failed(failure) => {
            println!(
                "✗ Optimizer stopped after {} iterations ({:?}): {}",
                failure.iterations, failure.reason, failure.message
            );
            println!("  Last iterate: {}", format_kg(&failure.propellant_kg));
            println!(
                "  Delta-v residual: {:+.3} m/s",
                failure.delta_v_residual_mps
            );
            print_constraints(&failure.constraints);
        }
    }

    if let Some(report) = &response.report {
        println!("\n{report}");
    }
    print_timing_summary(&response.timing);

    if !response.outcome.is_converged() {
        warn!(config = %args.config.display(), "optimize finished without a feasible optimum");
        return Err(AppError::Sizing(
            "no feasible optimum found; see the diagnostics above".to_string(),
        ));
    }
    Ok(())
}

fn cmd_evaluate(args: &ConfigArgs, propellant: &[f64], json: bool) -> AppResult<()> {
    let runtime = load_runtime(args)?;
    let response = run_service::evaluate(&runtime, propellant)?;
    if json {
        return print_json(&response);
    }

    println!("{}", response.report);
    println!(
        "\nLift-off mass: {:.1} kg, delta-v residual {:+.3} m/s",
        response.snapshot.initial_mass_kg(),
        response.delta_v_residual_mps
    );
    print_constraints(&response.constraints);
    Ok(())
}

fn cmd_sweep_payload(
    args: &ConfigArgs,
    propellant: &[f64],
    from: f64,
    to: f64,
    steps: usize,
    json: bool,
) -> AppResult<()> {
    let runtime = load_runtime(args)?;
    let response = run_service::sweep_payload(&runtime, propellant, from, to, steps)?;
    if json {
        return print_json(&response);
    }

    println!("payload_kg,delta_v_mps");
    for point in &response.points {
        println!("{},{}", point.payload_kg, point.delta_v_mps);
    }
    match response.max_payload_kg {
        Some(max) => println!(
            "\nMax payload for {:.1} m/s: {:.1} kg",
            runtime.vehicle.target_delta_v_mps(),
            max
        ),
        None => println!("\nTarget delta-v is out of reach even without payload"),
    }
    Ok(())
}

fn load_runtime(args: &ConfigArgs) -> AppResult<runtime_compile::SizingRuntime> {
    let overrides = project_service::parse_overrides(&args.overrides)?;
    debug!(
        config = %args.config.display(),
        overrides = overrides.len(),
        "loading runtime"
    );
    let project = project_service::load_project(&args.config, &overrides)?;
    runtime_compile::compile_project(&project)
}

fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::InvalidInput(format!("cannot serialize result: {e}")))?;
    println!("{text}");
    Ok(())
}

fn print_constraints(values: &[ms_sizing::ConstraintValue]) {
    if values.is_empty() {
        return;
    }
    println!("  Constraints:");
    for c in values {
        let mark = if c.is_satisfied(1e-6) { "ok" } else { "VIOLATED" };
        println!("    {}: margin {:+.4} [{}]", c.spec, c.value, mark);
    }
}

fn format_kg(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| format!("{v:.1}"))
        .collect::<Vec<_>>()
        .join(", ")
        + " kg"
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(100));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    let mut line = format!(
        "\r{}  elapsed={:.2}s",
        event.stage.label(),
        event.elapsed_wall_s
    );
    if let Some(p) = &event.iteration {
        line.push_str(&format!(
            "  iter={}  mass={:.1}  violation={:.3e}",
            p.iteration, p.objective, p.max_violation
        ));
    }
    if let Some(msg) = &event.message {
        line.push_str(&format!("  {msg}"));
    }
    print!("{line}");
    let _ = io::stdout().flush();
}

fn print_timing_summary(timing: &ms_app::RunTimingSummary) {
    println!("\nTiming summary:");
    println!("  Load:    {:.3}s", timing.load_time_s);
    println!("  Compile: {:.3}s", timing.compile_time_s);
    println!("  Solve:   {:.3}s", timing.solve_time_s);
    println!("  Total:   {:.3}s", timing.total_time_s);
}

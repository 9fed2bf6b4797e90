//! CLI command implementations

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use backhaul_core::{
    DEFAULT_SWEEP_POLICIES, EvictionPolicy, SimulationParameters, SweepParameter, SweepPlan,
    SweepPoint, run_sweep, run_with_report,
};
use clap::{Args, Subcommand};
use tracing::info;

/// Sample runs compare policies over a shorter horizon than a single
/// parameter-testing run does.
const SWEEP_DEFAULT_HORIZON: f64 = 500.0;

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run a single simulation and print its report
    Run {
        /// Cache eviction policy under test
        #[arg(short, long, value_enum, default_value_t = EvictionPolicy::Fifo)]
        policy: EvictionPolicy,

        /// JSON file of simulation parameters (flags override its values)
        #[arg(long)]
        params: Option<PathBuf>,

        #[command(flatten)]
        overrides: ParameterOverrides,

        /// Print the report as JSON instead of a text summary
        #[arg(long)]
        json: bool,
    },
    /// Sweep one parameter and write a CSV latency table, one row per
    /// value and one column per policy
    Sweep {
        /// Parameter to sweep
        #[arg(short = 'P', long, value_enum)]
        parameter: SweepParameter,

        /// First swept value
        #[arg(long)]
        start: f64,

        /// Increment between consecutive values
        #[arg(long)]
        step: f64,

        /// Number of values to visit
        #[arg(long, default_value_t = 20)]
        steps: u32,

        /// Output CSV path
        #[arg(short, long, default_value = "sweep.csv")]
        output: PathBuf,

        /// JSON file of base parameters (flags override its values)
        #[arg(long)]
        params: Option<PathBuf>,

        #[command(flatten)]
        overrides: ParameterOverrides,
    },
}

/// Per-flag overrides for the recognized simulation options.
#[derive(Args)]
pub struct ParameterOverrides {
    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,
    /// Mean file requests per second
    #[arg(long)]
    arrival_rate: Option<f64>,
    /// Shared inbound access-link bandwidth in MB/s
    #[arg(long)]
    inbound_bandwidth: Option<f64>,
    /// Institution network bandwidth in MB/s
    #[arg(long)]
    network_bandwidth: Option<f64>,
    /// Pareto shape of the file-size distribution
    #[arg(long)]
    file_size_shape: Option<f64>,
    /// Cache storage capacity in MB
    #[arg(long)]
    cache_capacity: Option<f64>,
    /// Mean propagation delay in seconds
    #[arg(long)]
    delay_mean: Option<f64>,
    /// Propagation delay standard deviation in seconds
    #[arg(long)]
    delay_stddev: Option<f64>,
    /// Simulated run length in seconds
    #[arg(long)]
    horizon: Option<f64>,
    /// Number of files hosted by the origin servers
    #[arg(long)]
    file_population: Option<u32>,
}

impl ParameterOverrides {
    fn apply(&self, params: &mut SimulationParameters) {
        if let Some(value) = self.seed {
            params.seed = Some(value);
        }
        if let Some(value) = self.arrival_rate {
            params.arrival_rate = value;
        }
        if let Some(value) = self.inbound_bandwidth {
            params.inbound_bandwidth = value;
        }
        if let Some(value) = self.network_bandwidth {
            params.network_bandwidth = value;
        }
        if let Some(value) = self.file_size_shape {
            params.file_size_shape = value;
        }
        if let Some(value) = self.cache_capacity {
            params.cache_capacity = value;
        }
        if let Some(value) = self.delay_mean {
            params.delay_mean = value;
        }
        if let Some(value) = self.delay_stddev {
            params.delay_stddev = value;
        }
        if let Some(value) = self.horizon {
            params.horizon = value;
        }
        if let Some(value) = self.file_population {
            params.file_population = value;
        }
    }
}

/// Handle the CLI command
///
/// # Errors
/// Returns appropriate error based on the command that fails
pub fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Run {
            policy,
            params,
            overrides,
            json,
        } => run_once(policy, params.as_deref(), &overrides, json),
        Commands::Sweep {
            parameter,
            start,
            step,
            steps,
            output,
            params,
            overrides,
        } => {
            let plan = SweepPlan {
                parameter,
                start,
                step,
                steps,
            };
            sweep_to_csv(&plan, &output, params.as_deref(), &overrides)
        }
    }
}

/// Run a single simulation and print its report.
fn run_once(
    policy: EvictionPolicy,
    params_file: Option<&Path>,
    overrides: &ParameterOverrides,
    json: bool,
) -> anyhow::Result<()> {
    let params = load_parameters(params_file, overrides)?;

    let report = run_with_report(policy, &params)
        .with_context(|| format!("simulation run failed under policy {policy}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.summary());
    }

    Ok(())
}

/// Run a parameter sweep and write the latency table as CSV.
fn sweep_to_csv(
    plan: &SweepPlan,
    output: &Path,
    params_file: Option<&Path>,
    overrides: &ParameterOverrides,
) -> anyhow::Result<()> {
    let mut params = load_parameters(params_file, overrides)?;
    if overrides.horizon.is_none() && params_file.is_none() {
        params.horizon = SWEEP_DEFAULT_HORIZON;
    }

    info!(
        parameter = %plan.parameter,
        start = plan.start,
        step = plan.step,
        steps = plan.steps,
        "starting parameter sweep"
    );

    let points = run_sweep(&params, plan, &DEFAULT_SWEEP_POLICIES)
        .with_context(|| format!("sweep over {} failed", plan.parameter))?;

    let csv = format_csv(plan.parameter, &DEFAULT_SWEEP_POLICIES, &points);
    fs::write(output, csv)
        .with_context(|| format!("failed to write CSV to {}", output.display()))?;

    println!(
        "Wrote {} rows x {} policies to {}",
        points.len(),
        DEFAULT_SWEEP_POLICIES.len(),
        output.display()
    );

    Ok(())
}

/// Formats sweep results as CSV: one row per swept value, one mean-latency
/// column per policy.
fn format_csv(
    parameter: SweepParameter,
    policies: &[EvictionPolicy],
    points: &[SweepPoint],
) -> String {
    let mut csv = String::new();

    let mut header = parameter.as_str().to_string();
    for policy in policies {
        header.push(',');
        header.push_str(&policy.as_str().replace('-', "_"));
    }
    let _ = writeln!(csv, "{header}");

    for point in points {
        let _ = write!(csv, "{}", point.value);
        for (_, mean) in &point.results {
            let _ = write!(csv, ",{mean}");
        }
        let _ = writeln!(csv);
    }

    csv
}

/// Loads base parameters from a JSON file (or defaults) and applies flag
/// overrides, validating the result before any run starts.
fn load_parameters(
    params_file: Option<&Path>,
    overrides: &ParameterOverrides,
) -> anyhow::Result<SimulationParameters> {
    let mut params = match params_file {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read parameters from {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("invalid parameter file {}", path.display()))?
        }
        None => SimulationParameters::default(),
    };

    overrides.apply(&mut params);
    params.validate().context("invalid simulation parameters")?;

    Ok(params)
}

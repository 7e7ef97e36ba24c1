use std::fs::File;
use std::io::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use shopsched::error::{Result, ShopSchedError};
use shopsched::framework::{AlgorithmFormatter, Parameters, Timer, Verbosity};
use shopsched::instance::readers;
use shopsched::milp::{self, GoodLpBackend, MilpBackend};
use shopsched::pfss::{beam_search, local_search};
use shopsched::solution::{json as solution_json, SolutionBuilder};
use shopsched::Instance;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum InputFormat {
    FlowShop,
    Vallada2008,
    JobShop,
    FlexibleJobShop,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Algorithm {
    TreeSearchPfssMakespan,
    TreeSearchPfssTft,
    MilpPositional,
    MilpDisjunctive,
    ConstraintProgrammingOptalcp,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum SolverName {
    Cbc,
    Highs,
    Xpress,
}

impl SolverName {
    fn label(self) -> &'static str {
        match self {
            SolverName::Cbc => "good_lp/cbc",
            SolverName::Highs => "good_lp/highs",
            SolverName::Xpress => "good_lp/xpress",
        }
    }
}

/// Shop-scheduling solver: PFSS iterated local search, bidirectional beam
/// search, and disjunctive/positional MILP model construction.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the instance file, or "-" for stdin.
    #[arg(long)]
    input: String,

    /// Format of the input instance.
    #[arg(long, value_enum)]
    format: InputFormat,

    /// Algorithm to run.
    #[arg(long, value_enum)]
    algorithm: Algorithm,

    /// Where to write the Output JSON (§6), or "-" for stdout.
    #[arg(long)]
    output: Option<String>,

    /// Where to write the solution certificate (Solution JSON, §6).
    #[arg(long)]
    certificate: Option<String>,

    /// Log file; defaults to stderr via `env_logger` when unset.
    #[arg(long)]
    log: Option<String>,

    /// Wall-clock time limit in seconds.
    #[arg(long)]
    time_limit: Option<f64>,

    /// RNG seed for the PFSS algorithms.
    #[arg(long)]
    seed: Option<u64>,

    /// 0 = quiet, 1 = normal, 2 = verbose.
    #[arg(long, default_value_t = 1)]
    verbosity_level: u8,

    /// Suppress intermediary solution/bound output; write only the final result.
    #[arg(long, default_value_t = false)]
    only_write_at_the_end: bool,

    /// MILP solver engine (only used by the milp-* algorithms).
    #[arg(long, value_enum, default_value_t = SolverName::Highs)]
    solver: SolverName,
}

fn verbosity_from_level(level: u8) -> Verbosity {
    match level {
        0 => Verbosity::Quiet,
        1 => Verbosity::Normal,
        _ => Verbosity::Verbose,
    }
}

fn read_instance(cli: &Cli) -> Result<Instance> {
    let reader: Box<dyn std::io::Read> = if cli.input == "-" {
        Box::new(std::io::stdin())
    } else {
        Box::new(File::open(&cli.input).map_err(|e| {
            ShopSchedError::invalid_input(format!("failed to open '{}': {e}", cli.input))
        })?)
    };
    match cli.format {
        InputFormat::FlowShop => readers::read_flow_shop(reader),
        InputFormat::Vallada2008 => readers::read_vallada2008_flow_shop(reader),
        InputFormat::JobShop => readers::read_job_shop(reader),
        InputFormat::FlexibleJobShop => readers::read_flexible_job_shop(reader),
        InputFormat::Json => readers::read_json(reader),
    }
}

fn write_output(path: &Option<String>, content: &str) -> Result<()> {
    match path {
        None => Ok(()),
        Some(p) if p == "-" => {
            println!("{content}");
            Ok(())
        }
        Some(p) => {
            let mut file = File::create(p)
                .map_err(|e| ShopSchedError::invalid_input(format!("failed to create '{p}': {e}")))?;
            file.write_all(content.as_bytes())
                .map_err(|e| ShopSchedError::invalid_input(format!("failed to write '{p}': {e}")))
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let instance = read_instance(cli)?;
    let time_limit = cli.time_limit.map(Duration::from_secs_f64);
    let timer = Timer::new(time_limit);
    let verbosity = if cli.only_write_at_the_end {
        Verbosity::Quiet
    } else {
        verbosity_from_level(cli.verbosity_level)
    };
    let parameters = Parameters {
        algorithm: format!("{:?}", cli.algorithm),
        time_limit_secs: cli.time_limit,
        seed: cli.seed,
    };
    let mut formatter = AlgorithmFormatter::new(timer.clone(), verbosity, parameters);
    formatter.start();

    let seed = cli.seed.unwrap_or_else(|| rand::rng().random());
    let mut rng = StdRng::seed_from_u64(seed);

    match cli.algorithm {
        Algorithm::TreeSearchPfssMakespan => {
            if !instance.is_pfss() {
                return Err(ShopSchedError::invalid_config(
                    "tree-search-pfss-makespan requires a non-flexible permutation flow shop",
                ));
            }
            let ils_params = local_search::IlsParameters::default();
            let permutation =
                local_search::solve(&instance, &timer, &mut formatter, &ils_params, None, &mut rng);
            let beam_params = beam_search::BeamSearchParameters::default();
            if let Some(beam_permutation) =
                beam_search::solve(&instance, &timer, &mut formatter, &beam_params, &mut rng)
            {
                record_permutation(&instance, &mut formatter, &beam_permutation, "beam:final");
            }
            record_permutation(&instance, &mut formatter, &permutation, "ils:final");
        }
        Algorithm::TreeSearchPfssTft => {
            if !instance.is_pfss() {
                return Err(ShopSchedError::invalid_config(
                    "tree-search-pfss-tft requires a non-flexible permutation flow shop",
                ));
            }
            let width = local_search::IlsParameters::default().min_size;
            if let Some(permutation) =
                beam_search::solve_total_flow_time(&instance, &timer, &mut formatter, width)
            {
                record_permutation(&instance, &mut formatter, &permutation, "beam-tft:final");
            }
        }
        Algorithm::MilpPositional => {
            let model = milp::positional::build(&instance)?;
            solve_milp(&model, cli, &timer)?;
        }
        Algorithm::MilpDisjunctive => {
            let model = milp::disjunctive::build(&instance);
            solve_milp(&model, cli, &timer)?;
        }
        Algorithm::ConstraintProgrammingOptalcp => {
            return Err(ShopSchedError::invalid_config(
                "constraint-programming-optalcp is a process-exec boundary outside this core's scope",
            ));
        }
    }

    let intermediary_outputs = formatter.end();
    let output = formatter.output();
    let output_json = build_output_json(&parameters_echo(cli), intermediary_outputs, output);
    write_output(&cli.output, &output_json)?;

    if let (Some(path), Some(solution)) = (&cli.certificate, &output.solution) {
        let certificate = solution_json::write_json(solution)?;
        write_output(&Some(path.clone()), &certificate)?;
    }

    Ok(())
}

fn parameters_echo(cli: &Cli) -> Parameters {
    Parameters {
        algorithm: format!("{:?}", cli.algorithm),
        time_limit_secs: cli.time_limit,
        seed: cli.seed,
    }
}

fn record_permutation(
    instance: &Instance,
    formatter: &mut AlgorithmFormatter<'_, '_>,
    permutation: &[usize],
    label: &str,
) {
    let mut builder = SolutionBuilder::new(instance);
    if builder.from_permutation(permutation).is_ok() {
        if let Ok(solution) = builder.build() {
            formatter.update_solution(solution, label);
        }
    }
}

fn solve_milp(model: &milp::MilpModel, cli: &Cli, timer: &Timer) -> Result<()> {
    let mut backend = GoodLpBackend::new(cli.solver.label());
    if let Some(limit) = timer.remaining_time() {
        backend.set_time_limit(limit.as_secs_f64());
    }
    backend.load(model)?;
    backend.solve()
}

fn build_output_json(
    parameters: &Parameters,
    intermediary_outputs: &[shopsched::framework::IntermediaryOutput],
    output: &shopsched::framework::Output<'_>,
) -> String {
    #[derive(serde::Serialize)]
    struct OutputJson<'a> {
        #[serde(rename = "Parameters")]
        parameters: &'a Parameters,
        #[serde(rename = "IntermediaryOutputs")]
        intermediary_outputs: &'a [shopsched::framework::IntermediaryOutput],
        #[serde(rename = "Output")]
        output: FinalOutput,
    }

    #[derive(serde::Serialize)]
    struct FinalOutput {
        #[serde(rename = "Time")]
        time_secs: f64,
        #[serde(rename = "Bound")]
        bound: Option<i64>,
        #[serde(rename = "Feasible")]
        feasible: bool,
    }

    let json = OutputJson {
        parameters,
        intermediary_outputs,
        output: FinalOutput {
            time_secs: output.elapsed.as_secs_f64(),
            bound: output.bound,
            feasible: output.solution.as_ref().is_some_and(|s| s.feasible()),
        },
    };
    serde_json::to_string_pretty(&json).unwrap_or_else(|_| "{}".to_string())
}

fn main() {
    let cli = Cli::parse();

    if let Some(log_path) = &cli.log {
        match File::create(log_path) {
            Ok(file) => {
                env_logger::Builder::from_default_env()
                    .target(env_logger::Target::Pipe(Box::new(file)))
                    .init();
            }
            Err(e) => {
                eprintln!("failed to open log file '{log_path}': {e}");
                std::process::exit(1);
            }
        }
    } else {
        env_logger::init();
    }

    if let Err(e) = run(&cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

mod checker;
mod parsers;
mod result;

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Stdio;

use clap::ArgAction;
use clap::Parser;
use gourd_solver::engine::variables::PropositionalVariable;
use gourd_solver::engine::SatisfactionSolver;
use gourd_solver::engine::SolverExecutionFlag;
use gourd_solver::engine::SolverOptions;
use gourd_solver::signal_handling::signal_handler;
use gourd_solver::statistics::configure_statistic_logging;
use log::debug;
use log::error;
use log::info;
use log::warn;
use log::LevelFilter;

use crate::parsers::dimacs::parse_cnf;
use crate::parsers::dimacs::SolverDimacsSink;
use crate::result::GourdError;
use crate::result::GourdResult;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The DIMACS CNF instance to solve; '-' or no value reads from standard input. Files
    /// ending in '.gz', '.bz2' or '.xz' are decompressed through an external decompressor.
    instance_path: Option<PathBuf>,

    /// The output path for the DRAT proof of unsatisfiability; '-' writes the proof to
    /// standard output. By default no proof is produced.
    proof_path: Option<PathBuf>,

    /// The target alpha of the fast learned-glue moving average.
    #[arg(long = "ema-glue-fast", default_value_t = 3e-2)]
    ema_glue_fast: f64,

    /// The target alpha of the slow learned-glue moving average.
    #[arg(long = "ema-glue-slow", default_value_t = 1e-5)]
    ema_glue_slow: f64,

    /// The target alpha of the backjump-level moving average.
    #[arg(long = "ema-jump", default_value_t = 1e-6)]
    ema_jump: f64,

    /// The target alpha of the resolved glue and size moving averages.
    #[arg(long = "ema-resolved", default_value_t = 1e-6)]
    ema_resolved: f64,

    /// Garbage collect redundant clauses.
    #[arg(long = "reduce", default_value_t = true, action = ArgAction::Set)]
    reduce: bool,

    /// Spare clauses better than the average resolved clause when reducing.
    #[arg(long = "reduce-dynamic", default_value_t = true, action = ArgAction::Set)]
    reduce_dynamic: bool,

    /// The number of conflicts before the first reduction.
    #[arg(long = "reduce-init", default_value_t = 2000)]
    reduce_init: u64,

    /// The growth of the reduction interval per reduction.
    #[arg(long = "reduce-inc", default_value_t = 300, value_parser = clap::value_parser!(u64).range(1..))]
    reduce_inc: u64,

    /// Enable restarting.
    #[arg(long = "restart", default_value_t = true, action = ArgAction::Set)]
    restart: bool,

    /// Delay forced restarts while the search is shallow.
    #[arg(long = "restart-delay", default_value_t = true, action = ArgAction::Set)]
    restart_delay: bool,

    /// The fraction of the backjump-level average below which restarts are delayed.
    #[arg(long = "restart-delay-limit", default_value_t = 0.5)]
    restart_delay_limit: f64,

    /// The minimum number of conflicts between two considered restarts.
    #[arg(long = "restart-int", default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    restart_interval: u64,

    /// The margin by which the fast glue average has to exceed the slow one.
    #[arg(long = "restart-margin", default_value_t = 0.2)]
    restart_margin: f64,

    /// Keep the reusable prefix of the trail across restarts.
    #[arg(long = "reuse-trail", default_value_t = true, action = ArgAction::Set)]
    reuse_trail: bool,

    /// Verify that the reported solution is consistent with the instance.
    #[arg(long = "verify", default_value_t = false)]
    verify_solution: bool,

    /// Enables log message output from the solver.
    #[arg(short = 'v', long = "verbose", default_value_t = false)]
    verbose: bool,

    /// If `--verbose` is enabled removes the timestamp information from the log messages.
    #[arg(long = "omit-timestamp", default_value_t = false)]
    omit_timestamp: bool,

    /// If `--verbose` is enabled removes the call site information from the log messages.
    /// Call site is the file and line in it that originated the message.
    #[arg(long = "omit-call-site", default_value_t = false)]
    omit_call_site: bool,
}

fn configure_logging(
    verbose: bool,
    omit_timestamp: bool,
    omit_call_site: bool,
) -> std::io::Result<()> {
    let level_filter = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .format(move |buf, record| {
            write!(buf, "c ")?;
            if !omit_timestamp {
                write!(buf, "{} ", buf.timestamp())?;
            }
            write!(buf, "{} ", record.level())?;
            if !omit_call_site {
                write!(
                    buf,
                    "[{}:{}] ",
                    record.file().unwrap_or("unknown"),
                    record.line().unwrap_or(0)
                )?;
            }
            writeln!(buf, "{}", record.args())
        })
        .filter_level(level_filter)
        .init();
    Ok(())
}

fn main() {
    let exit_code = match run() {
        Ok(exit_code) => exit_code,
        Err(e) => {
            error!("Execution failed, error: {e}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run() -> GourdResult<i32> {
    let args = Args::parse();

    configure_logging(args.verbose, args.omit_timestamp, args.omit_call_site)?;
    validate_option_ranges(&args)?;
    configure_statistic_logging("c", None, None, None);
    signal_handler::register_signals()?;

    info!(
        "Gourd CDCL SAT solver, version {}",
        env!("CARGO_PKG_VERSION")
    );

    let solver_options = SolverOptions {
        glue_fast_alpha: args.ema_glue_fast,
        glue_slow_alpha: args.ema_glue_slow,
        jump_alpha: args.ema_jump,
        resolved_alpha: args.ema_resolved,
        reduce_enabled: args.reduce,
        reduce_dynamic: args.reduce_dynamic,
        reduce_initial_threshold: args.reduce_init,
        reduce_increment: args.reduce_inc,
        restart_enabled: args.restart,
        restart_delay_enabled: args.restart_delay,
        restart_delay_fraction: args.restart_delay_limit,
        restart_margin: args.restart_margin,
        restart_base_interval: args.restart_interval,
        reuse_trail_enabled: args.reuse_trail,
    };
    echo_options(&args);

    let proof = match &args.proof_path {
        Some(proof_path) => Some(open_proof_writer(proof_path)?),
        None => None,
    };

    let mut solver = {
        let instance = open_instance_reader(args.instance_path.as_deref())?;
        parse_cnf::<SolverDimacsSink>(instance, SolverArgs::new(solver_options, proof))?
    };

    match solver.solve() {
        SolverExecutionFlag::Satisfiable => {
            if args.verify_solution {
                verify_reported_solution(args.instance_path.as_deref(), &solver)?;
            }
            println!("s SATISFIABLE");
            print_witness(&solver);
            solver.log_statistics();
            Ok(10)
        }
        SolverExecutionFlag::Unsatisfiable => {
            println!("s UNSATISFIABLE");
            solver.log_statistics();
            Ok(20)
        }
        SolverExecutionFlag::Unknown => {
            println!("s UNKNOWN");
            solver.log_statistics();
            if let Some(signal) = signal_handler::received_signal() {
                info!("re-raising signal {signal}");
                let _ = signal_handler::reraise(signal);
            }
            Ok(1)
        }
    }
}

/// Echoes the effective value of every solver option, one line per knob in the form the command
/// line accepts them.
fn echo_options(args: &Args) {
    debug!("--ema-glue-fast={}", args.ema_glue_fast);
    debug!("--ema-glue-slow={}", args.ema_glue_slow);
    debug!("--ema-jump={}", args.ema_jump);
    debug!("--ema-resolved={}", args.ema_resolved);
    debug!("--reduce={}", args.reduce);
    debug!("--reduce-dynamic={}", args.reduce_dynamic);
    debug!("--reduce-init={}", args.reduce_init);
    debug!("--reduce-inc={}", args.reduce_inc);
    debug!("--restart={}", args.restart);
    debug!("--restart-delay={}", args.restart_delay);
    debug!("--restart-delay-limit={}", args.restart_delay_limit);
    debug!("--restart-int={}", args.restart_interval);
    debug!("--restart-margin={}", args.restart_margin);
    debug!("--reuse-trail={}", args.reuse_trail);
}

fn validate_option_ranges(args: &Args) -> GourdResult<()> {
    let alpha_options = [
        ("ema-glue-fast", args.ema_glue_fast),
        ("ema-glue-slow", args.ema_glue_slow),
        ("ema-jump", args.ema_jump),
        ("ema-resolved", args.ema_resolved),
        ("restart-delay-limit", args.restart_delay_limit),
    ];
    for (name, value) in alpha_options {
        if !(0.0..=1.0).contains(&value) {
            return Err(GourdError::InvalidOptionValue(name, value, "[0, 1]"));
        }
    }

    if !(0.0..=10.0).contains(&args.restart_margin) {
        return Err(GourdError::InvalidOptionValue(
            "restart-margin",
            args.restart_margin,
            "[0, 10]",
        ));
    }

    Ok(())
}

/// Opens the instance for reading; standard input when no path (or '-') is given, and a pipe
/// from an external decompressor for the common compression suffixes.
fn open_instance_reader(instance_path: Option<&Path>) -> GourdResult<Box<dyn Read>> {
    let path = match instance_path {
        None => return Ok(Box::new(std::io::stdin())),
        Some(path) if path.as_os_str() == "-" => return Ok(Box::new(std::io::stdin())),
        Some(path) => path,
    };

    let file_name = path.to_string_lossy();
    let decompression_command = if file_name.ends_with(".gz") {
        Some(("gunzip", vec!["-c"]))
    } else if file_name.ends_with(".bz2") {
        Some(("bzcat", vec![]))
    } else if file_name.ends_with(".xz") {
        Some(("xzcat", vec![]))
    } else {
        None
    };

    match decompression_command {
        Some((program, program_args)) => {
            info!("reading '{file_name}' through {program}");
            let mut child = Command::new(program)
                .args(program_args)
                .arg(path)
                .stdout(Stdio::piped())
                .stderr(Stdio::inherit())
                .spawn()
                .map_err(|e| GourdError::DecompressionError(e, program.to_string()))?;
            let child_stdout = child
                .stdout
                .take()
                .expect("the child process was spawned with a piped stdout");
            Ok(Box::new(child_stdout))
        }
        None => {
            let file = File::open(path)
                .map_err(|e| GourdError::FileReadingError(e, file_name.to_string()))?;
            Ok(Box::new(file))
        }
    }
}

fn open_proof_writer(proof_path: &Path) -> GourdResult<Box<dyn Write>> {
    if proof_path.as_os_str() == "-" {
        return Ok(Box::new(std::io::stdout()));
    }
    let file = File::create(proof_path)
        .map_err(|e| GourdError::FileReadingError(e, proof_path.to_string_lossy().to_string()))?;
    Ok(Box::new(file))
}

fn verify_reported_solution(
    instance_path: Option<&Path>,
    solver: &SatisfactionSolver,
) -> GourdResult<()> {
    match instance_path {
        Some(path) if path.as_os_str() != "-" => {
            checker::verify_cnf_solution(open_instance_reader(Some(path))?, solver)?;
            info!("the reported solution satisfies every clause of the instance");
            Ok(())
        }
        _ => {
            warn!("cannot verify the solution, standard input is consumed after parsing");
            Ok(())
        }
    }
}

/// Prints the witness as `v` lines wrapped at 78 columns and terminated by `v 0`.
fn print_witness(solver: &SatisfactionSolver) {
    let mut line = String::from("v");
    for index in 1..=solver.num_propositional_variables() {
        let variable = PropositionalVariable::new(index as u32);
        let dimacs_code = if solver.get_truth_value(variable) {
            index as i64
        } else {
            -(index as i64)
        };
        let token = format!(" {dimacs_code}");
        if line.len() + token.len() > 78 {
            println!("{line}");
            line = String::from("v");
        }
        line.push_str(&token);
    }
    if line.len() > 1 {
        println!("{line}");
    }
    println!("v 0");
}

/// The arguments to construct the [`SatisfactionSolver`] a parsed instance is loaded into.
pub(crate) struct SolverArgs {
    options: SolverOptions,
    proof: Option<Box<dyn Write>>,
}

impl SolverArgs {
    fn new(options: SolverOptions, proof: Option<Box<dyn Write>>) -> SolverArgs {
        SolverArgs { options, proof }
    }

    pub(crate) fn into_solver(self) -> SatisfactionSolver {
        let mut solver = SatisfactionSolver::new(self.options);
        if let Some(writer) = self.proof {
            solver.set_proof_writer(writer);
        }
        solver
    }
}

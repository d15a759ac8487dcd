use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use acc2omp::config::{ImplicitVector, ImplicitWorker, LowerOptions, NoCreateOmp, UpdatePresentOmp};
use acc2omp::diag::LineIndex;
use acc2omp::dump::{dump_unit, DumpInputs};
use acc2omp::pipeline::{parse_source, run_pipeline, CompilationState};
use acc2omp::pprint::{print_unit, PrintMode};

#[derive(Parser, Debug)]
#[command(
    name = "acc2omp",
    version,
    about = "Translates OpenACC-annotated C sources to OpenMP"
)]
struct Cli {
    /// Input C source file
    source: PathBuf,

    /// Print the translation unit in the given dialect mix
    #[arg(long, value_enum, default_value_t = PrintMode::Omp, conflicts_with = "dump")]
    print: PrintMode,

    /// Print the AST dump instead of source
    #[arg(long)]
    dump: bool,

    /// Report diagnostics only, print nothing on stdout
    #[arg(long)]
    emit_diagnostics_only: bool,

    /// JSON file with lowering options
    #[arg(long)]
    options: Option<PathBuf>,

    /// Map type used for `no_create` (overrides the options file)
    #[arg(long, value_enum)]
    no_create_omp: Option<NoCreateOmp>,

    /// Motion modifier used for `update` clauses (overrides the options file)
    #[arg(long, value_enum)]
    update_present_omp: Option<UpdatePresentOmp>,

    /// Loops that get an implicit `worker` (overrides the options file)
    #[arg(long, value_enum)]
    implicit_worker: Option<ImplicitWorker>,

    /// Loops that get an implicit `vector` (overrides the options file)
    #[arg(long, value_enum)]
    implicit_vector: Option<ImplicitVector>,

    /// Log pass timing (same as RUST_LOG=debug)
    #[arg(long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    // ── Options ──
    let mut options = match &cli.options {
        Some(path) => match LowerOptions::load(path) {
            Ok(o) => o,
            Err(e) => {
                eprintln!("acc2omp: error: {e}");
                return ExitCode::from(2);
            }
        },
        None => LowerOptions::default(),
    };
    if let Some(v) = cli.no_create_omp {
        options.no_create_omp = v;
    }
    if let Some(v) = cli.update_present_omp {
        options.update_present_omp = v;
    }
    if let Some(v) = cli.implicit_worker {
        options.implicit_worker = v;
    }
    if let Some(v) = cli.implicit_vector {
        options.implicit_vector = v;
    }
    log::debug!("options: {options:?}");

    // ── Read and parse source ──
    let source = match std::fs::read_to_string(&cli.source) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("acc2omp: error: {}: {}", cli.source.display(), e);
            return ExitCode::from(2);
        }
    };
    let file = cli.source.display().to_string();
    let lines = LineIndex::new(&source);

    let unit = match parse_source(&source) {
        Ok(unit) => unit,
        Err(diags) => {
            for d in &diags {
                eprintln!("{}", d.render(&file, &lines));
            }
            return ExitCode::from(1);
        }
    };

    // ── Passes ──
    let lower = cli.dump || cli.print.needs_lowering();
    let mut state = CompilationState::new(unit, options);
    if let Err(e) = run_pipeline(&mut state, lower, |_, _| {}) {
        eprintln!("acc2omp: internal error: {e}");
        return ExitCode::from(2);
    }
    for d in &state.diagnostics {
        eprintln!("{}", d.render(&file, &lines));
    }
    let status = if state.has_error {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    };
    // Without a lowering only OpenACC source and the plain dump can be shown.
    if cli.emit_diagnostics_only || (state.has_error && !cli.dump && cli.print != PrintMode::Acc) {
        return status;
    }

    // ── Output ──
    let Some(resolved) = state.resolved.as_ref() else {
        eprintln!("acc2omp: internal error: name resolution did not run");
        return ExitCode::from(2);
    };
    let out = if cli.dump {
        let inputs = DumpInputs {
            partition: state.partition.as_ref(),
            data: state.data.as_ref(),
            lowered: state.lowered.as_ref(),
        };
        dump_unit(&state.unit, resolved, inputs)
    } else {
        print_unit(&state.unit, resolved, state.lowered.as_ref(), cli.print)
    };
    print!("{out}");
    status
}

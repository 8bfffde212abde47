use anyhow::Result;
use clap::{Parser, ValueEnum};

mod commands;

use commands::configure::Outputs;
use commands::GlobalArgs;

/// Build file generator for SDK library decompilation projects.
///
/// Reads dolgen.toml and writes a ninja build graph that extracts the
/// reference archives, compiles every available source and prepares diff
/// metadata for objdiff.
///
/// EXAMPLES:
///     dolgen                           Write build.ninja and objdiff.json
///     dolgen --revision 37             Configure another SDK revision
///     dolgen check                     Validate without writing anything
///     dolgen progress                  Summarize matched code and data
///
/// ENVIRONMENT VARIABLES:
///     RUST_LOG    Log filter (overrides --verbose)
#[derive(Parser, Debug)]
#[command(name = "dolgen")]
#[command(after_help = "Run `ninja` afterwards to build; the graph reruns dolgen when dolgen.toml changes.")]
struct Cli {
    /// What to generate
    #[arg(value_enum, default_value_t = Mode::Configure)]
    mode: Mode,

    #[command(flatten)]
    args: GlobalArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Write build.ninja, objdiff.json and the generator state
    Configure,
    /// Only rewrite objdiff.json
    DiffConfig,
    /// Aggregate execution results into progress.json
    Progress,
    /// Validate configuration and tools, write nothing
    Check,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.args.verbose);

    match cli.mode {
        Mode::Configure => commands::configure::run(&cli.args, Outputs::All),
        Mode::DiffConfig => commands::configure::run(&cli.args, Outputs::DiffConfig),
        Mode::Progress => commands::progress::run(&cli.args),
        Mode::Check => commands::check::run(&cli.args),
    }
}

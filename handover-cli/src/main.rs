use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use tracing_subscriber::EnvFilter;

mod cmd;
mod config;

fn cli() -> Command {
    cmd::build::add_build_args(Command::new("handover"))
        .version(env!("CARGO_PKG_VERSION"))
        .about("Turn a folder of markdown handover notes into HTML pages")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log every step, not just results")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(cmd::build::make_subcommand())
}

fn init_tracing(verbose: bool) {
    // --verbose forces debug, otherwise RUST_LOG or info
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("verbose"));

    // Filesystem work is interleaved on a single thread.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    // Running without a subcommand is the same as `handover build`
    let args = match matches.subcommand() {
        Some(("build", args)) => {
            cmd::build::reject_root_build_args(&matches)?;
            args
        }
        _ => &matches,
    };

    runtime.block_on(cmd::build::execute(args))
}

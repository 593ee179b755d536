// vidlabel-cli/src/main.rs
//
// Entry point for the `vidlabel` binary: parse arguments, set up logging,
// dispatch to the subcommand and map failures to a non-zero exit code.

use clap::Parser;
use log::info;
use std::process;

use vidlabel_cli::logging::init_logging;
use vidlabel_cli::output::print_error;
use vidlabel_cli::{Cli, Commands, run_compare, run_extract, run_info, run_run};

fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(log_path) = init_logging(cli.verbose, cli.log_dir.as_deref())? {
        info!("Main log file: {}", log_path.display());
    }

    let store_root = cli.store_root.as_deref();
    match cli.command {
        Commands::Info(args) => run_info(args, store_root),
        Commands::Run(args) => run_run(args, store_root),
        Commands::Extract(args) => run_extract(args, store_root),
        Commands::Compare(args) => run_compare(args, store_root),
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        print_error(&format!("{e:#}"));
        process::exit(1);
    }
}

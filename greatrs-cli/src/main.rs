mod cli;
mod handlers;

use anyhow::Result;
use clap::Command;

pub mod consts {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const PKG_NAME: &str = "greatrs";
    pub const BIN_NAME: &str = "greatrs";
}

fn build_parser() -> Command {
    Command::new(consts::BIN_NAME)
        .bin_name(consts::BIN_NAME)
        .version(consts::VERSION)
        .about("Submit genomic region sets to the GREAT enrichment web service and retrieve gene associations, enrichment tables, and plots.")
        .subcommand_required(true)
        .subcommand(cli::create_analyze_cli())
        .subcommand(cli::create_format_cli())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app = build_parser();
    let matches = app.get_matches();

    match matches.subcommand() {
        Some((cli::ANALYZE_CMD, matches)) => {
            handlers::run_analyze(matches)?;
        }
        Some((cli::FORMAT_CMD, matches)) => {
            handlers::run_format(matches)?;
        }
        _ => unreachable!("Subcommand not found"),
    };

    Ok(())
}

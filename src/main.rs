use clap::Parser;
use regimechain::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}

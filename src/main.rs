use clap::Parser;
use tradenote::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}

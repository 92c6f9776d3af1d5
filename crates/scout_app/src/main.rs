use clap::Parser;
use scout_app::{run_app, Cli};

fn main() -> anyhow::Result<()> {
    run_app(Cli::parse())
}

use clap::Parser;
use toolbox_app::platform::{self, Cli};

fn main() -> anyhow::Result<()> {
    platform::run_app(Cli::parse())
}

use anyhow::Result;
use clap::Parser;
use imgtune::config::{Cli, Config};

#[tokio::main]
async fn main() -> Result<()> {
    imgtune::init_logger();

    let cli = Cli::parse();
    let config = Config::load(&cli)?;

    imgtune::run(config).await
}

use clap::Parser;

use akicli::config::DriverConfig;
use akicli::driver::SessionDriver;
use akicli::engine::akinator::AkinatorEngine;
use akicli::input::InputReader;
use akicli::logger;
use akicli::region::Region;

#[derive(Parser)]
#[command(
    name = "akicli",
    version,
    about = "Play a guessing game session over stdin/stdout, one JSON line per question."
)]
struct Cli {
    /// Backend region, e.g. en, de, fr_objects, en_animals
    region: Region,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parsing fails (and exits) before any backend call if the region is missing or unknown
    let cli = Cli::parse();

    logger::init(logger::default_level());

    let engine = AkinatorEngine::new(cli.region)?;
    let mut driver = SessionDriver::new(
        engine,
        InputReader::stdin(),
        std::io::stdout(),
        DriverConfig::default(),
    );

    driver.run().await?;
    Ok(())
}

use anyhow::Result;
use fixgen::app::{self, Mode};
use fixgen::cli;
use tracing::info;

fn main() -> Result<()> {
    let args = cli::parse_args();
    cli::init_logging(args.verbose);

    info!("Starting create_small_file v{}", env!("CARGO_PKG_VERSION"));
    app::run(&args, Mode::Plain)
}

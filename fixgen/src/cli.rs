use camino::Utf8PathBuf;
use clap::Parser;
use clap::error::ErrorKind;

#[derive(Parser, Debug)]
#[command(author, version, about = "Create a large deterministic text fixture", long_about = None)]
pub struct Args {
    /// Fixture file to create
    pub output: Utf8PathBuf,

    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<Utf8PathBuf>,

    /// Check every line of the fixture (and decompressed variants) afterwards
    #[arg(long)]
    pub verify: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

pub fn usage(program: &str) -> String {
    format!("Usage: {program} small_file.txt")
}

/// Parse the command line, exiting with status 1 and a usage line on stdout
/// when the arguments are wrong.
pub fn parse_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(_) => {
            let program = std::env::args()
                .next()
                .unwrap_or_else(|| "create_small_file".to_owned());
            println!("{}", usage(&program));
            std::process::exit(1);
        }
    }
}

pub fn init_logging(verbose: bool) {
    let log_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

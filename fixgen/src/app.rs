use crate::cli::Args;
use anyhow::{Context, Result};
use fixgen_core::compress::{ensure_compressed, verify_compressed};
use fixgen_core::fixture::{ensure_fixture, verify_fixture};
use fixgen_core::{CompressOutcome, Config, FixtureOutcome};
use tracing::info;

/// Which artifacts an invocation produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Only the plain-text fixture
    Plain,
    /// The fixture plus one variant per configured compression format
    Compressed,
}

pub fn run(args: &Args, mode: Mode) -> Result<()> {
    let (config, source) = if let Some(config_path) = &args.config {
        let config = Config::load_from_path(config_path)
            .with_context(|| format!("Failed to load config {config_path}"))?;
        (config, Some(config_path.to_string()))
    } else {
        let (config, path) = Config::load_with_source();
        (config, path.map(|p| p.display().to_string()))
    };
    match &source {
        Some(path) => info!("Configuration loaded from {}", path),
        None => info!("No configuration file, using defaults"),
    }
    info!(
        "Layout: {} lines, sentinel every {} bytes, {} bytes total",
        config.layout.line_count(),
        config.layout.sentinel_interval,
        config.layout.expected_len()
    );

    let output = &args.output;
    let layout = &config.layout;

    let outcome = ensure_fixture(output, layout, &config.generate_options())
        .with_context(|| format!("Failed to create fixture {output}"))?;
    match outcome {
        FixtureOutcome::Created { len, .. } => info!("Created {} ({} bytes)", output, len),
        FixtureOutcome::Reused { .. } => info!("{} already present", output),
    }

    if args.verify {
        verify_fixture(output, layout)
            .with_context(|| format!("Verification of {output} failed"))?;
    }

    if mode == Mode::Compressed {
        for &compression in &config.compression.formats {
            let outcome = ensure_compressed(output, compression, config.compression.level)
                .with_context(|| format!("Failed to create {compression} variant of {output}"))?;
            if let CompressOutcome::Created { len } = outcome {
                info!("Created {} ({} bytes)", compression.artifact_path(output), len);
            }

            if args.verify {
                verify_compressed(output, compression, layout).with_context(|| {
                    format!("Verification of the {compression} variant of {output} failed")
                })?;
            }
        }
    }

    Ok(())
}

//! Compressed variants of a fixture, produced by the system `gzip`, `bzip2`
//! and `xz` binaries.
//!
//! The fixture is streamed through the tool's stdin and the result written to
//! `<fixture>.<ext>`. Output lands in a temporary sibling first and is only
//! renamed into place once the tool exited cleanly and the header carries the
//! expected magic bytes.

use crate::error::{FixgenError, Result};
use crate::fixture::{DEFAULT_BUFFER_SIZE, VerifyReport, discard, temp_path, verify_reader};
use crate::pattern::Layout;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::process::{Command, Stdio};
use tracing::{debug, info};

const MAGIC_LEN: u64 = 6;

/// Compression format of a fixture variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    Gzip,
    Bzip2,
    Xz,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressOutcome {
    Created { len: u64 },
    Reused,
}

impl Compression {
    pub const ALL: [Compression; 3] = [Compression::Gzip, Compression::Bzip2, Compression::Xz];

    pub fn extension(&self) -> &'static str {
        match self {
            Compression::Gzip => "gz",
            Compression::Bzip2 => "bz2",
            Compression::Xz => "xz",
        }
    }

    pub fn program(&self) -> &'static str {
        match self {
            Compression::Gzip => "gzip",
            Compression::Bzip2 => "bzip2",
            Compression::Xz => "xz",
        }
    }

    pub fn magic(&self) -> &'static [u8] {
        match self {
            Compression::Gzip => b"\x1f\x8b",
            Compression::Bzip2 => b"BZh",
            Compression::Xz => b"\xfd7zXZ\x00",
        }
    }

    /// Identify a compressed stream from its leading bytes.
    pub fn detect(header: &[u8]) -> Option<Self> {
        Self::ALL.into_iter().find(|c| header.starts_with(c.magic()))
    }

    /// Where the variant of `fixture` lives, e.g. `out.txt.gz`.
    pub fn artifact_path(&self, fixture: &Utf8Path) -> Utf8PathBuf {
        Utf8PathBuf::from(format!("{fixture}.{}", self.extension()))
    }

    /// Whether the tool can be spawned at all.
    pub fn is_available(&self) -> bool {
        Command::new(self.program())
            .arg("--help")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok()
    }

    fn spawn_error(&self, e: io::Error) -> FixgenError {
        if e.kind() == io::ErrorKind::NotFound {
            FixgenError::ToolMissing(self.program().to_owned())
        } else {
            FixgenError::Compressor {
                tool: self.program().to_owned(),
                detail: format!("failed to spawn: {e}"),
            }
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

fn read_header(path: &Utf8Path) -> Result<Vec<u8>> {
    let mut header = Vec::with_capacity(MAGIC_LEN as usize);
    File::open(path)?.take(MAGIC_LEN).read_to_end(&mut header)?;
    Ok(header)
}

/// Make sure the `compression` variant of `fixture` exists.
///
/// An artifact already present is left alone as long as it starts with the
/// right magic bytes; otherwise [`FixgenError::Stale`] is returned.
pub fn ensure_compressed(
    fixture: &Utf8Path,
    compression: Compression,
    level: Option<u8>,
) -> Result<CompressOutcome> {
    let target = compression.artifact_path(fixture);

    match File::open(&target) {
        Ok(_) => {
            let header = read_header(&target)?;
            if Compression::detect(&header) != Some(compression) {
                return Err(FixgenError::Stale {
                    path: target,
                    reason: format!("not a {compression} stream"),
                });
            }
            info!("Reusing {}", target);
            Ok(CompressOutcome::Reused)
        }
        Err(e) => {
            debug!("{} not readable ({}), compressing", target, e);
            let temp = temp_path(&target);
            match compress(fixture, &temp, compression, level)
                .and_then(|()| fs::rename(&temp, &target).map_err(FixgenError::from))
            {
                Ok(()) => {
                    let len = fs::metadata(&target)?.len();
                    info!("Wrote {} ({} bytes)", target, len);
                    Ok(CompressOutcome::Created { len })
                }
                Err(e) => {
                    discard(&temp);
                    Err(e)
                }
            }
        }
    }
}

fn compress(
    fixture: &Utf8Path,
    output: &Utf8Path,
    compression: Compression,
    level: Option<u8>,
) -> Result<()> {
    let input = File::open(fixture)?;
    let sink = File::create(output)?;

    let mut cmd = Command::new(compression.program());
    if let Some(level) = level {
        cmd.arg(format!("-{level}"));
    }
    cmd.stdin(input).stdout(sink).stderr(Stdio::piped());

    debug!("Running {:?}", cmd);
    let result = cmd.output().map_err(|e| compression.spawn_error(e))?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        return Err(FixgenError::Compressor {
            tool: compression.program().to_owned(),
            detail: format!("{}: {}", result.status, stderr.trim()),
        });
    }

    let header = read_header(output)?;
    if Compression::detect(&header) != Some(compression) {
        return Err(FixgenError::Compressor {
            tool: compression.program().to_owned(),
            detail: format!("output is not a {compression} stream"),
        });
    }
    Ok(())
}

/// Decompress the `compression` variant of `fixture` and check it line by
/// line against `layout`.
pub fn verify_compressed(
    fixture: &Utf8Path,
    compression: Compression,
    layout: &Layout,
) -> Result<VerifyReport> {
    let source = compression.artifact_path(fixture);
    let input = File::open(&source)?;

    let mut child = Command::new(compression.program())
        .arg("-dc")
        .stdin(input)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| compression.spawn_error(e))?;

    let Some(stdout) = child.stdout.take() else {
        return Err(FixgenError::Compressor {
            tool: compression.program().to_owned(),
            detail: "stdout not captured".to_owned(),
        });
    };

    let report = match verify_reader(BufReader::with_capacity(DEFAULT_BUFFER_SIZE, stdout), layout)
    {
        Ok(report) => report,
        Err(e) => {
            // The tool may still be blocked writing to the closed pipe
            if let Err(kill_err) = child.kill() {
                debug!("Failed to stop {}: {}", compression, kill_err);
            }
            child.wait()?;
            return Err(e);
        }
    };

    let output = child.wait_with_output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(FixgenError::Compressor {
            tool: compression.program().to_owned(),
            detail: format!("{}: {}", output.status, stderr.trim()),
        });
    }

    info!("Verified {} ({} lines)", source, report.lines);
    Ok(report)
}

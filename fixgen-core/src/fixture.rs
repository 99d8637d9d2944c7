//! Creation and verification of the plain-text fixture.

use crate::error::{FixgenError, Result};
use crate::manifest::Manifest;
use crate::pattern::{Layout, Line};
use camino::{Utf8Path, Utf8PathBuf};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use tracing::{debug, info, warn};

pub const DEFAULT_BUFFER_SIZE: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateOptions {
    pub buffer_size: usize,
    /// Write a `.manifest.toml` sidecar next to a freshly generated fixture
    pub manifest: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            manifest: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixtureOutcome {
    Created { len: u64, sha256: String },
    Reused { len: u64 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub lines: u64,
    pub bytes: u64,
    pub sentinels: u64,
    pub sha256: String,
}

/// Sibling path used while an artifact is being written.
pub(crate) fn temp_path(path: &Utf8Path) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{path}.tmp"))
}

pub(crate) fn discard(temp: &Utf8Path) {
    if let Err(e) = fs::remove_file(temp) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("Failed to remove {}: {}", temp, e);
        }
    }
}

/// Hashes everything that passes through to the inner writer.
struct HashingWriter<W> {
    inner: W,
    hasher: Sha256,
}

impl<W: Write> HashingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
        }
    }

    fn finish(self) -> (W, String) {
        (self.inner, format!("{:x}", self.hasher.finalize()))
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Make sure a fixture following `layout` exists at `path`.
///
/// A readable file already at `path` is never touched. It is accepted when
/// its size matches the layout and any manifest next to it describes the same
/// layout; otherwise [`FixgenError::Stale`] is returned. When the file cannot
/// be opened it is generated into a temporary sibling and renamed into place.
pub fn ensure_fixture(
    path: &Utf8Path,
    layout: &Layout,
    options: &GenerateOptions,
) -> Result<FixtureOutcome> {
    layout.validate()?;

    match File::open(path) {
        Ok(file) => {
            let metadata = file.metadata()?;
            if !metadata.is_file() {
                return Err(FixgenError::Stale {
                    path: path.to_owned(),
                    reason: "not a regular file".to_owned(),
                });
            }
            check_existing(path, layout, metadata.len())?;
            info!("Reusing fixture {} ({} bytes)", path, metadata.len());
            Ok(FixtureOutcome::Reused {
                len: metadata.len(),
            })
        }
        Err(e) => {
            debug!("Fixture {} not readable ({}), generating", path, e);
            generate(path, layout, options)
        }
    }
}

fn check_existing(path: &Utf8Path, layout: &Layout, len: u64) -> Result<()> {
    let expected = layout.expected_len();
    if len != expected {
        return Err(FixgenError::Stale {
            path: path.to_owned(),
            reason: format!("expected {expected} bytes, found {len}"),
        });
    }

    if let Some(manifest) = Manifest::load(path)? {
        if manifest.layout != *layout {
            return Err(FixgenError::Stale {
                path: path.to_owned(),
                reason: "manifest describes a different layout".to_owned(),
            });
        }
    }
    Ok(())
}

fn generate(path: &Utf8Path, layout: &Layout, options: &GenerateOptions) -> Result<FixtureOutcome> {
    info!(
        "Generating fixture {} ({} lines, {} bytes)",
        path,
        layout.line_count(),
        layout.expected_len()
    );

    let temp = temp_path(path);
    let (len, sha256) = match write_fixture(&temp, layout, options.buffer_size) {
        Ok(written) => written,
        Err(e) => {
            discard(&temp);
            return Err(e);
        }
    };
    // The sidecar must describe the new content before the fixture appears
    let sidecar = if options.manifest {
        Manifest {
            len,
            sha256: sha256.clone(),
            layout: layout.clone(),
        }
        .save(path)
    } else {
        Manifest::remove(path)
    };
    if let Err(e) = sidecar {
        discard(&temp);
        return Err(e);
    }

    if let Err(e) = fs::rename(&temp, path) {
        discard(&temp);
        if options.manifest {
            discard(&Manifest::path_for(path));
        }
        return Err(e.into());
    }

    info!("Fixture {} written ({} bytes, sha256 {})", path, len, sha256);
    Ok(FixtureOutcome::Created { len, sha256 })
}

fn write_fixture(temp: &Utf8Path, layout: &Layout, buffer_size: usize) -> Result<(u64, String)> {
    let file = File::create(temp)?;
    let mut writer = BufWriter::with_capacity(buffer_size, HashingWriter::new(file));
    let len = layout.write_to(&mut writer)?;

    let hashing = writer.into_inner().map_err(|e| e.into_error())?;
    let (file, sha256) = hashing.finish();
    file.sync_all()?;
    Ok((len, sha256))
}

/// Check every line of the file at `path` against `layout`.
///
/// When a manifest sits next to the fixture its digest must match the content.
pub fn verify_fixture(path: &Utf8Path, layout: &Layout) -> Result<VerifyReport> {
    let file = File::open(path)?;
    let report = verify_reader(BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file), layout)?;

    if let Some(manifest) = Manifest::load(path)? {
        if manifest.sha256 != report.sha256 {
            return Err(FixgenError::Manifest(format!(
                "digest mismatch for {path}: manifest has {}, content hashes to {}",
                manifest.sha256, report.sha256
            )));
        }
    }

    info!(
        "Verified {} ({} lines, {} sentinels, {} bytes)",
        path, report.lines, report.sentinels, report.bytes
    );
    Ok(report)
}

/// Stream `reader` and compare it line by line with `layout`.
pub fn verify_reader<R: BufRead>(mut reader: R, layout: &Layout) -> Result<VerifyReport> {
    layout.validate()?;

    let mut filler = Vec::with_capacity(layout.filler.len() + 1);
    filler.extend_from_slice(layout.filler.as_bytes());
    filler.push(b'\n');

    let mut hasher = Sha256::new();
    let mut report = VerifyReport::default();
    let mut buf = Vec::with_capacity(filler.len() * 2);

    for line in layout.lines() {
        report.lines += 1;
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf)?;
        hasher.update(&buf);
        report.bytes += read as u64;

        let ok = match line {
            Line::Filler => buf == filler,
            other => {
                report.sentinels += u64::from(matches!(other, Line::Sentinel(_)));
                let mut expected = other.render(layout);
                expected.push('\n');
                buf == expected.as_bytes()
            }
        };
        if !ok {
            let mut expected = line.render(layout);
            expected.push('\n');
            return Err(FixgenError::Mismatch {
                line: report.lines,
                expected,
                found: String::from_utf8_lossy(&buf).into_owned(),
            });
        }
    }

    buf.clear();
    if reader.read_until(b'\n', &mut buf)? > 0 {
        return Err(FixgenError::Mismatch {
            line: report.lines + 1,
            expected: String::new(),
            found: String::from_utf8_lossy(&buf).into_owned(),
        });
    }

    report.sha256 = format!("{:x}", hasher.finalize());
    Ok(report)
}

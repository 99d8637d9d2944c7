//! Line layout of a generated fixture.
//!
//! A fixture with `2^lines_log2` lines is made of `2^lines_log2 - 1` body
//! lines followed by one terminal line holding the bare marker. Body line `i`
//! (1-based) sits at the nominal byte offset `i * stride`, where the stride is
//! the filler length plus its newline. Whenever that offset is a multiple of
//! `sentinel_interval` the line becomes a sentinel, `marker` followed by the
//! offset in decimal. Every other body line is the filler.

use crate::error::{FixgenError, Result};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use tracing::debug;

pub const DEFAULT_FILLER: &str = "abcdefghijklmnopqrstuvwxyz01234";
pub const DEFAULT_MARKER: &str = "hello";
pub const DEFAULT_LINES_LOG2: u32 = 26;
pub const DEFAULT_SENTINEL_INTERVAL: u64 = 1 << 28;

const MAX_LINES_LOG2: u32 = 40;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Layout {
    #[serde(default = "default_lines_log2")]
    pub lines_log2: u32,
    #[serde(default = "default_sentinel_interval")]
    pub sentinel_interval: u64,
    #[serde(default = "default_filler")]
    pub filler: String,
    #[serde(default = "default_marker")]
    pub marker: String,
}

/// A single line of the fixture, without its trailing newline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    Filler,
    /// Marker followed by the nominal byte offset of the line.
    Sentinel(u64),
    /// The bare marker closing the file.
    Terminal,
}

impl Line {
    pub fn render(&self, layout: &Layout) -> String {
        match self {
            Line::Filler => layout.filler.clone(),
            Line::Sentinel(byte) => format!("{}{}", layout.marker, byte),
            Line::Terminal => layout.marker.clone(),
        }
    }

    /// Length in bytes including the newline.
    pub fn encoded_len(&self, layout: &Layout) -> u64 {
        match self {
            Line::Filler => layout.stride(),
            Line::Sentinel(byte) => layout.marker.len() as u64 + decimal_digits(*byte) + 1,
            Line::Terminal => layout.marker.len() as u64 + 1,
        }
    }
}

fn default_lines_log2() -> u32 {
    DEFAULT_LINES_LOG2
}

const fn default_sentinel_interval() -> u64 {
    DEFAULT_SENTINEL_INTERVAL
}

fn default_filler() -> String {
    DEFAULT_FILLER.to_owned()
}

fn default_marker() -> String {
    DEFAULT_MARKER.to_owned()
}

fn decimal_digits(n: u64) -> u64 {
    u64::from(n.checked_ilog10().unwrap_or(0)) + 1
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            lines_log2: default_lines_log2(),
            sentinel_interval: default_sentinel_interval(),
            filler: default_filler(),
            marker: default_marker(),
        }
    }
}

impl Layout {
    /// Layout with the default filler and marker.
    pub fn new(lines_log2: u32, sentinel_interval: u64) -> Self {
        Self {
            lines_log2,
            sentinel_interval,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.lines_log2 == 0 || self.lines_log2 > MAX_LINES_LOG2 {
            return Err(FixgenError::Layout(format!(
                "lines_log2 must be within 1..={MAX_LINES_LOG2}, got {}",
                self.lines_log2
            )));
        }
        if self.sentinel_interval == 0 {
            return Err(FixgenError::Layout(
                "sentinel_interval must be positive".to_owned(),
            ));
        }
        for (name, value) in [("filler", &self.filler), ("marker", &self.marker)] {
            if value.is_empty() {
                return Err(FixgenError::Layout(format!("{name} must not be empty")));
            }
            if value.contains(['\n', '\r']) {
                return Err(FixgenError::Layout(format!(
                    "{name} must not contain line breaks"
                )));
            }
        }
        if self.stride().checked_mul(self.line_count()).is_none() {
            return Err(FixgenError::Layout(
                "filler too long for the requested line count".to_owned(),
            ));
        }
        Ok(())
    }

    /// Total number of lines, the terminal line included.
    pub fn line_count(&self) -> u64 {
        1u64 << self.lines_log2
    }

    pub fn stride(&self) -> u64 {
        self.filler.len() as u64 + 1
    }

    /// Distance in lines between two consecutive sentinels.
    pub fn sentinel_period(&self) -> u64 {
        self.sentinel_interval / gcd(self.stride(), self.sentinel_interval)
    }

    /// Line at 1-based position `number`, or `None` past the end.
    pub fn line(&self, number: u64) -> Option<Line> {
        let count = self.line_count();
        match number {
            0 => None,
            n if n == count => Some(Line::Terminal),
            n if n > count => None,
            n => {
                let byte = n * self.stride();
                if byte % self.sentinel_interval == 0 {
                    Some(Line::Sentinel(byte))
                } else {
                    Some(Line::Filler)
                }
            }
        }
    }

    /// All lines in file order.
    pub fn lines(&self) -> impl Iterator<Item = Line> + '_ {
        (1..=self.line_count()).filter_map(|n| self.line(n))
    }

    /// `(line number, byte offset)` of every sentinel, in file order.
    pub fn sentinels(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        let period = self.sentinel_period();
        let last_body = self.line_count() - 1;
        (1..)
            .map(move |k| k * period)
            .take_while(move |&n| n <= last_body)
            .map(|n| (n, n * self.stride()))
    }

    /// Exact size of the generated file in bytes.
    pub fn expected_len(&self) -> u64 {
        let body = self.line_count() - 1;
        let (count, sentinel_bytes) = self
            .sentinels()
            .fold((0u64, 0u64), |(count, bytes), (_, byte)| {
                (count + 1, bytes + Line::Sentinel(byte).encoded_len(self))
            });
        (body - count) * self.stride() + sentinel_bytes + Line::Terminal.encoded_len(self)
    }

    /// Stream the whole fixture into `writer`, returning the bytes written.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<u64> {
        let mut filler = Vec::with_capacity(self.filler.len() + 1);
        filler.extend_from_slice(self.filler.as_bytes());
        filler.push(b'\n');

        let mut written = 0u64;
        for line in self.lines() {
            match line {
                Line::Filler => writer.write_all(&filler)?,
                Line::Sentinel(byte) => {
                    debug!("Writing sentinel at byte {}", byte);
                    writeln!(writer, "{}{}", self.marker, byte)?;
                }
                Line::Terminal => writeln!(writer, "{}", self.marker)?,
            }
            written += line.encoded_len(self);
        }
        Ok(written)
    }
}

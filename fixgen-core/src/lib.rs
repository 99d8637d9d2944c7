#![allow(clippy::cargo_common_metadata)]

pub mod compress;
pub mod config;
pub mod error;
pub mod fixture;
pub mod manifest;
pub mod pattern;

pub use compress::{CompressOutcome, Compression};
pub use config::Config;
pub use error::{FixgenError, Result};
pub use fixture::{FixtureOutcome, GenerateOptions, VerifyReport};
pub use manifest::Manifest;
pub use pattern::{Layout, Line};

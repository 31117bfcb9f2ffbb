pub use clap::Parser;
use std::path::PathBuf;

use thiserror::Error;

use crate::inspect::OutputFormat;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("No input given, pass hex bytes or --file")]
    MissingInput,
    #[error("Hex input and --file are mutually exclusive")]
    ConflictingInput,
    #[error("Invalid hex input: {0}")]
    InvalidHex(String),
}

#[derive(Parser, Debug)]
#[command(
    author = "Piotr Olszewski",
    version,
    about = "Decode captured AgentX PDUs",
    long_about = None
)]
pub struct Configuration {
    /// Hex encoded PDU stream, separators (space, ':') and 0x prefix allowed
    pub hex: Option<String>,
    /// Read the raw PDU stream from a file
    #[arg(short, long)]
    pub file: Option<PathBuf>,
    /// Output format
    #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Fail on the first malformed PDU instead of reporting it
    #[arg(short, long)]
    pub strict: bool,
}

impl Configuration {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        match (&self.hex, &self.file) {
            (None, None) => Err(ConfigurationError::MissingInput),
            (Some(_), Some(_)) => Err(ConfigurationError::ConflictingInput),
            (Some(hex), None) => parse_hex(hex).map(|_| ()),
            (None, Some(_)) => Ok(()),
        }
    }
}

/// Parses hex text into bytes. Whitespace and ':' are ignored, as is a
/// leading `0x` on each token.
pub fn parse_hex(input: &str) -> Result<Vec<u8>, ConfigurationError> {
    let digits: String = input
        .split(|c: char| c.is_whitespace() || c == ':')
        .map(|token| {
            token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token)
        })
        .collect();

    if digits.len() % 2 != 0 {
        return Err(ConfigurationError::InvalidHex(format!(
            "odd number of digits ({})",
            digits.len()
        )));
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            let pair = digits.get(i..i + 2).unwrap_or_default();
            u8::from_str_radix(pair, 16)
                .map_err(|_| ConfigurationError::InvalidHex(format!("bad byte '{}'", pair)))
        })
        .collect()
}

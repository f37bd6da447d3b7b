//! CLI argument parsing

use clap::{Parser, Subcommand};
use esphost_board::BoardKind;

/// Payload given as hex on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexPayload(pub Vec<u8>);

impl std::str::FromStr for HexPayload {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, String> {
        parse_hex_bytes(s).map(Self)
    }
}

/// Parse a hex byte string such as `deadbeef`, `de:ad:be:ef` or `de ad be ef`
pub fn parse_hex_bytes(s: &str) -> Result<Vec<u8>, String> {
    let digits: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(&digits);

    if digits.is_empty() {
        return Err("Payload must not be empty".to_string());
    }
    if let Some(c) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(format!("Invalid hex digit '{}'", c));
    }
    if digits.len() % 2 != 0 {
        return Err(format!("Odd number of hex digits: {}", digits.len()));
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|e| format!("Invalid hex byte '{}': {}", &digits[i..i + 2], e))
        })
        .collect()
}

/// Generate dynamic help text for the board argument
fn board_help() -> String {
    format!(
        "Board to use [available: {}]",
        esphost_board::board_names_short()
    )
}

#[derive(Parser)]
#[command(name = "esphost")]
#[command(author, version, about = "ESP32 SPI host transport", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Bring the transport up and print every received frame
    Listen {
        /// Board to use
        #[arg(short, long, help = board_help())]
        board: BoardKind,

        /// Stop after this many frames
        #[arg(short = 'n', long)]
        count: Option<u64>,
    },

    /// Queue a frame and wait until it has been clocked out
    Send {
        /// Board to use
        #[arg(short, long, help = board_help())]
        board: BoardKind,

        /// Payload as hex bytes
        #[arg(long)]
        hex: HexPayload,

        /// Send the payload this many times
        #[arg(short, long, default_value_t = 1)]
        repeat: u64,

        /// Give up after this many seconds
        #[arg(long, default_value_t = 10)]
        timeout: u64,
    },

    /// Run frames through the in-memory loopback peer and verify them
    Loopback {
        /// Number of frames
        #[arg(short, long, default_value_t = 64)]
        frames: usize,

        /// Payload size in bytes
        #[arg(short, long, default_value_t = 1500)]
        size: usize,
    },

    /// List available boards
    ListBoards,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_bytes() {
        assert_eq!(parse_hex_bytes("deadBEEF"), Ok(vec![0xDE, 0xAD, 0xBE, 0xEF]));
        assert_eq!(parse_hex_bytes("0x01:02 03"), Ok(vec![1, 2, 3]));
        assert!(parse_hex_bytes("").is_err());
        assert!(parse_hex_bytes("abc").is_err());
        assert!(parse_hex_bytes("zz").is_err());
        assert!(parse_hex_bytes("é1").is_err());
    }
}

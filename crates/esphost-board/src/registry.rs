//! Board registry
//!
//! Maps board names given on the command line to the backends compiled in.

use crate::error::{BoardError, Result};

/// Board backends this build knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardKind {
    /// spidev + GPIO character device
    #[cfg(feature = "linux")]
    Linux,
    /// In-memory peer
    #[cfg(feature = "dummy")]
    Dummy,
}

impl BoardKind {
    /// Resolve a board name or alias
    pub fn from_name(name: &str) -> Result<Self> {
        available_boards()
            .into_iter()
            .find(|b| b.name == name || b.aliases.contains(&name))
            .map(|b| b.kind)
            .ok_or_else(|| BoardError::UnknownBoard(name.to_string()))
    }
}

impl std::str::FromStr for BoardKind {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

/// Information about a board backend
#[derive(Debug, Clone, Copy)]
pub struct BackendInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
    /// Backend selected by this name
    pub kind: BoardKind,
}

/// Get information about all available boards (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_boards() -> Vec<BackendInfo> {
    let mut boards = Vec::new();

    #[cfg(feature = "linux")]
    boards.push(BackendInfo {
        name: "linux",
        aliases: &["spidev"],
        description: "ESP32 on /dev/spidev0.0, handshake on /dev/gpiochip0 line 22",
        kind: BoardKind::Linux,
    });

    #[cfg(feature = "dummy")]
    boards.push(BackendInfo {
        name: "dummy",
        aliases: &["loopback"],
        description: "In-memory loopback peer for testing",
        kind: BoardKind::Dummy,
    });

    boards
}

/// Generate a short list of board names for CLI help
pub fn board_names_short() -> String {
    let boards = available_boards();
    if boards.is_empty() {
        return "none (recompile with features)".to_string();
    }
    let names: Vec<&str> = boards.iter().map(|b| b.name).collect();
    names.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_board() {
        assert!(matches!(
            BoardKind::from_name("esp8266"),
            Err(BoardError::UnknownBoard(name)) if name == "esp8266"
        ));
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_alias_resolves() {
        assert_eq!(BoardKind::from_name("loopback").unwrap(), BoardKind::Dummy);
        assert_eq!("dummy".parse::<BoardKind>().unwrap(), BoardKind::Dummy);
    }

    #[cfg(feature = "linux")]
    #[test]
    fn test_names_listed() {
        assert!(board_names_short().contains("linux"));
    }
}

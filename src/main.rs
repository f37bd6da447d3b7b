//! esphost - Host side of an ESP32 SPI network co-processor link
//!
//! Brings the SPI frame transport up on a board, then streams frames in
//! either direction from the command line.
//!
//! # Architecture
//!
//! Boards are selected by name and implement
//! [`Platform`](esphost_core::platform::Platform):
//! - **linux** - the ESP32 on spidev, handshake on a GPIO character device
//! - **dummy** - an in-memory peer that echoes every exchange
//!
//! The commands are generic over the platform, so they behave the same on
//! both.

mod adapter;
mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use esphost_board::BoardKind;

use std::time::Duration;

/// Evaluate `$run` with `$platform` bound to the board selected by `$kind`
macro_rules! on_board {
    ($kind:expr, |$platform:ident| $run:expr) => {
        match $kind {
            #[cfg(feature = "linux")]
            BoardKind::Linux => {
                let $platform = esphost_board::LinuxBoard::new();
                $run
            }
            #[cfg(feature = "dummy")]
            BoardKind::Dummy => {
                let $platform = commands::dummy_board();
                $run
            }
        }
    };
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    match cli.command {
        Commands::Listen { board, count } => {
            on_board!(board, |platform| commands::listen::run(platform, count))
        }
        Commands::Send {
            board,
            hex,
            repeat,
            timeout,
        } => {
            let timeout = Duration::from_secs(timeout);
            on_board!(board, |platform| commands::send::run(
                platform, &hex.0, repeat, timeout
            ))
        }
        #[cfg(feature = "dummy")]
        Commands::Loopback { frames, size } => commands::loopback::run(frames, size),
        #[cfg(not(feature = "dummy"))]
        Commands::Loopback { .. } => Err("loopback needs the dummy board (feature \"dummy\")".into()),
        Commands::ListBoards => {
            commands::list_boards();
            Ok(())
        }
    }
}

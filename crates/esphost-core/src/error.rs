//! Error types for esphost-core

use crate::transport::Step;
use thiserror::Error;

/// Boxed error coming out of a platform backend or an adapter collaborator
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Why an inbound frame was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Buffer is shorter than a frame header
    #[error("frame of {len} bytes is shorter than the header")]
    Truncated {
        /// Bytes available
        len: usize,
    },
    /// Payload offset does not point right past the header
    #[error("bad payload offset {offset}")]
    BadOffset {
        /// Offset found in the header
        offset: u16,
    },
    /// Length field is zero
    #[error("empty payload")]
    EmptyPayload,
    /// Header plus payload does not fit in a frame
    #[error("payload length {len} exceeds frame size")]
    Oversized {
        /// Length found in the header
        len: u16,
    },
}

/// Transport error taxonomy
#[derive(Debug, Error)]
pub enum Error {
    /// Rejected synchronously, nothing was changed
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A frame buffer could not be obtained
    #[error("failed to allocate {size} byte frame buffer")]
    AllocationFailure {
        /// Requested buffer size
        size: usize,
    },

    /// Inbound frame failed validation
    #[error("invalid frame: {0}")]
    ValidationFailure(#[from] FrameError),

    /// The full-duplex exchange reported an error
    #[error("SPI transaction failed: {0}")]
    BusTransactionFailure(#[source] BoxError),

    /// A lifecycle resource could not be acquired
    #[error("failed to acquire {step}: {source}")]
    ResourceAcquisitionFailure {
        /// Step that failed
        step: Step,
        /// Underlying backend error
        #[source]
        source: BoxError,
    },
}

const EIO: i32 = 5;
const ENOMEM: i32 = 12;
const EFAULT: i32 = 14;
const ENODEV: i32 = 19;
const EINVAL: i32 = 22;

impl Error {
    /// Negative errno-style status for callers that still speak status codes
    pub fn errno(&self) -> i32 {
        let code = match self {
            Self::InvalidArgument(_) | Self::ValidationFailure(_) => EINVAL,
            Self::AllocationFailure { .. } => ENOMEM,
            Self::BusTransactionFailure(_) => EIO,
            Self::ResourceAcquisitionFailure { step, .. } => match step {
                Step::Work => EFAULT,
                Step::Device => ENODEV,
                _ => EIO,
            },
        };
        -code
    }

    /// Lifecycle step that failed, if this is an acquisition failure
    pub fn step(&self) -> Option<Step> {
        match self {
            Self::ResourceAcquisitionFailure { step, .. } => Some(*step),
            _ => None,
        }
    }
}

/// Result type alias using the transport Error type
pub type Result<T> = std::result::Result<T, Error>;

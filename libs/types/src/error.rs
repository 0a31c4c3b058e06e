//! Protocol-level status and errors for layered frame processing
//!
//! Every failure a layer can report carries enough context to debug the
//! frame that produced it. [`ProtocolError::status`] collapses the detail
//! into the coarse [`Status`] taxonomy that the processing loop acts on.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;
use thiserror::Error;

/// Coarse outcome of a read, write or update through a protocol stack
///
/// `Success` and `UpdateRequired` are the only non-error values. The numeric
/// representation is stable so it can be reported in counters and logs.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, IntoPrimitive, TryFromPrimitive)]
pub enum Status {
    /// Operation completed, handle (if any) is populated
    Success = 0,
    /// Write completed but a field still holds a placeholder
    UpdateRequired = 1,
    /// Input ended before the frame did; retry later from the same position
    NotEnoughData = 2,
    /// Framing is broken: bad marker, bad size or checksum mismatch
    ProtocolError = 3,
    /// No registered message matches the identifier on the wire
    InvalidMsgId = 4,
    /// A field value was rejected by message validation
    InvalidData = 5,
    /// Output cannot hold the encoded frame
    BufferOverflow = 6,
}

impl Status {
    /// All statuses in numeric order
    pub const ALL: [Status; 7] = [
        Status::Success,
        Status::UpdateRequired,
        Status::NotEnoughData,
        Status::ProtocolError,
        Status::InvalidMsgId,
        Status::InvalidData,
        Status::BufferOverflow,
    ];

    /// Whether this status represents a failed operation
    pub fn is_error(self) -> bool {
        !matches!(self, Status::Success | Status::UpdateRequired)
    }

    pub fn name(self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::UpdateRequired => "update_required",
            Status::NotEnoughData => "not_enough_data",
            Status::ProtocolError => "protocol_error",
            Status::InvalidMsgId => "invalid_msg_id",
            Status::InvalidData => "invalid_data",
            Status::BufferOverflow => "buffer_overflow",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Layer and message errors with diagnostic context
///
/// Context strings are `&'static str` because `NotEnoughData` is raised on
/// every partial read of a streaming connection.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProtocolError {
    /// Buffer ends before the structure being read
    #[error("Not enough data: need {need} bytes, got {got} (context: {context})")]
    NotEnoughData {
        need: usize,
        got: usize,
        context: &'static str,
    },

    /// Sync marker did not match the configured value
    #[error("Invalid sync marker: expected {expected:#x}, got {actual:#x} ({width} bytes, indicates: {diagnosis})")]
    InvalidSync {
        expected: u64,
        actual: u64,
        width: usize,
        diagnosis: &'static str,
    },

    /// Size field holds a value no valid frame can have
    #[error("Malformed size field: {value} outside accepted range {min}..={max}")]
    MalformedSize { value: u64, min: u64, max: u64 },

    /// Inner layers ran out of bytes inside a complete sized window
    #[error("Size field declared {declared} bytes but inner layers needed {need} (context: {context})")]
    SizeMismatch {
        declared: usize,
        need: usize,
        context: &'static str,
    },

    /// Trailing checksum does not match the covered bytes
    #[error("Checksum mismatch: expected {expected:#x}, calculated {calculated:#x} over {covered} bytes (cause: {likely_cause})")]
    ChecksumMismatch {
        expected: u64,
        calculated: u64,
        covered: usize,
        likely_cause: &'static str,
    },

    /// Identifier has no registered constructor
    #[error("Unknown message id {id:#x}: {registered} message types registered")]
    InvalidMsgId { id: u64, registered: usize },

    /// Payload layer reached without a message to fill
    #[error("No message object available for payload (context: {context})")]
    MissingMessage { context: &'static str },

    /// A field value was rejected during read or write
    #[error("Invalid data in {message}: {reason}")]
    InvalidData {
        message: &'static str,
        reason: String,
    },

    /// Output has no room for the bytes being written
    #[error("Buffer overflow: need {need} bytes, {available} available (context: {context})")]
    BufferOverflow {
        need: usize,
        available: usize,
        context: &'static str,
    },

    /// In-place allocation slot still owned by a live message
    #[error("Allocation slot already holds a live {occupant} message; drop the previous handle first")]
    SlotOccupied { occupant: &'static str },

    /// Stack assembled with values that cannot be represented on the wire
    #[error("Invalid stack configuration: {0}")]
    InvalidConfig(String),

    /// Underlying writer failed
    #[error("Output I/O failed: {0}")]
    Io(String),
}

impl ProtocolError {
    /// Create NotEnoughData error with diagnostic context
    pub fn not_enough_data(need: usize, got: usize, context: &'static str) -> Self {
        Self::NotEnoughData { need, got, context }
    }

    /// Create InvalidSync error, diagnosing the most likely cause from the bytes seen
    pub fn invalid_sync(expected: u64, actual: u64, width: usize) -> Self {
        let all_ones = if width >= 8 {
            u64::MAX
        } else {
            (1u64 << (width * 8)) - 1
        };
        let diagnosis = if actual == 0 {
            "idle line or uninitialized buffer"
        } else if actual == all_ones {
            "corrupted buffer or line noise"
        } else if width > 1 && swap_width(actual, width) == expected {
            "byte order (endianness) mismatch"
        } else {
            "stream is not aligned to a frame boundary"
        };

        Self::InvalidSync {
            expected,
            actual,
            width,
            diagnosis,
        }
    }

    /// Create ChecksumMismatch error with a guess at the cause
    pub fn checksum_mismatch(expected: u64, calculated: u64, covered: usize) -> Self {
        let likely_cause = if expected == 0 {
            "frame written without its update pass"
        } else {
            "data corruption during transmission"
        };

        Self::ChecksumMismatch {
            expected,
            calculated,
            covered,
            likely_cause,
        }
    }

    pub fn invalid_data(message: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidData {
            message,
            reason: reason.into(),
        }
    }

    pub fn buffer_overflow(need: usize, available: usize, context: &'static str) -> Self {
        Self::BufferOverflow {
            need,
            available,
            context,
        }
    }

    /// Map this error onto the coarse status taxonomy
    pub fn status(&self) -> Status {
        match self {
            Self::NotEnoughData { .. } => Status::NotEnoughData,
            Self::InvalidSync { .. }
            | Self::MalformedSize { .. }
            | Self::SizeMismatch { .. }
            | Self::ChecksumMismatch { .. }
            | Self::SlotOccupied { .. }
            | Self::InvalidConfig(_) => Status::ProtocolError,
            Self::InvalidMsgId { .. } | Self::MissingMessage { .. } => Status::InvalidMsgId,
            Self::InvalidData { .. } => Status::InvalidData,
            Self::BufferOverflow { .. } | Self::Io(_) => Status::BufferOverflow,
        }
    }

    /// The same read may succeed once more input arrives
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NotEnoughData { .. })
    }

    /// The input at the current position is garbage and must be skipped
    ///
    /// Slot occupancy and configuration errors are caller contract
    /// violations, so dropping input bytes would not fix them.
    pub fn is_resync(&self) -> bool {
        match self {
            Self::SlotOccupied { .. } | Self::InvalidConfig(_) | Self::Io(_) => false,
            Self::BufferOverflow { .. } => false,
            other => other.status().is_error() && !other.is_retryable(),
        }
    }
}

fn swap_width(value: u64, width: usize) -> u64 {
    value.swap_bytes() >> (64 - width * 8)
}

impl From<std::io::Error> for ProtocolError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type for protocol operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;

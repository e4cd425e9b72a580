/// Terminal outcomes of a single file transfer
use std::fmt;

/// Why a transfer was skipped without writing anything
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Local file already has the remote size
    AlreadyComplete,

    /// The URL yields no usable file name (empty, `.` or `..`)
    InvalidName,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyComplete => "already_complete",
            Self::InvalidName => "invalid_name",
        }
    }
}

/// Final state of one download
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Stream ran to the end
    Completed {
        /// Bytes written during the final attempt
        bytes_written: u64,
        /// Offset the final attempt resumed from, if it appended
        resumed_from: Option<u64>,
    },

    Skipped(SkipReason),

    /// Retries exhausted or a non-retryable error occurred
    Failed { cause: String },

    Cancelled,
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn bytes_written(&self) -> u64 {
        match self {
            Self::Completed { bytes_written, .. } => *bytes_written,
            _ => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed { .. } => "completed",
            Self::Skipped(_) => "skipped",
            Self::Failed { .. } => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for DownloadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed {
                bytes_written,
                resumed_from: Some(offset),
            } => write!(f, "completed ({} bytes, resumed at {})", bytes_written, offset),
            Self::Completed { bytes_written, .. } => write!(f, "completed ({} bytes)", bytes_written),
            Self::Skipped(reason) => write!(f, "skipped ({})", reason.as_str()),
            Self::Failed { cause } => write!(f, "failed: {}", cause),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

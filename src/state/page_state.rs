/// Listing page status definitions for tracking traversal progress
///
/// Every visited or skipped listing page ends in one of these states.
use std::fmt;

/// Represents the state of a listing page in the traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageStatus {
    // ===== Active States =====
    /// Page was discovered and waits on the worklist
    Pending,

    // ===== Terminal Success States =====
    /// Page was fetched and its entries dispatched
    Success,

    // ===== Terminal Skip States =====
    /// Page sits one level below the depth bound and was never requested
    DepthExceeded,

    // ===== Terminal Error States =====
    /// Page never answered 200 within the retry budget, or its folder
    /// could not be created
    Failed,

    /// Traversal was cancelled before or while this page was fetched
    Cancelled,
}

impl PageStatus {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Returns true if this represents a successful visit
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns true if this represents an error state
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::DepthExceeded => "depth_exceeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

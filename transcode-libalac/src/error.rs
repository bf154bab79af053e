//! LibALAC session error types.

use std::fmt;
use thiserror::Error;

use crate::backend::Role;
use crate::session::SessionState;

/// Native entry point a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `InitializeEncoder`.
    InitializeEncoder,
    /// `InitializeDecoder`.
    InitializeDecoder,
    /// `Encode`.
    Encode,
    /// `Decode`.
    Decode,
    /// `FinishEncoder`.
    FinishEncoder,
    /// `FinishDecoder`.
    FinishDecoder,
    /// `GetMagicCookieSize`.
    GetMagicCookieSize,
    /// `GetMagicCookie`.
    GetMagicCookie,
    /// `ParseMagicCookie`.
    ParseMagicCookie,
}

impl Operation {
    /// Exported symbol name of the entry point.
    pub fn name(&self) -> &'static str {
        match self {
            Self::InitializeEncoder => "InitializeEncoder",
            Self::InitializeDecoder => "InitializeDecoder",
            Self::Encode => "Encode",
            Self::Decode => "Decode",
            Self::FinishEncoder => "FinishEncoder",
            Self::FinishDecoder => "FinishDecoder",
            Self::GetMagicCookieSize => "GetMagicCookieSize",
            Self::GetMagicCookie => "GetMagicCookie",
            Self::ParseMagicCookie => "ParseMagicCookie",
        }
    }

    pub(crate) fn initialize(role: Role) -> Self {
        match role {
            Role::Encode => Self::InitializeEncoder,
            Role::Decode => Self::InitializeDecoder,
        }
    }

    pub(crate) fn process(role: Role) -> Self {
        match role {
            Role::Encode => Self::Encode,
            Role::Decode => Self::Decode,
        }
    }

    pub(crate) fn finish(role: Role) -> Self {
        match role {
            Role::Encode => Self::FinishEncoder,
            Role::Decode => Self::FinishDecoder,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// LibALAC session error.
#[derive(Debug, Error)]
pub enum LibAlacError {
    /// Backend refused to open a session. The session is permanently unusable.
    #[error("{operation} failed with status {status}")]
    Initialization {
        /// Failing entry point.
        operation: Operation,
        /// Backend status code.
        status: i32,
    },

    /// Backend rejected a packet. The session stays usable.
    #[error("{operation} failed with status {status}")]
    Processing {
        /// Failing entry point.
        operation: Operation,
        /// Backend status code.
        status: i32,
    },

    /// Magic cookie query, fill or parse failed.
    #[error("{operation} failed with status {status}")]
    MagicCookie {
        /// Failing entry point.
        operation: Operation,
        /// Backend status code, or the offending length.
        status: i32,
    },

    /// Backend reported a nonzero status while closing a session.
    #[error("{operation} failed with status {status}")]
    Finalization {
        /// Failing entry point.
        operation: Operation,
        /// Backend status code.
        status: i32,
    },

    /// Native library or one of its symbols could not be loaded.
    #[error("Failed to load native library {path}: {message}")]
    LibraryLoad {
        /// Library path that was tried.
        path: String,
        /// Loader message.
        message: String,
    },

    /// Operation called on a session that is not open.
    #[error("{operation} called on a session in {state:?} state")]
    InvalidState {
        /// Entry point that was requested.
        operation: Operation,
        /// State the session was in.
        state: SessionState,
    },

    /// The process-wide backend selector was already fixed.
    #[error("Backend selector already installed for this process")]
    SelectorInstalled,

    /// Buffer length does not fit the backend's 32-bit length argument.
    #[error("{operation}: buffer of {len} bytes exceeds the backend length limit")]
    BufferTooLarge {
        /// Entry point that would have received the buffer.
        operation: Operation,
        /// Buffer length in bytes.
        len: usize,
    },
}

impl LibAlacError {
    /// Map a backend status to the failure kind scoped by `operation`.
    pub fn from_status(operation: Operation, status: i32) -> Self {
        match operation {
            Operation::InitializeEncoder | Operation::InitializeDecoder => {
                Self::Initialization { operation, status }
            }
            Operation::Encode | Operation::Decode => Self::Processing { operation, status },
            Operation::GetMagicCookieSize
            | Operation::GetMagicCookie
            | Operation::ParseMagicCookie => Self::MagicCookie { operation, status },
            Operation::FinishEncoder | Operation::FinishDecoder => {
                Self::Finalization { operation, status }
            }
        }
    }

    /// Failing entry point, if the error came from a backend call.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::Initialization { operation, .. }
            | Self::Processing { operation, .. }
            | Self::MagicCookie { operation, .. }
            | Self::Finalization { operation, .. }
            | Self::InvalidState { operation, .. }
            | Self::BufferTooLarge { operation, .. } => Some(*operation),
            Self::LibraryLoad { .. } | Self::SelectorInstalled => None,
        }
    }

    /// Backend status code, if any.
    pub fn status(&self) -> Option<i32> {
        match self {
            Self::Initialization { status, .. }
            | Self::Processing { status, .. }
            | Self::MagicCookie { status, .. }
            | Self::Finalization { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if the session that produced this error can no longer be used.
    #[must_use]
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, Self::Initialization { .. })
    }
}

/// LibALAC result type.
pub type Result<T> = std::result::Result<T, LibAlacError>;

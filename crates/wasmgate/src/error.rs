use std::time::Duration;

use thiserror::Error;

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Coarse classification used by callers to pick a transport-level response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedModule,
    Instantiation,
    Timeout,
    Cancelled,
}

/// Invocation stage at which an error surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    Build,
    Instantiate,
    Execute,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("module is {size} bytes, exceeding the {limit} byte limit")]
    ModuleTooLarge { size: usize, limit: usize },

    /// Bytecode failed to parse or validate.
    #[error("malformed module: {0}")]
    Malformed(#[source] anyhow::Error),

    /// Environment entry the WASI `environ` encoding cannot carry.
    #[error("invalid environment entry {key:?}: {reason}")]
    InvalidEnvironment { key: String, reason: &'static str },

    /// Linker or store setup failed.
    #[error("sandbox setup failed: {0}")]
    Sandbox(#[source] anyhow::Error),

    /// Imports could not be satisfied or initial resources were refused.
    #[error("instantiation failed: {0}")]
    Instantiate(#[source] anyhow::Error),

    /// Guest called `proc_exit` with a non-zero status.
    #[error("guest exited with status {0}")]
    Exit(i32),

    /// Guest wrote more to stdout than the output limit allows.
    #[error("guest output exceeded the {limit} byte limit")]
    OutputLimit { limit: usize },

    #[error("guest trapped: {0}")]
    Trap(#[source] anyhow::Error),

    #[error("invocation exceeded its deadline of {0:?}")]
    Timeout(Duration),

    #[error("invocation cancelled")]
    Cancelled,
}

impl Error {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ModuleTooLarge { .. } | Self::Malformed(_) => ErrorKind::MalformedModule,
            Self::InvalidEnvironment { .. }
            | Self::Sandbox(_)
            | Self::Instantiate(_)
            | Self::Exit(_)
            | Self::OutputLimit { .. }
            | Self::Trap(_) => ErrorKind::Instantiation,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::ModuleTooLarge { .. } | Self::Malformed(_) => Stage::Validate,
            Self::InvalidEnvironment { .. } | Self::Sandbox(_) => Stage::Build,
            Self::Instantiate(_) => Stage::Instantiate,
            Self::Exit(_)
            | Self::OutputLimit { .. }
            | Self::Trap(_)
            | Self::Timeout(_)
            | Self::Cancelled => Stage::Execute,
        }
    }
}

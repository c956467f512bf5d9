use std::sync::Arc;

use tracing::event;

use crate::TRACE_TARGET_GUEST;

/// Diagnostic emitted on behalf of a guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuestRecord<'a> {
    /// `log_i32` call.
    Int(u32),
    /// `log_string` call, decoded lossily as UTF-8.
    Text(&'a str),
    /// `log_string` call whose range fell outside guest memory.
    OutOfBounds { ptr: u32, len: u32 },
    /// Bytes the guest wrote to stderr during the run.
    Stderr(&'a str),
}

impl core::fmt::Display for GuestRecord<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(text) | Self::Stderr(text) => f.write_str(text),
            Self::OutOfBounds { ptr, len } => {
                write!(f, "log_string: unable to read wasm memory ({len} bytes at {ptr:#x})")
            }
        }
    }
}

/// Destination for guest diagnostics.
///
/// Handed to each sandbox explicitly so that callers can capture
/// diagnostics per invocation.
pub trait GuestLog: Send + Sync + 'static {
    fn log(&self, module: &str, record: GuestRecord<'_>);
}

impl<T: GuestLog + ?Sized> GuestLog for Arc<T> {
    fn log(&self, module: &str, record: GuestRecord<'_>) {
        (**self).log(module, record);
    }
}

/// Forwards guest diagnostics to `tracing` under [`TRACE_TARGET_GUEST`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl GuestLog for TracingLog {
    fn log(&self, module: &str, record: GuestRecord<'_>) {
        match record {
            GuestRecord::Int(value) => event!(
                name: "log",
                target: TRACE_TARGET_GUEST,
                tracing::Level::INFO,
                guest.module = module,
                guest.value = value,
            ),
            GuestRecord::Text(text) => event!(
                name: "log",
                target: TRACE_TARGET_GUEST,
                tracing::Level::INFO,
                guest.module = module,
                guest.output = text,
            ),
            GuestRecord::Stderr(text) => event!(
                name: "stderr",
                target: TRACE_TARGET_GUEST,
                tracing::Level::DEBUG,
                guest.module = module,
                guest.output = text,
            ),
            GuestRecord::OutOfBounds { ptr, len } => event!(
                name: "bounds_violation",
                target: TRACE_TARGET_GUEST,
                tracing::Level::WARN,
                guest.module = module,
                guest.ptr = ptr,
                guest.len = len,
                "log_string: unable to read wasm memory",
            ),
        }
    }
}

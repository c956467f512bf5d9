mod internal;

pub mod cancel;
pub mod engine;
pub mod env;
pub mod error;
pub mod log;
pub mod output;

/// Tracing target for guest diagnostics and invocation spans.
pub const TRACE_TARGET_GUEST: &str = "wasmgate::guest";

/// Import namespace under which the host function bridge is registered.
pub const HOST_MODULE: &str = "env";

pub use cancel::CancelToken;
pub use engine::{EngineConfig, InvocationEngine, InvokeOptions};
pub use env::Environment;
pub use error::{Error, ErrorKind, Result, Stage};
pub use log::{GuestLog, GuestRecord, TracingLog};
pub use output::CapturedOutput;

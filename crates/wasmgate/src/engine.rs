//! Invocation engine: one fresh sandbox per call.
//!
//! Typical flow:
//! 1. Build an [`InvocationEngine`] once from an [`EngineConfig`].
//! 2. Call [`InvocationEngine::invoke`] per request with the guest bytecode and
//!    its [`Environment`].
//! 3. Use the returned bytes as the response body, or map the
//!    [`Error::kind`](crate::Error::kind) to a transport status.
//!
//! The store, linker and output sinks of an invocation are dropped before
//! `invoke` returns. Compilation runs on a blocking worker, and the deadline
//! and cancellation token cover it as well as guest execution.

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use tracing::{Instrument, debug, info_span};
use wasmtime::{Config, Engine, Module};

use crate::{
    CancelToken, GuestLog, TRACE_TARGET_GUEST, TracingLog,
    env::Environment,
    error::{Error, Result},
    internal::{
        configure::configure_engine,
        epoch::{EpochRegistration, global_epoch_ticker},
        sandbox::{Sandbox, SandboxConfig},
    },
};

/// Resource ceilings applied to every invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub max_module_bytes: usize,
    pub max_memory_bytes: usize,
    pub max_output_bytes: usize,
    pub max_stderr_bytes: usize,
    /// Deadline used when [`InvokeOptions::deadline`] is unset.
    pub default_deadline: Option<Duration>,
}

impl EngineConfig {
    pub const DEFAULT_MAX_MODULE_BYTES: usize = 64 * 1024 * 1024;
    pub const DEFAULT_MAX_MEMORY_BYTES: usize = 64 * 1024 * 1024;
    pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 16 * 1024 * 1024;
    pub const DEFAULT_MAX_STDERR_BYTES: usize = 64 * 1024;

    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_module_bytes: Self::DEFAULT_MAX_MODULE_BYTES,
            max_memory_bytes: Self::DEFAULT_MAX_MEMORY_BYTES,
            max_output_bytes: Self::DEFAULT_MAX_OUTPUT_BYTES,
            max_stderr_bytes: Self::DEFAULT_MAX_STDERR_BYTES,
            default_deadline: None,
        }
    }

    #[must_use]
    pub const fn max_module_bytes(mut self, bytes: usize) -> Self {
        self.max_module_bytes = bytes;
        self
    }

    #[must_use]
    pub const fn max_memory_bytes(mut self, bytes: usize) -> Self {
        self.max_memory_bytes = bytes;
        self
    }

    #[must_use]
    pub const fn max_output_bytes(mut self, bytes: usize) -> Self {
        self.max_output_bytes = bytes;
        self
    }

    #[must_use]
    pub const fn max_stderr_bytes(mut self, bytes: usize) -> Self {
        self.max_stderr_bytes = bytes;
        self
    }

    #[must_use]
    pub const fn default_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.default_deadline = deadline;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-call knobs accompanying the environment.
#[derive(Clone, Default)]
pub struct InvokeOptions {
    pub deadline: Option<Duration>,
    pub cancel: Option<CancelToken>,
    /// Overrides the engine's logger for this call.
    pub log: Option<Arc<dyn GuestLog>>,
}

impl InvokeOptions {
    #[must_use]
    pub const fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    #[must_use]
    pub fn log(mut self, log: Arc<dyn GuestLog>) -> Self {
        self.log = Some(log);
        self
    }
}

impl core::fmt::Debug for InvokeOptions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InvokeOptions")
            .field("deadline", &self.deadline)
            .field("cancel", &self.cancel)
            .field("log", &self.log.as_ref().map(|_| "<log>"))
            .finish()
    }
}

pub struct InvocationEngine {
    engine: Engine,
    config: EngineConfig,
    log: Arc<dyn GuestLog>,
    _ticker: EpochRegistration,
}

impl InvocationEngine {
    /// Creates an engine that reports guest diagnostics through `tracing`.
    ///
    /// # Errors
    /// Returns an error if the wasmtime engine or the epoch ticker cannot be
    /// started.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_log(config, Arc::new(TracingLog))
    }

    /// Creates an engine that reports guest diagnostics to `log`.
    ///
    /// # Errors
    /// Returns an error if the wasmtime engine or the epoch ticker cannot be
    /// started.
    pub fn with_log(config: EngineConfig, log: Arc<dyn GuestLog>) -> Result<Self> {
        let mut cfg = Config::new();
        configure_engine(&mut cfg);
        let engine = Engine::new(&cfg).map_err(Error::Sandbox)?;
        let ticker = global_epoch_ticker()
            .map_err(|e| Error::Sandbox(e.into()))?
            .register(engine.clone());

        Ok(Self {
            engine,
            config,
            log,
            _ticker: ticker,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs `wasm` once in a fresh sandbox and returns what it wrote to stdout.
    ///
    /// `module` tags diagnostics and becomes the guest's `argv[0]`.
    ///
    /// # Errors
    /// Returns an error if the bytecode is rejected, the sandbox cannot be
    /// built or instantiated, the guest fails, or the call is cut short by its
    /// deadline or cancellation token. No output is returned on error.
    pub async fn invoke(
        &self,
        module: &str,
        wasm: &[u8],
        env: &Environment,
        options: InvokeOptions,
    ) -> Result<Bytes> {
        let span = info_span!(target: TRACE_TARGET_GUEST, "invoke", module, size = wasm.len());
        self.invoke_inner(module, wasm, env, options)
            .instrument(span)
            .await
    }

    async fn invoke_inner(
        &self,
        module: &str,
        wasm: &[u8],
        env: &Environment,
        options: InvokeOptions,
    ) -> Result<Bytes> {
        if wasm.len() > self.config.max_module_bytes {
            return Err(Error::ModuleTooLarge {
                size: wasm.len(),
                limit: self.config.max_module_bytes,
            });
        }

        let deadline = options.deadline.or(self.config.default_deadline);
        let log = options.log.unwrap_or_else(|| Arc::clone(&self.log));
        run_until(
            self.execute(module, wasm, env, log),
            deadline,
            options.cancel.as_ref(),
        )
        .await
    }

    async fn execute(
        &self,
        module: &str,
        wasm: &[u8],
        env: &Environment,
        log: Arc<dyn GuestLog>,
    ) -> Result<Bytes> {
        let compiled = compile(&self.engine, wasm).await?;

        let (mut sandbox, stdout) = Sandbox::build(
            &self.engine,
            SandboxConfig {
                module,
                env,
                log,
                max_memory: self.config.max_memory_bytes,
                max_output: self.config.max_output_bytes,
                max_stderr: self.config.max_stderr_bytes,
            },
        )?;

        let result = sandbox.run(&compiled).await;
        debug!(
            target: TRACE_TARGET_GUEST,
            memory = sandbox.memory_usage(),
            ok = result.is_ok(),
            "guest finished"
        );
        drop(sandbox);
        result?;

        if stdout.overflowed() {
            return Err(Error::OutputLimit {
                limit: stdout.capacity(),
            });
        }
        Ok(stdout.contents())
    }
}

/// Compiles `wasm` on a blocking worker, off the async executor.
///
/// An abandoned compile runs to completion in the background and is discarded.
async fn compile(engine: &Engine, wasm: &[u8]) -> Result<Module> {
    let engine = engine.clone();
    let wasm = wasm.to_vec();
    tokio::task::spawn_blocking(move || Module::new(&engine, &wasm))
        .await
        .map_err(|e| Error::Sandbox(e.into()))?
        .map_err(Error::Malformed)
}

/// Drives `run` until it finishes, `deadline` elapses or `cancel` fires.
///
/// Losing the race drops `run`, abandoning the guest mid-execution.
async fn run_until<T>(
    run: impl Future<Output = Result<T>>,
    deadline: Option<Duration>,
    cancel: Option<&CancelToken>,
) -> Result<T> {
    let expired = async {
        match deadline {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending().await,
        }
    };
    let cancelled = async {
        match cancel {
            Some(token) => token.cancelled().await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        result = run => result,
        () = expired => Err(Error::Timeout(deadline.unwrap_or_default())),
        () = cancelled => Err(Error::Cancelled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let cfg = EngineConfig::new()
            .max_module_bytes(1)
            .max_memory_bytes(2)
            .max_output_bytes(3)
            .max_stderr_bytes(4)
            .default_deadline(Some(Duration::from_secs(5)));
        assert_eq!(cfg.max_module_bytes, 1);
        assert_eq!(cfg.max_memory_bytes, 2);
        assert_eq!(cfg.max_output_bytes, 3);
        assert_eq!(cfg.max_stderr_bytes, 4);
        assert_eq!(cfg.default_deadline, Some(Duration::from_secs(5)));
        assert_eq!(EngineConfig::default(), EngineConfig::new());
    }

    #[tokio::test]
    async fn run_until_reports_deadline() {
        let err = run_until(
            std::future::pending::<Result<()>>(),
            Some(Duration::from_millis(10)),
            None,
        )
        .await
        .expect_err("deadline must fire");
        assert!(matches!(err, Error::Timeout(d) if d == Duration::from_millis(10)));
    }

    #[tokio::test]
    async fn run_until_reports_cancellation() {
        let token = CancelToken::new();
        token.cancel();
        let err = run_until(std::future::pending::<Result<()>>(), None, Some(&token))
            .await
            .expect_err("cancellation must fire");
        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test]
    async fn run_until_passes_through_completion() {
        run_until(async { Ok(()) }, Some(Duration::from_secs(5)), None)
            .await
            .expect("completed run");
    }
}

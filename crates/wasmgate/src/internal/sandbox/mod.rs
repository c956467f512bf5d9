mod bridge;
mod state;

use std::sync::Arc;

use tracing::debug;
use wasmtime::{Engine, Linker, Module, Store};
use wasmtime_wasi::I32Exit;

pub use state::SandboxState;

use crate::{
    GuestLog, GuestRecord, TRACE_TARGET_GUEST,
    env::Environment,
    error::{Error, Result},
    output::CapturedOutput,
};

const ENTRY_POINT: &str = "_start";

/// Per-invocation inputs for one sandbox.
pub struct SandboxConfig<'a> {
    pub module: &'a str,
    pub env: &'a Environment,
    pub log: Arc<dyn GuestLog>,
    pub max_memory: usize,
    pub max_output: usize,
    pub max_stderr: usize,
}

/// One isolated guest execution environment.
///
/// Dropping the sandbox releases the store, its linear memory and its WASI
/// context. Anything the guest wrote to stderr is forwarded to the log first.
pub struct Sandbox {
    store: Store<SandboxState>,
    linker: Linker<SandboxState>,
    stderr: CapturedOutput,
}

impl Sandbox {
    /// Builds a fresh sandbox and returns it with the sink for the guest's stdout.
    ///
    /// # Errors
    /// Returns an error if the environment cannot be encoded or the linker
    /// cannot be assembled.
    pub fn build(engine: &Engine, config: SandboxConfig<'_>) -> Result<(Self, CapturedOutput)> {
        config.env.validate()?;

        let linker = SandboxState::new_linker(engine).map_err(Error::Sandbox)?;
        let stdout = CapturedOutput::new(config.max_output);
        let stderr = CapturedOutput::new(config.max_stderr);
        let mut store = SandboxState::new_store(
            engine,
            config.module,
            config.env,
            &stdout,
            &stderr,
            config.max_memory,
            config.log,
        );
        // Yield back to the executor on every epoch tick so deadlines and
        // cancellation can preempt guest code.
        store.epoch_deadline_async_yield_and_update(1);

        Ok((
            Self {
                store,
                linker,
                stderr,
            },
            stdout,
        ))
    }

    /// Instantiates `module` and runs its entry point to completion.
    ///
    /// A module that exports no `_start` completes after instantiation.
    ///
    /// # Errors
    /// Returns [`Error::Instantiate`] if imports cannot be resolved,
    /// [`Error::Exit`] for a non-zero `proc_exit` and [`Error::Trap`] for any
    /// other guest failure.
    pub async fn run(&mut self, module: &Module) -> Result<()> {
        let instance = self
            .linker
            .instantiate_async(&mut self.store, module)
            .await
            .map_err(Error::Instantiate)?;

        let Some(start) = instance.get_func(&mut self.store, ENTRY_POINT) else {
            debug!(target: TRACE_TARGET_GUEST, "module exports no {ENTRY_POINT}");
            return Ok(());
        };
        let start = start
            .typed::<(), ()>(&self.store)
            .map_err(Error::Instantiate)?;

        match start.call_async(&mut self.store, ()).await {
            Ok(()) => Ok(()),
            Err(err) => match err.downcast_ref::<I32Exit>() {
                Some(I32Exit(0)) => Ok(()),
                Some(I32Exit(code)) => Err(Error::Exit(*code)),
                None => Err(Error::Trap(err)),
            },
        }
    }

    /// Linear memory currently granted to the guest.
    pub fn memory_usage(&self) -> usize {
        self.store.data().limiter.current()
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        let stderr = self.stderr.contents();
        if stderr.is_empty() {
            return;
        }
        let state = self.store.data();
        let text = String::from_utf8_lossy(&stderr);
        state.log().log(state.module(), GuestRecord::Stderr(&text));
        if self.stderr.overflowed() {
            debug!(
                target: TRACE_TARGET_GUEST,
                dropped = self.stderr.dropped(),
                "guest stderr truncated"
            );
        }
    }
}

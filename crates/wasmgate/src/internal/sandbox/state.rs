use std::sync::Arc;

use wasmtime::{Engine, Linker, Store};
use wasmtime_wasi::{WasiCtxBuilder, p1::WasiP1Ctx};

use super::bridge;
use crate::{GuestLog, env::Environment, internal::resource::MemoryLimiter, output::CapturedOutput};

/// Store data owned by exactly one sandbox.
pub struct SandboxState {
    pub limiter: MemoryLimiter,
    wasi: WasiP1Ctx,
    module: Arc<str>,
    log: Arc<dyn GuestLog>,
}

impl SandboxState {
    /// Creates a linker exposing WASI preview1 and the host function bridge.
    ///
    /// # Errors
    ///
    /// Returns an error if any import fails to register.
    pub fn new_linker(engine: &Engine) -> anyhow::Result<Linker<Self>> {
        let mut linker = Linker::<Self>::new(engine);
        wasmtime_wasi::p1::add_to_linker_async(&mut linker, |s: &mut Self| &mut s.wasi)?;
        bridge::add_to_linker(&mut linker)?;
        Ok(linker)
    }

    /// Creates a store whose WASI view sees only `env`, writes stdout to
    /// `stdout`, and has no preopened directories or sockets.
    pub fn new_store(
        engine: &Engine,
        module: &str,
        env: &Environment,
        stdout: &CapturedOutput,
        stderr: &CapturedOutput,
        max_memory: usize,
        log: Arc<dyn GuestLog>,
    ) -> Store<Self> {
        let mut builder = WasiCtxBuilder::new();
        builder
            .arg(module)
            .stdout(stdout.clone())
            .stderr(stderr.clone())
            .allow_tcp(false)
            .allow_udp(false)
            .allow_ip_name_lookup(false);
        for (k, v) in env {
            builder.env(k, v);
        }

        let mut store = Store::new(
            engine,
            Self {
                limiter: MemoryLimiter::new(max_memory),
                wasi: builder.build_p1(),
                module: Arc::from(module),
                log,
            },
        );
        store.limiter(|s| &mut s.limiter);
        store
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn log(&self) -> &dyn GuestLog {
        self.log.as_ref()
    }
}

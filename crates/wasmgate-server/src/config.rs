use std::{path::PathBuf, str::FromStr, time::Duration};

use anyhow::Context as _;
use wasmgate::EngineConfig;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MODULE_DIR: &str = "wasm/target/wasm32-wasip1/release";
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// Directory holding `<module>.wasm` files.
    pub module_dir: PathBuf,
    pub engine: EngineConfig,
}

impl ServerConfig {
    /// Reads configuration from the process environment.
    ///
    /// # Errors
    /// Returns an error naming the variable that failed to parse.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let port = parse(&lookup, "PORT")?.unwrap_or(DEFAULT_PORT);
        let module_dir = lookup("WASMGATE_MODULE_DIR")
            .filter(|dir| !dir.is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_MODULE_DIR), PathBuf::from);

        // 0 disables the deadline.
        let timeout_ms = parse(&lookup, "WASMGATE_TIMEOUT_MS")?.unwrap_or(DEFAULT_TIMEOUT_MS);
        let deadline = (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms));

        let mut engine = EngineConfig::new().default_deadline(deadline);
        if let Some(bytes) = parse(&lookup, "WASMGATE_MAX_MODULE_BYTES")? {
            engine = engine.max_module_bytes(bytes);
        }
        if let Some(bytes) = parse(&lookup, "WASMGATE_MAX_MEMORY_BYTES")? {
            engine = engine.max_memory_bytes(bytes);
        }
        if let Some(bytes) = parse(&lookup, "WASMGATE_MAX_OUTPUT_BYTES")? {
            engine = engine.max_output_bytes(bytes);
        }

        Ok(Self {
            port,
            module_dir,
            engine,
        })
    }
}

fn parse<T>(lookup: impl Fn(&str) -> Option<String>, name: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(name)
        .filter(|value| !value.is_empty())
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .with_context(|| format!("invalid {name}: {value:?}"))
        })
        .transpose()
}

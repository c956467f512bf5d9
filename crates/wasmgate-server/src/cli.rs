use anyhow::Context as _;
use http::{HeaderMap, Method, Uri};
use tokio::io::AsyncWriteExt as _;
use tracing::info;
use wasmgate::{CancelToken, InvocationEngine, InvokeOptions};

use crate::{config::ServerConfig, modules::ModuleStore, routes::request_environment};

/// Runs `module` once as if requested with `GET /<module>?<query>` and writes
/// its output to stdout. Ctrl-C cancels the guest.
pub async fn invoke(config: &ServerConfig, module: &str, query: &str) -> anyhow::Result<()> {
    let store = ModuleStore::new(&config.module_dir);
    let wasm = store.load(module).await?;
    let engine = InvocationEngine::new(config.engine)?;

    let uri: Uri = if query.is_empty() {
        format!("http://localhost/{module}")
    } else {
        format!("http://localhost/{module}?{query}")
    }
    .parse()
    .with_context(|| format!("invalid query {query:?}"))?;
    let env = request_environment(&Method::GET, &uri, &HeaderMap::new(), None);

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted, cancelling guest");
            on_interrupt.cancel();
        }
    });

    let result = engine
        .invoke(module, &wasm, &env, InvokeOptions::default().cancel(cancel))
        .await;
    interrupt.abort();

    let output = result.with_context(|| format!("module {module} failed"))?;
    let mut stdout = tokio::io::stdout();
    stdout.write_all(&output).await?;
    stdout.flush().await?;
    Ok(())
}

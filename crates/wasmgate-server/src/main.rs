use std::{env::args, time::Duration};

use anyhow::anyhow;
use metrics_exporter_prometheus::PrometheusBuilder;
use utils::otel::init_tracing;

use crate::{config::ServerConfig, routes::AppState};

mod cli;
mod config;
mod modules;
mod routes;
mod server;
mod utils;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<()> {
    if let Err(e) = rlimit::increase_nofile_limit(u64::MAX) {
        eprintln!("failed to raise ulimit: {e}");
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> anyhow::Result<()> {
    let mut args = args().skip(1);
    let task = args.next();
    let config = ServerConfig::from_env()?;

    match task.as_deref() {
        None | Some("serve") => {
            let _provider = init_tracing()?;
            let prometheus = PrometheusBuilder::new().install_recorder()?;
            let upkeep = prometheus.clone();
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    upkeep.run_upkeep();
                }
            });

            let state = AppState::new(&config, Some(prometheus))?;
            server::serve(routes::router(&state), config.port).await
        }
        Some("invoke") => {
            let _provider = init_tracing()?;
            let module = args
                .next()
                .ok_or_else(|| anyhow!("usage: wasmgate-server invoke <module> [query]"))?;
            let query = args.next().unwrap_or_default();
            cli::invoke(&config, &module, &query).await
        }
        Some(other) => Err(anyhow!("unknown task {other:?}")),
    }
}

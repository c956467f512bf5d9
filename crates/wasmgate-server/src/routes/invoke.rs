use std::{net::SocketAddr, time::Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    response::Response,
};
use tracing::{info, warn};
use wasmgate::InvokeOptions;

use super::{
    AppState,
    env::request_environment,
    error::{ErrorCode, HttpApiError},
};

/// First path segment, or `None` for `/`.
fn module_name(path: &str) -> Option<&str> {
    path.trim_start_matches('/')
        .split('/')
        .next()
        .filter(|name| !name.is_empty())
}

pub async fn invoke(
    State(state): State<AppState>,
    req: Request,
) -> Result<Response, HttpApiError> {
    let (parts, _body) = req.into_parts();
    let Some(module) = module_name(parts.uri.path()) else {
        return Err(HttpApiError::invalid_request("want /{moduleName} prefix"));
    };
    let remote = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let env = request_environment(&parts.method, &parts.uri, &parts.headers, remote);

    info!(module, path = parts.uri.path(), remote = ?remote, "invoking");
    let wasm = state.modules.load(module).await.map_err(|e| {
        warn!(module, error = %e, "module resolution failed");
        HttpApiError::from(e)
    })?;

    let start = Instant::now();
    let result = state
        .engine
        .invoke(module, &wasm, &env, InvokeOptions::default())
        .await
        .map_err(HttpApiError::from);
    record(module, start, result.as_ref().err().map(|e| e.code));

    match result {
        Ok(output) => Ok(Response::new(Body::from(output))),
        Err(e) => {
            warn!(module, error = %e.message, "invocation failed");
            Err(e)
        }
    }
}

fn record(module: &str, start: Instant, failure: Option<ErrorCode>) {
    let outcome = match failure {
        None => "ok",
        Some(ErrorCode::BadModule) => "malformed",
        Some(ErrorCode::Timeout) => "timeout",
        Some(ErrorCode::Cancelled) => "cancelled",
        Some(_) => "error",
    };
    metrics::counter!(
        "wasmgate_invocations_total",
        "module" => module.to_string(),
        "outcome" => outcome,
    )
    .increment(1);
    metrics::histogram!(
        "wasmgate_invocation_duration_seconds",
        "module" => module.to_string(),
    )
    .record(start.elapsed().as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::module_name;

    #[test]
    fn module_is_first_path_segment() {
        assert_eq!(module_name("/"), None);
        assert_eq!(module_name(""), None);
        assert_eq!(module_name("/hello"), Some("hello"));
        assert_eq!(module_name("/hello/"), Some("hello"));
        assert_eq!(module_name("/primality-tester/a/b"), Some("primality-tester"));
    }
}

use std::{collections::BTreeMap, net::SocketAddr};

use http::{HeaderMap, Method, Uri, header::HOST};
use url::form_urlencoded;
use wasmgate::{Environment, env};

/// Builds the guest environment for one request.
///
/// Exactly the five request keys are set, even when a value is unknown.
pub fn request_environment(
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    remote: Option<SocketAddr>,
) -> Environment {
    let host = headers
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::to_owned)
        .or_else(|| uri.authority().map(ToString::to_string))
        .unwrap_or_default();

    Environment::new()
        .with(env::HTTP_PATH, uri.path())
        .with(env::HTTP_METHOD, method.as_str())
        .with(env::HTTP_HOST, host)
        .with(env::HTTP_QUERY, normalize_query(uri.query()))
        .with(
            env::REMOTE_ADDR,
            remote.map(|addr| addr.to_string()).unwrap_or_default(),
        )
}

/// Re-encodes a query string as `k=v&k=v`, sorted by key with each key's
/// values kept in request order.
pub fn normalize_query(query: Option<&str>) -> String {
    let Some(query) = query else {
        return String::new();
    };

    let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (k, v) in form_urlencoded::parse(query.as_bytes()) {
        params.entry(k.into_owned()).or_default().push(v.into_owned());
    }

    let mut out = form_urlencoded::Serializer::new(String::new());
    for (k, values) in &params {
        for v in values {
            out.append_pair(k, v);
        }
    }
    out.finish()
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;

    use super::*;

    #[test]
    fn query_is_sorted_and_reencoded() {
        assert_eq!(normalize_query(None), "");
        assert_eq!(normalize_query(Some("")), "");
        assert_eq!(normalize_query(Some("number=17")), "number=17");
        assert_eq!(normalize_query(Some("b=2&a=1&b=1")), "a=1&b=2&b=1");
        assert_eq!(normalize_query(Some("q=a%20b&x")), "q=a+b&x=");
    }

    #[test]
    fn environment_has_exactly_the_request_keys() {
        let uri: Uri = "/primality-tester/extra?number=17".parse().expect("uri");
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("example.com:3000"));
        let remote: SocketAddr = "10.0.0.7:40000".parse().expect("addr");

        let environment = request_environment(&Method::GET, &uri, &headers, Some(remote));

        let keys: Vec<_> = environment.iter().map(|(k, _)| k.as_str()).collect();
        let mut expected = env::REQUEST_KEYS.to_vec();
        expected.sort_unstable();
        assert_eq!(keys, expected);

        assert_eq!(environment.get(env::HTTP_PATH), Some("/primality-tester/extra"));
        assert_eq!(environment.get(env::HTTP_METHOD), Some("GET"));
        assert_eq!(environment.get(env::HTTP_HOST), Some("example.com:3000"));
        assert_eq!(environment.get(env::HTTP_QUERY), Some("number=17"));
        assert_eq!(environment.get(env::REMOTE_ADDR), Some("10.0.0.7:40000"));
    }

    #[test]
    fn host_falls_back_to_authority() {
        let uri: Uri = "http://fallback.test/echo".parse().expect("uri");
        let environment = request_environment(&Method::GET, &uri, &HeaderMap::new(), None);
        assert_eq!(environment.get(env::HTTP_HOST), Some("fallback.test"));
        assert_eq!(environment.get(env::REMOTE_ADDR), Some(""));
        assert_eq!(environment.get(env::HTTP_QUERY), Some(""));
    }
}

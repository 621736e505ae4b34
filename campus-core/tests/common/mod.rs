#![allow(dead_code)]

use campus_core::{CampusHttpClient, QueryClient};
use serde_json::Value;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "test-access-token";

pub struct TestBackend {
    pub server: MockServer,
    pub client: CampusHttpClient,
    pub cache: QueryClient,
}

/// Mock REST backend plus an authenticated client pointed at it.
pub async fn backend() -> TestBackend {
    let _ = tracing_subscriber::fmt().with_env_filter("debug").try_init();

    let server = MockServer::start().await;
    let client = CampusHttpClient::new(&format!("{}/api", server.uri())).with_access_token(TOKEN);
    TestBackend {
        server,
        client,
        cache: QueryClient::new(1),
    }
}

pub fn api(p: &str) -> String {
    format!("/api/{}/", p.trim_matches('/'))
}

/// Serves `body` for `GET /api/{p}/`, at most `times` times when given.
pub async fn mount_get(server: &MockServer, p: &str, body: Value, times: Option<u64>) {
    let mock = Mock::given(method("GET"))
        .and(path(api(p)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body));
    match times {
        Some(n) => mock.up_to_n_times(n).mount(server).await,
        None => mock.mount(server).await,
    }
}

pub async fn requests_to(server: &MockServer, verb: &str, p: &str) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == verb && r.url.path() == api(p))
        .collect()
}

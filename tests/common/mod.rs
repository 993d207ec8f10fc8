use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::MockServer;

use procassist::api::ApiClient;

pub const STAGE: &str = "dev";

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Config file pointing at a mock server
#[allow(dead_code)]
pub fn mock_config_file(server: &MockServer) -> (TempDir, PathBuf) {
    temp_config_file(&format!(
        "api:\n  base_url: {}\n  stage: {}\n  timeout_seconds: 5\n",
        server.uri(),
        STAGE
    ))
}

/// Endpoint path under the test stage, e.g. `/dev/get-quote`
#[allow(dead_code)]
pub fn stage_path(endpoint: &str) -> String {
    format!("/{}{}", STAGE, endpoint)
}

/// Client for a mock server with a short timeout
#[allow(dead_code)]
pub fn mock_client(server: &MockServer) -> ApiClient {
    client_with_timeout(&server.uri(), Duration::from_secs(5))
}

#[allow(dead_code)]
pub fn client_with_timeout(base: &str, timeout: Duration) -> ApiClient {
    ApiClient::new(format!("{}/{}", base, STAGE), timeout).expect("failed to build client")
}

/// Base URL of a local port that nothing listens on
#[allow(dead_code)]
pub fn unreachable_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("failed to bind");
    let port = listener.local_addr().expect("no local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

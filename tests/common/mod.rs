#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{Response, StatusCode};

pub const TENANT_HEADER: &str = "X-Scope-OrgID";

/// A server process with its own in-memory store, killed on drop
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    client: reqwest::Client,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_tenant-config-api"));
        cmd.arg("--listen")
            .arg(format!("127.0.0.1:{}", port))
            .arg("--loglevel")
            .arg("warn")
            .env("STORE_BACKEND", "memory")
            .env("API_MAX_REQUEST_SIZE_BYTES", "65536")
            .env_remove("RUST_LOG")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self {
            port,
            base_url,
            client: reqwest::Client::new(),
            child,
        })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = self.client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, tenant: &str, path: &str) -> Result<Response> {
        Ok(self
            .client
            .get(self.url(path))
            .header(TENANT_HEADER, tenant)
            .send()
            .await?)
    }

    pub async fn post(&self, tenant: &str, path: &str, body: &str) -> Result<Response> {
        Ok(self
            .client
            .post(self.url(path))
            .header(TENANT_HEADER, tenant)
            .header("Content-Type", "application/yaml")
            .body(body.to_string())
            .send()
            .await?)
    }

    pub async fn delete(&self, tenant: &str, path: &str) -> Result<Response> {
        Ok(self
            .client
            .delete(self.url(path))
            .header(TENANT_HEADER, tenant)
            .send()
            .await?)
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

pub async fn start_server() -> Result<TestServer> {
    let server = TestServer::spawn()?;
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// Parse a YAML stream response into one value per document
pub fn documents(body: &str) -> Result<Vec<serde_yaml::Value>> {
    use serde::Deserialize;

    let mut docs = Vec::new();
    for document in serde_yaml::Deserializer::from_str(body) {
        let value = serde_yaml::Value::deserialize(document)?;
        if !value.is_null() {
            docs.push(value);
        }
    }
    Ok(docs)
}

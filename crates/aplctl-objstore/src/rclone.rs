//! rclone remote-control engine
//!
//! Runs `rclone rcd` on a loopback port and talks to its RC HTTP API.
//! The daemon lives exactly as long as the returned engine handle.

use crate::engine::{RpcReply, SyncEngine, SyncEngineLauncher};
use crate::error::{ObjectStoreError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time::sleep;

/// Startup wait policy (exponential backoff)
#[derive(Debug, Clone)]
pub struct StartupWait {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl StartupWait {
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        let delay = self.initial_delay_ms as f64 * self.multiplier.powi(attempt as i32);
        if !delay.is_finite() || delay >= self.max_delay_ms as f64 {
            return self.max_delay_ms;
        }
        delay as u64
    }
}

impl Default for StartupWait {
    fn default() -> Self {
        Self {
            max_retries: 10,
            initial_delay_ms: 100,
            max_delay_ms: 2000,
            multiplier: 2.0,
        }
    }
}

/// Spawns `rclone rcd` daemons
pub struct RcloneLauncher {
    binary: String,
    wait: StartupWait,
}

impl RcloneLauncher {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            wait: StartupWait::default(),
        }
    }

    /// Use `RCLONE_BINARY` if set, else `rclone` from `PATH`
    pub fn from_env() -> Self {
        let binary = std::env::var("RCLONE_BINARY")
            .ok()
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| "rclone".to_string());
        Self::new(binary)
    }

    pub fn with_wait(mut self, wait: StartupWait) -> Self {
        self.wait = wait;
        self
    }

    fn free_port() -> Result<u16> {
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        Ok(listener.local_addr()?.port())
    }
}

impl Default for RcloneLauncher {
    fn default() -> Self {
        Self::from_env()
    }
}

#[async_trait]
impl SyncEngineLauncher for RcloneLauncher {
    async fn launch(&self, env: &BTreeMap<String, String>) -> Result<Box<dyn SyncEngine>> {
        let addr = format!("127.0.0.1:{}", Self::free_port()?);
        tracing::debug!("Running: {} rcd --rc-no-auth --rc-addr {}", self.binary, addr);

        let child = Command::new(&self.binary)
            .args(["rcd", "--rc-no-auth", "--rc-addr", &addr])
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    ObjectStoreError::EngineNotFound(self.binary.clone())
                }
                _ => ObjectStoreError::IoError(e),
            })?;

        let engine = RcloneRc {
            client: reqwest::Client::new(),
            base_url: format!("http://{}", addr),
            child: Mutex::new(child),
        };
        engine.wait_ready(&self.wait).await?;
        Ok(Box::new(engine))
    }
}

/// Handle to a running rclone daemon
pub struct RcloneRc {
    client: reqwest::Client,
    base_url: String,
    child: Mutex<Child>,
}

impl RcloneRc {
    async fn wait_ready(&self, wait: &StartupWait) -> Result<()> {
        for attempt in 0..wait.max_retries {
            if let Some(status) = self.child.lock().await.try_wait()? {
                return Err(ObjectStoreError::EngineStartFailed(format!(
                    "exited with {}",
                    status
                )));
            }

            match self.call("rc/noop", &serde_json::json!({})).await {
                Ok(reply) if reply.is_ok() => return Ok(()),
                _ => {}
            }

            if attempt + 1 < wait.max_retries {
                sleep(Duration::from_millis(wait.delay_for_attempt(attempt))).await;
            }
        }

        Err(ObjectStoreError::EngineStartFailed(format!(
            "no response on {} after {} attempts",
            self.base_url, wait.max_retries
        )))
    }
}

#[async_trait]
impl SyncEngine for RcloneRc {
    async fn call(&self, method: &str, request: &serde_json::Value) -> Result<RpcReply> {
        let url = format!("{}/{}", self.base_url, method);
        let response = self.client.post(&url).json(request).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(RpcReply { status, body })
    }
}

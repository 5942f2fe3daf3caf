//! Polling loop that drains the gateway queue into a scene host.

use std::sync::Arc;
use std::time::Duration;

use drawbridge_core::command::Command;
use drawbridge_core::error::Result;
use drawbridge_scene::host::SceneHost;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{factory, mutate, normalize};

/// Fetches queued commands from the gateway and applies them in order.
pub struct PluginRuntime {
    poll_url: String,
    interval: Duration,
    host: Arc<dyn SceneHost>,
    client: reqwest::Client,
}

impl PluginRuntime {
    pub fn new(poll_url: impl Into<String>, interval_ms: u64, host: Arc<dyn SceneHost>) -> Self {
        Self {
            poll_url: poll_url.into(),
            interval: Duration::from_millis(interval_ms),
            host,
            client: reqwest::Client::new(),
        }
    }

    /// Run one poll cycle: fetch, normalize, apply each command in order.
    /// Returns how many commands applied cleanly. Transport and decode
    /// failures are logged and count as an empty cycle.
    pub async fn poll_once(&self) -> usize {
        let payload = match self.client.get(&self.poll_url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.json::<Value>().await {
                Ok(value) => value,
                Err(e) => {
                    warn!(%e, "Poll payload decode failed");
                    return 0;
                }
            },
            Ok(resp) => {
                warn!(status = %resp.status(), "Poll returned non-success status");
                return 0;
            }
            Err(e) => {
                warn!(%e, "Poll request failed");
                return 0;
            }
        };

        let commands = normalize::normalize(payload);
        let mut applied = 0;
        for raw in &commands {
            match self.apply(raw).await {
                Ok(()) => applied += 1,
                Err(e) => warn!(%e, "Command failed"),
            }
        }
        if !commands.is_empty() {
            debug!(total = commands.len(), applied, "Poll cycle finished");
        }
        applied
    }

    async fn apply(&self, raw: &Value) -> Result<()> {
        let host = self.host.as_ref();
        match Command::from_value(raw)? {
            Command::Create(element) => {
                factory::create_element(host, &self.client, &element).await?;
            }
            Command::Update { id, props } => mutate::update_node(host, &id, &props).await?,
            Command::Move { id, x, y } => mutate::move_node(host, &id, x, y)?,
            Command::Delete { id } => mutate::delete_node(host, &id)?,
        }
        Ok(())
    }

    /// Start the polling loop on the tokio runtime. The first poll happens
    /// immediately; later polls wait `interval` after the previous cycle
    /// completes, so a slow batch never overlaps the next one.
    pub fn spawn(self) -> PluginHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            info!(
                url = %self.poll_url,
                interval_ms = self.interval.as_millis() as u64,
                "Plugin runtime started"
            );
            loop {
                self.poll_once().await;
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        info!("Plugin runtime stopped");
                        break;
                    }
                    _ = tokio::time::sleep(self.interval) => {}
                }
            }
        });
        PluginHandle { shutdown_tx, task }
    }
}

/// Controls a spawned [`PluginRuntime`] loop.
pub struct PluginHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl PluginHandle {
    /// Stop the loop after its current cycle and wait for the task to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.task.await;
    }
}

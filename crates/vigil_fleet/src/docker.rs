//! Docker-backed fleet.
//!
//! Every peer is a detached container named after its hostname. All
//! commands go through the `docker` CLI; a non-zero exit aborts the case.

use crate::error::{Error, Result};
use crate::fleet::{NamePattern, ProcessFleet};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use vigil_events::PeerId;
use vigil_observe::{LogSubscription, LogTransport};

/// Where peer log directories are mounted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMount {
    /// Host directory; each peer gets `<host_root>/<peer>`.
    pub host_root: PathBuf,
    /// Mount point inside the container, exported as `GLOG_log_dir`.
    pub container_dir: String,
}

/// Docker fleet settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerConfig {
    /// Docker CLI binary.
    pub binary: String,
    /// Image every peer runs.
    pub image: String,
    /// Bridge network the peers share. Created if missing.
    pub network: String,
    /// Hostfile path inside the container.
    pub hostfile: String,
    /// Optional per-peer log directory mount.
    pub log_mount: Option<LogMount>,
    /// glog verbosity passed as `--v`.
    pub verbosity: u8,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            binary: "docker".to_string(),
            image: "vigil-peer".to_string(),
            network: "vigil-bridge".to_string(),
            hostfile: "/hostfile".to_string(),
            log_mount: None,
            verbosity: 0,
        }
    }
}

impl DockerConfig {
    /// Builds the `docker run` argument list for one peer.
    #[must_use]
    pub fn run_args(&self, peer: &PeerId, args: &[String]) -> Vec<String> {
        let host = peer.as_str();
        let mut argv: Vec<String> = vec![
            "run".into(),
            "--detach".into(),
            "--name".into(),
            host.into(),
            "--network".into(),
            self.network.clone(),
            "--hostname".into(),
            host.into(),
        ];
        if let Some(mount) = &self.log_mount {
            argv.push("-v".into());
            argv.push(format!(
                "{}:{}",
                mount.host_root.join(host).display(),
                mount.container_dir
            ));
            argv.push("--env".into());
            argv.push(format!("GLOG_log_dir={}", mount.container_dir));
        }
        argv.push(self.image.clone());
        argv.push("--v".into());
        argv.push(self.verbosity.to_string());
        argv.push("--hostfile".into());
        argv.push(self.hostfile.clone());
        argv.extend(args.iter().cloned());
        argv
    }
}

/// Fleet driving containers through the docker CLI.
#[derive(Debug, Clone, Default)]
pub struct DockerFleet {
    config: DockerConfig,
}

impl DockerFleet {
    /// Creates a fleet with the given settings.
    #[must_use]
    pub const fn new(config: DockerConfig) -> Self {
        Self { config }
    }

    /// Returns the fleet settings.
    #[must_use]
    pub const fn config(&self) -> &DockerConfig {
        &self.config
    }

    fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(&self.config.binary);
        command.args(args).stdin(Stdio::null());
        command
    }

    /// Runs one docker command to completion and returns its stdout and
    /// stderr.
    async fn run<I, S>(&self, action: &'static str, target: &str, args: I) -> Result<(String, String)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = self
            .command(args)
            .output()
            .await
            .map_err(|source| Error::Spawn {
                program: self.config.binary.clone(),
                source,
            })?;
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(Error::CommandFailed {
                action,
                target: target.to_string(),
                code: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }
        debug!(action, target, "docker command succeeded");
        Ok((String::from_utf8_lossy(&output.stdout).into_owned(), stderr))
    }

    /// Lists container names matching `pattern`, stopped ones included when
    /// `all` is set.
    async fn list(&self, pattern: &NamePattern, all: bool) -> Result<Vec<PeerId>> {
        let filter = format!("name={}", pattern.stem());
        let mut args = vec!["ps"];
        if all {
            args.push("-a");
        }
        args.extend(["--filter", filter.as_str(), "--format", "{{.Names}}"]);
        let (stdout, _) = self.run("list", &pattern.to_string(), args).await?;
        // docker's name filter is a substring match; narrow it.
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|name| pattern.matches(name))
            .map(PeerId::from)
            .collect())
    }
}

#[async_trait]
impl LogTransport for DockerFleet {
    async fn live_log(&self, peer: &PeerId) -> vigil_observe::Result<Box<dyn LogSubscription>> {
        let subscription =
            DockerLogSubscription::spawn(peer, self.command(["logs", "-f", peer.as_str()]))
                .map_err(|source| {
                vigil_observe::Error::transport(
                    peer,
                    Error::Spawn {
                        program: self.config.binary.clone(),
                        source,
                    },
                )
            })?;
        debug!(%peer, "following container log");
        Ok(Box::new(subscription))
    }

    async fn historical_log(&self, peer: &PeerId) -> vigil_observe::Result<Vec<String>> {
        let (stdout, stderr) = self
            .run("logs", peer.as_str(), ["logs", peer.as_str()])
            .await
            .map_err(|e| vigil_observe::Error::transport(peer, e))?;
        Ok(stdout
            .lines()
            .chain(stderr.lines())
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect())
    }
}

#[async_trait]
impl ProcessFleet for DockerFleet {
    async fn prepare(&self) -> Result<()> {
        let network = self.config.network.as_str();
        let filter = format!("name={network}");
        let (stdout, _) = self
            .run("inspect network", network, ["network", "ls", "--quiet", "--filter", filter.as_str()])
            .await?;
        if stdout.trim().is_empty() {
            info!(network, "creating bridge network");
            self.run(
                "create network",
                network,
                ["network", "create", "--driver", "bridge", network],
            )
            .await?;
        } else {
            info!(network, "bridge network exists");
        }
        Ok(())
    }

    async fn launch(&self, peer: &PeerId, args: &[String]) -> Result<()> {
        if let Some(mount) = &self.config.log_mount {
            tokio::fs::create_dir_all(mount.host_root.join(peer.as_str())).await?;
        }
        info!(%peer, image = %self.config.image, "starting container");
        self.run("launch", peer.as_str(), self.config.run_args(peer, args))
            .await?;
        Ok(())
    }

    async fn stop(&self, pattern: &NamePattern) -> Result<()> {
        let names = self.list(pattern, true).await?;
        if names.is_empty() {
            info!(%pattern, "no containers to stop");
            return Ok(());
        }
        info!(%pattern, containers = names.len(), "stopping containers");
        let args = std::iter::once("stop").chain(names.iter().map(PeerId::as_str));
        self.run("stop", &pattern.to_string(), args).await?;
        Ok(())
    }

    async fn remove(&self, pattern: &NamePattern) -> Result<()> {
        let names = self.list(pattern, true).await?;
        if names.is_empty() {
            return Ok(());
        }
        info!(%pattern, containers = names.len(), "removing containers");
        let args = std::iter::once("rm").chain(names.iter().map(PeerId::as_str));
        self.run("remove", &pattern.to_string(), args).await?;
        Ok(())
    }

    async fn running(&self, pattern: &NamePattern) -> Result<Vec<PeerId>> {
        self.list(pattern, false).await
    }

    fn log_transport(self: Arc<Self>) -> Arc<dyn LogTransport> {
        self
    }
}

/// Live `docker logs -f` stream with stdout and stderr merged.
///
/// Lines from the two streams keep their own order but may interleave
/// arbitrarily. The follower process is killed on close and on drop. A
/// follower that exits non-zero on its own ends the stream with an error
/// instead of a clean end of feed.
struct DockerLogSubscription {
    peer: PeerId,
    child: Option<Child>,
    lines: mpsc::Receiver<std::io::Result<String>>,
    forwarders: Vec<JoinHandle<()>>,
    last_stderr: Arc<Mutex<Option<String>>>,
}

impl DockerLogSubscription {
    fn spawn(peer: &PeerId, mut command: Command) -> std::io::Result<Self> {
        let mut child = command
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let (tx, rx) = mpsc::channel(256);
        let last_stderr = Arc::new(Mutex::new(None));
        let mut forwarders = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            forwarders.push(tokio::spawn(forward(stdout, tx.clone(), None)));
        }
        if let Some(stderr) = child.stderr.take() {
            forwarders.push(tokio::spawn(forward(
                stderr,
                tx,
                Some(Arc::clone(&last_stderr)),
            )));
        }

        Ok(Self {
            peer: peer.clone(),
            child: Some(child),
            lines: rx,
            forwarders,
            last_stderr,
        })
    }

    /// Waits for a follower whose output has ended and checks its status.
    async fn reap(&mut self) -> std::io::Result<()> {
        let Some(child) = self.child.as_mut() else {
            return Ok(());
        };
        let status = child.wait().await?;
        self.child = None;
        if status.success() {
            debug!(peer = %self.peer, "log follower finished");
            return Ok(());
        }
        let stderr = self
            .last_stderr
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .unwrap_or_default();
        Err(std::io::Error::other(Error::CommandFailed {
            action: "follow logs",
            target: self.peer.to_string(),
            code: status.code(),
            stderr,
        }))
    }
}

async fn forward<R>(
    stream: R,
    tx: mpsc::Sender<std::io::Result<String>>,
    last: Option<Arc<Mutex<Option<String>>>>,
) where
    R: AsyncRead + Unpin + Send,
{
    let mut lines = BufReader::new(stream).lines();
    while let Some(line) = lines.next_line().await.transpose() {
        if let (Some(last), Ok(text)) = (&last, &line) {
            *last.lock().unwrap_or_else(PoisonError::into_inner) = Some(text.trim().to_string());
        }
        let failed = line.is_err();
        if tx.send(line).await.is_err() || failed {
            break;
        }
    }
}

#[async_trait]
impl LogSubscription for DockerLogSubscription {
    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        match self.lines.recv().await {
            Some(line) => line.map(Some),
            None => self.reap().await.map(|()| None),
        }
    }

    async fn close(&mut self) -> std::io::Result<()> {
        for forwarder in self.forwarders.drain(..) {
            forwarder.abort();
        }
        self.lines.close();
        if let Some(mut child) = self.child.take() {
            if child.try_wait()?.is_none() {
                child.kill().await?;
            }
        }
        Ok(())
    }
}

impl Drop for DockerLogSubscription {
    fn drop(&mut self) {
        for forwarder in &self.forwarders {
            forwarder.abort();
        }
    }
}

//! External enumeration tool probes
//!
//! Runs a tool such as Sherlock or Maigret against the target, routing it
//! through the current egress route via its `--proxy` flag, then reads and
//! deletes the JSON report it wrote.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use thunder_net::EgressSource;

use crate::{parse_tool_output, Probe, ProbeError};

/// Default hard timeout for one tool run
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(300);

/// How long a `--version` availability check may take
const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(20);

/// A tool and the command lines that may start it, in preference order
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub invocations: Vec<Vec<String>>,
}

impl ToolSpec {
    pub fn new(name: &str, invocations: &[&[&str]]) -> Self {
        Self {
            name: name.to_string(),
            invocations: invocations
                .iter()
                .map(|inv| inv.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    pub fn sherlock() -> Self {
        Self::new("sherlock", &[&["sherlock"]])
    }

    /// Maigret on PATH, or installed as a Python module
    pub fn maigret() -> Self {
        Self::new("maigret", &[&["maigret"], &["python3", "-m", "maigret"]])
    }

    /// First invocation whose `--version` succeeds
    pub async fn detect(&self) -> Option<Vec<String>> {
        for invocation in &self.invocations {
            let Some((program, args)) = invocation.split_first() else {
                continue;
            };

            let status = Command::new(program)
                .args(args)
                .arg("--version")
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .status();

            match tokio::time::timeout(VERSION_CHECK_TIMEOUT, status).await {
                Ok(Ok(status)) if status.success() => {
                    debug!("{} available as {:?}", self.name, invocation);
                    return Some(invocation.clone());
                }
                Ok(Ok(status)) => debug!("{:?} --version exited with {}", invocation, status),
                Ok(Err(e)) => debug!("{:?} not runnable: {}", invocation, e),
                Err(_) => debug!("{:?} --version timed out", invocation),
            }
        }
        None
    }
}

/// Deletes the tool's report file when dropped
struct ScratchFile(PathBuf);

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if self.0.exists() {
            if let Err(e) = std::fs::remove_file(&self.0) {
                warn!("Failed to remove {}: {}", self.0.display(), e);
            }
        }
    }
}

/// Probe backed by an external enumeration tool
pub struct ToolProbe {
    spec: ToolSpec,
    source: Arc<dyn EgressSource>,
    scratch_dir: PathBuf,
    timeout: Duration,
    command: OnceCell<Option<Vec<String>>>,
}

impl ToolProbe {
    pub fn new(spec: ToolSpec, source: Arc<dyn EgressSource>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            spec,
            source,
            scratch_dir: scratch_dir.into(),
            timeout: DEFAULT_TOOL_TIMEOUT,
            command: OnceCell::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether the tool can be started; checked once and cached
    pub async fn is_available(&self) -> bool {
        self.command().await.is_some()
    }

    async fn command(&self) -> Option<&Vec<String>> {
        self.command
            .get_or_init(|| self.spec.detect())
            .await
            .as_ref()
    }

    fn output_path(&self, target: &str) -> PathBuf {
        let safe: String = target
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || "-_.".contains(c) { c } else { '_' })
            .collect();
        let tag = &uuid::Uuid::new_v4().simple().to_string()[..8];
        self.scratch_dir
            .join(format!("{}_{}_{}.json", safe, self.spec.name, tag))
    }

    async fn run(&self, invocation: &[String], target: &str, output: &Path) -> Result<(), ProbeError> {
        let (program, args) = invocation
            .split_first()
            .ok_or_else(|| ProbeError::ToolMissing(self.spec.name.clone()))?;

        let mut command = Command::new(program);
        command
            .args(args)
            .arg(target)
            .arg("--json")
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let route = self.source.next_route();
        if let Some(proxy) = route.proxy_url() {
            command.arg("--proxy").arg(proxy);
        }

        info!("Starting {} for {} via {}", self.spec.name, target, route);
        let mut child = command.spawn().map_err(|source| ProbeError::Spawn {
            tool: self.spec.name.clone(),
            source,
        })?;

        match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => {
                if !status.success() {
                    debug!("{} exited with {}", self.spec.name, status);
                }
                Ok(())
            }
            Ok(Err(e)) => Err(ProbeError::Io(e)),
            Err(_) => {
                if let Err(e) = child.kill().await {
                    debug!("Failed to kill {}: {}", self.spec.name, e);
                }
                Err(ProbeError::Timeout {
                    tool: self.spec.name.clone(),
                    secs: self.timeout.as_secs(),
                })
            }
        }
    }
}

#[async_trait]
impl Probe for ToolProbe {
    fn name(&self) -> &str {
        &self.spec.name
    }

    async fn probe(&self, target: &str) -> Result<BTreeSet<String>, ProbeError> {
        let invocation = self
            .command()
            .await
            .ok_or_else(|| ProbeError::ToolMissing(self.spec.name.clone()))?;

        tokio::fs::create_dir_all(&self.scratch_dir).await?;
        let output = ScratchFile(self.output_path(target));

        self.run(invocation, target, &output.0).await?;

        let json = match tokio::fs::read_to_string(&output.0).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ProbeError::NoOutput(output.0.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        let found = parse_tool_output(&json, target)?;
        info!("{} found {} handles for {}", self.spec.name, found.len(), target);
        Ok(found)
    }
}

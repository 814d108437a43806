//! Toolkit invocation through the docker command line client

use crate::engine::{container_env, ActionEngine, CONTAINER_WORKSPACE};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tracing::{debug, info};

pub const DEFAULT_DOCKER_BIN: &str = "docker";

/// Runs `docker run --rm ...` with stdio inherited from the runner
pub struct DockerCliEngine {
    docker_bin: PathBuf,
    image: String,
}

impl DockerCliEngine {
    pub fn new(docker_bin: impl Into<PathBuf>, image: impl Into<String>) -> Self {
        Self {
            docker_bin: docker_bin.into(),
            image: image.into(),
        }
    }

    /// Arguments after the docker binary, image last
    pub fn run_args(&self, workspace: &Path, inputs: &BTreeMap<String, String>) -> Vec<OsString> {
        let mut mount = workspace.as_os_str().to_os_string();
        mount.push(":");
        mount.push(CONTAINER_WORKSPACE);

        let mut args: Vec<OsString> = vec![
            "run".into(),
            "--rm".into(),
            "-v".into(),
            mount,
            "-w".into(),
            CONTAINER_WORKSPACE.into(),
        ];
        for var in container_env(inputs) {
            args.push("-e".into());
            args.push(var.into());
        }
        args.push(self.image.clone().into());
        args
    }
}

/// Exit code of a finished process; a signal death maps to 128 + signal
/// the way a shell reports it
fn exit_code_of(status: ExitStatus) -> i64 {
    if let Some(code) = status.code() {
        return code as i64;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal as i64;
        }
    }
    -1
}

impl ActionEngine for DockerCliEngine {
    async fn invoke(&self, workspace: &Path, inputs: &BTreeMap<String, String>) -> Result<i64> {
        let args = self.run_args(workspace, inputs);
        debug!(docker = %self.docker_bin.display(), ?args, "Spawning docker");
        info!(
            image = %self.image,
            workspace = %workspace.display(),
            inputs = inputs.len(),
            "Starting toolkit container"
        );

        let status = Command::new(&self.docker_bin)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .status()
            .await
            .with_context(|| format!("Failed to spawn {}", self.docker_bin.display()))?;

        Ok(exit_code_of(status))
    }
}

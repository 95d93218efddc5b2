//! # Sidecar Process
//!
//! Spawns the process that owns the WhatsApp Web connection and exposes its
//! stdin/stdout as the bridge channel. Its stderr is forwarded to tracing.

use anyhow::{Context, Result, bail};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::domain::config::SidecarConfig;
use crate::strings::logs;

pub struct SidecarProcess {
    pub child: Child,
    pub stdin: ChildStdin,
    pub stdout: ChildStdout,
}

pub fn spawn(config: &SidecarConfig) -> Result<SidecarProcess> {
    let mut cmd = Command::new(&config.program);
    cmd.args(&config.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &config.working_dir {
        cmd.current_dir(dir);
    }

    let mut child = cmd
        .spawn()
        .with_context(|| format!("Failed to spawn sidecar `{}`", config.program))?;

    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::warn!(target: "sidecar", "{}", line);
            }
        });
    }

    let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
        bail!("sidecar `{}` has no stdio pipes", config.program);
    };

    tracing::info!("{}", logs::sidecar_started(&config.program));
    Ok(SidecarProcess {
        child,
        stdin,
        stdout,
    })
}

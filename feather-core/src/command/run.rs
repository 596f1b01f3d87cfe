//! `RUN <words...>`: remote shell execution.
//!
//! **Security:** this hands an arbitrary command line to the drone's shell
//! with the privileges of the drone process. Anyone who can put a frame on
//! the radio channel can run code on the drone. Leave it out of the
//! registry on deployments that do not need it.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command as Process;
use tracing::{info, warn};

use crate::command::{Command, CommandContext};
use crate::error::{FeatherError, Result};

/// Default limit on how long a RUN command may take.
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(30);

/// Streams each non-empty output line (stdout and stderr merged) as its
/// own response, then the exit code.
pub struct RunCommand {
    timeout: Duration,
}

impl Default for RunCommand {
    fn default() -> Self {
        Self::new(DEFAULT_RUN_TIMEOUT)
    }
}

impl RunCommand {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

fn shell(command_line: &str) -> Process {
    if cfg!(windows) {
        let mut process = Process::new("cmd");
        process.arg("/C").arg(command_line);
        process
    } else {
        let mut process = Process::new("sh");
        process.arg("-c").arg(command_line);
        process
    }
}

#[async_trait]
impl Command for RunCommand {
    fn name(&self) -> &'static str {
        "RUN"
    }

    async fn execute(&self, args: &[String], ctx: &mut CommandContext<'_>) -> Result<()> {
        if args.is_empty() {
            return Err(FeatherError::Usage("Usage: RUN <command> [args...]".into()));
        }
        let command_line = args.join(" ");
        ctx.link
            .respond(format!("→ Executing: {command_line}"))
            .await?;
        warn!("RUN: {command_line}");

        let mut child = shell(&command_line)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| FeatherError::Other(format!("Failed to execute: {e}")))?;

        let mut stdout = child.stdout.take().map(|s| BufReader::new(s).lines());
        let mut stderr = child.stderr.take().map(|s| BufReader::new(s).lines());
        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);

        // Relay lines as they arrive until both pipes close.
        while stdout.is_some() || stderr.is_some() {
            let line = tokio::select! {
                line = next_line(&mut stdout), if stdout.is_some() => line,
                line = next_line(&mut stderr), if stderr.is_some() => line,
                _ = &mut deadline => {
                    let _ = child.kill().await;
                    ctx.link.respond("[ERROR] Command timed out.").await?;
                    return Ok(());
                }
            };
            let line = line.trim();
            if !line.is_empty() {
                ctx.link.respond(line).await?;
            }
        }

        let status = tokio::select! {
            status = child.wait() => status?,
            _ = &mut deadline => {
                let _ = child.kill().await;
                ctx.link.respond("[ERROR] Command timed out.").await?;
                return Ok(());
            }
        };
        let code = status.code().unwrap_or(-1);
        info!("RUN finished with exit code {code}");
        ctx.link.respond(format!("Exit code: {code}")).await?;
        Ok(())
    }
}

/// Next line from an optional pipe. A closed or failed pipe is cleared and
/// yields an empty line.
async fn next_line<R>(pipe: &mut Option<tokio::io::Lines<BufReader<R>>>) -> String
where
    R: tokio::io::AsyncRead + Unpin,
{
    let Some(lines) = pipe.as_mut() else {
        return String::new();
    };
    match lines.next_line().await {
        Ok(Some(line)) => line,
        Ok(None) => {
            *pipe = None;
            String::new()
        }
        Err(e) => {
            warn!("RUN output read error: {e}");
            *pipe = None;
            String::new()
        }
    }
}

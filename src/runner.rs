use crate::error::{Result, SpeedtestError};
use crate::traits::CommandRunner;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Runs the real binary as a child process.
pub struct SystemRunner {
    binary: String,
    timeout: Option<Duration>,
}

impl SystemRunner {
    pub fn new(binary: &str, timeout: Option<Duration>) -> Self {
        Self {
            binary: binary.to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, args: &[String]) -> Result<String> {
        tracing::debug!(binary = %self.binary, ?args, "spawning speedtest");

        let child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // Dropping the future on timeout drops the child, which kills it.
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| SpeedtestError::Timeout(limit.as_secs()))??,
            None => child.wait_with_output().await?,
        };

        if !output.status.success() {
            tracing::debug!(status = ?output.status, "speedtest failed");
            return Err(SpeedtestError::NonZeroExit {
                code: output.status.code(),
            });
        }

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(text)
    }
}


#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_is_io_error() {
        let runner = SystemRunner::new("speedlog-no-such-binary-xyz", None);
        match runner.run(&["--version".to_string()]).await {
            Err(SpeedtestError::Io(_)) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_zero_exit() {
        let runner = SystemRunner::new("false", None);
        match runner.run(&[]).await {
            Err(SpeedtestError::NonZeroExit { .. }) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_output_is_captured() -> Result<()> {
        let runner = SystemRunner::new("echo", None);
        let out = runner.run(&["hello".to_string()]).await?;
        assert_eq!(out.trim(), "hello");
        Ok(())
    }

    #[tokio::test]
    async fn test_timeout() {
        let runner = SystemRunner::new("sleep", Some(Duration::from_secs(1)));
        match runner.run(&["5".to_string()]).await {
            Err(SpeedtestError::Timeout(1)) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }
}

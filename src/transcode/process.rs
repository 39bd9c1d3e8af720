//! Transcoder process supervision
//!
//! Owns exactly one child process. Teardown is SIGTERM, a bounded wait,
//! then SIGKILL, and runs at most once whether it is triggered explicitly
//! or by dropping the handle.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::AsyncRead;
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;

use crate::config::TranscoderConfig;
use crate::error::TranscodeError;

/// A running transcoder
pub struct TranscodeProcess {
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    drain: Option<JoinHandle<()>>,
    pid: Option<u32>,
    grace: Duration,
}

impl TranscodeProcess {
    /// Spawn the transcoder with piped stdout and stderr.
    ///
    /// stderr is drained in a background task for the life of the process so
    /// a chatty transcoder can never block on a full pipe.
    pub fn spawn(config: &TranscoderConfig, args: &[String]) -> Result<Self, TranscodeError> {
        let mut child = Command::new(&config.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| TranscodeError::Spawn {
                program: config.program.clone(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or(TranscodeError::MissingPipe("stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or(TranscodeError::MissingPipe("stderr"))?;

        let pid = child.id();
        tracing::debug!(pid, program = %config.program, "Spawned transcoder");

        Ok(Self {
            child: Some(child),
            stdout: Some(stdout),
            drain: Some(tokio::spawn(drain_diagnostics(stderr))),
            pid,
            grace: config.terminate_grace(),
        })
    }

    /// OS process id, if the process was started
    pub fn id(&self) -> Option<u32> {
        self.pid
    }

    /// Take the media output pipe. Returns `None` after the first call.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.stdout.take()
    }

    /// Non-blocking exit check. Torn-down processes count as exited.
    pub fn try_wait(&mut self) -> Option<ExitStatus> {
        let child = self.child.as_mut()?;
        match child.try_wait() {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(pid = self.pid, "Failed to poll transcoder status: {}", e);
                None
            }
        }
    }

    /// Whether teardown has already run
    #[cfg(test)]
    pub fn is_torn_down(&self) -> bool {
        self.child.is_none()
    }

    /// Terminate and reap the process.
    ///
    /// Returns `true` if this call performed the teardown and `false` if it
    /// had already happened.
    pub async fn teardown(&mut self) -> bool {
        let Some(child) = self.child.take() else {
            return false;
        };
        terminate(child, self.grace, self.pid).await;
        if let Some(drain) = self.drain.take() {
            drain.abort();
        }
        true
    }
}

impl Drop for TranscodeProcess {
    fn drop(&mut self) {
        if let Some(drain) = self.drain.take() {
            drain.abort();
        }
        let Some(mut child) = self.child.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(terminate(child, self.grace, self.pid));
            }
            Err(_) => {
                if let Err(e) = child.start_kill() {
                    tracing::warn!(pid = self.pid, "Failed to kill transcoder: {}", e);
                }
            }
        }
    }
}

/// Read and discard diagnostic output until the pipe closes
async fn drain_diagnostics<R: AsyncRead + Unpin>(mut stderr: R) {
    if let Err(e) = tokio::io::copy(&mut stderr, &mut tokio::io::sink()).await {
        tracing::trace!("Transcoder stderr drain stopped: {}", e);
    }
}

async fn terminate(mut child: Child, grace: Duration, pid: Option<u32>) {
    match child.try_wait() {
        Ok(Some(status)) => {
            tracing::debug!(pid, %status, "Transcoder already exited");
            return;
        }
        Ok(None) => {}
        Err(e) => tracing::warn!(pid, "Failed to poll transcoder status: {}", e),
    }

    request_terminate(&mut child);

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => tracing::debug!(pid, %status, "Transcoder terminated"),
        Ok(Err(e)) => {
            tracing::warn!(pid, "Failed waiting for transcoder, killing: {}", e);
            force_kill(&mut child, pid).await;
        }
        Err(_) => {
            tracing::warn!(pid, "Transcoder still running after {:?}, killing", grace);
            force_kill(&mut child, pid).await;
        }
    }
}

async fn force_kill(child: &mut Child, pid: Option<u32>) {
    if let Err(e) = child.kill().await {
        tracing::warn!(pid, "Failed to kill transcoder: {}", e);
    }
}

#[cfg(unix)]
fn request_terminate(child: &mut Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = child.id() {
        if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            tracing::debug!(pid, "SIGTERM failed: {}", e);
        }
    }
}

#[cfg(not(unix))]
fn request_terminate(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        tracing::debug!("Terminate request failed: {}", e);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::integration::fixtures::wait_until;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;
    use tokio::io::AsyncReadExt;

    fn sh_config(grace_ms: u64) -> TranscoderConfig {
        TranscoderConfig {
            program: "sh".to_string(),
            terminate_grace_ms: grace_ms,
            ..Default::default()
        }
    }

    fn script(s: &str) -> Vec<String> {
        vec!["-c".to_string(), s.to_string()]
    }

    fn is_alive(pid: u32) -> bool {
        kill(Pid::from_raw(pid as i32), None).is_ok()
    }

    #[tokio::test]
    async fn test_spawn_missing_program() {
        let config = TranscoderConfig {
            program: "/nonexistent/ffmpeg-xyz".to_string(),
            ..Default::default()
        };
        let err = TranscodeProcess::spawn(&config, &[]).err().unwrap();
        assert!(matches!(err, TranscodeError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_teardown_runs_once() {
        let mut process = TranscodeProcess::spawn(&sh_config(2000), &script("exec sleep 30")).unwrap();
        let pid = process.id().unwrap();
        assert!(process.try_wait().is_none());

        assert!(process.teardown().await);
        assert!(process.is_torn_down());
        assert!(!process.teardown().await);
        assert!(!is_alive(pid));
    }

    #[tokio::test]
    async fn test_teardown_kills_after_grace() {
        let mut process = TranscodeProcess::spawn(
            &sh_config(200),
            &script("trap '' TERM; exec sleep 30"),
        )
        .unwrap();
        let pid = process.id().unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let started = tokio::time::Instant::now();
        assert!(process.teardown().await);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!is_alive(pid));
    }

    #[tokio::test]
    async fn test_drop_schedules_teardown() {
        let process = TranscodeProcess::spawn(&sh_config(2000), &script("exec sleep 30")).unwrap();
        let pid = process.id().unwrap();
        drop(process);

        assert!(wait_until(Duration::from_secs(5), || !is_alive(pid)).await);
    }

    #[tokio::test]
    async fn test_stderr_is_drained() {
        // Far more than a pipe buffer; without draining the write blocks forever.
        let mut process = TranscodeProcess::spawn(
            &sh_config(2000),
            &script("head -c 1048576 /dev/zero >&2; echo done"),
        )
        .unwrap();
        let mut stdout = process.take_stdout().unwrap();
        assert!(process.take_stdout().is_none());

        let mut out = String::new();
        tokio::time::timeout(Duration::from_secs(10), stdout.read_to_string(&mut out))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(out, "done\n");
        process.teardown().await;
    }
}

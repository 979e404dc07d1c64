use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{PipelineError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Captured result of a finished child process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

fn drain<R: Read + Send + 'static>(stream: Option<R>) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut s) = stream {
            let _ = s.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn join(handle: JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}

/// Runs `command` to completion, killing it once `timeout` elapses.
///
/// Output pipes are drained on background threads so a chatty child
/// cannot block on a full pipe while we poll. A launch failure or a
/// non-zero exit is `ExtractionFailure`; exceeding the bound is
/// `ExtractionTimeout`.
pub fn run_with_timeout(
    mut command: Command,
    tool_name: &str,
    timeout: Option<Duration>,
) -> Result<ProcessOutput> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!(tool = tool_name, command = ?command, "spawning");

    let mut child: Child = command.spawn().map_err(|e| {
        let detail = if e.kind() == std::io::ErrorKind::NotFound {
            format!("{tool_name} not found; is it installed?")
        } else {
            format!("failed to launch {tool_name}: {e}")
        };
        PipelineError::ExtractionFailure {
            detail,
            stderr: None,
        }
    })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let start = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if let Some(limit) = timeout {
                    if start.elapsed() > limit {
                        let _ = child.kill();
                        let _ = child.wait();
                        warn!(tool = tool_name, timeout_secs = limit.as_secs(), "timed out, killed");
                        return Err(PipelineError::ExtractionTimeout {
                            timeout_secs: limit.as_secs(),
                        });
                    }
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                let _ = child.kill();
                return Err(PipelineError::ExtractionFailure {
                    detail: format!("failed to wait for {tool_name}: {e}"),
                    stderr: None,
                });
            }
        }
    };

    let output = ProcessOutput {
        status,
        stdout: join(stdout),
        stderr: join(stderr),
    };

    if !output.status.success() {
        return Err(PipelineError::ExtractionFailure {
            detail: format!("{tool_name} exited with {}", output.status),
            stderr: Some(output.stderr),
        });
    }

    debug!(
        tool = tool_name,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "finished"
    );
    Ok(output)
}

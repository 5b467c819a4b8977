/// Process execution seam for the device probes.
///
/// Probes never spawn processes directly; they go through [`CommandRunner`]
/// so the parsing logic can be exercised with canned output.
use crate::error::ProbeError;
use std::fmt;
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How often a running child is polled for exit while a timeout is armed.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// A single external command: program plus fixed arguments. No shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeCommand {
    pub program: &'static str,
    pub args: &'static [&'static str],
}

impl fmt::Display for ProbeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program)?;
        for arg in self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Runs a [`ProbeCommand`] and returns its captured stdout.
pub trait CommandRunner: Send + Sync {
    /// # Errors
    ///
    /// [`ProbeError::Spawn`] if the process cannot start,
    /// [`ProbeError::Failed`] on a non-zero exit, and
    /// [`ProbeError::TimedOut`] if the runner gave up waiting.
    fn run(&self, command: &ProbeCommand) -> Result<String, ProbeError>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn run(&self, command: &ProbeCommand) -> Result<String, ProbeError> {
        (**self).run(command)
    }
}

impl<T: CommandRunner + ?Sized> CommandRunner for Box<T> {
    fn run(&self, command: &ProbeCommand) -> Result<String, ProbeError> {
        (**self).run(command)
    }
}

/// Runs commands as real OS processes, optionally bounded by a timeout.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner {
    timeout: Option<Duration>,
}

impl SystemCommandRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl CommandRunner for SystemCommandRunner {
    fn run(&self, command: &ProbeCommand) -> Result<String, ProbeError> {
        let label = command.to_string();
        debug!("running probe `{label}`");

        let mut child = Command::new(command.program)
            .args(command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ProbeError::Spawn {
                command: label.clone(),
                source,
            })?;

        // Drain both pipes on their own threads so a chatty child never
        // blocks on a full pipe while we wait for it.
        let stdout = spawn_reader(child.stdout.take());
        let stderr = spawn_reader(child.stderr.take());

        let status = match self.timeout {
            None => child.wait(),
            Some(timeout) => match wait_with_deadline(&mut child, timeout) {
                Ok(Some(status)) => Ok(status),
                Ok(None) => {
                    warn!("probe `{label}` exceeded {timeout:?}, killing it");
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ProbeError::TimedOut {
                        command: label,
                        timeout,
                    });
                }
                Err(e) => Err(e),
            },
        }
        .map_err(|source| ProbeError::Spawn {
            command: label.clone(),
            source,
        })?;

        let out = join_reader(stdout);
        let err = join_reader(stderr);

        if !status.success() {
            return Err(ProbeError::Failed {
                command: label,
                code: status.code(),
                stderr: String::from_utf8_lossy(&err).trim().to_string(),
            });
        }

        debug!("probe `{label}` returned {} bytes", out.len());
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

type Reader = Option<thread::JoinHandle<Vec<u8>>>;

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> Reader {
    let mut pipe = pipe?;
    thread::Builder::new()
        .name("drivestash-probe-pipe".into())
        .spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
        .ok()
}

fn join_reader(reader: Reader) -> Vec<u8> {
    reader.and_then(|h| h.join().ok()).unwrap_or_default()
}

/// Poll `child` until it exits or `timeout` elapses. `Ok(None)` on timeout.
fn wait_with_deadline(
    child: &mut Child,
    timeout: Duration,
) -> std::io::Result<Option<std::process::ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

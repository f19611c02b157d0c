//! The seam through which the driver runs chain and relayer commands.

use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};
use std::thread;

use crate::error::DriverError;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ExecOutput {
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Runs a command somewhere: inside a container, on the local machine, or
/// against a script in tests.
pub trait Exec {
    /// Runs `args` to completion. A non-zero exit status is an error carrying
    /// the command's stderr.
    fn exec(&self, args: &[String], stdin: Option<&[u8]>) -> Result<ExecOutput, DriverError>;
}

impl<E: Exec + ?Sized> Exec for &E {
    fn exec(&self, args: &[String], stdin: Option<&[u8]>) -> Result<ExecOutput, DriverError> {
        (**self).exec(args, stdin)
    }
}

/// Runs commands in a running container with `docker exec`.
#[derive(Clone, Debug)]
pub struct DockerExec {
    container: String,
}

impl DockerExec {
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
        }
    }
}

impl Exec for DockerExec {
    fn exec(&self, args: &[String], stdin: Option<&[u8]>) -> Result<ExecOutput, DriverError> {
        let mut command = Command::new("docker");
        command.arg("exec");
        if stdin.is_some() {
            command.arg("-i");
        }
        command.arg(&self.container).args(args);
        run(command, args, stdin)
    }
}

/// Runs commands as local processes.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalExec;

impl Exec for LocalExec {
    fn exec(&self, args: &[String], stdin: Option<&[u8]>) -> Result<ExecOutput, DriverError> {
        let (program, rest) = args.split_first().ok_or_else(|| DriverError::Spawn {
            command: String::new(),
            reason: "empty command".to_string(),
        })?;
        let mut command = Command::new(program);
        command.args(rest);
        run(command, args, stdin)
    }
}

/// Runs a prepared command, feeding it `stdin` when given.
pub(crate) fn run(
    mut command: Command,
    args: &[String],
    stdin: Option<&[u8]>,
) -> Result<ExecOutput, DriverError> {
    let shown = args.join(" ");
    tracing::debug!(command = %shown, "exec");

    let spawn_err = |e: std::io::Error| DriverError::Spawn {
        command: shown.clone(),
        reason: e.to_string(),
    };

    command
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command.spawn().map_err(spawn_err)?;
    let pipe = child.stdin.take();

    // stdin is fed from its own thread while stdout and stderr are drained
    let (written, output) = thread::scope(|scope| {
        let writer = scope.spawn(move || match (stdin, pipe) {
            (Some(input), Some(mut pipe)) => match pipe.write_all(input) {
                // the child may exit without reading all of its input
                Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
                written => written,
            },
            _ => Ok(()),
        });
        let output = child.wait_with_output();
        let written = writer
            .join()
            .unwrap_or_else(|_| Err(std::io::Error::other("stdin writer panicked")));
        (written, output)
    });
    let output = output.map_err(spawn_err)?;

    if !output.status.success() {
        return Err(DriverError::Command {
            command: shown.clone(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    written.map_err(spawn_err)?;

    Ok(ExecOutput {
        stdout: output.stdout,
        stderr: output.stderr,
    })
}

//! Subprocess execution utilities.
//!
//! Every child is spawned with three pipes. [`ChildProcess`] owns the pipe
//! ends and the process itself: waiting consumes the handle, and dropping a
//! handle that was never waited on kills and reaps the child.

use std::ffi::{OsStr, OsString};
use std::io::{self, Read};
use std::mem;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use std::thread;

use thiserror::Error;

/// Size of each read when draining an output pipe.
const READ_CHUNK_SIZE: usize = 4096;

/// Failure to run a subprocess.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {stream} of `{command}`")]
    Read {
        command: String,
        stream: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("failed to wait for `{command}` (pid {pid})")]
    Wait {
        command: String,
        pid: u32,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` exited abnormally{}", signal_suffix(.signal))]
    AbnormalTermination {
        command: String,
        signal: Option<i32>,
    },

    #[error("command is already running: `{command}`")]
    AlreadyRunning { command: String },

    #[error("command is not running: `{command}`")]
    NotRunning { command: String },
}

impl ProcessError {
    /// Whether a [`ProcessCommand`] was started while a previous run was
    /// still pending. This is the only low-level condition callers may
    /// branch on.
    pub fn is_already_running(&self) -> bool {
        matches!(self, ProcessError::AlreadyRunning { .. })
    }
}

fn signal_suffix(signal: &Option<i32>) -> String {
    match signal {
        Some(signal) => format!(" (terminated by signal {})", signal),
        None => String::new(),
    }
}

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|s| s.as_ref().to_os_string()));
        self
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd
    }

    /// Spawn the process without waiting for it.
    pub fn start(&self) -> Result<ChildProcess, ProcessError> {
        let command = self.display_command();
        tracing::debug!("running `{}`", command);

        let child = self
            .build_command()
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                command: command.clone(),
                source,
            })?;

        Ok(ChildProcess::new(child, command))
    }

    /// Spawn the process and wait for it to exit, capturing its output.
    pub fn exec(&self) -> Result<ProcessOutput, ProcessError> {
        self.start()?.wait()
    }

    /// Display the command for error messages.
    ///
    /// Arguments that are not valid UTF-8 are rendered lossily; the process
    /// itself receives them unchanged.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().map(|arg| {
            let arg = arg.to_string_lossy();
            if arg.is_empty() || arg.contains(' ') {
                format!("\"{}\"", arg)
            } else {
                arg.into_owned()
            }
        }));
        parts.join(" ")
    }
}

/// Exit code and captured output of a process that exited normally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code passed to `exit()` or returned from `main`.
    pub status: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }

    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// A running child process and the parent's ends of its pipes.
#[derive(Debug)]
pub struct ChildProcess {
    child: Child,
    pid: u32,
    command: String,
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
    /// Output drained from the pipes but not handed out yet.
    stdout_buf: Vec<u8>,
    stderr_buf: Vec<u8>,
    reaped: bool,
}

impl ChildProcess {
    fn new(mut child: Child, command: String) -> Self {
        ChildProcess {
            pid: child.id(),
            stdin: child.stdin.take(),
            stdout: child.stdout.take(),
            stderr: child.stderr.take(),
            child,
            command,
            stdout_buf: Vec::new(),
            stderr_buf: Vec::new(),
            reaped: false,
        }
    }

    /// OS process identifier.
    pub fn id(&self) -> u32 {
        self.pid
    }

    /// The command line this process was started with.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Writable end of the child's standard input, until [`wait`](Self::wait)
    /// closes it.
    pub fn stdin(&mut self) -> Option<&mut ChildStdin> {
        self.stdin.as_mut()
    }

    /// Read the child's stdout to end-of-stream.
    ///
    /// Stderr is drained alongside it and kept for
    /// [`read_all_stderr`](Self::read_all_stderr) or [`wait`](Self::wait).
    /// The output can only be taken once; later calls return an empty buffer.
    pub fn read_all_stdout(&mut self) -> Result<Vec<u8>, ProcessError> {
        self.drain()?;
        Ok(mem::take(&mut self.stdout_buf))
    }

    /// Read the child's stderr to end-of-stream.
    ///
    /// Stdout is drained alongside it and kept for
    /// [`read_all_stdout`](Self::read_all_stdout) or [`wait`](Self::wait).
    /// The output can only be taken once; later calls return an empty buffer.
    pub fn read_all_stderr(&mut self) -> Result<Vec<u8>, ProcessError> {
        self.drain()?;
        Ok(mem::take(&mut self.stderr_buf))
    }

    pub fn read_all_stdout_string(&mut self) -> Result<String, ProcessError> {
        let bytes = self.read_all_stdout()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn read_all_stderr_string(&mut self) -> Result<String, ProcessError> {
        let bytes = self.read_all_stderr()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Close stdin, drain any output not read yet and wait for the child to
    /// exit.
    ///
    /// Output already taken with `read_all_*` is not repeated in the result.
    pub fn wait(mut self) -> Result<ProcessOutput, ProcessError> {
        drop(self.stdin.take());
        let drained = self.drain();

        let status = self.child.wait().map_err(|source| ProcessError::Wait {
            command: self.command.clone(),
            pid: self.pid,
            source,
        })?;
        self.reaped = true;
        drained?;

        let stdout = mem::take(&mut self.stdout_buf);
        let stderr = mem::take(&mut self.stderr_buf);

        let code = status
            .code()
            .ok_or_else(|| ProcessError::AbnormalTermination {
                command: self.command.clone(),
                signal: termination_signal(&status),
            })?;

        tracing::debug!("`{}` exited with status {}", self.command, code);

        Ok(ProcessOutput {
            status: code,
            stdout,
            stderr,
        })
    }

    /// Read both output pipes to end-of-stream into the buffers.
    ///
    /// The pipes are read concurrently, so a child blocked on a full stderr
    /// pipe cannot stall the stdout reader.
    fn drain(&mut self) -> Result<(), ProcessError> {
        let stdout = self.stdout.take();
        let stderr = self.stderr.take();
        if stdout.is_none() && stderr.is_none() {
            return Ok(());
        }

        let (stdout, stderr) = thread::scope(|scope| {
            let stderr_reader = scope.spawn(move || stderr.map(read_all).transpose());
            let stdout = stdout.map(read_all).transpose();
            let stderr = stderr_reader
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("stderr reader panicked")));
            (stdout, stderr)
        });

        if let Some(bytes) = stdout.map_err(|source| self.read_error("stdout", source))? {
            self.stdout_buf.extend(bytes);
        }
        if let Some(bytes) = stderr.map_err(|source| self.read_error("stderr", source))? {
            self.stderr_buf.extend(bytes);
        }
        Ok(())
    }

    fn read_error(&self, stream: &'static str, source: io::Error) -> ProcessError {
        ProcessError::Read {
            command: self.command.clone(),
            stream,
            source,
        }
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        if !self.reaped {
            // Never leave a zombie behind on an early return.
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// A command that can be run repeatedly, one run at a time.
#[derive(Debug)]
pub struct ProcessCommand {
    builder: ProcessBuilder,
    running: Option<ChildProcess>,
}

impl ProcessCommand {
    pub fn new(builder: ProcessBuilder) -> Self {
        ProcessCommand {
            builder,
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Start the command. Fails with [`ProcessError::AlreadyRunning`] if the
    /// previous run has not been waited on.
    pub fn start(&mut self) -> Result<&mut ChildProcess, ProcessError> {
        if self.running.is_some() {
            return Err(ProcessError::AlreadyRunning {
                command: self.builder.display_command(),
            });
        }
        let child = self.builder.start()?;
        Ok(self.running.insert(child))
    }

    /// Wait for the current run to finish.
    pub fn wait(&mut self) -> Result<ProcessOutput, ProcessError> {
        match self.running.take() {
            Some(child) => child.wait(),
            None => Err(ProcessError::NotRunning {
                command: self.builder.display_command(),
            }),
        }
    }

    /// Start the command and wait for it to finish.
    pub fn run(&mut self) -> Result<ProcessOutput, ProcessError> {
        self.start()?;
        self.wait()
    }
}

/// Read a stream to end-of-stream in fixed-size chunks.
pub fn read_all<R: Read>(mut reader: R) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    loop {
        match reader.read(&mut chunk) {
            Ok(0) => return Ok(buffer),
            Ok(n) => buffer.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

#[cfg(unix)]
fn termination_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn termination_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Find a C++ compiler driver.
pub fn find_cxx_compiler() -> Option<PathBuf> {
    // Check CXX environment variable first
    if let Ok(cxx) = std::env::var("CXX") {
        if let Some(path) = find_executable(&cxx) {
            return Some(path);
        }
    }

    for compiler in &["c++", "g++", "clang++"] {
        if let Some(path) = find_executable(compiler) {
            return Some(path);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
        }
    }

    #[test]
    fn test_read_all_larger_than_chunk() {
        let data: Vec<u8> = (0..READ_CHUNK_SIZE * 3 + 17).map(|i| (i % 251) as u8).collect();
        let read = read_all(Cursor::new(data.clone())).unwrap();
        assert_eq!(read, data);
    }

    #[test]
    fn test_read_all_empty() {
        assert!(read_all(Cursor::new(Vec::new())).unwrap().is_empty());
    }

    #[test]
    fn test_read_all_propagates_errors() {
        let err = read_all(FailingReader).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_display_command() {
        let pb = ProcessBuilder::new("g++").args(["-Wall", "-o", "output", "input.c"]);
        assert_eq!(pb.display_command(), "g++ -Wall -o output input.c");
    }

    #[test]
    fn test_display_command_quotes_empty_and_spaced_args() {
        let pb = ProcessBuilder::new("g++").args(["my file.cpp", "-MM", "-MT", ""]);
        assert_eq!(pb.display_command(), "g++ \"my file.cpp\" -MM -MT \"\"");
    }

    #[test]
    fn test_spawn_missing_program() {
        let err = ProcessBuilder::new("/nonexistent/incbuild-no-such-compiler")
            .start()
            .unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
        assert!(err.to_string().contains("incbuild-no-such-compiler"));
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_captures_output_and_status() {
        let output = ProcessBuilder::new("sh")
            .args(["-c", "echo out; echo err >&2; exit 3"])
            .exec()
            .unwrap();

        assert_eq!(output.status, 3);
        assert!(!output.success());
        assert_eq!(output.stdout_string(), "out\n");
        assert_eq!(output.stderr_string(), "err\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_read_before_wait() {
        let mut child = ProcessBuilder::new("sh")
            .args(["-c", "printf hello"])
            .start()
            .unwrap();

        assert_eq!(child.read_all_stdout_string().unwrap(), "hello");
        // Already drained
        assert!(child.read_all_stdout().unwrap().is_empty());

        let output = child.wait().unwrap();
        assert!(output.success());
        assert!(output.stdout.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_read_stdout_while_stderr_fills_its_pipe() {
        // Far more stderr than a pipe buffer holds, written before any stdout
        let mut child = ProcessBuilder::new("sh")
            .args(["-c", "head -c 200000 /dev/zero >&2; echo done"])
            .start()
            .unwrap();

        assert_eq!(child.read_all_stdout_string().unwrap(), "done\n");
        assert_eq!(child.read_all_stderr().unwrap().len(), 200_000);

        let output = child.wait().unwrap();
        assert!(output.success());
        assert!(output.stderr.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_wait_returns_output_not_yet_taken() {
        let mut child = ProcessBuilder::new("sh")
            .args(["-c", "echo out; echo err >&2"])
            .start()
            .unwrap();

        assert_eq!(child.read_all_stdout_string().unwrap(), "out\n");

        let output = child.wait().unwrap();
        assert!(output.stdout.is_empty());
        assert_eq!(output.stderr_string(), "err\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_wait_drains_large_output_on_both_streams() {
        let output = ProcessBuilder::new("sh")
            .args([
                "-c",
                "i=0; while [ $i -lt 2000 ]; do echo 0123456789abcdef0123456789abcdef; echo fedcba9876543210fedcba9876543210 >&2; i=$((i+1)); done",
            ])
            .exec()
            .unwrap();

        assert!(output.success());
        assert_eq!(output.stdout.len(), 2000 * 33);
        assert_eq!(output.stderr.len(), 2000 * 33);
    }

    #[cfg(unix)]
    #[test]
    fn test_abnormal_termination() {
        let err = ProcessBuilder::new("sh")
            .args(["-c", "kill -9 $$"])
            .exec()
            .unwrap_err();

        match err {
            ProcessError::AbnormalTermination { signal, .. } => assert_eq!(signal, Some(9)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_stdin_is_writable_until_wait() {
        use std::io::Write;

        let mut child = ProcessBuilder::new("cat").start().unwrap();
        child.stdin().unwrap().write_all(b"piped").unwrap();
        let output = child.wait().unwrap();
        assert_eq!(output.stdout_string(), "piped");
    }

    #[cfg(unix)]
    #[test]
    fn test_process_command_already_running() {
        let mut cmd = ProcessCommand::new(ProcessBuilder::new("sh").args(["-c", "exit 0"]));

        cmd.start().unwrap();
        assert!(cmd.is_running());

        let err = cmd.start().unwrap_err();
        assert!(err.is_already_running());

        assert!(cmd.wait().unwrap().success());
        assert!(!cmd.is_running());

        // Can run again once the previous run finished
        assert!(cmd.run().unwrap().success());
    }

    #[cfg(unix)]
    #[test]
    fn test_process_command_wait_without_start() {
        let mut cmd = ProcessCommand::new(ProcessBuilder::new("true"));
        let err = cmd.wait().unwrap_err();
        assert!(matches!(err, ProcessError::NotRunning { .. }));
        assert!(!err.is_already_running());
    }

    #[cfg(unix)]
    #[test]
    fn test_dropping_unwaited_child_reaps_it() {
        let child = ProcessBuilder::new("sleep").arg("30").start().unwrap();
        let pid = child.id();
        drop(child);
        // The pid no longer names a live process of ours
        let status = ProcessBuilder::new("sh")
            .args(["-c", &format!("kill -0 {} 2>/dev/null", pid)])
            .exec()
            .unwrap();
        assert!(!status.success());
    }
}

//! Shell child process lifecycle: spawn, bounded wait, kill and reap.

use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};

/// Raw result of a process that exited on its own.
#[derive(Debug)]
pub struct CapturedOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

#[derive(Debug)]
pub enum ProcessOutcome {
    Completed(CapturedOutput),
    /// The bound elapsed; the process was killed and reaped.
    TimedOut,
}

/// Build a shell invocation for `command` rooted at `cwd`.
///
/// stdin is closed: the server's own stdin carries protocol frames and must
/// never be inherited. On Unix the shell becomes a process group leader so a
/// timeout can take down everything it started.
pub fn shell_command(command: &str, cwd: &Path) -> Command {
    let mut std_command = platform_shell(command);
    std_command
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut command = Command::from(std_command);
    command.kill_on_drop(true);
    command
}

#[cfg(unix)]
fn platform_shell(command: &str) -> std::process::Command {
    use std::os::unix::process::CommandExt;

    let mut shell = std::process::Command::new("sh");
    shell.arg("-c").arg(command).process_group(0);
    shell
}

#[cfg(windows)]
fn platform_shell(command: &str) -> std::process::Command {
    use std::os::windows::process::CommandExt;

    let mut shell = std::process::Command::new("cmd");
    // cmd.exe does its own parsing; quoting the command would change its meaning.
    shell.arg("/C").raw_arg(command);
    shell
}

/// Spawn `command` and wait at most `timeout` for it to exit.
///
/// Both pipes are drained concurrently with the wait so a chatty child cannot
/// block on a full pipe. On timeout the child is killed and then awaited, so
/// no zombie is left behind when this returns.
pub async fn run_with_timeout(mut command: Command, timeout: Duration) -> io::Result<ProcessOutcome> {
    let mut child = command.spawn()?;
    // The shell leads its own group; the id stays killable after the shell is
    // reaped for as long as any background member holds on.
    let process_group = child.id();
    log::debug!("Spawned shell process (pid {process_group:?})");

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let waited = tokio::time::timeout(timeout, async {
        let (status, stdout, stderr) =
            tokio::try_join!(child.wait(), read_stream(stdout), read_stream(stderr))?;
        Ok::<_, io::Error>(CapturedOutput {
            status,
            stdout,
            stderr,
        })
    })
    .await;

    match waited {
        Ok(captured) => captured.map(ProcessOutcome::Completed),
        Err(_) => {
            terminate(&mut child, process_group).await?;
            Ok(ProcessOutcome::TimedOut)
        }
    }
}

async fn read_stream<R>(stream: Option<R>) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::new();
    if let Some(mut stream) = stream {
        stream.read_to_end(&mut buffer).await?;
    }
    Ok(buffer)
}

/// Kill the child (and its process group on Unix), then reap it.
///
/// `process_group` is captured at spawn time: the shell may already have
/// exited and been reaped while a background job keeps the pipes open.
async fn terminate(child: &mut Child, process_group: Option<u32>) -> io::Result<()> {
    #[cfg(unix)]
    if let Some(pgid) = process_group {
        // SAFETY: killpg has no memory-safety preconditions; the group id is
        // the pid of the shell we spawned as group leader.
        let rc = unsafe { libc::killpg(pgid as libc::pid_t, libc::SIGKILL) };
        if rc != 0 {
            log::debug!("killpg({pgid}) failed: {}", io::Error::last_os_error());
        }
    }
    #[cfg(not(unix))]
    let _ = process_group;

    if let Err(e) = child.start_kill() {
        // Already exited after the group kill; the wait below still reaps it.
        log::debug!("start_kill failed: {e}");
    }
    let status = child.wait().await?;
    log::debug!("Timed out process reaped with {status}");
    Ok(())
}

/// Human-readable exit code: the numeric code, or the signal on Unix.
pub fn describe_exit(status: &ExitStatus) -> String {
    if let Some(code) = status.code() {
        return code.to_string();
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("terminated by signal {signal}");
        }
    }

    "unknown".to_string()
}

//! Child process supervision.
//!
//! A trial runs as the leader of its own process group so that a timeout can
//! take down everything the target started. The leader is reaped with
//! `wait4`, which also reports its peak resident set size.
//!
//! Output is drained by reader threads. Once the leader is reaped the readers
//! get one grace period to hit end of file; a descendant that escaped the
//! group and still holds a pipe open only costs the output it writes later.

use std::io::{self, Read};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use crate::executor::RunOutcome;
use crate::text::decode;

/// Limits applied while supervising one child.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Supervision {
    pub timeout: Duration,
    pub grace: Duration,
    pub poll: Duration,
}

const CHUNK: usize = 8 * 1024;

// Forwards the pipe in chunks so a reader that never sees EOF can be
// abandoned without losing what it already read.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<Receiver<Vec<u8>>> {
    pipe.map(|mut pipe| {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut chunk = [0u8; CHUNK];
            loop {
                match pipe.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(chunk[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                    Err(_) => break,
                }
            }
        });
        rx
    })
}

/// Gathers a pipe's output until its writer closes or `deadline` passes.
///
/// Returns the decoded text and whether the pipe was still open.
fn collect(pipe: Option<Receiver<Vec<u8>>>, deadline: Instant) -> (String, bool) {
    let Some(rx) = pipe else {
        return (String::new(), false);
    };
    let mut buf = Vec::new();
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(left) {
            Ok(chunk) => buf.extend_from_slice(&chunk),
            Err(RecvTimeoutError::Disconnected) => return (decode(buf), false),
            Err(RecvTimeoutError::Timeout) => return (decode(buf), true),
        }
    }
}

/// Spawns `cmd`, enforces the timeout and captures output and telemetry.
///
/// Spawn failures are reported through [`RunOutcome::spawn_error`].
pub(crate) fn supervise(cmd: &mut Command, limits: Supervision) -> RunOutcome {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let start = Instant::now();
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => return RunOutcome::spawn_failed(e.to_string(), start.elapsed()),
    };
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let waited = wait(&mut child, start, limits);
    let wall = start.elapsed();

    let mut outcome = match waited {
        Ok(exit) => RunOutcome {
            exit_code: exit.code,
            signal: exit.signal,
            stdout: String::new(),
            stderr: String::new(),
            wall_seconds: wall.as_secs_f64(),
            peak_rss_kb: exit.peak_rss_kb,
            timed_out: exit.timed_out,
            output_truncated: false,
            spawn_error: None,
        },
        Err(e) => {
            let _ = child.kill();
            RunOutcome::spawn_failed(format!("lost track of child: {e}"), wall)
        }
    };
    let deadline = Instant::now() + limits.grace;
    let (out, out_open) = collect(stdout, deadline);
    let (err, err_open) = collect(stderr, deadline);
    if out_open || err_open {
        tracing::debug!(event = "output_abandoned", stdout = out_open, stderr = err_open);
    }
    outcome.stdout = out;
    outcome.stderr = err;
    outcome.output_truncated = out_open || err_open;
    outcome
}

struct Exit {
    code: Option<i32>,
    signal: Option<i32>,
    peak_rss_kb: Option<u64>,
    timed_out: bool,
}

#[cfg(unix)]
fn wait(child: &mut Child, start: Instant, limits: Supervision) -> io::Result<Exit> {
    use std::os::unix::process::ExitStatusExt;
    use std::process::ExitStatus;

    let pid = child.id() as libc::pid_t;
    let deadline = start + limits.timeout;
    let mut terminated_at: Option<Instant> = None;

    let (status, usage) = loop {
        if let Some(done) = reap(pid, libc::WNOHANG)? {
            break done;
        }
        let now = Instant::now();
        match terminated_at {
            None if now >= deadline => {
                tracing::debug!(event = "trial_timeout", pid, signal = "SIGTERM");
                signal_group(pid, libc::SIGTERM);
                terminated_at = Some(now);
            }
            Some(at) if now.duration_since(at) >= limits.grace => {
                tracing::debug!(event = "trial_timeout", pid, signal = "SIGKILL");
                signal_group(pid, libc::SIGKILL);
                if let Some(done) = reap(pid, 0)? {
                    break done;
                }
                continue;
            }
            _ => {}
        }
        thread::sleep(limits.poll);
    };

    // Descendants left in the group would hold the pipes open.
    signal_group(pid, libc::SIGKILL);

    let status = ExitStatus::from_raw(status);
    Ok(Exit {
        code: status.code(),
        signal: status.signal(),
        peak_rss_kb: peak_rss_kb(&usage),
        timed_out: terminated_at.is_some(),
    })
}

#[cfg(unix)]
fn reap(pid: libc::pid_t, flags: libc::c_int) -> io::Result<Option<(libc::c_int, libc::rusage)>> {
    let mut status: libc::c_int = 0;
    // SAFETY: rusage is plain old data; all-zero bytes are a valid value.
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    // SAFETY: pid is our own unreaped child and both out-pointers refer to
    // live locals.
    let rc = unsafe { libc::wait4(pid, &mut status, flags, &mut usage) };
    if rc == pid {
        return Ok(Some((status, usage)));
    }
    if rc == 0 {
        return Ok(None);
    }
    let err = io::Error::last_os_error();
    if err.kind() == io::ErrorKind::Interrupted {
        Ok(None)
    } else {
        Err(err)
    }
}

#[cfg(unix)]
fn signal_group(pgid: libc::pid_t, signal: libc::c_int) {
    // SAFETY: killpg has no memory-safety preconditions; ESRCH for an empty
    // group is expected and ignored.
    unsafe {
        libc::killpg(pgid, signal);
    }
}

// ru_maxrss is kilobytes on Linux and bytes on macOS.
#[cfg(unix)]
fn peak_rss_kb(usage: &libc::rusage) -> Option<u64> {
    let raw = u64::try_from(usage.ru_maxrss).ok().filter(|&v| v > 0)?;
    if cfg!(target_os = "macos") {
        Some(raw / 1024)
    } else {
        Some(raw)
    }
}

#[cfg(not(unix))]
fn wait(child: &mut Child, start: Instant, limits: Supervision) -> io::Result<Exit> {
    let deadline = start + limits.timeout;
    let mut timed_out = false;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            timed_out = true;
            child.kill()?;
            break child.wait()?;
        }
        thread::sleep(limits.poll);
    };
    Ok(Exit {
        code: status.code(),
        signal: None,
        peak_rss_kb: None,
        timed_out,
    })
}

//! Scratch benchmark roots with fake targets.
//!
//! Every fake target is a POSIX shell script under `<root>/bin`, invoked
//! through the harness's usual `{root}` template.

use std::fs;
use std::path::{Path, PathBuf};

use nqbench_core::{BuildStep, OutputFormat, Target, WorkerSupport};
use tempfile::TempDir;

use crate::outputs::{CUDD_FREE_TEXT, CUDD_PATTERN};

/// A temporary benchmark root, removed on drop.
pub struct BenchRoot {
    dir: TempDir,
}

impl Default for BenchRoot {
    fn default() -> Self {
        Self::new()
    }
}

impl BenchRoot {
    pub fn new() -> Self {
        Self {
            dir: tempfile::Builder::new()
                .prefix("nqbench")
                .tempdir()
                .expect("create bench root"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes `contents` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent directory");
        }
        fs::write(&path, contents).expect("write fixture file");
        path
    }

    /// Writes an executable script to `bin/<name>.sh`.
    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.write(&format!("bin/{name}.sh"), &format!("#!/bin/sh\n{body}\n"));
        set_executable(&path);
        path
    }

    /// Reads a file under the root, or `None` if it does not exist.
    pub fn read(&self, rel: &str) -> Option<String> {
        fs::read_to_string(self.path().join(rel)).ok()
    }

    fn script_target(&self, id: &str, body: &str, args: &str) -> Target {
        self.script(id, body);
        Target::new(id, "sh", format!("{{root}}/bin/{id}.sh {args}"))
    }

    /// Prints a metrics line echoing the requested size.
    pub fn metrics_target(&self, id: &str, nodes: u64) -> Target {
        self.script_target(
            id,
            &format!("echo \"warming up\"\necho \"NQUEENS_METRICS n=$1 solutions=0 nodes={nodes}\""),
            "{size}",
        )
    }

    /// Reports a board size one larger than requested.
    pub fn wrong_size_target(&self, id: &str) -> Target {
        self.script_target(
            id,
            "echo \"NQUEENS_METRICS n=$(($1 + 1)) solutions=0 nodes=5\"",
            "{size}",
        )
    }

    /// Appends the worker count it receives to `<id>.workers`.
    pub fn workers_target(&self, id: &str, support: WorkerSupport) -> Target {
        let log = self.path().join(format!("{id}.workers"));
        self.script_target(
            id,
            &format!(
                "echo \"$1\" >> '{}'\necho \"NQUEENS_METRICS n=$2 solutions=0 nodes=10\"",
                log.display()
            ),
            "{workers} {size}",
        )
        .with_workers(support)
    }

    /// Exits non-zero with a message on stderr.
    pub fn crashing_target(&self, id: &str) -> Target {
        self.script_target(id, "echo \"segfault imminent\" >&2\nexit 7", "{size}")
    }

    /// Exits cleanly without any recognizable metrics.
    pub fn garbage_target(&self, id: &str) -> Target {
        self.script_target(id, "echo \"all done, no numbers here\"", "{size}")
    }

    /// Prints no node count; the reference encoder supplies one.
    pub fn absent_target(&self, id: &str) -> Target {
        self.script_target(id, "echo \"solutions computed\"", "{size}")
            .with_output(OutputFormat::Absent)
    }

    /// Prints CUDD-style free text for a 10 x 10 board.
    pub fn free_text_target(&self, id: &str) -> Target {
        self.write(&format!("{id}.out"), CUDD_FREE_TEXT);
        let out = self.path().join(format!("{id}.out"));
        self.script_target(id, &format!("cat '{}'", out.display()), "{size}")
            .with_output(OutputFormat::free_text(CUDD_PATTERN))
    }

    /// Sleeps for `secs` in a background child that ignores SIGTERM and
    /// records that child's pid in `<id>.pid`.
    pub fn sleeping_target(&self, id: &str, secs: u32) -> Target {
        let pid_file = self.path().join(format!("{id}.pid"));
        self.script_target(
            id,
            &format!(
                "(trap '' TERM; sleep {secs}) &\necho $! > '{}'\nwait",
                pid_file.display()
            ),
            "{size}",
        )
    }

    /// Pid recorded by a [`sleeping_target`](Self::sleeping_target).
    pub fn recorded_pid(&self, id: &str) -> Option<i32> {
        self.read(&format!("{id}.pid"))?.trim().parse().ok()
    }

    /// A target whose only build step fails.
    pub fn failing_build_target(&self, id: &str) -> Target {
        self.metrics_target(id, 1)
            .with_build_step(BuildStep::new("echo \"compiler exploded\" >&2; exit 3"))
            .with_artifact(format!("out/{id}.sh"))
    }

    /// A target whose build step copies its script into `out/` and logs
    /// each build to `<id>.builds`.
    pub fn building_target(&self, id: &str, nodes: u64) -> Target {
        self.write(
            &format!("src/{id}.sh"),
            &format!("#!/bin/sh\necho \"NQUEENS_METRICS n=$1 solutions=0 nodes={nodes}\"\n"),
        );
        let artifact = format!("out/{id}.sh");
        Target::new(id, "sh", format!("{{root}}/{artifact} {{size}}"))
            .with_build_step(
                BuildStep::new(format!(
                    "mkdir -p out && cp src/{id}.sh {artifact} && chmod +x {artifact} && echo built >> {id}.builds"
                ))
                .creates(artifact.clone()),
            )
            .with_artifact(artifact)
    }
}

#[cfg(unix)]
fn set_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path).expect("stat script").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("chmod script");
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) {}

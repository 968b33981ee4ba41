//! Build manager: materializes target artifacts before the sweep.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use nqbench_core::template::{render, TemplateVars};
use nqbench_core::{BuildStep, Target};
use tracing::{debug, info};

use crate::executor::{available_parallelism, shell};
use crate::text::{decode, tail, TAIL_LIMIT};

/// Result of preparing one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    pub ok: bool,
    /// Absolute artifact path, when the target declares one.
    pub artifact: Option<PathBuf>,
    /// Failure detail, usually the failing step's stderr tail.
    pub error: Option<String>,
    /// Steps actually executed (skipped steps are not counted).
    pub steps_run: usize,
}

impl BuildOutcome {
    fn success(artifact: Option<PathBuf>, steps_run: usize) -> Self {
        Self {
            ok: true,
            artifact,
            error: None,
            steps_run,
        }
    }

    fn failure(error: String, steps_run: usize) -> Self {
        Self {
            ok: false,
            artifact: None,
            error: Some(error),
            steps_run,
        }
    }
}

/// Runs build steps at most once per target for the life of the manager.
///
/// Paths in build steps are relative to the benchmark root. A step with
/// `creates` is skipped when that path already exists.
#[derive(Debug)]
pub struct BuildManager {
    root: PathBuf,
    jobs: usize,
    skip: bool,
    cache: HashMap<String, BuildOutcome>,
}

impl BuildManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            jobs: available_parallelism(),
            skip: false,
            cache: HashMap::new(),
        }
    }

    /// Value substituted for `{jobs}`.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Treats every target as built without running anything.
    pub fn with_skip(mut self, skip: bool) -> Self {
        self.skip = skip;
        self
    }

    /// Builds `target` unless it was already attempted.
    pub fn ensure_built(&mut self, target: &Target) -> BuildOutcome {
        if let Some(outcome) = self.cache.get(&target.id) {
            return outcome.clone();
        }
        let outcome = if self.skip {
            BuildOutcome::success(self.artifact_path(target), 0)
        } else {
            self.build(target)
        };
        self.cache.insert(target.id.clone(), outcome.clone());
        outcome
    }

    /// Cached outcome of an earlier [`ensure_built`](Self::ensure_built).
    pub fn outcome(&self, id: &str) -> Option<&BuildOutcome> {
        self.cache.get(id)
    }

    fn artifact_path(&self, target: &Target) -> Option<PathBuf> {
        target.artifact.as_ref().map(|a| self.root.join(a))
    }

    fn build(&self, target: &Target) -> BuildOutcome {
        let mut steps_run = 0;
        for (index, step) in target.build.iter().enumerate() {
            match self.run_step(target, index, step) {
                Ok(true) => steps_run += 1,
                Ok(false) => {}
                Err(e) => return BuildOutcome::failure(e, steps_run + 1),
            }
        }

        match self.artifact_path(target) {
            Some(path) if !path.exists() => BuildOutcome::failure(
                format!("artifact {} missing after build", path.display()),
                steps_run,
            ),
            artifact => BuildOutcome::success(artifact, steps_run),
        }
    }

    // Ok(false) means the step was skipped.
    fn run_step(&self, target: &Target, index: usize, step: &BuildStep) -> Result<bool, String> {
        if let Some(creates) = &step.creates {
            if self.root.join(creates).exists() {
                debug!(
                    event = "build_skip",
                    target = %target.id,
                    step = index,
                    creates = %creates.display(),
                );
                return Ok(false);
            }
        }

        for path in &step.chmod_exec {
            make_executable(&self.root.join(path))
                .map_err(|e| format!("cannot chmod {}: {e}", path.display()))?;
        }

        let vars = TemplateVars::new(self.root.to_string_lossy()).with_jobs(self.jobs);
        let line = render(&step.command, &vars).map_err(|e| format!("step {index}: {e}"))?;
        let cwd = match &step.cwd {
            Some(dir) => self.root.join(dir),
            None => self.root.clone(),
        };
        info!(
            event = "build_step",
            target = %target.id,
            step = index,
            cwd = %relative(&cwd, &self.root),
            command = %line,
        );

        let output = shell(&line, &cwd, target, &self.root)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| format!("cannot start `{line}`: {e}"))?;
        if output.status.success() {
            return Ok(true);
        }

        let stderr = decode(output.stderr);
        let detail = if stderr.trim().is_empty() {
            decode(output.stdout)
        } else {
            stderr
        };
        Err(format!(
            "`{line}` failed ({}): {}",
            output.status,
            tail(&detail, TAIL_LIMIT)
        ))
    }
}

fn relative(path: &Path, root: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Ok(rel) => rel.display().to_string(),
        Err(_) => path.display().to_string(),
    }
}

// Missing paths are left alone; the step itself reports what it needs.
#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let meta = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    let mut perms = meta.permissions();
    if perms.mode() & 0o111 != 0o111 {
        perms.set_mode(perms.mode() | 0o111);
        std::fs::set_permissions(path, perms)?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

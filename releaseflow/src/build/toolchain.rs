//! Builder backed by an external packaging command.

use super::ArtifactBuilder;
use crate::core::{ArtifactKind, BuildArtifactSet};
use crate::errors::BuildError;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Instant, SystemTime};
use tokio::process::Command;
use tracing::{debug, info, warn};

const DEFAULT_PROGRAM: &str = "python";
const MISSING_MODULE_MARKER: &str = "No module named ";
const MAX_DIAGNOSTIC_CHARS: usize = 8 * 1024;

/// Runs a packaging command in the source tree and collects its output.
///
/// By default this is `python -m build --sdist --wheel --outdir <out_dir>`.
#[derive(Debug, Clone)]
pub struct ToolchainBuilder {
    program: String,
    args: Vec<String>,
    out_dir: PathBuf,
}

impl ToolchainBuilder {
    /// Creates a builder writing into `out_dir` (relative to the source tree
    /// unless absolute).
    #[must_use]
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        let out_dir = out_dir.into();
        let args = vec![
            "-m".to_string(),
            "build".to_string(),
            "--sdist".to_string(),
            "--wheel".to_string(),
            "--outdir".to_string(),
            out_dir.display().to_string(),
        ];
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            args,
            out_dir,
        }
    }

    /// Replaces the packaging command.
    #[must_use]
    pub fn with_command(
        mut self,
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.program = program.into();
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// The program that will be run.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The arguments passed to the program.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Output directory resolved against the source tree.
    #[must_use]
    pub fn out_dir_for(&self, source_tree: &Path) -> PathBuf {
        if self.out_dir.is_absolute() {
            self.out_dir.clone()
        } else {
            source_tree.join(&self.out_dir)
        }
    }

    async fn run_toolchain(&self, source_tree: &Path) -> Result<(), BuildError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .current_dir(source_tree)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => BuildError::ToolchainMissing {
                    tool: self.program.clone(),
                },
                _ => BuildError::Io(e),
            })?;

        if output.status.success() {
            return Ok(());
        }

        let diagnostics = collect_diagnostics(&output.stderr, &output.stdout);
        if let Some(module) = missing_module(&diagnostics) {
            return Err(BuildError::ToolchainMissing { tool: module });
        }

        Err(BuildError::BuildFailure {
            code: output.status.code(),
            diagnostics,
        })
    }
}

impl Default for ToolchainBuilder {
    fn default() -> Self {
        Self::new("dist")
    }
}

#[async_trait]
impl ArtifactBuilder for ToolchainBuilder {
    async fn build(&self, source_tree: &Path) -> Result<BuildArtifactSet, BuildError> {
        let out_dir = self.out_dir_for(source_tree);
        tokio::fs::create_dir_all(&out_dir).await?;
        clear_stale_artifacts(&out_dir)?;

        info!(
            program = %self.program,
            source_tree = %source_tree.display(),
            out_dir = %out_dir.display(),
            "Building distributions"
        );
        let start = Instant::now();

        if let Err(e) = self.run_toolchain(source_tree).await {
            warn!(error = %e, "Packaging toolchain failed");
            return Err(e);
        }

        let artifacts = discover_artifacts(&out_dir)?;
        artifacts.verify()?;

        debug!(
            sdist = %artifacts.sdist.display(),
            wheel = %artifacts.wheel.display(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Build finished"
        );
        Ok(artifacts)
    }
}

/// Removes distributions left in `out_dir` by an earlier build, so only this
/// run's output can be discovered.
///
/// # Errors
///
/// Returns [`BuildError::Io`] if the directory cannot be read or a file
/// cannot be removed.
pub fn clear_stale_artifacts(out_dir: &Path) -> Result<usize, BuildError> {
    let mut removed = 0;
    for entry in std::fs::read_dir(out_dir)? {
        let entry = entry?;
        let path = entry.path();
        if ArtifactKind::from_path(&path).is_none() || !entry.file_type()?.is_file() {
            continue;
        }
        std::fs::remove_file(&path)?;
        debug!(path = %path.display(), "Removed stale distribution");
        removed += 1;
    }
    if removed > 0 {
        info!(removed, out_dir = %out_dir.display(), "Cleared previous build output");
    }
    Ok(removed)
}

/// Picks the newest sdist and wheel in `out_dir`.
///
/// # Errors
///
/// Returns [`BuildError::MissingArtifact`] if either kind is absent.
pub fn discover_artifacts(out_dir: &Path) -> Result<BuildArtifactSet, BuildError> {
    let mut newest: [Option<(SystemTime, PathBuf)>; 2] = [None, None];

    for entry in std::fs::read_dir(out_dir)? {
        let path = entry?.path();
        let Some(kind) = ArtifactKind::from_path(&path) else {
            continue;
        };
        let modified = std::fs::metadata(&path)?
            .modified()
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let slot = &mut newest[usize::from(kind == ArtifactKind::Wheel)];
        if slot.as_ref().map_or(true, |(t, _)| modified >= *t) {
            *slot = Some((modified, path));
        }
    }

    let [sdist, wheel] = newest;
    let sdist = sdist.ok_or_else(|| {
        BuildError::missing("sdist", format!("no *.tar.gz in {}", out_dir.display()))
    })?;
    let wheel = wheel.ok_or_else(|| {
        BuildError::missing("wheel", format!("no *.whl in {}", out_dir.display()))
    })?;

    Ok(BuildArtifactSet::new(sdist.1, wheel.1))
}

fn collect_diagnostics(stderr: &[u8], stdout: &[u8]) -> String {
    let mut text = String::from_utf8_lossy(stderr).trim().to_string();
    let stdout = String::from_utf8_lossy(stdout);
    let stdout = stdout.trim();
    if !stdout.is_empty() {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(stdout);
    }

    // keep the tail; that is where the toolchain reports the failure
    let count = text.chars().count();
    if count > MAX_DIAGNOSTIC_CHARS {
        text = text.chars().skip(count - MAX_DIAGNOSTIC_CHARS).collect();
    }
    text
}

fn missing_module(diagnostics: &str) -> Option<String> {
    diagnostics.lines().find_map(|line| {
        let (_, rest) = line.split_once(MISSING_MODULE_MARKER)?;
        let module = rest.trim().trim_matches(|c| c == '\'' || c == '"');
        (!module.is_empty()).then(|| module.to_string())
    })
}
